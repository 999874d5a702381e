use indexmap::IndexMap;

use super::Value;

/// Hashable key of a map value. Signed, unsigned and floating keys that
/// address the same mathematical integer normalize to the same `Int` key,
/// so `m[1]`, `m[1u]` and `m[1.0]` hit the same entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Uint(u64),
    String(String),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Result<MapKey, String> {
        match value {
            Value::Bool(b) => Ok(MapKey::Bool(*b)),
            Value::Int(i) => Ok(MapKey::Int(*i)),
            Value::Uint(u) => {
                if *u <= i64::MAX as u64 {
                    Ok(MapKey::Int(*u as i64))
                } else {
                    Ok(MapKey::Uint(*u))
                }
            }
            Value::Double(d) => {
                if d.is_finite() && d.fract() == 0.0 && *d >= i64::MIN as f64 && *d <= i64::MAX as f64
                {
                    Ok(MapKey::Int(*d as i64))
                } else {
                    Err(format!("unsupported map key value: {d}"))
                }
            }
            Value::String(s) => Ok(MapKey::String(s.as_ref().clone())),
            other => Err(format!("unsupported map key type: {}", other.runtime_type())),
        }
    }
}

/// Insertion-ordered map value. Entries keep the originally supplied key
/// value so iteration reproduces the source container faithfully.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    entries: IndexMap<MapKey, (Value, Value)>,
}

impl MapValue {
    pub fn new() -> MapValue {
        MapValue::default()
    }

    /// Insert an entry. Fails on unsupported key types and on duplicate
    /// keys, which a map literal reports as an error value.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<(), String> {
        let map_key = MapKey::from_value(&key)?;
        if self.entries.contains_key(&map_key) {
            return Err(format!("duplicate map key: {key}"));
        }
        self.entries.insert(map_key, (key, value));

        Ok(())
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        let map_key = MapKey::from_value(key).ok()?;
        self.entries.get(&map_key).map(|(_, value)| value)
    }

    pub fn contains(&self, key: &Value) -> bool {
        MapKey::from_value(key)
            .map(|k| self.entries.contains_key(&k))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order as (original key, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.values().map(|(key, value)| (key, value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.values().map(|(key, _)| key)
    }
}

impl FromIterator<(Value, Value)> for MapValue {
    /// Collects entries, silently keeping the first of duplicate keys and
    /// skipping unsupported key types. Literal construction goes through
    /// `insert` instead, which reports both conditions.
    fn from_iter<T: IntoIterator<Item = (Value, Value)>>(iter: T) -> MapValue {
        let mut map = MapValue::new();
        for (key, value) in iter {
            let _ = map.insert(key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::{MapKey, MapValue};
    use crate::value::Value;

    #[test]
    fn test_numeric_keys_unify() {
        let mut map = MapValue::new();
        map.insert(Value::Int(1), Value::string("a")).unwrap();

        assert_eq!(map.get(&Value::Uint(1)), Some(&Value::string("a")));
        assert_eq!(map.get(&Value::Double(1.0)), Some(&Value::string("a")));
        assert!(map.contains(&Value::Int(1)));
        assert!(!map.contains(&Value::Int(2)));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut map = MapValue::new();
        map.insert(Value::string("k"), Value::Int(1)).unwrap();
        assert!(map.insert(Value::string("k"), Value::Int(2)).is_err());
    }

    #[test]
    fn test_unsupported_key() {
        assert!(MapKey::from_value(&Value::Double(1.5)).is_err());
        assert!(MapKey::from_value(&Value::Null).is_err());
        let map = MapValue::new();
        assert!(!map.contains(&Value::Null));
    }

    #[test]
    fn test_iteration_preserves_insertion_order() {
        let mut map = MapValue::new();
        map.insert(Value::string("b"), Value::Int(2)).unwrap();
        map.insert(Value::string("a"), Value::Int(1)).unwrap();

        let keys = map
            .keys()
            .map(|k| k.to_string())
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
