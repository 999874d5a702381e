//! Runtime value model.
//!
//! One variant per kind. Every value knows how to compare itself against
//! every other value (`equal`), knows its runtime type (`runtime_type`)
//! and projects into a host-native representation (`native`). Errors and
//! unknowns are values too, so they can flow through evaluation and be
//! combined by the short-circuit operators.

pub mod adapter;
pub mod error;
pub mod map;
pub mod time;

use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::ExprId;
use crate::types::CelType;

pub use self::error::{ErrorValue, UnknownValue};
pub use self::map::{MapKey, MapValue};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(Arc<String>),
    Bytes(Arc<Vec<u8>>),
    Null,
    List(Arc<Vec<Value>>),
    Map(Arc<MapValue>),
    Struct(Arc<StructValue>),
    /// Nanoseconds since the Unix epoch.
    Timestamp(i64),
    /// Signed nanosecond span.
    Duration(i64),
    Type(CelType),
    Enum(Arc<EnumValue>),
    Optional(Arc<Option<Value>>),
    Error(Arc<ErrorValue>),
    Unknown(Arc<UnknownValue>),
}

/// A struct (message) value: a type name plus named fields in declaration
/// order. Absent fields read back as their declared default.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StructValue {
    pub type_name: String,
    pub fields: IndexMap<String, Value>,
}

impl StructValue {
    pub fn new(type_name: impl ToString) -> StructValue {
        StructValue {
            type_name: type_name.to_string(),
            fields: IndexMap::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Whether a value is stored for the field. Presence tests additionally
    /// require the stored value to differ from the declared default; the
    /// interpreter handles that comparison.
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub value: i64,
}

impl Value {
    pub fn string(value: impl ToString) -> Value {
        Value::String(Arc::new(value.to_string()))
    }

    pub fn bytes(value: impl Into<Vec<u8>>) -> Value {
        Value::Bytes(Arc::new(value.into()))
    }

    pub fn list(elements: Vec<Value>) -> Value {
        Value::List(Arc::new(elements))
    }

    pub fn map(map: MapValue) -> Value {
        Value::Map(Arc::new(map))
    }

    pub fn struct_value(value: StructValue) -> Value {
        Value::Struct(Arc::new(value))
    }

    pub fn enum_value(type_name: impl ToString, value: i64) -> Value {
        Value::Enum(Arc::new(EnumValue {
            type_name: type_name.to_string(),
            value,
        }))
    }

    pub fn optional(inner: Option<Value>) -> Value {
        Value::Optional(Arc::new(inner))
    }

    pub fn error(message: impl ToString) -> Value {
        Value::Error(Arc::new(ErrorValue::new(message)))
    }

    pub fn error_at(expr_id: ExprId, message: impl ToString) -> Value {
        Value::Error(Arc::new(ErrorValue::at(expr_id, message)))
    }

    pub fn unknown(expr_id: ExprId) -> Value {
        Value::Unknown(Arc::new(UnknownValue::new(expr_id)))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Runtime type of the value as reported by `type()`.
    pub fn runtime_type(&self) -> CelType {
        match self {
            Value::Bool(_) => CelType::Bool,
            Value::Int(_) => CelType::Int,
            Value::Uint(_) => CelType::Uint,
            Value::Double(_) => CelType::Double,
            Value::String(_) => CelType::String,
            Value::Bytes(_) => CelType::Bytes,
            Value::Null => CelType::Null,
            Value::List(_) => CelType::list(CelType::Dyn),
            Value::Map(_) => CelType::map(CelType::Dyn, CelType::Dyn),
            Value::Struct(s) => CelType::Struct(s.type_name.clone()),
            Value::Timestamp(_) => CelType::timestamp(),
            Value::Duration(_) => CelType::duration(),
            Value::Type(_) => CelType::Type(None),
            Value::Enum(e) => CelType::Opaque(e.type_name.clone(), vec![]),
            Value::Optional(_) => CelType::optional(CelType::Dyn),
            Value::Error(_) => CelType::Error,
            Value::Unknown(_) => CelType::Dyn,
        }
    }

    /// Equality across the whole lattice. Cross-numeric operands compare by
    /// mathematical value, mismatched kinds yield `false`, `NaN` is never
    /// equal to anything, and error/unknown propagate (error wins).
    pub fn equal(&self, other: &Value) -> Value {
        match (self, other) {
            (Value::Error(_), _) => self.clone(),
            (_, Value::Error(_)) => other.clone(),
            (Value::Unknown(a), Value::Unknown(b)) => Value::Unknown(Arc::new(a.merge(b))),
            (Value::Unknown(_), _) => self.clone(),
            (_, Value::Unknown(_)) => other.clone(),

            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Value::Bool(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.equal(y) {
                        Value::Bool(true) => {}
                        other => return other,
                    }
                }
                Value::Bool(true)
            }
            (Value::Map(a), Value::Map(b)) => {
                if a.len() != b.len() {
                    return Value::Bool(false);
                }
                for (key, value) in a.iter() {
                    let Some(other_value) = b.get(key) else {
                        return Value::Bool(false);
                    };
                    match value.equal(other_value) {
                        Value::Bool(true) => {}
                        other => return other,
                    }
                }
                Value::Bool(true)
            }
            (Value::Struct(a), Value::Struct(b)) => {
                if a.type_name != b.type_name || a.fields.len() != b.fields.len() {
                    return Value::Bool(false);
                }
                for (field, value) in &a.fields {
                    let Some(other_value) = b.get(field) else {
                        return Value::Bool(false);
                    };
                    match value.equal(other_value) {
                        Value::Bool(true) => {}
                        other => return other,
                    }
                }
                Value::Bool(true)
            }
            (Value::Optional(a), Value::Optional(b)) => match (a.as_ref(), b.as_ref()) {
                (None, None) => Value::Bool(true),
                (Some(x), Some(y)) => x.equal(y),
                _ => Value::Bool(false),
            },

            (Value::Enum(a), Value::Enum(b)) => {
                Value::Bool(a.type_name == b.type_name && a.value == b.value)
            }
            (Value::Enum(e), Value::Int(i)) | (Value::Int(i), Value::Enum(e)) => {
                Value::Bool(e.value == *i)
            }

            _ => Value::Bool(self.strict_equal(other)),
        }
    }

    fn strict_equal(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,

            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Uint(a), Value::Uint(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Int(i), Value::Uint(u)) | (Value::Uint(u), Value::Int(i)) => {
                *i >= 0 && *i as u64 == *u
            }
            (Value::Int(i), Value::Double(d)) | (Value::Double(d), Value::Int(i)) => {
                double_equals_int(*d, *i)
            }
            (Value::Uint(u), Value::Double(d)) | (Value::Double(d), Value::Uint(u)) => {
                double_equals_uint(*d, *u)
            }

            _ => false,
        }
    }

    /// Ordering between comparable values; `None` for incomparable pairs
    /// and any comparison involving `NaN`.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Uint(a), Value::Uint(b)) => Some(a.cmp(b)),
            (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
            (Value::Int(i), Value::Uint(u)) => {
                if *i < 0 {
                    Some(Ordering::Less)
                } else {
                    Some((*i as u64).cmp(u))
                }
            }
            (Value::Uint(u), Value::Int(i)) => {
                if *i < 0 {
                    Some(Ordering::Greater)
                } else {
                    Some(u.cmp(&(*i as u64)))
                }
            }
            (Value::Int(i), Value::Double(d)) => (*i as f64).partial_cmp(d),
            (Value::Double(d), Value::Int(i)) => d.partial_cmp(&(*i as f64)),
            (Value::Uint(u), Value::Double(d)) => (*u as f64).partial_cmp(d),
            (Value::Double(d), Value::Uint(u)) => d.partial_cmp(&(*u as f64)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Project into a host-native `serde_json` representation. Timestamps
    /// and durations become nanosecond integers, bytes a byte array, maps
    /// an ordered object keyed by the rendered key.
    pub fn native(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Uint(u) => Json::from(*u),
            Value::Double(d) => {
                serde_json::Number::from_f64(*d).map(Json::Number).unwrap_or(Json::Null)
            }
            Value::String(s) => Json::String(s.as_ref().clone()),
            Value::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Value::Null => Json::Null,
            Value::List(elements) => Json::Array(elements.iter().map(Value::native).collect()),
            Value::Map(map) => {
                let mut object = serde_json::Map::new();
                for (key, value) in map.iter() {
                    object.insert(key.to_string(), value.native());
                }
                Json::Object(object)
            }
            Value::Struct(s) => {
                let mut object = serde_json::Map::new();
                for (field, value) in &s.fields {
                    object.insert(field.clone(), value.native());
                }
                Json::Object(object)
            }
            Value::Timestamp(nanos) | Value::Duration(nanos) => Json::from(*nanos),
            Value::Type(t) => Json::String(t.to_string()),
            Value::Enum(e) => Json::from(e.value),
            Value::Optional(inner) => match inner.as_ref() {
                Some(value) => value.native(),
                None => Json::Null,
            },
            Value::Error(e) => Json::String(format!("error: {e}")),
            Value::Unknown(_) => Json::Null,
        }
    }
}

fn double_equals_int(d: f64, i: i64) -> bool {
    d.is_finite()
        && d.fract() == 0.0
        && d >= -9.223_372_036_854_776e18
        && d < 9.223_372_036_854_776e18
        && d as i64 == i
}

fn double_equals_uint(d: f64, u: u64) -> bool {
    d.is_finite()
        && d.fract() == 0.0
        && d >= 0.0
        && d < 1.844_674_407_370_955_2e19
        && d as u64 == u
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Uint(u) => write!(f, "{u}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Value::Null => f.write_str("null"),
            Value::List(elements) => {
                let rendered = elements
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{rendered}]")
            }
            Value::Map(map) => {
                let rendered = map
                    .iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{rendered}}}")
            }
            Value::Struct(s) => {
                let rendered = s
                    .fields
                    .iter()
                    .map(|(name, v)| format!("{name}: {v}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{}{{{rendered}}}", s.type_name)
            }
            Value::Timestamp(nanos) => f.write_str(&time::format_timestamp(*nanos)),
            Value::Duration(nanos) => f.write_str(&time::format_duration(*nanos)),
            Value::Type(t) => write!(f, "{t}"),
            Value::Enum(e) => write!(f, "{}", e.value),
            Value::Optional(inner) => match inner.as_ref() {
                Some(value) => write!(f, "optional({value})"),
                None => f.write_str("optional.none()"),
            },
            Value::Error(e) => write!(f, "{e}"),
            Value::Unknown(_) => f.write_str("unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MapValue, Value};
    use crate::types::CelType;

    #[test]
    fn test_cross_numeric_equality() {
        let pairs = [
            (Value::Int(2), Value::Uint(2)),
            (Value::Int(2), Value::Double(2.0)),
            (Value::Uint(2), Value::Double(2.0)),
        ];
        for (a, b) in pairs {
            assert_eq!(a.equal(&b), Value::Bool(true), "{a} == {b}");
            assert_eq!(b.equal(&a), Value::Bool(true), "{b} == {a}");
        }

        assert_eq!(Value::Int(2).equal(&Value::Uint(3)), Value::Bool(false));
        assert_eq!(Value::Int(-1).equal(&Value::Uint(u64::MAX)), Value::Bool(false));
        assert_eq!(Value::Int(2).equal(&Value::Double(2.5)), Value::Bool(false));
    }

    #[test]
    fn test_nan_is_never_equal() {
        let nan = Value::Double(f64::NAN);
        assert_eq!(nan.equal(&nan), Value::Bool(false));
        assert_eq!(nan.equal(&Value::Double(1.0)), Value::Bool(false));
        assert_eq!(nan.compare(&Value::Double(1.0)), None);
    }

    #[test]
    fn test_mismatched_kinds_are_unequal() {
        assert_eq!(Value::Int(1).equal(&Value::string("1")), Value::Bool(false));
        assert_eq!(Value::Bool(true).equal(&Value::Int(1)), Value::Bool(false));
        assert_eq!(Value::Null.equal(&Value::Int(0)), Value::Bool(false));
    }

    #[test]
    fn test_error_propagates_through_equality() {
        let err = Value::error("boom");
        let unknown = Value::unknown(1);

        assert!(err.equal(&Value::Int(1)).is_error());
        assert!(Value::Int(1).equal(&err).is_error());
        assert!(unknown.equal(&Value::Int(1)).is_unknown());
        // error wins over unknown
        assert!(err.equal(&unknown).is_error());
    }

    #[test]
    fn test_list_equality_is_deep() {
        let a = Value::list(vec![Value::Int(1), Value::Double(2.0)]);
        let b = Value::list(vec![Value::Uint(1), Value::Int(2)]);
        assert_eq!(a.equal(&b), Value::Bool(true));

        let c = Value::list(vec![Value::Int(1)]);
        assert_eq!(a.equal(&c), Value::Bool(false));
    }

    #[test]
    fn test_cross_numeric_ordering() {
        use std::cmp::Ordering;

        assert_eq!(Value::Int(-1).compare(&Value::Uint(0)), Some(Ordering::Less));
        assert_eq!(
            Value::Uint(3).compare(&Value::Int(2)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Value::Double(1.5).compare(&Value::Int(2)),
            Some(Ordering::Less)
        );
        assert_eq!(Value::string("a").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_runtime_type() {
        assert_eq!(Value::Int(1).runtime_type(), CelType::Int);
        assert_eq!(
            Value::list(vec![]).runtime_type(),
            CelType::list(CelType::Dyn)
        );
        assert_eq!(Value::Timestamp(0).runtime_type(), CelType::timestamp());
    }

    #[test]
    fn test_native_projection() {
        assert_eq!(Value::Int(3).native(), serde_json::json!(3));
        assert_eq!(
            Value::list(vec![Value::Bool(true)]).native(),
            serde_json::json!([true])
        );

        let mut map = MapValue::new();
        map.insert(Value::string("k"), Value::Int(1)).unwrap();
        assert_eq!(Value::map(map).native(), serde_json::json!({"k": 1}));

        assert_eq!(Value::Duration(5).native(), serde_json::json!(5));
    }
}
