//! Conversion between host-native values and runtime values, and default
//! values for declared types.

use crate::types::CelType;

use super::{MapValue, Value};

/// Converts host-native values into runtime values. Lazy activations call
/// this on first access to a binding; a custom adapter can be installed at
/// environment construction to widen the set of supported host values.
pub trait TypeAdapter: Send + Sync {
    fn native_to_value(&self, native: &serde_json::Value) -> Value;
}

/// The obvious mappings: booleans, 64-bit-safe integers to int, other
/// numbers to double, strings to string, arrays to list, objects to map
/// keyed by field name. Anything else becomes an error value.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultAdapter;

impl TypeAdapter for DefaultAdapter {
    fn native_to_value(&self, native: &serde_json::Value) -> Value {
        use serde_json::Value as Json;

        match native {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::Uint(u)
                } else if let Some(d) = n.as_f64() {
                    Value::Double(d)
                } else {
                    Value::error(format!("unsupported numeric value: {n}"))
                }
            }
            Json::String(s) => Value::string(s),
            Json::Array(elements) => {
                let converted = elements
                    .iter()
                    .map(|e| self.native_to_value(e))
                    .collect::<Vec<_>>();
                if let Some(err) = converted.iter().find(|v| v.is_error()) {
                    return err.clone();
                }
                Value::list(converted)
            }
            Json::Object(entries) => {
                let mut map = MapValue::new();
                for (key, value) in entries {
                    let converted = self.native_to_value(value);
                    if converted.is_error() {
                        return converted;
                    }
                    if let Err(message) = map.insert(Value::string(key), converted) {
                        return Value::error(message);
                    }
                }
                Value::map(map)
            }
        }
    }
}

/// Default value of a declared type: zero for numerics, empty for
/// string/bytes/list/map, `null` for message-typed fields (wrappers
/// included), `optional.none()` for optionals.
pub fn default_value(ty: &CelType) -> Value {
    match ty {
        CelType::Bool => Value::Bool(false),
        CelType::Int => Value::Int(0),
        CelType::Uint => Value::Uint(0),
        CelType::Double => Value::Double(0.0),
        CelType::String => Value::string(""),
        CelType::Bytes => Value::bytes(Vec::new()),
        CelType::List(_) => Value::list(vec![]),
        CelType::Map(_, _) => Value::map(MapValue::new()),
        CelType::Optional(_) => Value::optional(None),
        CelType::Error => Value::error("default of error type"),
        // null_type, dyn, struct, opaque, type and type params all default
        // to null; message-typed fields in particular read back as null.
        _ => Value::Null,
    }
}
