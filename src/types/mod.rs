//! Semantic type descriptors.
//!
//! A `CelType` is the canonical representation used by the checker, the
//! overload resolver and the runtime. The set is closed: primitives, the
//! `dyn` top type, the `error` bottom type, parametric list/map/type/optional
//! types, named struct and opaque types, and type parameters for generic
//! function signatures.

use std::fmt::Display;

/// Names of the well-known wrapper types whose absent fields read back as
/// `null` instead of the wrapped primitive's zero value.
const WRAPPER_TYPE_NAMES: &[&str] = &[
    "google.protobuf.BoolValue",
    "google.protobuf.BytesValue",
    "google.protobuf.DoubleValue",
    "google.protobuf.FloatValue",
    "google.protobuf.Int32Value",
    "google.protobuf.Int64Value",
    "google.protobuf.StringValue",
    "google.protobuf.UInt32Value",
    "google.protobuf.UInt64Value",
];

#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CelType {
    /// Boolean truth value primitive
    Bool,
    /// 64-bit signed integer primitive
    Int,
    /// 64-bit unsigned integer primitive
    Uint,
    /// 64-bit IEEE 754 floating point primitive
    Double,
    /// Immutable UTF-8 string value
    String,
    /// Immutable byte buffer
    Bytes,
    /// The type of the `null` literal
    Null,
    /// Top type, assignable to and from everything
    Dyn,
    /// Bottom type assigned to nodes that already produced an issue
    Error,
    /// Homogeneous ordered collection with a single element type
    List(Box<CelType>),
    /// Ordered key-value collection with key and value types
    Map(Box<CelType>, Box<CelType>),
    /// The type of a type value; `None` is the unparameterized `type`
    Type(Option<Box<CelType>>),
    /// Named struct (message) type resolved through a type provider
    Struct(String),
    /// Named abstract type with optional type parameters
    Opaque(String, Vec<CelType>),
    /// Type parameter bound during overload resolution
    TypeParam(String),
    /// Present-or-absent wrapper around an inner type
    Optional(Box<CelType>),
}

impl CelType {
    pub fn list(elem: CelType) -> CelType {
        CelType::List(Box::new(elem))
    }

    pub fn map(key: CelType, value: CelType) -> CelType {
        CelType::Map(Box::new(key), Box::new(value))
    }

    pub fn type_of(inner: CelType) -> CelType {
        CelType::Type(Some(Box::new(inner)))
    }

    pub fn optional(inner: CelType) -> CelType {
        CelType::Optional(Box::new(inner))
    }

    pub fn type_param(name: impl ToString) -> CelType {
        CelType::TypeParam(name.to_string())
    }

    /// Timestamps are modeled as the opaque `timestamp` type.
    pub fn timestamp() -> CelType {
        CelType::Opaque("timestamp".to_string(), vec![])
    }

    /// Durations are modeled as the opaque `duration` type.
    pub fn duration() -> CelType {
        CelType::Opaque("duration".to_string(), vec![])
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self, CelType::Dyn)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CelType::Error)
    }

    /// Error nodes already carry an issue, so both top and bottom types are
    /// exempt from further agreement checks.
    pub fn is_dyn_or_error(&self) -> bool {
        matches!(self, CelType::Dyn | CelType::Error)
    }

    pub fn is_type_param(&self) -> bool {
        matches!(self, CelType::TypeParam(_))
    }

    /// Whether this is one of the well-known wrapper struct types.
    pub fn is_wrapper(&self) -> bool {
        match self {
            CelType::Struct(name) => WRAPPER_TYPE_NAMES.contains(&name.as_str()),
            _ => false,
        }
    }
}

impl Display for CelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CelType::Bool => f.write_str("bool"),
            CelType::Int => f.write_str("int"),
            CelType::Uint => f.write_str("uint"),
            CelType::Double => f.write_str("double"),
            CelType::String => f.write_str("string"),
            CelType::Bytes => f.write_str("bytes"),
            CelType::Null => f.write_str("null_type"),
            CelType::Dyn => f.write_str("dyn"),
            CelType::Error => f.write_str("*error*"),
            CelType::List(elem) => write!(f, "list({elem})"),
            CelType::Map(key, value) => write!(f, "map({key}, {value})"),
            CelType::Type(None) => f.write_str("type"),
            CelType::Type(Some(inner)) => write!(f, "type({inner})"),
            CelType::Struct(name) => f.write_str(name),
            CelType::Opaque(name, params) => {
                if params.is_empty() {
                    f.write_str(name)
                } else {
                    let params = params
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "{name}({params})")
                }
            }
            CelType::TypeParam(name) => f.write_str(name),
            CelType::Optional(inner) => write!(f, "optional_type({inner})"),
        }
    }
}
