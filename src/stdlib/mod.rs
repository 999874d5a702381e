//! Standard library declarations.
//!
//! Operators use the parser's function spellings (`_+_`, `_<_`, `_[_]`,
//! `@in`, …); every overload id names its signature so the checker's ref
//! map and the dispatcher agree. The matching runtime bindings live in
//! `bindings`.

mod bindings;

use crate::env::decls::{FunctionDecl, Overload, VariableDecl};
use crate::types::CelType;
use crate::value::Value;

pub use self::bindings::bindings;

/// Comparable primitive types with the id suffix of their overloads.
const COMPARABLE: &[(&str, fn() -> CelType)] = &[
    ("bool", || CelType::Bool),
    ("int64", || CelType::Int),
    ("uint64", || CelType::Uint),
    ("double", || CelType::Double),
    ("string", || CelType::String),
    ("bytes", || CelType::Bytes),
    ("timestamp", CelType::timestamp),
    ("duration", CelType::duration),
];

/// Cross-numeric comparison pairs.
const MIXED_NUMERIC: &[(&str, fn() -> CelType, fn() -> CelType)] = &[
    ("int64_uint64", || CelType::Int, || CelType::Uint),
    ("uint64_int64", || CelType::Uint, || CelType::Int),
    ("int64_double", || CelType::Int, || CelType::Double),
    ("double_int64", || CelType::Double, || CelType::Int),
    ("uint64_double", || CelType::Uint, || CelType::Double),
    ("double_uint64", || CelType::Double, || CelType::Uint),
];

fn comparison(function: &str, prefix: &str) -> FunctionDecl {
    let mut overloads = vec![];
    for (suffix, ty) in COMPARABLE {
        overloads.push(Overload::global(
            format!("{prefix}_{suffix}"),
            vec![ty(), ty()],
            CelType::Bool,
        ));
    }
    for (suffix, lhs, rhs) in MIXED_NUMERIC {
        overloads.push(Overload::global(
            format!("{prefix}_{suffix}"),
            vec![lhs(), rhs()],
            CelType::Bool,
        ));
    }
    FunctionDecl::new(function, overloads)
}

/// Timestamp accessor declared with and without a fixed-offset time zone
/// argument; durations get a single overload.
fn time_accessor(function: &str, id: &str, on_duration: bool) -> FunctionDecl {
    let mut overloads = vec![
        Overload::member(
            format!("timestamp_to_{id}"),
            vec![CelType::timestamp()],
            CelType::Int,
        ),
        Overload::member(
            format!("timestamp_to_{id}_with_tz"),
            vec![CelType::timestamp(), CelType::String],
            CelType::Int,
        ),
    ];
    if on_duration {
        overloads.push(Overload::member(
            format!("duration_to_{id}"),
            vec![CelType::duration()],
            CelType::Int,
        ));
    }
    FunctionDecl::new(function, overloads)
}

/// The standard function declarations.
pub fn declarations() -> Vec<FunctionDecl> {
    let a = || CelType::type_param("A");
    let k = || CelType::type_param("K");
    let v = || CelType::type_param("V");
    let list_a = || CelType::list(CelType::type_param("A"));
    let map_kv = || {
        CelType::map(
            CelType::type_param("K"),
            CelType::type_param("V"),
        )
    };
    let ts = CelType::timestamp;
    let dur = CelType::duration;

    let mut decls = vec![
        FunctionDecl::new(
            "_+_",
            vec![
                Overload::global("add_int64", vec![CelType::Int, CelType::Int], CelType::Int),
                Overload::global("add_uint64", vec![CelType::Uint, CelType::Uint], CelType::Uint),
                Overload::global(
                    "add_int64_uint64",
                    vec![CelType::Int, CelType::Uint],
                    CelType::Int,
                ),
                Overload::global(
                    "add_uint64_int64",
                    vec![CelType::Uint, CelType::Int],
                    CelType::Uint,
                ),
                Overload::global(
                    "add_double",
                    vec![CelType::Double, CelType::Double],
                    CelType::Double,
                ),
                Overload::global(
                    "add_string",
                    vec![CelType::String, CelType::String],
                    CelType::String,
                ),
                Overload::global(
                    "add_bytes",
                    vec![CelType::Bytes, CelType::Bytes],
                    CelType::Bytes,
                ),
                Overload::global("add_list", vec![list_a(), list_a()], list_a())
                    .with_type_params(&["A"]),
                Overload::global("add_timestamp_duration", vec![ts(), dur()], ts()),
                Overload::global("add_duration_timestamp", vec![dur(), ts()], ts()),
                Overload::global("add_duration_duration", vec![dur(), dur()], dur()),
            ],
        ),
        FunctionDecl::new(
            "_-_",
            vec![
                Overload::global(
                    "subtract_int64",
                    vec![CelType::Int, CelType::Int],
                    CelType::Int,
                ),
                Overload::global(
                    "subtract_uint64",
                    vec![CelType::Uint, CelType::Uint],
                    CelType::Uint,
                ),
                Overload::global(
                    "subtract_int64_uint64",
                    vec![CelType::Int, CelType::Uint],
                    CelType::Int,
                ),
                Overload::global(
                    "subtract_uint64_int64",
                    vec![CelType::Uint, CelType::Int],
                    CelType::Uint,
                ),
                Overload::global(
                    "subtract_double",
                    vec![CelType::Double, CelType::Double],
                    CelType::Double,
                ),
                Overload::global("subtract_timestamp_timestamp", vec![ts(), ts()], dur()),
                Overload::global("subtract_timestamp_duration", vec![ts(), dur()], ts()),
                Overload::global("subtract_duration_duration", vec![dur(), dur()], dur()),
            ],
        ),
        FunctionDecl::new(
            "_*_",
            vec![
                Overload::global(
                    "multiply_int64",
                    vec![CelType::Int, CelType::Int],
                    CelType::Int,
                ),
                Overload::global(
                    "multiply_uint64",
                    vec![CelType::Uint, CelType::Uint],
                    CelType::Uint,
                ),
                Overload::global(
                    "multiply_int64_uint64",
                    vec![CelType::Int, CelType::Uint],
                    CelType::Int,
                ),
                Overload::global(
                    "multiply_uint64_int64",
                    vec![CelType::Uint, CelType::Int],
                    CelType::Uint,
                ),
                Overload::global(
                    "multiply_double",
                    vec![CelType::Double, CelType::Double],
                    CelType::Double,
                ),
            ],
        ),
        FunctionDecl::new(
            "_/_",
            vec![
                Overload::global(
                    "divide_int64",
                    vec![CelType::Int, CelType::Int],
                    CelType::Int,
                ),
                Overload::global(
                    "divide_uint64",
                    vec![CelType::Uint, CelType::Uint],
                    CelType::Uint,
                ),
                Overload::global(
                    "divide_int64_uint64",
                    vec![CelType::Int, CelType::Uint],
                    CelType::Int,
                ),
                Overload::global(
                    "divide_uint64_int64",
                    vec![CelType::Uint, CelType::Int],
                    CelType::Uint,
                ),
                Overload::global(
                    "divide_double",
                    vec![CelType::Double, CelType::Double],
                    CelType::Double,
                ),
            ],
        ),
        FunctionDecl::new(
            "_%_",
            vec![
                Overload::global(
                    "modulo_int64",
                    vec![CelType::Int, CelType::Int],
                    CelType::Int,
                ),
                Overload::global(
                    "modulo_uint64",
                    vec![CelType::Uint, CelType::Uint],
                    CelType::Uint,
                ),
                Overload::global(
                    "modulo_int64_uint64",
                    vec![CelType::Int, CelType::Uint],
                    CelType::Int,
                ),
                Overload::global(
                    "modulo_uint64_int64",
                    vec![CelType::Uint, CelType::Int],
                    CelType::Uint,
                ),
            ],
        ),
        FunctionDecl::new(
            "-_",
            vec![
                Overload::global("negate_int64", vec![CelType::Int], CelType::Int),
                Overload::global("negate_double", vec![CelType::Double], CelType::Double),
            ],
        ),
        FunctionDecl::new(
            "_&&_",
            vec![Overload::global(
                "logical_and",
                vec![CelType::Bool, CelType::Bool],
                CelType::Bool,
            )],
        ),
        FunctionDecl::new(
            "_||_",
            vec![Overload::global(
                "logical_or",
                vec![CelType::Bool, CelType::Bool],
                CelType::Bool,
            )],
        ),
        FunctionDecl::new(
            "!_",
            vec![Overload::global("logical_not", vec![CelType::Bool], CelType::Bool)],
        ),
        // equality is heterogeneous: the value model compares across
        // numeric kinds and mismatched kinds compare false
        FunctionDecl::new(
            "_==_",
            vec![Overload::global(
                "equals",
                vec![CelType::Dyn, CelType::Dyn],
                CelType::Bool,
            )],
        ),
        FunctionDecl::new(
            "_!=_",
            vec![Overload::global(
                "not_equals",
                vec![CelType::Dyn, CelType::Dyn],
                CelType::Bool,
            )],
        ),
        comparison("_<_", "less"),
        comparison("_<=_", "less_equals"),
        comparison("_>_", "greater"),
        comparison("_>=_", "greater_equals"),
        FunctionDecl::new(
            "size",
            vec![
                Overload::global("size_string", vec![CelType::String], CelType::Int),
                Overload::global("size_bytes", vec![CelType::Bytes], CelType::Int),
                Overload::global("size_list", vec![list_a()], CelType::Int)
                    .with_type_params(&["A"]),
                Overload::global("size_map", vec![map_kv()], CelType::Int)
                    .with_type_params(&["K", "V"]),
                Overload::member("string_size", vec![CelType::String], CelType::Int),
                Overload::member("bytes_size", vec![CelType::Bytes], CelType::Int),
                Overload::member("list_size", vec![list_a()], CelType::Int)
                    .with_type_params(&["A"]),
                Overload::member("map_size", vec![map_kv()], CelType::Int)
                    .with_type_params(&["K", "V"]),
            ],
        ),
        FunctionDecl::new(
            "_[_]",
            vec![
                Overload::global("index_list", vec![list_a(), CelType::Int], a())
                    .with_type_params(&["A"]),
                Overload::global("index_map", vec![map_kv(), k()], v())
                    .with_type_params(&["K", "V"]),
            ],
        ),
        FunctionDecl::new(
            "@in",
            vec![
                Overload::global("in_list", vec![a(), list_a()], CelType::Bool)
                    .with_type_params(&["A"]),
                Overload::global("in_map", vec![k(), map_kv()], CelType::Bool)
                    .with_type_params(&["K", "V"]),
            ],
        ),
        FunctionDecl::new(
            "contains",
            vec![Overload::member(
                "contains_string",
                vec![CelType::String, CelType::String],
                CelType::Bool,
            )],
        ),
        FunctionDecl::new(
            "startsWith",
            vec![Overload::member(
                "starts_with_string",
                vec![CelType::String, CelType::String],
                CelType::Bool,
            )],
        ),
        FunctionDecl::new(
            "endsWith",
            vec![Overload::member(
                "ends_with_string",
                vec![CelType::String, CelType::String],
                CelType::Bool,
            )],
        ),
        FunctionDecl::new(
            "matches",
            vec![
                Overload::global(
                    "matches",
                    vec![CelType::String, CelType::String],
                    CelType::Bool,
                ),
                Overload::member(
                    "matches_string",
                    vec![CelType::String, CelType::String],
                    CelType::Bool,
                ),
            ],
        ),
        FunctionDecl::new(
            "int",
            vec![
                Overload::global("uint64_to_int64", vec![CelType::Uint], CelType::Int),
                Overload::global("double_to_int64", vec![CelType::Double], CelType::Int),
                Overload::global("string_to_int64", vec![CelType::String], CelType::Int),
                Overload::global("timestamp_to_int64", vec![ts()], CelType::Int),
            ],
        ),
        FunctionDecl::new(
            "uint",
            vec![
                Overload::global("int64_to_uint64", vec![CelType::Int], CelType::Uint),
                Overload::global("double_to_uint64", vec![CelType::Double], CelType::Uint),
                Overload::global("string_to_uint64", vec![CelType::String], CelType::Uint),
            ],
        ),
        FunctionDecl::new(
            "double",
            vec![
                Overload::global("int64_to_double", vec![CelType::Int], CelType::Double),
                Overload::global("uint64_to_double", vec![CelType::Uint], CelType::Double),
                Overload::global("string_to_double", vec![CelType::String], CelType::Double),
            ],
        ),
        FunctionDecl::new(
            "string",
            vec![
                Overload::global("int64_to_string", vec![CelType::Int], CelType::String),
                Overload::global("uint64_to_string", vec![CelType::Uint], CelType::String),
                Overload::global("double_to_string", vec![CelType::Double], CelType::String),
                Overload::global("bytes_to_string", vec![CelType::Bytes], CelType::String),
                Overload::global("timestamp_to_string", vec![ts()], CelType::String),
                Overload::global("duration_to_string", vec![dur()], CelType::String),
            ],
        ),
        FunctionDecl::new(
            "bytes",
            vec![Overload::global(
                "string_to_bytes",
                vec![CelType::String],
                CelType::Bytes,
            )],
        ),
        FunctionDecl::new(
            "dyn",
            vec![Overload::global("to_dyn", vec![a()], CelType::Dyn).with_type_params(&["A"])],
        ),
        FunctionDecl::new(
            "type",
            vec![Overload::global(
                "type",
                vec![a()],
                CelType::type_of(CelType::type_param("A")),
            )
            .with_type_params(&["A"])],
        ),
        FunctionDecl::new(
            "timestamp",
            vec![Overload::global("string_to_timestamp", vec![CelType::String], ts())],
        ),
        FunctionDecl::new(
            "duration",
            vec![Overload::global("string_to_duration", vec![CelType::String], dur())],
        ),
        time_accessor("getFullYear", "year", false),
        time_accessor("getMonth", "month", false),
        time_accessor("getDate", "date", false),
        time_accessor("getDayOfMonth", "day_of_month", false),
        time_accessor("getDayOfWeek", "day_of_week", false),
        time_accessor("getDayOfYear", "day_of_year", false),
        time_accessor("getHours", "hours", true),
        time_accessor("getMinutes", "minutes", true),
        time_accessor("getSeconds", "seconds", true),
        time_accessor("getMilliseconds", "milliseconds", true),
    ];

    decls.sort_by(|a, b| a.name.cmp(&b.name));
    decls
}

/// Type names pre-bound as type values, so `type(x) == int` resolves.
pub fn type_idents() -> Vec<VariableDecl> {
    let types = [
        ("bool", CelType::Bool),
        ("int", CelType::Int),
        ("uint", CelType::Uint),
        ("double", CelType::Double),
        ("string", CelType::String),
        ("bytes", CelType::Bytes),
        ("list", CelType::list(CelType::Dyn)),
        ("map", CelType::map(CelType::Dyn, CelType::Dyn)),
        ("null_type", CelType::Null),
        ("type", CelType::Type(None)),
        ("dyn", CelType::Dyn),
    ];

    types
        .into_iter()
        .map(|(name, ty)| {
            VariableDecl::constant(name, CelType::type_of(ty.clone()), Value::Type(ty))
        })
        .collect()
}

/// Bindings use the same generated id lists as the declarations, so the
/// two stay in lockstep.
pub(crate) fn comparison_ids(prefix: &str) -> Vec<String> {
    let mut ids = vec![];
    for (suffix, _) in COMPARABLE {
        ids.push(format!("{prefix}_{suffix}"));
    }
    for (suffix, _, _) in MIXED_NUMERIC {
        ids.push(format!("{prefix}_{suffix}"));
    }
    ids
}
