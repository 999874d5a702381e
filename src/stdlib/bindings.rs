//! Runtime bindings for the standard library.
//!
//! One general implementation per operator, registered under every
//! overload id of that operator; the dispatcher's kind guards decide which
//! overload a call lands on. All standard bindings are pure, so literal
//! calls fold at plan time.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::interpreter::dispatcher::FunctionBinding;
use crate::value::time::{
    self, civil_from_nanos, parse_offset, CivilDateTime, NANOS_PER_SECOND,
};
use crate::value::Value;

use super::comparison_ids;

/// Compiled patterns for `matches`, shared across programs and threads.
static REGEX_CACHE: Lazy<Mutex<HashMap<String, Result<Regex, String>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

pub fn bindings() -> Vec<FunctionBinding> {
    let mut out = vec![];

    for id in [
        "add_int64",
        "add_uint64",
        "add_double",
        "add_string",
        "add_bytes",
        "add_list",
        "add_timestamp_duration",
        "add_duration_timestamp",
        "add_duration_duration",
    ] {
        out.push(FunctionBinding::binary(id, add).pure());
    }

    for id in [
        "subtract_int64",
        "subtract_uint64",
        "subtract_double",
        "subtract_timestamp_timestamp",
        "subtract_timestamp_duration",
        "subtract_duration_duration",
    ] {
        out.push(FunctionBinding::binary(id, subtract).pure());
    }

    for id in ["multiply_int64", "multiply_uint64", "multiply_double"] {
        out.push(FunctionBinding::binary(id, multiply).pure());
    }
    for id in ["divide_int64", "divide_uint64", "divide_double"] {
        out.push(FunctionBinding::binary(id, divide).pure());
    }
    for id in ["modulo_int64", "modulo_uint64"] {
        out.push(FunctionBinding::binary(id, modulo).pure());
    }

    for (prefix, op) in [
        ("add", add as fn(Value, Value) -> Value),
        ("subtract", subtract),
        ("multiply", multiply),
        ("divide", divide),
        ("modulo", modulo),
    ] {
        for suffix in ["int64_uint64", "uint64_int64"] {
            out.push(
                FunctionBinding::binary(format!("{prefix}_{suffix}"), move |lhs, rhs| {
                    match coerce_to_left(&lhs, rhs) {
                        Ok(rhs) => op(lhs, rhs),
                        Err(error) => error,
                    }
                })
                .pure(),
            );
        }
    }
    out.push(FunctionBinding::unary("negate_int64", negate).pure());
    out.push(FunctionBinding::unary("negate_double", negate).pure());
    out.push(
        FunctionBinding::unary("logical_not", |value| match value {
            Value::Bool(b) => Value::Bool(!b),
            other => other,
        })
        .pure(),
    );

    out.push(FunctionBinding::binary("equals", |a, b| a.equal(&b)).pure());
    out.push(
        FunctionBinding::binary("not_equals", |a, b| match a.equal(&b) {
            Value::Bool(eq) => Value::Bool(!eq),
            other => other,
        })
        .pure(),
    );

    for (prefix, pred) in [
        ("less", (|ord| ord == Ordering::Less) as fn(Ordering) -> bool),
        ("less_equals", |ord| ord != Ordering::Greater),
        ("greater", |ord| ord == Ordering::Greater),
        ("greater_equals", |ord| ord != Ordering::Less),
    ] {
        for id in comparison_ids(prefix) {
            out.push(
                FunctionBinding::binary(id, move |a, b| match a.compare(&b) {
                    Some(ord) => Value::Bool(pred(ord)),
                    None => Value::Bool(false),
                })
                .pure(),
            );
        }
    }

    for id in [
        "size_string",
        "size_bytes",
        "size_list",
        "size_map",
        "string_size",
        "bytes_size",
        "list_size",
        "map_size",
    ] {
        out.push(FunctionBinding::unary(id, size).pure());
    }

    out.push(FunctionBinding::binary("index_list", index).pure());
    out.push(FunctionBinding::binary("index_map", index).pure());
    out.push(FunctionBinding::binary("in_list", membership).pure());
    out.push(FunctionBinding::binary("in_map", membership).pure());

    out.push(
        FunctionBinding::binary("contains_string", |s, sub| string_op(s, sub, |a, b| a.contains(b)))
            .pure(),
    );
    out.push(
        FunctionBinding::binary("starts_with_string", |s, p| {
            string_op(s, p, |a, b| a.starts_with(b))
        })
        .pure(),
    );
    out.push(
        FunctionBinding::binary("ends_with_string", |s, p| {
            string_op(s, p, |a, b| a.ends_with(b))
        })
        .pure(),
    );
    out.push(FunctionBinding::binary("matches", matches_regex).pure());
    out.push(FunctionBinding::binary("matches_string", matches_regex).pure());

    for id in [
        "uint64_to_int64",
        "double_to_int64",
        "string_to_int64",
        "timestamp_to_int64",
    ] {
        out.push(FunctionBinding::unary(id, to_int).pure());
    }
    for id in ["int64_to_uint64", "double_to_uint64", "string_to_uint64"] {
        out.push(FunctionBinding::unary(id, to_uint).pure());
    }
    for id in ["int64_to_double", "uint64_to_double", "string_to_double"] {
        out.push(FunctionBinding::unary(id, to_double).pure());
    }
    for id in [
        "int64_to_string",
        "uint64_to_string",
        "double_to_string",
        "bytes_to_string",
        "timestamp_to_string",
        "duration_to_string",
    ] {
        out.push(FunctionBinding::unary(id, to_string).pure());
    }
    out.push(
        FunctionBinding::unary("string_to_bytes", |value| match value {
            Value::String(s) => Value::bytes(s.as_bytes().to_vec()),
            other => other,
        })
        .pure(),
    );
    out.push(FunctionBinding::unary("to_dyn", |value| value).pure());
    out.push(FunctionBinding::unary("type", |value| Value::Type(value.runtime_type())).pure());
    out.push(
        FunctionBinding::unary("string_to_timestamp", |value| match value {
            Value::String(s) => match time::parse_timestamp(&s) {
                Ok(nanos) => Value::Timestamp(nanos),
                Err(message) => Value::error(message),
            },
            other => other,
        })
        .pure(),
    );
    out.push(
        FunctionBinding::unary("string_to_duration", |value| match value {
            Value::String(s) => match time::parse_duration(&s) {
                Ok(nanos) => Value::Duration(nanos),
                Err(message) => Value::error(message),
            },
            other => other,
        })
        .pure(),
    );

    for (id, extract) in [
        ("year", (|c: &CivilDateTime| c.year) as fn(&CivilDateTime) -> i64),
        ("month", |c| c.month as i64 - 1),
        ("date", |c| c.day as i64),
        ("day_of_month", |c| c.day as i64 - 1),
        ("day_of_week", |c| c.day_of_week as i64),
        ("day_of_year", |c| c.day_of_year as i64),
        ("hours", |c| c.hour as i64),
        ("minutes", |c| c.minute as i64),
        ("seconds", |c| c.second as i64),
        ("milliseconds", |c| c.nanosecond as i64 / 1_000_000),
    ] {
        out.push(
            FunctionBinding::unary(format!("timestamp_to_{id}"), move |value| match value {
                Value::Timestamp(nanos) => Value::Int(extract(&civil_from_nanos(nanos, 0))),
                other => other,
            })
            .pure(),
        );
        out.push(
            FunctionBinding::binary(
                format!("timestamp_to_{id}_with_tz"),
                move |value, tz| match (value, tz) {
                    (Value::Timestamp(nanos), Value::String(tz)) => match parse_offset(&tz) {
                        Ok(offset) => Value::Int(extract(&civil_from_nanos(nanos, offset))),
                        Err(message) => Value::error(message),
                    },
                    (other, _) => other,
                },
            )
            .pure(),
        );
    }

    for (id, divisor) in [
        ("duration_to_hours", 3600 * NANOS_PER_SECOND),
        ("duration_to_minutes", 60 * NANOS_PER_SECOND),
        ("duration_to_seconds", NANOS_PER_SECOND),
        ("duration_to_milliseconds", 1_000_000),
    ] {
        out.push(
            FunctionBinding::unary(id, move |value| match value {
                Value::Duration(nanos) => Value::Int(nanos / divisor),
                other => other,
            })
            .pure(),
        );
    }

    out
}

fn add(lhs: Value, rhs: Value) -> Value {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
            Some(sum) => Value::Int(sum),
            None => Value::error("integer overflow"),
        },
        (Value::Uint(a), Value::Uint(b)) => match a.checked_add(*b) {
            Some(sum) => Value::Uint(sum),
            None => Value::error("unsigned integer overflow"),
        },
        (Value::Double(a), Value::Double(b)) => Value::Double(a + b),
        (Value::String(a), Value::String(b)) => Value::string(format!("{a}{b}")),
        (Value::Bytes(a), Value::Bytes(b)) => {
            let mut joined = a.as_ref().clone();
            joined.extend_from_slice(b);
            Value::bytes(joined)
        }
        (Value::List(a), Value::List(b)) => {
            let mut joined = a.as_ref().clone();
            joined.extend_from_slice(b);
            Value::list(joined)
        }
        (Value::Timestamp(a), Value::Duration(b)) | (Value::Duration(b), Value::Timestamp(a)) => {
            match a.checked_add(*b) {
                Some(sum) => Value::Timestamp(sum),
                None => Value::error("timestamp overflow"),
            }
        }
        (Value::Duration(a), Value::Duration(b)) => match a.checked_add(*b) {
            Some(sum) => Value::Duration(sum),
            None => Value::error("duration overflow"),
        },
        _ => unsupported("_+_", &lhs, &rhs),
    }
}

fn subtract(lhs: Value, rhs: Value) -> Value {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => match a.checked_sub(*b) {
            Some(difference) => Value::Int(difference),
            None => Value::error("integer overflow"),
        },
        (Value::Uint(a), Value::Uint(b)) => match a.checked_sub(*b) {
            Some(difference) => Value::Uint(difference),
            None => Value::error("unsigned integer overflow"),
        },
        (Value::Double(a), Value::Double(b)) => Value::Double(a - b),
        (Value::Timestamp(a), Value::Timestamp(b)) => match a.checked_sub(*b) {
            Some(difference) => Value::Duration(difference),
            None => Value::error("duration overflow"),
        },
        (Value::Timestamp(a), Value::Duration(b)) => match a.checked_sub(*b) {
            Some(difference) => Value::Timestamp(difference),
            None => Value::error("timestamp overflow"),
        },
        (Value::Duration(a), Value::Duration(b)) => match a.checked_sub(*b) {
            Some(difference) => Value::Duration(difference),
            None => Value::error("duration overflow"),
        },
        _ => unsupported("_-_", &lhs, &rhs),
    }
}

fn multiply(lhs: Value, rhs: Value) -> Value {
    match (&lhs, &rhs) {
        (Value::Int(a), Value::Int(b)) => match a.checked_mul(*b) {
            Some(product) => Value::Int(product),
            None => Value::error("integer overflow"),
        },
        (Value::Uint(a), Value::Uint(b)) => match a.checked_mul(*b) {
            Some(product) => Value::Uint(product),
            None => Value::error("unsigned integer overflow"),
        },
        (Value::Double(a), Value::Double(b)) => Value::Double(a * b),
        _ => unsupported("_*_", &lhs, &rhs),
    }
}

fn divide(lhs: Value, rhs: Value) -> Value {
    match (&lhs, &rhs) {
        (Value::Int(_), Value::Int(0)) => Value::error("division by zero"),
        (Value::Int(a), Value::Int(b)) => match a.checked_div(*b) {
            Some(quotient) => Value::Int(quotient),
            None => Value::error("integer overflow"),
        },
        (Value::Uint(_), Value::Uint(0)) => Value::error("division by zero"),
        (Value::Uint(a), Value::Uint(b)) => Value::Uint(a / b),
        // IEEE 754: division by zero yields an infinity
        (Value::Double(a), Value::Double(b)) => Value::Double(a / b),
        _ => unsupported("_/_", &lhs, &rhs),
    }
}

fn modulo(lhs: Value, rhs: Value) -> Value {
    match (&lhs, &rhs) {
        (Value::Int(_), Value::Int(0)) => Value::error("modulus by zero"),
        (Value::Int(a), Value::Int(b)) => match a.checked_rem(*b) {
            Some(remainder) => Value::Int(remainder),
            None => Value::error("integer overflow"),
        },
        (Value::Uint(_), Value::Uint(0)) => Value::error("modulus by zero"),
        (Value::Uint(a), Value::Uint(b)) => Value::Uint(a % b),
        _ => unsupported("_%_", &lhs, &rhs),
    }
}

/// Mixed int/uint arithmetic follows the left operand: the right operand
/// is coerced to the left's kind before the checked operation, and a value
/// outside the left kind's range is an overflow.
fn coerce_to_left(lhs: &Value, rhs: Value) -> Result<Value, Value> {
    match (lhs, &rhs) {
        (Value::Int(_), Value::Uint(u)) => {
            if *u > i64::MAX as u64 {
                Err(Value::error("integer overflow"))
            } else {
                Ok(Value::Int(*u as i64))
            }
        }
        (Value::Uint(_), Value::Int(i)) => {
            if *i < 0 {
                Err(Value::error("unsigned integer overflow"))
            } else {
                Ok(Value::Uint(*i as u64))
            }
        }
        _ => Ok(rhs),
    }
}

fn negate(value: Value) -> Value {
    match value {
        Value::Int(i) => match i.checked_neg() {
            Some(negated) => Value::Int(negated),
            None => Value::error("integer overflow"),
        },
        Value::Double(d) => Value::Double(-d),
        other => other,
    }
}

fn size(value: Value) -> Value {
    match &value {
        // string size counts code points, not bytes
        Value::String(s) => Value::Int(s.chars().count() as i64),
        Value::Bytes(b) => Value::Int(b.len() as i64),
        Value::List(elements) => Value::Int(elements.len() as i64),
        Value::Map(map) => Value::Int(map.len() as i64),
        _ => Value::error(format!(
            "no matching overload for 'size' applied to '{}'",
            value.runtime_type()
        )),
    }
}

fn index(collection: Value, key: Value) -> Value {
    match (&collection, &key) {
        (Value::List(elements), Value::Int(i)) => {
            if *i < 0 || *i as usize >= elements.len() {
                return Value::error(format!("index out of bounds: {i}"));
            }
            elements[*i as usize].clone()
        }
        (Value::Map(map), key) => match map.get(key) {
            Some(value) => value.clone(),
            None => Value::error(format!("no such key: '{key}'")),
        },
        _ => unsupported("_[_]", &collection, &key),
    }
}

fn membership(needle: Value, haystack: Value) -> Value {
    match &haystack {
        Value::List(elements) => Value::Bool(
            elements
                .iter()
                .any(|element| element.equal(&needle) == Value::Bool(true)),
        ),
        Value::Map(map) => Value::Bool(map.contains(&needle)),
        _ => unsupported("@in", &needle, &haystack),
    }
}

fn string_op(lhs: Value, rhs: Value, op: fn(&str, &str) -> bool) -> Value {
    match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) => Value::Bool(op(a, b)),
        _ => unsupported("string operation", &lhs, &rhs),
    }
}

fn matches_regex(text: Value, pattern: Value) -> Value {
    let (Value::String(text), Value::String(pattern)) = (&text, &pattern) else {
        return unsupported("matches", &text, &pattern);
    };

    let mut cache = REGEX_CACHE.lock().expect("regex cache lock");
    let compiled = cache
        .entry(pattern.as_ref().clone())
        .or_insert_with(|| {
            Regex::new(pattern).map_err(|e| format!("invalid regular expression: {e}"))
        });

    match compiled {
        Ok(regex) => Value::Bool(regex.is_match(text)),
        Err(message) => Value::error(message.clone()),
    }
}

fn to_int(value: Value) -> Value {
    match &value {
        Value::Uint(u) => {
            if *u > i64::MAX as u64 {
                Value::error("integer overflow")
            } else {
                Value::Int(*u as i64)
            }
        }
        Value::Double(d) => {
            if d.is_finite() && *d >= -9.223_372_036_854_776e18 && *d < 9.223_372_036_854_776e18 {
                Value::Int(*d as i64)
            } else {
                Value::error("integer overflow")
            }
        }
        Value::String(s) => match s.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::error(format!("cannot convert '{s}' to int")),
        },
        Value::Timestamp(nanos) => Value::Int(nanos.div_euclid(NANOS_PER_SECOND)),
        _ => value,
    }
}

fn to_uint(value: Value) -> Value {
    match &value {
        Value::Int(i) => {
            if *i < 0 {
                Value::error("unsigned integer overflow")
            } else {
                Value::Uint(*i as u64)
            }
        }
        Value::Double(d) => {
            if d.is_finite() && *d >= 0.0 && *d < 1.844_674_407_370_955_2e19 {
                Value::Uint(*d as u64)
            } else {
                Value::error("unsigned integer overflow")
            }
        }
        Value::String(s) => match s.parse::<u64>() {
            Ok(u) => Value::Uint(u),
            Err(_) => Value::error(format!("cannot convert '{s}' to uint")),
        },
        _ => value,
    }
}

fn to_double(value: Value) -> Value {
    match &value {
        Value::Int(i) => Value::Double(*i as f64),
        Value::Uint(u) => Value::Double(*u as f64),
        Value::String(s) => match s.parse::<f64>() {
            Ok(d) => Value::Double(d),
            Err(_) => Value::error(format!("cannot convert '{s}' to double")),
        },
        _ => value,
    }
}

fn to_string(value: Value) -> Value {
    match &value {
        Value::Bytes(b) => match std::str::from_utf8(b) {
            Ok(s) => Value::string(s),
            Err(_) => Value::error("invalid UTF-8 in bytes"),
        },
        Value::Int(_)
        | Value::Uint(_)
        | Value::Double(_)
        | Value::Timestamp(_)
        | Value::Duration(_) => Value::string(value.to_string()),
        _ => value,
    }
}

fn unsupported(function: &str, lhs: &Value, rhs: &Value) -> Value {
    Value::error(format!(
        "no matching overload for '{function}' applied to '({}, {})'",
        lhs.runtime_type(),
        rhs.runtime_type()
    ))
}
