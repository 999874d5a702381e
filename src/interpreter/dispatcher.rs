//! Runtime function dispatch.
//!
//! A registry from overload id to callable. The planner hands each call
//! node the candidate overload ids resolved at check time; at evaluation
//! the first candidate whose declared parameter kinds match the runtime
//! argument kinds wins. Unchecked programs fall back to name-based
//! dispatch over every overload of the function.

use std::sync::Arc;

use indexmap::IndexMap;
use log::trace;

use crate::ast::ExprId;
use crate::env::decls::Overload;
use crate::types::CelType;
use crate::value::Value;

pub type UnaryFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type BinaryFn = Arc<dyn Fn(Value, Value) -> Value + Send + Sync>;
pub type NaryFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// The callable behind one overload, in one of the three call shapes.
#[derive(Clone)]
pub enum CallShape {
    Unary(UnaryFn),
    Binary(BinaryFn),
    Nary(NaryFn),
}

impl CallShape {
    fn arity_matches(&self, arity: usize) -> bool {
        match self {
            CallShape::Unary(_) => arity == 1,
            CallShape::Binary(_) => arity == 2,
            CallShape::Nary(_) => true,
        }
    }

    fn call(&self, args: &[Value]) -> Value {
        match self {
            CallShape::Unary(f) => f(args[0].clone()),
            CallShape::Binary(f) => f(args[0].clone(), args[1].clone()),
            CallShape::Nary(f) => f(args),
        }
    }
}

/// Runtime binding for a declared overload, registered at environment
/// construction.
#[derive(Clone)]
pub struct FunctionBinding {
    pub overload_id: String,
    pub shape: CallShape,
    /// Pure bindings with all-literal arguments are folded at plan time.
    pub pure: bool,
}

impl FunctionBinding {
    pub fn unary(
        overload_id: impl ToString,
        f: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) -> FunctionBinding {
        FunctionBinding {
            overload_id: overload_id.to_string(),
            shape: CallShape::Unary(Arc::new(f)),
            pure: false,
        }
    }

    pub fn binary(
        overload_id: impl ToString,
        f: impl Fn(Value, Value) -> Value + Send + Sync + 'static,
    ) -> FunctionBinding {
        FunctionBinding {
            overload_id: overload_id.to_string(),
            shape: CallShape::Binary(Arc::new(f)),
            pure: false,
        }
    }

    pub fn nary(
        overload_id: impl ToString,
        f: impl Fn(&[Value]) -> Value + Send + Sync + 'static,
    ) -> FunctionBinding {
        FunctionBinding {
            overload_id: overload_id.to_string(),
            shape: CallShape::Nary(Arc::new(f)),
            pure: false,
        }
    }

    pub fn pure(mut self) -> FunctionBinding {
        self.pure = true;
        self
    }
}

#[derive(Clone)]
struct OverloadEntry {
    function: String,
    params: Vec<CelType>,
    shape: CallShape,
    pure: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchAddError {
    pub overload_id: String,
    pub message: String,
}

impl std::fmt::Display for DispatchAddError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "overload '{}': {}", self.overload_id, self.message)
    }
}

impl std::error::Error for DispatchAddError {}

/// Append-only at environment-build time, frozen once a program holds it.
#[derive(Clone, Default)]
pub struct Dispatcher {
    overloads: IndexMap<String, OverloadEntry>,
    by_function: IndexMap<String, Vec<String>>,
}

impl Dispatcher {
    pub fn new() -> Dispatcher {
        Dispatcher::default()
    }

    pub fn add(
        &mut self,
        function: &str,
        decl: &Overload,
        binding: FunctionBinding,
    ) -> Result<(), DispatchAddError> {
        if decl.id != binding.overload_id {
            return Err(DispatchAddError {
                overload_id: binding.overload_id,
                message: format!("binding does not match declaration '{}'", decl.id),
            });
        }
        if !binding.shape.arity_matches(decl.params.len()) {
            return Err(DispatchAddError {
                overload_id: binding.overload_id,
                message: format!(
                    "call shape does not accept {} arguments",
                    decl.params.len()
                ),
            });
        }
        if self.overloads.contains_key(&decl.id) {
            return Err(DispatchAddError {
                overload_id: decl.id.clone(),
                message: "already registered".to_string(),
            });
        }

        self.overloads.insert(
            decl.id.clone(),
            OverloadEntry {
                function: function.to_string(),
                params: decl.params.clone(),
                shape: binding.shape,
                pure: binding.pure,
            },
        );
        self.by_function
            .entry(function.to_string())
            .or_default()
            .push(decl.id.clone());

        Ok(())
    }

    pub fn has_overload(&self, overload_id: &str) -> bool {
        self.overloads.contains_key(overload_id)
    }

    /// Whether every candidate is bound and pure, making a call with
    /// literal arguments foldable.
    pub fn is_pure(&self, overload_ids: &[String]) -> bool {
        !overload_ids.is_empty()
            && overload_ids
                .iter()
                .all(|id| self.overloads.get(id).map(|e| e.pure).unwrap_or(false))
    }

    /// Dispatch a call. `overload_ids` are the check-time candidates; when
    /// empty, all overloads registered under `function` are tried.
    pub fn dispatch(
        &self,
        expr_id: ExprId,
        function: &str,
        overload_ids: &[String],
        args: &[Value],
    ) -> Value {
        let named;
        let candidates: &[String] = if overload_ids.is_empty() {
            named = self.by_function.get(function).cloned().unwrap_or_default();
            named.as_slice()
        } else {
            overload_ids
        };

        for id in candidates {
            let Some(entry) = self.overloads.get(id) else {
                continue;
            };
            if entry.params.len() != args.len() || !entry.shape.arity_matches(args.len()) {
                continue;
            }
            if runtime_kinds_match(&entry.params, args) {
                return entry.shape.call(args);
            }
            trace!("overload '{id}' rejected for '{function}'");
        }

        let arg_types = args
            .iter()
            .map(|a| a.runtime_type().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Value::error_at(
            expr_id,
            format!("no matching overload for '{function}' applied to ({arg_types})"),
        )
    }
}

fn runtime_kinds_match(params: &[CelType], args: &[Value]) -> bool {
    params
        .iter()
        .zip(args.iter())
        .all(|(param, arg)| kind_matches(param, arg))
}

fn kind_matches(param: &CelType, arg: &Value) -> bool {
    match param {
        CelType::Dyn | CelType::TypeParam(_) | CelType::Error => true,
        CelType::Bool => matches!(arg, Value::Bool(_)),
        CelType::Int => matches!(arg, Value::Int(_) | Value::Enum(_)),
        CelType::Uint => matches!(arg, Value::Uint(_)),
        CelType::Double => matches!(arg, Value::Double(_)),
        CelType::String => matches!(arg, Value::String(_)),
        CelType::Bytes => matches!(arg, Value::Bytes(_)),
        CelType::Null => matches!(arg, Value::Null),
        CelType::List(_) => matches!(arg, Value::List(_)),
        CelType::Map(_, _) => matches!(arg, Value::Map(_)),
        CelType::Type(_) => matches!(arg, Value::Type(_)),
        CelType::Struct(name) => {
            matches!(arg, Value::Struct(s) if s.type_name == *name)
        }
        CelType::Opaque(name, _) => match name.as_str() {
            "timestamp" => matches!(arg, Value::Timestamp(_)),
            "duration" => matches!(arg, Value::Duration(_)),
            _ => matches!(arg, Value::Enum(e) if e.type_name == *name),
        },
        CelType::Optional(_) => matches!(arg, Value::Optional(_)),
    }
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, FunctionBinding};
    use crate::env::decls::Overload;
    use crate::types::CelType;
    use crate::value::Value;

    fn dispatcher() -> Dispatcher {
        let mut d = Dispatcher::new();
        d.add(
            "double",
            &Overload::global("double_int", vec![CelType::Int], CelType::Int),
            FunctionBinding::unary("double_int", |v| match v {
                Value::Int(i) => Value::Int(i * 2),
                other => other,
            })
            .pure(),
        )
        .unwrap();
        d.add(
            "double",
            &Overload::global("double_string", vec![CelType::String], CelType::String),
            FunctionBinding::unary("double_string", |v| match v {
                Value::String(s) => Value::string(format!("{s}{s}")),
                other => other,
            }),
        )
        .unwrap();
        d
    }

    #[test]
    fn test_dispatch_by_runtime_kind() {
        let d = dispatcher();
        let ids = vec!["double_int".to_string(), "double_string".to_string()];

        assert_eq!(d.dispatch(1, "double", &ids, &[Value::Int(3)]), Value::Int(6));
        assert_eq!(
            d.dispatch(1, "double", &ids, &[Value::string("ab")]),
            Value::string("abab")
        );
    }

    #[test]
    fn test_dispatch_without_ref_entries() {
        let d = dispatcher();
        assert_eq!(d.dispatch(1, "double", &[], &[Value::Int(4)]), Value::Int(8));
    }

    #[test]
    fn test_no_matching_overload() {
        let d = dispatcher();
        let result = d.dispatch(1, "double", &[], &[Value::Bool(true)]);
        let Value::Error(err) = result else {
            panic!("expected an error value");
        };
        assert!(err.message.contains("no matching overload"));
        assert_eq!(err.expr_id, Some(1));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut d = dispatcher();
        let result = d.add(
            "double",
            &Overload::global("double_int", vec![CelType::Int], CelType::Int),
            FunctionBinding::unary("double_int", |v| v),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_purity() {
        let d = dispatcher();
        assert!(d.is_pure(&["double_int".to_string()]));
        assert!(!d.is_pure(&["double_string".to_string()]));
        assert!(!d.is_pure(&[]));
    }
}
