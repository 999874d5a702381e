//! Tree-walking interpreter.
//!
//! Single-threaded and synchronous: no operation suspends, blocks or
//! yields. Subexpressions evaluate left-to-right in argument order; the
//! short-circuit operators and the conditional are the only exceptions.
//! Errors propagate through strict operators and are swallowed by the
//! neutral side of `&&`/`||`; unknowns compose the same way, with error
//! winning when both meet.

pub mod activation;
pub mod dispatcher;

use std::sync::Arc;

use crate::env::provider::TypeProvider;
use crate::planner::Interpretable;
use crate::value::adapter::default_value;
use crate::value::{StructValue, MapValue, UnknownValue, Value};

use self::activation::{Activation, Resolution, VarActivation};
use self::dispatcher::Dispatcher;

pub struct Interpreter<'a> {
    dispatcher: &'a Dispatcher,
    provider: &'a dyn TypeProvider,
}

impl<'a> Interpreter<'a> {
    pub fn new(dispatcher: &'a Dispatcher, provider: &'a dyn TypeProvider) -> Interpreter<'a> {
        Interpreter {
            dispatcher,
            provider,
        }
    }

    pub fn eval(&self, node: &Interpretable, activation: &dyn Activation) -> Value {
        match node {
            Interpretable::Constant { value, .. } => value.clone(),
            Interpretable::Ident { id, names } => self.eval_ident(*id, names, activation),
            Interpretable::Select {
                id,
                operand,
                field,
                test_only,
            } => self.eval_select(*id, operand, field, *test_only, activation),
            Interpretable::Call {
                id,
                function,
                overload_ids,
                args,
            } => self.eval_call(*id, function, overload_ids, args, activation),
            Interpretable::CreateList { id, elements } => {
                self.eval_list(*id, elements, activation)
            }
            Interpretable::CreateMap { id, entries } => self.eval_map(*id, entries, activation),
            Interpretable::CreateStruct {
                id,
                type_name,
                fields,
            } => self.eval_struct(*id, type_name, fields, activation),
            Interpretable::And { id, lhs, rhs } => self.eval_and(*id, lhs, rhs, activation),
            Interpretable::Or { id, lhs, rhs } => self.eval_or(*id, lhs, rhs, activation),
            Interpretable::Conditional {
                condition,
                truthy,
                falsy,
                ..
            } => self.eval_conditional(condition, truthy, falsy, activation),
            Interpretable::Comprehension {
                id,
                iter_range,
                iter_var,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
            } => self.eval_comprehension(
                *id,
                iter_range,
                iter_var,
                accu_var,
                accu_init,
                loop_condition,
                loop_step,
                result,
                activation,
            ),
        }
    }

    fn eval_ident(&self, id: u64, names: &[String], activation: &dyn Activation) -> Value {
        for name in names {
            match activation.resolve(name) {
                Resolution::Bound(value) => return value,
                Resolution::Unknown => return Value::unknown(id),
                Resolution::Absent => {}
            }
            if let Some((type_name, value)) = self.provider.enum_value(name) {
                return Value::enum_value(type_name, value);
            }
        }

        let source_name = names.last().map(String::as_str).unwrap_or("");
        Value::error_at(id, format!("no such attribute: '{source_name}'"))
    }

    fn eval_select(
        &self,
        id: u64,
        operand: &Interpretable,
        field: &str,
        test_only: bool,
        activation: &dyn Activation,
    ) -> Value {
        let operand = self.eval(operand, activation);
        if operand.is_error() || operand.is_unknown() {
            return operand;
        }

        if test_only {
            return match &operand {
                Value::Map(map) => Value::Bool(map.contains(&Value::string(field))),
                // a struct field is present iff it is set to something other
                // than its declared default
                Value::Struct(s) => match s.get(field) {
                    None => Value::Bool(false),
                    Some(stored) => match self.provider.field_type(&s.type_name, field) {
                        Some(field_type) => {
                            let default = default_value(&field_type);
                            Value::Bool(stored.equal(&default) != Value::Bool(true))
                        }
                        None => Value::Bool(true),
                    },
                },
                other => Value::error_at(
                    id,
                    format!(
                        "expression of type '{}' cannot be the operand of a presence test",
                        other.runtime_type()
                    ),
                ),
            };
        }

        match &operand {
            Value::Map(map) => match map.get(&Value::string(field)) {
                Some(value) => value.clone(),
                None => Value::error_at(id, format!("no such key: '{field}'")),
            },
            Value::Struct(s) => match s.get(field) {
                Some(value) => value.clone(),
                // absent fields read back as the declared default
                None => match self.provider.field_type(&s.type_name, field) {
                    Some(field_type) => default_value(&field_type),
                    None => Value::error_at(id, format!("no such field: '{field}'")),
                },
            },
            other => Value::error_at(
                id,
                format!(
                    "expression of type '{}' cannot be the operand of a select",
                    other.runtime_type()
                ),
            ),
        }
    }

    fn eval_call(
        &self,
        id: u64,
        function: &str,
        overload_ids: &[String],
        args: &[Interpretable],
        activation: &dyn Activation,
    ) -> Value {
        let mut values = Vec::with_capacity(args.len());
        let mut unknown: Option<UnknownValue> = None;

        for arg in args {
            let value = self.eval(arg, activation);
            match &value {
                Value::Error(error) => {
                    return Value::Error(Arc::new(error.as_ref().clone().or_at(arg.id())))
                }
                Value::Unknown(u) => {
                    unknown = Some(match unknown {
                        Some(merged) => merged.merge(u),
                        None => u.as_ref().clone(),
                    });
                }
                _ => {}
            }
            values.push(value);
        }

        if let Some(unknown) = unknown {
            return Value::Unknown(Arc::new(unknown));
        }

        match self.dispatcher.dispatch(id, function, overload_ids, &values) {
            Value::Error(error) => Value::Error(Arc::new(error.as_ref().clone().or_at(id))),
            value => value,
        }
    }

    fn eval_list(&self, _id: u64, elements: &[Interpretable], activation: &dyn Activation) -> Value {
        let mut values = Vec::with_capacity(elements.len());
        let mut unknown: Option<UnknownValue> = None;

        for element in elements {
            let value = self.eval(element, activation);
            match &value {
                Value::Error(_) => return value,
                Value::Unknown(u) => {
                    unknown = Some(match unknown {
                        Some(merged) => merged.merge(u),
                        None => u.as_ref().clone(),
                    });
                }
                _ => {}
            }
            values.push(value);
        }

        match unknown {
            Some(unknown) => Value::Unknown(Arc::new(unknown)),
            None => Value::list(values),
        }
    }

    fn eval_map(
        &self,
        id: u64,
        entries: &[(Interpretable, Interpretable)],
        activation: &dyn Activation,
    ) -> Value {
        let mut map = MapValue::new();
        let mut unknown: Option<UnknownValue> = None;

        for (key_node, value_node) in entries {
            let key = self.eval(key_node, activation);
            if key.is_error() {
                return key;
            }
            let value = self.eval(value_node, activation);
            if value.is_error() {
                return value;
            }

            for part in [&key, &value] {
                if let Value::Unknown(u) = part {
                    unknown = Some(match unknown {
                        Some(merged) => merged.merge(u),
                        None => u.as_ref().clone(),
                    });
                }
            }
            if unknown.is_some() {
                continue;
            }

            if let Err(message) = map.insert(key, value) {
                return Value::error_at(id, message);
            }
        }

        match unknown {
            Some(unknown) => Value::Unknown(Arc::new(unknown)),
            None => Value::map(map),
        }
    }

    fn eval_struct(
        &self,
        id: u64,
        type_name: &str,
        fields: &[(String, Interpretable)],
        activation: &dyn Activation,
    ) -> Value {
        if !self.provider.has_struct(type_name) {
            return Value::error_at(id, format!("no such message type: '{type_name}'"));
        }

        let mut value = StructValue::new(type_name);
        let mut unknown: Option<UnknownValue> = None;

        for (field, field_node) in fields {
            if self.provider.field_type(type_name, field).is_none() {
                return Value::error_at(id, format!("no such field: '{field}'"));
            }
            let field_value = self.eval(field_node, activation);
            match &field_value {
                Value::Error(_) => return field_value,
                Value::Unknown(u) => {
                    unknown = Some(match unknown {
                        Some(merged) => merged.merge(u),
                        None => u.as_ref().clone(),
                    });
                }
                _ => {}
            }
            value.fields.insert(field.clone(), field_value);
        }

        match unknown {
            Some(unknown) => Value::Unknown(Arc::new(unknown)),
            None => Value::struct_value(value),
        }
    }

    /// `false && e` and `e && false` both yield `false` regardless of what
    /// `e` would do; errors and unknowns survive only when neither side
    /// settles the result.
    fn eval_and(
        &self,
        id: u64,
        lhs: &Interpretable,
        rhs: &Interpretable,
        activation: &dyn Activation,
    ) -> Value {
        let lhs = self.eval(lhs, activation);
        if lhs.as_bool() == Some(false) {
            return Value::Bool(false);
        }

        let rhs = self.eval(rhs, activation);
        if rhs.as_bool() == Some(false) {
            return Value::Bool(false);
        }

        match (&lhs, &rhs) {
            (Value::Bool(true), _) => logical_operand(id, "_&&_", rhs.clone()),
            (Value::Error(_), _) => lhs,
            (Value::Unknown(a), Value::Unknown(b)) => Value::Unknown(Arc::new(a.merge(b))),
            (Value::Unknown(_), Value::Error(_)) => rhs,
            (Value::Unknown(_), _) => lhs,
            _ => logical_operand(id, "_&&_", lhs),
        }
    }

    fn eval_or(
        &self,
        id: u64,
        lhs: &Interpretable,
        rhs: &Interpretable,
        activation: &dyn Activation,
    ) -> Value {
        let lhs = self.eval(lhs, activation);
        if lhs.as_bool() == Some(true) {
            return Value::Bool(true);
        }

        let rhs = self.eval(rhs, activation);
        if rhs.as_bool() == Some(true) {
            return Value::Bool(true);
        }

        match (&lhs, &rhs) {
            (Value::Bool(false), _) => logical_operand(id, "_||_", rhs.clone()),
            (Value::Error(_), _) => lhs,
            (Value::Unknown(a), Value::Unknown(b)) => Value::Unknown(Arc::new(a.merge(b))),
            (Value::Unknown(_), Value::Error(_)) => rhs,
            (Value::Unknown(_), _) => lhs,
            _ => logical_operand(id, "_||_", lhs),
        }
    }

    fn eval_conditional(
        &self,
        condition: &Interpretable,
        truthy: &Interpretable,
        falsy: &Interpretable,
        activation: &dyn Activation,
    ) -> Value {
        let condition_value = self.eval(condition, activation);
        match condition_value {
            Value::Bool(true) => self.eval(truthy, activation),
            Value::Bool(false) => self.eval(falsy, activation),
            Value::Error(_) | Value::Unknown(_) => condition_value,
            other => Value::error_at(
                condition.id(),
                format!(
                    "expected type 'bool' but found '{}'",
                    other.runtime_type()
                ),
            ),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn eval_comprehension(
        &self,
        id: u64,
        iter_range: &Interpretable,
        iter_var: &str,
        accu_var: &str,
        accu_init: &Interpretable,
        loop_condition: &Interpretable,
        loop_step: &Interpretable,
        result: &Interpretable,
        activation: &dyn Activation,
    ) -> Value {
        let range = self.eval(iter_range, activation);
        if range.is_error() || range.is_unknown() {
            return range;
        }

        // maps iterate over their keys in stored insertion order
        let items: Vec<Value> = match &range {
            Value::List(elements) => elements.as_ref().clone(),
            Value::Map(map) => map.keys().cloned().collect(),
            other => {
                return Value::error_at(
                    id,
                    format!(
                        "expression of type '{}' cannot be the range of a comprehension",
                        other.runtime_type()
                    ),
                )
            }
        };

        let mut accu = self.eval(accu_init, activation);

        for item in items {
            let accu_frame = VarActivation::new(accu_var, accu.clone(), activation);
            let iter_frame = VarActivation::new(iter_var, item, &accu_frame);

            let condition = self.eval(loop_condition, &iter_frame);
            match condition {
                Value::Bool(true) => {}
                Value::Bool(false) => break,
                Value::Error(_) | Value::Unknown(_) => return condition,
                other => {
                    return Value::error_at(
                        loop_condition.id(),
                        format!(
                            "expected type 'bool' but found '{}'",
                            other.runtime_type()
                        ),
                    )
                }
            }

            accu = self.eval(loop_step, &iter_frame);
        }

        let result_frame = VarActivation::new(accu_var, accu, activation);
        self.eval(result, &result_frame)
    }
}

/// A non-boolean operand that survived short-circuiting is a dispatch
/// error; errors and unknowns pass through.
fn logical_operand(id: u64, function: &str, value: Value) -> Value {
    match &value {
        Value::Bool(_) | Value::Error(_) | Value::Unknown(_) => value,
        other => Value::error_at(
            id,
            format!(
                "no matching overload for '{function}' applied to '{}'",
                other.runtime_type()
            ),
        ),
    }
}
