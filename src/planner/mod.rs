//! Planner.
//!
//! Lowers a checked (or unchecked) AST into a tree of interpretables. Call
//! nodes receive the overload candidates resolved at check time; without
//! reference information every name resolves dynamically at evaluation
//! time. Calls whose operands are all literals and whose candidate
//! bindings are pure are folded into constants here, so repeated
//! evaluations do not redo the work.

pub mod interpretable;

use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use log::trace;

use crate::ast::{Constant, Expr, ExprKind, SourceInfo};
use crate::checker::{CheckedExpr, Reference};
use crate::env::provider::TypeProvider;
use crate::env::Env;
use crate::interpreter::activation::{Activation, HierarchicalActivation, MapActivation};
use crate::interpreter::dispatcher::Dispatcher;
use crate::interpreter::Interpreter;
use crate::value::Value;

pub use self::interpretable::Interpretable;

/// A malformed AST shape reachable only through host programmer error.
/// Unlike type issues and runtime errors these fail planning immediately.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanError {
    pub message: String,
}

impl PlanError {
    fn new(message: impl ToString) -> PlanError {
        PlanError {
            message: message.to_string(),
        }
    }
}

impl Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for PlanError {}

pub struct Planner<'a> {
    env: &'a Env,
    checked: Option<&'a CheckedExpr>,
}

impl<'a> Planner<'a> {
    pub fn new(env: &'a Env, checked: Option<&'a CheckedExpr>) -> Planner<'a> {
        Planner { env, checked }
    }

    pub fn plan(&self, expr: &Expr, info: &SourceInfo) -> Result<Program, PlanError> {
        let plan = self.plan_expr(expr)?;

        Ok(Program {
            plan,
            dispatcher: self.env.dispatcher().clone(),
            provider: self.env.provider().clone(),
            constants: self.env.constants().clone(),
            info: info.clone(),
        })
    }

    fn reference(&self, expr: &Expr) -> Option<&Reference> {
        self.checked.and_then(|c| c.ref_map.get(&expr.id))
    }

    fn plan_expr(&self, expr: &Expr) -> Result<Interpretable, PlanError> {
        match &expr.kind {
            ExprKind::Literal(constant) => Ok(Interpretable::Constant {
                id: expr.id,
                value: constant_value(constant),
            }),
            ExprKind::Ident(name) => Ok(self.plan_ident(expr, name)),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => {
                // a select chain resolved to a single declaration at check
                // time plans like the identifier it names
                if let Some(Reference::Ident { name }) = self.reference(expr) {
                    let name = name.clone();
                    return Ok(self.plan_resolved_ident(expr, vec![name]));
                }

                Ok(Interpretable::Select {
                    id: expr.id,
                    operand: Box::new(self.plan_expr(operand)?),
                    field: field.clone(),
                    test_only: *test_only,
                })
            }
            ExprKind::Call {
                target,
                function,
                args,
            } => self.plan_call(expr, target.as_deref(), function, args),
            ExprKind::List { elements } => {
                let elements = elements
                    .iter()
                    .map(|e| self.plan_expr(e))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Interpretable::CreateList {
                    id: expr.id,
                    elements,
                })
            }
            ExprKind::Map { entries } => {
                let entries = entries
                    .iter()
                    .map(|(key, value)| Ok((self.plan_expr(key)?, self.plan_expr(value)?)))
                    .collect::<Result<Vec<_>, PlanError>>()?;
                Ok(Interpretable::CreateMap {
                    id: expr.id,
                    entries,
                })
            }
            ExprKind::Struct { type_name, fields } => {
                let canonical = match self.reference(expr) {
                    Some(Reference::Ident { name }) => name.clone(),
                    _ => self
                        .env
                        .container()
                        .candidates(type_name)
                        .into_iter()
                        .find(|candidate| self.env.provider().has_struct(candidate))
                        .unwrap_or_else(|| type_name.clone()),
                };
                let fields = fields
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.plan_expr(value)?)))
                    .collect::<Result<Vec<_>, PlanError>>()?;
                Ok(Interpretable::CreateStruct {
                    id: expr.id,
                    type_name: canonical,
                    fields,
                })
            }
            ExprKind::Comprehension(comp) => Ok(Interpretable::Comprehension {
                id: expr.id,
                iter_range: Box::new(self.plan_expr(&comp.iter_range)?),
                iter_var: comp.iter_var.clone(),
                accu_var: comp.accu_var.clone(),
                accu_init: Box::new(self.plan_expr(&comp.accu_init)?),
                loop_condition: Box::new(self.plan_expr(&comp.loop_condition)?),
                loop_step: Box::new(self.plan_expr(&comp.loop_step)?),
                result: Box::new(self.plan_expr(&comp.result)?),
            }),
        }
    }

    fn plan_ident(&self, expr: &Expr, name: &str) -> Interpretable {
        match self.reference(expr) {
            Some(Reference::Ident { name: canonical }) => {
                self.plan_resolved_ident(expr, vec![canonical.clone()])
            }
            _ => {
                let names = self.env.container().candidates(name);
                self.plan_resolved_ident(expr, names)
            }
        }
    }

    fn plan_resolved_ident(&self, expr: &Expr, names: Vec<String>) -> Interpretable {
        // enum values are compile-time constants
        for name in &names {
            if let Some((type_name, value)) = self.env.provider().enum_value(name) {
                return Interpretable::Constant {
                    id: expr.id,
                    value: Value::enum_value(type_name, value),
                };
            }
        }

        Interpretable::Ident {
            id: expr.id,
            names,
        }
    }

    fn plan_call(
        &self,
        expr: &Expr,
        target: Option<&Expr>,
        function: &str,
        args: &[Expr],
    ) -> Result<Interpretable, PlanError> {
        let (function, overload_ids) = match self.reference(expr) {
            Some(Reference::Function { name, overload_ids }) => {
                (name.clone(), overload_ids.clone())
            }
            _ => (function.to_string(), vec![]),
        };

        // logical operators and the conditional evaluate lazily and are
        // planned as dedicated shapes
        match function.as_str() {
            "_&&_" | "_||_" if target.is_none() => {
                if args.len() != 2 {
                    return Err(PlanError::new(format!(
                        "malformed call to '{function}': expected 2 arguments, found {}",
                        args.len()
                    )));
                }
                let lhs = Box::new(self.plan_expr(&args[0])?);
                let rhs = Box::new(self.plan_expr(&args[1])?);
                return Ok(if function == "_&&_" {
                    Interpretable::And {
                        id: expr.id,
                        lhs,
                        rhs,
                    }
                } else {
                    Interpretable::Or {
                        id: expr.id,
                        lhs,
                        rhs,
                    }
                });
            }
            "_?_:_" if target.is_none() => {
                if args.len() != 3 {
                    return Err(PlanError::new(format!(
                        "malformed conditional: expected 3 arguments, found {}",
                        args.len()
                    )));
                }
                return Ok(Interpretable::Conditional {
                    id: expr.id,
                    condition: Box::new(self.plan_expr(&args[0])?),
                    truthy: Box::new(self.plan_expr(&args[1])?),
                    falsy: Box::new(self.plan_expr(&args[2])?),
                });
            }
            _ => {}
        }

        // a member call whose reference resolved under a different name was
        // a namespaced global call; its receiver is not an argument
        let namespaced = target.is_some()
            && self.reference(expr).is_some()
            && function != call_function_name(expr);

        let mut planned_args = vec![];
        if let Some(target) = target {
            if !namespaced {
                planned_args.push(self.plan_expr(target)?);
            }
        }
        for arg in args {
            planned_args.push(self.plan_expr(arg)?);
        }

        if let Some(folded) = self.try_fold(expr, &function, &overload_ids, &planned_args) {
            return Ok(folded);
        }

        Ok(Interpretable::Call {
            id: expr.id,
            function,
            overload_ids,
            args: planned_args,
        })
    }

    /// Fold a pure all-literal call at plan time. Errors and unknowns stay
    /// unfolded so they surface with evaluation-time semantics.
    fn try_fold(
        &self,
        expr: &Expr,
        function: &str,
        overload_ids: &[String],
        args: &[Interpretable],
    ) -> Option<Interpretable> {
        if !self.env.dispatcher().is_pure(overload_ids) {
            return None;
        }
        let literals = args
            .iter()
            .map(|arg| match arg {
                Interpretable::Constant { value, .. } => Some(value.clone()),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()?;

        let folded =
            self.env
                .dispatcher()
                .dispatch(expr.id, function, overload_ids, &literals);
        if folded.is_error() || folded.is_unknown() {
            return None;
        }
        trace!("folded call to '{function}' at node {}", expr.id);

        Some(Interpretable::Constant {
            id: expr.id,
            value: folded,
        })
    }
}

fn call_function_name(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Call { function, .. } => function,
        _ => "",
    }
}

pub(crate) fn constant_value(constant: &Constant) -> Value {
    match constant {
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::Int(*i),
        Constant::Uint(u) => Value::Uint(*u),
        Constant::Double(d) => Value::Double(*d),
        Constant::String(s) => Value::string(s),
        Constant::Bytes(b) => Value::bytes(b.clone()),
        Constant::Null => Value::Null,
    }
}

/// An immutable evaluable program. May be shared across threads; each
/// evaluation borrows its own activation, and the dispatcher and reference
/// tables are read-only during eval.
pub struct Program {
    plan: Interpretable,
    dispatcher: Arc<Dispatcher>,
    provider: Arc<dyn TypeProvider>,
    constants: Arc<MapActivation>,
    info: SourceInfo,
}

/// A runtime error that reached the top of evaluation, formatted with the
/// offending node's source location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EvalError {
    pub message: String,
    pub location: Option<(usize, usize)>,
}

impl Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some((line, column)) => write!(f, "{line}:{column}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for EvalError {}

impl Program {
    /// Evaluate against an activation. The environment's pre-bound
    /// constants sit below the caller's bindings; a fresh scope chain is
    /// built per call, so a program can serve concurrent evaluations.
    pub fn eval(&self, activation: &dyn Activation) -> Result<Value, EvalError> {
        let scoped = HierarchicalActivation::new(activation, self.constants.as_ref());
        let interpreter = Interpreter::new(&self.dispatcher, self.provider.as_ref());
        let value = interpreter.eval(&self.plan, &scoped);

        match value {
            Value::Error(error) => Err(EvalError {
                message: error.message.clone(),
                location: error.expr_id.and_then(|id| self.info.location(id)),
            }),
            other => Ok(other),
        }
    }

    pub(crate) fn plan(&self) -> &Interpretable {
        &self.plan
    }
}
