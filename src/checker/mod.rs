//! Type checker.
//!
//! Traverses the AST post-order and assigns every node a type in the type
//! map and, for identifiers and calls, a reference entry in the ref map.
//! Type errors never abort the traversal: they are collected as issues and
//! the offending node is typed `error` so checking can continue. Overloads
//! resolve against a substitution map that is copied per candidate, letting
//! parametric signatures be matched speculatively. At the end of traversal
//! every recorded type is rewritten once through the final substitution so
//! type parameters resolved late become concrete throughout.

pub mod error;
mod scope;
mod substitution;

use std::collections::HashMap;

use log::debug;

use crate::ast::{Comprehension, Constant, Expr, ExprId, ExprKind, SourceInfo};
use crate::env::decls::FunctionDecl;
use crate::env::Env;
use crate::types::CelType;

pub use self::error::{Issue, IssueKind, Issues};
use self::scope::DeclScope;
pub use self::substitution::Substitution;

/// Overload id recorded for the planner when a call is the ternary
/// conditional, which has no dispatchable binding.
pub const CONDITIONAL_OVERLOAD: &str = "conditional";

/// Per-node record of the canonical name or overload set resolved at check
/// time.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Reference {
    Ident {
        name: String,
    },
    Function {
        name: String,
        overload_ids: Vec<String>,
    },
}

/// A checked AST: the expression plus the side tables the planner and the
/// interpreter consume.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckedExpr {
    pub expr: Expr,
    pub type_map: HashMap<ExprId, CelType>,
    pub ref_map: HashMap<ExprId, Reference>,
}

impl CheckedExpr {
    /// Wrap an expression that skipped checking; every reference resolves
    /// dynamically at evaluation time.
    pub fn unchecked(expr: Expr) -> CheckedExpr {
        CheckedExpr {
            expr,
            type_map: HashMap::new(),
            ref_map: HashMap::new(),
        }
    }

    /// The inferred type of the root expression.
    pub fn result_type(&self) -> CelType {
        self.type_map
            .get(&self.expr.id)
            .cloned()
            .unwrap_or(CelType::Dyn)
    }
}

pub struct Checker<'a> {
    env: &'a Env,
    info: &'a SourceInfo,
    scope: DeclScope,
    sub: Substitution,
    type_map: HashMap<ExprId, CelType>,
    ref_map: HashMap<ExprId, Reference>,
    issues: Issues,
    next_type_var: u32,
}

impl<'a> Checker<'a> {
    pub fn check(env: &Env, expr: &Expr, info: &SourceInfo) -> Result<CheckedExpr, Issues> {
        let mut checker = Checker {
            env,
            info,
            scope: DeclScope::new(),
            sub: Substitution::default(),
            type_map: HashMap::new(),
            ref_map: HashMap::new(),
            issues: Issues::default(),
            next_type_var: 0,
        };

        checker.check_expr(expr);
        debug!(
            "checked {} nodes, {} issues",
            checker.type_map.len(),
            checker.issues.len()
        );

        if !checker.issues.is_empty() {
            return Err(checker.issues);
        }

        let type_map = checker
            .type_map
            .iter()
            .map(|(id, ty)| (*id, checker.sub.finalize(ty)))
            .collect();

        Ok(CheckedExpr {
            expr: expr.clone(),
            type_map,
            ref_map: checker.ref_map,
        })
    }

    fn report(&mut self, id: ExprId, kind: IssueKind, message: impl ToString) {
        self.issues
            .push(Issue::at(kind, message, self.info.location(id)));
    }

    fn set_type(&mut self, id: ExprId, ty: CelType) {
        self.type_map.insert(id, ty);
    }

    fn type_of(&self, expr: &Expr) -> CelType {
        self.type_map
            .get(&expr.id)
            .cloned()
            .unwrap_or(CelType::Dyn)
    }

    fn fresh_type_var(&mut self) -> String {
        let name = format!("T%{}", self.next_type_var);
        self.next_type_var += 1;
        name
    }

    fn check_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(constant) => {
                let ty = match constant {
                    Constant::Bool(_) => CelType::Bool,
                    Constant::Int(_) => CelType::Int,
                    Constant::Uint(_) => CelType::Uint,
                    Constant::Double(_) => CelType::Double,
                    Constant::String(_) => CelType::String,
                    Constant::Bytes(_) => CelType::Bytes,
                    Constant::Null => CelType::Null,
                };
                self.set_type(expr.id, ty);
            }
            ExprKind::Ident(name) => self.check_ident(expr.id, name),
            ExprKind::Select {
                operand,
                field,
                test_only,
            } => self.check_select(expr, operand, field, *test_only),
            ExprKind::Call {
                target,
                function,
                args,
            } => self.check_call(expr, target.as_deref(), function, args),
            ExprKind::List { elements } => self.check_list(expr.id, elements),
            ExprKind::Map { entries } => self.check_map(expr.id, entries),
            ExprKind::Struct { type_name, fields } => {
                self.check_struct(expr.id, type_name, fields)
            }
            ExprKind::Comprehension(comp) => self.check_comprehension(expr.id, comp),
        }
    }

    fn check_ident(&mut self, id: ExprId, name: &str) {
        // comprehension variables shadow environment declarations
        if let Some(ty) = self.scope.lookup(name) {
            self.set_type(id, ty);
            self.ref_map.insert(
                id,
                Reference::Ident {
                    name: name.to_string(),
                },
            );
            return;
        }

        if let Some((canonical, ty)) = self.resolve_candidates(name) {
            self.set_type(id, ty);
            self.ref_map.insert(id, Reference::Ident { name: canonical });
            return;
        }

        self.report(
            id,
            IssueKind::UndeclaredReference,
            format!(
                "undeclared reference to '{name}' (in container '{}')",
                self.env.container().name()
            ),
        );
        self.set_type(id, CelType::Error);
    }

    /// Try the container's candidate names against the identifier table and
    /// the provider's enum values, most specific first.
    fn resolve_candidates(&self, name: &str) -> Option<(String, CelType)> {
        for candidate in self.env.container().candidates(name) {
            if let Some(decl) = self.env.find_ident(&candidate) {
                return Some((candidate, decl.ty.clone()));
            }
            if self.env.provider().enum_value(&candidate).is_some() {
                return Some((candidate, CelType::Int));
            }
        }
        None
    }

    /// Flatten a select chain whose leaf is an identifier into a dotted
    /// name (`pkg.Enum.VALUE`).
    fn qualified_name(expr: &Expr) -> Option<String> {
        match &expr.kind {
            ExprKind::Ident(name) => Some(name.clone()),
            ExprKind::Select {
                operand,
                field,
                test_only: false,
            } => Self::qualified_name(operand).map(|prefix| format!("{prefix}.{field}")),
            _ => None,
        }
    }

    fn check_select(&mut self, expr: &Expr, operand: &Expr, field: &str, test_only: bool) {
        // qualified-name pre-pass: a whole select chain may name one
        // declaration, e.g. an enum value or a namespaced variable
        if !test_only {
            if let Some(name) = Self::qualified_name(expr) {
                // a locally shadowed leaf disables the pre-pass
                let shadowed = Self::qualified_name(operand)
                    .map(|prefix| {
                        let leaf = prefix.split('.').next().unwrap_or(&prefix).to_string();
                        self.scope.lookup(&leaf).is_some()
                    })
                    .unwrap_or(false);
                if !shadowed {
                    if let Some((canonical, ty)) = self.resolve_candidates(&name) {
                        self.set_type(expr.id, ty);
                        self.ref_map
                            .insert(expr.id, Reference::Ident { name: canonical });
                        return;
                    }
                }
            }
        }

        self.check_expr(operand);
        let operand_type = self.sub.resolve(&self.type_of(operand));

        let field_type = match &operand_type {
            CelType::Map(_, value) => value.as_ref().clone(),
            CelType::Struct(name) => match self.env.provider().field_type(name, field) {
                Some(ty) => ty,
                None => {
                    self.report(
                        expr.id,
                        IssueKind::UndefinedField,
                        format!("undefined field '{field}'"),
                    );
                    CelType::Dyn
                }
            },
            CelType::TypeParam(name) => {
                // keep later uses of the parameter consistent with the
                // dynamic access
                self.sub.bind(name, CelType::Dyn);
                CelType::Dyn
            }
            CelType::Dyn | CelType::Error => CelType::Dyn,
            other => {
                self.report(
                    expr.id,
                    IssueKind::UnexpectedType,
                    format!(
                        "expression of type '{other}' cannot be the operand of a select (expected struct or map)"
                    ),
                );
                CelType::Dyn
            }
        };

        let result = if test_only { CelType::Bool } else { field_type };
        self.set_type(expr.id, result);
    }

    fn check_call(&mut self, expr: &Expr, target: Option<&Expr>, function: &str, args: &[Expr]) {
        // the ternary conditional is a three-argument call to a
        // distinguished function
        if function == "_?_:_" && target.is_none() && args.len() == 3 {
            return self.check_conditional(expr, args);
        }

        match target {
            None => {
                let resolved = self
                    .env
                    .container()
                    .candidates(function)
                    .into_iter()
                    .find_map(|candidate| {
                        self.env
                            .find_function(&candidate)
                            .cloned()
                            .map(|decl| (candidate, decl))
                    });

                for arg in args {
                    self.check_expr(arg);
                }

                let Some((canonical, decl)) = resolved else {
                    self.report(
                        expr.id,
                        IssueKind::UndeclaredReference,
                        format!(
                            "undeclared reference to '{function}' (in container '{}')",
                            self.env.container().name()
                        ),
                    );
                    self.set_type(expr.id, CelType::Error);
                    return;
                };

                let arg_types = args.iter().map(|a| self.type_of(a)).collect::<Vec<_>>();
                self.resolve_overload(expr.id, &canonical, &decl, &arg_types, false);
            }
            Some(target) => {
                // the receiver may actually be a namespace prefix of a
                // global function, e.g. `math.greatest(...)`
                if let Some(prefix) = Self::qualified_name(target) {
                    let qualified = format!("{prefix}.{function}");
                    let resolved = self
                        .env
                        .container()
                        .candidates(&qualified)
                        .into_iter()
                        .find_map(|candidate| {
                            self.env
                                .find_function(&candidate)
                                .cloned()
                                .map(|decl| (candidate, decl))
                        });
                    if let Some((canonical, decl)) = resolved {
                        for arg in args {
                            self.check_expr(arg);
                        }
                        let arg_types =
                            args.iter().map(|a| self.type_of(a)).collect::<Vec<_>>();
                        self.resolve_overload(expr.id, &canonical, &decl, &arg_types, false);
                        return;
                    }
                }

                self.check_expr(target);
                for arg in args {
                    self.check_expr(arg);
                }

                let Some(decl) = self.env.find_function(function).cloned() else {
                    self.report(
                        expr.id,
                        IssueKind::UndeclaredReference,
                        format!(
                            "undeclared reference to '{function}' (in container '{}')",
                            self.env.container().name()
                        ),
                    );
                    self.set_type(expr.id, CelType::Error);
                    return;
                };

                let mut arg_types = vec![self.type_of(target)];
                arg_types.extend(args.iter().map(|a| self.type_of(a)));
                self.resolve_overload(expr.id, function, &decl, &arg_types, true);
            }
        }
    }

    fn check_conditional(&mut self, expr: &Expr, args: &[Expr]) {
        for arg in args {
            self.check_expr(arg);
        }

        let condition_type = self.type_of(&args[0]);
        if !self.sub.is_assignable(&CelType::Bool, &condition_type)
            && !condition_type.is_error()
        {
            self.report(
                args[0].id,
                IssueKind::TypeMismatch,
                format!("expected type 'bool' but found '{condition_type}'"),
            );
        }

        let truthy = self.type_of(&args[1]);
        let falsy = self.type_of(&args[2]);
        let joined = self.join(&truthy, &falsy);

        self.set_type(expr.id, joined);
        self.ref_map.insert(
            expr.id,
            Reference::Function {
                name: "_?_:_".to_string(),
                overload_ids: vec![CONDITIONAL_OVERLOAD.to_string()],
            },
        );
    }

    /// Match a call against a function's overload set under a scratch
    /// substitution per candidate. Every matching overload is recorded for
    /// the runtime dispatcher; disagreeing result types widen to `dyn`.
    fn resolve_overload(
        &mut self,
        id: ExprId,
        function: &str,
        decl: &FunctionDecl,
        arg_types: &[CelType],
        member: bool,
    ) {
        // an argument that already failed checking poisons the call without
        // a second issue
        if arg_types.iter().any(|t| t.is_error()) {
            self.set_type(id, CelType::Error);
            self.ref_map.insert(
                id,
                Reference::Function {
                    name: function.to_string(),
                    overload_ids: vec![],
                },
            );
            return;
        }

        let mut matched = vec![];
        let mut result_type: Option<CelType> = None;
        let mut committed: Option<Substitution> = None;

        for overload in &decl.overloads {
            if overload.member != member
                || overload.params.len() != arg_types.len()
                || self.env.overload_disabled(&overload.id)
            {
                continue;
            }

            let mut scratch = self.sub.clone();
            let renames = overload
                .type_params
                .iter()
                .map(|p| (p.clone(), self.fresh_type_var()))
                .collect::<HashMap<_, _>>();

            let params = overload
                .params
                .iter()
                .map(|p| rename_type_params(p, &renames))
                .collect::<Vec<_>>();

            let matches = params
                .iter()
                .zip(arg_types.iter())
                .all(|(param, arg)| scratch.is_assignable(param, arg));
            if !matches {
                continue;
            }

            let overload_result =
                scratch.resolve(&rename_type_params(&overload.result, &renames));
            result_type = Some(match result_type {
                None => overload_result,
                Some(previous) if previous == overload_result => previous,
                Some(_) => CelType::Dyn,
            });
            matched.push(overload.id.clone());
            committed = Some(scratch);
        }

        if matched.is_empty() {
            let rendered = arg_types
                .iter()
                .map(|t| self.sub.resolve(t).to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.report(
                id,
                IssueKind::NoMatchingOverload,
                format!("found no matching overload for '{function}' applied to '({rendered})'"),
            );
            self.set_type(id, CelType::Error);
            self.ref_map.insert(
                id,
                Reference::Function {
                    name: function.to_string(),
                    overload_ids: vec![],
                },
            );
            return;
        }

        if let Some(substitution) = committed {
            self.sub = substitution;
        }
        self.set_type(id, result_type.expect("at least one overload matched"));
        self.ref_map.insert(
            id,
            Reference::Function {
                name: function.to_string(),
                overload_ids: matched,
            },
        );
    }

    fn check_list(&mut self, id: ExprId, elements: &[Expr]) {
        let mut elem_type: Option<CelType> = None;
        for element in elements {
            self.check_expr(element);
            let ty = self.type_of(element);
            elem_type = Some(match elem_type {
                None => ty,
                Some(previous) => self.join(&previous, &ty),
            });
        }

        // an empty literal stays open: its elements are dyn
        let elem_type = elem_type.unwrap_or(CelType::Dyn);
        self.set_type(id, CelType::list(elem_type));
    }

    fn check_map(&mut self, id: ExprId, entries: &[(Expr, Expr)]) {
        let mut key_type: Option<CelType> = None;
        let mut value_type: Option<CelType> = None;

        for (key, value) in entries {
            self.check_expr(key);
            self.check_expr(value);
            let kt = self.type_of(key);
            let vt = self.type_of(value);
            key_type = Some(match key_type {
                None => kt,
                Some(previous) => self.join(&previous, &kt),
            });
            value_type = Some(match value_type {
                None => vt,
                Some(previous) => self.join(&previous, &vt),
            });
        }

        let key_type = key_type.unwrap_or(CelType::Dyn);
        let value_type = value_type.unwrap_or(CelType::Dyn);
        self.set_type(id, CelType::map(key_type, value_type));
    }

    fn check_struct(&mut self, id: ExprId, type_name: &str, fields: &[(String, Expr)]) {
        let resolved = self
            .env
            .container()
            .candidates(type_name)
            .into_iter()
            .find(|candidate| self.env.provider().has_struct(candidate));

        let Some(canonical) = resolved else {
            for (_, value) in fields {
                self.check_expr(value);
            }
            if self.resolve_candidates(type_name).is_some() {
                self.report(
                    id,
                    IssueKind::NotAMessageType,
                    format!("'{type_name}' does not name a message type"),
                );
            } else {
                self.report(
                    id,
                    IssueKind::UndeclaredReference,
                    format!(
                        "undeclared reference to '{type_name}' (in container '{}')",
                        self.env.container().name()
                    ),
                );
            }
            self.set_type(id, CelType::Error);
            return;
        };

        for (field, value) in fields {
            self.check_expr(value);
            let value_type = self.type_of(value);
            match self.env.provider().field_type(&canonical, field) {
                None => {
                    self.report(
                        value.id,
                        IssueKind::UndefinedField,
                        format!("undefined field '{field}'"),
                    );
                }
                Some(field_type) => {
                    if !self.sub.is_assignable(&field_type, &value_type) {
                        self.report(
                            value.id,
                            IssueKind::TypeMismatch,
                            format!(
                                "expected type '{field_type}' but found '{value_type}' for field '{field}'"
                            ),
                        );
                    }
                }
            }
        }

        self.ref_map.insert(
            id,
            Reference::Ident {
                name: canonical.clone(),
            },
        );
        self.set_type(id, CelType::Struct(canonical));
    }

    fn check_comprehension(&mut self, id: ExprId, comp: &Comprehension) {
        self.check_expr(&comp.iter_range);
        let range_type = self.sub.resolve(&self.type_of(&comp.iter_range));

        let iter_type = match &range_type {
            CelType::List(elem) => elem.as_ref().clone(),
            CelType::Map(key, _) => key.as_ref().clone(),
            CelType::Dyn | CelType::Error | CelType::TypeParam(_) => CelType::Dyn,
            other => {
                self.report(
                    comp.iter_range.id,
                    IssueKind::UnexpectedType,
                    format!("expression of type '{other}' cannot be the range of a comprehension"),
                );
                CelType::Dyn
            }
        };

        self.check_expr(&comp.accu_init);
        let accu_type = self.type_of(&comp.accu_init);

        self.scope.enter();
        self.scope.add(&comp.accu_var, accu_type.clone());

        self.scope.enter();
        self.scope.add(&comp.iter_var, iter_type);

        self.check_expr(&comp.loop_condition);
        let condition_type = self.type_of(&comp.loop_condition);
        if !self.sub.is_assignable(&CelType::Bool, &condition_type)
            && !condition_type.is_error()
        {
            self.report(
                comp.loop_condition.id,
                IssueKind::TypeMismatch,
                format!("expected type 'bool' but found '{condition_type}'"),
            );
        }

        self.check_expr(&comp.loop_step);
        let step_type = self.type_of(&comp.loop_step);
        if !self.sub.is_assignable(&accu_type, &step_type)
            && !step_type.is_error()
            && !accu_type.is_error()
        {
            self.report(
                comp.loop_step.id,
                IssueKind::IncompatibleTypes,
                format!("incompatible accumulation types: '{accu_type}' and '{step_type}'"),
            );
        }

        self.scope.exit();

        self.check_expr(&comp.result);
        self.scope.exit();

        let result_type = self.type_of(&comp.result);
        self.set_type(id, result_type);
    }

    /// Join of two branch types: equal types stay, `dyn` wins, `error`
    /// yields the other branch (the issue is already reported), anything
    /// else widens to `dyn`. Lists and maps join elementwise.
    fn join(&self, a: &CelType, b: &CelType) -> CelType {
        let a = self.sub.resolve(a);
        let b = self.sub.resolve(b);

        if a == b {
            return a;
        }
        if a.is_dyn() || b.is_dyn() {
            return CelType::Dyn;
        }
        if a.is_error() {
            return b;
        }
        if b.is_error() {
            return a;
        }

        match (&a, &b) {
            (CelType::List(x), CelType::List(y)) => CelType::list(self.join(x, y)),
            (CelType::Map(k1, v1), CelType::Map(k2, v2)) => {
                CelType::map(self.join(k1, k2), self.join(v1, v2))
            }
            _ => CelType::Dyn,
        }
    }
}

fn rename_type_params(ty: &CelType, renames: &HashMap<String, String>) -> CelType {
    if renames.is_empty() {
        return ty.clone();
    }
    match ty {
        CelType::TypeParam(name) => match renames.get(name) {
            Some(fresh) => CelType::TypeParam(fresh.clone()),
            None => ty.clone(),
        },
        CelType::List(elem) => CelType::list(rename_type_params(elem, renames)),
        CelType::Map(key, value) => CelType::map(
            rename_type_params(key, renames),
            rename_type_params(value, renames),
        ),
        CelType::Type(Some(inner)) => CelType::type_of(rename_type_params(inner, renames)),
        CelType::Optional(inner) => CelType::optional(rename_type_params(inner, renames)),
        CelType::Opaque(name, params) => CelType::Opaque(
            name.clone(),
            params
                .iter()
                .map(|p| rename_type_params(p, renames))
                .collect(),
        ),
        _ => ty.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Checker, IssueKind, Reference};
    use crate::ast::builder::AstBuilder;
    use crate::env::{Env, EnvConfig, VariableDecl};
    use crate::types::CelType;

    fn env_with(variables: Vec<VariableDecl>) -> Env {
        Env::with_config(EnvConfig {
            variables,
            ..EnvConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_arithmetic_is_int() {
        let env = env_with(vec![
            VariableDecl::new("x", CelType::Int),
            VariableDecl::new("y", CelType::Int),
        ]);

        let mut b = AstBuilder::new("x + y");
        let x = b.ident("x");
        let y = b.ident("y");
        let sum = b.call("_+_", vec![x, y]);
        let (expr, info) = b.build(sum);

        let checked = Checker::check(&env, &expr, &info).unwrap();
        assert_eq!(checked.result_type(), CelType::Int);
    }

    #[test]
    fn test_undeclared_reference() {
        let env = env_with(vec![]);
        let mut b = AstBuilder::new("nope");
        let root = b.ident("nope");
        b.pos(&root, 0, 4);
        let (expr, info) = b.build(root);

        let issues = Checker::check(&env, &expr, &info).unwrap_err();
        assert_eq!(issues.len(), 1);
        let issue = issues.iter().next().unwrap();
        assert_eq!(issue.kind, IssueKind::UndeclaredReference);
        assert_eq!(issue.location, Some((1, 1)));
    }

    #[test]
    fn test_no_matching_overload() {
        let env = env_with(vec![VariableDecl::new("s", CelType::String)]);
        let mut b = AstBuilder::new("s + 1");
        let s = b.ident("s");
        let one = b.int(1);
        let sum = b.call("_+_", vec![s, one]);
        let (expr, info) = b.build(sum);

        let issues = Checker::check(&env, &expr, &info).unwrap_err();
        assert_eq!(
            issues.iter().next().unwrap().kind,
            IssueKind::NoMatchingOverload
        );
    }

    #[test]
    fn test_overload_candidates_are_recorded() {
        let env = env_with(vec![VariableDecl::new("x", CelType::Int)]);
        let mut b = AstBuilder::new("x < 3");
        let x = b.ident("x");
        let three = b.int(3);
        let cmp = b.call("_<_", vec![x, three]);
        let (expr, info) = b.build(cmp);

        let checked = Checker::check(&env, &expr, &info).unwrap();
        let Some(Reference::Function { overload_ids, .. }) = checked.ref_map.get(&expr.id)
        else {
            panic!("call should carry a function reference");
        };
        assert_eq!(overload_ids, &vec!["less_int64".to_string()]);
    }

    #[test]
    fn test_conditional_joins_branches() {
        let env = env_with(vec![VariableDecl::new("c", CelType::Bool)]);

        // c ? 1 : 2 stays int, c ? 1 : "two" widens to dyn
        let mut b = AstBuilder::new("c ? 1 : 2");
        let c = b.ident("c");
        let one = b.int(1);
        let two = b.int(2);
        let cond = b.call("_?_:_", vec![c, one, two]);
        let (expr, info) = b.build(cond);
        let checked = Checker::check(&env, &expr, &info).unwrap();
        assert_eq!(checked.result_type(), CelType::Int);

        let mut b = AstBuilder::new("c ? 1 : 'two'");
        let c = b.ident("c");
        let one = b.int(1);
        let two = b.string("two");
        let cond = b.call("_?_:_", vec![c, one, two]);
        let (expr, info) = b.build(cond);
        let checked = Checker::check(&env, &expr, &info).unwrap();
        assert_eq!(checked.result_type(), CelType::Dyn);
    }

    #[test]
    fn test_list_element_join() {
        let env = env_with(vec![]);

        let mut b = AstBuilder::new("[]");
        let empty = b.list(vec![]);
        let (expr, info) = b.build(empty);
        let checked = Checker::check(&env, &expr, &info).unwrap();
        assert_eq!(checked.result_type(), CelType::list(CelType::Dyn));

        let mut b = AstBuilder::new("[1, 'a']");
        let one = b.int(1);
        let a = b.string("a");
        let list = b.list(vec![one, a]);
        let (expr, info) = b.build(list);
        let checked = Checker::check(&env, &expr, &info).unwrap();
        assert_eq!(checked.result_type(), CelType::list(CelType::Dyn));
    }

    #[test]
    fn test_comprehension_scoping() {
        let env = env_with(vec![VariableDecl::new(
            "xs",
            CelType::list(CelType::Int),
        )]);

        let mut b = AstBuilder::new("xs.exists(n, n > 2)");
        let xs = b.ident("xs");
        let n = b.ident("n");
        let two = b.int(2);
        let pred = b.call("_>_", vec![n, two]);
        let comp = b.exists(xs, "n", pred);
        let (expr, info) = b.build(comp);

        let checked = Checker::check(&env, &expr, &info).unwrap();
        assert_eq!(checked.result_type(), CelType::Bool);
    }

    #[test]
    fn test_iter_variable_does_not_leak() {
        let env = env_with(vec![VariableDecl::new(
            "xs",
            CelType::list(CelType::Int),
        )]);

        // xs.exists(n, n > 2) && n — the trailing n is out of scope
        let mut b = AstBuilder::new("xs.exists(n, n > 2) && n");
        let xs = b.ident("xs");
        let n = b.ident("n");
        let two = b.int(2);
        let pred = b.call("_>_", vec![n, two]);
        let comp = b.exists(xs, "n", pred);
        let stray = b.ident("n");
        let and = b.call("_&&_", vec![comp, stray]);
        let (expr, info) = b.build(and);

        let issues = Checker::check(&env, &expr, &info).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.kind == IssueKind::UndeclaredReference));
    }

    #[test]
    fn test_select_on_unsupported_type() {
        let env = env_with(vec![VariableDecl::new("x", CelType::Int)]);
        let mut b = AstBuilder::new("x.field");
        let x = b.ident("x");
        let select = b.select(x, "field");
        let (expr, info) = b.build(select);

        let issues = Checker::check(&env, &expr, &info).unwrap_err();
        assert_eq!(issues.iter().next().unwrap().kind, IssueKind::UnexpectedType);
    }

    #[test]
    fn test_overload_resolution_is_stable_under_widening() {
        // adding a dyn-accepting overload must not change the resolution
        // of an already matching call
        use crate::env::decls::{FunctionDecl, Overload};

        let base = FunctionDecl::new(
            "f",
            vec![Overload::global("f_int", vec![CelType::Int], CelType::Int)],
        );
        let widened = FunctionDecl::new(
            "f",
            vec![
                Overload::global("f_int", vec![CelType::Int], CelType::Int),
                Overload::global("f_dyn", vec![CelType::Dyn], CelType::Int),
            ],
        );

        for functions in [vec![base.clone()], vec![widened.clone()]] {
            let env = Env::with_config(EnvConfig {
                functions,
                ..EnvConfig::default()
            })
            .unwrap();

            let mut b = AstBuilder::new("f(1)");
            let one = b.int(1);
            let call = b.call("f", vec![one]);
            let (expr, info) = b.build(call);

            let checked = Checker::check(&env, &expr, &info).unwrap();
            let Some(Reference::Function { overload_ids, .. }) =
                checked.ref_map.get(&expr.id)
            else {
                panic!("call should carry a function reference");
            };
            assert_eq!(overload_ids[0], "f_int");
            assert_eq!(checked.result_type(), CelType::Int);
        }
    }
}
