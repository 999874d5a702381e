//! Environment construction.
//!
//! An `Env` owns the declaration tables, the type provider, the type
//! adapter and the runtime dispatcher for its lifetime. It is assembled
//! once from an `EnvConfig` and then used to compile expressions into
//! checked ASTs and plan them into programs.

pub mod container;
pub mod decls;
pub mod provider;

use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use crate::ast::{Expr, SourceInfo};
use crate::checker::error::Issues;
use crate::checker::{CheckedExpr, Checker};
use crate::interpreter::activation::MapActivation;
use crate::interpreter::dispatcher::{DispatchAddError, Dispatcher, FunctionBinding};
use crate::planner::{PlanError, Planner, Program};
use crate::stdlib;
use crate::value::adapter::{DefaultAdapter, TypeAdapter};

pub use self::container::Container;
pub use self::decls::{EnumDecl, FunctionDecl, Overload, StructDecl, VariableDecl};
pub use self::provider::{DeclProvider, TypeProvider};

/// A bulk addition of declarations and runtime bindings, e.g. a string or
/// math extension library.
#[derive(Clone, Default)]
pub struct Extension {
    pub variables: Vec<VariableDecl>,
    pub functions: Vec<FunctionDecl>,
    pub bindings: Vec<FunctionBinding>,
}

#[derive(Clone, Default)]
pub struct EnvConfig {
    /// Container (namespace) the expression is checked in.
    pub container: String,
    /// Aliases from a leading name segment to a fully qualified prefix.
    pub aliases: Vec<(String, String)>,
    pub variables: Vec<VariableDecl>,
    pub functions: Vec<FunctionDecl>,
    /// Runtime bindings for declared function overloads.
    pub bindings: Vec<FunctionBinding>,
    pub structs: Vec<StructDecl>,
    pub enums: Vec<EnumDecl>,
    /// Custom provider for struct field and enum value lookup; when absent
    /// one is built from `structs` and `enums`.
    pub provider: Option<Arc<dyn TypeProvider>>,
    /// Custom native-to-value adapter used by lazy activations.
    pub adapter: Option<Arc<dyn TypeAdapter>>,
    pub disable_stdlib: bool,
    pub disable_checks: bool,
    /// Overload ids excluded from resolution and dispatch in this
    /// environment.
    pub disabled_overloads: Vec<String>,
    pub extensions: Vec<Extension>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvError {
    DuplicateIdent(String),
    DuplicateOverload(String),
    /// A runtime binding was supplied for an overload that is not declared.
    UnboundOverload(String),
    Dispatch(DispatchAddError),
}

impl Display for EnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnvError::DuplicateIdent(name) => {
                write!(f, "identifier '{name}' is declared twice")
            }
            EnvError::DuplicateOverload(id) => {
                write!(f, "overload '{id}' is declared twice")
            }
            EnvError::UnboundOverload(id) => {
                write!(f, "binding for undeclared overload '{id}'")
            }
            EnvError::Dispatch(e) => write!(f, "{e}"),
        }
    }
}

impl Error for EnvError {}

impl From<DispatchAddError> for EnvError {
    fn from(value: DispatchAddError) -> Self {
        EnvError::Dispatch(value)
    }
}

pub struct Env {
    container: Container,
    idents: IndexMap<String, VariableDecl>,
    functions: IndexMap<String, FunctionDecl>,
    provider: Arc<dyn TypeProvider>,
    adapter: Arc<dyn TypeAdapter>,
    dispatcher: Arc<Dispatcher>,
    /// Constant declarations pre-bound for every evaluation.
    constants: Arc<MapActivation>,
    disabled_overloads: std::collections::HashSet<String>,
    disable_checks: bool,
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

impl Env {
    /// Environment with the standard library and no custom declarations.
    pub fn new() -> Env {
        Env::with_config(EnvConfig::default()).expect("the default environment is well-formed")
    }

    pub fn with_config(config: EnvConfig) -> Result<Env, EnvError> {
        let EnvConfig {
            container,
            aliases,
            variables,
            functions,
            bindings,
            structs,
            enums,
            provider,
            adapter,
            disable_stdlib,
            disable_checks,
            disabled_overloads,
            extensions,
        } = config;

        let disabled_overloads: std::collections::HashSet<String> =
            disabled_overloads.into_iter().collect();

        let container = Container::with_aliases(container, aliases);

        let mut idents: IndexMap<String, VariableDecl> = IndexMap::new();
        let mut function_table: IndexMap<String, FunctionDecl> = IndexMap::new();
        let mut all_bindings = vec![];

        fn add_ident(
            idents: &mut IndexMap<String, VariableDecl>,
            decl: VariableDecl,
        ) -> Result<(), EnvError> {
            if idents.contains_key(&decl.name) {
                return Err(EnvError::DuplicateIdent(decl.name));
            }
            idents.insert(decl.name.clone(), decl);
            Ok(())
        }

        fn merge_function(table: &mut IndexMap<String, FunctionDecl>, decl: FunctionDecl) {
            match table.get_mut(&decl.name) {
                Some(existing) => existing.overloads.extend(decl.overloads),
                None => {
                    table.insert(decl.name.clone(), decl);
                }
            }
        }

        if !disable_stdlib {
            for decl in stdlib::type_idents() {
                add_ident(&mut idents, decl)?;
            }
            for decl in stdlib::declarations() {
                merge_function(&mut function_table, decl);
            }
            all_bindings.extend(stdlib::bindings());
        }

        for decl in variables {
            add_ident(&mut idents, decl)?;
        }
        for decl in functions {
            merge_function(&mut function_table, decl);
        }
        all_bindings.extend(bindings);

        for extension in extensions {
            for decl in extension.variables {
                add_ident(&mut idents, decl)?;
            }
            for decl in extension.functions {
                merge_function(&mut function_table, decl);
            }
            all_bindings.extend(extension.bindings);
        }

        // Index overloads by id for binding registration and duplicate
        // detection across functions.
        let mut overload_index: IndexMap<String, (String, Overload)> = IndexMap::new();
        for decl in function_table.values() {
            for overload in &decl.overloads {
                if overload_index.contains_key(&overload.id) {
                    return Err(EnvError::DuplicateOverload(overload.id.clone()));
                }
                overload_index.insert(overload.id.clone(), (decl.name.clone(), overload.clone()));
            }
        }

        let mut dispatcher = Dispatcher::new();
        for binding in all_bindings {
            if disabled_overloads.contains(&binding.overload_id) {
                continue;
            }
            let Some((function, overload)) = overload_index.get(&binding.overload_id) else {
                return Err(EnvError::UnboundOverload(binding.overload_id));
            };
            dispatcher.add(function, overload, binding)?;
        }

        let provider: Arc<dyn TypeProvider> = match provider {
            Some(custom) => custom,
            None => Arc::new(DeclProvider::new(structs, enums)),
        };
        let adapter = adapter.unwrap_or_else(|| Arc::new(DefaultAdapter));

        let mut constants = MapActivation::new();
        for decl in idents.values() {
            if let Some(value) = &decl.value {
                constants.insert(&decl.name, value.clone());
            }
        }

        debug!(
            "environment ready: {} identifiers, {} functions",
            idents.len(),
            function_table.len()
        );

        Ok(Env {
            container,
            idents,
            functions: function_table,
            provider,
            adapter,
            dispatcher: Arc::new(dispatcher),
            constants: Arc::new(constants),
            disabled_overloads,
            disable_checks,
        })
    }

    /// Whether an overload is excluded from resolution in this environment.
    pub fn overload_disabled(&self, overload_id: &str) -> bool {
        self.disabled_overloads.contains(overload_id)
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn provider(&self) -> &Arc<dyn TypeProvider> {
        &self.provider
    }

    pub fn adapter(&self) -> &Arc<dyn TypeAdapter> {
        &self.adapter
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub(crate) fn constants(&self) -> &Arc<MapActivation> {
        &self.constants
    }

    pub fn find_ident(&self, name: &str) -> Option<&VariableDecl> {
        self.idents.get(name)
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    /// Type check an expression against this environment. With checking
    /// disabled the expression passes through and all references resolve
    /// dynamically at evaluation time.
    pub fn compile(&self, expr: &Expr, info: &SourceInfo) -> Result<CheckedExpr, Issues> {
        if self.disable_checks {
            return Ok(CheckedExpr::unchecked(expr.clone()));
        }
        Checker::check(self, expr, info)
    }

    /// Plan a checked expression into an evaluable program.
    pub fn program(&self, checked: &CheckedExpr, info: &SourceInfo) -> Result<Program, PlanError> {
        Planner::new(self, Some(checked)).plan(&checked.expr, info)
    }

    /// Plan an expression without check-time reference information.
    pub fn program_unchecked(
        &self,
        expr: &Expr,
        info: &SourceInfo,
    ) -> Result<Program, PlanError> {
        Planner::new(self, None).plan(expr, info)
    }
}

#[cfg(test)]
mod tests {
    use super::{Env, EnvConfig, EnvError, VariableDecl};
    use crate::types::CelType;

    #[test]
    fn test_default_env_has_stdlib() {
        let env = Env::new();
        assert!(env.find_function("_+_").is_some());
        assert!(env.find_function("size").is_some());
        assert!(env.find_ident("int").is_some());
    }

    #[test]
    fn test_disable_stdlib() {
        let env = Env::with_config(EnvConfig {
            disable_stdlib: true,
            ..EnvConfig::default()
        })
        .unwrap();
        assert!(env.find_function("_+_").is_none());
    }

    #[test]
    fn test_duplicate_variable_rejected() {
        let result = Env::with_config(EnvConfig {
            variables: vec![
                VariableDecl::new("x", CelType::Int),
                VariableDecl::new("x", CelType::String),
            ],
            ..EnvConfig::default()
        });
        assert_eq!(result.err(), Some(EnvError::DuplicateIdent("x".into())));
    }
}
