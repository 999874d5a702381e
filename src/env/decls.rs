use indexmap::IndexMap;

use crate::types::CelType;
use crate::value::Value;

/// A declared variable. Constants carry their value and are pre-bound in
/// every evaluation.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDecl {
    pub name: String,
    pub ty: CelType,
    pub value: Option<Value>,
}

impl VariableDecl {
    pub fn new(name: impl ToString, ty: CelType) -> VariableDecl {
        VariableDecl {
            name: name.to_string(),
            ty,
            value: None,
        }
    }

    pub fn constant(name: impl ToString, ty: CelType, value: Value) -> VariableDecl {
        VariableDecl {
            name: name.to_string(),
            ty,
            value: Some(value),
        }
    }
}

/// One arity/type signature of a named function.
#[derive(Clone, Debug, PartialEq)]
pub struct Overload {
    pub id: String,
    /// Parameter types; for member overloads the receiver is the first
    /// parameter.
    pub params: Vec<CelType>,
    pub result: CelType,
    /// Names of type parameters occurring free in `params`/`result`.
    pub type_params: Vec<String>,
    pub member: bool,
}

impl Overload {
    pub fn global(id: impl ToString, params: Vec<CelType>, result: CelType) -> Overload {
        Overload {
            id: id.to_string(),
            params,
            result,
            type_params: vec![],
            member: false,
        }
    }

    pub fn member(id: impl ToString, params: Vec<CelType>, result: CelType) -> Overload {
        Overload {
            member: true,
            ..Overload::global(id, params, result)
        }
    }

    pub fn with_type_params(mut self, type_params: &[&str]) -> Overload {
        self.type_params = type_params.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// A function with its overload set.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: String,
    pub overloads: Vec<Overload>,
}

impl FunctionDecl {
    pub fn new(name: impl ToString, overloads: Vec<Overload>) -> FunctionDecl {
        FunctionDecl {
            name: name.to_string(),
            overloads,
        }
    }
}

/// A struct (message) type with named, typed fields.
#[derive(Clone, Debug, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub fields: IndexMap<String, CelType>,
}

impl StructDecl {
    pub fn new(
        name: impl ToString,
        fields: impl IntoIterator<Item = (String, CelType)>,
    ) -> StructDecl {
        StructDecl {
            name: name.to_string(),
            fields: fields.into_iter().collect(),
        }
    }
}

/// An enum type with named integer values, resolvable as qualified
/// identifiers (`pkg.Enum.VALUE`).
#[derive(Clone, Debug, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub values: IndexMap<String, i64>,
}

impl EnumDecl {
    pub fn new(
        name: impl ToString,
        values: impl IntoIterator<Item = (String, i64)>,
    ) -> EnumDecl {
        EnumDecl {
            name: name.to_string(),
            values: values.into_iter().collect(),
        }
    }
}
