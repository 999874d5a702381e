use indexmap::IndexMap;

use crate::types::CelType;

use super::decls::{EnumDecl, StructDecl};

/// Read-only capability handed to the checker and the interpreter for
/// struct field lookup and enum value lookup. The environment owns the
/// provider; no ownership cycle is required.
pub trait TypeProvider: Send + Sync {
    /// Whether a struct type with this fully qualified name exists.
    fn has_struct(&self, name: &str) -> bool;

    /// Declared type of a field, if the struct and field exist.
    fn field_type(&self, type_name: &str, field: &str) -> Option<CelType>;

    /// Resolve a fully qualified enum value name (`pkg.Enum.VALUE`) to its
    /// enum type name and integer value.
    fn enum_value(&self, name: &str) -> Option<(String, i64)>;
}

/// Provider backed by the struct and enum declarations of an environment
/// configuration.
#[derive(Clone, Debug, Default)]
pub struct DeclProvider {
    structs: IndexMap<String, StructDecl>,
    enum_values: IndexMap<String, (String, i64)>,
}

impl DeclProvider {
    pub fn new(structs: Vec<StructDecl>, enums: Vec<EnumDecl>) -> DeclProvider {
        let structs = structs
            .into_iter()
            .map(|decl| (decl.name.clone(), decl))
            .collect();

        let mut enum_values = IndexMap::new();
        for decl in enums {
            for (value_name, value) in &decl.values {
                enum_values.insert(
                    format!("{}.{value_name}", decl.name),
                    (decl.name.clone(), *value),
                );
            }
        }

        DeclProvider {
            structs,
            enum_values,
        }
    }
}

impl TypeProvider for DeclProvider {
    fn has_struct(&self, name: &str) -> bool {
        self.structs.contains_key(name)
    }

    fn field_type(&self, type_name: &str, field: &str) -> Option<CelType> {
        self.structs
            .get(type_name)
            .and_then(|decl| decl.fields.get(field))
            .cloned()
    }

    fn enum_value(&self, name: &str) -> Option<(String, i64)> {
        self.enum_values.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::{DeclProvider, TypeProvider};
    use crate::env::decls::{EnumDecl, StructDecl};
    use crate::types::CelType;

    fn provider() -> DeclProvider {
        DeclProvider::new(
            vec![StructDecl::new(
                "pkg.Msg",
                [
                    ("name".to_string(), CelType::String),
                    ("count".to_string(), CelType::Int),
                ],
            )],
            vec![EnumDecl::new(
                "pkg.Color",
                [("RED".to_string(), 0), ("GREEN".to_string(), 1)],
            )],
        )
    }

    #[test]
    fn test_field_lookup() {
        let provider = provider();
        assert!(provider.has_struct("pkg.Msg"));
        assert_eq!(provider.field_type("pkg.Msg", "count"), Some(CelType::Int));
        assert_eq!(provider.field_type("pkg.Msg", "missing"), None);
        assert!(!provider.has_struct("pkg.Other"));
    }

    #[test]
    fn test_enum_lookup() {
        let provider = provider();
        assert_eq!(
            provider.enum_value("pkg.Color.GREEN"),
            Some(("pkg.Color".to_string(), 1))
        );
        assert_eq!(provider.enum_value("pkg.Color.BLUE"), None);
    }
}
