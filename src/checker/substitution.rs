use std::collections::HashMap;

use crate::types::CelType;

/// Partial mapping from type parameter names to types, built up during
/// overload resolution. Copied on branch so candidate overloads can be
/// matched speculatively without polluting the committed state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Substitution {
    map: HashMap<String, CelType>,
}

impl Substitution {
    pub fn bind(&mut self, name: impl ToString, ty: CelType) {
        self.map.insert(name.to_string(), ty);
    }

    /// Deep rewrite of a type through the map. Unbound parameters stay;
    /// applying the result a second time yields the same type.
    pub fn resolve(&self, ty: &CelType) -> CelType {
        match ty {
            CelType::TypeParam(name) => match self.map.get(name) {
                Some(bound) => self.resolve(bound),
                None => ty.clone(),
            },
            CelType::List(elem) => CelType::list(self.resolve(elem)),
            CelType::Map(key, value) => CelType::map(self.resolve(key), self.resolve(value)),
            CelType::Type(Some(inner)) => CelType::type_of(self.resolve(inner)),
            CelType::Optional(inner) => CelType::optional(self.resolve(inner)),
            CelType::Opaque(name, params) => CelType::Opaque(
                name.clone(),
                params.iter().map(|p| self.resolve(p)).collect(),
            ),
            _ => ty.clone(),
        }
    }

    /// Like `resolve`, but replaces parameters that stayed free with `dyn`.
    /// Used once at the end of checking to make the recorded types concrete.
    pub fn finalize(&self, ty: &CelType) -> CelType {
        match ty {
            CelType::TypeParam(name) => match self.map.get(name) {
                Some(bound) => self.finalize(bound),
                None => CelType::Dyn,
            },
            CelType::List(elem) => CelType::list(self.finalize(elem)),
            CelType::Map(key, value) => CelType::map(self.finalize(key), self.finalize(value)),
            CelType::Type(Some(inner)) => CelType::type_of(self.finalize(inner)),
            CelType::Optional(inner) => CelType::optional(self.finalize(inner)),
            CelType::Opaque(name, params) => CelType::Opaque(
                name.clone(),
                params.iter().map(|p| self.finalize(p)).collect(),
            ),
            _ => ty.clone(),
        }
    }

    /// Whether `name` occurs inside `ty` after substitution. Binding a
    /// parameter to a type containing itself would make `resolve` diverge.
    fn occurs(&self, name: &str, ty: &CelType) -> bool {
        match ty {
            CelType::TypeParam(other) => {
                if other == name {
                    return true;
                }
                match self.map.get(other) {
                    Some(bound) => self.occurs(name, bound),
                    None => false,
                }
            }
            CelType::List(elem) => self.occurs(name, elem),
            CelType::Map(key, value) => self.occurs(name, key) || self.occurs(name, value),
            CelType::Type(Some(inner)) => self.occurs(name, inner),
            CelType::Optional(inner) => self.occurs(name, inner),
            CelType::Opaque(_, params) => params.iter().any(|p| self.occurs(name, p)),
            _ => false,
        }
    }

    /// Assignability under substitution: can a value of type `source` be
    /// used where `target` is expected? `dyn` and `error` match on either
    /// side; free type parameters bind to the opposite side; identical
    /// kinds recurse structurally.
    pub fn is_assignable(&mut self, target: &CelType, source: &CelType) -> bool {
        let target = self.resolve(target);
        let source = self.resolve(source);

        match (&target, &source) {
            (CelType::Dyn | CelType::Error, _) => true,
            (_, CelType::Dyn | CelType::Error) => true,
            (CelType::TypeParam(name), _) => {
                if self.occurs(name, &source) {
                    return false;
                }
                self.bind(name, source);
                true
            }
            (_, CelType::TypeParam(name)) => {
                self.bind(name, target);
                true
            }
            (CelType::List(a), CelType::List(b)) => self.is_assignable(a, b),
            (CelType::Map(k1, v1), CelType::Map(k2, v2)) => {
                self.is_assignable(k1, k2) && self.is_assignable(v1, v2)
            }
            (CelType::Type(None), CelType::Type(_)) => true,
            (CelType::Type(_), CelType::Type(None)) => true,
            (CelType::Type(Some(a)), CelType::Type(Some(b))) => self.is_assignable(a, b),
            (CelType::Optional(a), CelType::Optional(b)) => self.is_assignable(a, b),
            (CelType::Opaque(n1, p1), CelType::Opaque(n2, p2)) => {
                n1 == n2
                    && p1.len() == p2.len()
                    && p1
                        .iter()
                        .zip(p2.iter())
                        .all(|(a, b)| self.is_assignable(a, b))
            }
            // null is a valid value for any message-typed slot
            (CelType::Struct(_), CelType::Null) => true,
            _ => target == source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Substitution;
    use crate::types::CelType;

    #[test]
    fn test_dyn_matches_everything() {
        let mut sub = Substitution::default();
        assert!(sub.is_assignable(&CelType::Dyn, &CelType::Int));
        assert!(sub.is_assignable(&CelType::Int, &CelType::Dyn));
        assert!(!sub.is_assignable(&CelType::Int, &CelType::Uint));
    }

    #[test]
    fn test_type_param_binds_once() {
        let mut sub = Substitution::default();
        let param = CelType::type_param("A");

        assert!(sub.is_assignable(&param, &CelType::Int));
        // A is now bound to int, so a string no longer fits
        assert!(!sub.is_assignable(&param, &CelType::String));
        assert_eq!(sub.resolve(&param), CelType::Int);
    }

    #[test]
    fn test_structural_recursion() {
        let mut sub = Substitution::default();
        let target = CelType::list(CelType::type_param("A"));

        assert!(sub.is_assignable(&target, &CelType::list(CelType::String)));
        assert_eq!(
            sub.resolve(&CelType::type_param("A")),
            CelType::String
        );
        assert!(!sub.is_assignable(&target, &CelType::list(CelType::Int)));
    }

    #[test]
    fn test_occurs_check() {
        let mut sub = Substitution::default();
        let param = CelType::type_param("A");
        let recursive = CelType::list(CelType::type_param("A"));

        assert!(!sub.is_assignable(&param, &recursive));
    }

    #[test]
    fn test_finalize_replaces_free_params_idempotently() {
        let mut sub = Substitution::default();
        sub.bind("A", CelType::Int);

        let ty = CelType::map(CelType::type_param("A"), CelType::type_param("B"));
        let once = sub.finalize(&ty);
        assert_eq!(once, CelType::map(CelType::Int, CelType::Dyn));
        assert_eq!(sub.finalize(&once), once);
    }

    #[test]
    fn test_null_assignable_to_message() {
        let mut sub = Substitution::default();
        assert!(sub.is_assignable(&CelType::Struct("my.Msg".into()), &CelType::Null));
        assert!(!sub.is_assignable(&CelType::Int, &CelType::Null));
    }
}
