//! Variable bindings presented to the interpreter.
//!
//! An activation resolves a name to a value, to an unknown marker, or to
//! nothing. Activations chain: child scopes (comprehension variables, the
//! environment's pre-bound constants) shadow parents without mutating them.
//! An activation is borrowed for the duration of a single evaluation.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::value::adapter::{DefaultAdapter, TypeAdapter};
use crate::value::Value;

/// Outcome of a name lookup.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Bound(Value),
    /// The name is declared but its value is missing from this evaluation.
    Unknown,
    Absent,
}

pub trait Activation {
    fn resolve(&self, name: &str) -> Resolution;
}

/// Every lookup is absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmptyActivation;

impl Activation for EmptyActivation {
    fn resolve(&self, _: &str) -> Resolution {
        Resolution::Absent
    }
}

/// Direct name-to-value bindings.
#[derive(Clone, Debug, Default)]
pub struct MapActivation {
    bindings: IndexMap<String, Value>,
}

impl MapActivation {
    pub fn new() -> MapActivation {
        MapActivation::default()
    }

    pub fn insert(&mut self, name: impl ToString, value: Value) {
        self.bindings.insert(name.to_string(), value);
    }
}

impl<N: ToString> From<Vec<(N, Value)>> for MapActivation {
    fn from(bindings: Vec<(N, Value)>) -> MapActivation {
        MapActivation {
            bindings: bindings
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl Activation for MapActivation {
    fn resolve(&self, name: &str) -> Resolution {
        match self.bindings.get(name) {
            Some(value) => Resolution::Bound(value.clone()),
            None => Resolution::Absent,
        }
    }
}

/// Host-native bindings converted through the type adapter on first
/// access and memoized for the rest of the evaluation.
pub struct LazyActivation {
    natives: IndexMap<String, serde_json::Value>,
    adapter: Arc<dyn TypeAdapter>,
    cache: RefCell<HashMap<String, Value>>,
}

impl LazyActivation {
    pub fn new(natives: impl IntoIterator<Item = (String, serde_json::Value)>) -> LazyActivation {
        LazyActivation::with_adapter(natives, Arc::new(DefaultAdapter))
    }

    pub fn with_adapter(
        natives: impl IntoIterator<Item = (String, serde_json::Value)>,
        adapter: Arc<dyn TypeAdapter>,
    ) -> LazyActivation {
        LazyActivation {
            natives: natives.into_iter().collect(),
            adapter,
            cache: RefCell::new(HashMap::new()),
        }
    }
}

impl Activation for LazyActivation {
    fn resolve(&self, name: &str) -> Resolution {
        if let Some(cached) = self.cache.borrow().get(name) {
            return Resolution::Bound(cached.clone());
        }

        let Some(native) = self.natives.get(name) else {
            return Resolution::Absent;
        };
        let value = self.adapter.native_to_value(native);
        self.cache
            .borrow_mut()
            .insert(name.to_string(), value.clone());

        Resolution::Bound(value)
    }
}

/// Child-over-parent chaining; the child shadows the parent.
pub struct HierarchicalActivation<'a> {
    child: &'a dyn Activation,
    parent: &'a dyn Activation,
}

impl<'a> HierarchicalActivation<'a> {
    pub fn new(child: &'a dyn Activation, parent: &'a dyn Activation) -> HierarchicalActivation<'a> {
        HierarchicalActivation { child, parent }
    }
}

impl Activation for HierarchicalActivation<'_> {
    fn resolve(&self, name: &str) -> Resolution {
        match self.child.resolve(name) {
            Resolution::Absent => self.parent.resolve(name),
            resolution => resolution,
        }
    }
}

/// Map-backed bindings plus a set of names whose values are missing;
/// looking those up yields unknown instead of absent.
#[derive(Clone, Debug, Default)]
pub struct PartialActivation {
    bindings: MapActivation,
    unknowns: Vec<String>,
}

impl PartialActivation {
    pub fn new(bindings: MapActivation, unknowns: Vec<String>) -> PartialActivation {
        PartialActivation { bindings, unknowns }
    }
}

impl Activation for PartialActivation {
    fn resolve(&self, name: &str) -> Resolution {
        if self.unknowns.iter().any(|n| n == name) {
            return Resolution::Unknown;
        }
        self.bindings.resolve(name)
    }
}

/// Single-variable frame used for comprehension iteration and accumulator
/// bindings.
pub(crate) struct VarActivation<'a> {
    name: &'a str,
    value: Value,
    parent: &'a dyn Activation,
}

impl<'a> VarActivation<'a> {
    pub(crate) fn new(name: &'a str, value: Value, parent: &'a dyn Activation) -> VarActivation<'a> {
        VarActivation {
            name,
            value,
            parent,
        }
    }
}

impl Activation for VarActivation<'_> {
    fn resolve(&self, name: &str) -> Resolution {
        if name == self.name {
            return Resolution::Bound(self.value.clone());
        }
        self.parent.resolve(name)
    }
}
