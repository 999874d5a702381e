use std::collections::HashMap;

use crate::types::CelType;

/// Lexical identifier scopes for comprehension variables. Frames nest
/// strictly; lookups walk from the innermost frame outwards. Environment
/// declarations live outside of this structure and are consulted only when
/// no frame binds the name.
#[derive(Clone, Debug, Default)]
pub struct DeclScope {
    frames: Vec<HashMap<String, CelType>>,
}

impl DeclScope {
    pub fn new() -> DeclScope {
        DeclScope::default()
    }

    pub fn enter(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn exit(&mut self) {
        self.frames.pop();
    }

    pub fn add(&mut self, name: impl ToString, ty: CelType) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.to_string(), ty);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<CelType> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }
}
