//! Expression AST and source map.
//!
//! The grammar front-end is an external collaborator: this crate only
//! assumes a parsed tree of nodes carrying stable, monotonically assigned
//! ids, plus a `SourceInfo` that maps every id back to a byte range. All
//! side tables produced by the checker are keyed by `ExprId`.

pub mod builder;

use std::collections::HashMap;

/// Stable identifier of an expression node, unique within one AST.
pub type ExprId = u64;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Constant {
    Bool(bool),
    Int(i64),
    Uint(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    Null,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Expr {
    pub id: ExprId,
    pub kind: ExprKind,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ExprKind {
    Literal(Constant),
    Ident(String),
    Select {
        operand: Box<Expr>,
        field: String,
        /// A test-only select (`has(e.f)`) yields presence instead of the
        /// field value.
        test_only: bool,
    },
    Call {
        /// Receiver of a member-style call, absent for global calls.
        target: Option<Box<Expr>>,
        function: String,
        args: Vec<Expr>,
    },
    List {
        elements: Vec<Expr>,
    },
    Map {
        entries: Vec<(Expr, Expr)>,
    },
    Struct {
        type_name: String,
        fields: Vec<(String, Expr)>,
    },
    /// Macro-expanded comprehension emitted by the parser for `exists`,
    /// `all`, `filter` and `map`.
    Comprehension(Box<Comprehension>),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Comprehension {
    pub iter_range: Expr,
    pub iter_var: String,
    pub accu_var: String,
    pub accu_init: Expr,
    pub loop_condition: Expr,
    pub loop_step: Expr,
    pub result: Expr,
}

impl Expr {
    pub fn new(id: ExprId, kind: ExprKind) -> Expr {
        Expr { id, kind }
    }
}

/// Maps expression ids to byte ranges of the original source text and
/// supports offset to line/column lookup for diagnostics.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceInfo {
    source: String,
    positions: HashMap<ExprId, (usize, usize)>,
    /// Byte offsets of the start of each line.
    line_offsets: Vec<usize>,
}

impl SourceInfo {
    pub fn new(source: impl ToString) -> SourceInfo {
        let source = source.to_string();
        let mut line_offsets = vec![0];
        for (offset, c) in source.char_indices() {
            if c == '\n' {
                line_offsets.push(offset + 1);
            }
        }

        SourceInfo {
            source,
            positions: HashMap::new(),
            line_offsets,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn add_position(&mut self, id: ExprId, start: usize, end: usize) {
        self.positions.insert(id, (start, end));
    }

    pub fn position(&self, id: ExprId) -> Option<(usize, usize)> {
        self.positions.get(&id).copied()
    }

    /// 1-based line and column of a byte offset.
    pub fn line_column(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert - 1,
        };
        let column = self.source[self.line_offsets[line]..offset].chars().count();

        (line + 1, column + 1)
    }

    /// 1-based line and column of the start of an expression, if recorded.
    pub fn location(&self, id: ExprId) -> Option<(usize, usize)> {
        self.position(id).map(|(start, _)| self.line_column(start))
    }
}

#[cfg(test)]
mod tests {
    use super::SourceInfo;

    #[test]
    fn test_line_column_single_line() {
        let info = SourceInfo::new("x + y");
        assert_eq!(info.line_column(0), (1, 1));
        assert_eq!(info.line_column(2), (1, 3));
        assert_eq!(info.line_column(4), (1, 5));
    }

    #[test]
    fn test_line_column_multi_line() {
        let info = SourceInfo::new("a &&\n  b");
        assert_eq!(info.line_column(0), (1, 1));
        assert_eq!(info.line_column(5), (2, 1));
        assert_eq!(info.line_column(7), (2, 3));
    }

    #[test]
    fn test_location_roundtrip() {
        let mut info = SourceInfo::new("x / 0");
        info.add_position(3, 2, 3);
        assert_eq!(info.location(3), Some((1, 3)));
        assert_eq!(info.location(99), None);
    }
}
