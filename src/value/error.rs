use std::fmt::Display;

use crate::ast::ExprId;

/// A runtime error inside the value lattice. Errors propagate through
/// strict operators and are swallowed by the neutral side of short-circuit
/// operators; only an error reaching the top of evaluation is surfaced to
/// the caller.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorValue {
    pub message: String,
    /// Id of the offending expression node, used to resolve the source
    /// location when the error surfaces.
    pub expr_id: Option<ExprId>,
}

impl ErrorValue {
    pub fn new(message: impl ToString) -> ErrorValue {
        ErrorValue {
            message: message.to_string(),
            expr_id: None,
        }
    }

    pub fn at(expr_id: ExprId, message: impl ToString) -> ErrorValue {
        ErrorValue {
            message: message.to_string(),
            expr_id: Some(expr_id),
        }
    }

    /// Attach a node id if the error does not carry one yet.
    pub fn or_at(mut self, expr_id: ExprId) -> ErrorValue {
        self.expr_id.get_or_insert(expr_id);
        self
    }
}

impl Display for ErrorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ErrorValue {}

/// A data-gap marker produced by partial activations: some input was not
/// bound, and every operation touching it stays unknown. The set of
/// contributing expression ids lets the caller identify which inputs were
/// missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UnknownValue {
    pub expr_ids: Vec<ExprId>,
}

impl UnknownValue {
    pub fn new(expr_id: ExprId) -> UnknownValue {
        UnknownValue {
            expr_ids: vec![expr_id],
        }
    }

    /// Union of the contributing ids of two unknowns, kept sorted and
    /// deduplicated so equal unknowns compare equal.
    pub fn merge(&self, other: &UnknownValue) -> UnknownValue {
        let mut expr_ids = self.expr_ids.clone();
        expr_ids.extend_from_slice(&other.expr_ids);
        expr_ids.sort_unstable();
        expr_ids.dedup();

        UnknownValue { expr_ids }
    }
}
