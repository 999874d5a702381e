//! Programmatic AST construction.
//!
//! Stands in for the parser front-end: assigns monotonically increasing
//! expression ids and emits the comprehension forms a macro-expanding
//! parser produces for `exists`, `all`, `filter` and `map`.

use super::{Comprehension, Constant, Expr, ExprId, ExprKind, SourceInfo};

/// Name of the accumulation variable used by macro-expanded comprehensions.
pub const ACCU_VAR: &str = "__result__";

pub struct AstBuilder {
    next_id: ExprId,
    info: SourceInfo,
}

impl AstBuilder {
    pub fn new(source: impl ToString) -> AstBuilder {
        AstBuilder {
            next_id: 0,
            info: SourceInfo::new(source),
        }
    }

    fn next(&mut self, kind: ExprKind) -> Expr {
        self.next_id += 1;
        Expr::new(self.next_id, kind)
    }

    /// Record the byte range an expression covers in the original source.
    pub fn pos(&mut self, expr: &Expr, start: usize, end: usize) {
        self.info.add_position(expr.id, start, end);
    }

    /// Finish building, handing out the root and the collected source map.
    pub fn build(self, root: Expr) -> (Expr, SourceInfo) {
        (root, self.info)
    }

    pub fn int(&mut self, value: i64) -> Expr {
        self.next(ExprKind::Literal(Constant::Int(value)))
    }

    pub fn uint(&mut self, value: u64) -> Expr {
        self.next(ExprKind::Literal(Constant::Uint(value)))
    }

    pub fn double(&mut self, value: f64) -> Expr {
        self.next(ExprKind::Literal(Constant::Double(value)))
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.next(ExprKind::Literal(Constant::Bool(value)))
    }

    pub fn string(&mut self, value: impl ToString) -> Expr {
        self.next(ExprKind::Literal(Constant::String(value.to_string())))
    }

    pub fn bytes(&mut self, value: impl Into<Vec<u8>>) -> Expr {
        self.next(ExprKind::Literal(Constant::Bytes(value.into())))
    }

    pub fn null(&mut self) -> Expr {
        self.next(ExprKind::Literal(Constant::Null))
    }

    pub fn ident(&mut self, name: impl ToString) -> Expr {
        self.next(ExprKind::Ident(name.to_string()))
    }

    pub fn select(&mut self, operand: Expr, field: impl ToString) -> Expr {
        self.next(ExprKind::Select {
            operand: Box::new(operand),
            field: field.to_string(),
            test_only: false,
        })
    }

    /// Presence test `has(operand.field)`.
    pub fn has(&mut self, operand: Expr, field: impl ToString) -> Expr {
        self.next(ExprKind::Select {
            operand: Box::new(operand),
            field: field.to_string(),
            test_only: true,
        })
    }

    pub fn call(&mut self, function: impl ToString, args: Vec<Expr>) -> Expr {
        self.next(ExprKind::Call {
            target: None,
            function: function.to_string(),
            args,
        })
    }

    pub fn member_call(
        &mut self,
        target: Expr,
        function: impl ToString,
        args: Vec<Expr>,
    ) -> Expr {
        self.next(ExprKind::Call {
            target: Some(Box::new(target)),
            function: function.to_string(),
            args,
        })
    }

    pub fn list(&mut self, elements: Vec<Expr>) -> Expr {
        self.next(ExprKind::List { elements })
    }

    pub fn map_lit(&mut self, entries: Vec<(Expr, Expr)>) -> Expr {
        self.next(ExprKind::Map { entries })
    }

    pub fn struct_lit(
        &mut self,
        type_name: impl ToString,
        fields: Vec<(String, Expr)>,
    ) -> Expr {
        self.next(ExprKind::Struct {
            type_name: type_name.to_string(),
            fields,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn comprehension(
        &mut self,
        iter_range: Expr,
        iter_var: impl ToString,
        accu_var: impl ToString,
        accu_init: Expr,
        loop_condition: Expr,
        loop_step: Expr,
        result: Expr,
    ) -> Expr {
        self.next(ExprKind::Comprehension(Box::new(Comprehension {
            iter_range,
            iter_var: iter_var.to_string(),
            accu_var: accu_var.to_string(),
            accu_init,
            loop_condition,
            loop_step,
            result,
        })))
    }

    /// `range.exists(var, predicate)`: accumulate `false || predicate`,
    /// stopping as soon as the accumulator turns true.
    pub fn exists(&mut self, iter_range: Expr, iter_var: impl ToString, predicate: Expr) -> Expr {
        let iter_var = iter_var.to_string();
        let init = self.boolean(false);
        let accu = self.ident(ACCU_VAR);
        let condition = self.call("!_", vec![accu]);
        let accu = self.ident(ACCU_VAR);
        let step = self.call("_||_", vec![accu, predicate]);
        let result = self.ident(ACCU_VAR);

        self.comprehension(iter_range, iter_var, ACCU_VAR, init, condition, step, result)
    }

    /// `range.all(var, predicate)`: accumulate `true && predicate`,
    /// stopping as soon as the accumulator turns false.
    pub fn all(&mut self, iter_range: Expr, iter_var: impl ToString, predicate: Expr) -> Expr {
        let iter_var = iter_var.to_string();
        let init = self.boolean(true);
        let condition = self.ident(ACCU_VAR);
        let accu = self.ident(ACCU_VAR);
        let step = self.call("_&&_", vec![accu, predicate]);
        let result = self.ident(ACCU_VAR);

        self.comprehension(iter_range, iter_var, ACCU_VAR, init, condition, step, result)
    }

    /// `range.filter(var, predicate)`: collect the elements for which the
    /// predicate holds.
    pub fn filter(&mut self, iter_range: Expr, iter_var: impl ToString, predicate: Expr) -> Expr {
        let iter_var = iter_var.to_string();
        let init = self.list(vec![]);
        let condition = self.boolean(true);
        let accu = self.ident(ACCU_VAR);
        let elem = self.ident(&iter_var);
        let singleton = self.list(vec![elem]);
        let appended = self.call("_+_", vec![accu, singleton]);
        let accu = self.ident(ACCU_VAR);
        let step = self.call("_?_:_", vec![predicate, appended, accu]);
        let result = self.ident(ACCU_VAR);

        self.comprehension(iter_range, iter_var, ACCU_VAR, init, condition, step, result)
    }

    /// `range.map(var, transform)`: collect the transformed elements.
    pub fn map_macro(
        &mut self,
        iter_range: Expr,
        iter_var: impl ToString,
        transform: Expr,
    ) -> Expr {
        let iter_var = iter_var.to_string();
        let init = self.list(vec![]);
        let condition = self.boolean(true);
        let accu = self.ident(ACCU_VAR);
        let singleton = self.list(vec![transform]);
        let step = self.call("_+_", vec![accu, singleton]);
        let result = self.ident(ACCU_VAR);

        self.comprehension(iter_range, iter_var, ACCU_VAR, init, condition, step, result)
    }
}
