use crate::ast::ExprId;
use crate::value::Value;

/// One evaluable node of a planned program. The planner lowers every AST
/// node into exactly one of these; the interpreter walks the tree against
/// an activation.
#[derive(Clone, Debug)]
pub enum Interpretable {
    /// A literal, a folded pure call, or a resolved enum constant.
    Constant { id: ExprId, value: Value },
    /// Variable resolution; candidate names are tried most specific first.
    Ident { id: ExprId, names: Vec<String> },
    Select {
        id: ExprId,
        operand: Box<Interpretable>,
        field: String,
        test_only: bool,
    },
    /// Strict call dispatched through the overload registry. Member calls
    /// carry their receiver as the first argument.
    Call {
        id: ExprId,
        function: String,
        overload_ids: Vec<String>,
        args: Vec<Interpretable>,
    },
    CreateList {
        id: ExprId,
        elements: Vec<Interpretable>,
    },
    CreateMap {
        id: ExprId,
        entries: Vec<(Interpretable, Interpretable)>,
    },
    CreateStruct {
        id: ExprId,
        type_name: String,
        fields: Vec<(String, Interpretable)>,
    },
    /// Short-circuiting conjunction.
    And {
        id: ExprId,
        lhs: Box<Interpretable>,
        rhs: Box<Interpretable>,
    },
    /// Short-circuiting disjunction.
    Or {
        id: ExprId,
        lhs: Box<Interpretable>,
        rhs: Box<Interpretable>,
    },
    /// Evaluates exactly one branch.
    Conditional {
        id: ExprId,
        condition: Box<Interpretable>,
        truthy: Box<Interpretable>,
        falsy: Box<Interpretable>,
    },
    Comprehension {
        id: ExprId,
        iter_range: Box<Interpretable>,
        iter_var: String,
        accu_var: String,
        accu_init: Box<Interpretable>,
        loop_condition: Box<Interpretable>,
        loop_step: Box<Interpretable>,
        result: Box<Interpretable>,
    },
}

impl Interpretable {
    pub fn id(&self) -> ExprId {
        match self {
            Interpretable::Constant { id, .. }
            | Interpretable::Ident { id, .. }
            | Interpretable::Select { id, .. }
            | Interpretable::Call { id, .. }
            | Interpretable::CreateList { id, .. }
            | Interpretable::CreateMap { id, .. }
            | Interpretable::CreateStruct { id, .. }
            | Interpretable::And { id, .. }
            | Interpretable::Or { id, .. }
            | Interpretable::Conditional { id, .. }
            | Interpretable::Comprehension { id, .. } => *id,
        }
    }
}
