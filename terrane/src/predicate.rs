use std::cmp::Ordering;
use std::fmt;

use strata::{Field, Tuple};

/// Comparison operators a predicate can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    NotEquals,
}

impl Op {
    /// Whether `lhs op rhs` holds. Fields of different types do not
    /// compare, so a mistyped operand never matches.
    pub fn compare(&self, lhs: &Field, rhs: &Field) -> bool {
        let Some(ord) = lhs.partial_cmp(rhs) else {
            return false;
        };
        match self {
            Op::Equals => ord == Ordering::Equal,
            Op::GreaterThan => ord == Ordering::Greater,
            Op::LessThan => ord == Ordering::Less,
            Op::LessThanOrEq => ord != Ordering::Greater,
            Op::GreaterThanOrEq => ord != Ordering::Less,
            Op::NotEquals => ord != Ordering::Equal,
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Op::Equals => "=",
            Op::GreaterThan => ">",
            Op::LessThan => "<",
            Op::LessThanOrEq => "<=",
            Op::GreaterThanOrEq => ">=",
            Op::NotEquals => "<>",
        };
        write!(f, "{s}")
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: Op,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: Op, operand: Field) -> Predicate {
        Predicate { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    pub fn filter(&self, tuple: &Tuple) -> bool {
        self.op.compare(tuple.field(self.field), &self.operand)
    }
}

/// Compares a field of one tuple against a field of another.
#[derive(Debug, Clone, Copy)]
pub struct JoinPredicate {
    left_field: usize,
    op: Op,
    right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: Op, right_field: usize) -> JoinPredicate {
        JoinPredicate {
            left_field,
            op,
            right_field,
        }
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        self.op
            .compare(left.field(self.left_field), right.field(self.right_field))
    }
}
