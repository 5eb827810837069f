//! Comparison predicates used by the filter and join operators.

use std::cmp::Ordering;
use std::fmt;

use strata::{Field, Tuple};

/// Comparison operators. `Like` is substring containment for strings and
/// plain equality for integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredicateOp {
    Equals,
    GreaterThan,
    LessThan,
    LessThanOrEq,
    GreaterThanOrEq,
    Like,
    NotEquals,
}

impl PredicateOp {
    /// Compares two fields. Fields of different types never match.
    pub fn apply(self, lhs: &Field, rhs: &Field) -> bool {
        match (lhs, rhs) {
            (Field::Int(a), Field::Int(b)) => self.holds(a.cmp(b)),
            (Field::Str(a), Field::Str(b)) => match self {
                PredicateOp::Like => a.contains(b.as_str()),
                _ => self.holds(a.cmp(b)),
            },
            _ => false,
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            PredicateOp::Equals | PredicateOp::Like => ord == Ordering::Equal,
            PredicateOp::GreaterThan => ord == Ordering::Greater,
            PredicateOp::LessThan => ord == Ordering::Less,
            PredicateOp::LessThanOrEq => ord != Ordering::Greater,
            PredicateOp::GreaterThanOrEq => ord != Ordering::Less,
            PredicateOp::NotEquals => ord != Ordering::Equal,
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            PredicateOp::Equals => "=",
            PredicateOp::GreaterThan => ">",
            PredicateOp::LessThan => "<",
            PredicateOp::LessThanOrEq => "<=",
            PredicateOp::GreaterThanOrEq => ">=",
            PredicateOp::Like => "like",
            PredicateOp::NotEquals => "<>",
        };
        write!(f, "{}", symbol)
    }
}

/// Compares one field of a tuple against a constant.
#[derive(Debug, Clone)]
pub struct Predicate {
    field: usize,
    op: PredicateOp,
    operand: Field,
}

impl Predicate {
    pub fn new(field: usize, op: PredicateOp, operand: Field) -> Predicate {
        Predicate { field, op, operand }
    }

    pub fn field(&self) -> usize {
        self.field
    }

    pub fn op(&self) -> PredicateOp {
        self.op
    }

    pub fn operand(&self) -> &Field {
        &self.operand
    }

    /// Whether the tuple's field satisfies the predicate. A missing field
    /// index never matches.
    pub fn filter(&self, tuple: &Tuple) -> bool {
        tuple
            .field(self.field)
            .map_or(false, |value| self.op.apply(value, &self.operand))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f[{}] {} {}", self.field, self.op, self.operand)
    }
}

/// Compares one field of each side of a join.
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    field1: usize,
    op: PredicateOp,
    field2: usize,
}

impl JoinPredicate {
    pub fn new(field1: usize, op: PredicateOp, field2: usize) -> JoinPredicate {
        JoinPredicate { field1, op, field2 }
    }

    pub fn field1(&self) -> usize {
        self.field1
    }

    pub fn field2(&self) -> usize {
        self.field2
    }

    pub fn op(&self) -> PredicateOp {
        self.op
    }

    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        match (left.field(self.field1), right.field(self.field2)) {
            (Some(a), Some(b)) => self.op.apply(a, b),
            _ => false,
        }
    }
}
