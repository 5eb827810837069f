use super::OpIterator;
use crate::errors::QueryError;
use crate::predicate::Predicate;
use strata::{Tuple, TupleDesc};

/// Passes through the child's tuples that satisfy a predicate.
pub struct Filter {
    predicate: Predicate,
    child: Box<dyn OpIterator>,
}

impl Filter {
    pub fn new(predicate: Predicate, child: Box<dyn OpIterator>) -> Filter {
        Filter { predicate, child }
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }
}

impl OpIterator for Filter {
    fn open(&mut self) -> Result<(), QueryError> {
        self.child.open()
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        while let Some(tuple) = self.child.next()? {
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        self.child.tuple_desc()
    }
}
