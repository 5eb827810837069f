//! Pull-based query operators. Every operator implements [`OpIterator`]:
//! `open` prepares it, `next` yields tuples until `None`, `rewind` resets
//! to the first tuple, and `close` drops any held state.

use crate::errors::QueryError;
use strata::{Tuple, TupleDesc};

mod dml;
mod filter;
mod join;
mod scan;

pub use dml::{Delete, Insert};
pub use filter::Filter;
pub use join::Join;
pub use scan::SeqScan;

/// The operator protocol. `next` before `open` is a protocol error.
pub trait OpIterator {
    fn open(&mut self) -> Result<(), QueryError>;
    fn next(&mut self) -> Result<Option<Tuple>, QueryError>;
    fn rewind(&mut self) -> Result<(), QueryError>;
    fn close(&mut self);
    fn tuple_desc(&self) -> &TupleDesc;
}

/// An operator over an in-memory tuple list. Used wherever results are
/// materialized before iteration (aggregates, tests).
pub struct TupleIterator {
    desc: TupleDesc,
    tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl TupleIterator {
    pub fn new(desc: TupleDesc, tuples: Vec<Tuple>) -> TupleIterator {
        TupleIterator {
            desc,
            tuples,
            cursor: 0,
            opened: false,
        }
    }
}

impl OpIterator for TupleIterator {
    fn open(&mut self) -> Result<(), QueryError> {
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        if !self.opened {
            return Err(QueryError::OperatorState("tuple iterator is not open"));
        }
        match self.tuples.get(self.cursor) {
            Some(tuple) => {
                self.cursor += 1;
                Ok(Some(tuple.clone()))
            }
            None => Ok(None),
        }
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        if !self.opened {
            return Err(QueryError::OperatorState("tuple iterator is not open"));
        }
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.opened = false;
        self.cursor = 0;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
