use std::sync::Arc;

use super::OpIterator;
use crate::errors::QueryError;
use strata::{BufferPool, Catalog, Field, FieldType, StorageError, TransactionId, Tuple, TupleDesc};

fn count_desc(name: &str) -> TupleDesc {
    TupleDesc::new(vec![(FieldType::Int, Some(name.to_string()))])
}

/// Inserts every tuple its child yields into one table, through the
/// buffer pool. Yields a single one-field tuple holding the insert count,
/// then `None`; rewinding does not re-execute the writes.
pub struct Insert {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: u32,
    child: Box<dyn OpIterator>,
    desc: TupleDesc,
    done: bool,
}

impl Insert {
    pub fn new(
        catalog: &Arc<Catalog>,
        pool: &Arc<BufferPool>,
        tid: TransactionId,
        child: Box<dyn OpIterator>,
        table_id: u32,
    ) -> Result<Insert, QueryError> {
        let table_desc = catalog.tuple_desc(table_id)?;
        if *child.tuple_desc() != table_desc {
            return Err(QueryError::Storage(StorageError::SchemaMismatch));
        }
        Ok(Insert {
            pool: Arc::clone(pool),
            tid,
            table_id,
            child,
            desc: count_desc("inserted"),
            done: false,
        })
    }
}

impl OpIterator for Insert {
    fn open(&mut self) -> Result<(), QueryError> {
        self.child.open()?;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        if self.done {
            return Ok(None);
        }
        let mut count = 0;
        while let Some(mut tuple) = self.child.next()? {
            self.pool.insert_tuple(self.tid, self.table_id, &mut tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(self.desc.clone(), vec![Field::Int(count)])))
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}

/// Deletes every tuple its child yields, resolving each one's table from
/// its record id. Same run-once count protocol as [`Insert`].
pub struct Delete {
    pool: Arc<BufferPool>,
    tid: TransactionId,
    child: Box<dyn OpIterator>,
    desc: TupleDesc,
    done: bool,
}

impl Delete {
    pub fn new(pool: &Arc<BufferPool>, tid: TransactionId, child: Box<dyn OpIterator>) -> Delete {
        Delete {
            pool: Arc::clone(pool),
            tid,
            child,
            desc: count_desc("deleted"),
            done: false,
        }
    }
}

impl OpIterator for Delete {
    fn open(&mut self) -> Result<(), QueryError> {
        self.child.open()?;
        self.done = false;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        if self.done {
            return Ok(None);
        }
        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            self.pool.delete_tuple(self.tid, &tuple)?;
            count += 1;
        }
        self.done = true;
        Ok(Some(Tuple::new(self.desc.clone(), vec![Field::Int(count)])))
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        self.child.rewind()
    }

    fn close(&mut self) {
        self.child.close();
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
