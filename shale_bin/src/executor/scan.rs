use std::sync::Arc;

use super::OpIterator;
use crate::errors::QueryError;
use strata::{BufferPool, Catalog, HeapFileIterator, TransactionId, Tuple, TupleDesc};

/// Sequential scan over one table, yielding tuples in page-then-slot
/// order. The exposed descriptor prefixes every field name with the scan's
/// alias, which keeps names unambiguous after joins.
pub struct SeqScan {
    catalog: Arc<Catalog>,
    pool: Arc<BufferPool>,
    tid: TransactionId,
    table_id: u32,
    alias: String,
    desc: TupleDesc,
    iter: Option<HeapFileIterator>,
}

impl SeqScan {
    pub fn new(
        catalog: &Arc<Catalog>,
        pool: &Arc<BufferPool>,
        tid: TransactionId,
        table_id: u32,
        alias: &str,
    ) -> Result<SeqScan, QueryError> {
        let base = catalog.tuple_desc(table_id)?;
        let desc = TupleDesc::new(
            base.iter()
                .map(|(ty, name)| {
                    let name = name.map(|name| format!("{}.{}", alias, name));
                    (ty, name)
                })
                .collect(),
        );
        Ok(SeqScan {
            catalog: Arc::clone(catalog),
            pool: Arc::clone(pool),
            tid,
            table_id,
            alias: alias.to_string(),
            desc,
            iter: None,
        })
    }

    /// The scanned table's name in the catalog.
    pub fn table_name(&self) -> Result<String, QueryError> {
        Ok(self.catalog.table_name(self.table_id)?)
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl OpIterator for SeqScan {
    fn open(&mut self) -> Result<(), QueryError> {
        let file = self.catalog.file(self.table_id)?;
        let mut iter = file.iter(&self.pool, self.tid);
        iter.open()?;
        self.iter = Some(iter);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        let iter = self
            .iter
            .as_mut()
            .ok_or(QueryError::OperatorState("scan is not open"))?;
        Ok(iter.next()?)
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        let iter = self
            .iter
            .as_mut()
            .ok_or(QueryError::OperatorState("scan is not open"))?;
        Ok(iter.rewind()?)
    }

    fn close(&mut self) {
        if let Some(mut iter) = self.iter.take() {
            iter.close();
        }
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}
