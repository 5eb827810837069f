//! Per-table statistics: fixed-width histograms over each column, built
//! with one pass for ranges and one pass to fill, plus the scan-cost and
//! cardinality estimates a cost model consumes.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::QueryError;
use crate::predicate::PredicateOp;
use strata::{BufferPool, Catalog, Field, FieldType, TransactionId};

/// Bucket count used for table statistics.
pub const NUM_HIST_BUCKETS: usize = 100;

/// Default cost charged per page of I/O.
pub const IO_COST_PER_PAGE: usize = 1000;

/// A fixed-width histogram over a known integer range. Space and update
/// time are constant in the number of values added.
#[derive(Debug, Clone)]
pub struct IntHistogram {
    buckets: Vec<usize>,
    min: i32,
    width: i64,
    total: usize,
}

impl IntHistogram {
    /// `min` and `max` bound every value that will be added.
    pub fn new(bucket_count: usize, min: i32, max: i32) -> IntHistogram {
        assert!(bucket_count > 0, "need at least one bucket");
        let span = (max as i64 - min as i64 + 1).max(1);
        let width = ((span + bucket_count as i64 - 1) / bucket_count as i64).max(1);
        IntHistogram {
            buckets: vec![0; bucket_count],
            min,
            width,
            total: 0,
        }
    }

    fn bucket_index(&self, value: i32) -> i64 {
        (value as i64 - self.min as i64).div_euclid(self.width)
    }

    pub fn add_value(&mut self, value: i32) {
        let index = self.bucket_index(value).clamp(0, self.buckets.len() as i64 - 1);
        self.buckets[index as usize] += 1;
        self.total += 1;
    }

    pub fn total_values(&self) -> usize {
        self.total
    }

    /// Estimated fraction of added values satisfying `value op constant`.
    pub fn estimate_selectivity(&self, op: PredicateOp, constant: i32) -> f64 {
        match op {
            PredicateOp::Equals | PredicateOp::Like => self.equals_selectivity(constant),
            PredicateOp::NotEquals => 1.0 - self.equals_selectivity(constant),
            PredicateOp::GreaterThan => self.greater_selectivity(constant),
            PredicateOp::LessThan => self.less_selectivity(constant),
            PredicateOp::GreaterThanOrEq => {
                self.greater_selectivity(constant) + self.equals_selectivity(constant)
            }
            PredicateOp::LessThanOrEq => {
                self.less_selectivity(constant) + self.equals_selectivity(constant)
            }
        }
    }

    fn equals_selectivity(&self, value: i32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let index = self.bucket_index(value);
        if index < 0 || index >= self.buckets.len() as i64 {
            return 0.0;
        }
        let height = self.buckets[index as usize] as f64;
        (height / self.width as f64) / self.total as f64
    }

    fn greater_selectivity(&self, value: i32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let index = self.bucket_index(value);
        if index < 0 {
            return 1.0;
        }
        if index >= self.buckets.len() as i64 {
            return 0.0;
        }
        let index = index as usize;
        // Fraction of the holding bucket above the constant, assuming a
        // uniform spread inside the bucket.
        let right_edge = self.min as i64 + (index as i64 + 1) * self.width;
        let above = (right_edge - 1 - value as i64) as f64 / self.width as f64;
        let in_bucket = self.buckets[index] as f64 * above;
        let beyond: usize = self.buckets[index + 1..].iter().sum();
        (in_bucket + beyond as f64) / self.total as f64
    }

    fn less_selectivity(&self, value: i32) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let index = self.bucket_index(value);
        if index < 0 {
            return 0.0;
        }
        if index >= self.buckets.len() as i64 {
            return 1.0;
        }
        let index = index as usize;
        let left_edge = self.min as i64 + index as i64 * self.width;
        let below = (value as i64 - left_edge) as f64 / self.width as f64;
        let in_bucket = self.buckets[index] as f64 * below;
        let before: usize = self.buckets[..index].iter().sum();
        (in_bucket + before as f64) / self.total as f64
    }
}

/// A histogram over strings, keyed by a stable packing of the first four
/// bytes into an integer.
#[derive(Debug, Clone)]
pub struct StringHistogram {
    inner: IntHistogram,
}

impl StringHistogram {
    pub fn new(bucket_count: usize) -> StringHistogram {
        StringHistogram {
            inner: IntHistogram::new(bucket_count, Self::key(""), Self::key("zzzz")),
        }
    }

    /// Packs the first four bytes big-endian so the ordering of keys
    /// roughly tracks lexicographic order.
    fn key(s: &str) -> i32 {
        let mut value: i32 = 0;
        for i in 0..4 {
            let byte = s.as_bytes().get(i).copied().unwrap_or(0).min(b'z');
            value = (value << 8) | byte as i32;
        }
        value
    }

    pub fn add_value(&mut self, s: &str) {
        self.inner.add_value(Self::key(s));
    }

    pub fn estimate_selectivity(&self, op: PredicateOp, constant: &str) -> f64 {
        self.inner.estimate_selectivity(op, Self::key(constant))
    }
}

/// Statistics over one table, computed by scanning it at construction
/// time.
pub struct TableStats {
    io_cost_per_page: usize,
    num_pages: u32,
    total_tuples: usize,
    int_histograms: HashMap<usize, IntHistogram>,
    string_histograms: HashMap<usize, StringHistogram>,
}

impl TableStats {
    /// Scans the table twice under a fresh transaction: once for column
    /// ranges, once to fill the histograms. The transaction commits so
    /// the read locks drain before the stats are used.
    pub fn new(
        catalog: &Arc<Catalog>,
        pool: &Arc<BufferPool>,
        table_id: u32,
        io_cost_per_page: usize,
    ) -> Result<TableStats, QueryError> {
        let file = catalog.file(table_id)?;
        let desc = file.tuple_desc().clone();
        let tid = TransactionId::new();

        let mut ranges: HashMap<usize, (i32, i32)> = HashMap::new();
        let mut total_tuples = 0;
        let mut iter = file.iter(pool, tid);
        iter.open()?;
        while let Some(tuple) = iter.next()? {
            total_tuples += 1;
            for (i, field) in tuple.fields().iter().enumerate() {
                if let Field::Int(v) = field {
                    let range = ranges.entry(i).or_insert((*v, *v));
                    range.0 = range.0.min(*v);
                    range.1 = range.1.max(*v);
                }
            }
        }

        let mut int_histograms = HashMap::new();
        let mut string_histograms = HashMap::new();
        for i in 0..desc.num_fields() {
            match desc.field_type(i) {
                FieldType::Int => {
                    let (min, max) = ranges.get(&i).copied().unwrap_or((0, 0));
                    int_histograms.insert(i, IntHistogram::new(NUM_HIST_BUCKETS, min, max));
                }
                FieldType::Str => {
                    string_histograms.insert(i, StringHistogram::new(NUM_HIST_BUCKETS));
                }
            }
        }

        iter.rewind()?;
        while let Some(tuple) = iter.next()? {
            for (i, field) in tuple.fields().iter().enumerate() {
                match field {
                    Field::Int(v) => {
                        if let Some(hist) = int_histograms.get_mut(&i) {
                            hist.add_value(*v);
                        }
                    }
                    Field::Str(s) => {
                        if let Some(hist) = string_histograms.get_mut(&i) {
                            hist.add_value(s);
                        }
                    }
                }
            }
        }
        iter.close();
        pool.transaction_complete(tid, true)?;

        Ok(TableStats {
            io_cost_per_page,
            num_pages: file.num_pages()?,
            total_tuples,
            int_histograms,
            string_histograms,
        })
    }

    /// Cost of a full sequential scan.
    pub fn estimate_scan_cost(&self) -> f64 {
        self.num_pages as f64 * self.io_cost_per_page as f64
    }

    /// Expected row count of a scan with the given predicate selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity) as usize
    }

    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }

    /// Estimated selectivity of `field op constant` over this table.
    pub fn estimate_selectivity(&self, field: usize, op: PredicateOp, constant: &Field) -> f64 {
        match constant {
            Field::Int(v) => self
                .int_histograms
                .get(&field)
                .map_or(0.0, |hist| hist.estimate_selectivity(op, *v)),
            Field::Str(s) => self
                .string_histograms
                .get(&field)
                .map_or(0.0, |hist| hist.estimate_selectivity(op, s)),
        }
    }
}
