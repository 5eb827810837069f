//! Grouped aggregation: per-type aggregators fold a column while the
//! operator drains its child, then the grouped results are iterated like
//! any other tuple stream.

use std::collections::HashMap;
use std::fmt;

use crate::errors::QueryError;
use crate::executor::{OpIterator, TupleIterator};
use strata::{Field, FieldType, Tuple, TupleDesc};

/// Aggregation functions over a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", name)
    }
}

fn result_desc(group_by: Option<FieldType>) -> TupleDesc {
    match group_by {
        Some(ty) => TupleDesc::new(vec![
            (ty, Some("group".to_string())),
            (FieldType::Int, Some("aggregate".to_string())),
        ]),
        None => TupleDesc::new(vec![(FieldType::Int, Some("aggregate".to_string()))]),
    }
}

fn result_tuples(
    desc: &TupleDesc,
    groups: impl Iterator<Item = (Option<Field>, i32)>,
) -> Vec<Tuple> {
    groups
        .map(|(key, value)| match key {
            Some(group) => Tuple::new(desc.clone(), vec![group, Field::Int(value)]),
            None => Tuple::new(desc.clone(), vec![Field::Int(value)]),
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Accum {
    value: i32,
    count: i32,
}

/// Folds an integer column, optionally grouped by another field. The
/// map key is `None` when no grouping was requested.
pub struct IntegerAggregator {
    group_by: Option<(usize, FieldType)>,
    afield: usize,
    op: AggregateOp,
    groups: HashMap<Option<Field>, Accum>,
}

impl IntegerAggregator {
    pub fn new(
        group_by: Option<(usize, FieldType)>,
        afield: usize,
        op: AggregateOp,
    ) -> IntegerAggregator {
        IntegerAggregator {
            group_by,
            afield,
            op,
            groups: HashMap::new(),
        }
    }

    /// Merges one tuple into its group.
    pub fn merge(&mut self, tuple: &Tuple) -> Result<(), QueryError> {
        let value = match tuple.field(self.afield) {
            Some(Field::Int(v)) => *v,
            _ => {
                return Err(QueryError::OperatorState(
                    "integer aggregate over a non-integer column",
                ))
            }
        };
        let key = match self.group_by {
            Some((gfield, _)) => Some(
                tuple
                    .field(gfield)
                    .cloned()
                    .ok_or(QueryError::OperatorState("group-by field out of range"))?,
            ),
            None => None,
        };

        let acc = self.groups.entry(key).or_insert(Accum { value: 0, count: 0 });
        if acc.count == 0 {
            acc.value = match self.op {
                AggregateOp::Count => 1,
                _ => value,
            };
            acc.count = 1;
        } else {
            acc.count += 1;
            acc.value = match self.op {
                AggregateOp::Min => acc.value.min(value),
                AggregateOp::Max => acc.value.max(value),
                AggregateOp::Sum | AggregateOp::Avg => acc.value + value,
                AggregateOp::Count => acc.value + 1,
            };
        }
        Ok(())
    }

    /// The grouped results: `(group, aggregate)` pairs, or a single
    /// `(aggregate)` tuple without grouping. Averages use integer
    /// division.
    pub fn iterator(&self) -> TupleIterator {
        let desc = result_desc(self.group_by.map(|(_, ty)| ty));
        let op = self.op;
        let tuples = result_tuples(
            &desc,
            self.groups.iter().map(|(key, acc)| {
                let value = match op {
                    AggregateOp::Avg => acc.value / acc.count,
                    _ => acc.value,
                };
                (key.clone(), value)
            }),
        );
        TupleIterator::new(desc, tuples)
    }
}

/// Counts string values, optionally grouped. Counting is the only
/// aggregate defined over strings.
pub struct StringAggregator {
    group_by: Option<(usize, FieldType)>,
    counts: HashMap<Option<Field>, i32>,
}

impl StringAggregator {
    /// Fails unless `op` is `Count`.
    pub fn new(
        group_by: Option<(usize, FieldType)>,
        _afield: usize,
        op: AggregateOp,
    ) -> Result<StringAggregator, QueryError> {
        if op != AggregateOp::Count {
            return Err(QueryError::OperatorState(
                "string columns only support count",
            ));
        }
        Ok(StringAggregator {
            group_by,
            counts: HashMap::new(),
        })
    }

    pub fn merge(&mut self, tuple: &Tuple) -> Result<(), QueryError> {
        let key = match self.group_by {
            Some((gfield, _)) => Some(
                tuple
                    .field(gfield)
                    .cloned()
                    .ok_or(QueryError::OperatorState("group-by field out of range"))?,
            ),
            None => None,
        };
        *self.counts.entry(key).or_insert(0) += 1;
        Ok(())
    }

    pub fn iterator(&self) -> TupleIterator {
        let desc = result_desc(self.group_by.map(|(_, ty)| ty));
        let tuples = result_tuples(
            &desc,
            self.counts.iter().map(|(key, count)| (key.clone(), *count)),
        );
        TupleIterator::new(desc, tuples)
    }
}

enum AggregatorImpl {
    Int(IntegerAggregator),
    Str(StringAggregator),
}

/// The aggregate operator: drains its child on `open`, then iterates the
/// grouped results.
pub struct Aggregate {
    child: Box<dyn OpIterator>,
    afield: usize,
    group_by: Option<usize>,
    op: AggregateOp,
    desc: TupleDesc,
    results: Option<TupleIterator>,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn OpIterator>,
        afield: usize,
        group_by: Option<usize>,
        op: AggregateOp,
    ) -> Result<Aggregate, QueryError> {
        let child_desc = child.tuple_desc();
        if afield >= child_desc.num_fields() {
            return Err(QueryError::OperatorState("aggregate field out of range"));
        }
        let group_type = match group_by {
            Some(gfield) if gfield >= child_desc.num_fields() => {
                return Err(QueryError::OperatorState("group-by field out of range"));
            }
            Some(gfield) => Some(child_desc.field_type(gfield)),
            None => None,
        };
        // Validate string aggregates up front.
        if child_desc.field_type(afield) == FieldType::Str && op != AggregateOp::Count {
            return Err(QueryError::OperatorState(
                "string columns only support count",
            ));
        }
        let desc = result_desc(group_type);
        Ok(Aggregate {
            child,
            afield,
            group_by,
            op,
            desc,
            results: None,
        })
    }

    fn group_key(&self) -> Option<(usize, FieldType)> {
        self.group_by
            .map(|gfield| (gfield, self.child.tuple_desc().field_type(gfield)))
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> Result<(), QueryError> {
        self.child.open()?;
        let group_key = self.group_key();
        let mut aggregator = match self.child.tuple_desc().field_type(self.afield) {
            FieldType::Int => {
                AggregatorImpl::Int(IntegerAggregator::new(group_key, self.afield, self.op))
            }
            FieldType::Str => {
                AggregatorImpl::Str(StringAggregator::new(group_key, self.afield, self.op)?)
            }
        };
        while let Some(tuple) = self.child.next()? {
            match &mut aggregator {
                AggregatorImpl::Int(agg) => agg.merge(&tuple)?,
                AggregatorImpl::Str(agg) => agg.merge(&tuple)?,
            }
        }
        let mut results = match &aggregator {
            AggregatorImpl::Int(agg) => agg.iterator(),
            AggregatorImpl::Str(agg) => agg.iterator(),
        };
        results.open()?;
        self.results = Some(results);
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        self.results
            .as_mut()
            .ok_or(QueryError::OperatorState("aggregate is not open"))?
            .next()
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        self.results
            .as_mut()
            .ok_or(QueryError::OperatorState("aggregate is not open"))?
            .rewind()
    }

    fn close(&mut self) {
        self.child.close();
        self.results = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped_child() -> Box<dyn OpIterator> {
        // (group, value): two groups with three and two rows.
        let desc = TupleDesc::with_types(vec![FieldType::Int, FieldType::Int]);
        let rows = [(1, 10), (1, 20), (1, 30), (2, 5), (2, 7)];
        let tuples = rows
            .iter()
            .map(|(g, v)| Tuple::new(desc.clone(), vec![Field::Int(*g), Field::Int(*v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn drain(agg: &mut Aggregate) -> Vec<(Option<i32>, i32)> {
        let mut rows = Vec::new();
        while let Some(t) = agg.next().unwrap() {
            match t.fields() {
                [Field::Int(g), Field::Int(v)] => rows.push((Some(*g), *v)),
                [Field::Int(v)] => rows.push((None, *v)),
                other => panic!("unexpected result row {:?}", other),
            }
        }
        rows.sort();
        rows
    }

    #[test]
    fn grouped_sum_and_avg() {
        let mut sum = Aggregate::new(grouped_child(), 1, Some(0), AggregateOp::Sum).unwrap();
        sum.open().unwrap();
        assert_eq!(drain(&mut sum), vec![(Some(1), 60), (Some(2), 12)]);

        let mut avg = Aggregate::new(grouped_child(), 1, Some(0), AggregateOp::Avg).unwrap();
        avg.open().unwrap();
        assert_eq!(drain(&mut avg), vec![(Some(1), 20), (Some(2), 6)]);
    }

    #[test]
    fn grouped_min_max_count() {
        let mut min = Aggregate::new(grouped_child(), 1, Some(0), AggregateOp::Min).unwrap();
        min.open().unwrap();
        assert_eq!(drain(&mut min), vec![(Some(1), 10), (Some(2), 5)]);

        let mut max = Aggregate::new(grouped_child(), 1, Some(0), AggregateOp::Max).unwrap();
        max.open().unwrap();
        assert_eq!(drain(&mut max), vec![(Some(1), 30), (Some(2), 7)]);

        let mut count = Aggregate::new(grouped_child(), 1, Some(0), AggregateOp::Count).unwrap();
        count.open().unwrap();
        assert_eq!(drain(&mut count), vec![(Some(1), 3), (Some(2), 2)]);
    }

    #[test]
    fn ungrouped_aggregate_yields_one_row() {
        let mut sum = Aggregate::new(grouped_child(), 1, None, AggregateOp::Sum).unwrap();
        sum.open().unwrap();
        assert_eq!(drain(&mut sum), vec![(None, 72)]);
        assert!(sum.next().unwrap().is_none());
        sum.rewind().unwrap();
        assert_eq!(drain(&mut sum), vec![(None, 72)]);
    }

    #[test]
    fn string_column_counts_rows() {
        let desc = TupleDesc::with_types(vec![FieldType::Str]);
        let tuples = ["a", "b", "c"]
            .iter()
            .map(|s| Tuple::new(desc.clone(), vec![Field::Str(s.to_string())]))
            .collect();
        let child = Box::new(TupleIterator::new(desc, tuples));
        let mut count = Aggregate::new(child, 0, None, AggregateOp::Count).unwrap();
        count.open().unwrap();
        assert_eq!(drain(&mut count), vec![(None, 3)]);
    }

    #[test]
    fn string_column_rejects_other_ops() {
        let desc = TupleDesc::with_types(vec![FieldType::Str]);
        let child = Box::new(TupleIterator::new(desc, Vec::new()));
        assert!(matches!(
            Aggregate::new(child, 0, None, AggregateOp::Sum),
            Err(QueryError::OperatorState(_))
        ));
    }

    #[test]
    fn string_aggregator_constructor_rejects_non_count() {
        assert!(StringAggregator::new(None, 0, AggregateOp::Min).is_err());
        assert!(StringAggregator::new(None, 0, AggregateOp::Count).is_ok());
    }
}
