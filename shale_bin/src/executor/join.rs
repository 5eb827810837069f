use super::OpIterator;
use crate::errors::QueryError;
use crate::predicate::JoinPredicate;
use strata::{Tuple, TupleDesc};

/// Nested-loop join. The current outer tuple is cached while the inner
/// child is drained and rewound; matching pairs are concatenated, so an
/// equality join repeats the join attribute in the output.
pub struct Join {
    predicate: JoinPredicate,
    outer: Box<dyn OpIterator>,
    inner: Box<dyn OpIterator>,
    desc: TupleDesc,
    current_outer: Option<Tuple>,
}

impl Join {
    pub fn new(
        predicate: JoinPredicate,
        outer: Box<dyn OpIterator>,
        inner: Box<dyn OpIterator>,
    ) -> Join {
        let desc = TupleDesc::merge(outer.tuple_desc(), inner.tuple_desc());
        Join {
            predicate,
            outer,
            inner,
            desc,
            current_outer: None,
        }
    }

    pub fn predicate(&self) -> &JoinPredicate {
        &self.predicate
    }
}

impl OpIterator for Join {
    fn open(&mut self) -> Result<(), QueryError> {
        self.outer.open()?;
        self.inner.open()?;
        self.current_outer = None;
        Ok(())
    }

    fn next(&mut self) -> Result<Option<Tuple>, QueryError> {
        loop {
            if self.current_outer.is_none() {
                match self.outer.next()? {
                    Some(tuple) => self.current_outer = Some(tuple),
                    None => return Ok(None),
                }
            }
            let left = self.current_outer.clone().expect("outer tuple cached");

            while let Some(right) = self.inner.next()? {
                if self.predicate.filter(&left, &right) {
                    let mut fields = left.fields().to_vec();
                    fields.extend(right.fields().iter().cloned());
                    return Ok(Some(Tuple::new(self.desc.clone(), fields)));
                }
            }

            self.current_outer = None;
            self.inner.rewind()?;
        }
    }

    fn rewind(&mut self) -> Result<(), QueryError> {
        self.outer.rewind()?;
        self.inner.rewind()?;
        self.current_outer = None;
        Ok(())
    }

    fn close(&mut self) {
        self.inner.close();
        self.outer.close();
        self.current_outer = None;
    }

    fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::TupleIterator;
    use crate::predicate::PredicateOp;
    use strata::{Field, FieldType};

    fn side(values: &[i32]) -> Box<dyn OpIterator> {
        let desc = TupleDesc::with_types(vec![FieldType::Int]);
        let tuples = values
            .iter()
            .map(|v| Tuple::new(desc.clone(), vec![Field::Int(*v)]))
            .collect();
        Box::new(TupleIterator::new(desc, tuples))
    }

    fn ints(tuple: &Tuple) -> Vec<i32> {
        tuple
            .fields()
            .iter()
            .map(|f| match f {
                Field::Int(v) => *v,
                Field::Str(_) => panic!("unexpected string"),
            })
            .collect()
    }

    #[test]
    fn equality_join_concatenates_matches() {
        let pred = JoinPredicate::new(0, PredicateOp::Equals, 0);
        let mut join = Join::new(pred, side(&[1, 2, 3]), side(&[2, 3, 4]));
        assert_eq!(join.tuple_desc().num_fields(), 2);

        join.open().unwrap();
        let mut rows = Vec::new();
        while let Some(t) = join.next().unwrap() {
            rows.push(ints(&t));
        }
        assert_eq!(rows, vec![vec![2, 2], vec![3, 3]]);
    }

    #[test]
    fn inequality_join_crosses_every_pair() {
        let pred = JoinPredicate::new(0, PredicateOp::LessThan, 0);
        let mut join = Join::new(pred, side(&[1, 2]), side(&[1, 2]));
        join.open().unwrap();
        let mut rows = Vec::new();
        while let Some(t) = join.next().unwrap() {
            rows.push(ints(&t));
        }
        assert_eq!(rows, vec![vec![1, 2]]);
    }

    #[test]
    fn rewind_restarts_the_cross_product() {
        let pred = JoinPredicate::new(0, PredicateOp::Equals, 0);
        let mut join = Join::new(pred, side(&[5]), side(&[5]));
        join.open().unwrap();
        assert!(join.next().unwrap().is_some());
        assert!(join.next().unwrap().is_none());
        join.rewind().unwrap();
        assert!(join.next().unwrap().is_some());
        join.close();
    }
}
