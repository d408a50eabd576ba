use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use strata::{Field, FieldType, Tuple, TupleDesc};

use crate::errors::{ExecutionError, Result};
use crate::exec::Operator;

/// The supported aggregate functions. Integer columns support all five;
/// string columns support COUNT only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AggOp::Min => "MIN",
            AggOp::Max => "MAX",
            AggOp::Sum => "SUM",
            AggOp::Avg => "AVG",
            AggOp::Count => "COUNT",
        };
        write!(f, "{s}")
    }
}

/// Output schema: `(groupVal, aggregateVal)` when grouping, else a single
/// `(aggregateVal)`.
fn output_desc(group_type: Option<FieldType>) -> TupleDesc {
    match group_type {
        Some(gt) => TupleDesc::new(
            vec![gt, FieldType::Int],
            vec![Some("groupVal".to_string()), Some("aggregateVal".to_string())],
        ),
        None => TupleDesc::new(
            vec![FieldType::Int],
            vec![Some("aggregateVal".to_string())],
        ),
    }
}

fn result_tuple(desc: &Arc<TupleDesc>, group: Option<Field>, value: i32) -> Tuple {
    match group {
        Some(g) => Tuple::new(Arc::clone(desc), vec![g, Field::Int(value)]),
        None => Tuple::new(Arc::clone(desc), vec![Field::Int(value)]),
    }
}

/// Computes one aggregate over integer fields, keyed by an optional
/// group-by column. Each group keeps a `(running, count)` accumulator; AVG
/// divides at emit time with integer division.
pub struct IntegerAggregator {
    group_field: Option<usize>,
    group_type: Option<FieldType>,
    agg_field: usize,
    op: AggOp,
    groups: HashMap<Option<Field>, (i64, i64)>,
    desc: Arc<TupleDesc>,
}

impl IntegerAggregator {
    pub fn new(
        group_field: Option<usize>,
        group_type: Option<FieldType>,
        agg_field: usize,
        op: AggOp,
    ) -> IntegerAggregator {
        assert_eq!(
            group_field.is_some(),
            group_type.is_some(),
            "grouping takes both a field and its type"
        );
        IntegerAggregator {
            group_field,
            group_type,
            agg_field,
            op,
            groups: HashMap::new(),
            desc: Arc::new(output_desc(group_type)),
        }
    }

    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        let key = match self.group_field {
            Some(i) => {
                let group = tuple.field(i).clone();
                if Some(group.field_type()) != self.group_type {
                    return Err(ExecutionError::IllegalArgument(format!(
                        "group-by field is {}, expected {}",
                        group.field_type(),
                        self.group_type.expect("grouping type is set")
                    )));
                }
                Some(group)
            }
            None => None,
        };
        let Field::Int(v) = tuple.field(self.agg_field) else {
            return Err(ExecutionError::IllegalArgument(
                "integer aggregator applied to a non-integer field".to_string(),
            ));
        };
        let v = i64::from(*v);

        let init = match self.op {
            AggOp::Min => (i64::MAX, 0),
            AggOp::Max => (i64::MIN, 0),
            AggOp::Sum | AggOp::Avg | AggOp::Count => (0, 0),
        };
        let (running, count) = self.groups.entry(key).or_insert(init);
        match self.op {
            AggOp::Min => *running = (*running).min(v),
            AggOp::Max => *running = (*running).max(v),
            AggOp::Sum | AggOp::Avg => *running += v,
            AggOp::Count => {}
        }
        *count += 1;
        Ok(())
    }

    /// One tuple per group, in hash-iteration order.
    pub fn results(&self) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, (running, count))| {
                let value = match self.op {
                    AggOp::Min | AggOp::Max | AggOp::Sum => *running,
                    AggOp::Count => *count,
                    AggOp::Avg => *running / *count,
                };
                result_tuple(&self.desc, key.clone(), value as i32)
            })
            .collect()
    }

    pub fn desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}

/// Counts string fields per group. Any other function over a string column
/// is rejected at construction.
pub struct StringAggregator {
    group_field: Option<usize>,
    agg_field: usize,
    groups: HashMap<Option<Field>, i64>,
    desc: Arc<TupleDesc>,
}

impl StringAggregator {
    pub fn new(
        group_field: Option<usize>,
        group_type: Option<FieldType>,
        agg_field: usize,
        op: AggOp,
    ) -> Result<StringAggregator> {
        if op != AggOp::Count {
            return Err(ExecutionError::IllegalArgument(format!(
                "string columns aggregate with COUNT only, got {op}"
            )));
        }
        assert_eq!(
            group_field.is_some(),
            group_type.is_some(),
            "grouping takes both a field and its type"
        );
        Ok(StringAggregator {
            group_field,
            agg_field,
            groups: HashMap::new(),
            desc: Arc::new(output_desc(group_type)),
        })
    }

    pub fn merge(&mut self, tuple: &Tuple) -> Result<()> {
        if !matches!(tuple.field(self.agg_field), Field::Text(_)) {
            return Err(ExecutionError::IllegalArgument(
                "string aggregator applied to a non-string field".to_string(),
            ));
        }
        let key = self.group_field.map(|i| tuple.field(i).clone());
        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    pub fn results(&self) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(key, count)| result_tuple(&self.desc, key.clone(), *count as i32))
            .collect()
    }

    pub fn desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}

/// The aggregation operator: one aggregated column, one optional grouping
/// column. Eager: `open` drains the child completely, then emits one tuple
/// per group.
pub struct Aggregate {
    child: Box<dyn Operator>,
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
    desc: Arc<TupleDesc>,
    results: Vec<Tuple>,
    pos: usize,
    opened: bool,
}

impl Aggregate {
    pub fn new(
        child: Box<dyn Operator>,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
    ) -> Result<Aggregate> {
        let child_desc = child.tuple_desc();
        if child_desc.field_type(agg_field) == FieldType::Text && op != AggOp::Count {
            return Err(ExecutionError::IllegalArgument(format!(
                "string columns aggregate with COUNT only, got {op}"
            )));
        }
        let group_type = group_field.map(|i| child_desc.field_type(i));
        Ok(Aggregate {
            child,
            agg_field,
            group_field,
            op,
            desc: Arc::new(output_desc(group_type)),
            results: Vec::new(),
            pos: 0,
            opened: false,
        })
    }

    pub fn op(&self) -> AggOp {
        self.op
    }

    fn drain_child(&mut self) -> Result<Vec<Tuple>> {
        let child_desc = self.child.tuple_desc();
        let group_type = self.group_field.map(|i| child_desc.field_type(i));
        match child_desc.field_type(self.agg_field) {
            FieldType::Int => {
                let mut agg =
                    IntegerAggregator::new(self.group_field, group_type, self.agg_field, self.op);
                while self.child.has_next()? {
                    agg.merge(&self.child.next()?)?;
                }
                Ok(agg.results())
            }
            FieldType::Text => {
                let mut agg =
                    StringAggregator::new(self.group_field, group_type, self.agg_field, self.op)?;
                while self.child.has_next()? {
                    agg.merge(&self.child.next()?)?;
                }
                Ok(agg.results())
            }
        }
    }
}

impl Operator for Aggregate {
    fn open(&mut self) -> Result<()> {
        self.child.open()?;
        self.results = self.drain_child()?;
        self.pos = 0;
        self.opened = true;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results.clear();
        self.pos = 0;
        self.opened = false;
    }

    fn has_next(&mut self) -> Result<bool> {
        Ok(self.opened && self.pos < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple> {
        if !self.has_next()? {
            return Err(ExecutionError::NoSuchElement);
        }
        let tuple = self.results[self.pos].clone();
        self.pos += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> Result<()> {
        self.child.rewind()?;
        self.pos = 0;
        Ok(())
    }

    fn tuple_desc(&self) -> Arc<TupleDesc> {
        Arc::clone(&self.desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Operator;

    /// Feeds canned rows to the operator under test.
    struct MockOperator {
        desc: Arc<TupleDesc>,
        rows: Vec<Tuple>,
        pos: usize,
    }

    impl MockOperator {
        fn new(desc: Arc<TupleDesc>, rows: Vec<Vec<Field>>) -> MockOperator {
            let rows = rows
                .into_iter()
                .map(|fields| Tuple::new(Arc::clone(&desc), fields))
                .collect();
            MockOperator { desc, rows, pos: 0 }
        }
    }

    impl Operator for MockOperator {
        fn open(&mut self) -> Result<()> {
            self.pos = 0;
            Ok(())
        }

        fn close(&mut self) {}

        fn has_next(&mut self) -> Result<bool> {
            Ok(self.pos < self.rows.len())
        }

        fn next(&mut self) -> Result<Tuple> {
            let tuple = self.rows[self.pos].clone();
            self.pos += 1;
            Ok(tuple)
        }

        fn rewind(&mut self) -> Result<()> {
            self.pos = 0;
            Ok(())
        }

        fn tuple_desc(&self) -> Arc<TupleDesc> {
            Arc::clone(&self.desc)
        }
    }

    fn int_rows(values: &[(i32, i32)]) -> MockOperator {
        let desc = Arc::new(TupleDesc::new(
            vec![FieldType::Int, FieldType::Int],
            vec![Some("g".to_string()), Some("v".to_string())],
        ));
        MockOperator::new(
            desc,
            values
                .iter()
                .map(|(g, v)| vec![Field::Int(*g), Field::Int(*v)])
                .collect(),
        )
    }

    fn drain(op: &mut dyn Operator) -> Vec<Tuple> {
        let mut out = Vec::new();
        while op.has_next().unwrap() {
            out.push(op.next().unwrap());
        }
        out
    }

    #[test]
    fn ungrouped_sum() {
        let child = int_rows(&[(0, 1), (0, 2), (0, 3)]);
        let mut agg = Aggregate::new(Box::new(child), 1, None, AggOp::Sum).unwrap();
        agg.open().unwrap();
        let rows = drain(&mut agg);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].field(0), &Field::Int(6));
    }

    #[test]
    fn avg_uses_integer_division() {
        let child = int_rows(&[(0, 1), (0, 2)]);
        let mut agg = Aggregate::new(Box::new(child), 1, None, AggOp::Avg).unwrap();
        agg.open().unwrap();
        assert_eq!(agg.next().unwrap().field(0), &Field::Int(1));
    }

    #[test]
    fn grouped_min_emits_one_row_per_group() {
        let child = int_rows(&[(1, 10), (1, 3), (2, 7)]);
        let mut agg = Aggregate::new(Box::new(child), 1, Some(0), AggOp::Min).unwrap();
        agg.open().unwrap();
        let mut rows: Vec<(i32, i32)> = drain(&mut agg)
            .into_iter()
            .map(|t| {
                let (Field::Int(g), Field::Int(v)) = (t.field(0).clone(), t.field(1).clone())
                else {
                    panic!("expected int pair");
                };
                (g, v)
            })
            .collect();
        rows.sort_unstable();
        assert_eq!(rows, vec![(1, 3), (2, 7)]);
        assert_eq!(agg.tuple_desc().field_name(0), Some("groupVal"));
        assert_eq!(agg.tuple_desc().field_name(1), Some("aggregateVal"));
    }

    #[test]
    fn string_columns_only_count() {
        let desc = Arc::new(TupleDesc::new(
            vec![FieldType::Text],
            vec![Some("s".to_string())],
        ));
        let rows = vec![
            vec![Field::text("a")],
            vec![Field::text("b")],
            vec![Field::text("a")],
        ];

        let child = MockOperator::new(Arc::clone(&desc), rows.clone());
        assert!(matches!(
            Aggregate::new(Box::new(child), 0, None, AggOp::Sum),
            Err(ExecutionError::IllegalArgument(_))
        ));

        let child = MockOperator::new(desc, rows);
        let mut agg = Aggregate::new(Box::new(child), 0, None, AggOp::Count).unwrap();
        agg.open().unwrap();
        assert_eq!(agg.next().unwrap().field(0), &Field::Int(3));
    }

    #[test]
    fn next_past_end_is_no_such_element() {
        let child = int_rows(&[]);
        let mut agg = Aggregate::new(Box::new(child), 1, None, AggOp::Count).unwrap();
        agg.open().unwrap();
        assert!(!agg.has_next().unwrap());
        assert!(matches!(agg.next(), Err(ExecutionError::NoSuchElement)));
    }

    #[test]
    fn rewind_replays_results() {
        let child = int_rows(&[(0, 5), (0, 6)]);
        let mut agg = Aggregate::new(Box::new(child), 1, None, AggOp::Max).unwrap();
        agg.open().unwrap();
        assert_eq!(agg.next().unwrap().field(0), &Field::Int(6));
        agg.rewind().unwrap();
        assert_eq!(agg.next().unwrap().field(0), &Field::Int(6));
    }
}
