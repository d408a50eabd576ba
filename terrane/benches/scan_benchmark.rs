use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use strata::heap_file::HeapFile;
use strata::{Database, Field, FieldType, Transaction, Tuple, TupleDesc};
use tempfile::TempDir;
use terrane::exec::{AggOp, Aggregate, Filter, Operator, SeqScan};
use terrane::{Op, Predicate};

fn setup_test_db() -> (TempDir, Database, u32) {
    let dir = TempDir::new().unwrap();
    let db = Database::new(dir.path().join("pages.log")).unwrap();

    let desc = Arc::new(TupleDesc::new(
        vec![FieldType::Int, FieldType::Int],
        vec![Some("id".to_string()), Some("value".to_string())],
    ));
    let file = Arc::new(HeapFile::open(dir.path().join("bench.dat"), Arc::clone(&desc)).unwrap());
    let table_id = file.id();
    db.add_table(file, "bench", "id");

    let mut tx = Transaction::new();
    tx.start();
    for i in 0..100 {
        db.buffer_pool()
            .insert_tuple(
                tx.id(),
                table_id,
                Tuple::new(Arc::clone(&desc), vec![Field::Int(i), Field::Int(i * 10)]),
            )
            .unwrap();
    }
    tx.commit(&db).unwrap();

    (dir, db, table_id)
}

fn benchmark_filtered_scan(c: &mut Criterion) {
    let (_dir, db, table_id) = setup_test_db();

    c.bench_function("filtered_scan", |b| {
        b.iter(|| {
            let mut tx = Transaction::new();
            tx.start();
            let scan = SeqScan::new(&db, tx.id(), table_id, "bench").unwrap();
            let mut filter = Filter::new(
                Predicate::new(0, Op::LessThan, Field::Int(50)),
                Box::new(scan),
            );
            filter.open().unwrap();
            let mut rows = 0;
            while filter.has_next().unwrap() {
                black_box(filter.next().unwrap());
                rows += 1;
            }
            filter.close();
            tx.commit(&db).unwrap();
            rows
        })
    });
}

fn benchmark_aggregate(c: &mut Criterion) {
    let (_dir, db, table_id) = setup_test_db();

    c.bench_function("aggregate_sum", |b| {
        b.iter(|| {
            let mut tx = Transaction::new();
            tx.start();
            let scan = SeqScan::new(&db, tx.id(), table_id, "bench").unwrap();
            let mut agg = Aggregate::new(Box::new(scan), 1, None, AggOp::Sum).unwrap();
            agg.open().unwrap();
            let total = black_box(agg.next().unwrap());
            agg.close();
            tx.commit(&db).unwrap();
            total
        })
    });
}

criterion_group!(benches, benchmark_filtered_scan, benchmark_aggregate);
criterion_main!(benches);
