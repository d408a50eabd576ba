use std::collections::HashMap;
use std::sync::Arc;

use strata::{Field, FieldType, Transaction, Tuple, TupleDesc};
use terrane::optimizer::{StatsRegistry, TableStats, DEFAULT_IO_COST_PER_PAGE};
use terrane::Op;

mod common;

#[test]
fn scan_cost_and_cardinality_come_from_pages_and_tuples() {
    let (dir, db) = common::setup(16);
    let desc = common::two_int_desc();
    let table = common::create_table(&db, dir.path(), "t", Arc::clone(&desc));

    // 504 two-int tuples per page; 600 rows span two pages.
    let rows: Vec<(i32, i32)> = (0..600).map(|i| (i, i % 10)).collect();
    common::seed_rows(&db, table, &desc, &rows);

    let stats = TableStats::new(&db, table, DEFAULT_IO_COST_PER_PAGE).unwrap();
    assert_eq!(stats.total_tuples(), 600);
    assert_eq!(stats.estimate_scan_cost(), 2.0 * 1000.0);
    assert_eq!(stats.estimate_table_cardinality(0.5), 300);
    assert_eq!(stats.estimate_table_cardinality(0.0015), 0);
}

#[test]
fn selectivity_on_a_uniform_column() {
    let (dir, db) = common::setup(16);
    let desc = common::two_int_desc();
    let table = common::create_table(&db, dir.path(), "t", Arc::clone(&desc));

    // One of each value 1..=100: the 100 histogram bins line up one value
    // per bucket, so the estimates are exact.
    let rows: Vec<(i32, i32)> = (1..=100).map(|v| (v, 0)).collect();
    common::seed_rows(&db, table, &desc, &rows);

    let stats = TableStats::new(&db, table, DEFAULT_IO_COST_PER_PAGE).unwrap();
    let eq = stats.estimate_selectivity(0, Op::Equals, &Field::Int(50));
    let lt = stats.estimate_selectivity(0, Op::LessThan, &Field::Int(50));
    let gt = stats.estimate_selectivity(0, Op::GreaterThan, &Field::Int(50));
    assert!((eq - 0.01).abs() < 1e-9);
    assert!((lt - 0.49).abs() < 1e-9);
    assert!((gt - 0.5).abs() < 1e-9);

    // A constant of the wrong type selects nothing.
    assert_eq!(
        stats.estimate_selectivity(0, Op::Equals, &Field::text("5")),
        0.0
    );
}

#[test]
fn string_columns_get_their_own_histograms() {
    let (dir, db) = common::setup(16);
    let desc = Arc::new(TupleDesc::new(
        vec![FieldType::Int, FieldType::Text],
        vec![Some("id".to_string()), Some("name".to_string())],
    ));
    let table = common::create_table(&db, dir.path(), "named", Arc::clone(&desc));

    let mut tx = Transaction::new();
    tx.start();
    for (id, name) in [(1, "ant"), (2, "bee"), (3, "cat"), (4, "dog")] {
        db.buffer_pool()
            .insert_tuple(
                tx.id(),
                table,
                Tuple::new(
                    Arc::clone(&desc),
                    vec![Field::Int(id), Field::text(name)],
                ),
            )
            .unwrap();
    }
    tx.commit(&db).unwrap();

    let stats = TableStats::new(&db, table, DEFAULT_IO_COST_PER_PAGE).unwrap();
    let below = stats.estimate_selectivity(1, Op::LessThan, &Field::text("cow"));
    let at_least = stats.estimate_selectivity(1, Op::GreaterThanOrEq, &Field::text("cow"));
    assert!((below + at_least - 1.0).abs() < 1e-9);
    assert!(below > 0.0 && below < 1.0);
    assert!(stats.avg_selectivity(1, Op::Equals) > 0.0);
}

#[test]
fn registry_is_populated_from_the_catalog_and_replaceable() {
    let (dir, db) = common::setup(16);
    let desc = common::two_int_desc();
    let orders = common::create_table(&db, dir.path(), "orders", Arc::clone(&desc));
    let items = common::create_table(&db, dir.path(), "items", Arc::clone(&desc));
    common::seed_rows(&db, orders, &desc, &[(1, 1), (2, 2)]);
    common::seed_rows(&db, items, &desc, &[(1, 1)]);

    let registry = StatsRegistry::new();
    registry.compute_statistics(&db).unwrap();
    assert_eq!(registry.get("orders").unwrap().total_tuples(), 2);
    assert_eq!(registry.get("items").unwrap().total_tuples(), 1);
    assert!(registry.get("absent").is_none());

    // Wholesale replacement, for harnesses that precompute stats.
    let mut replacement = HashMap::new();
    replacement.insert("orders".to_string(), registry.get("items").unwrap());
    registry.set_stats_map(replacement);
    assert_eq!(registry.get("orders").unwrap().total_tuples(), 1);
    assert!(registry.get("items").is_none());
}
