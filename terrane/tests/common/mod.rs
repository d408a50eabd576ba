#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use strata::heap_file::HeapFile;
use strata::{Database, Field, FieldType, Transaction, Tuple, TupleDesc};
use tempfile::{tempdir, TempDir};
use terrane::exec::{Operator, SeqScan};

/// A scratch database in its own temp directory.
pub fn setup(pool_pages: usize) -> (TempDir, Database) {
    let dir = tempdir().unwrap();
    let db = Database::with_pool_capacity(dir.path().join("pages.log"), pool_pages).unwrap();
    (dir, db)
}

pub fn two_int_desc() -> Arc<TupleDesc> {
    Arc::new(TupleDesc::new(
        vec![FieldType::Int, FieldType::Int],
        vec![Some("a".to_string()), Some("b".to_string())],
    ))
}

/// Creates an empty heap file and registers it. Returns the table id.
pub fn create_table(db: &Database, dir: &Path, name: &str, desc: Arc<TupleDesc>) -> u32 {
    let file = Arc::new(HeapFile::open(dir.join(format!("{name}.dat")), desc).unwrap());
    let table_id = file.id();
    db.add_table(file, name, "a");
    table_id
}

pub fn two_int_tuple(desc: &Arc<TupleDesc>, a: i32, b: i32) -> Tuple {
    Tuple::new(Arc::clone(desc), vec![Field::Int(a), Field::Int(b)])
}

/// Inserts rows in one committed transaction.
pub fn seed_rows(db: &Database, table_id: u32, desc: &Arc<TupleDesc>, rows: &[(i32, i32)]) {
    let mut tx = Transaction::new();
    tx.start();
    for (a, b) in rows {
        db.buffer_pool()
            .insert_tuple(tx.id(), table_id, two_int_tuple(desc, *a, *b))
            .unwrap();
    }
    tx.commit(db).unwrap();
}

/// Scans the whole table in one committed transaction.
pub fn scan_pairs(db: &Database, table_id: u32) -> Vec<(i32, i32)> {
    let mut tx = Transaction::new();
    tx.start();
    let mut scan = SeqScan::new(db, tx.id(), table_id, "t").unwrap();
    scan.open().unwrap();
    let mut rows = Vec::new();
    while scan.has_next().unwrap() {
        let tuple = scan.next().unwrap();
        let (Field::Int(a), Field::Int(b)) = (tuple.field(0).clone(), tuple.field(1).clone())
        else {
            panic!("expected two int columns");
        };
        rows.push((a, b));
    }
    scan.close();
    tx.commit(db).unwrap();
    rows
}
