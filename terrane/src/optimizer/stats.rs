use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use strata::{Database, Field, FieldType, Transaction, TupleDesc};

use crate::errors::Result;
use crate::optimizer::histogram::{IntHistogram, StringHistogram};
use crate::predicate::Op;

/// Cost charged per page read by a sequential scan.
pub const DEFAULT_IO_COST_PER_PAGE: usize = 1000;

/// Buckets per column histogram.
pub const NUM_HIST_BINS: usize = 100;

/// Per-table statistics: tuple count, page count, and one histogram per
/// scalar column. Built by a two-pass scan under its own transaction and
/// immutable afterwards.
pub struct TableStats {
    total_tuples: usize,
    num_pages: usize,
    io_cost_per_page: usize,
    desc: Arc<TupleDesc>,
    int_histograms: HashMap<usize, IntHistogram>,
    string_histograms: HashMap<usize, StringHistogram>,
}

impl TableStats {
    /// Scans the table twice: the first pass counts tuples, fills string
    /// histograms (their code range is fixed) and finds per-column min/max
    /// for the integer histograms; the second pass fills the integer bucket
    /// counts. The scan runs in its own transaction, committed on the way
    /// out so its shared locks drop.
    pub fn new(db: &Database, table_id: u32, io_cost_per_page: usize) -> Result<TableStats> {
        let file = db.catalog().database_file(table_id)?;
        let desc = Arc::clone(file.desc());

        let mut tx = Transaction::new();
        tx.start();
        let mut iter = file.iter(Arc::clone(db.buffer_pool()), tx.id());

        let mut total_tuples = 0;
        let mut bounds: HashMap<usize, (i32, i32)> = HashMap::new();
        let mut string_histograms: HashMap<usize, StringHistogram> = HashMap::new();

        iter.open()?;
        while let Some(tuple) = iter.next()? {
            total_tuples += 1;
            for i in 0..desc.num_fields() {
                match tuple.field(i) {
                    Field::Int(v) => {
                        let (min, max) = bounds.entry(i).or_insert((*v, *v));
                        *min = (*min).min(*v);
                        *max = (*max).max(*v);
                    }
                    Field::Text(s) => string_histograms
                        .entry(i)
                        .or_insert_with(|| StringHistogram::new(NUM_HIST_BINS))
                        .add_value(s),
                }
            }
        }

        let mut int_histograms: HashMap<usize, IntHistogram> = bounds
            .iter()
            .map(|(&i, &(min, max))| (i, IntHistogram::new(NUM_HIST_BINS, min, max)))
            .collect();

        iter.rewind()?;
        while let Some(tuple) = iter.next()? {
            for (&i, hist) in int_histograms.iter_mut() {
                if let Field::Int(v) = tuple.field(i) {
                    hist.add_value(*v);
                }
            }
        }
        iter.close();

        let num_pages = file.num_pages()?;
        tx.commit(db)?;

        Ok(TableStats {
            total_tuples,
            num_pages,
            io_cost_per_page,
            desc,
            int_histograms,
            string_histograms,
        })
    }

    /// Cost of scanning the whole table: every page costs one IO, however
    /// few tuples it holds.
    pub fn estimate_scan_cost(&self) -> f64 {
        (self.num_pages * self.io_cost_per_page) as f64
    }

    /// Expected tuple count after applying a predicate of the given
    /// selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity) as usize
    }

    /// Estimated selectivity of `field op constant`, dispatched on the
    /// column's type. A constant of the other type never matches anything.
    pub fn estimate_selectivity(&self, field: usize, op: Op, constant: &Field) -> f64 {
        match (self.desc.field_type(field), constant) {
            (FieldType::Int, Field::Int(v)) => self
                .int_histograms
                .get(&field)
                .map_or(0.0, |h| h.estimate_selectivity(op, *v)),
            (FieldType::Text, Field::Text(s)) => self
                .string_histograms
                .get(&field)
                .map_or(0.0, |h| h.estimate_selectivity(op, s)),
            _ => 0.0,
        }
    }

    /// Average selectivity of the column under `op`, from its histogram.
    pub fn avg_selectivity(&self, field: usize, _op: Op) -> f64 {
        match self.desc.field_type(field) {
            FieldType::Int => self
                .int_histograms
                .get(&field)
                .map_or(0.0, |h| h.avg_selectivity()),
            FieldType::Text => self
                .string_histograms
                .get(&field)
                .map_or(0.0, |h| h.avg_selectivity()),
        }
    }

    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }
}

/// Process-wide registry of table statistics, keyed by table name. One per
/// database; populated once by sweeping the catalog.
#[derive(Default)]
pub struct StatsRegistry {
    stats: Mutex<HashMap<String, Arc<TableStats>>>,
}

impl StatsRegistry {
    pub fn new() -> StatsRegistry {
        StatsRegistry::default()
    }

    /// Builds statistics for every table in the catalog.
    pub fn compute_statistics(&self, db: &Database) -> Result<()> {
        for table_id in db.catalog().table_ids() {
            let name = db.catalog().table_name(table_id)?;
            let stats = TableStats::new(db, table_id, DEFAULT_IO_COST_PER_PAGE)?;
            self.set(&name, Arc::new(stats));
        }
        Ok(())
    }

    pub fn get(&self, table: &str) -> Option<Arc<TableStats>> {
        self.stats.lock().unwrap().get(table).cloned()
    }

    pub fn set(&self, table: &str, stats: Arc<TableStats>) {
        self.stats
            .lock()
            .unwrap()
            .insert(table.to_string(), stats);
    }

    /// Replaces the whole map. A test hook, kept as an ordinary method.
    pub fn set_stats_map(&self, map: HashMap<String, Arc<TableStats>>) {
        *self.stats.lock().unwrap() = map;
    }
}
