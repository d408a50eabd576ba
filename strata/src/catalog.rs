use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::heap_file::HeapFile;
use crate::tuple::TupleDesc;

/// One registered table: its heap file, name, and primary-key column name
/// (kept for collaborators; the storage core itself does not consult it).
pub struct Table {
    pub file: Arc<HeapFile>,
    pub name: String,
    pub pkey: String,
}

/// The table registry. Populated at startup, shared through an `Arc`;
/// registering a name again replaces the previous entry.
#[derive(Default)]
pub struct Catalog {
    tables: RwLock<HashMap<u32, Table>>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, pkey: &str) {
        let mut tables = self.tables.write().unwrap();
        tables.retain(|_, table| table.name != name);
        tables.insert(
            file.id(),
            Table {
                file,
                name: name.to_string(),
                pkey: pkey.to_string(),
            },
        );
    }

    pub fn database_file(&self, table_id: u32) -> Result<Arc<HeapFile>> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .map(|table| table.file.clone())
            .ok_or(Error::UnknownTable(table_id))
    }

    pub fn tuple_desc(&self, table_id: u32) -> Result<Arc<TupleDesc>> {
        Ok(self.database_file(table_id)?.desc().clone())
    }

    pub fn table_name(&self, table_id: u32) -> Result<String> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .map(|table| table.name.clone())
            .ok_or(Error::UnknownTable(table_id))
    }

    pub fn primary_key(&self, table_id: u32) -> Result<String> {
        self.tables
            .read()
            .unwrap()
            .get(&table_id)
            .map(|table| table.pkey.clone())
            .ok_or(Error::UnknownTable(table_id))
    }

    pub fn table_id(&self, name: &str) -> Option<u32> {
        self.tables
            .read()
            .unwrap()
            .iter()
            .find(|(_, table)| table.name == name)
            .map(|(id, _)| *id)
    }

    /// Ids of every registered table, for callers that sweep the catalog.
    pub fn table_ids(&self) -> Vec<u32> {
        self.tables.read().unwrap().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldType;
    use tempfile::tempdir;

    fn table_file(dir: &std::path::Path, name: &str) -> Arc<HeapFile> {
        let desc = Arc::new(TupleDesc::unnamed(vec![FieldType::Int]));
        Arc::new(HeapFile::open(dir.join(name), desc).unwrap())
    }

    #[test]
    fn lookup_by_id_and_name() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let file = table_file(dir.path(), "users.dat");
        let id = file.id();
        catalog.add_table(file, "users", "id");

        assert_eq!(catalog.table_id("users"), Some(id));
        assert_eq!(catalog.table_name(id).unwrap(), "users");
        assert_eq!(catalog.primary_key(id).unwrap(), "id");
        assert_eq!(catalog.database_file(id).unwrap().id(), id);
        assert!(matches!(
            catalog.database_file(id.wrapping_add(1)),
            Err(Error::UnknownTable(_))
        ));
    }

    #[test]
    fn re_registering_a_name_replaces_the_table() {
        let dir = tempdir().unwrap();
        let catalog = Catalog::new();
        let old = table_file(dir.path(), "old.dat");
        let old_id = old.id();
        catalog.add_table(old, "t", "");

        let new = table_file(dir.path(), "new.dat");
        let new_id = new.id();
        catalog.add_table(new, "t", "");

        assert_eq!(catalog.table_id("t"), Some(new_id));
        assert!(catalog.table_name(old_id).is_err());
        assert_eq!(catalog.table_ids(), vec![new_id]);
    }
}
