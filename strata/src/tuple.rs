use std::fmt;
use std::sync::Arc;

use crate::field::{Field, FieldType};
use crate::page::PageId;

/// One column of a schema: a type and an optional name.
#[derive(Debug, Clone)]
pub struct TdItem {
    pub field_type: FieldType,
    pub name: Option<String>,
}

/// The schema of a tuple: an ordered, non-empty list of columns.
///
/// Schemas are built once per table and shared read-only through an `Arc`.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    pub fn new(types: Vec<FieldType>, names: Vec<Option<String>>) -> Self {
        assert!(!types.is_empty(), "a schema needs at least one column");
        assert_eq!(types.len(), names.len(), "one name slot per column");
        let items = types
            .into_iter()
            .zip(names)
            .map(|(field_type, name)| TdItem { field_type, name })
            .collect();
        TupleDesc { items }
    }

    /// A schema with anonymous columns.
    pub fn unnamed(types: Vec<FieldType>) -> Self {
        let names = vec![None; types.len()];
        TupleDesc::new(types, names)
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> FieldType {
        self.items[i].field_type
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items[i].name.as_deref()
    }

    /// Index of the first column with the given name.
    pub fn index_for_field_name(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
    }

    /// On-disk size in bytes of one tuple of this schema.
    pub fn byte_size(&self) -> usize {
        self.items
            .iter()
            .map(|item| item.field_type.byte_size())
            .sum()
    }

    /// Concatenates two schemas, columns of `left` first.
    pub fn merge(left: &TupleDesc, right: &TupleDesc) -> TupleDesc {
        let mut items = left.items.clone();
        items.extend(right.items.iter().cloned());
        TupleDesc { items }
    }
}

/// Schema equality compares types positionally and ignores names.
impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{}({})",
                item.field_type,
                item.name.as_deref().unwrap_or("")
            )?;
        }
        Ok(())
    }
}

/// The stable address of a tuple: a page and a slot on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

/// A row: a shared schema, one field per column, and the record id of the
/// slot it occupies once placed on a page.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Self {
        assert_eq!(
            desc.num_fields(),
            fields.len(),
            "field count must match the schema"
        );
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn set_field(&mut self, i: usize, field: Field) {
        self.fields[i] = field;
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, rid: Option<RecordId>) {
        self.record_id = rid;
    }
}

/// Tuples compare by schema and field values; the record id is an address,
/// not part of the value.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.desc == other.desc && self.fields == other.fields
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{field}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_names() {
        let named = TupleDesc::new(
            vec![FieldType::Int, FieldType::Text],
            vec![Some("id".to_string()), Some("name".to_string())],
        );
        let anonymous = TupleDesc::unnamed(vec![FieldType::Int, FieldType::Text]);
        assert_eq!(named, anonymous);

        let reordered = TupleDesc::unnamed(vec![FieldType::Text, FieldType::Int]);
        assert_ne!(named, reordered);
    }

    #[test]
    fn byte_size_sums_field_sizes() {
        let two_ints = TupleDesc::unnamed(vec![FieldType::Int, FieldType::Int]);
        assert_eq!(two_ints.byte_size(), 8);

        let mixed = TupleDesc::unnamed(vec![FieldType::Int, FieldType::Text]);
        assert_eq!(mixed.byte_size(), 4 + 4 + crate::STRING_SIZE);
    }

    #[test]
    fn merge_concatenates_in_order() {
        let left = TupleDesc::new(vec![FieldType::Int], vec![Some("a".to_string())]);
        let right = TupleDesc::new(
            vec![FieldType::Text, FieldType::Int],
            vec![Some("b".to_string()), Some("c".to_string())],
        );
        let merged = TupleDesc::merge(&left, &right);
        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_type(0), FieldType::Int);
        assert_eq!(merged.field_type(1), FieldType::Text);
        assert_eq!(merged.field_name(2), Some("c"));
    }

    #[test]
    fn field_name_lookup() {
        let desc = TupleDesc::new(
            vec![FieldType::Int, FieldType::Int],
            vec![Some("x".to_string()), Some("y".to_string())],
        );
        assert_eq!(desc.index_for_field_name("y"), Some(1));
        assert_eq!(desc.index_for_field_name("z"), None);
    }

    #[test]
    fn tuple_equality_excludes_record_id() {
        let desc = Arc::new(TupleDesc::unnamed(vec![FieldType::Int]));
        let a = Tuple::new(desc.clone(), vec![Field::Int(7)]);
        let mut b = Tuple::new(desc, vec![Field::Int(7)]);
        b.set_record_id(Some(RecordId {
            page_id: PageId {
                table_id: 1,
                page_no: 0,
            },
            slot: 3,
        }));
        assert_eq!(a, b);
    }
}
