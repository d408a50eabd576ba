use std::cmp::Ordering;
use std::fmt;
use std::io::{self, Read, Write};

use crate::STRING_SIZE;

/// The scalar types a column can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Text,
}

impl FieldType {
    /// On-disk size in bytes of a field of this type. Text fields carry a
    /// 4-byte length prefix in front of the fixed-width payload.
    pub fn byte_size(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Text => 4 + STRING_SIZE,
        }
    }

    /// Reads one field of this type from `src`.
    pub fn parse(&self, src: &mut impl Read) -> io::Result<Field> {
        match self {
            FieldType::Int => {
                let mut buf = [0u8; 4];
                src.read_exact(&mut buf)?;
                Ok(Field::Int(i32::from_be_bytes(buf)))
            }
            FieldType::Text => {
                let mut len_buf = [0u8; 4];
                src.read_exact(&mut len_buf)?;
                let len = u32::from_be_bytes(len_buf) as usize;
                if len > STRING_SIZE {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("text field length {len} exceeds column width"),
                    ));
                }
                let mut payload = vec![0u8; STRING_SIZE];
                src.read_exact(&mut payload)?;
                payload.truncate(len);
                Ok(Field::Text(
                    String::from_utf8_lossy(&payload).into_owned(),
                ))
            }
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "INT"),
            FieldType::Text => write!(f, "TEXT"),
        }
    }
}

/// A single column value. Integers are stored big-endian; text is stored as
/// a big-endian length prefix followed by bytes zero-padded to the column
/// width.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Text(String),
}

impl Field {
    /// Builds a text field, truncating to the on-disk column width.
    pub fn text(s: impl Into<String>) -> Self {
        let mut s = s.into();
        if s.len() > STRING_SIZE {
            let mut end = STRING_SIZE;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            s.truncate(end);
        }
        Field::Text(s)
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Text(_) => FieldType::Text,
        }
    }

    /// Writes the field in its on-disk form.
    pub fn write_to(&self, dst: &mut impl Write) -> io::Result<()> {
        match self {
            Field::Int(v) => dst.write_all(&v.to_be_bytes()),
            Field::Text(s) => {
                let bytes = &s.as_bytes()[..s.len().min(STRING_SIZE)];
                dst.write_all(&(bytes.len() as u32).to_be_bytes())?;
                dst.write_all(bytes)?;
                let pad = vec![0u8; STRING_SIZE - bytes.len()];
                dst.write_all(&pad)
            }
        }
    }
}

/// Fields order totally within a type; comparing an Int against a Text
/// yields `None`, and every predicate treats that as a non-match.
impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Field::Int(a), Field::Int(b)) => Some(a.cmp(b)),
            (Field::Text(a), Field::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{v}"),
            Field::Text(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(field: &Field) -> Field {
        let mut buf = Vec::new();
        field.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), field.field_type().byte_size());
        field.field_type().parse(&mut buf.as_slice()).unwrap()
    }

    #[test]
    fn int_codec_round_trips() {
        for v in [0, 1, -1, i32::MAX, i32::MIN] {
            assert_eq!(round_trip(&Field::Int(v)), Field::Int(v));
        }
    }

    #[test]
    fn text_codec_round_trips() {
        let field = Field::text("hello");
        assert_eq!(round_trip(&field), field);

        let empty = Field::text("");
        assert_eq!(round_trip(&empty), empty);
    }

    #[test]
    fn text_is_truncated_to_column_width() {
        let long = "x".repeat(crate::STRING_SIZE + 20);
        let Field::Text(stored) = Field::text(long) else {
            panic!("expected a text field");
        };
        assert_eq!(stored.len(), crate::STRING_SIZE);
    }

    #[test]
    fn cross_type_comparison_is_undefined() {
        assert_eq!(Field::Int(1).partial_cmp(&Field::text("1")), None);
    }

    #[test]
    fn text_orders_lexicographically() {
        assert!(Field::text("abc") < Field::text("abd"));
    }
}
