use std::fmt;

use bytes::{Buf, BufMut};

use crate::page::PageId;

/// Number of content bytes in a fixed-width string field.
pub const STRING_LEN: usize = 128;

/// The type of a single field. Every type has a fixed on-disk length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    Str,
}

impl FieldType {
    /// On-disk length of a value of this type, in bytes.
    pub fn byte_len(self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::Str => 4 + STRING_LEN,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Str => write!(f, "string"),
        }
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Str(_) => FieldType::Str,
        }
    }

    /// Writes the field in its on-disk form: little-endian for integers,
    /// a little-endian length prefix plus zero-padded content for strings.
    /// Strings longer than [`STRING_LEN`] bytes are truncated.
    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        match self {
            Field::Int(v) => buf.put_i32_le(*v),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                let len = bytes.len().min(STRING_LEN);
                buf.put_u32_le(len as u32);
                buf.put_slice(&bytes[..len]);
                buf.put_bytes(0, STRING_LEN - len);
            }
        }
    }

    pub(crate) fn decode(ty: FieldType, buf: &mut impl Buf) -> Field {
        match ty {
            FieldType::Int => Field::Int(buf.get_i32_le()),
            FieldType::Str => {
                let len = (buf.get_u32_le() as usize).min(STRING_LEN);
                let mut content = [0u8; STRING_LEN];
                buf.copy_to_slice(&mut content);
                Field::Str(String::from_utf8_lossy(&content[..len]).into_owned())
            }
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

/// The schema of a tuple: an ordered, non-empty sequence of field types
/// with optional field names.
///
/// Two descriptors are equal when their field types match positionally;
/// names do not participate in equality.
#[derive(Debug, Clone)]
pub struct TupleDesc {
    items: Vec<(FieldType, Option<String>)>,
}

impl TupleDesc {
    pub fn new(items: Vec<(FieldType, Option<String>)>) -> TupleDesc {
        assert!(!items.is_empty(), "a tuple descriptor needs at least one field");
        TupleDesc { items }
    }

    /// A descriptor with anonymous fields.
    pub fn with_types(types: Vec<FieldType>) -> TupleDesc {
        TupleDesc::new(types.into_iter().map(|ty| (ty, None)).collect())
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> FieldType {
        self.items[i].0
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items[i].1.as_deref()
    }

    /// Index of the first field with the given name.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|(_, n)| n.as_deref() == Some(name))
    }

    /// The on-disk size of a tuple with this schema, in bytes.
    pub fn size(&self) -> usize {
        self.items.iter().map(|(ty, _)| ty.byte_len()).sum()
    }

    /// Concatenates two descriptors, first's fields before second's.
    pub fn merge(first: &TupleDesc, second: &TupleDesc) -> TupleDesc {
        let mut items = first.items.clone();
        items.extend(second.items.iter().cloned());
        TupleDesc { items }
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldType, Option<&str>)> {
        self.items.iter().map(|(ty, name)| (*ty, name.as_deref()))
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.0 == b.0)
    }
}

impl Eq for TupleDesc {}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (ty, name)) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match name {
                Some(name) => write!(f, "{}({})", ty, name)?,
                None => write!(f, "{}", ty)?,
            }
        }
        Ok(())
    }
}

/// The (page, slot) coordinate of a tuple stored on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot: usize) -> RecordId {
        RecordId { page_id, slot }
    }
}

/// A row of field values conforming to a descriptor. The record id is set
/// once the tuple is materialized on a page.
///
/// Equality compares the descriptor and the values; the record id is
/// excluded so that a tuple compares equal before and after insertion.
#[derive(Debug, Clone)]
pub struct Tuple {
    desc: TupleDesc,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(desc: TupleDesc, fields: Vec<Field>) -> Tuple {
        debug_assert_eq!(desc.num_fields(), fields.len());
        debug_assert!(fields
            .iter()
            .enumerate()
            .all(|(i, fld)| fld.field_type() == desc.field_type(i)));
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }

    pub fn tuple_desc(&self) -> &TupleDesc {
        &self.desc
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
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

    pub(crate) fn encode(&self, buf: &mut impl BufMut) {
        for field in &self.fields {
            field.encode(buf);
        }
    }

    pub(crate) fn decode(desc: &TupleDesc, buf: &mut impl Buf) -> Tuple {
        let fields = (0..desc.num_fields())
            .map(|i| Field::decode(desc.field_type(i), buf))
            .collect();
        Tuple {
            desc: desc.clone(),
            fields,
            record_id: None,
        }
    }
}

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
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
