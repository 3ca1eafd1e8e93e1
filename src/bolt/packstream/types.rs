//! PackStream value types.

use std::collections::HashMap;

/// A single PackStream value as it appears on the wire.
///
/// This is the raw protocol grammar; mapping structures to graph entities
/// is the hydrator's job.
#[derive(Debug, Clone, PartialEq)]
pub enum PackStreamValue {
    /// Null value
    Null,
    /// Boolean value
    Boolean(bool),
    /// 64-bit signed integer (all wire widths widen to this)
    Integer(i64),
    /// 64-bit IEEE 754 float
    Float(f64),
    /// Byte array
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// List of values
    List(Vec<PackStreamValue>),
    /// Map with string keys
    Map(HashMap<String, PackStreamValue>),
    /// Tagged structure with 0-15 fields
    Structure(PackStreamStructure),
}

/// A tagged PackStream structure.
#[derive(Debug, Clone, PartialEq)]
pub struct PackStreamStructure {
    /// One-byte tag identifying the structure kind
    pub tag: u8,
    /// Structure fields in wire order
    pub fields: Vec<PackStreamValue>,
}

impl PackStreamStructure {
    /// Create a structure from a tag and its fields.
    pub fn new(tag: u8, fields: Vec<PackStreamValue>) -> Self {
        Self { tag, fields }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the structure carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl PackStreamValue {
    /// Whether this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, PackStreamValue::Null)
    }

    /// Borrow as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PackStreamValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PackStreamValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Borrow as float. Integers widen losslessly enough for metadata use.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PackStreamValue::Float(f) => Some(*f),
            PackStreamValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PackStreamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow as byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PackStreamValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Borrow as list slice.
    pub fn as_list(&self) -> Option<&[PackStreamValue]> {
        match self {
            PackStreamValue::List(l) => Some(l),
            _ => None,
        }
    }

    /// Borrow as map.
    pub fn as_map(&self) -> Option<&HashMap<String, PackStreamValue>> {
        match self {
            PackStreamValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow as structure.
    pub fn as_structure(&self) -> Option<&PackStreamStructure> {
        match self {
            PackStreamValue::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Take ownership as a structure.
    pub fn into_structure(self) -> Option<PackStreamStructure> {
        match self {
            PackStreamValue::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Type name for error reporting.
    pub fn type_name(&self) -> &'static str {
        match self {
            PackStreamValue::Null => "Null",
            PackStreamValue::Boolean(_) => "Boolean",
            PackStreamValue::Integer(_) => "Integer",
            PackStreamValue::Float(_) => "Float",
            PackStreamValue::Bytes(_) => "Bytes",
            PackStreamValue::String(_) => "String",
            PackStreamValue::List(_) => "List",
            PackStreamValue::Map(_) => "Map",
            PackStreamValue::Structure(_) => "Structure",
        }
    }
}

impl From<bool> for PackStreamValue {
    fn from(v: bool) -> Self {
        PackStreamValue::Boolean(v)
    }
}

impl From<i64> for PackStreamValue {
    fn from(v: i64) -> Self {
        PackStreamValue::Integer(v)
    }
}

impl From<i32> for PackStreamValue {
    fn from(v: i32) -> Self {
        PackStreamValue::Integer(v as i64)
    }
}

impl From<f64> for PackStreamValue {
    fn from(v: f64) -> Self {
        PackStreamValue::Float(v)
    }
}

impl From<&str> for PackStreamValue {
    fn from(v: &str) -> Self {
        PackStreamValue::String(v.to_string())
    }
}

impl From<String> for PackStreamValue {
    fn from(v: String) -> Self {
        PackStreamValue::String(v)
    }
}

impl From<Vec<u8>> for PackStreamValue {
    fn from(v: Vec<u8>) -> Self {
        PackStreamValue::Bytes(v)
    }
}

impl From<Vec<PackStreamValue>> for PackStreamValue {
    fn from(v: Vec<PackStreamValue>) -> Self {
        PackStreamValue::List(v)
    }
}

impl From<HashMap<String, PackStreamValue>> for PackStreamValue {
    fn from(v: HashMap<String, PackStreamValue>) -> Self {
        PackStreamValue::Map(v)
    }
}

impl From<PackStreamStructure> for PackStreamValue {
    fn from(v: PackStreamStructure) -> Self {
        PackStreamValue::Structure(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        assert!(PackStreamValue::Null.is_null());
        assert_eq!(PackStreamValue::Boolean(true).as_bool(), Some(true));
        assert_eq!(PackStreamValue::Integer(42).as_int(), Some(42));
        assert_eq!(PackStreamValue::Integer(42).as_float(), Some(42.0));
        assert_eq!(PackStreamValue::Float(1.5).as_float(), Some(1.5));
        assert_eq!(PackStreamValue::Float(1.5).as_int(), None);
        assert_eq!(PackStreamValue::String("x".into()).as_str(), Some("x"));
        assert_eq!(
            PackStreamValue::Bytes(vec![1, 2]).as_bytes(),
            Some(&[1u8, 2][..])
        );
    }

    #[test]
    fn structure_accessors() {
        let s = PackStreamStructure::new(0x4E, vec![PackStreamValue::Integer(1)]);
        assert_eq!(s.tag, 0x4E);
        assert_eq!(s.len(), 1);
        assert!(!s.is_empty());

        let v = PackStreamValue::Structure(s.clone());
        assert_eq!(v.as_structure(), Some(&s));
        assert_eq!(v.into_structure(), Some(s));
    }

    #[test]
    fn from_conversions() {
        let _: PackStreamValue = true.into();
        let _: PackStreamValue = 7i64.into();
        let _: PackStreamValue = 7i32.into();
        let _: PackStreamValue = 2.5f64.into();
        let _: PackStreamValue = "s".into();
        let _: PackStreamValue = String::from("s").into();
        let _: PackStreamValue = vec![0u8, 1].into();
    }

    #[test]
    fn type_names() {
        assert_eq!(PackStreamValue::Null.type_name(), "Null");
        assert_eq!(PackStreamValue::Map(HashMap::new()).type_name(), "Map");
    }
}
