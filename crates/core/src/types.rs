//! Addressing types for the object store
//!
//! Objects live in tables; each table has typed columns. A value inside the
//! store is located by (table, object, column), and links between objects
//! are stored as `ObjLink` (table + object key) so they can be validated
//! when read.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a table within a store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey(pub u32);

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "table#{}", self.0)
    }
}

/// Identifies a column of a specific table
///
/// The owning table is part of the key so a column key can never be applied
/// to an object of a different table by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColKey {
    /// Table the column belongs to
    pub table: TableKey,
    /// Position of the column in the table's property list
    pub index: u32,
}

impl ColKey {
    /// Create a new column key
    pub fn new(table: TableKey, index: u32) -> Self {
        ColKey { table, index }
    }
}

impl fmt::Display for ColKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/col#{}", self.table, self.index)
    }
}

/// Identifies an object within its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjKey(pub u64);

impl fmt::Display for ObjKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}

/// A typed link to an object: table plus object key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjLink {
    /// Table holding the target
    pub table: TableKey,
    /// Target object
    pub key: ObjKey,
}

impl ObjLink {
    /// Create a new link
    pub fn new(table: TableKey, key: ObjKey) -> Self {
        ObjLink { table, key }
    }
}

impl fmt::Display for ObjLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.key)
    }
}

/// Primitive column types understood by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyType {
    /// 64-bit signed integer (also used for enums)
    Int,
    /// Boolean
    Bool,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Raw bytes
    Binary,
    /// Seconds + nanoseconds since the Unix epoch
    Timestamp,
    /// 12-byte object id
    ObjectId,
    /// 16-byte UUID
    Uuid,
    /// Any of the above, tagged at runtime
    Mixed,
    /// Link to an object in another table (top-level or embedded)
    Object,
}

impl PropertyType {
    /// Human-readable type name
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Int => "Int",
            PropertyType::Bool => "Bool",
            PropertyType::Double => "Double",
            PropertyType::String => "String",
            PropertyType::Binary => "Binary",
            PropertyType::Timestamp => "Timestamp",
            PropertyType::ObjectId => "ObjectId",
            PropertyType::Uuid => "Uuid",
            PropertyType::Mixed => "Mixed",
            PropertyType::Object => "Object",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
