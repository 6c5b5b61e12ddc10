//! Storage slots
//!
//! A `Slot` is one place in the store a typed value can be written to or read
//! from: either a dictionary entry or a single-valued object property. Value
//! bindings (`Persistable`) only talk to slots, so the same encoding code
//! serves both collection elements and scalar properties.

use dualstore_core::{ColKey, Error, Mixed, Result};
use dualstore_storage::{Dictionary, Obj, Store, TableRef};

/// A writable location in the store
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    /// Entry `key` of a dictionary (may not exist yet)
    Entry {
        /// Backing dictionary
        dict: &'a Dictionary,
        /// Entry key
        key: &'a str,
    },
    /// Single-valued property `col` of an object
    Property {
        /// Owning object
        obj: &'a Obj,
        /// Property column
        col: ColKey,
    },
}

impl<'a> Slot<'a> {
    /// Slot for a dictionary entry
    pub fn entry(dict: &'a Dictionary, key: &'a str) -> Self {
        Slot::Entry { dict, key }
    }

    /// Slot for an object property
    pub fn property(obj: &'a Obj, col: ColKey) -> Self {
        Slot::Property { obj, col }
    }

    /// Store the slot belongs to
    pub fn store(&self) -> &'a Store {
        match *self {
            Slot::Entry { dict, .. } => dict.store(),
            Slot::Property { obj, .. } => obj.store(),
        }
    }

    /// Raw stored value; `None` for a dictionary key that is absent.
    pub fn get(&self) -> Result<Option<Mixed>> {
        match *self {
            Slot::Entry { dict, key } => dict.get(key),
            Slot::Property { obj, col } => obj.get(col).map(Some),
        }
    }

    /// Write a raw value
    pub fn set(&self, value: Mixed) -> Result<()> {
        match *self {
            Slot::Entry { dict, key } => dict.insert(key, value),
            Slot::Property { obj, col } => obj.set(col, value),
        }
    }

    /// Create an embedded object owned by this slot
    pub fn create_embedded(&self) -> Result<Obj> {
        match *self {
            Slot::Entry { dict, key } => dict.insert_embedded(key),
            Slot::Property { obj, col } => obj.create_and_set_linked_object(col),
        }
    }

    /// Table that links stored in this slot must point into
    pub fn target_table(&self) -> Result<TableRef> {
        let target = match *self {
            Slot::Entry { dict, .. } => dict.target_table()?,
            Slot::Property { obj, col } => obj.table().target_table(col)?,
        };
        target.ok_or_else(|| Error::InvalidInput(format!("{} does not hold object links", self)))
    }
}

impl std::fmt::Display for Slot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Entry { dict, key } => write!(f, "entry '{}' of {}", key, dict.col()),
            Slot::Property { obj, col } => write!(f, "property {} of {}", col, obj.link()),
        }
    }
}
