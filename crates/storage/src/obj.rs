//! Object accessors
//!
//! An `Obj` names one object by (store, table, key). It holds no data; every
//! call reads or writes through the store, so an accessor for a deleted
//! object keeps existing but reports `is_valid() == false` and returns
//! `Error::InvalidObject` from data access.

use crate::dictionary::Dictionary;
use crate::store::Store;
use crate::table::TableRef;
use dualstore_core::{ColKey, Mixed, ObjKey, ObjLink, Result, TableKey};
use tracing::trace;

/// Accessor for one stored object
#[derive(Clone)]
pub struct Obj {
    store: Store,
    link: ObjLink,
}

impl Obj {
    pub(crate) fn new(store: Store, link: ObjLink) -> Self {
        Obj { store, link }
    }

    /// Key of the object within its table
    pub fn key(&self) -> ObjKey {
        self.link.key
    }

    /// Key of the table holding the object
    pub fn table_key(&self) -> TableKey {
        self.link.table
    }

    /// Link value pointing at this object
    pub fn link(&self) -> ObjLink {
        self.link
    }

    /// Store the object lives in
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Table holding the object
    pub fn table(&self) -> TableRef {
        TableRef::new(self.store.clone(), self.link.table)
    }

    /// Whether the object still exists and the store is open
    pub fn is_valid(&self) -> bool {
        self.store.read(|g| Ok(g.contains(self.link))).unwrap_or(false)
    }

    /// Column key for a property name
    pub fn column_key(&self, name: &str) -> Result<ColKey> {
        self.table().column_key(name)
    }

    // ========== Single values ==========

    /// Read a single-valued property
    pub fn get(&self, col: ColKey) -> Result<Mixed> {
        self.store.read(|g| g.get_value(self.link, col))
    }

    /// Write a single-valued property
    pub fn set(&self, col: ColKey, value: impl Into<Mixed>) -> Result<()> {
        let value = value.into();
        trace!(obj = %self.link, %col, kind = value.type_name(), "set");
        self.store.mutate(|g, _| g.set_value(self.link, col, value))
    }

    /// Write null to a nullable property
    pub fn set_null(&self, col: ColKey) -> Result<()> {
        self.set(col, Mixed::Null)
    }

    /// Whether a property holds null
    pub fn is_null(&self, col: ColKey) -> Result<bool> {
        Ok(self.get(col)?.is_null())
    }

    /// Follow a link property.
    ///
    /// Returns `None` for null and for links whose target was deleted.
    pub fn get_linked_object(&self, col: ColKey) -> Result<Option<Obj>> {
        match self.get(col)? {
            Mixed::Link(link) => Ok(self.store.resolve_link(link)),
            _ => Ok(None),
        }
    }

    /// Create a new embedded object owned by this object's `col` property.
    ///
    /// A previously linked embedded object is deleted.
    pub fn create_and_set_linked_object(&self, col: ColKey) -> Result<Obj> {
        let link = self.store.mutate(|g, _| g.create_linked(self.link, col))?;
        Ok(Obj::new(self.store.clone(), link))
    }

    // ========== Collections ==========

    /// Dictionary stored in `col`
    pub fn get_dictionary(&self, col: ColKey) -> Result<Dictionary> {
        self.store.read(|g| g.dict(self.link, col).map(|_| ()))?;
        Ok(Dictionary::new(self.clone(), col))
    }

    // ========== Lifecycle ==========

    /// Delete the object and every embedded object it owns.
    ///
    /// Links to it from elsewhere are left dangling.
    pub fn remove(&self) -> Result<()> {
        trace!(obj = %self.link, "remove");
        self.store.mutate(|g, _| g.remove_object(self.link))
    }
}

impl PartialEq for Obj {
    fn eq(&self, other: &Self) -> bool {
        self.link == other.link && self.store.same_store(&other.store)
    }
}

impl Eq for Obj {}

impl std::fmt::Debug for Obj {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Obj").field("link", &self.link).finish()
    }
}
