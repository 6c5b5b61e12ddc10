//! Dictionary accessors
//!
//! A `Dictionary` is the store-side view of a string-keyed collection
//! property. Entries are kept ordered by key, so every key also has a stable
//! position (`get_key_index` / `get_key` / `get_pair`) until the next write.
//!
//! Absent keys are not errors: `get` returns `None`, `get_key_index` returns
//! `None`, and `remove` reports `false`.

use crate::notifications::{DictionaryChange, SubscriptionHandle};
use crate::obj::Obj;
use crate::store::Store;
use crate::table::TableRef;
use dualstore_core::{ColKey, Error, Mixed, Result};
use tracing::{debug, trace};

/// Accessor for one dictionary property of one object
#[derive(Clone)]
pub struct Dictionary {
    obj: Obj,
    col: ColKey,
}

impl Dictionary {
    pub(crate) fn new(obj: Obj, col: ColKey) -> Self {
        Dictionary { obj, col }
    }

    /// Object owning the dictionary
    pub fn obj(&self) -> &Obj {
        &self.obj
    }

    /// Column holding the dictionary
    pub fn col(&self) -> ColKey {
        self.col
    }

    /// Store the dictionary lives in
    pub fn store(&self) -> &Store {
        self.obj.store()
    }

    /// Whether the owning object still exists
    pub fn is_valid(&self) -> bool {
        self.obj.is_valid()
    }

    /// Table that link values point into, for dictionaries of objects
    pub fn target_table(&self) -> Result<Option<TableRef>> {
        self.obj.table().target_table(self.col)
    }

    // ========== Reads ==========

    /// Number of entries
    pub fn len(&self) -> Result<usize> {
        self.read(|d| Ok(d.len()))
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<Mixed>> {
        self.read(|d| Ok(d.get(key).cloned()))
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        self.read(|d| Ok(d.get(key).is_some()))
    }

    /// Position of `key` in key order
    pub fn get_key_index(&self, key: &str) -> Result<Option<usize>> {
        self.read(|d| Ok(d.index_of(key)))
    }

    /// Key at position `index`
    pub fn get_key(&self, index: usize) -> Result<String> {
        Ok(self.get_pair(index)?.0)
    }

    /// Entry at position `index`
    pub fn get_pair(&self, index: usize) -> Result<(String, Mixed)> {
        self.read(|d| {
            d.entry(index).cloned().ok_or(Error::OutOfBounds {
                index,
                len: d.len(),
            })
        })
    }

    /// All keys in order
    pub fn keys(&self) -> Result<Vec<String>> {
        self.read(|d| Ok(d.keys().map(String::from).collect()))
    }

    fn read<R>(&self, f: impl FnOnce(&crate::group::DictData) -> Result<R>) -> Result<R> {
        let owner = self.obj.link();
        self.store().read(|g| f(g.dict(owner, self.col)?))
    }

    // ========== Writes ==========

    /// Insert or overwrite `key`.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<Mixed>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        let owner = self.obj.link();
        trace!(%owner, col = %self.col, key = %key, kind = value.type_name(), "dictionary insert");
        self.store().mutate(|g, log| {
            g.dict_insert(owner, self.col, key.clone(), value)?;
            log.record_write(owner, self.col, &key);
            Ok(())
        })
    }

    /// Create an embedded object stored under `key`.
    ///
    /// Any embedded object previously stored under `key` is deleted.
    pub fn insert_embedded(&self, key: impl Into<String>) -> Result<Obj> {
        let key = key.into();
        let owner = self.obj.link();
        let link = self.store().mutate(|g, log| {
            let link = g.dict_insert_embedded(owner, self.col, key.clone())?;
            log.record_write(owner, self.col, &key);
            Ok(link)
        })?;
        self.store()
            .resolve_link(link)
            .ok_or_else(|| Error::InvalidObject(format!("embedded object {} vanished", link)))
    }

    /// Remove `key`; returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let owner = self.obj.link();
        self.store().mutate(|g, log| {
            let removed = g.dict_remove(owner, self.col, key)?;
            if removed {
                log.record_write(owner, self.col, key);
            }
            Ok(removed)
        })
    }

    /// Remove every entry.
    pub fn remove_all(&self) -> Result<()> {
        let owner = self.obj.link();
        self.store().mutate(|g, log| {
            g.dict_clear(owner, self.col)?;
            log.record_clear(owner, self.col);
            Ok(())
        })
    }

    // ========== Notifications ==========

    /// Call `handler` after every committed write transaction that changed
    /// this dictionary. Dropping the returned handle unregisters it.
    pub fn add_notification_callback<F>(&self, handler: F) -> Result<SubscriptionHandle>
    where
        F: FnMut(&DictionaryChange) + Send + 'static,
    {
        let owner = self.obj.link();
        self.read(|_| Ok(()))?;
        let (id, active) = self
            .store()
            .registry()
            .lock()
            .add(owner, self.col, Box::new(handler));
        debug!(subscription = id, %owner, col = %self.col, "change handler registered");
        Ok(SubscriptionHandle::new(id, active, self.store().downgrade()))
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.col == other.col && self.obj == other.obj
    }
}

impl std::fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dictionary")
            .field("owner", &self.obj.link())
            .field("col", &self.col)
            .finish()
    }
}
