//! Db: object-level facade over a Store
//!
//! `Db` adds object models to the store, lists and removes them, and hands
//! them across threads. Collection access happens through the models'
//! fields; transactions are the store's.

use crate::object::ObjectModel;
use dualstore_core::{Error, Result};
use dualstore_storage::{Schema, Store, StoreConfig, ThreadSafeReference};
use tracing::debug;

/// An open store of object models
#[derive(Clone)]
pub struct Db {
    store: Store,
}

impl Db {
    /// Open a store with `schema`
    pub fn open(config: StoreConfig, schema: Schema) -> Result<Db> {
        Ok(Db {
            store: Store::open(config, schema)?,
        })
    }

    /// Schema holding `T` and every class it links to
    pub fn schema_for<T: ObjectModel>() -> Schema {
        let mut schema = Schema::default();
        T::register(&mut schema);
        schema
    }

    /// Wrap an existing store
    pub fn from_store(store: Store) -> Db {
        Db { store }
    }

    /// Underlying store
    pub fn store(&self) -> &Store {
        &self.store
    }

    // ========== Transactions ==========

    /// Run `f` in a write transaction; see `Store::write`.
    pub fn write<R>(&self, f: impl FnOnce() -> Result<R>) -> Result<R> {
        self.store.write(f)
    }

    /// Start a write transaction
    pub fn begin_write(&self) -> Result<()> {
        self.store.begin_write()
    }

    /// Commit the write transaction and deliver notifications
    pub fn commit(&self) -> Result<u64> {
        self.store.commit()
    }

    /// Roll back the write transaction
    pub fn cancel(&self) -> Result<()> {
        self.store.cancel()
    }

    /// Close the store. Managed values become invalid.
    pub fn close(&self) {
        self.store.close()
    }

    // ========== Objects ==========

    /// Copy `value` into a new object and make it managed.
    ///
    /// Must run inside a write transaction. Embedded models are created
    /// through their owner and are rejected here.
    pub fn add<T: ObjectModel>(&self, value: &mut T) -> Result<()> {
        if T::EMBEDDED {
            return Err(Error::InvalidInput(format!(
                "embedded object {} can only be created through its owner",
                T::CLASS_NAME
            )));
        }
        if value.managed_obj().is_some() {
            return Err(Error::AlreadyManaged(format!(
                "{} object is already managed by a store",
                T::CLASS_NAME
            )));
        }
        let obj = self
            .store
            .table_for_object_type(T::CLASS_NAME)?
            .create_object()?;
        debug!(class = T::CLASS_NAME, obj = %obj.link(), "adding object");
        value.manage(obj)
    }

    /// Every object of class `T`, in key order
    pub fn objects<T: ObjectModel>(&self) -> Result<Vec<T>> {
        self.store
            .table_for_object_type(T::CLASS_NAME)?
            .objects()?
            .into_iter()
            .map(T::from_managed)
            .collect()
    }

    /// Delete the object backing `value`
    pub fn remove<T: ObjectModel>(&self, value: &T) -> Result<()> {
        match value.managed_obj() {
            Some(obj) => obj.remove(),
            None => Err(Error::NotManaged(format!(
                "{} object is not managed by a store",
                T::CLASS_NAME
            ))),
        }
    }

    // ========== Thread handover ==========

    /// Reference to a managed object for use on another thread
    pub fn thread_safe_reference<T: ObjectModel>(&self, value: &T) -> Result<ThreadSafeReference> {
        value
            .managed_obj()
            .map(ThreadSafeReference::object)
            .ok_or_else(|| {
                Error::NotManaged(format!(
                    "{} object is not managed by a store",
                    T::CLASS_NAME
                ))
            })
    }

    /// Resolve an object reference in this store
    pub fn resolve<T: ObjectModel>(&self, reference: &ThreadSafeReference) -> Result<T> {
        T::from_managed(self.store.resolve_object(reference)?)
    }
}

impl std::fmt::Debug for Db {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db")
            .field("path", &self.store.config().path)
            .field("version", &self.store.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Persisted, PersistedMap};

    crate::persisted_object! {
        struct Note {
            title: Persisted<String>,
            tags: PersistedMap<i64>,
        }
    }

    crate::embedded_object! {
        struct Margin {
            width: Persisted<i64>,
        }
    }

    fn db() -> Db {
        let mut schema = Db::schema_for::<Note>();
        Margin::register(&mut schema);
        Db::open(StoreConfig::in_memory(), schema).unwrap()
    }

    #[test]
    fn test_add_makes_fields_managed() {
        let db = db();
        let mut note = Note::default();
        note.title.set("first".to_string()).unwrap();
        note.tags.insert("a", 1).unwrap();

        db.write(|| db.add(&mut note)).unwrap();

        assert!(note.title.is_managed());
        assert!(note.tags.is_managed());
        assert_eq!(note.title.get().unwrap(), "first");
        assert_eq!(note.tags.get("a").unwrap(), Some(1));
        assert_eq!(db.objects::<Note>().unwrap().len(), 1);
    }

    #[test]
    fn test_add_outside_transaction() {
        let db = db();
        let mut note = Note::default();
        assert!(matches!(db.add(&mut note), Err(Error::NotInWriteTransaction)));
        assert!(note.managed_obj().is_none());
    }

    #[test]
    fn test_add_twice() {
        let db = db();
        let mut note = Note::default();
        db.write(|| db.add(&mut note)).unwrap();
        let err = db.write(|| db.add(&mut note)).unwrap_err();
        assert!(matches!(err, Error::AlreadyManaged(_)));
        assert_eq!(db.objects::<Note>().unwrap().len(), 1);
    }

    #[test]
    fn test_add_embedded_rejected() {
        let db = db();
        let mut margin = Margin::default();
        let err = db.write(|| db.add(&mut margin)).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_remove_invalidates() {
        let db = db();
        let mut note = Note::default();
        db.write(|| db.add(&mut note)).unwrap();
        db.write(|| db.remove(&note)).unwrap();
        assert!(db.objects::<Note>().unwrap().is_empty());
        assert_eq!(note.tags.len(), 0);
        assert!(note.title.get().is_err());
        assert!(matches!(db.remove(&Note::default()), Err(Error::NotManaged(_))));
    }
}
