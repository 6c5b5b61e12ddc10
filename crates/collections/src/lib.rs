//! Persisted collections for dualstore
//!
//! This crate provides the typed values application code works with:
//! - PersistedMap: string-keyed map, in memory until managed by a store
//! - Persisted: single value with the same two states
//! - Cursor / ElementProxy: position and element access into a map
//! - NotificationToken: keeps a map change handler alive
//! - ObjectModel, `persisted_object!`, `embedded_object!`: structs whose
//!   fields are persisted values
//! - Db: adds object models to a store
//!
//! ## Design
//!
//! Every persisted value is an enum over an unmanaged in-memory
//! representation and a managed store accessor. Adding the owning object
//! to a store copies the in-memory contents into the store and switches the
//! enum; nothing switches back. How an element type is encoded is decided
//! per type by `Persistable`.
//!
//! ## Example
//!
//! ```
//! use dualstore_collections::{persisted_object, Db, Persisted, PersistedMap, StoreConfig};
//!
//! persisted_object! {
//!     pub struct Inventory {
//!         pub owner: Persisted<String>,
//!         pub counts: PersistedMap<i64>,
//!     }
//! }
//!
//! let db = Db::open(StoreConfig::in_memory(), Db::schema_for::<Inventory>()).unwrap();
//!
//! let mut inv = Inventory::default();
//! inv.counts.insert("apples", 3).unwrap();
//! db.write(|| db.add(&mut inv)).unwrap();
//!
//! assert!(inv.counts.is_managed());
//! db.write(|| inv.counts.insert("pears", 5)).unwrap();
//! assert_eq!(inv.counts.len(), 2);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod cursor;
pub mod db;
pub mod map;
pub mod object;
pub mod property;
pub mod proxy;
pub mod slot;
pub mod token;

pub use binding::{Persistable, Primitive, TypeBinding, ValueKind};
pub use cursor::{Cursor, Iter};
pub use db::Db;
pub use map::PersistedMap;
pub use object::{materialize_object, persist_object, ObjectModel};
pub use property::{Persisted, PersistedProperty};
pub use proxy::ElementProxy;
pub use slot::Slot;
pub use token::{MapChange, NotificationToken};

pub use dualstore_core::{
    ColKey, Error, Mixed, ObjLink, ObjectId, PropertyType, Result, Timestamp, Uuid,
};
pub use dualstore_storage::{
    CollectionType, Dictionary, Obj, ObjectSchema, Property, Schema, SchedulerKind, Store,
    StoreConfig, ThreadSafeReference,
};
