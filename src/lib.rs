//! Dualstore - persisted collections with an in-memory and a store-backed state
//!
//! A `PersistedMap<V>` (or `Persisted<T>`) is an ordinary Rust value until
//! the object that owns it is added to a store. From then on it reads and
//! writes the store, can be observed for changes, and can be handed to
//! other threads.
//!
//! # Quick Start
//!
//! ```
//! use dualstore::{persisted_object, Db, Persisted, PersistedMap, StoreConfig};
//!
//! persisted_object! {
//!     pub struct Team {
//!         pub name: Persisted<String>,
//!         pub scores: PersistedMap<i64>,
//!     }
//! }
//!
//! let db = Db::open(StoreConfig::in_memory(), Db::schema_for::<Team>())?;
//!
//! let mut team = Team::default();
//! team.scores.insert("alice", 3)?;
//! db.write(|| db.add(&mut team))?;
//!
//! let _token = team.scores.observe(|change| println!("changed: {:?}", change))?;
//! db.write(|| team.scores.insert("bob", 5))?;
//! assert_eq!(team.scores.len(), 2);
//! # Ok::<(), dualstore::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `dualstore-core`: value model, keys, errors
//! - `dualstore-storage`: the transactional object store and notifications
//! - `dualstore-collections`: persisted collections, object models, `Db`
//!
//! Everything application code needs is re-exported from here.

pub use dualstore_collections::*;

/// Store-level types for code that works below the collection layer
pub mod storage {
    pub use dualstore_storage::*;
}

/// Core value types and keys
pub mod values {
    pub use dualstore_core::*;
}
