//! In-memory transactional object store for dualstore
//!
//! This crate is the backing store that managed collections write through:
//! - Store: open/close, write transactions, table lookup
//! - TableRef / Obj: typed tables and object accessors
//! - Dictionary: string-keyed collection properties with change
//!   notifications
//! - Scheduler: where notification handlers run
//! - StoreConfig: `store.toml` configuration
//!
//! ## Design
//!
//! All table data sits behind one `parking_lot::RwLock`. Accessors are
//! lightweight key tuples that re-resolve on every call, so they never hold
//! borrows into the data and stay valid (or report invalidity) across
//! transactions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod dictionary;
mod group;
pub mod notifications;
pub mod obj;
pub mod scheduler;
pub mod schema;
pub mod store;
pub mod table;
pub mod thread_safe_reference;

pub use config::{SchedulerKind, StoreConfig, CONFIG_FILE_NAME};
pub use dictionary::Dictionary;
pub use notifications::{DictionaryChange, SubscriptionHandle};
pub use obj::Obj;
pub use scheduler::{ImmediateScheduler, Scheduler, ThreadScheduler};
pub use schema::{
    table_name_for_object_type, CollectionType, ObjectSchema, Property, Schema, CLASS_PREFIX,
};
pub use store::Store;
pub use table::TableRef;
pub use thread_safe_reference::ThreadSafeReference;
