//! Core types for dualstore
//!
//! This crate defines the vocabulary shared by the storage engine and the
//! persisted collections built on top of it:
//! - Mixed: the store's variant value encoding
//! - TableKey, ColKey, ObjKey, ObjLink: addressing inside the store
//! - PropertyType: the primitive column types the store understands
//! - ObjectId and Timestamp: value types with a store-native representation
//! - Error: the single error enum used across the workspace

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod object_id;
pub mod timestamp;
pub mod types;
pub mod uuid_ext;
pub mod value;

pub use error::{Error, Result};
pub use object_id::ObjectId;
pub use timestamp::Timestamp;
pub use types::{ColKey, ObjKey, ObjLink, PropertyType, TableKey};
pub use uuid_ext::UuidExt;
pub use value::Mixed;

/// Re-exported so downstream crates name the same `Uuid` type.
pub use uuid::Uuid;
