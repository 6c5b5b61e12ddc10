//! Thread handover
//!
//! Accessors are tied to the store handle they were created from. A
//! `ThreadSafeReference` captures just enough (store identity plus keys) to
//! rebuild an accessor on another thread with `Store::resolve_object` or
//! `Store::resolve_dictionary`. Resolution fails if the target was deleted in
//! the meantime or the reference is handed to a different store.

use crate::dictionary::Dictionary;
use crate::obj::Obj;
use dualstore_core::{ColKey, ObjLink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReferenceTarget {
    Object(ObjLink),
    Dictionary { owner: ObjLink, col: ColKey },
}

/// A sendable handle to an object or dictionary of a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSafeReference {
    store_id: u64,
    version: u64,
    target: ReferenceTarget,
}

impl ThreadSafeReference {
    /// Reference to an object
    pub fn object(obj: &Obj) -> Self {
        ThreadSafeReference {
            store_id: obj.store().id(),
            version: obj.store().version(),
            target: ReferenceTarget::Object(obj.link()),
        }
    }

    /// Reference to a dictionary
    pub fn dictionary(dict: &Dictionary) -> Self {
        ThreadSafeReference {
            store_id: dict.store().id(),
            version: dict.store().version(),
            target: ReferenceTarget::Dictionary {
                owner: dict.obj().link(),
                col: dict.col(),
            },
        }
    }

    /// Store version at the time the reference was taken
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn store_id(&self) -> u64 {
        self.store_id
    }

    pub(crate) fn target(&self) -> ReferenceTarget {
        self.target
    }
}
