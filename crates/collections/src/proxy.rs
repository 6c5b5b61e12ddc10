//! Element proxies
//!
//! `PersistedMap::at(key)` returns an `ElementProxy`: a handle to one entry
//! that may not exist yet. Writing through it inserts or overwrites; reading
//! materializes the current value. A proxy borrows its map mutably, so the
//! map cannot change representation while a proxy is alive.

use crate::binding::Persistable;
use crate::map::{PersistedMap, Repr};
use crate::slot::Slot;
use dualstore_core::Result;
use dualstore_storage::Dictionary;
use std::collections::BTreeMap;

enum Target<'a, V> {
    Unmanaged(&'a mut BTreeMap<String, V>),
    Managed(&'a Dictionary),
}

/// Handle to the entry of a `PersistedMap` under one key
pub struct ElementProxy<'a, V: Persistable> {
    target: Target<'a, V>,
    key: String,
}

impl<'a, V: Persistable> ElementProxy<'a, V> {
    pub(crate) fn new(map: &'a mut PersistedMap<V>, key: String) -> Self {
        let target = match &mut map.repr {
            Repr::Unmanaged(entries) => Target::Unmanaged(entries),
            Repr::Managed(dict) => Target::Managed(dict),
        };
        ElementProxy { target, key }
    }

    /// Key this proxy refers to
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether writes go to a store
    pub fn is_managed(&self) -> bool {
        matches!(self.target, Target::Managed(_))
    }

    /// Store `value` under the key.
    ///
    /// In a managed map the value goes through its type binding: primitives
    /// are stored directly, objects are added to their class table and
    /// linked, and embedded objects are created in place.
    pub fn set(&mut self, value: V) -> Result<()> {
        match &mut self.target {
            Target::Unmanaged(entries) => {
                entries.insert(self.key.clone(), value);
                Ok(())
            }
            Target::Managed(dict) => value.persist(&Slot::entry(dict, &self.key)),
        }
    }

    /// Current value, or `None` if the key is absent
    pub fn get(&self) -> Result<Option<V>> {
        match &self.target {
            Target::Unmanaged(entries) => Ok(entries.get(&self.key).cloned()),
            Target::Managed(dict) => V::read(&Slot::entry(dict, &self.key)),
        }
    }

    /// Whether the key is present
    pub fn exists(&self) -> Result<bool> {
        match &self.target {
            Target::Unmanaged(entries) => Ok(entries.contains_key(&self.key)),
            Target::Managed(dict) => dict.contains_key(&self.key),
        }
    }

    /// Whether the current value equals `other`
    pub fn eq_value(&self, other: &V) -> Result<bool> {
        Ok(self.get()?.is_some_and(|value| value.eq_persisted(other)))
    }

    /// Remove the entry; returns whether it was present.
    pub fn erase(self) -> Result<bool> {
        match self.target {
            Target::Unmanaged(entries) => Ok(entries.remove(&self.key).is_some()),
            Target::Managed(dict) => dict.remove(&self.key),
        }
    }
}

impl<V: Persistable> std::fmt::Debug for ElementProxy<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementProxy")
            .field("key", &self.key)
            .field("managed", &self.is_managed())
            .finish()
    }
}
