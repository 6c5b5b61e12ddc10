//! PersistedMap: a string-keyed map that is either in memory or in a store
//!
//! A `PersistedMap<V>` starts life *unmanaged*: a plain ordered map owned by
//! the value that contains it. When its owning object is added to a store,
//! `manage` copies every entry into the object's dictionary column and the
//! map becomes *managed*: from then on every read, write, iteration, and
//! notification goes to the store.
//!
//! ## Design
//!
//! - The state is a single enum, so exactly one representation is ever
//!   alive. The transition is one-way; calling `manage` twice is
//!   `Error::AlreadyManaged`.
//! - Element access goes through `ElementProxy`, iteration through `Cursor`.
//!   Both borrow the map, so neither can survive a state change.
//! - Values cross the store boundary through `Persistable`, which picks the
//!   encoding (primitive, mixed, link, embedded) per element type.
//!
//! ## Errors
//!
//! Looking up a missing key is not an error: `get` returns `None`, `find`
//! returns the end cursor, and `erase` does nothing. Writes to a managed map
//! outside a write transaction return `Error::NotInWriteTransaction`.
//!
//! ## Example
//!
//! ```
//! use dualstore_collections::PersistedMap;
//!
//! let mut scores: PersistedMap<i64> = [("a", 1), ("b", 2)].into_iter().collect();
//! scores.at("c").set(3).unwrap();
//! scores.erase("a").unwrap();
//! assert_eq!(scores.len(), 2);
//! assert_eq!(scores.get("c").unwrap(), Some(3));
//! ```

use crate::binding::Persistable;
use crate::cursor::{Cursor, Iter, Position};
use crate::proxy::ElementProxy;
use crate::slot::Slot;
use crate::token::{MapChange, NotificationToken};
use dualstore_core::{ColKey, Error, Result};
use dualstore_storage::{Dictionary, Obj, Store, ThreadSafeReference};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

pub(crate) enum Repr<V> {
    Unmanaged(BTreeMap<String, V>),
    Managed(Dictionary),
}

/// A string-keyed map with an in-memory and a store-backed representation
pub struct PersistedMap<V: Persistable> {
    pub(crate) repr: Repr<V>,
}

impl<V: Persistable> PersistedMap<V> {
    /// Create an empty unmanaged map
    pub fn new() -> Self {
        PersistedMap {
            repr: Repr::Unmanaged(BTreeMap::new()),
        }
    }

    /// Whether the map lives in a store
    pub fn is_managed(&self) -> bool {
        matches!(self.repr, Repr::Managed(_))
    }

    /// Backing dictionary, when managed
    pub fn dictionary(&self) -> Option<&Dictionary> {
        match &self.repr {
            Repr::Managed(dict) => Some(dict),
            Repr::Unmanaged(_) => None,
        }
    }

    // ========== Size ==========

    /// Number of entries.
    ///
    /// A managed map whose owning object was deleted reports 0.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Unmanaged(map) => map.len(),
            Repr::Managed(dict) => dict.len().unwrap_or(0),
        }
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== Lookup ==========

    /// Value under `key`, or `None` if absent
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        match &self.repr {
            Repr::Unmanaged(map) => Ok(map.get(key).cloned()),
            Repr::Managed(dict) => V::read(&Slot::entry(dict, key)),
        }
    }

    /// Whether `key` is present
    pub fn contains_key(&self, key: &str) -> Result<bool> {
        match &self.repr {
            Repr::Unmanaged(map) => Ok(map.contains_key(key)),
            Repr::Managed(dict) => dict.contains_key(key),
        }
    }

    /// Cursor at `key`, or the end cursor if absent
    pub fn find(&self, key: &str) -> Result<Cursor<'_, V>> {
        let position = match &self.repr {
            Repr::Unmanaged(map) => Position::Native(map.get_key_value(key).map(|(k, _)| k)),
            Repr::Managed(dict) => match dict.get_key_index(key)? {
                Some(index) => Position::Index(index),
                None => Position::Index(dict.len()?),
            },
        };
        Ok(Cursor::new(self, position))
    }

    /// Key at position `index` in key order
    pub fn key_at(&self, index: usize) -> Result<String> {
        match &self.repr {
            Repr::Unmanaged(map) => map.keys().nth(index).cloned().ok_or(Error::OutOfBounds {
                index,
                len: map.len(),
            }),
            Repr::Managed(dict) => dict.get_key(index),
        }
    }

    /// Entry at position `index` in key order
    pub fn at_index(&self, index: usize) -> Result<(String, V)> {
        match &self.repr {
            Repr::Unmanaged(map) => map
                .iter()
                .nth(index)
                .map(|(k, v)| (k.clone(), v.clone()))
                .ok_or(Error::OutOfBounds {
                    index,
                    len: map.len(),
                }),
            Repr::Managed(dict) => {
                let (key, value) = dict.get_pair(index)?;
                Ok((key, V::materialize(value, dict.store())?))
            }
        }
    }

    // ========== Iteration ==========

    /// Cursor at the first entry
    pub fn begin(&self) -> Cursor<'_, V> {
        let position = match &self.repr {
            Repr::Unmanaged(map) => Position::Native(map.keys().next()),
            Repr::Managed(_) => Position::Index(0),
        };
        Cursor::new(self, position)
    }

    /// Cursor one past the last entry
    pub fn end(&self) -> Cursor<'_, V> {
        let position = match &self.repr {
            Repr::Unmanaged(_) => Position::Native(None),
            Repr::Managed(_) => Position::Index(self.len()),
        };
        Cursor::new(self, position)
    }

    /// Iterate entries in key order
    pub fn iter(&self) -> Iter<'_, V> {
        Iter::new(self.begin())
    }

    /// Copy of the current contents as an in-memory map
    pub fn detach(&self) -> Result<BTreeMap<String, V>> {
        self.iter().collect()
    }

    // ========== Mutation ==========

    /// Proxy for the element under `key` (which may not exist yet)
    pub fn at(&mut self, key: impl Into<String>) -> ElementProxy<'_, V> {
        ElementProxy::new(self, key.into())
    }

    /// Insert or overwrite `key`
    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Result<()> {
        self.at(key).set(value)
    }

    /// Remove `key`; returns whether it was present.
    pub fn erase(&mut self, key: &str) -> Result<bool> {
        match &mut self.repr {
            Repr::Unmanaged(map) => Ok(map.remove(key).is_some()),
            Repr::Managed(dict) => dict.remove(key),
        }
    }

    /// Remove every entry
    pub fn clear(&mut self) -> Result<()> {
        match &mut self.repr {
            Repr::Unmanaged(map) => {
                map.clear();
                Ok(())
            }
            Repr::Managed(dict) => dict.remove_all(),
        }
    }

    /// Replace the contents with `entries`.
    ///
    /// A managed map is cleared and refilled in the store; links and
    /// embedded values are created as for a normal insert.
    pub fn assign<K, I>(&mut self, entries: I) -> Result<()>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        match &mut self.repr {
            Repr::Unmanaged(map) => {
                *map = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
                Ok(())
            }
            Repr::Managed(dict) => {
                dict.remove_all()?;
                for (key, value) in entries {
                    let key = key.into();
                    value.persist(&Slot::entry(dict, &key))?;
                }
                Ok(())
            }
        }
    }

    // ========== State transitions ==========

    /// Move the contents into the dictionary `col` of `owner` and switch to
    /// the managed representation.
    ///
    /// Must run inside a write transaction. If any entry fails to persist,
    /// the dictionary is cleared, the map stays unmanaged with its contents
    /// intact, and the error is returned.
    pub fn manage(&mut self, owner: &Obj, col: ColKey) -> Result<()> {
        let entries = match &self.repr {
            Repr::Managed(_) => {
                return Err(Error::AlreadyManaged(
                    "map is already managed by a store".to_string(),
                ))
            }
            Repr::Unmanaged(map) => map,
        };
        if !owner.store().is_in_write_transaction() {
            return Err(Error::NotInWriteTransaction);
        }
        let dict = owner.get_dictionary(col)?;
        let written = entries.iter().try_for_each(|(key, value)| {
            trace!(key = %key, "migrating entry");
            value.persist(&Slot::entry(&dict, key))
        });
        if let Err(e) = written {
            if let Err(cleanup) = dict.remove_all() {
                warn!(error = %cleanup, "failed to clear dictionary after aborted migration");
            }
            return Err(e);
        }
        debug!(owner = %owner.link(), %col, entries = entries.len(), "map is now managed");
        self.repr = Repr::Managed(dict);
        Ok(())
    }

    /// Bind to the existing dictionary `col` of `owner`, discarding the
    /// current representation.
    pub fn assign_accessor(&mut self, owner: &Obj, col: ColKey) -> Result<()> {
        let dict = owner.get_dictionary(col)?;
        trace!(owner = %owner.link(), %col, "map accessor bound");
        self.repr = Repr::Managed(dict);
        Ok(())
    }

    // ========== Notifications ==========

    /// Call `handler` after every committed write that changes this map.
    ///
    /// Only managed maps can be observed; an unmanaged map returns
    /// `Error::NotManaged`. Dropping the token stops delivery.
    pub fn observe<F>(&self, handler: F) -> Result<NotificationToken>
    where
        F: FnMut(&MapChange) + Send + 'static,
    {
        match &self.repr {
            Repr::Unmanaged(_) => Err(Error::NotManaged(
                "Only collections which are managed by a store support change notifications"
                    .to_string(),
            )),
            Repr::Managed(dict) => Ok(NotificationToken::new(
                dict.add_notification_callback(handler)?,
            )),
        }
    }

    // ========== Thread handover ==========

    /// Reference that can be resolved on another thread
    pub fn thread_safe_reference(&self) -> Result<ThreadSafeReference> {
        match &self.repr {
            Repr::Managed(dict) => Ok(ThreadSafeReference::dictionary(dict)),
            Repr::Unmanaged(_) => Err(Error::NotManaged(
                "an unmanaged map can be moved between threads directly".to_string(),
            )),
        }
    }

    /// Rebuild a managed map from a reference
    pub fn resolve(store: &Store, reference: &ThreadSafeReference) -> Result<Self> {
        Ok(PersistedMap {
            repr: Repr::Managed(store.resolve_dictionary(reference)?),
        })
    }
}

impl<V: Persistable> Default for PersistedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Persistable> Clone for PersistedMap<V> {
    /// An unmanaged clone copies the entries; a managed clone shares the
    /// store dictionary.
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            Repr::Unmanaged(map) => Repr::Unmanaged(map.clone()),
            Repr::Managed(dict) => Repr::Managed(dict.clone()),
        };
        PersistedMap { repr }
    }
}

impl<V: Persistable> PartialEq for PersistedMap<V> {
    /// Same keys with equal values, in either representation.
    fn eq(&self, other: &Self) -> bool {
        match (self.detach(), other.detach()) {
            (Ok(a), Ok(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.eq_persisted(vb))
            }
            _ => false,
        }
    }
}

impl<V: Persistable> From<BTreeMap<String, V>> for PersistedMap<V> {
    fn from(map: BTreeMap<String, V>) -> Self {
        PersistedMap {
            repr: Repr::Unmanaged(map),
        }
    }
}

impl<K: Into<String>, V: Persistable> FromIterator<(K, V)> for PersistedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.into(), v))
            .collect::<BTreeMap<_, _>>()
            .into()
    }
}

impl<'a, V: Persistable> IntoIterator for &'a PersistedMap<V> {
    type Item = Result<(String, V)>;
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<V: Persistable + std::fmt::Debug> std::fmt::Debug for PersistedMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            Repr::Unmanaged(map) => f.debug_tuple("PersistedMap::Unmanaged").field(map).finish(),
            Repr::Managed(dict) => f.debug_tuple("PersistedMap::Managed").field(dict).finish(),
        }
    }
}
