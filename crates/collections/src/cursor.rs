//! Cursors over a PersistedMap
//!
//! A cursor is a position in a map. Unmanaged maps are walked by key through
//! the ordered in-memory map; managed maps are walked by index, and each
//! dereference looks the entry up in the store again, so a cursor always
//! reports current data.

use crate::binding::Persistable;
use crate::map::{PersistedMap, Repr};
use dualstore_core::{Error, Result};
use std::ops::Bound;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position<'a> {
    /// Key in the in-memory map, `None` at the end
    Native(Option<&'a String>),
    /// Index into the store dictionary
    Index(usize),
}

/// A position in a `PersistedMap`
pub struct Cursor<'a, V: Persistable> {
    map: &'a PersistedMap<V>,
    position: Position<'a>,
}

impl<'a, V: Persistable> Cursor<'a, V> {
    pub(crate) fn new(map: &'a PersistedMap<V>, position: Position<'a>) -> Self {
        Cursor { map, position }
    }

    /// Whether the cursor is past the last entry
    pub fn is_end(&self) -> bool {
        match self.position {
            Position::Native(key) => key.is_none(),
            Position::Index(index) => index >= self.map.len(),
        }
    }

    /// Index of the entry, for cursors over a managed map
    pub fn index(&self) -> Option<usize> {
        match self.position {
            Position::Index(index) => Some(index),
            Position::Native(_) => None,
        }
    }

    /// Key and value at the cursor
    pub fn entry(&self) -> Result<(String, V)> {
        match (&self.map.repr, self.position) {
            (Repr::Unmanaged(map), Position::Native(Some(key))) => match map.get(key) {
                Some(value) => Ok((key.clone(), value.clone())),
                None => Err(self.out_of_bounds()),
            },
            (Repr::Managed(dict), Position::Index(index)) => {
                let (key, value) = dict.get_pair(index)?;
                Ok((key, V::materialize(value, dict.store())?))
            }
            _ => Err(self.out_of_bounds()),
        }
    }

    /// Key at the cursor
    pub fn key(&self) -> Result<String> {
        match (&self.map.repr, self.position) {
            (Repr::Unmanaged(_), Position::Native(Some(key))) => Ok(key.clone()),
            (Repr::Managed(dict), Position::Index(index)) => dict.get_key(index),
            _ => Err(self.out_of_bounds()),
        }
    }

    /// Value at the cursor
    pub fn value(&self) -> Result<V> {
        Ok(self.entry()?.1)
    }

    /// Move to the next entry; stays put at the end.
    pub fn advance(&mut self) {
        if self.is_end() {
            return;
        }
        let map: &'a PersistedMap<V> = self.map;
        self.position = match (&map.repr, self.position) {
            (Repr::Unmanaged(entries), Position::Native(Some(key))) => Position::Native(
                entries
                    .range::<str, _>((Bound::Excluded(key.as_str()), Bound::Unbounded))
                    .next()
                    .map(|(k, _)| k),
            ),
            (_, Position::Index(index)) => Position::Index(index + 1),
            (_, position) => position,
        };
    }

    fn out_of_bounds(&self) -> Error {
        let len = self.map.len();
        Error::OutOfBounds {
            index: self.index().unwrap_or(len),
            len,
        }
    }
}

impl<V: Persistable> Clone for Cursor<'_, V> {
    fn clone(&self) -> Self {
        Cursor {
            map: self.map,
            position: self.position,
        }
    }
}

impl<V: Persistable> PartialEq for Cursor<'_, V> {
    /// Cursors are equal when they walk the same map and sit at the same
    /// position. All end cursors of a map are equal.
    fn eq(&self, other: &Self) -> bool {
        if !std::ptr::eq(self.map, other.map) {
            return false;
        }
        match (self.is_end(), other.is_end()) {
            (true, true) => true,
            (false, false) => self.position == other.position,
            _ => false,
        }
    }
}

impl<V: Persistable> std::fmt::Debug for Cursor<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cursor")
            .field("position", &self.position)
            .finish()
    }
}

/// Iterator over the entries of a `PersistedMap`, in key order
pub struct Iter<'a, V: Persistable> {
    cursor: Cursor<'a, V>,
}

impl<'a, V: Persistable> Iter<'a, V> {
    pub(crate) fn new(cursor: Cursor<'a, V>) -> Self {
        Iter { cursor }
    }
}

impl<V: Persistable> Iterator for Iter<'_, V> {
    type Item = Result<(String, V)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_end() {
            return None;
        }
        let entry = self.cursor.entry();
        self.cursor.advance();
        Some(entry)
    }
}
