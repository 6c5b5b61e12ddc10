//! In-memory table data
//!
//! A `Group` holds every table of a store. It is plain data: cloning it is a
//! snapshot, and a write transaction rolls back by restoring the clone taken
//! at `begin_write`.
//!
//! ## Design
//!
//! - Objects live in a `BTreeMap<ObjKey, ObjData>` per table, so iteration
//!   order is creation order.
//! - Dictionaries are vectors of `(key, value)` kept sorted by key. That makes
//!   "position of key" and "key at position" cheap, which the collection
//!   cursor relies on.
//! - Links to embedded objects own their target: overwriting or removing
//!   such a link deletes the target, recursively.
//! - Links to top-level objects do not own anything. Deleting the target
//!   leaves them dangling; readers validate links on access.

use crate::schema::{table_name_for_object_type, CollectionType, ObjectSchema, Property, Schema};
use dualstore_core::{
    ColKey, Error, Mixed, ObjKey, ObjLink, ObjectId, PropertyType, Result, TableKey, Timestamp,
    Uuid,
};
use std::collections::BTreeMap;

// ============================================================================
// Dictionary data
// ============================================================================

/// Sorted string-keyed entries of one dictionary column.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DictData {
    entries: Vec<(String, Mixed)>,
}

impl DictData {
    fn position(&self, key: &str) -> std::result::Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.as_str().cmp(key))
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Mixed> {
        self.position(key).ok().map(|i| &self.entries[i].1)
    }

    pub(crate) fn index_of(&self, key: &str) -> Option<usize> {
        self.position(key).ok()
    }

    pub(crate) fn entry(&self, index: usize) -> Option<&(String, Mixed)> {
        self.entries.get(index)
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Insert or overwrite; returns the previous value.
    fn insert(&mut self, key: String, value: Mixed) -> Option<Mixed> {
        match self.position(&key) {
            Ok(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            Err(i) => {
                self.entries.insert(i, (key, value));
                None
            }
        }
    }

    fn remove(&mut self, key: &str) -> Option<Mixed> {
        self.position(key).ok().map(|i| self.entries.remove(i).1)
    }

    fn take_all(&mut self) -> Vec<Mixed> {
        std::mem::take(&mut self.entries)
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    }
}

// ============================================================================
// Objects and tables
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) enum Cell {
    Value(Mixed),
    Dict(DictData),
}

#[derive(Debug, Clone)]
pub(crate) struct ObjData {
    cells: Vec<Cell>,
}

#[derive(Debug, Clone)]
pub(crate) struct TableData {
    pub(crate) key: TableKey,
    pub(crate) name: String,
    pub(crate) schema: ObjectSchema,
    /// Resolved target table per column (object columns only)
    pub(crate) targets: Vec<Option<TableKey>>,
    pub(crate) objects: BTreeMap<ObjKey, ObjData>,
    next_key: u64,
}

impl TableData {
    fn new_object(&mut self) -> ObjKey {
        let key = ObjKey(self.next_key);
        self.next_key += 1;
        let cells = self
            .schema
            .properties
            .iter()
            .map(|p| match p.collection {
                CollectionType::Single => Cell::Value(default_value(p)),
                CollectionType::Dictionary => Cell::Dict(DictData::default()),
            })
            .collect();
        self.objects.insert(key, ObjData { cells });
        key
    }
}

/// Value a fresh object holds in a single-valued column.
fn default_value(prop: &Property) -> Mixed {
    if prop.accepts_null() {
        return Mixed::Null;
    }
    match prop.property_type {
        PropertyType::Int => Mixed::Int(0),
        PropertyType::Bool => Mixed::Bool(false),
        PropertyType::Double => Mixed::Double(0.0),
        PropertyType::String => Mixed::String(String::new()),
        PropertyType::Binary => Mixed::Binary(Vec::new()),
        PropertyType::Timestamp => Mixed::Timestamp(Timestamp::EPOCH),
        PropertyType::ObjectId => Mixed::ObjectId(ObjectId::from_bytes([0; 12])),
        PropertyType::Uuid => Mixed::Uuid(Uuid::nil()),
        PropertyType::Mixed | PropertyType::Object => Mixed::Null,
    }
}

/// Check that `value` may be stored in a slot of `prop`.
fn check_value(prop: &Property, target: Option<TableKey>, value: &Mixed) -> Result<()> {
    let ok = match (prop.property_type, value) {
        (_, Mixed::Null) => prop.accepts_null(),
        (PropertyType::Mixed, _) => true,
        (PropertyType::Object, Mixed::Link(link)) => Some(link.table) == target,
        (PropertyType::Int, Mixed::Int(_))
        | (PropertyType::Bool, Mixed::Bool(_))
        | (PropertyType::Double, Mixed::Double(_))
        | (PropertyType::String, Mixed::String(_))
        | (PropertyType::Binary, Mixed::Binary(_))
        | (PropertyType::Timestamp, Mixed::Timestamp(_))
        | (PropertyType::ObjectId, Mixed::ObjectId(_))
        | (PropertyType::Uuid, Mixed::Uuid(_)) => true,
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        let expected = match (prop.property_type, prop.accepts_null()) {
            (ty, true) => format!("{}?", ty),
            (ty, false) => ty.to_string(),
        };
        Err(Error::type_mismatch(expected, value.type_name()))
    }
}

// ============================================================================
// Group
// ============================================================================

#[derive(Debug, Clone)]
pub(crate) struct Group {
    tables: Vec<TableData>,
}

impl Group {
    pub(crate) fn from_schema(schema: &Schema) -> Group {
        let index_of = |name: &str| {
            schema
                .objects()
                .iter()
                .position(|o| o.name == name)
                .map(|i| TableKey(i as u32))
        };
        let tables = schema
            .objects()
            .iter()
            .enumerate()
            .map(|(i, object)| TableData {
                key: TableKey(i as u32),
                name: table_name_for_object_type(&object.name),
                schema: object.clone(),
                targets: object
                    .properties
                    .iter()
                    .map(|p| p.target.as_deref().and_then(index_of))
                    .collect(),
                objects: BTreeMap::new(),
                next_key: 0,
            })
            .collect();
        Group { tables }
    }

    // ========== Lookup ==========

    pub(crate) fn table(&self, key: TableKey) -> Result<&TableData> {
        self.tables
            .get(key.0 as usize)
            .ok_or_else(|| Error::TableNotFound(key.to_string()))
    }

    fn table_mut(&mut self, key: TableKey) -> Result<&mut TableData> {
        self.tables
            .get_mut(key.0 as usize)
            .ok_or_else(|| Error::TableNotFound(key.to_string()))
    }

    pub(crate) fn table_by_name(&self, name: &str) -> Option<TableKey> {
        self.tables.iter().find(|t| t.name == name).map(|t| t.key)
    }

    pub(crate) fn contains(&self, link: ObjLink) -> bool {
        self.tables
            .get(link.table.0 as usize)
            .map_or(false, |t| t.objects.contains_key(&link.key))
    }

    pub(crate) fn is_embedded(&self, table: TableKey) -> bool {
        self.table(table).map_or(false, |t| t.schema.embedded)
    }

    pub(crate) fn column(&self, col: ColKey) -> Result<(&Property, Option<TableKey>)> {
        let table = self.table(col.table)?;
        let index = col.index as usize;
        match table.schema.properties.get(index) {
            Some(prop) => Ok((prop, table.targets[index])),
            None => Err(Error::ColumnNotFound(col.to_string())),
        }
    }

    fn object(&self, link: ObjLink) -> Result<&ObjData> {
        self.table(link.table)?
            .objects
            .get(&link.key)
            .ok_or_else(|| Error::InvalidObject(format!("object {} was deleted", link)))
    }

    fn object_mut(&mut self, link: ObjLink) -> Result<&mut ObjData> {
        self.table_mut(link.table)?
            .objects
            .get_mut(&link.key)
            .ok_or_else(|| Error::InvalidObject(format!("object {} was deleted", link)))
    }

    fn check_column(&self, owner: ObjLink, col: ColKey, collection: CollectionType) -> Result<()> {
        if col.table != owner.table {
            return Err(Error::ColumnNotFound(format!(
                "{} does not belong to {}",
                col, owner.table
            )));
        }
        let (prop, _) = self.column(col)?;
        if prop.collection != collection {
            let (want, got) = match collection {
                CollectionType::Single => ("single value", "dictionary"),
                CollectionType::Dictionary => ("dictionary", "single value"),
            };
            return Err(Error::type_mismatch(
                format!("{} column", want),
                format!("{} column '{}'", got, prop.name),
            ));
        }
        Ok(())
    }

    // ========== Objects ==========

    pub(crate) fn create_object(&mut self, table: TableKey) -> Result<ObjKey> {
        Ok(self.table_mut(table)?.new_object())
    }

    /// Delete an object and every embedded object it owns.
    pub(crate) fn remove_object(&mut self, link: ObjLink) -> Result<()> {
        let data = self
            .table_mut(link.table)?
            .objects
            .remove(&link.key)
            .ok_or_else(|| Error::InvalidObject(format!("object {} was deleted", link)))?;
        for cell in data.cells {
            match cell {
                Cell::Value(v) => self.release(v),
                Cell::Dict(mut d) => {
                    for v in d.take_all() {
                        self.release(v);
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop a value leaving a slot; embedded targets go with it.
    fn release(&mut self, value: Mixed) {
        if let Mixed::Link(link) = value {
            if self.is_embedded(link.table) && self.contains(link) {
                let _ = self.remove_object(link);
            }
        }
    }

    fn reject_embedded_link(&self, value: &Mixed) -> Result<()> {
        match value {
            Mixed::Link(link) if self.is_embedded(link.table) => Err(Error::InvalidInput(
                "embedded objects can only be created through their owner".to_string(),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn get_value(&self, owner: ObjLink, col: ColKey) -> Result<Mixed> {
        self.check_column(owner, col, CollectionType::Single)?;
        match &self.object(owner)?.cells[col.index as usize] {
            Cell::Value(v) => Ok(v.clone()),
            Cell::Dict(_) => Err(Error::type_mismatch("single value", "dictionary")),
        }
    }

    pub(crate) fn set_value(&mut self, owner: ObjLink, col: ColKey, value: Mixed) -> Result<()> {
        self.check_column(owner, col, CollectionType::Single)?;
        let (prop, target) = self.column(col)?;
        check_value(prop, target, &value)?;
        self.reject_embedded_link(&value)?;
        let old = self.replace_cell(owner, col, value)?;
        self.release(old);
        Ok(())
    }

    /// Create an embedded object and store a link to it in `col`.
    pub(crate) fn create_linked(&mut self, owner: ObjLink, col: ColKey) -> Result<ObjLink> {
        self.check_column(owner, col, CollectionType::Single)?;
        let target = self.embedded_target(col)?;
        self.object(owner)?;
        let key = self.create_object(target)?;
        let link = ObjLink::new(target, key);
        let old = self.replace_cell(owner, col, Mixed::Link(link))?;
        self.release(old);
        Ok(link)
    }

    fn replace_cell(&mut self, owner: ObjLink, col: ColKey, value: Mixed) -> Result<Mixed> {
        match &mut self.object_mut(owner)?.cells[col.index as usize] {
            Cell::Value(slot) => Ok(std::mem::replace(slot, value)),
            Cell::Dict(_) => Err(Error::type_mismatch("single value", "dictionary")),
        }
    }

    fn embedded_target(&self, col: ColKey) -> Result<TableKey> {
        let (prop, target) = self.column(col)?;
        match target {
            Some(t) if self.is_embedded(t) => Ok(t),
            _ => Err(Error::InvalidInput(format!(
                "property '{}' does not link to an embedded class",
                prop.name
            ))),
        }
    }

    // ========== Dictionaries ==========

    pub(crate) fn dict(&self, owner: ObjLink, col: ColKey) -> Result<&DictData> {
        self.check_column(owner, col, CollectionType::Dictionary)?;
        match &self.object(owner)?.cells[col.index as usize] {
            Cell::Dict(d) => Ok(d),
            Cell::Value(_) => Err(Error::type_mismatch("dictionary", "single value")),
        }
    }

    /// Read-only view used for change computation; `None` when the owner
    /// does not exist.
    pub(crate) fn dict_if_exists(&self, owner: ObjLink, col: ColKey) -> Option<&DictData> {
        if !self.contains(owner) {
            return None;
        }
        self.dict(owner, col).ok()
    }

    fn dict_mut(&mut self, owner: ObjLink, col: ColKey) -> Result<&mut DictData> {
        self.check_column(owner, col, CollectionType::Dictionary)?;
        match &mut self.object_mut(owner)?.cells[col.index as usize] {
            Cell::Dict(d) => Ok(d),
            Cell::Value(_) => Err(Error::type_mismatch("dictionary", "single value")),
        }
    }

    pub(crate) fn dict_insert(
        &mut self,
        owner: ObjLink,
        col: ColKey,
        key: String,
        value: Mixed,
    ) -> Result<()> {
        self.check_column(owner, col, CollectionType::Dictionary)?;
        let (prop, target) = self.column(col)?;
        check_value(prop, target, &value)?;
        self.reject_embedded_link(&value)?;
        if let Some(old) = self.dict_mut(owner, col)?.insert(key, value) {
            self.release(old);
        }
        Ok(())
    }

    pub(crate) fn dict_insert_embedded(
        &mut self,
        owner: ObjLink,
        col: ColKey,
        key: String,
    ) -> Result<ObjLink> {
        self.check_column(owner, col, CollectionType::Dictionary)?;
        let target = self.embedded_target(col)?;
        self.object(owner)?;
        let link = ObjLink::new(target, self.create_object(target)?);
        if let Some(old) = self.dict_mut(owner, col)?.insert(key, Mixed::Link(link)) {
            self.release(old);
        }
        Ok(link)
    }

    pub(crate) fn dict_remove(&mut self, owner: ObjLink, col: ColKey, key: &str) -> Result<bool> {
        match self.dict_mut(owner, col)?.remove(key) {
            Some(old) => {
                self.release(old);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub(crate) fn dict_clear(&mut self, owner: ObjLink, col: ColKey) -> Result<()> {
        for old in self.dict_mut(owner, col)?.take_all() {
            self.release(old);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> (Group, ObjLink) {
        let schema = Schema::new(vec![
            ObjectSchema::new(
                "Owner",
                vec![
                    Property::new("name", PropertyType::String),
                    Property::new("map", PropertyType::Int).dictionary(),
                    Property::link("pet", "Pet"),
                    Property::link("tags", "Tag").dictionary(),
                ],
            ),
            ObjectSchema::new("Pet", vec![Property::new("name", PropertyType::String)]),
            ObjectSchema::embedded("Tag", vec![Property::new("label", PropertyType::String)]),
        ]);
        let mut g = Group::from_schema(&schema);
        let key = g.create_object(TableKey(0)).unwrap();
        (g, ObjLink::new(TableKey(0), key))
    }

    const NAME: ColKey = ColKey {
        table: TableKey(0),
        index: 0,
    };
    const MAP: ColKey = ColKey {
        table: TableKey(0),
        index: 1,
    };
    const PET: ColKey = ColKey {
        table: TableKey(0),
        index: 2,
    };
    const TAGS: ColKey = ColKey {
        table: TableKey(0),
        index: 3,
    };

    #[test]
    fn test_new_object_has_defaults() {
        let (g, owner) = group();
        assert_eq!(g.get_value(owner, NAME).unwrap(), Mixed::String(String::new()));
        assert_eq!(g.get_value(owner, PET).unwrap(), Mixed::Null);
        assert_eq!(g.dict(owner, MAP).unwrap().len(), 0);
    }

    #[test]
    fn test_dictionary_stays_sorted() {
        let (mut g, owner) = group();
        for key in ["c", "a", "b"] {
            g.dict_insert(owner, MAP, key.to_string(), Mixed::Int(1)).unwrap();
        }
        let d = g.dict(owner, MAP).unwrap();
        assert_eq!(d.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(d.index_of("b"), Some(1));
        assert_eq!(d.entry(2).unwrap().0, "c");
    }

    #[test]
    fn test_dictionary_type_check() {
        let (mut g, owner) = group();
        let err = g
            .dict_insert(owner, MAP, "a".into(), Mixed::from("x"))
            .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        assert!(g.dict_insert(owner, MAP, "a".into(), Mixed::Null).is_err());
    }

    #[test]
    fn test_remove_missing_key_is_noop() {
        let (mut g, owner) = group();
        assert!(!g.dict_remove(owner, MAP, "nope").unwrap());
    }

    #[test]
    fn test_deleted_target_leaves_dangling_link() {
        let (mut g, owner) = group();
        let pet = ObjLink::new(TableKey(1), g.create_object(TableKey(1)).unwrap());
        g.set_value(owner, PET, Mixed::Link(pet)).unwrap();
        g.remove_object(pet).unwrap();
        assert_eq!(g.get_value(owner, PET).unwrap(), Mixed::Link(pet));
        assert!(!g.contains(pet));
    }

    #[test]
    fn test_embedded_released_on_overwrite_and_clear() {
        let (mut g, owner) = group();
        let first = g.dict_insert_embedded(owner, TAGS, "k".into()).unwrap();
        let second = g.dict_insert_embedded(owner, TAGS, "k".into()).unwrap();
        assert!(!g.contains(first), "overwritten embedded object must be deleted");
        assert!(g.contains(second));

        g.dict_clear(owner, TAGS).unwrap();
        assert!(!g.contains(second));
    }

    #[test]
    fn test_remove_owner_cascades_to_embedded() {
        let (mut g, owner) = group();
        let tag = g.dict_insert_embedded(owner, TAGS, "k".into()).unwrap();
        g.remove_object(owner).unwrap();
        assert!(!g.contains(tag));
        assert!(matches!(g.dict(owner, MAP), Err(Error::InvalidObject(_))));
    }

    #[test]
    fn test_direct_link_to_embedded_rejected() {
        let (mut g, owner) = group();
        let tag = g.dict_insert_embedded(owner, TAGS, "k".into()).unwrap();
        assert!(g.dict_insert(owner, TAGS, "j".into(), Mixed::Link(tag)).is_err());
    }

    #[test]
    fn test_column_kind_checked() {
        let (mut g, owner) = group();
        assert!(g.dict(owner, NAME).is_err());
        assert!(g.set_value(owner, MAP, Mixed::Int(1)).is_err());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let (mut g, owner) = group();
        let snapshot = g.clone();
        g.dict_insert(owner, MAP, "a".into(), Mixed::Int(1)).unwrap();
        assert_eq!(snapshot.dict(owner, MAP).unwrap().len(), 0);
        assert_eq!(g.dict(owner, MAP).unwrap().len(), 1);
    }
}
