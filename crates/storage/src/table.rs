//! Table accessors

use crate::obj::Obj;
use crate::schema::{ObjectSchema, Property};
use crate::store::Store;
use dualstore_core::{ColKey, Error, ObjKey, ObjLink, Result, TableKey};

/// Accessor for one table of a store
#[derive(Clone)]
pub struct TableRef {
    store: Store,
    key: TableKey,
}

impl TableRef {
    pub(crate) fn new(store: Store, key: TableKey) -> Self {
        TableRef { store, key }
    }

    /// Table key
    pub fn key(&self) -> TableKey {
        self.key
    }

    /// Store the table belongs to
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Table name (`class_<Name>`)
    pub fn name(&self) -> Result<String> {
        self.store.read(|g| Ok(g.table(self.key)?.name.clone()))
    }

    /// Class schema backing this table
    pub fn object_schema(&self) -> Result<ObjectSchema> {
        self.store.read(|g| Ok(g.table(self.key)?.schema.clone()))
    }

    /// Whether objects of this table are embedded
    pub fn is_embedded(&self) -> Result<bool> {
        self.store.read(|g| Ok(g.table(self.key)?.schema.embedded))
    }

    /// Column key of a property
    pub fn column_key(&self, name: &str) -> Result<ColKey> {
        self.store.read(|g| {
            let table = g.table(self.key)?;
            table
                .schema
                .property_index(name)
                .map(|i| ColKey::new(self.key, i as u32))
                .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", table.name, name)))
        })
    }

    /// Property definition of a column
    pub fn property(&self, col: ColKey) -> Result<Property> {
        self.store.read(|g| Ok(g.column(col)?.0.clone()))
    }

    /// Table that a link column points into
    pub fn target_table(&self, col: ColKey) -> Result<Option<TableRef>> {
        let target = self.store.read(|g| Ok(g.column(col)?.1))?;
        Ok(target.map(|key| TableRef::new(self.store.clone(), key)))
    }

    /// Number of objects
    pub fn len(&self) -> Result<usize> {
        self.store.read(|g| Ok(g.table(self.key)?.objects.len()))
    }

    /// Whether the table has no objects
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Create an object with default values.
    ///
    /// Embedded objects cannot be created on their own; use
    /// `Obj::create_and_set_linked_object` or `Dictionary::insert_embedded`.
    pub fn create_object(&self) -> Result<Obj> {
        let key = self.store.mutate(|g, _| {
            let table = g.table(self.key)?;
            if table.schema.embedded {
                return Err(Error::InvalidInput(format!(
                    "cannot create embedded object of '{}' without an owner",
                    table.schema.name
                )));
            }
            g.create_object(self.key)
        })?;
        Ok(Obj::new(self.store.clone(), ObjLink::new(self.key, key)))
    }

    /// Accessor for an object by key, if it exists
    pub fn get_object(&self, key: ObjKey) -> Option<Obj> {
        self.store.resolve_link(ObjLink::new(self.key, key))
    }

    /// Accessors for every object, in creation order
    pub fn objects(&self) -> Result<Vec<Obj>> {
        let keys: Vec<ObjKey> = self
            .store
            .read(|g| Ok(g.table(self.key)?.objects.keys().copied().collect()))?;
        Ok(keys
            .into_iter()
            .map(|k| Obj::new(self.store.clone(), ObjLink::new(self.key, k)))
            .collect())
    }
}

impl PartialEq for TableRef {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.store.same_store(&other.store)
    }
}

impl std::fmt::Debug for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableRef").field("key", &self.key).finish()
    }
}
