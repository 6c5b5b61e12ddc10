//! Scalar persisted properties
//!
//! `Persisted<T>` is the single-value counterpart of `PersistedMap`: it holds
//! a `T` in memory until its owning object is managed, and then reads and
//! writes one column of that object.
//!
//! Both types implement `PersistedProperty`, the interface object models
//! use to declare their schema and to migrate or rebind their fields.

use crate::binding::Persistable;
use crate::map::PersistedMap;
use crate::slot::Slot;
use dualstore_core::{ColKey, Error, Result};
use dualstore_storage::{CollectionType, Obj, Property, Schema};
use tracing::trace;

/// A field of an object model that is backed by one store column
pub trait PersistedProperty {
    /// Store property describing the field
    fn property(name: &str) -> Property;

    /// Add classes the field's values need to `schema`
    fn register_dependencies(schema: &mut Schema);

    /// Copy the current value into `col` of `obj` and switch to managed
    fn manage(&mut self, obj: &Obj, col: ColKey) -> Result<()>;

    /// Bind to `col` of an already managed `obj`
    fn assign_accessor(&mut self, obj: &Obj, col: ColKey) -> Result<()>;

    /// Write the current value into `col` of `obj` without changing state
    fn write_into(&self, obj: &Obj, col: ColKey) -> Result<()>;

    /// Whether the field already reads and writes a store
    fn is_managed(&self) -> bool;

    /// Move the field into `col` of a newly created `obj`.
    ///
    /// Unmanaged fields are managed in place. A field that is bound to some
    /// other object has its current value copied and is then rebound.
    fn migrate(&mut self, obj: &Obj, col: ColKey) -> Result<()> {
        if self.is_managed() {
            self.write_into(obj, col)?;
            self.assign_accessor(obj, col)
        } else {
            self.manage(obj, col)
        }
    }
}

enum PropRepr<T> {
    Unmanaged(T),
    Managed { obj: Obj, col: ColKey },
}

/// A single value that is either in memory or a column of a stored object
pub struct Persisted<T: Persistable> {
    repr: PropRepr<T>,
}

impl<T: Persistable> Persisted<T> {
    /// Unmanaged property holding `value`
    pub fn new(value: T) -> Self {
        Persisted {
            repr: PropRepr::Unmanaged(value),
        }
    }

    /// Whether the value lives in a store
    pub fn is_managed(&self) -> bool {
        matches!(self.repr, PropRepr::Managed { .. })
    }

    /// Current value
    pub fn get(&self) -> Result<T> {
        match &self.repr {
            PropRepr::Unmanaged(value) => Ok(value.clone()),
            PropRepr::Managed { obj, col } => T::materialize(obj.get(*col)?, obj.store()),
        }
    }

    /// Replace the value
    pub fn set(&mut self, value: T) -> Result<()> {
        match &mut self.repr {
            PropRepr::Unmanaged(current) => {
                *current = value;
                Ok(())
            }
            PropRepr::Managed { obj, col } => value.persist(&Slot::property(obj, *col)),
        }
    }

    /// Copy of the current value
    pub fn detach(&self) -> Result<T> {
        self.get()
    }
}

impl<T: Persistable> PersistedProperty for Persisted<T> {
    fn property(name: &str) -> Property {
        T::binding().to_property(name, CollectionType::Single)
    }

    fn register_dependencies(schema: &mut Schema) {
        T::register_schema(schema)
    }

    fn manage(&mut self, obj: &Obj, col: ColKey) -> Result<()> {
        let value = match &self.repr {
            PropRepr::Managed { .. } => {
                return Err(Error::AlreadyManaged(
                    "property is already managed by a store".to_string(),
                ))
            }
            PropRepr::Unmanaged(value) => value,
        };
        value.persist(&Slot::property(obj, col))?;
        trace!(obj = %obj.link(), %col, "property is now managed");
        self.repr = PropRepr::Managed {
            obj: obj.clone(),
            col,
        };
        Ok(())
    }

    fn assign_accessor(&mut self, obj: &Obj, col: ColKey) -> Result<()> {
        self.repr = PropRepr::Managed {
            obj: obj.clone(),
            col,
        };
        Ok(())
    }

    fn write_into(&self, obj: &Obj, col: ColKey) -> Result<()> {
        self.get()?.persist(&Slot::property(obj, col))
    }

    fn is_managed(&self) -> bool {
        Persisted::is_managed(self)
    }
}

impl<V: Persistable> PersistedProperty for PersistedMap<V> {
    fn property(name: &str) -> Property {
        V::binding().to_property(name, CollectionType::Dictionary)
    }

    fn register_dependencies(schema: &mut Schema) {
        V::register_schema(schema)
    }

    fn manage(&mut self, obj: &Obj, col: ColKey) -> Result<()> {
        PersistedMap::manage(self, obj, col)
    }

    fn assign_accessor(&mut self, obj: &Obj, col: ColKey) -> Result<()> {
        PersistedMap::assign_accessor(self, obj, col)
    }

    fn write_into(&self, obj: &Obj, col: ColKey) -> Result<()> {
        let dict = obj.get_dictionary(col)?;
        dict.remove_all()?;
        for entry in self.iter() {
            let (key, value) = entry?;
            value.persist(&Slot::entry(&dict, &key))?;
        }
        Ok(())
    }

    fn is_managed(&self) -> bool {
        PersistedMap::is_managed(self)
    }
}

impl<T: Persistable + Default> Default for Persisted<T> {
    fn default() -> Self {
        Persisted::new(T::default())
    }
}

impl<T: Persistable> Clone for Persisted<T> {
    /// A managed clone reads and writes the same column.
    fn clone(&self) -> Self {
        let repr = match &self.repr {
            PropRepr::Unmanaged(value) => PropRepr::Unmanaged(value.clone()),
            PropRepr::Managed { obj, col } => PropRepr::Managed {
                obj: obj.clone(),
                col: *col,
            },
        };
        Persisted { repr }
    }
}

impl<T: Persistable> PartialEq for Persisted<T> {
    /// Two bindings of the same column are equal; otherwise the current
    /// values are compared. A value that cannot be read equals nothing.
    fn eq(&self, other: &Self) -> bool {
        if let (PropRepr::Managed { obj: a, col: ca }, PropRepr::Managed { obj: b, col: cb }) =
            (&self.repr, &other.repr)
        {
            if a == b && ca == cb {
                return true;
            }
        }
        match (self.get(), other.get()) {
            (Ok(a), Ok(b)) => a.eq_persisted(&b),
            _ => false,
        }
    }
}

impl<T: Persistable> From<T> for Persisted<T> {
    fn from(value: T) -> Self {
        Persisted::new(value)
    }
}

impl<T: Persistable + std::fmt::Debug> std::fmt::Debug for Persisted<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.repr {
            PropRepr::Unmanaged(value) => f.debug_tuple("Persisted::Unmanaged").field(value).finish(),
            PropRepr::Managed { obj, col } => f
                .debug_struct("Persisted::Managed")
                .field("obj", obj)
                .field("col", col)
                .finish(),
        }
    }
}
