//! Object models
//!
//! An object model is a plain Rust struct whose fields are `Persisted<T>` or
//! `PersistedMap<V>`. The struct is usable on its own; adding it to a `Db`
//! migrates every field into a new row of the class table, after which the
//! fields read and write the store.
//!
//! Models are declared with `persisted_object!` (top-level classes, stored
//! by link) or `embedded_object!` (owned by the property or dictionary entry
//! that holds them).
//!
//! ```
//! use dualstore_collections::{persisted_object, ObjectModel, Persisted, PersistedMap};
//!
//! persisted_object! {
//!     pub struct Person {
//!         pub name: Persisted<String>,
//!         pub nicknames: PersistedMap<String>,
//!     }
//! }
//!
//! let person = Person::default();
//! assert_eq!(Person::CLASS_NAME, "Person");
//! assert_eq!(Person::properties().len(), 2);
//! assert!(person.managed_obj().is_none());
//! ```

use crate::slot::Slot;
use dualstore_core::{Error, Mixed, Result};
use dualstore_storage::{Obj, ObjectSchema, Property, Schema, Store};
use tracing::trace;

/// A struct stored as one object of a class table
pub trait ObjectModel: Default + Clone + Send + 'static {
    /// Class name; the table is `class_<CLASS_NAME>`
    const CLASS_NAME: &'static str;

    /// Whether objects are owned by their parent
    const EMBEDDED: bool;

    /// Store properties, one per field
    fn properties() -> Vec<Property>;

    /// Add the classes the fields refer to
    fn register_dependencies(schema: &mut Schema);

    /// Schema of the class
    fn object_schema() -> ObjectSchema {
        if Self::EMBEDDED {
            ObjectSchema::embedded(Self::CLASS_NAME, Self::properties())
        } else {
            ObjectSchema::new(Self::CLASS_NAME, Self::properties())
        }
    }

    /// Add this class and everything it links to
    fn register(schema: &mut Schema) {
        // Registered classes are skipped so cyclic links terminate.
        if schema.find(Self::CLASS_NAME).is_some() {
            return;
        }
        schema.add(Self::object_schema());
        Self::register_dependencies(schema);
    }

    /// Write every field into `obj`, leaving `self` as it is
    fn write_fields(&self, obj: &Obj) -> Result<()>;

    /// Migrate every field into `obj` and bind the model to it.
    ///
    /// On failure the model is left unmanaged with its values intact.
    fn manage(&mut self, obj: Obj) -> Result<()>;

    /// Move every field into `obj`; may leave some fields managed on error
    fn migrate_fields(&mut self, obj: &Obj) -> Result<()>;

    /// Bind every field to the matching column of `obj`
    fn assign_accessors(&mut self, obj: Obj) -> Result<()>;

    /// Backing object, when managed
    fn managed_obj(&self) -> Option<&Obj>;

    /// Managed instance bound to `obj`
    fn from_managed(obj: Obj) -> Result<Self> {
        let mut value = Self::default();
        value.assign_accessors(obj)?;
        Ok(value)
    }
}

/// Store `value` into `slot` as a link.
///
/// Embedded models get a fresh object owned by the slot, unless the slot
/// already holds the very object `value` is bound to. A top-level
/// model already managed by the same store is linked directly; anything else
/// is copied into a new object of the slot's target table.
pub fn persist_object<T: ObjectModel>(value: &T, slot: &Slot<'_>) -> Result<()> {
    if T::EMBEDDED {
        if let Some(current) = value.managed_obj() {
            // Re-creating the object would delete the source before it is read.
            if slot.get()?.and_then(|v| v.as_link()) == Some(current.link())
                && current.store().same_store(slot.store())
            {
                return Ok(());
            }
        }
        let obj = slot.create_embedded()?;
        trace!(class = T::CLASS_NAME, target = %obj.link(), "writing embedded object");
        return value.write_fields(&obj);
    }
    if let Some(obj) = value.managed_obj() {
        if obj.store().same_store(slot.store()) && obj.is_valid() {
            return slot.set(Mixed::Link(obj.link()));
        }
    }
    let obj = slot.target_table()?.create_object()?;
    trace!(class = T::CLASS_NAME, target = %obj.link(), "copying object into store");
    value.write_fields(&obj)?;
    slot.set(Mixed::Link(obj.link()))
}

/// Decode a stored link into a managed model
pub fn materialize_object<T: ObjectModel>(value: Mixed, store: &Store) -> Result<T> {
    match value {
        Mixed::Link(link) => {
            let obj = store.resolve_link(link).ok_or_else(|| {
                Error::InvalidObject(format!("{} object {} was deleted", T::CLASS_NAME, link))
            })?;
            T::from_managed(obj)
        }
        other => Err(Error::type_mismatch("Link", other.type_name())),
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! __object_model {
    (
        $embedded:expr;
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $fty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Default, Clone)]
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $fty, )*
            #[doc(hidden)]
            pub __managed: ::core::option::Option<$crate::Obj>,
        }

        impl $crate::ObjectModel for $name {
            const CLASS_NAME: &'static str = stringify!($name);
            const EMBEDDED: bool = $embedded;

            fn properties() -> ::std::vec::Vec<$crate::Property> {
                ::std::vec![
                    $( <$fty as $crate::PersistedProperty>::property(stringify!($field)), )*
                ]
            }

            fn register_dependencies(_schema: &mut $crate::Schema) {
                $( <$fty as $crate::PersistedProperty>::register_dependencies(_schema); )*
            }

            fn write_fields(&self, _obj: &$crate::Obj) -> $crate::Result<()> {
                $(
                    $crate::PersistedProperty::write_into(
                        &self.$field,
                        _obj,
                        _obj.column_key(stringify!($field))?,
                    )?;
                )*
                Ok(())
            }

            fn manage(&mut self, obj: $crate::Obj) -> $crate::Result<()> {
                if self.__managed.is_some() {
                    return Err($crate::Error::AlreadyManaged(format!(
                        "{} object is already managed by a store",
                        stringify!($name)
                    )));
                }
                if !obj.store().is_in_write_transaction() {
                    return Err($crate::Error::NotInWriteTransaction);
                }
                let backup = ::core::clone::Clone::clone(self);
                if let Err(e) = <Self as $crate::ObjectModel>::migrate_fields(self, &obj) {
                    *self = backup;
                    return Err(e);
                }
                self.__managed = Some(obj);
                Ok(())
            }

            fn migrate_fields(&mut self, _obj: &$crate::Obj) -> $crate::Result<()> {
                $(
                    $crate::PersistedProperty::migrate(
                        &mut self.$field,
                        _obj,
                        _obj.column_key(stringify!($field))?,
                    )?;
                )*
                Ok(())
            }

            fn assign_accessors(&mut self, obj: $crate::Obj) -> $crate::Result<()> {
                $(
                    $crate::PersistedProperty::assign_accessor(
                        &mut self.$field,
                        &obj,
                        obj.column_key(stringify!($field))?,
                    )?;
                )*
                self.__managed = Some(obj);
                Ok(())
            }

            fn managed_obj(&self) -> ::core::option::Option<&$crate::Obj> {
                self.__managed.as_ref()
            }
        }

        impl ::core::cmp::PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                match (&self.__managed, &other.__managed) {
                    (Some(a), Some(b)) => a == b,
                    (None, None) => true $( && self.$field == other.$field )*,
                    _ => false,
                }
            }
        }

        impl $crate::Persistable for $name {
            fn binding() -> $crate::TypeBinding {
                $crate::TypeBinding::object(stringify!($name), $embedded)
            }

            fn persist(&self, slot: &$crate::Slot<'_>) -> $crate::Result<()> {
                $crate::persist_object(self, slot)
            }

            fn materialize(value: $crate::Mixed, store: &$crate::Store) -> $crate::Result<Self> {
                $crate::materialize_object(value, store)
            }

            fn register_schema(schema: &mut $crate::Schema) {
                <$name as $crate::ObjectModel>::register(schema)
            }

            fn eq_persisted(&self, other: &Self) -> bool {
                self == other
            }
        }
    };
}

/// Declare a top-level object model.
///
/// Every field must be a `Persisted<T>` or `PersistedMap<V>`. The macro
/// adds `#[derive(Default, Clone)]`, a hidden field holding the backing
/// object, and `PartialEq`: managed objects are equal when they are the same
/// stored object, unmanaged ones when every field is equal.
#[macro_export]
macro_rules! persisted_object {
    ($($body:tt)*) => {
        $crate::__object_model!(false; $($body)*);
    };
}

/// Declare an embedded object model.
///
/// Embedded objects cannot be added to a `Db` directly; they are created
/// when stored into a property or map of another object.
#[macro_export]
macro_rules! embedded_object {
    ($($body:tt)*) => {
        $crate::__object_model!(true; $($body)*);
    };
}
