//! Type bindings: how a Rust value maps onto the store
//!
//! Every element type a persisted collection or property can hold implements
//! `Persistable`. The implementation decides, at compile time, which of four
//! encodings applies:
//!
//! | Kind | Types | Stored as |
//! |---|---|---|
//! | Primitive | `i64`, `f64`, `bool`, `String`, `Vec<u8>`, `Timestamp`, `DateTime<Utc>`, `Uuid`, `ObjectId`, enums | the matching `Mixed` variant |
//! | Mixed | `Mixed` | itself |
//! | ObjectLink | types declared with `persisted_object!` | a link into the class table |
//! | Embedded | types declared with `embedded_object!` | a link to an owned embedded object |
//!
//! `Option<T>` works for every `T` above and stores `None` as null.
//!
//! ## Reading links
//!
//! A link whose target was deleted decodes to `None` through `Option<T>`.
//! Decoding it as a bare `T` is an `Error::InvalidObject`.

use crate::slot::Slot;
use chrono::{DateTime, Utc};
use dualstore_core::{Error, Mixed, ObjectId, PropertyType, Result, Timestamp, Uuid};
use dualstore_storage::{CollectionType, Property, Schema, Store};

/// Encoding family of a bound type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Stored directly as a typed store value
    Primitive,
    /// Stored as a dynamically typed value
    Mixed,
    /// Stored as a link to a top-level object
    ObjectLink,
    /// Stored as a link to an owned embedded object
    Embedded,
}

/// Static description of how a type is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeBinding {
    /// Store column type
    pub property_type: PropertyType,
    /// Whether null is a valid stored value
    pub optional: bool,
    /// Encoding family
    pub kind: ValueKind,
    /// Target class for link kinds
    pub target_class: Option<&'static str>,
}

impl TypeBinding {
    /// Binding of a required primitive
    pub const fn primitive(property_type: PropertyType) -> Self {
        TypeBinding {
            property_type,
            optional: false,
            kind: ValueKind::Primitive,
            target_class: None,
        }
    }

    /// Binding of the variant type
    pub const fn mixed() -> Self {
        TypeBinding {
            property_type: PropertyType::Mixed,
            optional: true,
            kind: ValueKind::Mixed,
            target_class: None,
        }
    }

    /// Binding of an object class
    pub const fn object(class_name: &'static str, embedded: bool) -> Self {
        TypeBinding {
            property_type: PropertyType::Object,
            optional: false,
            kind: if embedded {
                ValueKind::Embedded
            } else {
                ValueKind::ObjectLink
            },
            target_class: Some(class_name),
        }
    }

    /// Same binding, nullable
    pub const fn into_optional(self) -> Self {
        TypeBinding {
            optional: true,
            ..self
        }
    }

    /// Whether values are stored as links
    pub fn is_link(&self) -> bool {
        matches!(self.kind, ValueKind::ObjectLink | ValueKind::Embedded)
    }

    /// Store property for a field of this type
    pub fn to_property(&self, name: &str, collection: CollectionType) -> Property {
        Property {
            name: name.to_string(),
            property_type: self.property_type,
            optional: self.optional,
            collection,
            target: self.target_class.map(String::from),
        }
    }
}

/// A type stored directly as a store value
pub trait Primitive: Sized {
    /// Store column type
    const PROPERTY_TYPE: PropertyType;

    /// Encode into a store value
    fn serialize(&self) -> Mixed;

    /// Decode from a store value
    fn deserialize(value: &Mixed) -> Result<Self>;
}

/// A type that can live in a persisted collection or property
pub trait Persistable: Clone + Send + 'static {
    /// How the type is stored
    fn binding() -> TypeBinding;

    /// Write the value into `slot`.
    ///
    /// Link kinds create (or reuse) the target object first.
    fn persist(&self, slot: &Slot<'_>) -> Result<()>;

    /// Decode a stored value read from `store`
    fn materialize(value: Mixed, store: &Store) -> Result<Self>;

    /// Whether two values are the same stored value.
    ///
    /// Managed objects compare by identity, unmanaged ones field by field.
    fn eq_persisted(&self, other: &Self) -> bool;

    /// Add the classes this type needs to `schema`
    fn register_schema(_schema: &mut Schema) {}

    /// Read a slot; `None` when a dictionary key is absent
    fn read(slot: &Slot<'_>) -> Result<Option<Self>> {
        slot.get()?
            .map(|value| Self::materialize(value, slot.store()))
            .transpose()
    }
}

// ============================================================================
// Primitive implementations
// ============================================================================

macro_rules! impl_primitive {
    ($ty:ty, $prop:ident, $variant:ident) => {
        impl Primitive for $ty {
            const PROPERTY_TYPE: PropertyType = PropertyType::$prop;

            fn serialize(&self) -> Mixed {
                Mixed::$variant(Clone::clone(self))
            }

            fn deserialize(value: &Mixed) -> Result<Self> {
                match value {
                    Mixed::$variant(v) => Ok(Clone::clone(v)),
                    other => Err(Error::type_mismatch(
                        PropertyType::$prop.name(),
                        other.type_name(),
                    )),
                }
            }
        }

        impl_persistable_via_primitive!($ty);
    };
}

/// Implement `Persistable` for a type that already implements `Primitive`.
#[macro_export]
macro_rules! impl_persistable_via_primitive {
    ($ty:ty) => {
        impl $crate::Persistable for $ty {
            fn binding() -> $crate::TypeBinding {
                $crate::TypeBinding::primitive(<$ty as $crate::Primitive>::PROPERTY_TYPE)
            }

            fn persist(&self, slot: &$crate::Slot<'_>) -> $crate::Result<()> {
                slot.set($crate::Primitive::serialize(self))
            }

            fn materialize(value: $crate::Mixed, _store: &$crate::Store) -> $crate::Result<Self> {
                <$ty as $crate::Primitive>::deserialize(&value)
            }

            fn eq_persisted(&self, other: &Self) -> bool {
                $crate::Primitive::serialize(self) == $crate::Primitive::serialize(other)
            }
        }
    };
}

impl_primitive!(i64, Int, Int);
impl_primitive!(bool, Bool, Bool);
impl_primitive!(f64, Double, Double);
impl_primitive!(String, String, String);
impl_primitive!(Vec<u8>, Binary, Binary);
impl_primitive!(Timestamp, Timestamp, Timestamp);
impl_primitive!(ObjectId, ObjectId, ObjectId);
impl_primitive!(Uuid, Uuid, Uuid);

impl Primitive for DateTime<Utc> {
    const PROPERTY_TYPE: PropertyType = PropertyType::Timestamp;

    fn serialize(&self) -> Mixed {
        Mixed::Timestamp(Timestamp::from(*self))
    }

    fn deserialize(value: &Mixed) -> Result<Self> {
        match value {
            Mixed::Timestamp(ts) => ts.to_datetime().ok_or_else(|| {
                Error::InvalidInput(format!("timestamp {} is out of range for DateTime", ts))
            }),
            other => Err(Error::type_mismatch("Timestamp", other.type_name())),
        }
    }
}

impl_persistable_via_primitive!(DateTime<Utc>);

// ============================================================================
// Mixed and Option
// ============================================================================

impl Persistable for Mixed {
    fn binding() -> TypeBinding {
        TypeBinding::mixed()
    }

    fn persist(&self, slot: &Slot<'_>) -> Result<()> {
        slot.set(self.clone())
    }

    fn materialize(value: Mixed, _store: &Store) -> Result<Self> {
        Ok(value)
    }

    fn eq_persisted(&self, other: &Self) -> bool {
        self == other
    }
}

impl<T: Persistable> Persistable for Option<T> {
    fn binding() -> TypeBinding {
        T::binding().into_optional()
    }

    fn persist(&self, slot: &Slot<'_>) -> Result<()> {
        match self {
            Some(value) => value.persist(slot),
            None => slot.set(Mixed::Null),
        }
    }

    fn materialize(value: Mixed, store: &Store) -> Result<Self> {
        match value {
            Mixed::Null => Ok(None),
            Mixed::Link(link) if T::binding().is_link() && store.resolve_link(link).is_none() => {
                Ok(None)
            }
            other => T::materialize(other, store).map(Some),
        }
    }

    fn eq_persisted(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.eq_persisted(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn register_schema(schema: &mut Schema) {
        T::register_schema(schema)
    }
}

/// Models that link to their own class hold the target boxed.
impl<T: Persistable> Persistable for Box<T> {
    fn binding() -> TypeBinding {
        T::binding()
    }

    fn persist(&self, slot: &Slot<'_>) -> Result<()> {
        (**self).persist(slot)
    }

    fn materialize(value: Mixed, store: &Store) -> Result<Self> {
        T::materialize(value, store).map(Box::new)
    }

    fn eq_persisted(&self, other: &Self) -> bool {
        (**self).eq_persisted(other)
    }

    fn register_schema(schema: &mut Schema) {
        T::register_schema(schema)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Store a field-less enum as its integer discriminant.
///
/// ```
/// use dualstore_collections::{persisted_enum, Primitive};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// pub enum Color {
///     Red = 1,
///     Green = 2,
/// }
/// persisted_enum!(Color { Red, Green });
///
/// assert_eq!(Color::Green.serialize(), dualstore_collections::Mixed::Int(2));
/// ```
#[macro_export]
macro_rules! persisted_enum {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl $crate::Primitive for $ty {
            const PROPERTY_TYPE: $crate::PropertyType = $crate::PropertyType::Int;

            fn serialize(&self) -> $crate::Mixed {
                match self {
                    $($ty::$variant => $crate::Mixed::Int($ty::$variant as i64),)+
                }
            }

            fn deserialize(value: &$crate::Mixed) -> $crate::Result<Self> {
                match value {
                    $($crate::Mixed::Int(v) if *v == $ty::$variant as i64 => Ok($ty::$variant),)+
                    $crate::Mixed::Int(v) => Err($crate::Error::InvalidInput(format!(
                        "{} is not a valid {}",
                        v,
                        stringify!($ty)
                    ))),
                    other => Err($crate::Error::type_mismatch("Int", other.type_name())),
                }
            }
        }

        $crate::impl_persistable_via_primitive!($ty);
    };
}
