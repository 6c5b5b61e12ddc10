//! The store's variant value
//!
//! `Mixed` is what every dictionary slot and every object column holds. It is
//! both the encoding target for typed values and the value of an untyped
//! ("mixed") property.
//!
//! ## Equality
//!
//! Values of different variants are never equal: `Int(1) != Double(1.0)`.
//! Doubles follow IEEE-754 (`NaN != NaN`, `-0.0 == 0.0`).

use crate::object_id::ObjectId;
use crate::timestamp::Timestamp;
use crate::types::ObjLink;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A dynamically typed store value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Mixed {
    /// No value
    #[default]
    Null,
    /// 64-bit signed integer
    Int(i64),
    /// Boolean
    Bool(bool),
    /// 64-bit float
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Point in time
    Timestamp(Timestamp),
    /// 12-byte object id
    ObjectId(ObjectId),
    /// UUID
    Uuid(Uuid),
    /// Link to an object (possibly dangling)
    Link(ObjLink),
}

impl Mixed {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Mixed::Null => "Null",
            Mixed::Int(_) => "Int",
            Mixed::Bool(_) => "Bool",
            Mixed::Double(_) => "Double",
            Mixed::String(_) => "String",
            Mixed::Binary(_) => "Binary",
            Mixed::Timestamp(_) => "Timestamp",
            Mixed::ObjectId(_) => "ObjectId",
            Mixed::Uuid(_) => "Uuid",
            Mixed::Link(_) => "Link",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Mixed::Null)
    }

    /// Get as integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Mixed::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Mixed::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as double
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Mixed::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Mixed::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as byte slice
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Mixed::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get as timestamp
    pub fn as_timestamp(&self) -> Option<Timestamp> {
        match self {
            Mixed::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Get as object id
    pub fn as_object_id(&self) -> Option<ObjectId> {
        match self {
            Mixed::ObjectId(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as UUID
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Mixed::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    /// Get as link
    pub fn as_link(&self) -> Option<ObjLink> {
        match self {
            Mixed::Link(l) => Some(*l),
            _ => None,
        }
    }
}

// ============================================================================
// From Implementations
// ============================================================================

impl From<i64> for Mixed {
    fn from(v: i64) -> Self {
        Mixed::Int(v)
    }
}

impl From<i32> for Mixed {
    fn from(v: i32) -> Self {
        Mixed::Int(i64::from(v))
    }
}

impl From<bool> for Mixed {
    fn from(v: bool) -> Self {
        Mixed::Bool(v)
    }
}

impl From<f64> for Mixed {
    fn from(v: f64) -> Self {
        Mixed::Double(v)
    }
}

impl From<&str> for Mixed {
    fn from(s: &str) -> Self {
        Mixed::String(s.to_string())
    }
}

impl From<String> for Mixed {
    fn from(s: String) -> Self {
        Mixed::String(s)
    }
}

impl From<Vec<u8>> for Mixed {
    fn from(b: Vec<u8>) -> Self {
        Mixed::Binary(b)
    }
}

impl From<Timestamp> for Mixed {
    fn from(t: Timestamp) -> Self {
        Mixed::Timestamp(t)
    }
}

impl From<ObjectId> for Mixed {
    fn from(id: ObjectId) -> Self {
        Mixed::ObjectId(id)
    }
}

impl From<Uuid> for Mixed {
    fn from(id: Uuid) -> Self {
        Mixed::Uuid(id)
    }
}

impl From<ObjLink> for Mixed {
    fn from(l: ObjLink) -> Self {
        Mixed::Link(l)
    }
}

impl<T: Into<Mixed>> From<Option<T>> for Mixed {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Mixed::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ObjKey, TableKey};

    #[test]
    fn test_different_types_never_equal() {
        assert_ne!(Mixed::Int(1), Mixed::Double(1.0));
        assert_ne!(Mixed::Int(0), Mixed::Bool(false));
        assert_ne!(Mixed::Null, Mixed::String(String::new()));
        assert_ne!(Mixed::String("a".into()), Mixed::Binary(b"a".to_vec()));
    }

    #[test]
    fn test_double_ieee_semantics() {
        assert_ne!(Mixed::Double(f64::NAN), Mixed::Double(f64::NAN));
        assert_eq!(Mixed::Double(-0.0), Mixed::Double(0.0));
    }

    #[test]
    fn test_every_variant_equals_its_clone() {
        let link = ObjLink::new(TableKey(1), ObjKey(2));
        let values = vec![
            Mixed::Null,
            Mixed::Int(-3),
            Mixed::Bool(true),
            Mixed::Double(2.5),
            Mixed::from("s"),
            Mixed::Binary(vec![0, 1]),
            Mixed::Timestamp(Timestamp::new(5, 6)),
            Mixed::ObjectId(ObjectId::from_bytes([7; 12])),
            Mixed::Uuid(Uuid::from_u128(9)),
            Mixed::Link(link),
        ];
        for (i, a) in values.iter().enumerate() {
            for (j, b) in values.iter().enumerate() {
                assert_eq!(a == b, i == j, "{:?} vs {:?}", a, b);
            }
        }
        assert_ne!(Mixed::Link(link), Mixed::Link(ObjLink::new(TableKey(1), ObjKey(3))));
    }

    #[test]
    fn test_type_name() {
        assert_eq!(Mixed::Null.type_name(), "Null");
        assert_eq!(Mixed::from(5i64).type_name(), "Int");
        assert_eq!(
            Mixed::Link(ObjLink::new(TableKey(0), ObjKey(0))).type_name(),
            "Link"
        );
    }

    #[test]
    fn test_accessors_reject_other_types() {
        let v = Mixed::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.as_int(), None);
        assert_eq!(v.as_bool(), None);
        assert!(!v.is_null());
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Mixed::from(None::<i64>), Mixed::Null);
        assert_eq!(Mixed::from(Some(3i64)), Mixed::Int(3));
    }

    #[test]
    fn test_default_is_null() {
        assert!(Mixed::default().is_null());
    }
}
