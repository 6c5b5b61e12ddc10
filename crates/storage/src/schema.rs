//! Object schemas
//!
//! A store is opened with a `Schema`: one `ObjectSchema` per object class,
//! each listing typed properties. Every class becomes a table named
//! `class_<Name>`.
//!
//! Object-typed properties name a target class. Targets marked `embedded`
//! are owned by the object (or dictionary slot) that links to them: they
//! cannot be created on their own and are deleted with their owner.

use dualstore_core::{Error, PropertyType, Result};
use rustc_hash::FxHashSet;

/// Prefix applied to class names to form table names.
pub const CLASS_PREFIX: &str = "class_";

/// Table name used for an object class.
pub fn table_name_for_object_type(class_name: &str) -> String {
    format!("{}{}", CLASS_PREFIX, class_name)
}

/// Whether a property holds a single value or a string-keyed dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    /// One value
    Single,
    /// String keys to values of the property type
    Dictionary,
}

/// One property of an object class.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Property name, unique within the class
    pub name: String,
    /// Element type
    pub property_type: PropertyType,
    /// Whether null is accepted
    pub optional: bool,
    /// Single value or dictionary
    pub collection: CollectionType,
    /// Target class for `PropertyType::Object`
    pub target: Option<String>,
}

impl Property {
    /// A required single-valued property.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Property {
            name: name.into(),
            property_type,
            optional: false,
            collection: CollectionType::Single,
            target: None,
        }
    }

    /// A link to an object of `target`. Links are always nullable.
    pub fn link(name: impl Into<String>, target: impl Into<String>) -> Self {
        Property {
            name: name.into(),
            property_type: PropertyType::Object,
            optional: true,
            collection: CollectionType::Single,
            target: Some(target.into()),
        }
    }

    /// Mark the property nullable.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Turn the property into a dictionary of its type.
    pub fn dictionary(mut self) -> Self {
        self.collection = CollectionType::Dictionary;
        self
    }

    /// Whether the property is a dictionary.
    pub fn is_dictionary(&self) -> bool {
        self.collection == CollectionType::Dictionary
    }

    /// Whether null may be stored in this property (or its dictionary slots).
    pub fn accepts_null(&self) -> bool {
        self.optional
            || matches!(
                self.property_type,
                PropertyType::Object | PropertyType::Mixed
            )
    }
}

/// Schema of one object class.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSchema {
    /// Class name (without the table prefix)
    pub name: String,
    /// Properties in column order
    pub properties: Vec<Property>,
    /// Whether objects of this class are owned by their parent
    pub embedded: bool,
}

impl ObjectSchema {
    /// A top-level class.
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        ObjectSchema {
            name: name.into(),
            properties,
            embedded: false,
        }
    }

    /// An embedded class.
    pub fn embedded(name: impl Into<String>, properties: Vec<Property>) -> Self {
        ObjectSchema {
            name: name.into(),
            properties,
            embedded: true,
        }
    }

    /// Find a property by name.
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Column position of a property.
    pub fn property_index(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name == name)
    }
}

/// The full set of object classes in a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    objects: Vec<ObjectSchema>,
}

impl Schema {
    /// Build a schema from classes.
    pub fn new(objects: Vec<ObjectSchema>) -> Self {
        Schema { objects }
    }

    /// Add a class unless one with the same name exists.
    pub fn add(&mut self, object: ObjectSchema) {
        if self.find(&object.name).is_none() {
            self.objects.push(object);
        }
    }

    /// Find a class by name.
    pub fn find(&self, name: &str) -> Option<&ObjectSchema> {
        self.objects.iter().find(|o| o.name == name)
    }

    /// All classes in declaration order.
    pub fn objects(&self) -> &[ObjectSchema] {
        &self.objects
    }

    /// Check internal consistency.
    ///
    /// Class names and property names must be unique, object properties
    /// must name an existing target class, and non-object properties must
    /// not name one.
    pub fn validate(&self) -> Result<()> {
        let mut classes = FxHashSet::default();
        for object in &self.objects {
            if !classes.insert(object.name.as_str()) {
                return Err(Error::InvalidInput(format!(
                    "duplicate class '{}'",
                    object.name
                )));
            }
            let mut names = FxHashSet::default();
            for prop in &object.properties {
                if !names.insert(prop.name.as_str()) {
                    return Err(Error::InvalidInput(format!(
                        "duplicate property '{}.{}'",
                        object.name, prop.name
                    )));
                }
                match (prop.property_type, &prop.target) {
                    (PropertyType::Object, Some(target)) => {
                        if self.find(target).is_none() {
                            return Err(Error::InvalidInput(format!(
                                "property '{}.{}' links to unknown class '{}'",
                                object.name, prop.name, target
                            )));
                        }
                    }
                    (PropertyType::Object, None) => {
                        return Err(Error::InvalidInput(format!(
                            "object property '{}.{}' has no target class",
                            object.name, prop.name
                        )));
                    }
                    (_, Some(_)) => {
                        return Err(Error::InvalidInput(format!(
                            "property '{}.{}' of type {} cannot have a target class",
                            object.name, prop.name, prop.property_type
                        )));
                    }
                    (_, None) => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person_schema() -> Schema {
        Schema::new(vec![
            ObjectSchema::new(
                "Person",
                vec![
                    Property::new("name", PropertyType::String),
                    Property::new("scores", PropertyType::Int).dictionary(),
                    Property::link("dog", "Dog"),
                ],
            ),
            ObjectSchema::new("Dog", vec![Property::new("name", PropertyType::String)]),
        ])
    }

    #[test]
    fn test_table_name_prefix() {
        assert_eq!(table_name_for_object_type("Person"), "class_Person");
    }

    #[test]
    fn test_valid_schema() {
        assert!(person_schema().validate().is_ok());
    }

    #[test]
    fn test_unknown_link_target_rejected() {
        let schema = Schema::new(vec![ObjectSchema::new(
            "Person",
            vec![Property::link("dog", "Dog")],
        )]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_duplicate_property_rejected() {
        let schema = Schema::new(vec![ObjectSchema::new(
            "Person",
            vec![
                Property::new("name", PropertyType::String),
                Property::new("name", PropertyType::Int),
            ],
        )]);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_add_ignores_duplicates() {
        let mut schema = person_schema();
        schema.add(ObjectSchema::new("Dog", vec![]));
        assert_eq!(schema.objects().len(), 2);
        assert_eq!(schema.find("Dog").unwrap().properties.len(), 1);
    }

    #[test]
    fn test_accepts_null() {
        assert!(!Property::new("n", PropertyType::Int).accepts_null());
        assert!(Property::new("n", PropertyType::Int).optional().accepts_null());
        assert!(Property::new("m", PropertyType::Mixed).accepts_null());
        assert!(Property::link("d", "Dog").accepts_null());
    }

    #[test]
    fn test_property_lookup() {
        let schema = person_schema();
        let person = schema.find("Person").unwrap();
        assert_eq!(person.property_index("dog"), Some(2));
        assert!(person.property("scores").unwrap().is_dictionary());
        assert!(person.property("missing").is_none());
    }
}
