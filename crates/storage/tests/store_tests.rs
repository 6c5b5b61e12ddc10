//! Store-level tests for dualstore-storage
//!
//! 1. Schema and tables: class tables, column lookup, defaults
//! 2. Transactions: commit, cancel, version counter, closed store
//! 3. Dictionaries: ordering, typed values, links and embedded targets
//! 4. Notifications: change sets per handler

use std::sync::Arc;

use dualstore_core::{Error, Mixed, PropertyType};
use dualstore_storage::{
    DictionaryChange, ObjectSchema, Property, Schema, Store, StoreConfig, ThreadSafeReference,
};
use parking_lot::Mutex;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn schema() -> Schema {
    Schema::new(vec![
        ObjectSchema::new(
            "Person",
            vec![
                Property::new("name", PropertyType::String),
                Property::new("age", PropertyType::Int).optional(),
                Property::new("scores", PropertyType::Int).dictionary(),
                Property::link("pets", "Pet").dictionary(),
                Property::link("homes", "Address").dictionary(),
            ],
        ),
        ObjectSchema::new("Pet", vec![Property::new("name", PropertyType::String)]),
        ObjectSchema::embedded("Address", vec![Property::new("city", PropertyType::String)]),
    ])
}

fn setup() -> Store {
    Store::open(StoreConfig::in_memory(), schema()).unwrap()
}

// ============================================================================
// Module 1: Schema and tables
// ============================================================================

#[test]
fn test_class_tables_are_prefixed() {
    let store = setup();
    let people = store.table_for_object_type("Person").unwrap();
    assert_eq!(people.name().unwrap(), "class_Person");
    assert!(store.table("Person").is_err());
    assert!(matches!(
        store.table_for_object_type("Robot"),
        Err(Error::TableNotFound(_))
    ));
}

#[test]
fn test_new_objects_have_defaults() {
    let store = setup();
    store.begin_write().unwrap();
    let person = store.table_for_object_type("Person").unwrap().create_object().unwrap();
    store.commit().unwrap();

    let name = person.column_key("name").unwrap();
    let age = person.column_key("age").unwrap();
    assert_eq!(person.get(name).unwrap(), Mixed::String(String::new()));
    assert!(person.is_null(age).unwrap());
    assert!(person.get_dictionary(person.column_key("scores").unwrap()).unwrap().is_empty().unwrap());
}

#[test]
fn test_invalid_schema_is_rejected() {
    let bad = Schema::new(vec![ObjectSchema::new(
        "Person",
        vec![Property::link("pets", "Missing").dictionary()],
    )]);
    assert!(Store::open(StoreConfig::in_memory(), bad).is_err());
}

// ============================================================================
// Module 2: Transactions
// ============================================================================

#[test]
fn test_commit_and_cancel() {
    let store = setup();
    let people = store.table_for_object_type("Person").unwrap();

    store.write(|| people.create_object().map(|_| ())).unwrap();
    assert_eq!(store.version(), 1);

    store.begin_write().unwrap();
    people.create_object().unwrap();
    store.cancel().unwrap();

    assert_eq!(people.len().unwrap(), 1);
    assert_eq!(store.version(), 1);
}

#[test]
fn test_nested_begin_is_rejected() {
    let store = setup();
    store.begin_write().unwrap();
    assert!(matches!(store.begin_write(), Err(Error::AlreadyInWriteTransaction)));
    store.cancel().unwrap();
    assert!(matches!(store.commit(), Err(Error::NotInWriteTransaction)));
}

#[test]
fn test_close_rolls_back() {
    let store = setup();
    let people = store.table_for_object_type("Person").unwrap();
    store.begin_write().unwrap();
    people.create_object().unwrap();
    store.close();

    assert!(store.is_closed());
    assert!(!store.is_in_write_transaction());
    assert!(matches!(people.len(), Err(Error::StoreClosed)));
    store.close();
}

// ============================================================================
// Module 3: Dictionaries
// ============================================================================

#[test]
fn test_dictionary_type_checks() {
    let store = setup();
    store.begin_write().unwrap();
    let person = store.table_for_object_type("Person").unwrap().create_object().unwrap();
    let scores = person.get_dictionary(person.column_key("scores").unwrap()).unwrap();

    scores.insert("a", 1i64).unwrap();
    assert!(matches!(scores.insert("b", "text"), Err(Error::TypeMismatch { .. })));
    assert!(matches!(scores.insert("c", Mixed::Null), Err(Error::TypeMismatch { .. })));
    store.commit().unwrap();

    assert_eq!(scores.keys().unwrap(), vec!["a"]);
}

#[test]
fn test_embedded_entries_follow_their_slot() {
    let store = setup();
    store.begin_write().unwrap();
    let person = store.table_for_object_type("Person").unwrap().create_object().unwrap();
    let homes = person.get_dictionary(person.column_key("homes").unwrap()).unwrap();
    let home = homes.insert_embedded("main").unwrap();
    home.set(home.column_key("city").unwrap(), "Oslo").unwrap();

    assert!(matches!(homes.insert("copy", home.link()), Err(Error::InvalidInput(_))));
    assert!(homes.remove("main").unwrap());
    store.commit().unwrap();

    assert!(!home.is_valid());
    let addresses = store.table_for_object_type("Address").unwrap();
    assert_eq!(addresses.len().unwrap(), 0);
}

#[test]
fn test_links_survive_as_dangling() {
    let store = setup();
    store.begin_write().unwrap();
    let person = store.table_for_object_type("Person").unwrap().create_object().unwrap();
    let pet = store.table_for_object_type("Pet").unwrap().create_object().unwrap();
    let pets = person.get_dictionary(person.column_key("pets").unwrap()).unwrap();
    pets.insert("rex", pet.link()).unwrap();
    pet.remove().unwrap();
    store.commit().unwrap();

    let stored = pets.get("rex").unwrap().unwrap().as_link().unwrap();
    assert!(store.resolve_link(stored).is_none());
    assert!(matches!(store.object(stored), Err(Error::InvalidObject(_))));
}

#[test]
fn test_dictionary_reference_resolves_elsewhere() {
    let store = setup();
    store.begin_write().unwrap();
    let person = store.table_for_object_type("Person").unwrap().create_object().unwrap();
    let scores = person.get_dictionary(person.column_key("scores").unwrap()).unwrap();
    scores.insert("a", 7i64).unwrap();
    store.commit().unwrap();

    let reference = ThreadSafeReference::dictionary(&scores);
    let other = setup();
    assert!(other.resolve_dictionary(&reference).is_err());

    let handle = {
        let store = store.clone();
        std::thread::spawn(move || store.resolve_dictionary(&reference).unwrap().get("a").unwrap())
    };
    assert_eq!(handle.join().unwrap(), Some(Mixed::Int(7)));
}

// ============================================================================
// Module 4: Notifications
// ============================================================================

#[test]
fn test_each_handler_sees_its_own_dictionary() {
    let store = setup();
    store.begin_write().unwrap();
    let people = store.table_for_object_type("Person").unwrap();
    let (a, b) = (people.create_object().unwrap(), people.create_object().unwrap());
    store.commit().unwrap();
    let col = a.column_key("scores").unwrap();
    let (da, db) = (a.get_dictionary(col).unwrap(), b.get_dictionary(col).unwrap());

    let seen: Arc<Mutex<Vec<(char, DictionaryChange)>>> = Arc::default();
    let sink_a = Arc::clone(&seen);
    let sink_b = Arc::clone(&seen);
    let _ha = da
        .add_notification_callback(move |c: &DictionaryChange| sink_a.lock().push(('a', c.clone())))
        .unwrap();
    let _hb = db
        .add_notification_callback(move |c: &DictionaryChange| sink_b.lock().push(('b', c.clone())))
        .unwrap();

    store.write(|| da.insert("x", 1i64)).unwrap();

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, 'a');
    assert_eq!(seen[0].1.insertions, vec!["x"]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_dictionary_keys_are_sorted(keys in prop::collection::vec("[a-z]{1,4}", 0..24)) {
        let store = setup();
        store.begin_write().unwrap();
        let person = store.table_for_object_type("Person").unwrap().create_object().unwrap();
        let scores = person.get_dictionary(person.column_key("scores").unwrap()).unwrap();
        for (i, key) in keys.iter().enumerate() {
            scores.insert(key.as_str(), i as i64).unwrap();
        }
        store.commit().unwrap();

        let mut expected = keys.clone();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(scores.keys().unwrap(), expected.clone());
        for (i, key) in expected.iter().enumerate() {
            prop_assert_eq!(scores.get_key_index(key).unwrap(), Some(i));
        }
    }
}
