//! Maps and properties holding links and embedded objects

use crate::common::*;

#[test]
fn test_friends_are_linked_not_copied() {
    let t = TestDb::new();
    let mut grace = contact("grace");
    t.add(&mut grace);

    let mut ada = contact("ada");
    ada.friends.insert("grace", Some(grace.clone())).unwrap();
    t.add(&mut ada);

    assert_eq!(t.db.objects::<Contact>().unwrap().len(), 2);
    let friend = ada.friends.get("grace").unwrap().unwrap().unwrap();
    assert_eq!(friend.managed_obj(), grace.managed_obj());

    t.db.write(|| grace.name.set("Grace Hopper".to_string())).unwrap();
    assert_eq!(friend.name.get().unwrap(), "Grace Hopper");
}

#[test]
fn test_unmanaged_friend_is_added_with_owner() {
    let t = TestDb::new();
    let mut ada = contact("ada");
    let mut charles = contact("charles");
    charles.tags.insert("field", "engines".to_string()).unwrap();
    ada.friends.insert("charles", Some(charles)).unwrap();
    t.add(&mut ada);

    assert_eq!(t.db.objects::<Contact>().unwrap().len(), 2);
    let charles = ada.friends.get("charles").unwrap().unwrap().unwrap();
    assert_eq!(charles.tags.get("field").unwrap(), Some("engines".to_string()));
}

#[test]
fn test_self_link_through_box() {
    let t = TestDb::new();
    let mut ada = contact("ada");
    ada.best_friend.set(Some(Box::new(contact("charles")))).unwrap();
    t.add(&mut ada);

    let best = ada.best_friend.get().unwrap().unwrap();
    assert_eq!(best.name.get().unwrap(), "charles");
    assert!(best.best_friend.get().unwrap().is_none());
}

#[test]
fn test_deleted_friend_reads_as_none() {
    let t = TestDb::new();
    let mut grace = contact("grace");
    t.add(&mut grace);
    let mut ada = contact("ada");
    ada.friends.insert("grace", Some(grace.clone())).unwrap();
    t.add(&mut ada);

    t.db.write(|| t.db.remove(&grace)).unwrap();

    assert!(ada.friends.contains_key("grace").unwrap());
    assert!(ada.friends.get("grace").unwrap().unwrap().is_none());
}

#[test]
fn test_phones_are_embedded() {
    let t = TestDb::new();
    let mut ada = contact("ada");
    let mut work = phone("555-0100");
    work.primary.set(true).unwrap();
    ada.phones.insert("work", Some(work)).unwrap();
    t.add(&mut ada);

    let stored = ada.phones.get("work").unwrap().unwrap().unwrap();
    assert!(stored.managed_obj().is_some());
    assert_eq!(stored.number.get().unwrap(), "555-0100");
    assert!(stored.primary.get().unwrap());

    t.db.write(|| ada.phones.erase("work")).unwrap();
    assert!(stored.number.get().is_err());
}

#[test]
fn test_copy_between_stores() {
    let a = TestDb::new();
    let b = TestDb::new();
    let mut grace = contact("grace");
    grace.tags.insert("rank", "rear admiral".to_string()).unwrap();
    a.add(&mut grace);

    let mut ada = contact("ada");
    ada.friends.insert("grace", Some(grace.clone())).unwrap();
    b.add(&mut ada);

    let copy = ada.friends.get("grace").unwrap().unwrap().unwrap();
    assert_ne!(copy.managed_obj(), grace.managed_obj());
    assert_eq!(copy.tags.get("rank").unwrap(), Some("rear admiral".to_string()));
    assert_eq!(b.db.objects::<Contact>().unwrap().len(), 2);
}

#[test]
fn test_thread_handover() {
    let t = TestDb::new();
    let mut ada = contact("ada");
    ada.tags.insert("lang", "en".to_string()).unwrap();
    t.add(&mut ada);

    let reference = t.db.thread_safe_reference(&ada).unwrap();
    let db = t.db.clone();
    let name = std::thread::spawn(move || {
        let ada: Contact = db.resolve(&reference).unwrap();
        (ada.name.get().unwrap(), ada.tags.get("lang").unwrap())
    })
    .join()
    .unwrap();

    assert_eq!(name, ("ada".to_string(), Some("en".to_string())));
}
