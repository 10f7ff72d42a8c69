use std::sync::Arc;

use chrono::{TimeZone, Utc};
use secrecy::ExposeSecret;
use test_case::test_case;

use super::*;
use crate::error::Status;
use crate::store::MemoryStore;

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

fn alice(store: &Arc<MemoryStore>) -> Item {
    Item::new(
        store.clone(),
        [
            (Attribute::Service, "example.com"),
            (Attribute::Account, "alice"),
        ],
    )
    .unwrap()
}

fn saved_alice(store: &Arc<MemoryStore>) -> Item {
    let mut item = alice(store);
    item.set_password("s3cret");
    item.save().unwrap();
    store.clear_calls();
    item
}

#[test]
fn test_new_item_defaults_to_generic_password() {
    let store = store();
    let item = alice(&store);
    assert_eq!(item.class(), Some(ItemClass::GenericPassword));
    assert!(!item.is_persisted());
    assert!(store.calls().is_empty());
}

#[test]
fn test_password_field_goes_to_pending_secret() {
    let store = store();
    let item = Item::from_fields(
        store.clone(),
        [
            ("service", AttributeValue::from("example.com")),
            ("password", AttributeValue::from("s3cret")),
        ],
    )
    .unwrap();
    assert!(item.has_pending_password());
    assert_eq!(item.attributes().len(), 2);
    assert_eq!(item.password().unwrap().expose_secret(), b"s3cret");
    assert!(store.calls().is_empty());
}

#[test_case("colour" ; "unknown attribute")]
#[test_case("secret" ; "not the password field")]
fn test_unknown_field_name_is_rejected(name: &str) {
    let err = Item::from_fields(store(), [(name, AttributeValue::from("x"))]).unwrap_err();
    assert!(matches!(err, KeychainError::UnknownField(field) if field == name));
}

#[test]
fn test_password_must_be_text_or_data() {
    let err = Item::new(store(), [(Field::Password, AttributeValue::Bool(true))]).unwrap_err();
    assert!(matches!(
        err,
        KeychainError::InvalidValue {
            field: "password",
            ..
        }
    ));
}

#[test]
fn test_create_sends_attributes_and_secret() {
    let store = store();
    let mut item = alice(&store);
    item.set_password("s3cret");
    item.save().unwrap();

    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].operation, StoreOperation::Add);
    let query = calls[0].query.as_ref().unwrap();
    assert_eq!(query.get(keys::ATTR_SERVICE), Some(&Value::from("example.com")));
    assert_eq!(query.get(keys::ATTR_ACCOUNT), Some(&Value::from("alice")));
    assert_eq!(query.get(keys::VALUE_DATA), Some(&Value::Data(b"s3cret".to_vec())));
    assert_eq!(query.get(keys::RETURN_ATTRIBUTES), Some(&Value::Bool(true)));
    assert_eq!(query.get(keys::RETURN_REF), Some(&Value::Bool(true)));

    assert!(item.is_persisted());
    assert!(!item.has_pending_password());
    assert!(item.get(Attribute::CreatedAt).and_then(AttributeValue::as_date).is_some());
    assert_eq!(item.get_str(Attribute::Account), Some("alice"));
}

#[test]
fn test_pending_secret_takes_precedence() {
    let store = store();
    let mut item = saved_alice(&store);
    item.set_password("changed");
    assert_eq!(item.password().unwrap().expose_secret(), b"changed");
    assert!(store.calls().is_empty());
}

#[test]
fn test_password_is_fetched_from_store_once_saved() {
    let store = store();
    let item = saved_alice(&store);

    assert_eq!(item.password().unwrap().expose_secret(), b"s3cret");
    let calls = store.calls();
    assert_eq!(calls.len(), 1);
    let query = calls[0].query.as_ref().unwrap();
    assert_eq!(query.get(keys::RETURN_DATA), Some(&Value::Bool(true)));
    assert_eq!(
        query.get(keys::MATCH_ITEM_LIST),
        Some(&Value::Array(vec![Value::Ref(item.raw().unwrap())]))
    );
}

#[test]
fn test_password_of_unsaved_item_without_secret() {
    let store = store();
    let err = alice(&store).password().unwrap_err();
    assert!(matches!(err, KeychainError::NotPersisted { operation: "password" }));
    assert!(store.calls().is_empty());
}

#[test]
fn test_update_excludes_class_and_dates() {
    let store = store();
    let mut item = saved_alice(&store);
    item.set(Attribute::Comment, "rotated");
    item.set(
        Attribute::CreatedAt,
        Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap(),
    );
    item.save().unwrap();

    let calls = store.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].operation, StoreOperation::Update);
    assert_eq!(calls[1].operation, StoreOperation::CopyMatching);

    let payload = calls[0].attributes.as_ref().unwrap();
    assert!(!payload.contains_key(keys::CLASS));
    assert!(!payload.contains_key(keys::ATTR_CREATION_DATE));
    assert!(!payload.contains_key(keys::ATTR_MODIFICATION_DATE));
    assert!(!payload.contains_key(keys::VALUE_DATA));
    assert_eq!(payload.get(keys::ATTR_COMMENT), Some(&Value::from("rotated")));

    let query = calls[0].query.as_ref().unwrap();
    assert_eq!(query.get(keys::CLASS), Some(&Value::from("genp")));

    // The snapshot wins over the local date.
    let created = item.get(Attribute::CreatedAt).and_then(AttributeValue::as_date).unwrap();
    assert!(created.timestamp() > Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap().timestamp());
    assert_eq!(item.get_str(Attribute::Comment), Some("rotated"));
}

#[test]
fn test_update_writes_pending_secret() {
    let store = store();
    let mut item = saved_alice(&store);
    item.set_password("changed");
    item.save().unwrap();

    let payload = store.calls()[0].attributes.clone().unwrap();
    assert_eq!(payload.get(keys::VALUE_DATA), Some(&Value::Data(b"changed".to_vec())));
    assert!(!item.has_pending_password());
    assert_eq!(item.password().unwrap().expose_secret(), b"changed");
}

#[test]
fn test_class_cannot_change_once_persisted() {
    let store = store();
    let mut item = saved_alice(&store);
    item.set(Attribute::Class, ItemClass::InternetPassword);
    assert_eq!(item.remove(Attribute::Class), None);
    assert_eq!(item.class(), Some(ItemClass::GenericPassword));
    item.save().unwrap();

    let calls = store.calls();
    let payload = calls[0].attributes.as_ref().unwrap();
    assert!(!payload.contains_key(keys::CLASS));
    let query = calls[0].query.as_ref().unwrap();
    assert_eq!(query.get(keys::CLASS), Some(&Value::from("genp")));
    assert_eq!(item.class(), Some(ItemClass::GenericPassword));

    // The item still resolves in later lookups.
    assert_eq!(item.password().unwrap().expose_secret(), b"s3cret");
    item.reload().unwrap();
    assert_eq!(item.class(), Some(ItemClass::GenericPassword));
}

#[test_case("internet_password" ; "semantic name")]
#[test_case("inet" ; "store tag")]
fn test_class_field_given_as_text(name: &str) {
    let item = Item::from_fields(
        store(),
        [
            ("class", AttributeValue::from(name)),
            ("server", AttributeValue::from("git.example.com")),
        ],
    )
    .unwrap();
    assert_eq!(item.class(), Some(ItemClass::InternetPassword));
}

#[test]
fn test_unknown_class_name_is_rejected() {
    let err = Item::from_fields(store(), [("class", AttributeValue::from("certificate"))])
        .unwrap_err();
    assert!(matches!(err, KeychainError::InvalidValue { field: "class", .. }));
}

#[test]
fn test_failed_create_leaves_item_untouched() {
    let store = store();
    let mut item = alice(&store);
    item.set_password("s3cret");
    let before = item.attributes().clone();

    store.fail_next(StoreOperation::Add, Status::AUTH_FAILED);
    let err = item.save().unwrap_err();
    assert_eq!(err.status(), Some(Status::AUTH_FAILED));
    assert!(!item.is_persisted());
    assert!(item.has_pending_password());
    assert_eq!(item.attributes(), &before);
    assert!(store.is_empty());
}

#[test_case(StoreOperation::Update ; "update")]
#[test_case(StoreOperation::CopyMatching ; "refresh")]
fn test_failed_update_leaves_item_untouched(operation: StoreOperation) {
    let store = store();
    let mut item = saved_alice(&store);
    let raw = item.raw();
    item.set(Attribute::Label, "work");
    item.set_password("changed");
    let before = item.attributes().clone();

    store.fail_next(operation, Status::INTERACTION_NOT_ALLOWED);
    let err = item.save().unwrap_err();
    assert_eq!(err.status(), Some(Status::INTERACTION_NOT_ALLOWED));
    assert_eq!(item.raw(), raw);
    assert!(item.has_pending_password());
    assert_eq!(item.attributes(), &before);
}

#[test]
fn test_duplicate_create_is_reported() {
    let store = store();
    saved_alice(&store);
    let mut twin = alice(&store);
    let err = twin.save().unwrap_err();
    assert!(err.is_duplicate_item());
    assert!(!twin.is_persisted());
}

#[test]
fn test_delete_unsaved_item_makes_no_call() {
    let store = store();
    let mut item = alice(&store);
    item.set_password("s3cret");
    let before = item.attributes().clone();

    let err = item.delete().unwrap_err();
    assert!(matches!(err, KeychainError::NotPersisted { operation: "delete" }));
    assert!(store.calls().is_empty());
    assert_eq!(item.attributes(), &before);
    assert!(!item.is_persisted());
    assert!(item.has_pending_password());
    assert_eq!(item.password().unwrap().expose_secret(), b"s3cret");
}

#[test]
fn test_delete_then_save_creates_again() {
    let store = store();
    let mut item = saved_alice(&store);
    let first = item.raw().unwrap();

    item.delete().unwrap();
    assert!(!item.is_persisted());
    assert!(store.is_empty());
    assert_eq!(store.retain_count(first), 0);
    assert_eq!(item.get_str(Attribute::Service), Some("example.com"));

    item.set_password("again");
    item.save().unwrap();
    assert!(item.is_persisted());
    assert_eq!(store.len(), 1);
    let calls = store.calls();
    assert_eq!(calls.last().unwrap().operation, StoreOperation::Add);
    // Read-only dates from the first snapshot are not sent back.
    let query = calls.last().unwrap().query.clone().unwrap();
    assert!(!query.contains_key(keys::ATTR_CREATION_DATE));
}

#[test]
fn test_failed_delete_keeps_item_bound() {
    let store = store();
    let mut item = saved_alice(&store);
    store.fail_next(StoreOperation::Delete, Status::AUTH_FAILED);
    assert!(item.delete().is_err());
    assert!(item.is_persisted());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_saved_item_owns_one_reference() {
    let store = store();
    let item = saved_alice(&store);
    let raw = item.raw().unwrap();
    assert_eq!(store.retain_count(raw), 1);

    item.password().unwrap();
    item.keychain().unwrap();
    assert_eq!(store.retain_count(raw), 1);

    drop(item);
    assert_eq!(store.retain_count(raw), 0);
    assert_eq!(store.live_objects(), 1);
    assert_eq!(store.invalid_releases(), 0);
}

#[test]
fn test_keychain_of_saved_item() {
    let store = store();
    let item = saved_alice(&store);
    let keychain = item.keychain().unwrap();
    assert_eq!(keychain.raw(), Some(store.default_keychain()));
    assert!(keychain.is_owned());
    assert_eq!(store.retain_count(store.default_keychain()), 2);
    drop(keychain);
    assert_eq!(store.retain_count(store.default_keychain()), 1);
}

#[test]
fn test_save_into_explicit_keychain() {
    let store = store();
    let target = Keychain::from_raw(store.clone(), store.create_keychain());
    let mut item = alice(&store);
    item.save_with(SaveOptions::default().keychain(&target)).unwrap();

    let query = store.calls()[0].query.clone().unwrap();
    assert_eq!(query.get(keys::USE_KEYCHAIN), Some(&Value::Ref(target.raw().unwrap())));
    assert_eq!(item.keychain().unwrap(), target);
}

#[test]
fn test_keychain_of_unsaved_item() {
    let err = alice(&store()).keychain().unwrap_err();
    assert!(matches!(err, KeychainError::NotPersisted { operation: "keychain" }));
}

#[test]
fn test_from_raw_then_reload() {
    let store = store();
    let saved = saved_alice(&store);
    let mut item = Item::from_raw(store.clone(), saved.raw().unwrap());
    assert!(item.is_persisted());
    assert!(item.attributes().is_empty());

    item.reload().unwrap();
    assert_eq!(item.get_str(Attribute::Account), Some("alice"));
    assert_eq!(item.class(), Some(ItemClass::GenericPassword));
    assert_eq!(store.retain_count(saved.raw().unwrap()), 1);
}

#[test]
fn test_from_dictionary_round_trips_attributes() {
    let store = store();
    let saved = saved_alice(&store);
    let query = Dictionary::new()
        .with(keys::CLASS, keys::CLASS_GENERIC_PASSWORD)
        .with(keys::ATTR_ACCOUNT, "alice")
        .with(keys::RETURN_ATTRIBUTES, true)
        .with(keys::RETURN_REF, true);
    let output = store.copy_matching(&query).unwrap();
    let snapshot = output.value.as_dictionary().unwrap().clone();

    let item = Item::from_dictionary(store.clone(), &snapshot);
    store.release(output.backing.unwrap());
    assert_eq!(item.raw(), saved.raw());
    assert_eq!(item.attributes(), saved.attributes());

    // The new-attributes payload rebuilt from the item matches the snapshot,
    // minus the class and the store-owned dates.
    let payload = QueryBuilder::new(item.attributes(), None, true).new_attributes();
    let expected: Dictionary = snapshot
        .iter()
        .filter(|(key, _)| {
            Attribute::from_store_key(key)
                .is_some_and(|attribute| attribute != Attribute::Class && !attribute.is_read_only())
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    assert_eq!(payload, expected);
    assert!(payload.contains_key(keys::ATTR_ACCOUNT));
    assert!(payload.contains_key(keys::ATTR_SERVICE));
    assert!(!payload.contains_key(keys::CLASS));
    drop(saved);
    drop(item);
    assert_eq!(store.invalid_releases(), 0);
}

#[test]
fn test_debug_never_shows_secret() {
    let store = store();
    let mut item = alice(&store);
    item.set_password("s3cret");
    let rendered = format!("{item:?}");
    assert!(rendered.contains("example.com"));
    assert!(rendered.contains("alice"));
    assert!(!rendered.contains("s3cret"));
}
