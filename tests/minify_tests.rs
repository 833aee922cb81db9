//! Minimization and secret stripping.

mod common;

use common::{fingerprint, key_id, KeyBuilder, CREATED};
use keytrust::{
    filter_user_ids_by_email, minify_key, to_public, Error, MemoryKeyring, RawKey,
};

/// Three user IDs across two addresses plus a photo.
fn multi_identity_key() -> RawKey {
    KeyBuilder::new(1)
        .self_certified("Ada Lovelace <ada@example.com>", CREATED + 300)
        .self_certified("Ada <ada@analytical.example>", CREATED + 100)
        .self_certified("A. Lovelace <ada@example.com>", CREATED + 500)
        .photo(CREATED + 100)
        .subkey(2, CREATED + 100)
        .subkey(3, CREATED + 300)
        .subkey(4, CREATED + 600)
        .secret()
        .build()
}

#[test]
fn test_minify_keeps_exactly_matching_user_ids() {
    let key = multi_identity_key();
    let minified = minify_key(&key, "ada@example.com").unwrap();

    let user_ids: Vec<_> = minified.users.iter().filter_map(|u| u.user_id()).collect();
    assert_eq!(
        user_ids,
        vec!["Ada Lovelace <ada@example.com>", "A. Lovelace <ada@example.com>"]
    );
    assert_eq!(minified.users.iter().filter(|u| u.is_attribute()).count(), 0);
}

#[test]
fn test_minify_keeps_subkeys_bound_since_earliest_retained_certification() {
    let minified = minify_key(&multi_identity_key(), "ada@example.com").unwrap();
    let subkeys: Vec<_> = minified.subkeys.iter().map(|s| s.key.key_id).collect();
    assert_eq!(subkeys, vec![key_id(3), key_id(4)]);

    let other = minify_key(&multi_identity_key(), "ada@analytical.example").unwrap();
    assert_eq!(other.users.len(), 1);
    assert_eq!(other.subkeys.len(), 3);
}

#[test]
fn test_minify_never_touches_the_original() {
    let key = multi_identity_key();
    let minified = minify_key(&key, "ada@example.com").unwrap();

    assert_eq!(key, multi_identity_key());
    assert!(key.is_private());
    assert!(!minified.is_private());
    assert_eq!(minified.primary.fingerprint, key.primary.fingerprint);
}

#[test]
fn test_minify_unknown_address() {
    assert!(matches!(
        minify_key(&multi_identity_key(), "grace@example.com"),
        Err(Error::UidNotFound(_))
    ));
}

#[test]
fn test_filter_keeps_subkeys_and_secrets() {
    let key = multi_identity_key();
    let filtered = filter_user_ids_by_email(&key, "ADA@EXAMPLE.COM");
    assert_eq!(filtered.users.len(), 2);
    assert_eq!(filtered.subkeys.len(), 3);
    assert!(filtered.is_private());
}

#[test]
fn test_to_public_strips_every_secret() {
    let key = multi_identity_key();
    let public = to_public(&key);

    assert!(public.primary.secret.is_none());
    assert!(public.subkeys.iter().all(|s| s.key.secret.is_none()));
    assert_eq!(to_public(&public), public);
    assert_eq!(public.users, key.users);
}

#[test]
fn test_export_minified_from_keyring() {
    let keyring = MemoryKeyring::from_keys(vec![multi_identity_key()]);
    let exported = keyring
        .export_minified(&fingerprint(1), "ada@analytical.example")
        .unwrap();
    assert_eq!(exported.users.len(), 1);
    assert!(!exported.is_private());
}
