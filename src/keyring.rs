//! Keyring lookups and the import pipeline.
//!
//! The rest of the crate only ever reads a keyring, through the
//! [`KeyringView`] capability passed explicitly to each operation.
//! [`MemoryKeyring`] is an in-process keyring implementing that view plus
//! the admit, resolve and apply steps of an import. [`SharedKeyring`] makes
//! that sequence atomic for concurrent importers.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::certify::{evaluate_user, EngineVerdict, SignatureVerifier};
use crate::collision::check_admission;
use crate::error::{Error, Result};
use crate::internal::email_matches;
use crate::minify::minify_key;
use crate::raw::{Fingerprint, KeyId, RawKey};
use crate::userid::email_of;
use crate::version::{last_modified, resolve_version, VersionResolution};

/// Read-only access to the keys of a keyring.
pub trait KeyringView {
    /// Keys owning `key_id` as their primary key ID or as a subkey ID.
    fn lookup(&self, key_id: &KeyId) -> Vec<&RawKey>;

    /// Every key in the keyring.
    fn keys(&self) -> Vec<&RawKey>;
}

impl KeyringView for [RawKey] {
    fn lookup(&self, key_id: &KeyId) -> Vec<&RawKey> {
        self.iter().filter(|k| k.has_key_id(key_id)).collect()
    }

    fn keys(&self) -> Vec<&RawKey> {
        self.iter().collect()
    }
}

impl KeyringView for Vec<RawKey> {
    fn lookup(&self, key_id: &KeyId) -> Vec<&RawKey> {
        self.as_slice().lookup(key_id)
    }

    fn keys(&self) -> Vec<&RawKey> {
        self.as_slice().keys()
    }
}

/// What an import did to the keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The key was new and has been added
    Inserted,
    /// A held copy was replaced by the newer candidate
    Updated,
    /// The held copy was as new or newer; nothing changed
    Unchanged,
}

/// An in-memory keyring indexed by fingerprint and key ID.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyring {
    keys: BTreeMap<Fingerprint, RawKey>,
    by_key_id: HashMap<KeyId, Vec<Fingerprint>>,
}

impl MemoryKeyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a keyring from keys without admission checks.
    pub fn from_keys(keys: impl IntoIterator<Item = RawKey>) -> Self {
        let mut keyring = Self::new();
        for key in keys {
            keyring.insert(key);
        }
        keyring
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&RawKey> {
        self.keys.get(fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.keys.contains_key(fingerprint)
    }

    /// Store `key`, replacing any key with the same fingerprint, without
    /// admission checks. Returns the replaced key.
    pub fn insert(&mut self, key: RawKey) -> Option<RawKey> {
        let fingerprint = key.fingerprint().clone();
        let previous = self.remove(&fingerprint);
        for key_id in std::iter::once(key.key_id()).chain(key.subkey_ids()) {
            self.by_key_id
                .entry(key_id)
                .or_default()
                .push(fingerprint.clone());
        }
        self.keys.insert(fingerprint, key);
        previous
    }

    /// Remove a key by fingerprint.
    pub fn remove(&mut self, fingerprint: &Fingerprint) -> Option<RawKey> {
        let key = self.keys.remove(fingerprint)?;
        for key_id in std::iter::once(key.key_id()).chain(key.subkey_ids()) {
            if let Some(owners) = self.by_key_id.get_mut(&key_id) {
                owners.retain(|fpr| fpr != fingerprint);
                if owners.is_empty() {
                    self.by_key_id.remove(&key_id);
                }
            }
        }
        Some(key)
    }

    /// Admit `candidate`, then insert it or replace the held copy if the
    /// candidate is newer.
    ///
    /// A private key is never downgraded by a newer public copy: secret
    /// material of matching packets is carried over to the candidate.
    ///
    /// # Errors
    /// Returns `Error::KeyIdCollision` if the candidate is refused; the
    /// keyring is left untouched.
    pub fn import_key(&mut self, candidate: RawKey) -> Result<ImportOutcome> {
        self.import_key_with(candidate, &EngineVerdict)
    }

    /// Like [`MemoryKeyring::import_key`], with signature verdicts for the
    /// version comparison taken from `verifier`.
    pub fn import_key_with(
        &mut self,
        candidate: RawKey,
        verifier: &dyn SignatureVerifier,
    ) -> Result<ImportOutcome> {
        check_admission(&candidate, &*self)?;

        let existing = self.keys.get(candidate.fingerprint());
        let outcome = match resolve_version(&candidate, existing, verifier) {
            VersionResolution::Insert => {
                self.insert(candidate);
                ImportOutcome::Inserted
            }
            VersionResolution::ReplaceWithCandidate => {
                let candidate = match existing {
                    Some(existing) => carry_secret_material(existing, candidate),
                    None => candidate,
                };
                self.insert(candidate);
                ImportOutcome::Updated
            }
            VersionResolution::KeepExisting => ImportOutcome::Unchanged,
        };
        Ok(outcome)
    }

    /// Import several keys, one result per key, in order.
    pub fn import_keys(
        &mut self,
        candidates: impl IntoIterator<Item = RawKey>,
    ) -> Vec<Result<ImportOutcome>> {
        candidates
            .into_iter()
            .map(|candidate| self.import_key(candidate))
            .collect()
    }

    /// Minified, secret-free copy of a held key, ready to leave the
    /// keyring.
    ///
    /// # Errors
    /// Returns `Error::KeyNotFound` if no key has `fingerprint`, or
    /// `Error::UidNotFound` if the key has no user ID for `email`.
    pub fn export_minified(&self, fingerprint: &Fingerprint, email: &str) -> Result<RawKey> {
        let key = self
            .get(fingerprint)
            .ok_or_else(|| Error::KeyNotFound(fingerprint.to_hex()))?;
        minify_key(key, email)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawKey> {
        self.keys.values()
    }
}

impl KeyringView for MemoryKeyring {
    fn lookup(&self, key_id: &KeyId) -> Vec<&RawKey> {
        self.by_key_id
            .get(key_id)
            .map(|owners| owners.iter().filter_map(|fpr| self.keys.get(fpr)).collect())
            .unwrap_or_default()
    }

    fn keys(&self) -> Vec<&RawKey> {
        self.keys.values().collect()
    }
}

/// Copy secret material from `existing` onto packets of `candidate` with
/// the same fingerprint that lack it.
fn carry_secret_material(existing: &RawKey, mut candidate: RawKey) -> RawKey {
    if !existing.is_private() {
        return candidate;
    }

    if candidate.primary.secret.is_none() {
        candidate.primary.secret = existing.primary.secret.clone();
    }
    for subkey in candidate.subkeys.iter_mut() {
        if subkey.key.secret.is_some() {
            continue;
        }
        subkey.key.secret = existing
            .subkeys
            .iter()
            .find(|s| s.key.fingerprint == subkey.key.fingerprint)
            .and_then(|s| s.key.secret.clone());
    }
    debug!(fingerprint = %candidate.fingerprint(), "kept secret material of held key");
    candidate
}

/// A keyring shared between threads.
///
/// Imports take the write lock for the whole admit, resolve and apply
/// sequence, so two concurrent imports never both pass admission against a
/// stale view.
#[derive(Debug, Default)]
pub struct SharedKeyring {
    inner: RwLock<MemoryKeyring>,
}

impl SharedKeyring {
    pub fn new(keyring: MemoryKeyring) -> Self {
        Self {
            inner: RwLock::new(keyring),
        }
    }

    pub fn import_key(&self, candidate: RawKey) -> Result<ImportOutcome> {
        let fingerprint = candidate.fingerprint().clone();
        let outcome = self.inner.write().import_key(candidate)?;
        info!(%fingerprint, ?outcome, "key imported");
        Ok(outcome)
    }

    /// A read guard usable wherever a [`KeyringView`] is expected.
    pub fn read(&self) -> RwLockReadGuard<'_, MemoryKeyring> {
        self.inner.read()
    }

    pub fn remove(&self, fingerprint: &Fingerprint) -> Option<RawKey> {
        self.inner.write().remove(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

/// Keys usable as encryption recipients for `email`.
///
/// A key qualifies when one of its user IDs carries `email` (compared
/// case-insensitively) and evaluates as valid at `now`. Results are ordered
/// newest first by last-modified date.
pub fn keys_for_email<'k, K>(
    keyring: &'k K,
    email: &str,
    verifier: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> Vec<&'k RawKey>
where
    K: KeyringView + ?Sized,
{
    let mut found: Vec<&RawKey> = keyring
        .keys()
        .into_iter()
        .filter(|key| {
            key.users.iter().any(|user| {
                user.user_id()
                    .and_then(email_of)
                    .is_some_and(|addr| email_matches(&addr, email))
                    && evaluate_user(key, user, verifier, now).is_valid()
            })
        })
        .collect();
    found.sort_by_key(|key| std::cmp::Reverse(last_modified(key, verifier)));
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollisionReason;
    use crate::raw::{
        KeyPacket, PublicKeyAlgorithm, RawCertification, RawSubkey, RawUser, SecretMaterial,
        SignatureKind, UserPacket,
    };
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn packet(id: u8) -> KeyPacket {
        KeyPacket {
            key_id: KeyId::new([id; 8]),
            fingerprint: Fingerprint::new(vec![id; 20]),
            created: at(100),
            algorithm: PublicKeyAlgorithm::EdDsa,
            bit_length: 256,
            curve: None,
            secret: None,
        }
    }

    fn cert(kind: SignatureKind, issuer: u8, created: i64) -> RawCertification {
        RawCertification {
            kind,
            issuer: KeyId::new([issuer; 8]),
            created: at(created),
            key_expiration: None,
            verified: true,
        }
    }

    fn key(id: u8, uid: &str, certified_at: i64, subkeys: &[u8]) -> RawKey {
        RawKey {
            primary: packet(id),
            direct_signatures: vec![],
            users: vec![RawUser {
                packet: UserPacket::UserId(uid.to_string()),
                certifications: vec![cert(SignatureKind::CertPositive, id, certified_at)],
            }],
            subkeys: subkeys
                .iter()
                .map(|sub| RawSubkey {
                    key: packet(*sub),
                    signatures: vec![cert(SignatureKind::SubkeyBinding, id, certified_at)],
                })
                .collect(),
        }
    }

    #[test]
    fn test_lookup_by_primary_and_subkey_id() {
        let keyring = MemoryKeyring::from_keys(vec![key(1, "A <a@example.com>", 200, &[2, 3])]);
        assert_eq!(keyring.lookup(&KeyId::new([1; 8])).len(), 1);
        assert_eq!(keyring.lookup(&KeyId::new([3; 8])).len(), 1);
        assert!(keyring.lookup(&KeyId::new([4; 8])).is_empty());
    }

    #[test]
    fn test_remove_clears_index() {
        let mut keyring = MemoryKeyring::from_keys(vec![key(1, "A <a@example.com>", 200, &[2])]);
        assert!(keyring.remove(&Fingerprint::new(vec![1; 20])).is_some());
        assert!(keyring.is_empty());
        assert!(keyring.lookup(&KeyId::new([2; 8])).is_empty());
    }

    #[test]
    fn test_import_insert_update_unchanged() {
        let mut keyring = MemoryKeyring::new();
        let old = key(1, "A <a@example.com>", 200, &[2]);
        let new = key(1, "A <a@example.com>", 300, &[2, 4]);

        assert_eq!(keyring.import_key(old.clone()).unwrap(), ImportOutcome::Inserted);
        assert_eq!(keyring.import_key(new.clone()).unwrap(), ImportOutcome::Updated);
        assert_eq!(keyring.import_key(old).unwrap(), ImportOutcome::Unchanged);

        let held = keyring.get(&Fingerprint::new(vec![1; 20])).unwrap();
        assert_eq!(held, &new);
        assert_eq!(keyring.lookup(&KeyId::new([4; 8])).len(), 1);
    }

    #[test]
    fn test_unverified_copy_does_not_replace_held_key() {
        let mut keyring = MemoryKeyring::new();
        let held = key(1, "A <a@example.com>", 200, &[2]);
        keyring.import_key(held.clone()).unwrap();

        let mut forged = cert(SignatureKind::DirectKey, 1, 1_000_000);
        forged.verified = false;
        let stripped = RawKey {
            primary: packet(1),
            direct_signatures: vec![forged],
            users: vec![],
            subkeys: vec![],
        };
        assert_eq!(keyring.import_key(stripped).unwrap(), ImportOutcome::Unchanged);
        assert_eq!(keyring.get(&Fingerprint::new(vec![1; 20])), Some(&held));
    }

    #[test]
    fn test_import_refuses_collision_and_leaves_keyring_untouched() {
        let mut keyring = MemoryKeyring::new();
        keyring.import_key(key(1, "A <a@example.com>", 200, &[2])).unwrap();

        let err = keyring
            .import_key(key(9, "M <m@example.com>", 500, &[2]))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::KeyIdCollision(CollisionReason::SubkeyEqualsForeignSubkey)
        ));
        assert_eq!(keyring.len(), 1);
    }

    #[test]
    fn test_public_update_keeps_secret_material() {
        let mut private = key(1, "A <a@example.com>", 200, &[2]);
        private.primary.secret = Some(SecretMaterial::new(vec![1, 2, 3]));
        private.subkeys[0].key.secret = Some(SecretMaterial::new(vec![4, 5, 6]));

        let mut keyring = MemoryKeyring::new();
        keyring.import_key(private).unwrap();

        let public_update = key(1, "A <a@example.com>", 300, &[2, 7]);
        assert_eq!(keyring.import_key(public_update).unwrap(), ImportOutcome::Updated);

        let held = keyring.get(&Fingerprint::new(vec![1; 20])).unwrap();
        assert!(held.is_private());
        assert_eq!(held.primary.secret.as_ref().unwrap().as_bytes(), &[1, 2, 3]);
        assert_eq!(held.subkeys[0].key.secret.as_ref().unwrap().as_bytes(), &[4, 5, 6]);
        assert!(held.subkeys[1].key.secret.is_none());
    }

    #[test]
    fn test_shared_keyring_imports() {
        let shared = SharedKeyring::new(MemoryKeyring::new());
        assert_eq!(
            shared.import_key(key(1, "A <a@example.com>", 200, &[])).unwrap(),
            ImportOutcome::Inserted
        );
        assert_eq!(shared.len(), 1);
        assert_eq!(shared.read().lookup(&KeyId::new([1; 8])).len(), 1);
    }

    #[test]
    fn test_shared_keyring_concurrent_imports_admit_one() {
        use std::sync::Arc;

        let shared = Arc::new(SharedKeyring::default());
        let handles: Vec<_> = (0..8u8)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    // Distinct primaries all claiming subkey 0xEE
                    shared.import_key(key(10 + i, "X <x@example.com>", 200, &[0xEE]))
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|r| r.is_ok())
            .count();
        assert_eq!(admitted, 1);
        assert_eq!(shared.len(), 1);
    }

    #[test]
    fn test_keys_for_email() {
        let mut revoked = key(3, "Ada <ada@example.com>", 200, &[]);
        revoked.users[0]
            .certifications
            .push(cert(SignatureKind::CertRevocation, 3, 250));

        let keyring = MemoryKeyring::from_keys(vec![
            key(1, "Ada <ada@example.com>", 200, &[]),
            key(2, "Ada Lovelace <ADA@example.com>", 400, &[]),
            revoked,
            key(4, "Bob <bob@example.com>", 200, &[]),
        ]);

        let found = keys_for_email(&keyring, "ada@example.com", &EngineVerdict, at(1_000));
        let ids: Vec<_> = found.iter().map(|k| k.key_id()).collect();
        assert_eq!(ids, vec![KeyId::new([2; 8]), KeyId::new([1; 8])]);
    }

    #[test]
    fn test_export_minified() {
        let mut private = key(1, "A <a@example.com>", 200, &[2]);
        private.primary.secret = Some(SecretMaterial::new(vec![1, 2, 3]));
        let keyring = MemoryKeyring::from_keys(vec![private]);

        let exported = keyring
            .export_minified(&Fingerprint::new(vec![1; 20]), "a@example.com")
            .unwrap();
        assert!(!exported.is_private());
        assert!(keyring.get(&Fingerprint::new(vec![1; 20])).unwrap().is_private());

        assert!(matches!(
            keyring.export_minified(&Fingerprint::new(vec![9; 20]), "a@example.com"),
            Err(Error::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_slice_keyring_view() {
        let keys = vec![key(1, "A <a@example.com>", 200, &[2])];
        assert_eq!(keys.lookup(&KeyId::new([2; 8])).len(), 1);
        assert_eq!(keys.as_slice().keys().len(), 1);
    }
}
