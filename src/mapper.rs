//! Key mapping.
//!
//! This module flattens a [`RawKey`] into the [`KeyRecord`] consumed by
//! key listings, key details and recipient selection. Records are pure
//! projections: they are rebuilt from the raw key and a keyring view on
//! every call and never written back.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::certify::{evaluate_subkey, evaluate_user, EngineVerdict, SignatureVerifier, UserEvaluation};
use crate::error::{Error, Result};
use crate::keyring::KeyringView;
use crate::raw::{KeyId, KeyPacket, RawCertification, RawKey, RawUser, SignatureKind};
use crate::types::{
    Expiration, KeyRecord, KeyType, SignatureRecord, SubkeyRecord, UserInfo, UserRecord,
};
use crate::userid::parse_user_id;

/// Display strings substituted for missing or unusable data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    /// Shown in place of a user ID that cannot be parsed or selected
    pub invalid_user_id: String,
    /// Shown for a certification whose issuer is not in any known key
    pub unknown_signer: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            invalid_user_id: "Invalid user ID".to_string(),
            unknown_signer: "Unknown Signer".to_string(),
        }
    }
}

/// Options for mapping keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapOptions {
    /// Fall back to the first user ID when no user ID is valid
    pub allow_invalid: bool,
    /// Evaluation instant; the current time if `None`
    pub now: Option<DateTime<Utc>>,
    pub labels: Labels,
}

/// Maps raw keys to records against one keyring view.
///
/// # Example
/// ```ignore
/// let record = KeyMapper::new(&keyring)
///     .allow_invalid(true)
///     .map_key(&key, KeyType::Public);
/// println!("{} <{}>", record.name, record.email);
/// ```
pub struct KeyMapper<'k, K: KeyringView + ?Sized> {
    keyring: &'k K,
    verifier: &'k dyn SignatureVerifier,
    options: MapOptions,
}

impl<'k, K: KeyringView + ?Sized> KeyMapper<'k, K> {
    /// A mapper using the engine's recorded verdicts and default options.
    pub fn new(keyring: &'k K) -> Self {
        Self {
            keyring,
            verifier: &EngineVerdict,
            options: MapOptions::default(),
        }
    }

    pub fn verifier(mut self, verifier: &'k dyn SignatureVerifier) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn options(mut self, options: MapOptions) -> Self {
        self.options = options;
        self
    }

    pub fn allow_invalid(mut self, allow_invalid: bool) -> Self {
        self.options.allow_invalid = allow_invalid;
        self
    }

    /// Evaluate validity and expiry at `now` instead of the current time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.options.now = Some(now);
        self
    }

    pub fn labels(mut self, labels: Labels) -> Self {
        self.options.labels = labels;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.options.now.unwrap_or_else(Utc::now)
    }

    /// Map one key to its record.
    ///
    /// A key without a usable user ID is still mapped. Its `validity` is
    /// false and, unless `allow_invalid` is set, its `userId` carries the
    /// invalid-user-ID label with empty name and email. Its `exDate` comes
    /// from the most recently self-certified user ID, so an expired key
    /// still reports when it expired.
    pub fn map_key(&self, key: &RawKey, key_type: KeyType) -> KeyRecord {
        let now = self.now();
        let primary = primary_user(key, self.verifier, now, self.options.allow_invalid);

        let (user_id, name, email, validity) = match &primary {
            Some((user_id, eval)) => {
                let (name, email) = self.split_user_id(user_id);
                (user_id.to_string(), name, email, eval.is_valid())
            }
            None => {
                debug!(key_id = %key.key_id(), "no valid user ID");
                (
                    self.options.labels.invalid_user_id.clone(),
                    String::new(),
                    String::new(),
                    false,
                )
            }
        };

        let ex_date = match &primary {
            Some((_, eval)) if eval.is_valid() => eval.expiration,
            _ => latest_self_certified_expiration(key, self.verifier, now),
        };

        KeyRecord {
            key_type,
            fingerprint: key.fingerprint().to_hex(),
            key_id: key.key_id().to_hex(),
            name,
            email,
            user_id,
            validity,
            cr_date: key.primary.created,
            ex_date,
            algorithm: algorithm_label(&key.primary),
            bit_length: key.primary.bit_length,
            subkeys: self.map_subkeys(key, now),
            users: self.map_users(key, now),
        }
    }

    /// Map several keys, each typed by whether it carries secret material.
    pub fn map_keys(&self, keys: &[RawKey]) -> Vec<KeyRecord> {
        keys.iter()
            .map(|key| self.map_key(key, key_type_of(key)))
            .collect()
    }

    /// Name, email and user ID of the key's primary user.
    ///
    /// # Errors
    /// Returns `Error::NoValidUser` if no user ID qualifies.
    pub fn user_info(&self, key: &RawKey) -> Result<UserInfo> {
        let (user_id, _) = primary_user(key, self.verifier, self.now(), self.options.allow_invalid)
            .ok_or_else(|| Error::NoValidUser(key.fingerprint().to_hex()))?;
        let (name, email) = self.split_user_id(user_id);
        Ok(UserInfo {
            user_id: user_id.to_string(),
            name,
            email,
        })
    }

    fn split_user_id(&self, user_id: &str) -> (String, String) {
        match parse_user_id(user_id) {
            Ok(identity) => (identity.name, identity.email),
            Err(_) => (self.options.labels.invalid_user_id.clone(), String::new()),
        }
    }

    fn map_subkeys(&self, key: &RawKey, now: DateTime<Utc>) -> Vec<SubkeyRecord> {
        key.subkeys
            .iter()
            .map(|subkey| {
                let eval = evaluate_subkey(key, subkey, self.verifier, now);
                SubkeyRecord {
                    key_id: subkey.key.key_id.to_hex(),
                    fingerprint: subkey.key.fingerprint.to_hex(),
                    cr_date: subkey.key.created,
                    ex_date: eval.expiration,
                    algorithm: algorithm_label(&subkey.key),
                    bit_length: subkey.key.bit_length,
                    revoked: eval.revoked,
                }
            })
            .collect()
    }

    fn map_users(&self, key: &RawKey, now: DateTime<Utc>) -> Vec<UserRecord> {
        key.users
            .iter()
            .filter_map(|user| {
                let user_id = user.user_id()?;
                let (name, email) = self.split_user_id(user_id);
                Some(UserRecord {
                    user_id: user_id.to_string(),
                    name,
                    email,
                    status: evaluate_user(key, user, self.verifier, now).status,
                    signatures: self.map_signatures(key, user, now),
                })
            })
            .collect()
    }

    fn map_signatures(&self, key: &RawKey, user: &RawUser, now: DateTime<Utc>) -> Vec<SignatureRecord> {
        user.certifications
            .iter()
            .filter(|sig| sig.kind.is_certification())
            .map(|sig| SignatureRecord {
                signer_key_id: sig.issuer.to_hex(),
                signer_name: self.signer_name(key, &sig.issuer, now),
                cr_date: sig.created,
                revoked: is_certification_revoked(user, sig),
            })
            .collect()
    }

    /// Resolve an issuer to a user ID: the key itself, then private keys in
    /// the keyring, then any key in the keyring.
    fn signer_name(&self, key: &RawKey, issuer: &KeyId, now: DateTime<Utc>) -> String {
        let verifier = self.verifier;
        let own = || {
            key.has_key_id(issuer)
                .then(|| signer_user_id(key, verifier, now))
                .flatten()
        };
        let from_keyring = |private_only: bool| {
            self.keyring
                .lookup(issuer)
                .into_iter()
                .filter(|candidate| !private_only || candidate.is_private())
                .find_map(|candidate| signer_user_id(candidate, verifier, now))
        };

        own()
            .or_else(|| from_keyring(true))
            .or_else(|| from_keyring(false))
            .map(str::to_string)
            .unwrap_or_else(|| self.options.labels.unknown_signer.clone())
    }
}

/// Map one key with default options at the current time.
pub fn map_key<K: KeyringView + ?Sized>(key: &RawKey, key_type: KeyType, keyring: &K) -> KeyRecord {
    KeyMapper::new(keyring).map_key(key, key_type)
}

/// Map several keys with default options at the current time.
pub fn map_keys<K: KeyringView + ?Sized>(keys: &[RawKey], keyring: &K) -> Vec<KeyRecord> {
    KeyMapper::new(keyring).map_keys(keys)
}

/// Name, email and user ID of the key's primary user at the current time.
///
/// # Arguments
/// * `key` - The key to inspect
/// * `allow_invalid` - Fall back to the first user ID if none is valid
///
/// # Returns
/// The primary user's details, or `Error::NoValidUser`.
pub fn get_user_info(key: &RawKey, allow_invalid: bool) -> Result<UserInfo> {
    KeyMapper::new(&Vec::<RawKey>::new())
        .allow_invalid(allow_invalid)
        .user_info(key)
}

/// `Private` if the key carries any secret material.
pub fn key_type_of(key: &RawKey) -> KeyType {
    if key.is_private() {
        KeyType::Private
    } else {
        KeyType::Public
    }
}

/// Algorithm display name, with the curve appended when known.
pub fn algorithm_label(packet: &KeyPacket) -> String {
    match &packet.curve {
        Some(curve) => format!("{} - {}", packet.algorithm.name(), curve),
        None => packet.algorithm.name().to_string(),
    }
}

/// The first valid user ID, or the first user ID at all when
/// `allow_invalid` is set.
fn primary_user<'a>(
    key: &'a RawKey,
    verifier: &dyn SignatureVerifier,
    now: DateTime<Utc>,
    allow_invalid: bool,
) -> Option<(&'a str, UserEvaluation<'a>)> {
    let mut evaluated = key.users.iter().filter_map(|user| {
        let user_id = user.user_id()?;
        Some((user_id, evaluate_user(key, user, verifier, now)))
    });

    if allow_invalid {
        let mut first = None;
        for (user_id, eval) in evaluated {
            if eval.is_valid() {
                return Some((user_id, eval));
            }
            first.get_or_insert((user_id, eval));
        }
        first
    } else {
        evaluated.find(|(_, eval)| eval.is_valid())
    }
}

/// Expiration from the latest self-certification on any user ID, or
/// `Never` if no user ID is self-certified.
fn latest_self_certified_expiration(
    key: &RawKey,
    verifier: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> Expiration {
    key.users
        .iter()
        .filter(|user| !user.is_attribute())
        .map(|user| evaluate_user(key, user, verifier, now))
        .filter_map(|eval| {
            eval.self_certification
                .map(|cert| (cert.created, eval.expiration))
        })
        .max_by_key(|(created, _)| *created)
        .map_or(Expiration::Never, |(_, expiration)| expiration)
}

fn signer_user_id<'a>(
    key: &'a RawKey,
    verifier: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> Option<&'a str> {
    primary_user(key, verifier, now, true).map(|(user_id, _)| user_id)
}

/// True if the issuer of `sig` revoked its certification of `user` at or
/// after the certification's creation.
fn is_certification_revoked(user: &RawUser, sig: &RawCertification) -> bool {
    user.certifications.iter().any(|rev| {
        rev.kind == SignatureKind::CertRevocation
            && rev.issuer == sig.issuer
            && rev.created >= sig.created
    })
}
