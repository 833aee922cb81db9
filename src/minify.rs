//! Reduced keys for disclosure outside the trust boundary.
//!
//! A person with several addresses on one key should not reveal all of
//! them to each correspondent. [`minify_key`] derives a new key exposing
//! only the identities for one email. The input key is never modified.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::certify::{EngineVerdict, SignatureVerifier};
use crate::error::{Error, Result};
use crate::internal::email_matches;
use crate::raw::{RawKey, RawSubkey, RawUser, SignatureKind};
use crate::userid::email_of;

/// Copy of `key` keeping only the user IDs whose parsed email matches
/// `email` (case-insensitive). Attribute entries are dropped.
pub fn filter_user_ids_by_email(key: &RawKey, email: &str) -> RawKey {
    RawKey {
        primary: key.primary.clone(),
        direct_signatures: key.direct_signatures.clone(),
        users: key
            .users
            .iter()
            .filter(|user| user_matches(user, email))
            .cloned()
            .collect(),
        subkeys: key.subkeys.clone(),
    }
}

/// Derive a public key exposing only the identities for `email`.
///
/// Keeps the primary key packet, its direct signatures, the matching user
/// IDs with their certifications and the subkeys the primary key bound on
/// or after the earliest certification retained. Secret material is always removed.
///
/// # Errors
/// Returns `Error::UidNotFound` if no user ID carries `email`.
pub fn minify_key(key: &RawKey, email: &str) -> Result<RawKey> {
    let mut minified = to_public(&filter_user_ids_by_email(key, email));
    if minified.users.is_empty() {
        return Err(Error::UidNotFound(email.to_string()));
    }

    if let Some(since) = earliest_certification(&minified.users) {
        minified.subkeys = minified
            .subkeys
            .iter()
            .filter(|subkey| bound_since(&minified, subkey, since))
            .cloned()
            .collect();
    }

    debug!(
        key_id = %key.key_id(),
        users = minified.users.len(),
        subkeys = minified.subkeys.len(),
        "minified key"
    );
    Ok(minified)
}

/// Copy of `key` with every secret-material field removed.
///
/// Idempotent; a public key comes back unchanged.
pub fn to_public(key: &RawKey) -> RawKey {
    RawKey {
        primary: key.primary.to_public(),
        direct_signatures: key.direct_signatures.clone(),
        users: key.users.clone(),
        subkeys: key
            .subkeys
            .iter()
            .map(|subkey| RawSubkey {
                key: subkey.key.to_public(),
                signatures: subkey.signatures.clone(),
            })
            .collect(),
    }
}

fn user_matches(user: &RawUser, email: &str) -> bool {
    user.user_id()
        .and_then(email_of)
        .is_some_and(|addr| email_matches(&addr, email))
}

fn earliest_certification(users: &[RawUser]) -> Option<DateTime<Utc>> {
    users
        .iter()
        .flat_map(|user| user.certifications.iter())
        .filter(|sig| sig.kind.is_certification())
        .map(|sig| sig.created)
        .min()
}

/// True if the primary key bound `subkey` with a verified binding issued
/// at or after `since`.
fn bound_since(key: &RawKey, subkey: &RawSubkey, since: DateTime<Utc>) -> bool {
    let primary_id = key.key_id();
    subkey.signatures.iter().any(|sig| {
        sig.kind == SignatureKind::SubkeyBinding
            && sig.issuer == primary_id
            && sig.created >= since
            && EngineVerdict.verify_binding(key, subkey, sig)
    })
}
