//! Deciding which of two copies of the same key is newer.
//!
//! Two keys are the same key iff their primary fingerprints match. When an
//! import produces a copy of a key already held, the copy with the later
//! last-modified date replaces the other wholesale; partial merges are not
//! performed.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::certify::SignatureVerifier;
use crate::internal::timestamp_zero;
use crate::raw::RawKey;

/// What to do with a candidate key given the key already held, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionResolution {
    /// No copy of this key is held yet
    Insert,
    /// The candidate is newer and replaces the held copy
    ReplaceWithCandidate,
    /// The held copy is as new or newer
    KeepExisting,
}

/// Latest creation time among the key's own verified signatures:
/// self-certifications and their revocations, subkey binding and
/// revocation signatures, direct-key signatures and key revocations.
///
/// A signature counts only if the key's primary key issued it and
/// `verifier` accepts it. Returns the Unix epoch for a key without any
/// such signature.
pub fn last_modified(key: &RawKey, verifier: &dyn SignatureVerifier) -> DateTime<Utc> {
    let primary_id = key.key_id();

    let direct = key
        .direct_signatures
        .iter()
        .filter(|sig| sig.issuer == primary_id && verifier.verify_direct(key, sig))
        .map(|sig| sig.created);
    let users = key.users.iter().flat_map(|user| {
        user.certifications
            .iter()
            .filter(move |sig| {
                sig.issuer == primary_id && verifier.verify_certification(key, user, sig)
            })
            .map(|sig| sig.created)
    });
    let subkeys = key.subkeys.iter().flat_map(|subkey| {
        subkey
            .signatures
            .iter()
            .filter(move |sig| sig.issuer == primary_id && verifier.verify_binding(key, subkey, sig))
            .map(|sig| sig.created)
    });

    direct
        .chain(users)
        .chain(subkeys)
        .max()
        .unwrap_or_else(timestamp_zero)
}

/// True iff both keys have the same primary fingerprint.
pub fn equal_key(a: &RawKey, b: &RawKey) -> bool {
    a.fingerprint() == b.fingerprint()
}

/// Decide between a candidate and the copy of it already held.
///
/// The candidate replaces the held copy only if its [`last_modified`] is
/// strictly later, so a copy carrying forged or foreign signatures never
/// displaces the held key.
pub fn resolve_version(
    candidate: &RawKey,
    existing: Option<&RawKey>,
    verifier: &dyn SignatureVerifier,
) -> VersionResolution {
    let resolution = match existing {
        Some(existing) if equal_key(candidate, existing) => {
            if last_modified(candidate, verifier) > last_modified(existing, verifier) {
                VersionResolution::ReplaceWithCandidate
            } else {
                VersionResolution::KeepExisting
            }
        }
        _ => VersionResolution::Insert,
    };
    debug!(fingerprint = %candidate.fingerprint(), ?resolution, "resolved key version");
    resolution
}
