//! Expiration and revocation policy shared by the evaluators.
//!
//! The OpenPGP engine answers whether a signature is cryptographically
//! sound. Whether a sound signature still makes its component usable at a
//! given instant is decided here.

use chrono::{DateTime, Duration, Utc};

use crate::raw::{RawCertification, SignatureKind};
use crate::types::Expiration;

/// Expiration of a key component created at `created`, per the
/// key-expiration offset carried by `sig`.
pub(crate) fn expiration_of(created: DateTime<Utc>, sig: &RawCertification) -> Expiration {
    match sig.key_expiration {
        None | Some(0) => Expiration::Never,
        Some(secs) => {
            // The key expiration subpacket is a 32-bit offset
            let offset = i64::try_from(secs.min(u64::from(u32::MAX))).unwrap_or(i64::MAX);
            match created.checked_add_signed(Duration::seconds(offset)) {
                Some(at) => Expiration::At(at),
                None => Expiration::Never,
            }
        }
    }
}

/// Check if a component with the given expiration has expired at `now`.
pub(crate) fn is_expired(expiration: &Expiration, now: DateTime<Utc>) -> bool {
    match expiration {
        Expiration::Never => false,
        Expiration::At(at) => *at <= now,
    }
}

/// The latest signature in `sigs` accepted by `accept`.
///
/// On equal timestamps the later entry in list order wins.
pub(crate) fn latest<'a, I, F>(sigs: I, mut accept: F) -> Option<&'a RawCertification>
where
    I: IntoIterator<Item = &'a RawCertification>,
    F: FnMut(&RawCertification) -> bool,
{
    sigs.into_iter()
        .filter(|sig| accept(*sig))
        .fold(None, |best: Option<&RawCertification>, sig| match best {
            Some(b) if b.created > sig.created => Some(b),
            _ => Some(sig),
        })
}

/// True if `revocations` holds a signature of `kind` issued at or after
/// `since` that `accept` admits. Ties go to the revocation.
pub(crate) fn revoked_since<'a, I, F>(
    revocations: I,
    kind: SignatureKind,
    since: DateTime<Utc>,
    mut accept: F,
) -> bool
where
    I: IntoIterator<Item = &'a RawCertification>,
    F: FnMut(&RawCertification) -> bool,
{
    revocations
        .into_iter()
        .any(|sig| sig.kind == kind && sig.created >= since && accept(sig))
}
