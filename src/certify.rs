//! Certificate evaluation.
//!
//! Turns the signatures attached to a user ID or subkey into a trust
//! verdict. Cryptographic soundness of each signature is delegated to a
//! [`SignatureVerifier`]; this module only decides which sound signatures
//! are in force at a given instant.
//!
//! A user ID is:
//! - `Revoked` if the key carries a key revocation, or if a certification
//!   revocation issued at or after its latest self-certification exists
//!   (identical timestamps resolve to revoked),
//! - `Invalid` if it has no self-certification at all, or the latest one
//!   has expired,
//! - `Valid` otherwise.

use chrono::{DateTime, Utc};

use crate::internal::{expiration_of, is_expired, latest, revoked_since};
use crate::raw::{RawCertification, RawKey, RawSubkey, RawUser, SignatureKind};
use crate::types::{Expiration, UserStatus};

/// Cryptographic verdicts supplied by the OpenPGP engine.
pub trait SignatureVerifier {
    /// Is `sig` a sound signature over `user` on `key`?
    fn verify_certification(&self, key: &RawKey, user: &RawUser, sig: &RawCertification) -> bool;

    /// Is `sig` a sound binding or revocation signature over `subkey`?
    fn verify_binding(&self, key: &RawKey, subkey: &RawSubkey, sig: &RawCertification) -> bool;

    /// Is `sig` a sound direct-key or key revocation signature?
    fn verify_direct(&self, key: &RawKey, sig: &RawCertification) -> bool;
}

/// Trusts the verdict the engine recorded in
/// [`RawCertification::verified`] when the key was parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineVerdict;

impl SignatureVerifier for EngineVerdict {
    fn verify_certification(&self, _key: &RawKey, _user: &RawUser, sig: &RawCertification) -> bool {
        sig.verified
    }

    fn verify_binding(&self, _key: &RawKey, _subkey: &RawSubkey, sig: &RawCertification) -> bool {
        sig.verified
    }

    fn verify_direct(&self, _key: &RawKey, sig: &RawCertification) -> bool {
        sig.verified
    }
}

/// Result of evaluating one user ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEvaluation<'a> {
    pub status: UserStatus,
    /// The latest sound self-certification, if any
    pub self_certification: Option<&'a RawCertification>,
    /// Expiration from that self-certification (`Never` if there is none)
    pub expiration: Expiration,
}

impl UserEvaluation<'_> {
    pub fn is_valid(&self) -> bool {
        self.status == UserStatus::Valid
    }
}

/// Result of evaluating one subkey.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubkeyEvaluation<'a> {
    /// The latest sound binding signature, if any
    pub binding: Option<&'a RawCertification>,
    pub revoked: bool,
    pub expiration: Expiration,
}

impl SubkeyEvaluation<'_> {
    /// Bound, not revoked and not expired at `now`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.binding.is_some() && !self.revoked && !is_expired(&self.expiration, now)
    }
}

/// True if the primary key carries a sound key revocation by itself.
pub fn is_key_revoked(key: &RawKey, verifier: &dyn SignatureVerifier) -> bool {
    let primary_id = key.key_id();
    key.direct_signatures.iter().any(|sig| {
        sig.kind == SignatureKind::KeyRevocation
            && sig.issuer == primary_id
            && verifier.verify_direct(key, sig)
    })
}

/// Evaluate a user ID of `key` at the instant `now`.
pub fn evaluate_user<'a>(
    key: &'a RawKey,
    user: &'a RawUser,
    verifier: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> UserEvaluation<'a> {
    let primary_id = key.key_id();

    let self_certification = latest(&user.certifications, |sig| {
        sig.kind.is_certification()
            && sig.issuer == primary_id
            && sig.created <= now
            && verifier.verify_certification(key, user, sig)
    });

    let Some(cert) = self_certification else {
        return UserEvaluation {
            status: UserStatus::Invalid,
            self_certification: None,
            expiration: Expiration::Never,
        };
    };

    let expiration = expiration_of(key.primary.created, cert);

    let revoked = is_key_revoked(key, verifier)
        || revoked_since(
            &user.certifications,
            SignatureKind::CertRevocation,
            cert.created,
            |sig| sig.issuer == primary_id && verifier.verify_certification(key, user, sig),
        );

    let status = if revoked {
        UserStatus::Revoked
    } else if is_expired(&expiration, now) {
        UserStatus::Invalid
    } else {
        UserStatus::Valid
    };

    UserEvaluation {
        status,
        self_certification: Some(cert),
        expiration,
    }
}

/// Evaluate a subkey of `key` at the instant `now`.
pub fn evaluate_subkey<'a>(
    key: &'a RawKey,
    subkey: &'a RawSubkey,
    verifier: &dyn SignatureVerifier,
    now: DateTime<Utc>,
) -> SubkeyEvaluation<'a> {
    let primary_id = key.key_id();

    let binding = latest(&subkey.signatures, |sig| {
        sig.kind == SignatureKind::SubkeyBinding
            && sig.issuer == primary_id
            && sig.created <= now
            && verifier.verify_binding(key, subkey, sig)
    });

    // An unbound subkey is unusable but not revoked
    let Some(bound) = binding else {
        return SubkeyEvaluation {
            binding: None,
            revoked: false,
            expiration: Expiration::Never,
        };
    };

    let revoked = is_key_revoked(key, verifier)
        || revoked_since(
            &subkey.signatures,
            SignatureKind::SubkeyRevocation,
            bound.created,
            |sig| sig.issuer == primary_id && verifier.verify_binding(key, subkey, sig),
        );
    let expiration = expiration_of(subkey.key.created, bound);

    SubkeyEvaluation {
        binding,
        revoked,
        expiration,
    }
}
