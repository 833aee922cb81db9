//! Fixture builder shared by the integration tests.
//!
//! Key `n` has key ID `[n; 8]` and fingerprint `[n; 20]`; a subkey built
//! with id `s` follows the same scheme. Times are seconds since the epoch.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use keytrust::{
    Fingerprint, KeyId, KeyPacket, PublicKeyAlgorithm, RawCertification, RawKey, RawSubkey,
    RawUser, SecretMaterial, SignatureKind, UserPacket,
};

/// Key creation time used by every fixture.
pub const CREATED: i64 = 1_600_000_000;

/// Evaluation instant well after every fixture signature.
pub const NOW: i64 = 1_700_000_000;

pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn key_id(id: u8) -> KeyId {
    KeyId::new([id; 8])
}

pub fn fingerprint(id: u8) -> Fingerprint {
    Fingerprint::new(vec![id; 20])
}

pub fn cert(kind: SignatureKind, issuer: u8, created: i64) -> RawCertification {
    RawCertification {
        kind,
        issuer: key_id(issuer),
        created: at(created),
        key_expiration: None,
        verified: true,
    }
}

pub fn packet(id: u8) -> KeyPacket {
    KeyPacket {
        key_id: key_id(id),
        fingerprint: fingerprint(id),
        created: at(CREATED),
        algorithm: PublicKeyAlgorithm::EdDsa,
        bit_length: 256,
        curve: Some("Ed25519".to_string()),
        secret: None,
    }
}

pub struct KeyBuilder {
    key: RawKey,
}

impl KeyBuilder {
    pub fn new(id: u8) -> Self {
        Self {
            key: RawKey {
                primary: packet(id),
                direct_signatures: vec![],
                users: vec![],
                subkeys: vec![],
            },
        }
    }

    fn id(&self) -> u8 {
        self.key.primary.key_id.as_bytes()[0]
    }

    /// Override the fingerprint while keeping the key ID.
    pub fn fingerprint(mut self, fpr: u8) -> Self {
        self.key.primary.fingerprint = fingerprint(fpr);
        self
    }

    pub fn user(mut self, user_id: &str, certifications: Vec<RawCertification>) -> Self {
        self.key.users.push(RawUser {
            packet: UserPacket::UserId(user_id.to_string()),
            certifications,
        });
        self
    }

    /// A user ID with one positive self-certification at `created`.
    pub fn self_certified(self, user_id: &str, created: i64) -> Self {
        let id = self.id();
        self.user(user_id, vec![cert(SignatureKind::CertPositive, id, created)])
    }

    /// A photo attribute with one self-certification at `created`.
    pub fn photo(mut self, created: i64) -> Self {
        let id = self.id();
        self.key.users.push(RawUser {
            packet: UserPacket::Attribute(vec![0xFF, 0xD8, 0xFF, 0xE0]),
            certifications: vec![cert(SignatureKind::CertPositive, id, created)],
        });
        self
    }

    /// A subkey bound by the primary key at `bound_at`.
    pub fn subkey(mut self, sub: u8, bound_at: i64) -> Self {
        let id = self.id();
        self.key.subkeys.push(RawSubkey {
            key: packet(sub),
            signatures: vec![cert(SignatureKind::SubkeyBinding, id, bound_at)],
        });
        self
    }

    pub fn direct(mut self, sig: RawCertification) -> Self {
        self.key.direct_signatures.push(sig);
        self
    }

    /// Attach secret material to the primary key and every subkey.
    pub fn secret(mut self) -> Self {
        let id = self.id();
        self.key.primary.secret = Some(SecretMaterial::new(vec![id; 32]));
        for subkey in self.key.subkeys.iter_mut() {
            let sub = subkey.key.key_id.as_bytes()[0];
            subkey.key.secret = Some(SecretMaterial::new(vec![sub; 32]));
        }
        self
    }

    pub fn build(self) -> RawKey {
        self.key
    }
}
