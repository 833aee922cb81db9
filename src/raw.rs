//! Raw key model produced at the OpenPGP engine boundary.
//!
//! These types are a closed, statically checked rendition of what an
//! OpenPGP engine hands over after parsing key material: the primary key
//! packet, subkeys with their binding and revocation signatures, and user
//! entries with their certifications. They are built once (see the
//! `openpgp` module, or by hand in tests) and then only read.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::internal::{decode_hex_id, timestamp_zero};

/// An 8-byte OpenPGP key ID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyId([u8; 8]);

impl KeyId {
    pub fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// Uppercase hex, 16 characters.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl FromStr for KeyId {
    type Err = Error;

    /// Parse a key ID from hex (case-insensitive, spaces ignored).
    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_hex_id(s)?;
        let bytes: [u8; 8] = bytes
            .try_into()
            .map_err(|_| Error::InvalidInput(format!("key ID must be 8 bytes: {}", s)))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyId({})", self.to_hex())
    }
}

/// A full key fingerprint.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(Vec<u8>);

impl Fingerprint {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Uppercase hex, no separators.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = decode_hex_id(s)?;
        if bytes.is_empty() {
            return Err(Error::InvalidInput("empty fingerprint".to_string()));
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

/// Public key algorithm of a key packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKeyAlgorithm {
    RsaEncryptSign,
    RsaEncrypt,
    RsaSign,
    Elgamal,
    Dsa,
    Ecdh,
    Ecdsa,
    EdDsa,
    X25519,
    X448,
    Ed25519,
    Ed448,
    /// Any algorithm ID this crate has no display name for
    Unknown(u8),
}

impl PublicKeyAlgorithm {
    /// Human-readable algorithm name as shown in key details.
    pub fn name(&self) -> &'static str {
        match self {
            PublicKeyAlgorithm::RsaEncryptSign => "RSA (Encrypt or Sign)",
            PublicKeyAlgorithm::RsaEncrypt => "RSA Encrypt-Only",
            PublicKeyAlgorithm::RsaSign => "RSA Sign-Only",
            PublicKeyAlgorithm::Elgamal => "Elgamal (Encrypt-Only)",
            PublicKeyAlgorithm::Dsa => "DSA (Digital Signature Algorithm)",
            PublicKeyAlgorithm::Ecdh => "ECDH",
            PublicKeyAlgorithm::Ecdsa => "ECDSA",
            PublicKeyAlgorithm::EdDsa => "EdDSA",
            PublicKeyAlgorithm::X25519 => "X25519",
            PublicKeyAlgorithm::X448 => "X448",
            PublicKeyAlgorithm::Ed25519 => "Ed25519",
            PublicKeyAlgorithm::Ed448 => "Ed448",
            PublicKeyAlgorithm::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for PublicKeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Secret key material attached to a key packet.
///
/// The bytes are opaque to this crate. They are wiped on drop and never
/// printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecretMaterial(Vec<u8>);

impl SecretMaterial {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretMaterial(<redacted>)")
    }
}

/// A primary key or subkey packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPacket {
    pub key_id: KeyId,
    pub fingerprint: Fingerprint,
    pub created: DateTime<Utc>,
    pub algorithm: PublicKeyAlgorithm,
    /// Key size in bits (0 if unknown)
    pub bit_length: u32,
    /// Curve name for ECC algorithms
    pub curve: Option<String>,
    /// Secret material, present only for private keys
    pub secret: Option<SecretMaterial>,
}

impl KeyPacket {
    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    /// Copy of this packet without secret material.
    pub fn to_public(&self) -> KeyPacket {
        KeyPacket {
            secret: None,
            ..self.clone()
        }
    }
}

/// Signature types this model distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureKind {
    CertGeneric,
    CertPersona,
    CertCasual,
    CertPositive,
    CertRevocation,
    SubkeyBinding,
    SubkeyRevocation,
    DirectKey,
    KeyRevocation,
}

impl SignatureKind {
    /// User ID / attribute certification (0x10-0x13).
    pub fn is_certification(&self) -> bool {
        matches!(
            self,
            SignatureKind::CertGeneric
                | SignatureKind::CertPersona
                | SignatureKind::CertCasual
                | SignatureKind::CertPositive
        )
    }

    pub fn is_revocation(&self) -> bool {
        matches!(
            self,
            SignatureKind::CertRevocation
                | SignatureKind::SubkeyRevocation
                | SignatureKind::KeyRevocation
        )
    }
}

/// A signature attached to a user entry, a subkey, or the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCertification {
    pub kind: SignatureKind,
    pub issuer: KeyId,
    pub created: DateTime<Utc>,
    /// Key expiration offset in seconds from key creation. `None` or `0`
    /// means the key never expires.
    pub key_expiration: Option<u64>,
    /// The engine's cryptographic verdict on this signature
    pub verified: bool,
}

impl RawCertification {
    pub fn never_expires(&self) -> bool {
        matches!(self.key_expiration, None | Some(0))
    }
}

/// The identity carried by a user entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserPacket {
    /// A textual user ID, e.g. `"Ada Lovelace <ada@example.com>"`
    UserId(String),
    /// A non-ID attribute such as an embedded photo
    Attribute(Vec<u8>),
}

/// A user entry with its certifications and certification revocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUser {
    pub packet: UserPacket,
    pub certifications: Vec<RawCertification>,
}

impl RawUser {
    /// The user ID string, or `None` for attribute entries.
    pub fn user_id(&self) -> Option<&str> {
        match &self.packet {
            UserPacket::UserId(id) => Some(id),
            UserPacket::Attribute(_) => None,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self.packet, UserPacket::Attribute(_))
    }
}

/// A subkey with its binding and revocation signatures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSubkey {
    pub key: KeyPacket,
    pub signatures: Vec<RawCertification>,
}

/// A complete OpenPGP key as delivered by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawKey {
    pub primary: KeyPacket,
    /// Key revocations and direct-key signatures on the primary key
    pub direct_signatures: Vec<RawCertification>,
    pub users: Vec<RawUser>,
    pub subkeys: Vec<RawSubkey>,
}

impl RawKey {
    pub fn key_id(&self) -> KeyId {
        self.primary.key_id
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.primary.fingerprint
    }

    /// True if the primary key or any subkey carries secret material.
    pub fn is_private(&self) -> bool {
        self.primary.has_secret() || self.subkeys.iter().any(|s| s.key.has_secret())
    }

    pub fn subkey_ids(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.subkeys.iter().map(|s| s.key.key_id)
    }

    /// True if `key_id` is this key's primary ID or one of its subkey IDs.
    pub fn has_key_id(&self, key_id: &KeyId) -> bool {
        self.primary.key_id == *key_id || self.subkey_ids().any(|id| id == *key_id)
    }

    /// Every signature on the key, across direct, user and subkey lists.
    pub fn signatures(&self) -> impl Iterator<Item = &RawCertification> {
        self.direct_signatures
            .iter()
            .chain(self.users.iter().flat_map(|u| u.certifications.iter()))
            .chain(self.subkeys.iter().flat_map(|s| s.signatures.iter()))
    }
}

impl Default for KeyPacket {
    fn default() -> Self {
        Self {
            key_id: KeyId::new([0; 8]),
            fingerprint: Fingerprint::new(Vec::new()),
            created: timestamp_zero(),
            algorithm: PublicKeyAlgorithm::Unknown(0),
            bit_length: 0,
            curve: None,
            secret: None,
        }
    }
}
