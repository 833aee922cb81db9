//! OpenPGP engine boundary.
//!
//! Parses armored or binary key material with rpgp and converts it once
//! into the closed [`RawKey`] model. Signatures issued by the primary key
//! are cryptographically checked here and the verdict is stored in
//! [`RawCertification::verified`], so everything downstream works on plain
//! data. Third-party certifications are recorded unverified.

use std::io::Cursor;
use std::path::Path;

use pgp::composed::{
    Deserializable, SignedPublicKey, SignedPublicSubKey, SignedSecretKey,
};
use pgp::crypto::ecc_curve::ECCCurve;
use pgp::crypto::public_key::PublicKeyAlgorithm as PgpAlgorithm;
use pgp::packet::{Signature, SignatureType};
use pgp::ser::Serialize;
use pgp::types::{EcdsaPublicParams, KeyDetails, PublicParams, Tag};
use rsa::traits::PublicKeyParts;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::internal::system_time_to_datetime;
use crate::raw::{
    Fingerprint, KeyId, KeyPacket, PublicKeyAlgorithm, RawCertification, RawKey, RawSubkey,
    RawUser, SecretMaterial, SignatureKind, UserPacket,
};

/// Parse a single key (public or secret, armored or binary).
///
/// # Arguments
/// * `data` - Key data (armored or binary)
///
/// # Returns
/// The key in the raw model. Secret keys carry their secret packets.
///
/// # Example
/// ```ignore
/// let data = std::fs::read("alice.asc")?;
/// let key = parse_key_bytes(&data)?;
/// println!("{}", key.fingerprint());
/// ```
pub fn parse_key_bytes(data: &[u8]) -> Result<RawKey> {
    if let Ok(secret_key) = parse_secret_key(data) {
        return secret_key_to_raw(&secret_key);
    }
    let public_key = parse_public_key(data)?;
    Ok(public_key_to_raw(&public_key))
}

/// Parse a single key from a file.
///
/// # Arguments
/// * `path` - Path to the key file
pub fn parse_key_file(path: impl AsRef<Path>) -> Result<RawKey> {
    let data = std::fs::read(path.as_ref())?;
    parse_key_bytes(&data)
}

/// Parse keyring data containing multiple public keys.
///
/// Keys that fail to parse are skipped with a warning.
///
/// # Arguments
/// * `data` - Keyring data (armored or binary)
pub fn parse_keyring_bytes(data: &[u8]) -> Result<Vec<RawKey>> {
    let cursor = Cursor::new(data);
    let (keys_iter, _headers) = SignedPublicKey::from_reader_many(cursor)?;

    let mut keys = Vec::new();
    for key_result in keys_iter {
        match key_result {
            Ok(key) => keys.push(public_key_to_raw(&key)),
            Err(e) => warn!(error = %e, "skipping unparsable key"),
        }
    }
    debug!(count = keys.len(), "parsed keyring");
    Ok(keys)
}

/// Parse keyring data from a file.
pub fn parse_keyring_file(path: impl AsRef<Path>) -> Result<Vec<RawKey>> {
    let data = std::fs::read(path.as_ref())?;
    parse_keyring_bytes(&data)
}

/// Convert a signed public key, verifying its self-signatures.
pub fn public_key_to_raw(key: &SignedPublicKey) -> RawKey {
    let primary_id = key_id_of(&key.primary_key);

    let mut direct_signatures = Vec::new();
    for sig in key
        .details
        .revocation_signatures
        .iter()
        .chain(key.details.direct_signatures.iter())
    {
        if let Some(mut cert) = certification_of(sig) {
            cert.verified = cert.issuer == primary_id && sig.verify_key(&key.primary_key).is_ok();
            direct_signatures.push(cert);
        }
    }

    let mut users = Vec::new();
    for user in &key.details.users {
        let certifications = user
            .signatures
            .iter()
            .filter_map(|sig| {
                let mut cert = certification_of(sig)?;
                cert.verified = cert.issuer == primary_id
                    && sig
                        .verify_certification(&key.primary_key, Tag::UserId, &user.id)
                        .is_ok();
                Some(cert)
            })
            .collect();
        users.push(RawUser {
            packet: UserPacket::UserId(String::from_utf8_lossy(user.id.id()).to_string()),
            certifications,
        });
    }

    for attribute in &key.details.user_attributes {
        let certifications = attribute
            .signatures
            .iter()
            .filter_map(|sig| {
                let mut cert = certification_of(sig)?;
                cert.verified = cert.issuer == primary_id
                    && sig
                        .verify_certification(&key.primary_key, Tag::UserAttribute, &attribute.attr)
                        .is_ok();
                Some(cert)
            })
            .collect();
        users.push(RawUser {
            packet: UserPacket::Attribute(attribute.attr.to_bytes().unwrap_or_default()),
            certifications,
        });
    }

    let subkeys = key
        .public_subkeys
        .iter()
        .map(|subkey| subkey_to_raw(key, subkey, primary_id))
        .collect();

    RawKey {
        primary: packet_of(&key.primary_key),
        direct_signatures,
        users,
        subkeys,
    }
}

/// Convert a signed secret key, keeping each secret packet as opaque
/// secret material on the matching key packet.
pub fn secret_key_to_raw(key: &SignedSecretKey) -> Result<RawKey> {
    let mut raw = public_key_to_raw(&key.to_public_key());
    raw.primary.secret = Some(SecretMaterial::new(key.primary_key.to_bytes()?));

    for secret_subkey in &key.secret_subkeys {
        let fingerprint = Fingerprint::new(secret_subkey.key.fingerprint().as_bytes().to_vec());
        if let Some(subkey) = raw
            .subkeys
            .iter_mut()
            .find(|s| s.key.fingerprint == fingerprint)
        {
            subkey.key.secret = Some(SecretMaterial::new(secret_subkey.key.to_bytes()?));
        }
    }
    Ok(raw)
}

fn subkey_to_raw(key: &SignedPublicKey, subkey: &SignedPublicSubKey, primary_id: KeyId) -> RawSubkey {
    let signatures = subkey
        .signatures
        .iter()
        .filter_map(|sig| {
            let mut cert = certification_of(sig)?;
            // Bindings and subkey revocations hash the same material
            cert.verified = cert.issuer == primary_id
                && sig.verify_key_binding(&key.primary_key, &subkey.key).is_ok();
            Some(cert)
        })
        .collect();

    RawSubkey {
        key: packet_of(&subkey.key),
        signatures,
    }
}

/// Parse a secret key from bytes (armored or binary).
fn parse_secret_key(data: &[u8]) -> Result<SignedSecretKey> {
    match SignedSecretKey::from_armor_single(Cursor::new(data)) {
        Ok((key, _headers)) => Ok(key),
        Err(_) => SignedSecretKey::from_bytes(Cursor::new(data))
            .map_err(|e| Error::Parse(e.to_string())),
    }
}

/// Parse a public key from bytes (armored or binary).
fn parse_public_key(data: &[u8]) -> Result<SignedPublicKey> {
    if let Ok((key, _headers)) = SignedPublicKey::from_armor_single(Cursor::new(data)) {
        return Ok(key);
    }
    SignedPublicKey::from_bytes(Cursor::new(data)).map_err(|e| Error::Parse(e.to_string()))
}

fn certification_of(sig: &Signature) -> Option<RawCertification> {
    let kind = match sig.typ()? {
        SignatureType::CertGeneric => SignatureKind::CertGeneric,
        SignatureType::CertPersona => SignatureKind::CertPersona,
        SignatureType::CertCasual => SignatureKind::CertCasual,
        SignatureType::CertPositive => SignatureKind::CertPositive,
        SignatureType::CertRevocation => SignatureKind::CertRevocation,
        SignatureType::SubkeyBinding => SignatureKind::SubkeyBinding,
        SignatureType::SubkeyRevocation => SignatureKind::SubkeyRevocation,
        SignatureType::Key => SignatureKind::DirectKey,
        SignatureType::KeyRevocation => SignatureKind::KeyRevocation,
        _ => return None,
    };
    let issuer = sig
        .issuer_key_id()
        .into_iter()
        .find_map(|id| <[u8; 8]>::try_from(id.as_ref()).ok())
        .map(KeyId::new)?;
    let created = system_time_to_datetime(sig.created()?.into());
    let key_expiration = sig.key_expiration_time().map(|validity| validity.as_secs() as u64);

    Some(RawCertification {
        kind,
        issuer,
        created,
        key_expiration,
        verified: false,
    })
}

fn key_id_of(key: &impl KeyDetails) -> KeyId {
    let mut bytes = [0u8; 8];
    let legacy = key.legacy_key_id();
    let id = legacy.as_ref();
    let len = id.len().min(8);
    bytes[..len].copy_from_slice(&id[..len]);
    KeyId::new(bytes)
}

fn packet_of(key: &impl KeyDetails) -> KeyPacket {
    KeyPacket {
        key_id: key_id_of(key),
        fingerprint: Fingerprint::new(key.fingerprint().as_bytes().to_vec()),
        created: system_time_to_datetime(key.created_at().into()),
        algorithm: algorithm_of(key.algorithm()),
        bit_length: bit_length_of(key),
        curve: curve_of(key),
        secret: None,
    }
}

fn algorithm_of(algorithm: PgpAlgorithm) -> PublicKeyAlgorithm {
    match algorithm {
        PgpAlgorithm::RSA => PublicKeyAlgorithm::RsaEncryptSign,
        PgpAlgorithm::RSAEncrypt => PublicKeyAlgorithm::RsaEncrypt,
        PgpAlgorithm::RSASign => PublicKeyAlgorithm::RsaSign,
        PgpAlgorithm::Elgamal => PublicKeyAlgorithm::Elgamal,
        PgpAlgorithm::DSA => PublicKeyAlgorithm::Dsa,
        PgpAlgorithm::ECDH => PublicKeyAlgorithm::Ecdh,
        PgpAlgorithm::ECDSA => PublicKeyAlgorithm::Ecdsa,
        PgpAlgorithm::EdDSALegacy => PublicKeyAlgorithm::EdDsa,
        PgpAlgorithm::X25519 => PublicKeyAlgorithm::X25519,
        PgpAlgorithm::X448 => PublicKeyAlgorithm::X448,
        PgpAlgorithm::Ed25519 => PublicKeyAlgorithm::Ed25519,
        PgpAlgorithm::Ed448 => PublicKeyAlgorithm::Ed448,
        other => PublicKeyAlgorithm::Unknown(u8::from(other)),
    }
}

/// Bit size from the public parameters. Returns 0 if it cannot be
/// determined.
fn bit_length_of(key: &impl KeyDetails) -> u32 {
    if let PublicParams::RSA(params) = key.public_params() {
        return params.key.n().bits() as u32;
    }
    if let Some(curve) = ecc_curve_of(key) {
        return curve_bits(&curve);
    }
    match key.algorithm() {
        PgpAlgorithm::Ed25519 | PgpAlgorithm::X25519 => 256,
        PgpAlgorithm::X448 | PgpAlgorithm::Ed448 => 448,
        _ => 0,
    }
}

fn curve_of(key: &impl KeyDetails) -> Option<String> {
    ecc_curve_of(key).map(|curve| format!("{:?}", curve))
}

fn ecc_curve_of(key: &impl KeyDetails) -> Option<ECCCurve> {
    match key.public_params() {
        PublicParams::ECDH(params) => Some(params.curve()),
        PublicParams::EdDSALegacy(params) => Some(params.curve()),
        PublicParams::ECDSA(params) => match params {
            EcdsaPublicParams::P256 { .. } => Some(ECCCurve::P256),
            EcdsaPublicParams::P384 { .. } => Some(ECCCurve::P384),
            EcdsaPublicParams::P521 { .. } => Some(ECCCurve::P521),
            _ => None,
        },
        _ => None,
    }
}

fn curve_bits(curve: &ECCCurve) -> u32 {
    match curve {
        ECCCurve::Curve25519
        | ECCCurve::Ed25519
        | ECCCurve::P256
        | ECCCurve::BrainpoolP256r1
        | ECCCurve::Secp256k1 => 256,
        ECCCurve::P384 | ECCCurve::BrainpoolP384r1 => 384,
        ECCCurve::BrainpoolP512r1 => 512,
        ECCCurve::P521 => 521,
        _ => 0,
    }
}
