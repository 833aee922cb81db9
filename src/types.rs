//! Public type definitions for the keytrust library.
//!
//! This module contains the flat, UI-consumable records produced by the
//! key mapper and the small enums shared across evaluators. Records are
//! projections: they are rebuilt from the raw key on every read and never
//! mutated in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Whether a key carries secret material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Public,
    Private,
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::Public => write!(f, "public"),
            KeyType::Private => write!(f, "private"),
        }
    }
}

impl std::str::FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" => Ok(KeyType::Public),
            "private" | "secret" => Ok(KeyType::Private),
            _ => Err(format!("unknown key type: {}", s)),
        }
    }
}

/// Trust status of a user ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserStatus {
    /// Has a verified, unrevoked, unexpired self-certification
    Valid,
    /// Its latest self-certification (or the key itself) was revoked
    Revoked,
    /// No usable self-certification, or the latest one has expired
    Invalid,
}

/// When a key component expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Expiration {
    Never,
    At(DateTime<Utc>),
}

impl Expiration {
    pub fn at(&self) -> Option<DateTime<Utc>> {
        match self {
            Expiration::Never => None,
            Expiration::At(at) => Some(*at),
        }
    }
}

impl Serialize for Expiration {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Expiration::Never => serializer.serialize_str("never"),
            Expiration::At(at) => serializer.serialize_str(&at.to_rfc3339()),
        }
    }
}

impl<'de> Deserialize<'de> for Expiration {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s == "never" {
            return Ok(Expiration::Never);
        }
        DateTime::parse_from_rfc3339(&s)
            .map(|at| Expiration::At(at.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

/// A certification on a user ID, as shown in key details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureRecord {
    /// Issuer key ID (16 uppercase hex characters)
    pub signer_key_id: String,
    /// Resolved signer identity, or the unknown-signer label
    pub signer_name: String,
    pub cr_date: DateTime<Utc>,
    /// Whether the issuer later revoked this certification
    pub revoked: bool,
}

/// A user ID with its evaluated status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub status: UserStatus,
    pub signatures: Vec<SignatureRecord>,
}

/// Information about a subkey.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubkeyRecord {
    pub key_id: String,
    pub fingerprint: String,
    pub cr_date: DateTime<Utc>,
    pub ex_date: Expiration,
    pub algorithm: String,
    pub bit_length: u32,
    pub revoked: bool,
}

/// A whole key, flattened for display and recipient selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    #[serde(rename = "type")]
    pub key_type: KeyType,
    pub fingerprint: String,
    pub key_id: String,
    pub name: String,
    pub email: String,
    pub user_id: String,
    /// True iff the primary user has a valid self-certification
    pub validity: bool,
    pub cr_date: DateTime<Utc>,
    pub ex_date: Expiration,
    pub algorithm: String,
    pub bit_length: u32,
    pub subkeys: Vec<SubkeyRecord>,
    pub users: Vec<UserRecord>,
}

/// Name, email and raw user ID of a key's primary user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_expiration_serializes_never() {
        let json = serde_json::to_string(&Expiration::Never).unwrap();
        assert_eq!(json, "\"never\"");

        let at = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let json = serde_json::to_string(&Expiration::At(at)).unwrap();
        let back: Expiration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Expiration::At(at));
    }

    #[test]
    fn test_key_type_from_str() {
        assert_eq!("PUBLIC".parse::<KeyType>().unwrap(), KeyType::Public);
        assert_eq!("secret".parse::<KeyType>().unwrap(), KeyType::Private);
        assert!("other".parse::<KeyType>().is_err());
        assert_eq!(serde_json::to_string(&KeyType::Private).unwrap(), "\"private\"");
    }
}
