//! # keytrust
//!
//! The key trust-and-metadata model of an OpenPGP client: it turns raw
//! OpenPGP keys into validated, display-ready records and governs how a key
//! may enter a keyring without corrupting identity guarantees.
//!
//! - **User IDs**: split `"Name <email>"` strings, refusing ambiguous input
//! - **Certificate evaluation**: valid / revoked / invalid status of user IDs
//!   and subkeys at a given instant
//! - **Key mapping**: flat [`KeyRecord`]s with signer names resolved
//!   against a keyring
//! - **Keyring admission**: key ID collision checks and newest-copy-wins
//!   version resolution
//! - **Minimization**: single-identity, secret-free copies for export
//!
//! ## Quick Start
//!
//! ```ignore
//! use keytrust::*;
//!
//! let mut keyring = MemoryKeyring::new();
//! for key in parse_keyring_bytes(&std::fs::read("pubring.gpg")?)? {
//!     if let Err(e) = keyring.import_key(key) {
//!         eprintln!("refused: {}", e);
//!     }
//! }
//!
//! for record in KeyMapper::new(&keyring).map_keys(&keyring.iter().cloned().collect::<Vec<_>>()) {
//!     println!("{} {} valid={}", record.fingerprint, record.user_id, record.validity);
//! }
//! ```
//!
//! ## Features
//!
//! - `rpgp`: parse armored or binary keys with [rpgp](https://docs.rs/pgp)
//!   and verify their self-signatures
//!
//! ## Design
//!
//! Everything but the `rpgp` boundary works on the closed [`RawKey`] model
//! and is synchronous and pure. The keyring is passed explicitly as a
//! [`KeyringView`] to every operation that reads it.

// OpenPGP implementation (rpgp)
#[cfg(feature = "rpgp")]
pub use pgp;

// Modules
mod error;
mod internal;
mod types;

mod certify;
mod collision;
mod keyring;
mod mapper;
mod minify;
mod raw;
mod userid;
mod version;

#[cfg(feature = "rpgp")]
mod openpgp;

// Re-export error types
pub use error::{CollisionReason, Error, Result};

// Re-export the raw key model
pub use raw::{
    Fingerprint,
    KeyId,
    KeyPacket,
    PublicKeyAlgorithm,
    RawCertification,
    RawKey,
    RawSubkey,
    RawUser,
    SecretMaterial,
    SignatureKind,
    UserPacket,
};

// Re-export record types
pub use types::{
    Expiration,
    KeyRecord,
    KeyType,
    SignatureRecord,
    SubkeyRecord,
    UserInfo,
    UserRecord,
    UserStatus,
};

// Re-export user ID parsing
pub use userid::{email_of, is_valid_email, parse_user_id, UserIdentity};

// Re-export certificate evaluation
pub use certify::{
    evaluate_subkey,
    evaluate_user,
    is_key_revoked,
    EngineVerdict,
    SignatureVerifier,
    SubkeyEvaluation,
    UserEvaluation,
};

// Re-export key mapping
pub use mapper::{
    algorithm_label,
    get_user_info,
    key_type_of,
    map_key,
    map_keys,
    KeyMapper,
    Labels,
    MapOptions,
};

// Re-export keyring admission and versioning
pub use collision::check_admission;
pub use keyring::{keys_for_email, ImportOutcome, KeyringView, MemoryKeyring, SharedKeyring};
pub use version::{equal_key, last_modified, resolve_version, VersionResolution};

// Re-export minimization
pub use minify::{filter_user_ids_by_email, minify_key, to_public};

// Re-export rpgp parsing when the feature is enabled
#[cfg(feature = "rpgp")]
pub use openpgp::{
    parse_key_bytes,
    parse_key_file,
    parse_keyring_bytes,
    parse_keyring_file,
    public_key_to_raw,
    secret_key_to_raw,
};
