//! Error types for the keytrust library.
//!
//! Every failure in this crate is synchronous and reported through a typed
//! result. Rejections that matter to the end user (collisions, unusable user
//! IDs) carry the exact reason so it can be surfaced verbatim.

use thiserror::Error;

/// Why the Collision Checker refused a key.
///
/// The `Display` text of each variant is the reason shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionReason {
    /// The candidate's primary key ID is a subkey ID of another key.
    PrimaryEqualsSubkey,
    /// The candidate's primary key ID is the primary key ID of a key with a
    /// different fingerprint.
    PrimaryEqualsForeignPrimary,
    /// One of the candidate's subkey IDs is another key's primary key ID.
    SubkeyEqualsPrimary,
    /// One of the candidate's subkey IDs is a subkey of a key with a
    /// different primary key ID.
    SubkeyEqualsForeignSubkey,
}

impl CollisionReason {
    /// The reason string surfaced to the user.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollisionReason::PrimaryEqualsSubkey => "Primary keyId equals existing sub keyId.",
            CollisionReason::PrimaryEqualsForeignPrimary => {
                "Primary keyId equals existing primary keyId of a different key."
            }
            CollisionReason::SubkeyEqualsPrimary => "Sub keyId equals existing primary keyId.",
            CollisionReason::SubkeyEqualsForeignSubkey => {
                "Sub keyId equals existing sub keyId in key with different primary keyId."
            }
        }
    }
}

impl std::fmt::Display for CollisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for keytrust operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A user ID could not be split unambiguously into name and email
    #[error("Invalid user ID: {0}")]
    InvalidUserId(String),

    /// Candidate key violates keyring-wide key ID uniqueness
    #[error("{0}")]
    KeyIdCollision(CollisionReason),

    /// No self-certified, non-revoked user ID on the key
    #[error("No valid user ID on key {0}")]
    NoValidUser(String),

    /// User ID not found on the key
    #[error("User ID not found: {0}")]
    UidNotFound(String),

    /// Requested key was not found
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key material could not be parsed
    #[error("Certificate parsing failed: {0}")]
    Parse(String),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// rpgp OpenPGP error
    #[cfg(feature = "rpgp")]
    #[error("OpenPGP error: {0}")]
    OpenPgp(#[from] pgp::errors::Error),
}

/// A specialized Result type for keytrust operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<CollisionReason> for Error {
    fn from(reason: CollisionReason) -> Self {
        Error::KeyIdCollision(reason)
    }
}
