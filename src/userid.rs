//! User ID parsing.
//!
//! Splits a free-text OpenPGP user ID into a display name and an email
//! address. Input that does not fit one of the accepted shapes is refused
//! with [`Error::InvalidUserId`] instead of being guessed at:
//!
//! | Input                              | name           | email              |
//! |------------------------------------|----------------|--------------------|
//! | `Ada Lovelace <ada@example.com>`   | `Ada Lovelace` | `ada@example.com`  |
//! | `<ada@example.com>`                | empty          | `ada@example.com`  |
//! | `ada@example.com`                  | empty          | `ada@example.com`  |
//! | `Ada Lovelace`                     | `Ada Lovelace` | empty              |
//! | `Ada ada@example.com`              | invalid        | invalid            |

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+a-zA-Z0-9_.!#$%&'*/=?^`{|}~-]+@([a-zA-Z0-9-]+\.)+[a-zA-Z0-9]{2,63}$")
        .expect("email pattern is valid")
});

static NAME_ADDR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>[^<>]*?)\s*<(?P<email>[^<>]*)>$").expect("name-addr pattern is valid")
});

/// Name and email extracted from a user ID. Either may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub name: String,
    pub email: String,
}

/// Check an address against the strict email grammar.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// Parse a user ID into name and email.
///
/// # Errors
/// Returns `Error::InvalidUserId` if the string is empty, mixes an email
/// into free text without angle brackets, or carries a malformed email.
pub fn parse_user_id(user_id: &str) -> Result<UserIdentity> {
    let trimmed = user_id.trim();
    let invalid = || Error::InvalidUserId(user_id.to_string());

    if trimmed.is_empty() {
        return Err(invalid());
    }

    if let Some(caps) = NAME_ADDR.captures(trimmed) {
        let email = caps["email"].trim();
        if !is_valid_email(email) {
            return Err(invalid());
        }
        let name = unquote(caps["name"].trim());
        if name.contains('@') {
            return Err(invalid());
        }
        return Ok(UserIdentity {
            name: name.to_string(),
            email: email.to_string(),
        });
    }

    if trimmed.contains('<') || trimmed.contains('>') {
        return Err(invalid());
    }

    if is_valid_email(trimmed) {
        return Ok(UserIdentity {
            name: String::new(),
            email: trimmed.to_string(),
        });
    }

    if !trimmed.contains('@') {
        return Ok(UserIdentity {
            name: unquote(trimmed).to_string(),
            email: String::new(),
        });
    }

    Err(invalid())
}

/// Email of a user ID, if it parses and carries one.
pub fn email_of(user_id: &str) -> Option<String> {
    parse_user_id(user_id)
        .ok()
        .map(|identity| identity.email)
        .filter(|email| !email.is_empty())
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}
