//! Keyring admission by key ID uniqueness.
//!
//! Within one keyring no two distinct keys may share a primary key ID or a
//! subkey ID. A candidate that breaks this is refused before any merge
//! logic sees it, since unrelated keys sharing IDs is the shape of a key
//! substitution attack. A candidate whose primary ID and fingerprint match
//! an existing key is an update of that key and is always admitted.

use tracing::{debug, warn};

use crate::error::{CollisionReason, Result};
use crate::keyring::KeyringView;
use crate::raw::RawKey;

/// Check that `candidate` may enter `keyring`.
///
/// # Errors
/// Returns `Error::KeyIdCollision` with the reason of the first violated
/// rule.
pub fn check_admission<K>(candidate: &RawKey, keyring: &K) -> Result<()>
where
    K: KeyringView + ?Sized,
{
    let primary_id = candidate.key_id();

    for existing in keyring.lookup(&primary_id) {
        if existing.key_id() != primary_id {
            return Err(reject(candidate, CollisionReason::PrimaryEqualsSubkey));
        }
        if existing.fingerprint() != candidate.fingerprint() {
            return Err(reject(candidate, CollisionReason::PrimaryEqualsForeignPrimary));
        }
    }

    for subkey_id in candidate.subkey_ids() {
        for existing in keyring.lookup(&subkey_id) {
            if existing.key_id() == subkey_id {
                return Err(reject(candidate, CollisionReason::SubkeyEqualsPrimary));
            }
            if existing.key_id() != primary_id {
                return Err(reject(candidate, CollisionReason::SubkeyEqualsForeignSubkey));
            }
        }
    }

    debug!(key_id = %primary_id, "key admitted");
    Ok(())
}

fn reject(candidate: &RawKey, reason: CollisionReason) -> crate::error::Error {
    warn!(
        key_id = %candidate.key_id(),
        fingerprint = %candidate.fingerprint(),
        %reason,
        "key refused"
    );
    reason.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::keyring::MemoryKeyring;
    use crate::raw::{Fingerprint, KeyId, KeyPacket, PublicKeyAlgorithm, RawSubkey};
    use chrono::{TimeZone, Utc};

    fn packet(id: u8, fpr: u8) -> KeyPacket {
        KeyPacket {
            key_id: KeyId::new([id; 8]),
            fingerprint: Fingerprint::new(vec![fpr; 20]),
            created: Utc.timestamp_opt(100, 0).unwrap(),
            algorithm: PublicKeyAlgorithm::EdDsa,
            bit_length: 256,
            curve: None,
            secret: None,
        }
    }

    fn key(primary: u8, subkeys: &[u8]) -> RawKey {
        key_with_fpr(primary, primary, subkeys)
    }

    fn key_with_fpr(primary: u8, fpr: u8, subkeys: &[u8]) -> RawKey {
        RawKey {
            primary: packet(primary, fpr),
            direct_signatures: vec![],
            users: vec![],
            subkeys: subkeys
                .iter()
                .map(|id| RawSubkey {
                    key: packet(*id, *id),
                    signatures: vec![],
                })
                .collect(),
        }
    }

    fn keyring_with(keys: Vec<RawKey>) -> MemoryKeyring {
        let mut keyring = MemoryKeyring::new();
        for k in keys {
            keyring.insert(k);
        }
        keyring
    }

    fn reason(result: Result<()>) -> CollisionReason {
        match result {
            Err(Error::KeyIdCollision(reason)) => reason,
            other => panic!("expected collision, got {:?}", other),
        }
    }

    #[test]
    fn test_fresh_key_is_admitted() {
        let keyring = keyring_with(vec![key(1, &[2, 3])]);
        assert!(check_admission(&key(10, &[11]), &keyring).is_ok());
    }

    #[test]
    fn test_same_key_with_new_subkey_is_admitted() {
        let keyring = keyring_with(vec![key(1, &[2, 3])]);
        assert!(check_admission(&key(1, &[2, 3, 4]), &keyring).is_ok());
    }

    #[test]
    fn test_primary_equal_to_existing_subkey() {
        let keyring = keyring_with(vec![key(1, &[2, 3])]);
        assert_eq!(
            reason(check_admission(&key(2, &[]), &keyring)),
            CollisionReason::PrimaryEqualsSubkey
        );
    }

    #[test]
    fn test_subkey_equal_to_existing_primary() {
        let keyring = keyring_with(vec![key(1, &[2, 3])]);
        assert_eq!(
            reason(check_admission(&key(10, &[1]), &keyring)),
            CollisionReason::SubkeyEqualsPrimary
        );
    }

    #[test]
    fn test_subkey_equal_to_foreign_subkey() {
        let keyring = keyring_with(vec![key(1, &[2, 3])]);
        assert_eq!(
            reason(check_admission(&key(10, &[3]), &keyring)),
            CollisionReason::SubkeyEqualsForeignSubkey
        );
    }

    #[test]
    fn test_primary_id_shared_by_different_fingerprint() {
        let keyring = keyring_with(vec![key(1, &[2])]);
        assert_eq!(
            reason(check_admission(&key_with_fpr(1, 99, &[]), &keyring)),
            CollisionReason::PrimaryEqualsForeignPrimary
        );
    }

    #[test]
    fn test_empty_keyring_admits_everything() {
        let keyring = MemoryKeyring::new();
        assert!(check_admission(&key(1, &[2, 3]), &keyring).is_ok());
    }
}
