//! Random identifiers for session records.

use rand::RngCore;
use uuid::Uuid;

/// Bytes of entropy in a session key.
pub const SESSION_KEY_BYTES: usize = 32;

/// Generates a hex-encoded session key from the OS-seeded thread RNG.
pub fn generate_session_key() -> String {
    let mut bytes = [0u8; SESSION_KEY_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Generates the public identifier (`jti`) of a session record.
pub fn generate_jti() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_session_key_is_hex_of_expected_length() {
        let key = generate_session_key();
        assert_eq!(key.len(), SESSION_KEY_BYTES * 2);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_keys_do_not_repeat() {
        let keys: HashSet<String> = (0..256).map(|_| generate_session_key()).collect();
        assert_eq!(keys.len(), 256);
    }

    #[test]
    fn test_jti_is_uuid() {
        assert!(Uuid::parse_str(&generate_jti()).is_ok());
        assert_ne!(generate_jti(), generate_jti());
    }
}
