//! HMAC-SHA256 signatures
//!
//! Used for the session cookie and for payment gateway requests. Signatures
//! are lowercase hex.

use data_encoding::HEXLOWER;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn mac(key: &[u8], message: &[u8]) -> HmacSha256 {
    // HMAC accepts keys of any length, so this cannot fail
    let mut mac = match HmacSha256::new_from_slice(key) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts any key length"),
    };
    mac.update(message);
    mac
}

/// Sign `message` with `key`, returning the lowercase hex digest
pub fn sign_hex(key: &[u8], message: &[u8]) -> String {
    HEXLOWER.encode(&mac(key, message).finalize().into_bytes())
}

/// Check a hex signature in constant time
pub fn verify_hex(key: &[u8], message: &[u8], signature: &str) -> bool {
    match HEXLOWER.decode(signature.as_bytes()) {
        Ok(bytes) => mac(key, message).verify_slice(&bytes).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let signature = sign_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_rejects_garbage() {
        assert!(!verify_hex(b"key", b"message", "not-hex"));
        assert!(!verify_hex(b"key", b"message", ""));
        assert!(!verify_hex(b"key", b"message", "ABCDEF"));
    }

    proptest! {
        #[test]
        fn prop_signature_verifies(key in prop::collection::vec(any::<u8>(), 0..64), message in ".*") {
            let signature = sign_hex(&key, message.as_bytes());
            prop_assert_eq!(signature.len(), 64);
            prop_assert!(verify_hex(&key, message.as_bytes(), &signature));
        }

        #[test]
        fn prop_other_key_does_not_verify(message in ".*") {
            let signature = sign_hex(b"first", message.as_bytes());
            prop_assert!(!verify_hex(b"second", message.as_bytes(), &signature));
        }
    }
}
