//! HMAC-SHA256 signatures over payment confirmations.
//!
//! The gateway signs `"{order_id}|{payment_id}"` with the shared secret and
//! sends the hex-encoded MAC back alongside the two ids.

use hmac::{Hmac, Mac};
use mentorline_types::error::EngineError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn signing_payload(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}|{payment_id}")
}

/// Compute the hex-encoded signature the gateway attaches to a confirmation.
pub fn sign_payment(
    order_id: &str,
    payment_id: &str,
    secret: &[u8],
) -> Result<String, EngineError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret)
        .map_err(|e| EngineError::Validation(format!("invalid payment secret: {e}")))?;
    mac.update(signing_payload(order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a confirmation signature in constant time.
///
/// Malformed hex is treated as a mismatch.
pub fn verify_payment_signature(
    order_id: &str,
    payment_id: &str,
    signature_hex: &str,
    secret: &[u8],
) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret) else {
        return false;
    };
    mac.update(signing_payload(order_id, payment_id).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"test-gateway-secret";

    #[test]
    fn test_signature_verifies() {
        let sig = sign_payment("order_1", "pay_1", SECRET).unwrap();
        assert_eq!(sig.len(), 64);
        assert!(verify_payment_signature("order_1", "pay_1", &sig, SECRET));
    }

    #[test]
    fn test_signature_rejects_other_ids() {
        let sig = sign_payment("order_1", "pay_1", SECRET).unwrap();
        assert!(!verify_payment_signature("order_1", "pay_2", &sig, SECRET));
        assert!(!verify_payment_signature("order_2", "pay_1", &sig, SECRET));
    }

    #[test]
    fn test_signature_rejects_other_secret() {
        let sig = sign_payment("order_1", "pay_1", SECRET).unwrap();
        assert!(!verify_payment_signature("order_1", "pay_1", &sig, b"other"));
    }

    #[test]
    fn test_signature_rejects_malformed_hex() {
        assert!(!verify_payment_signature("order_1", "pay_1", "not-hex", SECRET));
        assert!(!verify_payment_signature("order_1", "pay_1", "", SECRET));
    }

    #[test]
    fn test_separator_is_part_of_payload() {
        // "ab|c" and "a|bc" must not collide.
        let sig = sign_payment("ab", "c", SECRET).unwrap();
        assert!(!verify_payment_signature("a", "bc", &sig, SECRET));
    }
}
