//! HMAC-SHA256 signatures used by Razorpay Checkout and webhooks.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Compares `signature` with the expected one in constant time.
pub fn verify(payload: &[u8], signature: &str, secret: &str) -> bool {
    let expected = sign(payload, secret);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}

/// Signature Checkout returns for a successful payment: HMAC of
/// `"{order_id}|{payment_id}"` under the key secret.
pub fn payment_signature(order_id: &str, payment_id: &str, key_secret: &str) -> String {
    sign(format!("{order_id}|{payment_id}").as_bytes(), key_secret)
}

/// Verifies a Checkout response. Any empty input fails.
pub fn verify_payment(key_secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    if key_secret.is_empty() || order_id.is_empty() || payment_id.is_empty() || signature.is_empty()
    {
        return false;
    }
    let payload = format!("{order_id}|{payment_id}");
    verify(payload.as_bytes(), signature, key_secret)
}

/// Verifies the `x-razorpay-signature` header of a webhook delivery.
/// Fails when either the secret or the header is missing.
pub fn verify_webhook(webhook_secret: Option<&str>, body: &[u8], signature: Option<&str>) -> bool {
    match (webhook_secret, signature) {
        (Some(secret), Some(sig)) if !secret.is_empty() && !sig.is_empty() => {
            verify(body, sig, secret)
        }
        _ => false,
    }
}
