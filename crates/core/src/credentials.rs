//! Session credentials and callback signatures.
//!
//! A session credential is the only thing a client holds to prove control
//! of a job. The plaintext is handed out once at upload time; the server
//! stores and compares SHA-256 digests only.

use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::hashing::{hex_decode, hex_encode, sha256_hex};

/// Length of a generated session credential (alphanumeric characters).
pub const CREDENTIAL_LENGTH: usize = 48;

/// Header carrying the hex HMAC of a worker or payment callback body.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// A freshly issued credential.
pub struct IssuedCredential {
    /// Returned to the uploader exactly once, never stored.
    pub plaintext: String,
    /// SHA-256 hex digest stored on the job.
    pub hash: String,
}

pub fn generate_session_credential() -> IssuedCredential {
    let plaintext: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(CREDENTIAL_LENGTH)
        .map(char::from)
        .collect();
    let hash = hash_credential(&plaintext);
    IssuedCredential { plaintext, hash }
}

/// Digest used to look a presented credential up.
pub fn hash_credential(credential: &str) -> String {
    sha256_hex(credential.as_bytes())
}

// ---------------------------------------------------------------------------
// HMAC signatures
// ---------------------------------------------------------------------------

type HmacSha256 = Hmac<Sha256>;

fn mac_for(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length")
}

/// Hex HMAC-SHA256 of `message` under `secret`.
pub fn hmac_sha256_hex(secret: &str, message: &[u8]) -> String {
    let mut mac = mac_for(secret);
    mac.update(message);
    hex_encode(mac.finalize().into_bytes())
}

/// Signature a worker or payment provider sends in [`SIGNATURE_HEADER`].
pub fn sign_callback_body(secret: &str, body: &[u8]) -> String {
    hmac_sha256_hex(secret, body)
}

/// Constant-time check of a presented hex signature against `body`.
pub fn verify_callback_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Some(expected) = hex_decode(signature.trim()) else {
        return false;
    };
    let mut mac = mac_for(secret);
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_has_expected_shape() {
        let issued = generate_session_credential();
        assert_eq!(issued.plaintext.len(), CREDENTIAL_LENGTH);
        assert!(issued.plaintext.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(issued.hash.len(), 64);
        assert_eq!(issued.hash, hash_credential(&issued.plaintext));
    }

    #[test]
    fn credentials_are_unique() {
        let a = generate_session_credential();
        let b = generate_session_credential();
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn signature_round_trip() {
        let body = br#"{"variant_index":0}"#;
        let sig = sign_callback_body("secret", body);
        assert!(verify_callback_signature("secret", body, &sig));
    }

    #[test]
    fn signature_rejects_tampering() {
        let sig = sign_callback_body("secret", b"{}");
        assert!(!verify_callback_signature("other", b"{}", &sig));
        assert!(!verify_callback_signature("secret", b"{ }", &sig));
        assert!(!verify_callback_signature("secret", b"{}", "not-hex"));
        assert!(!verify_callback_signature("secret", b"{}", ""));
    }
}
