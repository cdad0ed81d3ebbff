//! Storage signer: turns opaque object references into short-lived URLs.
//!
//! Every URL handed to a client is minted here at request time.

use chrono::Utc;
use sonogen_core::credentials::hmac_sha256_hex;

use crate::config::StorageConfig;

pub trait StorageSigner: Send + Sync {
    /// A temporary URL for `object_ref`.
    fn sign(&self, object_ref: &str) -> String;

    /// Lifetime of URLs returned by [`StorageSigner::sign`].
    fn ttl_secs(&self) -> u64;
}

/// Signs `{public_url}/{object_ref}?expires=<unix>&signature=<hex>` where the
/// signature is HMAC-SHA256 over `"{object_ref}:{expires}"`.
pub struct HmacUrlSigner {
    public_url: String,
    secret: String,
    ttl_secs: u64,
}

impl HmacUrlSigner {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            public_url: config.public_url.trim_end_matches('/').to_string(),
            secret: config.signing_secret.clone(),
            ttl_secs: config.signed_url_ttl_secs,
        }
    }

    fn sign_at(&self, object_ref: &str, now_unix: i64) -> String {
        let object_ref = object_ref.trim_start_matches('/');
        let expires = now_unix + self.ttl_secs as i64;
        let signature = hmac_sha256_hex(&self.secret, format!("{object_ref}:{expires}").as_bytes());
        format!(
            "{}/{object_ref}?expires={expires}&signature={signature}",
            self.public_url
        )
    }
}

impl StorageSigner for HmacUrlSigner {
    fn sign(&self, object_ref: &str) -> String {
        self.sign_at(object_ref, Utc::now().timestamp())
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> HmacUrlSigner {
        HmacUrlSigner::new(&StorageConfig {
            public_url: "https://cdn.test/bucket/".into(),
            signing_secret: "s3cret".into(),
            signed_url_ttl_secs: 600,
        })
    }

    #[test]
    fn url_carries_expiry_and_signature() {
        let url = signer().sign_at("/results/a.png", 1_000);
        let expected_sig = hmac_sha256_hex("s3cret", b"results/a.png:1600");
        assert_eq!(
            url,
            format!("https://cdn.test/bucket/results/a.png?expires=1600&signature={expected_sig}")
        );
    }

    #[test]
    fn different_objects_get_different_signatures() {
        let s = signer();
        assert_ne!(s.sign_at("a.png", 0), s.sign_at("b.png", 0));
    }
}
