use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Computes and verifies the `HashSHA256` header: HMAC-SHA-256 of the
/// request body under a shared secret.
#[derive(Clone)]
pub struct HashService {
    secret: Vec<u8>,
}

impl HashService {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self { secret: secret.into() }
    }

    pub fn sha256sum(&self, msg: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(msg);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison against a hex-encoded expected digest.
    pub fn matches(&self, msg: &[u8], expected: &str) -> bool {
        let actual = self.sha256sum(msg);
        actual.as_bytes().ct_eq(expected.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_own_digest() {
        let svc = HashService::new("secret");
        let digest = svc.sha256sum(b"Body text");
        assert!(svc.matches(b"Body text", &digest));
    }

    #[test]
    fn rejects_digest_of_different_body() {
        let svc = HashService::new("secret");
        let digest = svc.sha256sum(b"Body text");
        assert!(!svc.matches(b"Body hey", &digest));
    }
}
