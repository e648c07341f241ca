use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header LINE uses to carry the body signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verifies webhook bodies against the channel secret.
///
/// The platform signs the raw request body with HMAC-SHA256 keyed by the
/// channel secret and sends the base64 digest in `X-Line-Signature`.
pub struct SignatureVerifier {
    keyed: HmacSha256,
}

impl SignatureVerifier {
    pub fn new(channel_secret: &str) -> Result<Self, SignatureError> {
        let keyed = HmacSha256::new_from_slice(channel_secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        Ok(Self { keyed })
    }

    /// Check `signature` (the header value, if any) against `body`.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Result<(), SignatureError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(SignatureError::Missing)?;

        let expected = base64::engine::general_purpose::STANDARD
            .decode(signature)
            .map_err(|_| SignatureError::Malformed)?;

        // verify_slice compares in constant time.
        self.mac(body)
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }

    /// Compute the base64 signature for `body`. Used by local tooling and tests.
    pub fn sign(&self, body: &[u8]) -> String {
        let digest = self.mac(body).finalize().into_bytes();
        base64::engine::general_purpose::STANDARD.encode(digest)
    }

    fn mac(&self, body: &[u8]) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(body);
        mac
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing X-Line-Signature header")]
    Missing,

    #[error("Invalid signature")]
    Malformed,

    #[error("Invalid signature")]
    Mismatch,

    #[error("Invalid channel secret")]
    InvalidSecret,
}
