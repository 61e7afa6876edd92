//! Credential fingerprinting.

use relaypool_types::Credentials;
use sha2::{Digest, Sha256};

/// Stable 12-hex-char identifier of a credential set.
///
/// Lets operators tell credential sets apart without ever seeing them.
pub fn fingerprint(credentials: &Credentials) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credentials.api_key.as_bytes());
    hasher.update(b":");
    hasher.update(credentials.access_token.as_bytes());
    let digest = hasher.finalize();
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}
