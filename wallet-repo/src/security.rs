//! API key generation and hashing.

use rand::RngCore;
use sha2::{Digest, Sha256};

/// Prefix carried by every wallet API key.
pub const API_KEY_PREFIX: &str = "wk_";

/// Generates a fresh API key: `wk_` followed by 32 random bytes in hex.
pub fn generate_api_key() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}{}", API_KEY_PREFIX, hex::encode(bytes))
}

/// Hashes an API key using SHA-256.
pub fn hash_api_key(key: &str) -> String {
    let hash = Sha256::digest(key.as_bytes());
    hex::encode(hash)
}
