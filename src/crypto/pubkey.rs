//! Ed25519 public key identification

use base64::Engine;
use ed25519_dalek::{VerifyingKey, PUBLIC_KEY_LENGTH};
use sha2::{Digest, Sha256};

/// Hex characters kept from the key digest
pub const PUB_KEY_HASH_LENGTH: usize = 12;

/// Error type for public key handling
#[derive(Debug, thiserror::Error)]
pub enum PublicKeyError {
    #[error("invalid base64 public key: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("invalid public key length: expected {PUBLIC_KEY_LENGTH}, got {0}")]
    Length(usize),

    #[error("invalid ed25519 public key")]
    InvalidKey,

    #[error("public key hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch { expected: String, computed: String },
}

/// Short identifier of a raw public key: the first 12 hex chars of its SHA-256.
pub fn pub_key_hash(key_bytes: &[u8]) -> String {
    let digest = Sha256::digest(key_bytes);
    let mut hash = hex::encode(digest);
    hash.truncate(PUB_KEY_HASH_LENGTH);
    hash
}

/// Decode a standard base64 public key
pub fn decode_public_key(encoded: &str) -> Result<Vec<u8>, PublicKeyError> {
    Ok(base64::engine::general_purpose::STANDARD.decode(encoded.trim())?)
}

/// Parse a base64 public key and check it against its advertised hash.
pub fn verifying_key_for(
    expected_hash: &str,
    encoded: &str,
) -> Result<VerifyingKey, PublicKeyError> {
    let bytes = decode_public_key(encoded)?;

    let computed = pub_key_hash(&bytes);
    if computed != expected_hash {
        return Err(PublicKeyError::HashMismatch {
            expected: expected_hash.to_string(),
            computed,
        });
    }

    let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| PublicKeyError::Length(bytes.len()))?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| PublicKeyError::InvalidKey)
}
