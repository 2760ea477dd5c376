//! Binary proof codec
//!
//! Shard hosts ship proofs in a compact binary form: MessagePack with named
//! fields, zlib compressed, base64 encoded on the wire. The gateway decodes
//! skeletons it receives and encodes the full proofs it returns when the
//! client asks for the base64 representation.

mod anchors;

use std::io::{Read, Write};

use base64::Engine;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use thiserror::Error;

use crate::domain::ChainpointProof;

pub use anchors::{parse_anchors_complete, AnchorType};

/// Errors raised while encoding or decoding a binary proof
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("compression error: {0}")]
    Compression(#[from] std::io::Error),

    #[error("messagepack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("messagepack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("proof structure error: {0}")]
    Structure(#[from] serde_json::Error),
}

/// Opaque proof codec used by the retrieval pipeline.
pub trait ProofCodec: Send + Sync {
    /// Encode a proof to its compact binary form.
    fn encode(&self, proof: &ChainpointProof) -> Result<Vec<u8>, CodecError>;

    /// Decode a proof from its compact binary form.
    fn decode(&self, bytes: &[u8]) -> Result<ChainpointProof, CodecError>;

    fn encode_base64(&self, proof: &ChainpointProof) -> Result<String, CodecError> {
        let bytes = self.encode(proof)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    fn decode_base64(&self, encoded: &str) -> Result<ChainpointProof, CodecError> {
        let bytes = decode_base64_any(encoded)?;
        self.decode(&bytes)
    }
}

/// MessagePack + zlib codec compatible with the shard hosts.
#[derive(Debug, Clone)]
pub struct ChainpointBinaryCodec {
    compression: Compression,
}

impl ChainpointBinaryCodec {
    pub fn new() -> Self {
        Self {
            compression: Compression::best(),
        }
    }
}

impl Default for ChainpointBinaryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ProofCodec for ChainpointBinaryCodec {
    fn encode(&self, proof: &ChainpointProof) -> Result<Vec<u8>, CodecError> {
        // Go through a JSON value so every map has a known length for MessagePack.
        let value = serde_json::to_value(proof)?;
        let packed = rmp_serde::to_vec_named(&value)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), self.compression);
        encoder.write_all(&packed)?;
        Ok(encoder.finish()?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<ChainpointProof, CodecError> {
        let mut packed = Vec::new();
        ZlibDecoder::new(bytes).read_to_end(&mut packed)?;

        let value: serde_json::Value = rmp_serde::from_slice(&packed)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Decode base64 with flexible format support (standard, URL-safe, with/without padding).
fn decode_base64_any(s: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = s.trim();
    base64::engine::general_purpose::STANDARD
        .decode(trimmed)
        .or_else(|_| base64::engine::general_purpose::STANDARD_NO_PAD.decode(trimmed))
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(trimmed))
        .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(trimmed))
}
