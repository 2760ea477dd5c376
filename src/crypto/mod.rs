//! Cryptographic utilities for the proof gateway
//!
//! Provides:
//! - Public key hashing (SHA-256 short ids)
//! - Ed25519 public key parsing and validation

mod pubkey;

pub use pubkey::*;
