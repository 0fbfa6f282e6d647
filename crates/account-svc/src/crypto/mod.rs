//! AES-256-GCM field encryption primitives.
//!
//! This module is intentionally free of storage and HTTP dependencies.
//!
//! # Persisted format
//!
//! ```text
//! nonce:      24 lowercase hex chars (12 bytes)
//! ciphertext: lowercase hex of aead-ciphertext || 16-byte tag
//! ```
//!
//! The format is shared with records written by earlier deployments and must
//! not change.

pub mod cipher;
pub mod key;

pub use cipher::{CipherError, FieldCipher, HexField};
pub use key::FieldKey;
