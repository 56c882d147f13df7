//! NetVantage Crypto - cryptographic primitives for the plugin fabric.
//!
//! This crate provides:
//! - Ed25519 key pairs and signatures, for the audit chain's signing key
//! - BLAKE3 content hashing, for audit chain linking
//! - AES-256-GCM envelope encryption (DEK/KEK) and an Argon2id-backed
//!   [`KeyManager`] state machine for the vault module's credential store
//!
//! # Example
//!
//! ```
//! use netvantage_crypto::{KeyPair, ContentHash};
//!
//! let keypair = KeyPair::generate();
//! let message = b"important data";
//! let signature = keypair.sign(message);
//! assert!(keypair.verify(message, &signature).is_ok());
//!
//! let hash = ContentHash::hash(message);
//! println!("Hash: {}", hash.to_hex());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod envelope;
mod error;
mod hash;
mod kdf;
mod key_manager;
mod keypair;
mod signature;
mod verifier;

pub use envelope::{aead_decrypt, aead_encrypt, Dek};
pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use kdf::{derive_kek, Kek, Salt};
pub use key_manager::{KeyManager, KeyManagerState, RewrapFn};
pub use keypair::{KeyPair, PublicKey};
pub use signature::Signature;
pub use verifier::{KeyId, SignatureVerifier};
