//! Content hashing and pluggable secret decoding for the orchestration
//! pipeline.
//!
//! Trimmed down from a broader cryptographic toolkit to just the two
//! primitives this system actually needs: BLAKE3 fingerprinting for
//! idempotency keys, and a swappable secret decoder for plugin config.
//! Signing/verification and key-pair management did not carry over — see
//! the crate's entry in the root `DESIGN.md`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod fingerprint;
mod secret;

pub use fingerprint::{idempotency_fingerprint, Fingerprint};
pub use secret::{Base64Decoder, NoopDecoder, SecretDecoder, SecretError, SecretResult};
