//! Cryptographic primitives behind TOTP derivation.
//!
//! Everything is implemented from scratch and kept one-shot: inputs are a
//! few dozen bytes at most.

/// Base32 secret decoding.
pub mod base32;
/// Keyed hashing.
pub mod hmac;
/// SHA-1 digest.
pub mod sha1;

pub use self::base32::decode as base32_decode;
pub use self::hmac::hmac_sha1;
pub use self::sha1::sha1;
