//! HMAC-SHA1 (RFC 2104) restricted to keys of at most one block.

use super::sha1::{BLOCK_LENGTH, DIGEST_LENGTH, sha1};
use crate::error::{Result, TotpError};

const INNER_PAD: u8 = 0x36;
const OUTER_PAD: u8 = 0x5C;

/// Compute `sha1(opad || sha1(ipad || message))`.
///
/// Keys longer than [`BLOCK_LENGTH`] are refused with
/// [`TotpError::KeyTooLong`] instead of being pre-hashed. Decoded TOTP
/// secrets are far below this limit.
pub fn hmac_sha1(key: &[u8], message: &[u8]) -> Result<[u8; DIGEST_LENGTH]> {
    if key.len() > BLOCK_LENGTH {
        return Err(TotpError::KeyTooLong {
            length: key.len(),
            max: BLOCK_LENGTH,
        });
    }

    let mut key_block = [0u8; BLOCK_LENGTH];
    key_block[..key.len()].copy_from_slice(key);

    let mut inner = Vec::with_capacity(BLOCK_LENGTH + message.len());
    inner.extend(key_block.iter().map(|b| b ^ INNER_PAD));
    inner.extend_from_slice(message);

    let mut outer = Vec::with_capacity(BLOCK_LENGTH + DIGEST_LENGTH);
    outer.extend(key_block.iter().map(|b| b ^ OUTER_PAD));
    outer.extend_from_slice(&sha1(&inner));

    Ok(sha1(&outer))
}
