//! RFC 4648 Base32 decoding for shared secrets.

use crate::error::{Result, TotpError};

const PADDING: char = '=';
const CHUNK_LENGTH: usize = 8;

/// Decode an upper-case RFC 4648 Base32 string into raw bytes.
///
/// Input is right-padded with `=` to a multiple of 8 characters. Padding
/// characters contribute no bits, and trailing bits that do not fill a whole
/// byte are discarded.
///
/// # Examples
///
/// ```rust
/// use badger_totp::crypto::base32::decode;
///
/// assert_eq!(decode("JBSWY3DP").unwrap(), b"Hello");
/// ```
pub fn decode(message: &str) -> Result<Vec<u8>> {
    let chars: Vec<char> = message.chars().collect();
    let mut decoded = Vec::with_capacity(chars.len() * 5 / 8);

    for (index, chunk) in chars.chunks(CHUNK_LENGTH).enumerate() {
        // A missing tail would be `=`, which carries no bits.
        let mut bits = 0u32;
        let mut buffer = 0u64;

        for (offset, &c) in chunk.iter().enumerate() {
            if c == PADDING {
                continue;
            }

            let value = value_of(c).ok_or(TotpError::InvalidBase32Character {
                character: c,
                position: index * CHUNK_LENGTH + offset,
            })?;

            buffer = (buffer << 5) | u64::from(value);
            bits += 5;

            if bits >= 8 {
                bits -= 8;
                decoded.push((buffer >> bits) as u8);
                buffer &= (1 << bits) - 1;
            }
        }
    }

    Ok(decoded)
}

/// Position of `c` in the `A-Z2-7` alphabet.
#[inline]
fn value_of(c: char) -> Option<u8> {
    match c {
        'A'..='Z' => Some(c as u8 - b'A'),
        '2'..='7' => Some(c as u8 - b'2' + 26),
        _ => None,
    }
}
