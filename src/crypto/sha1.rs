//! SHA-1 digest (FIPS 180-4), one-shot.
//!
//! Only used as the compression function behind HMAC for TOTP. SHA-1 is
//! broken for collision resistance, not for HMAC.

/// Digest length in bytes.
pub const DIGEST_LENGTH: usize = 20;
/// Internal block length in bytes.
pub const BLOCK_LENGTH: usize = 64;

const INITIAL_STATE: [u32; 5] = [
    0x6745_2301,
    0xEFCD_AB89,
    0x98BA_DCFE,
    0x1032_5476,
    0xC3D2_E1F0,
];

const K: [u32; 4] = [0x5A82_7999, 0x6ED9_EBA1, 0x8F1B_BCDC, 0xCA62_C1D6];

/// Compute the SHA-1 digest of `message`.
///
/// # Examples
///
/// ```rust
/// use badger_totp::crypto::sha1::sha1;
///
/// let digest = sha1(b"");
/// assert_eq!(digest[..4], [0xda, 0x39, 0xa3, 0xee]);
/// ```
pub fn sha1(message: &[u8]) -> [u8; DIGEST_LENGTH] {
    let mut state = INITIAL_STATE;

    for block in pad(message).chunks_exact(BLOCK_LENGTH) {
        compress(&mut state, block);
    }

    let mut digest = [0u8; DIGEST_LENGTH];
    for (out, word) in digest.chunks_exact_mut(4).zip(state) {
        out.copy_from_slice(&word.to_be_bytes());
    }
    digest
}

/// Append `0x80`, zero bytes up to 56 mod 64 and the big-endian bit length.
fn pad(message: &[u8]) -> Vec<u8> {
    let bit_length = (message.len() as u64).wrapping_mul(8);
    let zeros = (BLOCK_LENGTH - (message.len() + 9) % BLOCK_LENGTH) % BLOCK_LENGTH;

    let mut padded = Vec::with_capacity(message.len() + 9 + zeros);
    padded.extend_from_slice(message);
    padded.push(0x80);
    padded.resize(padded.len() + zeros, 0);
    padded.extend_from_slice(&bit_length.to_be_bytes());
    padded
}

/// Expand a 64-byte block into the 80-word message schedule.
fn schedule(block: &[u8]) -> [u32; 80] {
    let mut w = [0u32; 80];

    for (word, bytes) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    for i in 16..80 {
        w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
    }

    w
}

fn compress(state: &mut [u32; 5], block: &[u8]) {
    let w = schedule(block);
    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (i, word) in w.iter().enumerate() {
        let (f, k) = match i {
            0..=19 => ((b & c) | (!b & d), K[0]),
            20..=39 => (b ^ c ^ d, K[1]),
            40..=59 => ((b & c) | (b & d) | (c & d), K[2]),
            _ => (b ^ c ^ d, K[3]),
        };

        let temp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(*word);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = temp;
    }

    for (h, v) in state.iter_mut().zip([a, b, c, d, e]) {
        *h = h.wrapping_add(v);
    }
}
