//! Payload masking (RFC 6455 Section 5.3).
//!
//! Client-to-server payloads arrive XORed with a 32-bit mask key; applying
//! the same XOR restores the plaintext.

/// Scalar byte-by-byte XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// XOR masking processing 4 bytes at a time using u32 operations.
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let (head, tail) = {
        let chunks = data.len() / 4;
        data.split_at_mut(chunks * 4)
    };

    for chunk in head.chunks_exact_mut(4) {
        let val = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        chunk.copy_from_slice(&(val ^ mask_u32).to_ne_bytes());
    }

    for (i, byte) in tail.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}
