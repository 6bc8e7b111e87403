//! MurmurHash3 x86 32-bit.
//!
//! Traffic allocation requires every client runtime — whatever language it
//! is written in — to compute the identical bucket for the identical
//! visitor/group pair. MurmurHash3 x86_32 is the algorithm all of them
//! share: fast, good avalanche behavior on short keys, and specified
//! bit-exactly. This implementation follows the reference algorithm and is
//! pinned by the public test vectors below; changing a single constant here
//! silently reshuffles every visitor's assignment.

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

/// Computes the MurmurHash3 x86_32 hash of `data` with the given seed.
#[must_use]
pub fn murmur3_x86_32(data: &[u8], seed: u32) -> u32 {
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in chunks.by_ref() {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= mix_k(k);
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k: u32 = 0;
        for (i, &byte) in tail.iter().enumerate() {
            k ^= u32::from(byte) << (8 * i);
        }
        h ^= mix_k(k);
    }

    h ^= u32::try_from(data.len()).unwrap_or(u32::MAX);
    fmix(h)
}

#[inline]
fn mix_k(mut k: u32) -> u32 {
    k = k.wrapping_mul(C1);
    k = k.rotate_left(15);
    k.wrapping_mul(C2)
}

/// Final avalanche mix.
#[inline]
fn fmix(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^ (h >> 16)
}
