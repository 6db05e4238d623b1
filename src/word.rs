//! Input word loading.
//!
//! Every policy operates on one fixed-width domain: the first (at most) eight bytes of a key,
//! packed little-endian into a `u64` and zero-padded. Mask synthesis and PEXT then apply
//! uniformly, no matter how long the original key was.

use byteorder::{ByteOrder, LittleEndian};

/// Number of key bytes that fit into one machine word.
pub(crate) const WORD_BYTES: usize = 8;

/// Pack the first eight bytes of `bytes` into a little-endian word.
///
/// Byte 0 lands in bits 0-7, byte 1 in bits 8-15, and so on; unused high bytes are zero. Bytes
/// past the eighth do not participate -- callers reject over-long inputs by comparing lengths.
#[inline]
#[must_use]
pub(crate) fn load(bytes: &[u8]) -> u64 {
    let n = bytes.len().min(WORD_BYTES);
    if n == 0 {
        0
    } else {
        LittleEndian::read_uint(&bytes[..n], n)
    }
}
