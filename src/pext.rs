//! Parallel bit extraction.
//!
//! `pext(value, mask)` gathers the bits of `value` at positions where `mask` has a one into the
//! contiguous low-order positions of the result. On x86-64 with BMI2 this is a single
//! instruction; everywhere else a portable loop computes the same result bit for bit.

/// Extract the bits of `value` selected by the one bits of `mask`.
///
/// Bit `i` of the result is the bit of `value` at the position of the `i`-th lowest one bit of
/// `mask`. Bits at and above `mask.count_ones()` are zero, so the result always fits in
/// `2 ** mask.count_ones()` values.
#[cfg(all(target_arch = "x86_64", target_feature = "bmi2"))]
#[inline(always)]
#[must_use]
pub(crate) fn pext(value: u64, mask: u64) -> u64 {
    // SAFETY: the `bmi2` target feature is statically enabled, checked by the `cfg` above.
    unsafe { core::arch::x86_64::_pext_u64(value, mask) }
}

/// Extract the bits of `value` selected by the one bits of `mask`.
///
/// Bit `i` of the result is the bit of `value` at the position of the `i`-th lowest one bit of
/// `mask`. Bits at and above `mask.count_ones()` are zero, so the result always fits in
/// `2 ** mask.count_ones()` values.
#[cfg(not(all(target_arch = "x86_64", target_feature = "bmi2")))]
#[inline(always)]
#[must_use]
pub(crate) fn pext(value: u64, mask: u64) -> u64 {
    pext_soft(value, mask)
}

/// Software PEXT, bit-exact with the hardware instruction.
///
/// Walks the one bits of `mask` from lowest to highest, shifting each selected bit of `value`
/// into the next free output position.
#[inline]
#[must_use]
pub(crate) const fn pext_soft(value: u64, mask: u64) -> u64 {
    let mut out = 0;
    let mut pos = 0;
    let mut rest = mask;
    while rest != 0 {
        let bit = rest & rest.wrapping_neg();
        if value & bit != 0 {
            out |= 1 << pos;
        }
        pos += 1;
        rest &= rest - 1;
    }
    out
}
