//! The single-mask scheme: one global mask over the packed key word, one cell array indexed by
//! the extracted bits.

use super::cell::Cell;
use super::pext::pext;
use super::word;
use alloc::borrow::Cow;

#[cfg(feature = "build")]
use super::{mask::find_mask, mph::PolicyError};
#[cfg(feature = "build")]
use alloc::{vec, vec::Vec};

/// Tables of the single-mask scheme.
///
/// A lookup is one PEXT and one cell read: `cells[pext(word, mask)]`, followed by the branch-free
/// accept against the stored key.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "serde_support::DirectTableRepr"))]
pub struct DirectTable {
    /// Separating mask: `pext(word, mask)` is distinct for every stored key.
    mask: u64,
    /// `1 << max_bits` cells; empty slots hold index `0`.
    cells: Cow<'static, [Cell]>,
}

impl DirectTable {
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn __from_raw_parts(mask: u64, cells: Cow<'static, [Cell]>) -> Self {
        Self { mask, cells }
    }

    /// Build tables for `keys` with a mask of at most `max_bits` bits.
    ///
    /// The caller must have rejected empty and duplicate keys already.
    #[cfg(feature = "build")]
    pub(crate) fn try_build(keys: &[&[u8]], max_bits: u32) -> Result<Self, PolicyError> {
        if let Some(index) = keys.iter().position(|key| key.len() > word::WORD_BYTES) {
            return Err(PolicyError::KeyTooLong { index });
        }

        let words: Vec<u64> = keys.iter().map(|key| word::load(key)).collect();
        let mask = find_mask(&words, max_bits).ok_or(PolicyError::MaskNotFound { max_bits })?;

        let mut cells = vec![Cell::EMPTY; 1usize << max_bits];
        for (i, (&key_word, key)) in words.iter().zip(keys).enumerate() {
            cells[pext(key_word, mask) as usize] = Cell {
                key: key_word,
                index: i as u32 + 1,
                len: key.len() as u32,
            };
        }

        Ok(Self {
            mask,
            cells: cells.into(),
        })
    }

    /// Look up `key`, returning its one-based index or `0`.
    #[inline]
    pub(crate) fn lookup(&self, key: &[u8]) -> u32 {
        let loaded = word::load(key);
        let slot = pext(loaded, self.mask) as usize;
        // SAFETY: `slot < 2 ** mask.count_ones() <= cells.len()`, upheld by construction and
        // revalidated on deserialization.
        let cell = unsafe { self.cells.get_unchecked(slot) };
        cell.select(loaded, key.len())
    }

    /// The backing cell array.
    #[cfg(feature = "serde")]
    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Scope for `serde`-related code.
#[cfg(feature = "serde")]
mod serde_support {
    use super::{pext, Cell, Cow, DirectTable};
    use displaydoc::Display;
    use thiserror::Error;

    /// Deserialization validation failures.
    #[derive(Debug, Display, Error)]
    pub enum Error {
        /// cell count does not cover the mask
        WrongCellCount,

        /// stored cell is not addressed by its own key
        MisplacedCell,

        /// stored cell has an invalid length or stray padding bytes
        MalformedCell,
    }

    /// Raw fields of [`DirectTable`], validated with [`TryFrom`] during deserialization.
    #[derive(serde::Deserialize)]
    pub(super) struct DirectTableRepr {
        mask: u64,
        cells: Cow<'static, [Cell]>,
    }

    impl TryFrom<DirectTableRepr> for DirectTable {
        type Error = Error;

        #[inline]
        fn try_from(repr: DirectTableRepr) -> Result<Self, Error> {
            // The bound `cells.len() >= 2 ** mask.count_ones()` is what makes the unchecked read
            // in `lookup` sound; everything after it is shape checking.
            let span = 1u64
                .checked_shl(repr.mask.count_ones())
                .ok_or(Error::WrongCellCount)?;
            if !repr.cells.len().is_power_of_two() || (repr.cells.len() as u64) < span {
                return Err(Error::WrongCellCount);
            }

            for (slot, cell) in repr.cells.iter().enumerate() {
                if cell.index == 0 {
                    continue;
                }
                if !cell.well_formed() {
                    return Err(Error::MalformedCell);
                }
                if pext(cell.key, repr.mask) != slot as u64 {
                    return Err(Error::MisplacedCell);
                }
            }

            Ok(Self {
                mask: repr.mask,
                cells: repr.cells,
            })
        }
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::Codegen for DirectTable {
    #[inline]
    fn generate_piece(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let direct_table = gen.path("mph::low_level::DirectTable");
        let mask = gen.piece(&self.mask);
        let cells = gen.piece(&self.cells);
        quote::quote!(#direct_table::__from_raw_parts(#mask, #cells))
    }
}
