//! The two-level scheme: a first-byte dispatch selects a per-bucket mask and cell run, applied to
//! the remaining key bytes.
//!
//! This covers sets a single mask cannot separate within budget -- typically fixed-width symbols
//! whose leading byte carries most of the entropy. The dispatch table always has 256 entries;
//! first bytes that start no key point at a shared, permanently empty cell, so absent inputs cost
//! the same two reads as present ones.

use super::cell::Cell;
use super::pext::pext;
use super::word;
use alloc::borrow::Cow;

#[cfg(feature = "build")]
use super::{mask::find_mask, mph::PolicyError};
#[cfg(feature = "build")]
use alloc::{vec, vec::Vec};

/// Number of dispatch entries, one per possible first byte.
const DISPATCH_LEN: usize = 256;

/// One dispatch entry: the mask and cell run serving keys with a particular first byte.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bucket {
    /// Separating mask over the key word with the first byte shifted out.
    pub(crate) mask: u64,
    /// Start of this bucket's run in the cell pool.
    pub(crate) offset: u32,
}

impl Bucket {
    /// The entry for first bytes that start no key: mask `0` always extracts slot `0`, and offset
    /// `0` is the shared empty cell.
    #[cfg(feature = "build")]
    const EMPTY: Self = Self { mask: 0, offset: 0 };

    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn __from_raw_parts(mask: u64, offset: u32) -> Self {
        Self { mask, offset }
    }
}

/// Tables of the two-level scheme.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "serde_support::SplitTableRepr"))]
pub struct SplitTable {
    /// First-byte dispatch; always [`DISPATCH_LEN`] entries.
    buckets: Cow<'static, [Bucket]>,
    /// Concatenated per-bucket cell runs. Cell `0` is the shared always-empty slot.
    cells: Cow<'static, [Cell]>,
}

impl SplitTable {
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn __from_raw_parts(
        buckets: Cow<'static, [Bucket]>,
        cells: Cow<'static, [Cell]>,
    ) -> Self {
        Self { buckets, cells }
    }

    /// Build tables for `keys`, giving every realized bucket a mask of at most `max_bits` bits
    /// over the key tails.
    ///
    /// The caller must have rejected empty and duplicate keys already.
    #[cfg(feature = "build")]
    pub(crate) fn try_build(keys: &[&[u8]], max_bits: u32) -> Result<Self, PolicyError> {
        if let Some(index) = keys.iter().position(|key| key.len() > word::WORD_BYTES) {
            return Err(PolicyError::KeyTooLong { index });
        }

        let mut groups: Vec<Vec<u32>> = vec![Vec::new(); DISPATCH_LEN];
        for (i, key) in keys.iter().enumerate() {
            groups[key[0] as usize].push(i as u32);
        }

        let mut buckets = vec![Bucket::EMPTY; DISPATCH_LEN];
        let mut cells = vec![Cell::EMPTY];
        for (first_byte, group) in groups.iter().enumerate() {
            if group.is_empty() {
                continue;
            }

            let tails: Vec<u64> = group
                .iter()
                .map(|&i| word::load(keys[i as usize]) >> 8)
                .collect();
            let mask = find_mask(&tails, max_bits).ok_or(PolicyError::BucketMaskNotFound {
                max_bits,
                first_byte: first_byte as u8,
            })?;

            let offset = cells.len() as u32;
            cells.resize(cells.len() + (1usize << max_bits), Cell::EMPTY);
            for (&i, &tail) in group.iter().zip(&tails) {
                let key = keys[i as usize];
                cells[offset as usize + pext(tail, mask) as usize] = Cell {
                    key: word::load(key),
                    index: i + 1,
                    len: key.len() as u32,
                };
            }
            buckets[first_byte] = Bucket { mask, offset };
        }

        Ok(Self {
            buckets: buckets.into(),
            cells: cells.into(),
        })
    }

    /// Look up `key`, returning its one-based index or `0`.
    #[inline]
    pub(crate) fn lookup(&self, key: &[u8]) -> u32 {
        let loaded = word::load(key);
        // SAFETY: the dispatch table has 256 entries and the index is a single byte; upheld by
        // construction and revalidated on deserialization.
        let bucket = unsafe { self.buckets.get_unchecked((loaded & 0xff) as usize) };
        let slot = bucket.offset as usize + pext(loaded >> 8, bucket.mask) as usize;
        // SAFETY: `offset + 2 ** mask.count_ones() <= cells.len()` for every bucket; upheld by
        // construction and revalidated on deserialization.
        let cell = unsafe { self.cells.get_unchecked(slot) };
        cell.select(loaded, key.len())
    }

    /// The backing cell pool.
    #[cfg(feature = "serde")]
    pub(crate) fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Scope for `serde`-related code.
#[cfg(feature = "serde")]
mod serde_support {
    use super::{pext, Bucket, Cell, Cow, SplitTable, DISPATCH_LEN};
    use displaydoc::Display;
    use thiserror::Error;

    /// Deserialization validation failures.
    #[derive(Debug, Display, Error)]
    pub enum Error {
        /// dispatch table does not have 256 entries
        WrongDispatchSize,

        /// bucket cell run exceeds the cell pool
        BucketOutOfBounds,

        /// stored cell is not addressed by its own key
        MisplacedCell,

        /// stored cell has an invalid length or stray padding bytes
        MalformedCell,
    }

    /// Raw fields of [`SplitTable`], validated with [`TryFrom`] during deserialization.
    #[derive(serde::Deserialize)]
    pub(super) struct SplitTableRepr {
        buckets: Cow<'static, [Bucket]>,
        cells: Cow<'static, [Cell]>,
    }

    impl TryFrom<SplitTableRepr> for SplitTable {
        type Error = Error;

        #[inline]
        fn try_from(repr: SplitTableRepr) -> Result<Self, Error> {
            if repr.buckets.len() != DISPATCH_LEN {
                return Err(Error::WrongDispatchSize);
            }

            for (first_byte, bucket) in repr.buckets.iter().enumerate() {
                // The bound `offset + 2 ** mask.count_ones() <= cells.len()` is what makes the
                // unchecked reads in `lookup` sound.
                let span = 1u64
                    .checked_shl(bucket.mask.count_ones())
                    .ok_or(Error::BucketOutOfBounds)?;
                let end = u64::from(bucket.offset)
                    .checked_add(span)
                    .ok_or(Error::BucketOutOfBounds)?;
                if end > repr.cells.len() as u64 {
                    return Err(Error::BucketOutOfBounds);
                }

                for slot in 0..span as usize {
                    let cell = &repr.cells[bucket.offset as usize + slot];
                    if cell.index == 0 {
                        continue;
                    }
                    if !cell.well_formed() {
                        return Err(Error::MalformedCell);
                    }
                    if (cell.key & 0xff) != first_byte as u64
                        || pext(cell.key >> 8, bucket.mask) != slot as u64
                    {
                        return Err(Error::MisplacedCell);
                    }
                }
            }

            Ok(Self {
                buckets: repr.buckets,
                cells: repr.cells,
            })
        }
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::Codegen for Bucket {
    #[inline]
    fn generate_piece(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let bucket = gen.path("mph::low_level::Bucket");
        let mask = gen.piece(&self.mask);
        let offset = gen.piece(&self.offset);
        quote::quote!(#bucket::__from_raw_parts(#mask, #offset))
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::Codegen for SplitTable {
    #[inline]
    fn generate_piece(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let split_table = gen.path("mph::low_level::SplitTable");
        let buckets = gen.piece(&self.buckets);
        let cells = gen.piece(&self.cells);
        quote::quote!(#split_table::__from_raw_parts(#buckets, #cells))
    }
}
