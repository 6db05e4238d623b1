//! The public construct: policy selection, validation, and the lookup entry point.

use super::direct::DirectTable;
use super::split::SplitTable;
use displaydoc::Display;
use thiserror::Error;

#[cfg(feature = "build")]
use alloc::vec::Vec;

/// Largest table exponent any policy accepts.
#[cfg(feature = "build")]
const MAX_TABLE_BITS: u32 = 16;

/// A hash strategy.
///
/// Policies differ in how they turn the packed key word into a table slot; all of them share the
/// same verification step and the same `0`-or-index contract. [`Mph::try_from_keys`] picks one
/// automatically, [`Mph::try_with_policy`] forces one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Policy {
    /// One global mask over the whole key word and a single table of `1 << max_bits` cells.
    Direct {
        /// Upper bound on the mask's bit count; the table has `1 << max_bits` cells.
        max_bits: u32,
    },
    /// A 256-entry first-byte dispatch to per-bucket masks over the remaining bytes, each bucket
    /// with its own `1 << max_bits`-cell run.
    SplitOnFirstChar {
        /// Upper bound on each bucket mask's bit count.
        max_bits: u32,
    },
}

/// Policies tried by [`Mph::try_from_keys`], in order.
///
/// Small direct tables first, then the 64 KiB direct table, then the two-level split tables for
/// sets a single mask cannot separate.
pub const DEFAULT_CASCADE: &[Policy] = &[
    Policy::Direct { max_bits: 7 },
    Policy::Direct { max_bits: 8 },
    Policy::Direct { max_bits: 16 },
    Policy::SplitOnFirstChar { max_bits: 7 },
    Policy::SplitOnFirstChar { max_bits: 8 },
];

impl Policy {
    /// Materialize this policy's tables for `keys`.
    ///
    /// # Panics
    ///
    /// Panics if `max_bits` exceeds 16: such tables would be megabytes large, far past the point
    /// where this scheme makes sense.
    #[cfg(feature = "build")]
    fn try_build(self, keys: &[&[u8]]) -> Result<Tables, PolicyError> {
        match self {
            Self::Direct { max_bits } => {
                assert!(max_bits <= MAX_TABLE_BITS, "direct table too large");
                DirectTable::try_build(keys, max_bits).map(Tables::Direct)
            }
            Self::SplitOnFirstChar { max_bits } => {
                assert!(max_bits <= MAX_TABLE_BITS, "bucket tables too large");
                SplitTable::try_build(keys, max_bits).map(Tables::Split)
            }
        }
    }
}

/// Reasons a single policy cannot serve a key set.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// key at position {index} is longer than eight bytes
    KeyTooLong {
        /// Position of the offending key in construction order.
        index: usize,
    },

    /// no separating mask of at most {max_bits} bits exists
    MaskNotFound {
        /// The bit budget that was exceeded.
        max_bits: u32,
    },

    /// no separating mask of at most {max_bits} bits exists for keys starting with byte {first_byte}
    BucketMaskNotFound {
        /// The bit budget that was exceeded.
        max_bits: u32,
        /// First byte of the bucket that could not be separated.
        first_byte: u8,
    },
}

/// Construction failures.
///
/// Lookups, by contrast, never fail: any input that is not a key maps to `0`.
#[derive(Clone, Copy, Debug, Display, Error, PartialEq, Eq)]
pub enum BuildError {
    /// the key set is empty
    NoKeys,

    /// key at position {index} is empty
    EmptyKey {
        /// Position of the offending key in construction order.
        index: usize,
    },

    /// keys at positions {first} and {second} are identical
    DuplicateKey {
        /// Position of the earlier copy.
        first: usize,
        /// Position of the later copy.
        second: usize,
    },

    /// no applicable policy: {0}
    NoViablePolicy(#[source] PolicyError),
}

/// Materialized tables of whichever policy was chosen.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum Tables {
    /// Single-mask scheme.
    Direct(DirectTable),
    /// First-byte dispatch scheme.
    Split(SplitTable),
}

impl Tables {
    #[inline]
    fn lookup(&self, key: &[u8]) -> u32 {
        match self {
            Self::Direct(table) => table.lookup(key),
            Self::Split(table) => table.lookup(key),
        }
    }

    /// The backing cell pool, for whole-table validation.
    #[cfg(feature = "serde")]
    fn cells(&self) -> &[super::cell::Cell] {
        match self {
            Self::Direct(table) => table.cells(),
            Self::Split(table) => table.cells(),
        }
    }
}

/// A minimal perfect hash over a fixed set of short keys.
///
/// Maps every key to its one-based position in construction order and every other byte string to
/// `0`. The key set is frozen at construction; lookups read immutable tables, never allocate, and
/// are safe to share across threads without coordination.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "serde_support::MphRepr"))]
pub struct Mph {
    /// The chosen policy's tables.
    tables: Tables,
    /// Length of the longest key. Longer inputs cannot match and skip the tables entirely.
    max_len: u32,
    /// Number of keys.
    len: u32,
}

#[cfg(feature = "build")]
impl Mph {
    /// Build a table for `keys`, trying the policies of [`DEFAULT_CASCADE`] in order.
    ///
    /// Keys must be non-empty, distinct, and at most eight bytes long. If no policy in the
    /// cascade can separate the set, the error carries the first policy's failure.
    ///
    /// # Errors
    ///
    /// See [`BuildError`].
    pub fn try_from_keys<K, I>(keys: I) -> Result<Self, BuildError>
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = K>,
    {
        let owned: Vec<K> = keys.into_iter().collect();
        let keys: Vec<&[u8]> = owned.iter().map(AsRef::as_ref).collect();
        validate(&keys)?;

        let mut first_failure = None;
        for &policy in DEFAULT_CASCADE {
            match policy.try_build(&keys) {
                Ok(tables) => return Ok(Self::assemble(tables, &keys)),
                Err(failure) => {
                    first_failure.get_or_insert(failure);
                }
            }
        }
        Err(BuildError::NoViablePolicy(
            first_failure.expect("the cascade is not empty"),
        ))
    }

    /// Build a table for `keys`, trying the policies of [`DEFAULT_CASCADE`] in order.
    ///
    /// # Panics
    ///
    /// Panics if construction fails; see [`Mph::try_from_keys`].
    #[must_use]
    pub fn from_keys<K, I>(keys: I) -> Self
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = K>,
    {
        Self::try_from_keys(keys).unwrap_or_else(|err| panic!("cannot build keyword table: {err}"))
    }

    /// Build a table for `keys` with a specific policy instead of the cascade.
    ///
    /// The result is observationally identical to what any other applicable policy produces; only
    /// footprint and table layout differ.
    ///
    /// # Errors
    ///
    /// See [`BuildError`].
    ///
    /// # Panics
    ///
    /// Panics if the policy's `max_bits` exceeds 16.
    pub fn try_with_policy<K, I>(keys: I, policy: Policy) -> Result<Self, BuildError>
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = K>,
    {
        let owned: Vec<K> = keys.into_iter().collect();
        let keys: Vec<&[u8]> = owned.iter().map(AsRef::as_ref).collect();
        validate(&keys)?;
        let tables = policy.try_build(&keys).map_err(BuildError::NoViablePolicy)?;
        Ok(Self::assemble(tables, &keys))
    }

    /// Build a table for `keys` with a specific policy instead of the cascade.
    ///
    /// # Panics
    ///
    /// Panics if construction fails; see [`Mph::try_with_policy`].
    #[must_use]
    pub fn with_policy<K, I>(keys: I, policy: Policy) -> Self
    where
        K: AsRef<[u8]>,
        I: IntoIterator<Item = K>,
    {
        Self::try_with_policy(keys, policy)
            .unwrap_or_else(|err| panic!("cannot build keyword table: {err}"))
    }

    /// Wrap freshly built tables together with the key set's summary numbers.
    fn assemble(tables: Tables, keys: &[&[u8]]) -> Self {
        let max_len = keys.iter().map(|key| key.len()).max().unwrap_or(0);
        Self {
            tables,
            max_len: max_len as u32,
            len: keys.len() as u32,
        }
    }
}

impl Mph {
    #[doc(hidden)]
    #[inline]
    #[must_use]
    pub const fn __from_raw_parts(tables: Tables, max_len: u32, len: u32) -> Self {
        Self {
            tables,
            max_len,
            len,
        }
    }

    /// Look up a key.
    ///
    /// Returns the one-based position of `key` in construction order, or `0` if the byte string
    /// is not one of the keys. Comparison is exact: no case folding, no trimming, and a length
    /// change is a different string.
    #[inline]
    #[must_use]
    pub fn get(&self, key: impl AsRef<[u8]>) -> u32 {
        let key = key.as_ref();
        // Inputs that cannot possibly match skip the tables.
        if key.is_empty() || key.len() > self.max_len as usize {
            return 0;
        }
        self.tables.lookup(key)
    }

    /// Check whether `key` is in the set.
    #[inline]
    #[must_use]
    pub fn contains(&self, key: impl AsRef<[u8]>) -> bool {
        self.get(key) != 0
    }

    /// Number of keys the table was built for.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len as usize
    }

    /// Check whether the table holds no keys.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Reject key sets no policy is defined over: empty sets, empty keys, and duplicates.
#[cfg(feature = "build")]
fn validate(keys: &[&[u8]]) -> Result<(), BuildError> {
    if keys.is_empty() {
        return Err(BuildError::NoKeys);
    }
    if let Some(index) = keys.iter().position(|key| key.is_empty()) {
        return Err(BuildError::EmptyKey { index });
    }

    let mut order: Vec<usize> = (0..keys.len()).collect();
    order.sort_unstable_by(|&a, &b| keys[a].cmp(keys[b]));
    for pair in order.windows(2) {
        if keys[pair[0]] == keys[pair[1]] {
            return Err(BuildError::DuplicateKey {
                first: pair[0].min(pair[1]),
                second: pair[0].max(pair[1]),
            });
        }
    }
    Ok(())
}

/// Scope for `serde`-related code.
#[cfg(feature = "serde")]
mod serde_support {
    use super::{Mph, Tables};
    use alloc::vec;
    use displaydoc::Display;
    use thiserror::Error;

    /// Deserialization validation failures.
    #[derive(Debug, Display, Error)]
    pub enum Error {
        /// stored key count does not match the cells
        WrongKeyCount,

        /// stored maximum key length does not match the cells
        WrongMaxLen,

        /// cell index out of range or duplicated
        BadIndex,
    }

    /// Raw fields of [`Mph`], validated with [`TryFrom`] during deserialization.
    #[derive(serde::Deserialize)]
    pub(super) struct MphRepr {
        tables: Tables,
        max_len: u32,
        len: u32,
    }

    impl TryFrom<MphRepr> for Mph {
        type Error = Error;

        #[inline]
        fn try_from(repr: MphRepr) -> Result<Self, Error> {
            let occupied: vec::Vec<_> = repr
                .tables
                .cells()
                .iter()
                .filter(|cell| cell.index != 0)
                .collect();

            if occupied.len() as u64 != u64::from(repr.len) || repr.len == 0 {
                return Err(Error::WrongKeyCount);
            }

            let mut seen = vec![false; occupied.len()];
            for cell in &occupied {
                let position = cell
                    .index
                    .checked_sub(1)
                    .map(|index| index as usize)
                    .filter(|&index| index < seen.len())
                    .ok_or(Error::BadIndex)?;
                if core::mem::replace(&mut seen[position], true) {
                    return Err(Error::BadIndex);
                }
            }

            let max_len = occupied.iter().map(|cell| cell.len).max().unwrap_or(0);
            if max_len != repr.max_len {
                return Err(Error::WrongMaxLen);
            }

            Ok(Self {
                tables: repr.tables,
                max_len: repr.max_len,
                len: repr.len,
            })
        }
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::Codegen for Tables {
    #[inline]
    fn generate_piece(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let tables = gen.path("mph::low_level::Tables");
        match self {
            Self::Direct(table) => {
                let table = gen.piece(table);
                quote::quote!(#tables::Direct(#table))
            }
            Self::Split(table) => {
                let table = gen.piece(table);
                quote::quote!(#tables::Split(#table))
            }
        }
    }
}

#[cfg(feature = "codegen")]
impl super::codegen::Codegen for Mph {
    #[inline]
    fn generate_piece(&self, gen: &mut super::codegen::CodeGenerator) -> proc_macro2::TokenStream {
        let mph = gen.path("mph::Mph");
        let tables = gen.piece(&self.tables);
        let max_len = gen.piece(&self.max_len);
        let len = gen.piece(&self.len);
        quote::quote!(#mph::__from_raw_parts(#tables, #max_len, #len))
    }
}
