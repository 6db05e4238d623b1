//! Minimal perfect hashing for fixed sets of short keywords.
//!
//! Given a set of byte-string keys, each at most eight bytes long and known up front, this crate
//! builds a table that maps every key to its one-based position in the input order and every other
//! byte string to `0`. There is no probing and no collision chain: a lookup packs the input into
//! a single machine word, extracts a handful of discriminating bits with [PEXT], reads one cell,
//! and accepts or rejects it with a branch-free comparison.
//!
//! [PEXT]: https://en.wikipedia.org/wiki/X86_Bit_manipulation_instruction_set#Parallel_bit_deposit_and_extract
//!
//!
//! # Usage
//!
//! ```rust
//! let schemes = mph::Mph::from_keys(["ftp", "file", "http", "https", "ws", "wss"]);
//!
//! assert_eq!(schemes.get("http"), 3);
//! assert_eq!(schemes.get("wss"), 6);
//! assert_eq!(schemes.get("gopher"), 0);
//! assert_eq!(schemes.get(""), 0);
//! ```
//!
//! The hash strategy is picked automatically: a cascade of [`Policy`] candidates is tried in order
//! and the first one that can separate the key set wins (see [`DEFAULT_CASCADE`]). A specific
//! policy can be forced with [`Mph::with_policy`].
//!
//! Construction can fail -- duplicate keys, an empty set, or a set no policy can serve all refuse
//! to build:
//!
//! ```rust
//! assert!(mph::Mph::try_from_keys(["left", "right", "left"]).is_err());
//! ```
//!
//!
//! # Embedding tables in the binary
//!
//! Lookups never allocate, but runtime construction does. To pay the build cost once, construct
//! the table in `build.rs`, convert it to Rust source with [`codegen`], and `include!` the result
//! as a `const`:
//!
//! ```ignore
//! const KEYWORDS: mph::Mph = include!(concat!(env!("OUT_DIR"), "/keywords.rs"));
//! ```
//!
//! The generated expression only references `const fn` constructors and borrowed `static` data,
//! so the table lives entirely in the program image.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

mod cell;
pub mod codegen;
mod direct;
mod mask;
mod mph;
mod pext;
mod split;
mod word;

pub use mph::{BuildError, Mph, Policy, PolicyError, DEFAULT_CASCADE};

/// Public (but hidden) reexports for codegen-ed tables to access.
#[doc(hidden)]
pub mod low_level {
    pub use super::cell::Cell;
    pub use super::direct::DirectTable;
    pub use super::mph::Tables;
    pub use super::split::{Bucket, SplitTable};
    // Reexport because `alloc` is not in scope for generated code without `extern crate alloc`.
    pub use alloc::borrow::Cow;
}

#[cfg(test)]
mod tests;
