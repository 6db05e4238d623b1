#![cfg(feature = "codegen")]

//! Code generation.
//!
//! This module turns a built [`Mph`](crate::Mph) into Rust source, for generating tables
//! programmatically in `build.rs` and embedding them with `include!`. The generated expression
//! consists of `const fn` constructors over borrowed `static` data, so it can initialize
//! a `const` and costs nothing at runtime.
//!
//!
//! # Example
//!
//! ```rust
//! let table = mph::Mph::from_keys(["GET", "HEAD", "POST"]);
//! let code = mph::codegen::CodeGenerator::new().generate(&table);
//! // Save `code` to "$OUT_DIR/methods.rs"...
//! assert!(!code.is_empty());
//! ```
//!
//! ```ignore
//! // ...and embed it:
//! const METHODS: mph::Mph = include!(concat!(env!("OUT_DIR"), "/methods.rs"));
//! ```

use alloc::borrow::ToOwned;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use proc_macro2::{Ident, Literal, TokenStream, TokenTree};
use quote::{format_ident, quote};
use std::collections::{HashMap, HashSet};

/// Code generator.
pub struct CodeGenerator {
    /// Mapping from crate names to paths, as provided with [`set_crate`](Self::set_crate).
    crate_paths: HashMap<String, TokenStream>,

    /// Mapping from paths (as passed to [`path`](Self::path)) to identifiers (as aliased with
    /// `use {path} as {ident};`).
    path_to_alias: HashMap<String, Ident>,

    /// Identifiers already used for aliases.
    aliases: HashSet<String>,
}

impl CodeGenerator {
    /// Create a code generator with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            crate_paths: HashMap::new(),
            path_to_alias: HashMap::new(),
            aliases: HashSet::new(),
        }
    }

    /// Configure name-to-path mapping for crates.
    ///
    /// By default, `mph` is mapped to `::mph`. Reconfiguring this is necessary if the generated
    /// code lands somewhere the crate is renamed.
    #[inline]
    pub fn set_crate(&mut self, name: &str, path: TokenStream) {
        self.crate_paths.insert(name.into(), path);
    }

    /// Turn a value into code.
    #[inline]
    pub fn generate<T: ?Sized + Codegen>(mut self, value: &T) -> TokenStream {
        let value = self.piece(value);

        let crate_paths = core::mem::take(&mut self.crate_paths);
        let mut uses = Vec::new();
        for (path, alias) in core::mem::take(&mut self.path_to_alias) {
            let mut components = path.split("::");

            let crate_name = components.next().unwrap_or(&path);
            let crate_path = if let Some(crate_path) = crate_paths.get(crate_name) {
                crate_path.clone()
            } else {
                let ident = format_ident!("{crate_name}");
                quote!(:: #ident)
            };
            let components = components.map(|component| format_ident!("{component}"));

            uses.push(quote!(use #crate_path #(:: #components)* as #alias;));
        }

        quote!(
            {
                #(#uses)*
                #value
            }
        )
    }

    /// Turn a value into a recursively useable piece of code.
    #[inline]
    pub fn piece<T: ?Sized + Codegen>(&mut self, piece: &T) -> TokenStream {
        piece.generate_piece(self)
    }

    /// Resolve a path.
    ///
    /// The input string must look like `crate::path::inside::it`, or just `crate`. Semantically,
    /// this path must be `use`able. This is different from using the path directly for two
    /// reasons:
    ///
    /// - This method resolves crates according to the paths configured by
    ///   [`CodeGenerator::set_crate`].
    /// - This method replaces long paths with short aliases imported just once with `use`,
    ///   reducing code size.
    #[inline]
    pub fn path(&mut self, path: &str) -> TokenStream {
        if let Some(alias) = self.path_to_alias.get(path) {
            return quote!(#alias);
        }

        let mut alias = format!("__{}", path.rsplit_once("::").unwrap_or(("", path)).1);
        while self.aliases.contains(&alias) {
            alias.push('_');
        }
        self.aliases.insert(alias.clone());

        let alias = format_ident!("{alias}");
        self.path_to_alias.insert(path.to_owned(), alias.clone());
        quote!(#alias)
    }
}

impl Default for CodeGenerator {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Values that can be turned into code.
pub trait Codegen {
    /// Emit a piece of code corresponding to this value.
    ///
    /// This method is only supposed to be called recursively from [`Codegen`] implementations.
    /// Call [`CodeGenerator::generate`] to produce the complete code output for a single value.
    fn generate_piece(&self, gen: &mut CodeGenerator) -> TokenStream;
}

/// Implement [`Codegen`] for integers by calling methods on [`Literal`].
macro_rules! literal {
    ($($ty:ty => $method:ident,)*) => {
        $(
            impl Codegen for $ty {
                #[inline]
                fn generate_piece(&self, _gen: &mut CodeGenerator) -> TokenStream {
                    TokenTree::Literal(Literal::$method(*self)).into()
                }
            }
        )*
    };
}

literal! {
    u8 => u8_unsuffixed,
    u16 => u16_unsuffixed,
    u32 => u32_unsuffixed,
    u64 => u64_unsuffixed,
    usize => usize_unsuffixed,
}

impl<T: Codegen> Codegen for [T] {
    #[inline]
    fn generate_piece(&self, gen: &mut CodeGenerator) -> TokenStream {
        let elements: Vec<TokenStream> = self.iter().map(|element| gen.piece(element)).collect();
        quote!([#(#elements),*])
    }
}

impl<T: Clone + Codegen> Codegen for alloc::borrow::Cow<'static, [T]> {
    #[inline]
    fn generate_piece(&self, gen: &mut CodeGenerator) -> TokenStream {
        let cow = gen.path("mph::low_level::Cow");
        let data = gen.piece(&**self);
        quote!(#cow::Borrowed(&#data))
    }
}
