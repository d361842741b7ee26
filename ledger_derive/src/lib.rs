//! Derive macros for the ledger crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - canonical `Encode`/`Decode` for structs
//! - `#[derive(Error)]` - `Display` and `std::error::Error` for error enums

mod codec;
mod error;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Implements `crate::types::encoding::{Encode, Decode}` field by field, in
/// declaration order.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    codec::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `Display` from per-variant `#[error("...")]` messages, plus an
/// empty `std::error::Error` impl.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    error::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
