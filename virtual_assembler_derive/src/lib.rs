//! Derive macros for the virtual assembler crate.
//!
//! Provides `#[derive(Error)]`: error type boilerplate (`Display` + `Error`).

mod error;

use proc_macro::TokenStream;

/// Automatically implements `Display` and `Error` traits for error types.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
