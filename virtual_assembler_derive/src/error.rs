//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations from
//! an `#[error("...")]` message on every enum variant (or on the struct).
//!
//! # Usage
//!
//! ```ignore
//! use virtual_assembler_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum FrameError {
//!     #[error("frame of {0} bytes exceeds limit")]
//!     TooLarge(usize),
//!
//!     #[error("expected tag {expected}, got {actual}")]
//!     BadTag { expected: u8, actual: u8 },
//!
//!     #[error("connection closed")]
//!     Closed,
//! }
//! ```
//!
//! Placeholders name tuple fields by position (`{0}`) and named fields by
//! name (`{field}`); format specs such as `{0:?}` are kept. Fields that the
//! message does not mention are ignored.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, Ident, Lit, LitStr, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data) => {
            let arms = data
                .variants
                .iter()
                .map(|variant| {
                    let message = Message::from_attrs(
                        &variant.attrs,
                        &variant.ident,
                        &format!("variant `{}`", variant.ident),
                    )?;
                    Ok(variant_arm(&variant.ident, &variant.fields, &message))
                })
                .collect::<syn::Result<Vec<_>>>()?;

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data) => {
            let message =
                Message::from_attrs(&input.attrs, &input.ident, &format!("type `{name}`"))?;
            struct_body(&data.fields, &message)
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// A parsed `#[error("...")]` message.
///
/// `format` has positional placeholders rewritten to `_N` so every argument
/// can be passed by name; `names` lists each referenced argument once.
struct Message {
    format: LitStr,
    names: Vec<String>,
}

impl Message {
    fn from_attrs<T: ToTokens>(attrs: &[Attribute], target: &T, what: &str) -> syn::Result<Self> {
        let attr = attrs
            .iter()
            .find(|attr| attr.path().is_ident("error"))
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    target,
                    format!(
                        "missing #[error(\"...\")] attribute on {what}; every error variant must declare a display message"
                    ),
                )
            })?;

        let Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
            ));
        };

        let lit = match syn::parse2::<Lit>(list.tokens.clone()) {
            Ok(Lit::Str(lit)) => lit,
            _ => {
                return Err(syn::Error::new_spanned(
                    &attr.meta,
                    "#[error] expects a string literal, e.g. #[error(\"invalid opcode: {0}\")]",
                ));
            }
        };

        let (format, names) = scan_placeholders(&lit.value());
        Ok(Self {
            format: LitStr::new(&format, lit.span()),
            names,
        })
    }

    fn idents(&self) -> Vec<Ident> {
        self.names.iter().map(|n| format_ident!("{}", n)).collect()
    }
}

/// Walks a format string, prefixing positional placeholders with `_` and
/// collecting every argument name it references.
fn scan_placeholders(source: &str) -> (String, Vec<String>) {
    let mut format = String::with_capacity(source.len() + 4);
    let mut names: Vec<String> = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        format.push(c);
        match c {
            '{' if chars.peek() == Some(&'{') => {
                format.push('{');
                chars.next();
            }
            '}' if chars.peek() == Some(&'}') => {
                format.push('}');
                chars.next();
            }
            '{' => {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next == '}' || next == ':' {
                        break;
                    }
                    name.push(next);
                    chars.next();
                }
                if !name.is_empty() && name.chars().all(|ch| ch.is_ascii_digit()) {
                    name.insert(0, '_');
                }
                format.push_str(&name);
                if !name.is_empty() && !names.contains(&name) {
                    names.push(name);
                }
            }
            _ => {}
        }
    }

    (format, names)
}

fn variant_arm(variant: &Ident, fields: &Fields, message: &Message) -> TokenStream2 {
    let format = &message.format;
    let used = message.idents();

    match fields {
        Fields::Unit => quote! {
            Self::#variant => write!(f, #format),
        },
        Fields::Named(_) => quote! {
            Self::#variant { #(#used,)* .. } => write!(f, #format #(, #used = #used)*),
        },
        Fields::Unnamed(unnamed) => {
            let bindings = (0..unnamed.unnamed.len()).map(|i| {
                let ident = format_ident!("_{}", i);
                if used.contains(&ident) {
                    quote! { #ident }
                } else {
                    quote! { _ }
                }
            });
            quote! {
                Self::#variant(#(#bindings),*) => write!(f, #format #(, #used = #used)*),
            }
        }
    }
}

fn struct_body(fields: &Fields, message: &Message) -> TokenStream2 {
    let format = &message.format;
    let used = message.idents();

    match fields {
        Fields::Unit => quote! { write!(f, #format) },
        Fields::Named(_) => quote! {
            write!(f, #format #(, #used = self.#used)*)
        },
        Fields::Unnamed(_) => {
            let values = message.names.iter().map(|name| {
                let index = name
                    .trim_start_matches('_')
                    .parse::<usize>()
                    .map(syn::Index::from)
                    .unwrap_or_else(|_| syn::Index::from(0));
                quote! { self.#index }
            });
            quote! {
                write!(f, #format #(, #used = #values)*)
            }
        }
    }
}
