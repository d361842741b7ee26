//! `Error` expansion.
//!
//! Each variant declares its message with `#[error("...")]`:
//!
//! ```ignore
//! #[derive(Debug, Error)]
//! pub enum StoreError {
//!     #[error("file not found: {0}")]
//!     NotFound(String),
//!     #[error("expected version {expected}, got {actual}")]
//!     Version { expected: u8, actual: u8 },
//!     #[error("store is closed")]
//!     Closed,
//! }
//! ```
//!
//! Only the fields a message mentions are bound and passed to `write!`, so a
//! variant may carry data that its message leaves out.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, LitStr, Variant};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Error can only be derived for enums",
        ));
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let arms = data
        .variants
        .iter()
        .map(display_arm)
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#arms)*
                }
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

fn display_arm(variant: &Variant) -> syn::Result<TokenStream> {
    let ident = &variant.ident;
    let message = message(variant)?;
    let text = message.value();

    let arm = match &variant.fields {
        Fields::Unit => quote! {
            Self::#ident => write!(f, #message),
        },
        Fields::Named(fields) => {
            let used: Vec<_> = fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|field| mentions(&text, &field.to_string()))
                .collect();
            quote! {
                Self::#ident { #(#used,)* .. } => write!(f, #message #(, #used = #used)*),
            }
        }
        Fields::Unnamed(fields) => {
            // `{0}` is not a valid named argument, so positions become `{f0}`.
            let mut rewritten = text.clone();
            let mut patterns = Vec::with_capacity(fields.unnamed.len());
            let mut bound = Vec::new();
            for position in 0..fields.unnamed.len() {
                let key = position.to_string();
                if mentions(&text, &key) {
                    let binding = format_ident!("f{}", position);
                    rewritten = rewritten
                        .replace(&format!("{{{key}}}"), &format!("{{{binding}}}"))
                        .replace(&format!("{{{key}:"), &format!("{{{binding}:"));
                    patterns.push(quote! { #binding });
                    bound.push(binding);
                } else {
                    patterns.push(quote! { _ });
                }
            }
            let format = LitStr::new(&rewritten, message.span());
            quote! {
                Self::#ident(#(#patterns),*) => write!(f, #format #(, #bound = #bound)*),
            }
        }
    };

    Ok(arm)
}

/// Returns true if `text` interpolates `name` as `{name}` or `{name:...}`.
fn mentions(text: &str, name: &str) -> bool {
    text.contains(&format!("{{{name}}}")) || text.contains(&format!("{{{name}:"))
}

fn message(variant: &Variant) -> syn::Result<LitStr> {
    let attr = variant
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("error"))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                &variant.ident,
                format!(
                    "missing #[error(\"...\")] on variant `{}`",
                    variant.ident
                ),
            )
        })?;
    attr.parse_args::<LitStr>()
}
