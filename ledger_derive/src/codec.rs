//! `BinaryCodec` expansion.
//!
//! Fields are written in declaration order with no tags or names, so the
//! struct definition *is* the wire layout. Reordering fields changes every
//! hash computed over the type.
//!
//! ```ignore
//! #[derive(BinaryCodec)]
//! pub struct Entry {
//!     pub owner: String,
//!     pub value: u64,
//! }
//!
//! // expands to
//! impl Encode for Entry {
//!     fn encode<S: EncodeSink>(&self, out: &mut S) {
//!         Encode::encode(&self.owner, out);
//!         Encode::encode(&self.value, out);
//!     }
//! }
//! impl Decode for Entry {
//!     fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
//!         Ok(Self { owner: Decode::decode(input)?, value: Decode::decode(input)? })
//!     }
//! }
//! ```
//!
//! Enums and unions are rejected: nothing in the ledger format needs a tagged
//! variant, and leaving them out keeps the format easy to audit.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Index};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "BinaryCodec can only be derived for structs",
        ));
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (encode_body, decode_body) = match &data.fields {
        Fields::Named(fields) => {
            let idents: Vec<_> = fields
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .collect();
            (
                quote! {
                    #( crate::types::encoding::Encode::encode(&self.#idents, out); )*
                },
                quote! {
                    Ok(Self {
                        #( #idents: crate::types::encoding::Decode::decode(input)?, )*
                    })
                },
            )
        }
        Fields::Unnamed(fields) => {
            let indices: Vec<Index> = (0..fields.unnamed.len()).map(Index::from).collect();
            let decoders = indices
                .iter()
                .map(|_| quote! { crate::types::encoding::Decode::decode(input)? });
            (
                quote! {
                    #( crate::types::encoding::Encode::encode(&self.#indices, out); )*
                },
                quote! {
                    Ok(Self( #(#decoders),* ))
                },
            )
        }
        Fields::Unit => (
            quote! { let _ = out; },
            quote! {
                let _ = input;
                Ok(Self)
            },
        ),
    };

    Ok(quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #decode_body
            }
        }
    })
}
