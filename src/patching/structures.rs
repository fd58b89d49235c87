use crate::models::Structure;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};

/// Versioned SDK structures carry their own size as the first member.
pub const SIZE_FIELD: &str = "structSize";

pub fn has_size_field(structure: &Structure) -> bool {
    structure.fields.iter().any(|field| field.name == SIZE_FIELD)
}

/// `Default` for structures the SDK expects to be zeroed before use, with
/// `structSize` filled in when present.
pub fn patch_ffi_structure_default(structure: &Structure) -> Option<TokenStream> {
    if !has_size_field(structure) {
        return None;
    }
    let name = format_ident!("{}", structure.name);
    let field = format_ident!("{}", SIZE_FIELD);
    Some(quote! {
        impl Default for #name {
            fn default() -> Self {
                let mut value: Self = unsafe { core::mem::zeroed() };
                value.#field = core::mem::size_of::<#name>() as _;
                value
            }
        }
    })
}
