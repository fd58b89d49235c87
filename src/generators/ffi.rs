use std::collections::HashMap;
use std::num::{ParseFloatError, ParseIntError};
use std::str::FromStr;

use proc_macro2::{Ident, LexError, Literal, TokenStream};
use quote::{format_ident, quote};

use crate::models::Type::{FundamentalType, UserType};
use crate::models::{
    Api, Argument, Callback, Constant, Enumeration, Error, Field, Function, OpaqueType, Pointer,
    Structure, Type, TypeAlias,
};
use crate::patching::constants::{integer_width, Width};
use crate::patching::enumerations::{is_bitfield, variant_name};
use crate::patching::structures::patch_ffi_structure_default;
use crate::patching::values::{parse_float, parse_integer, parse_string};

impl From<rustfmt_wrapper::Error> for Error {
    fn from(error: rustfmt_wrapper::Error) -> Self {
        Error::Fmt(format!("{:?}", error))
    }
}

impl From<ParseIntError> for Error {
    fn from(error: ParseIntError) -> Self {
        Error::ParseInt(error.to_string())
    }
}

impl From<ParseFloatError> for Error {
    fn from(error: ParseFloatError) -> Self {
        Error::ParseFloat(error.to_string())
    }
}

impl From<LexError> for Error {
    fn from(error: LexError) -> Self {
        Error::LexError(format!("{:?}", error))
    }
}

/// Integer values of every constant and enumerator, for `#define` aliases
/// and enumerators written in terms of other names.
#[derive(Debug, Default)]
pub struct Values {
    integers: HashMap<String, i64>,
}

impl Values {
    pub fn from_api(api: &Api) -> Values {
        let mut values = Values::default();
        for constant in &api.constants {
            if let Some(value) = parse_integer(&constant.value) {
                values.integers.insert(constant.name.clone(), value);
            }
        }
        for enumeration in &api.enumerations {
            if let Ok(enumerators) = enumerator_values(enumeration, &values) {
                values.integers.extend(enumerators);
            }
        }
        for constant in &api.constants {
            if !values.integers.contains_key(&constant.name) {
                if let Some(value) = values.resolve(&constant.value) {
                    values.integers.insert(constant.name.clone(), value);
                }
            }
        }
        values
    }

    pub fn resolve(&self, repr: &str) -> Option<i64> {
        parse_integer(repr).or_else(|| {
            let name = repr.trim().trim_start_matches('(').trim_end_matches(')').trim();
            self.integers.get(name).copied()
        })
    }
}

fn integer_tokens(value: i64) -> TokenStream {
    if value < 0 {
        let literal = Literal::u64_unsuffixed(value.unsigned_abs());
        quote! { -#literal }
    } else {
        let literal = Literal::i64_unsuffixed(value);
        quote! { #literal }
    }
}

fn doc_attribute(api: &Api, name: &str) -> Option<TokenStream> {
    api.docs.get(name).map(|text| {
        quote! { #[doc = #text] }
    })
}

pub fn generate_opaque_type_code(value: &OpaqueType) -> TokenStream {
    let name = format_ident!("{}", value.name);

    quote! {
        #[repr(C)]
        #[derive(Debug, Copy, Clone)]
        pub struct #name {
            _unused: [u8; 0]
        }
    }
}

pub fn generate_constant_code(
    constant: &Constant,
    values: &Values,
) -> Result<Option<TokenStream>, Error> {
    let name = format_ident!("{}", &constant.name);
    let repr = constant.value.trim();

    if let Some(text) = parse_string(repr) {
        let mut bytes = text.into_bytes();
        bytes.push(0);
        let size = Literal::usize_unsuffixed(bytes.len());
        let value = Literal::byte_string(&bytes);
        return Ok(Some(quote! {
            pub const #name: &[u8; #size] = #value;
        }));
    }

    if let Some(value) = parse_float(repr) {
        let value = Literal::f64_unsuffixed(value);
        return Ok(Some(quote! {
            pub const #name: f64 = #value;
        }));
    }

    let value = match values.resolve(repr) {
        Some(value) => value,
        None => {
            tracing::debug!("constant {} = {} has no integer value", constant.name, repr);
            return Ok(None);
        }
    };
    let tokens = match integer_width(&constant.name, value, repr) {
        Width::U32 => {
            let value = Literal::u32_unsuffixed(value as u32);
            quote! { pub const #name: u32 = #value; }
        }
        Width::U64 => {
            let value = Literal::u64_unsuffixed(value as u64);
            quote! { pub const #name: u64 = #value; }
        }
        Width::I32 => {
            let value = integer_tokens(value);
            quote! { pub const #name: i32 = #value; }
        }
        Width::I64 => {
            let value = integer_tokens(value);
            quote! { pub const #name: i64 = #value; }
        }
    };
    Ok(Some(tokens))
}

fn fundamental_name(name: &str) -> &str {
    match name {
        "char" => "c_char",
        "signed char" => "c_schar",
        "unsigned char" => "c_uchar",
        "short" | "short int" | "signed short" | "signed short int" => "c_short",
        "unsigned short" | "unsigned short int" => "c_ushort",
        "int" | "signed" | "signed int" => "c_int",
        "unsigned" | "unsigned int" => "c_uint",
        "long" | "long int" | "signed long" | "signed long int" => "c_long",
        "unsigned long" | "unsigned long int" => "c_ulong",
        "long long" | "long long int" | "signed long long" | "signed long long int" => {
            "c_longlong"
        }
        "unsigned long long" | "unsigned long long int" => "c_ulonglong",
        "float" => "c_float",
        "double" | "long double" => "c_double",
        "void" => "c_void",
        "bool" => "bool",
        "size_t" | "uintptr_t" => "usize",
        "intptr_t" => "isize",
        "int8_t" => "i8",
        "int16_t" => "i16",
        "int32_t" => "i32",
        "int64_t" => "i64",
        "uint8_t" => "u8",
        "uint16_t" => "u16",
        "uint32_t" => "u32",
        "uint64_t" => "u64",
        _ => name,
    }
}

pub fn format_rust_type(
    c_type: &Type,
    as_const: &Option<String>,
    pointer: &Option<Pointer>,
    as_array: &Option<TokenStream>,
) -> TokenStream {
    let name = match c_type {
        FundamentalType(name) => fundamental_name(name),
        UserType(name) => name,
    };
    let name = format_ident!("{}", name);
    let tokens = match (as_const, pointer) {
        (_, None) => quote! { #name },
        (None, Some(Pointer::NormalPointer(_))) => quote! { *mut #name },
        (None, Some(Pointer::DoublePointer(_))) => quote! { *mut *mut #name },
        (Some(_), Some(Pointer::NormalPointer(_))) => quote! { *const #name },
        (Some(_), Some(Pointer::DoublePointer(_))) => quote! { *mut *const #name },
    };
    match as_array {
        None => tokens,
        Some(dimension) => {
            quote! {
                [#tokens; #dimension as usize]
            }
        }
    }
}

pub fn generate_type_alias_code(type_alias: &TypeAlias) -> TokenStream {
    let name = format_ident!("{}", type_alias.name);
    let base = format_rust_type(
        &type_alias.base_type,
        &type_alias.as_const,
        &type_alias.pointer,
        &None,
    );

    quote! {
        pub type #name = #base;
    }
}

/// Values of each enumerator, counting up from the previous one where the
/// header leaves the value implicit.
pub fn enumerator_values(
    enumeration: &Enumeration,
    values: &Values,
) -> Result<Vec<(String, i64)>, Error> {
    let mut resolved: Vec<(String, i64)> = vec![];
    let mut next: i64 = 0;
    for enumerator in &enumeration.enumerators {
        let value = match &enumerator.value {
            None => next,
            Some(repr) => values
                .resolve(repr)
                .or_else(|| {
                    resolved
                        .iter()
                        .find(|(name, _)| name == repr.trim())
                        .map(|(_, value)| *value)
                })
                .ok_or_else(|| Error::UnresolvedValue(repr.clone()))?,
        };
        next = value + 1;
        resolved.push((enumerator.name.clone(), value));
    }
    Ok(resolved)
}

fn generate_bitfield_impls(name: &Ident) -> TokenStream {
    quote! {
        impl core::ops::BitOr<#name> for #name {
            type Output = Self;
            #[inline]
            fn bitor(self, other: Self) -> Self {
                #name(self.0 | other.0)
            }
        }
        impl core::ops::BitOrAssign for #name {
            #[inline]
            fn bitor_assign(&mut self, rhs: #name) {
                self.0 |= rhs.0;
            }
        }
        impl core::ops::BitAnd<#name> for #name {
            type Output = Self;
            #[inline]
            fn bitand(self, other: Self) -> Self {
                #name(self.0 & other.0)
            }
        }
        impl core::ops::BitAndAssign for #name {
            #[inline]
            fn bitand_assign(&mut self, rhs: #name) {
                self.0 &= rhs.0;
            }
        }
        impl #name {
            #[inline]
            #[must_use]
            pub fn field_true(self, field: Self) -> bool {
                self & field == field
            }

            #[inline]
            #[must_use]
            pub fn field_false(self, field: Self) -> bool {
                !self.field_true(field)
            }
        }
        impl core::fmt::Binary for #name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                let val = self.0;
                core::fmt::Binary::fmt(&val, f)
            }
        }
    }
}

pub fn generate_enumeration_code(
    enumeration: &Enumeration,
    values: &Values,
    doc: Option<TokenStream>,
) -> Result<TokenStream, Error> {
    let name = format_ident!("{}", enumeration.name);
    let base = format_rust_type(&enumeration.enum_type, &None, &None, &None);

    let mut variants = vec![];
    for (label, value) in enumerator_values(enumeration, values)? {
        let label = format_rust_ident(&variant_name(&enumeration.name, &label));
        let value = integer_tokens(value);
        variants.push(quote! {
            pub const #label: #name = #name(#value);
        });
    }

    let bitfield = is_bitfield(&enumeration.name);
    let derive = if bitfield {
        quote! { #[derive(Copy, Clone, Hash, PartialEq, Eq)] }
    } else {
        quote! { #[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)] }
    };
    let impls = if bitfield {
        Some(generate_bitfield_impls(&name))
    } else {
        None
    };

    Ok(quote! {
        #doc
        #[repr(transparent)]
        #derive
        pub struct #name(pub #base);
        impl #name {
            #(#variants)*
        }
        #impls
    })
}

const KEYWORDS: &[&str] = &[
    "as", "break", "const", "continue", "crate", "else", "enum", "extern", "false", "fn", "for",
    "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return",
    "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use", "where",
    "while", "async", "await", "dyn", "try", "abstract", "become", "box", "do", "final", "macro",
    "override", "priv", "typeof", "unsized", "virtual", "yield",
];

pub fn format_rust_ident(name: &str) -> Ident {
    if KEYWORDS.contains(&name) {
        format_ident!("{}_", name)
    } else {
        format_ident!("{}", name)
    }
}

pub fn generate_argument_code(index: usize, argument: &Argument) -> TokenStream {
    let name = if argument.name.is_empty() {
        format_ident!("arg{}", index)
    } else {
        format_rust_ident(&argument.name)
    };
    let pointer = match (&argument.pointer, &argument.as_array) {
        (None, Some(_)) => Some(Pointer::NormalPointer("[]".into())),
        (pointer, _) => pointer.clone(),
    };
    let argument_type = format_rust_type(&argument.argument_type, &argument.as_const, &pointer, &None);
    quote! {
        #name: #argument_type
    }
}

fn generate_arguments_code(arguments: &[Argument]) -> Vec<TokenStream> {
    arguments
        .iter()
        .enumerate()
        .map(|(index, argument)| generate_argument_code(index, argument))
        .collect()
}

fn returns_void(return_type: &Type, pointer: &Option<Pointer>) -> bool {
    return_type == &FundamentalType("void".into()) && pointer.is_none()
}

pub fn generate_callback_code(callback: &Callback) -> TokenStream {
    let name = format_ident!("{}", callback.name);
    let arguments = generate_arguments_code(&callback.arguments);

    let varargs = if callback.varargs.is_some() {
        Some(quote! {, ...})
    } else {
        None
    };

    if returns_void(&callback.return_type, &callback.pointer) {
        quote! {
            pub type #name = Option<unsafe extern "C-unwind" fn(#(#arguments),* #varargs)>;
        }
    } else {
        let return_type = format_rust_type(
            &callback.return_type,
            &callback.return_const,
            &callback.pointer,
            &None,
        );
        quote! {
            pub type #name = Option<unsafe extern "C-unwind" fn(#(#arguments),* #varargs) -> #return_type>;
        }
    }
}

pub fn generate_field_code(field: &Field) -> Result<TokenStream, Error> {
    let name = format_rust_ident(&field.name);
    let as_array = match &field.as_array {
        None => None,
        Some(dimension) => {
            let dimension = TokenStream::from_str(dimension[1..dimension.len() - 1].trim())?;
            Some(dimension)
        }
    };
    let field_type = format_rust_type(
        &field.field_type,
        &field.as_const,
        &field.pointer,
        &as_array,
    );
    Ok(quote! {
        pub #name: #field_type
    })
}

/// Bitfield newtypes carry no `Debug`, so neither can structures holding them.
fn derives_debug(structure: &Structure) -> bool {
    !structure.fields.iter().any(|field| match &field.field_type {
        UserType(name) => field.pointer.is_none() && is_bitfield(name),
        FundamentalType(_) => false,
    })
}

pub fn generate_structure_code(
    structure: &Structure,
    doc: Option<TokenStream>,
) -> Result<TokenStream, Error> {
    let name = format_ident!("{}", structure.name);

    let mut fields = vec![];
    for field in &structure.fields {
        fields.push(generate_field_code(field)?);
    }

    let debug = if derives_debug(structure) {
        Some(quote! {Debug,})
    } else {
        None
    };
    let default = patch_ffi_structure_default(structure);

    Ok(quote! {
        #doc
        #[repr(C)]
        #[derive(#debug Copy, Clone)]
        pub struct #name {
            #(#fields),*
        }
        #default
    })
}

pub fn generate_function_code(function: &Function, doc: Option<TokenStream>) -> TokenStream {
    let name = format_ident!("{}", function.name);
    let arguments = generate_arguments_code(&function.arguments);
    let varargs = if function.varargs.is_some() {
        Some(quote! {, ...})
    } else {
        None
    };

    if returns_void(&function.return_type, &function.pointer) {
        quote! {
            #doc
            pub fn #name(#(#arguments),* #varargs);
        }
    } else {
        let return_type = format_rust_type(
            &function.return_type,
            &function.return_const,
            &function.pointer,
            &None,
        );
        quote! {
            #doc
            pub fn #name(#(#arguments),* #varargs) -> #return_type;
        }
    }
}

pub fn generate_library_code(api: &Api, link: &str, functions: &[Function]) -> TokenStream {
    let functions: Vec<TokenStream> = functions
        .iter()
        .map(|function| generate_function_code(function, doc_attribute(api, &function.name)))
        .collect();
    let about = format!("Functions exported by {}.", link);
    quote! {
        #[doc = #about]
        extern "C-unwind" {
            #(#functions)*
        }
    }
}

/// Functions live in their own module so `mockall` can stand in for the
/// simulator in tests of dependent crates.
pub fn generate_functions_code(api: &Api) -> Option<TokenStream> {
    if api.function_count() == 0 {
        return None;
    }
    let libraries: Vec<TokenStream> = api
        .functions
        .iter()
        .map(|(link, functions)| generate_library_code(api, link, functions))
        .collect();
    Some(quote! {
        #[cfg(feature = "mockall")]
        use mockall::automock;

        #[cfg_attr(feature = "mockall", automock)]
        #[cfg_attr(feature = "mockall", allow(dead_code))]
        mod functions {
            use super::*;
            #(#libraries)*
        }

        #[cfg(not(feature = "mockall"))]
        #[doc(inline)]
        pub use functions::*;
        #[cfg(feature = "mockall")]
        #[doc(inline)]
        pub use mock_functions::*;
    })
}

pub fn generate_ffi_code(api: &Api) -> Result<TokenStream, Error> {
    let values = Values::from_api(api);

    let opaque_types: Vec<TokenStream> = api
        .opaque_types
        .iter()
        .map(generate_opaque_type_code)
        .collect();

    let type_aliases: Vec<TokenStream> = api
        .type_aliases
        .iter()
        .map(|type_alias| {
            let doc = doc_attribute(api, &type_alias.name);
            let code = generate_type_alias_code(type_alias);
            quote! { #doc #code }
        })
        .collect();

    let mut constants = vec![];
    for constant in &api.constants {
        if let Some(code) = generate_constant_code(constant, &values)? {
            constants.push(code);
        }
    }

    let mut enumerations = vec![];
    for enumeration in &api.enumerations {
        let doc = doc_attribute(api, &enumeration.name);
        enumerations.push(generate_enumeration_code(enumeration, &values, doc)?);
    }

    let mut structures = vec![];
    for structure in &api.structures {
        let doc = doc_attribute(api, &structure.name);
        structures.push(generate_structure_code(structure, doc)?);
    }

    let callbacks: Vec<TokenStream> = api
        .callbacks
        .iter()
        .map(|callback| {
            let doc = doc_attribute(api, &callback.name);
            let code = generate_callback_code(callback);
            quote! { #doc #code }
        })
        .collect();

    let functions = generate_functions_code(api);

    Ok(quote! {
        #![allow(non_upper_case_globals, non_camel_case_types, non_snake_case)]
        #![allow(unused_imports, clippy::missing_safety_doc)]
        use core::ffi::{
            c_char, c_double, c_float, c_int, c_long, c_longlong, c_schar, c_short, c_uchar,
            c_uint, c_ulong, c_ulonglong, c_ushort, c_void,
        };

        #(#opaque_types)*
        #(#type_aliases)*
        #(#constants)*
        #(#enumerations)*
        #(#structures)*
        #(#callbacks)*
        #functions
    })
}

pub fn generate(api: &Api) -> Result<String, Error> {
    let code = generate_ffi_code(api)?;
    rustfmt_wrapper::rustfmt(code).map_err(Error::from)
}
