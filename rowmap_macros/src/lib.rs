//! Procedural macros for the `rowmap` entity mapper.
//!
//! `#[derive(Entity)]` inspects a struct with named fields and implements
//! `rowmap_core::Entity` for it: the physical column list, key access, and
//! conversion between fields and storage rows.
//!
//! Field attributes:
//! - `#[entity(column = "...")]` overrides the column name (default: the
//!   field name in lowerCamelCase).
//! - `#[entity(skip)]` excludes a field from storage; it is left untouched by
//!   `hydrate` and defaulted for rows loaded by finders.
//! - `#[entity(cache)]` marks the `PropertyCache` field holding resolved
//!   computed properties.
//!
//! The key field is the one whose column is `"id"` followed by the struct
//! name, and it must be an `Option<i64>`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    ext::IdentExt, parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields, Ident, LitStr,
    Type,
};

use inflections::Inflect;

/// Helper to get the inner type of an `Option<T>`.
fn get_option_inner(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        if type_path.qself.is_some() {
            return None;
        }
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident != "Option" {
                return None;
            }
            if let syn::PathArguments::AngleBracketed(args) = &segment.arguments {
                if let Some(syn::GenericArgument::Type(inner_ty)) = args.args.first() {
                    return Some(inner_ty);
                }
            }
        }
    }
    None
}

fn is_plain(ty: &Type, name: &str) -> bool {
    match ty {
        Type::Path(type_path) => type_path.qself.is_none() && type_path.path.is_ident(name),
        _ => false,
    }
}

fn is_valid_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|ch| ch == '_' || ch.is_ascii_alphanumeric())
}

/// Holds parsed metadata about a single struct field.
struct FieldMetadata {
    ident: Ident,
    ty: Type,
    column_name: String,
    column_span: proc_macro2::Span,
    is_skipped: bool,
    is_cache: bool,
}

impl FieldMetadata {
    fn is_physical(&self) -> bool {
        !self.is_skipped && !self.is_cache
    }
}

/// Parses all named fields from a `DeriveInput` struct.
fn parse_field_metadata(input: &DeriveInput) -> syn::Result<Vec<FieldMetadata>> {
    let fields = match &input.data {
        Data::Struct(s) => match &s.fields {
            Fields::Named(named) => named,
            _ => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "#[derive(Entity)] only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "#[derive(Entity)] can only be used on structs",
            ))
        }
    };

    let mut out = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let mut column_name = ident.unraw().to_string().to_camel_case();
        let mut column_span = ident.span();
        let mut is_skipped = false;
        let mut is_cache = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("entity") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("column") {
                    let s: LitStr = meta.value()?.parse()?;
                    column_name = s.value();
                    column_span = s.span();
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    is_skipped = true;
                    Ok(())
                } else if meta.path.is_ident("cache") {
                    is_cache = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `column = \"...\"`, `skip`, or `cache`"))
                }
            })?;
        }
        out.push(FieldMetadata {
            ident,
            ty: field.ty.clone(),
            column_name,
            column_span,
            is_skipped,
            is_cache,
        });
    }
    Ok(out)
}

// --- `Entity` derive macro ---

#[proc_macro_derive(Entity, attributes(entity))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let type_name = struct_name.to_string();
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "#[derive(Entity)] does not support generic structs",
        ));
    }
    if let Some(attr) = input.attrs.iter().find(|a| a.path().is_ident("entity")) {
        return Err(syn::Error::new(
            attr.span(),
            "#[entity(...)] belongs on fields; table and key names follow the struct name",
        ));
    }
    let fields_metadata = parse_field_metadata(input)?;

    // --- Validate columns ---
    let mut seen: Vec<&str> = Vec::new();
    for f in fields_metadata.iter().filter(|f| f.is_physical()) {
        if !is_valid_ident(&f.column_name) {
            return Err(syn::Error::new(
                f.column_span,
                format!(
                    "invalid column name `{}`; use ASCII letters, digits, or `_`, starting with a letter or `_`",
                    f.column_name
                ),
            ));
        }
        if seen.contains(&f.column_name.as_str()) {
            return Err(syn::Error::new(
                f.column_span,
                format!("column `{}` is declared more than once", f.column_name),
            ));
        }
        seen.push(&f.column_name);
    }

    let caches: Vec<&FieldMetadata> = fields_metadata.iter().filter(|f| f.is_cache).collect();
    if let Some(extra) = caches.get(1) {
        return Err(syn::Error::new(
            extra.ident.span(),
            "only one field can be marked #[entity(cache)]",
        ));
    }

    // --- Key field ---
    let key_column = format!("id{}", type_name);
    let key_field = fields_metadata
        .iter()
        .filter(|f| f.is_physical())
        .find(|f| f.column_name == key_column)
        .ok_or_else(|| {
            syn::Error::new(
                struct_name.span(),
                format!(
                    "`{}` needs a key field with column `{}`, e.g. `{}: Option<i64>`",
                    type_name,
                    key_column,
                    key_column.to_snake_case()
                ),
            )
        })?;
    if !get_option_inner(&key_field.ty).is_some_and(|inner| is_plain(inner, "i64")) {
        return Err(syn::Error::new(
            key_field.ty.span(),
            format!("key field `{}` must be `Option<i64>`", key_field.ident),
        ));
    }
    let key_ident = &key_field.ident;

    // --- Generate `Entity` ---
    let physical: Vec<&FieldMetadata> = fields_metadata
        .iter()
        .filter(|f| f.is_physical())
        .collect();
    let columns: Vec<&str> = physical.iter().map(|f| f.column_name.as_str()).collect();
    let idents: Vec<&Ident> = physical.iter().map(|f| &f.ident).collect();
    let types: Vec<&Type> = physical.iter().map(|f| &f.ty).collect();
    let temps: Vec<Ident> = physical
        .iter()
        .map(|f| format_ident!("__rowmap_{}", f.ident))
        .collect();

    let cache_impl = caches.first().map(|f| {
        let ident = &f.ident;
        quote! {
            fn property_cache(&self) -> ::core::option::Option<&::rowmap_core::PropertyCache> {
                ::core::option::Option::Some(&self.#ident)
            }
        }
    });

    Ok(quote! {
        impl ::rowmap_core::Entity for #struct_name {
            const TYPE_NAME: &'static str = #type_name;
            const COLUMNS: &'static [&'static str] = &[#(#columns),*];

            fn key(&self) -> ::core::option::Option<i64> {
                self.#key_ident
            }

            fn set_key(&mut self, key: ::core::option::Option<i64>) {
                self.#key_ident = key;
            }

            fn column_value(&self, column: &str) -> ::core::option::Option<::rowmap_core::Value> {
                match column {
                    #(#columns => ::core::option::Option::Some(
                        <::rowmap_core::Value as ::core::convert::From<#types>>::from(
                            ::core::clone::Clone::clone(&self.#idents)
                        )
                    ),)*
                    _ => ::core::option::Option::None,
                }
            }

            fn assign_row(&mut self, row: &::rowmap_core::Row) -> ::rowmap_core::RepoResult<()> {
                #(
                    let #temps = ::rowmap_core::read_column::<#types>(row, #type_name, #columns)?;
                )*
                #(
                    if let ::core::option::Option::Some(value) = #temps {
                        self.#idents = value;
                    }
                )*
                ::core::result::Result::Ok(())
            }

            #cache_impl
        }
    })
}
