//! # Layout Derive
//!
//! Derive macros used by the ACPI crates:
//!
//! * [`Setters`] generates `set_<field>` / `with_<field>` builders, used for
//!   table headers that callers patch before re-marshaling and for path
//!   configuration.
//! * [`LeLayout`] generates a bounds-checked little-endian reader/writer for
//!   fixed-offset firmware records (table headers, RSDP, MADT sub-records).

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    Data, DeriveInput, Fields, FieldsNamed, Ident, LitBool, LitInt, parse_macro_input,
    spanned::Spanned,
};

/// Derive to generate `.set_<field>(&mut self, value: Ty) -> &mut Self` and
/// `.with_<field>(mut self, value: Ty) -> Self` for each **named** field.
///
/// - Skipping a field: `#[setters(skip)]`
/// - Accepting anything convertible: `#[setters(into)]` makes the setters
///   take `impl Into<Ty>`.
///
/// # Example
///
/// ```
/// use utils_layout_derive::Setters;
///
/// #[derive(Setters)]
/// struct Paths {
///     #[setters(into)]
///     root: String,
///     depth: u32,
///     #[setters(skip)]
///     _cache: Vec<u8>,
/// }
///
/// let mut p = Paths { root: String::new(), depth: 0, _cache: Vec::new() };
/// p.set_depth(2).set_root("/sys");
/// let p = p.with_depth(3);
/// assert_eq!(p.root, "/sys");
/// assert_eq!(p.depth, 3);
/// ```
#[proc_macro_derive(Setters, attributes(setters))]
pub fn derive_generate_setters(input: TokenStream) -> TokenStream {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = parse_macro_input!(input as DeriveInput);

    let fields = match named_fields(&ident, data, "Setters") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut methods = Vec::new();

    for field in fields.named {
        let Some(fname) = &field.ident else { continue };
        let flags = setter_flags(&field.attrs);
        if flags.skip {
            continue;
        }

        let ty = &field.ty;
        let set_name = format_ident!("set_{}", fname);
        let with_name = format_ident!("with_{}", fname);

        let (arg_ty, conv) = if flags.into {
            (quote! { impl ::core::convert::Into<#ty> }, quote! { value.into() })
        } else {
            (quote! { #ty }, quote! { value })
        };

        methods.push(quote! {
            #[inline]
            pub fn #set_name(&mut self, value: #arg_ty) -> &mut Self {
                self.#fname = #conv;
                self
            }

            #[inline]
            #[must_use]
            pub fn #with_name(mut self, value: #arg_ty) -> Self {
                self.#fname = #conv;
                self
            }
        });
    }

    let expanded = quote! {
        impl #impl_generics #ident #ty_generics #where_clause {
            #(#methods)*
        }
    };

    TokenStream::from(expanded)
}

/// Derive `firmware_acpi::le::LeLayout` for a struct whose named fields each
/// carry `#[le(offset = N)]`.
///
/// Every field type must implement `firmware_acpi::le::LeField`. The
/// record length is the furthest field end; reads past the input fail with
/// `None` instead of panicking.
///
/// ```ignore
/// #[derive(LeLayout)]
/// struct IoApic {
///     #[le(offset = 2)]
///     id: u8,
///     #[le(offset = 4)]
///     address: u32,
///     #[le(offset = 8)]
///     gsi_base: u32,
/// }
/// ```
#[proc_macro_derive(LeLayout, attributes(le))]
pub fn derive_le_layout(input: TokenStream) -> TokenStream {
    let DeriveInput {
        ident,
        generics,
        data,
        ..
    } = parse_macro_input!(input as DeriveInput);

    let fields = match named_fields(&ident, data, "LeLayout") {
        Ok(fields) => fields,
        Err(e) => return e.to_compile_error().into(),
    };

    let mut names = Vec::new();
    let mut types = Vec::new();
    let mut offsets = Vec::new();

    for field in fields.named {
        let Some(fname) = field.ident.clone() else {
            continue;
        };
        let offset = match field_offset(&fname, &field.attrs) {
            Ok(offset) => offset,
            Err(e) => return e.to_compile_error().into(),
        };
        names.push(fname);
        types.push(field.ty);
        offsets.push(offset);
    }

    let count = names.len();
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let expanded = quote! {
        impl #impl_generics ::firmware_acpi::le::LeLayout for #ident #ty_generics #where_clause {
            const LEN: usize = {
                let ends: [usize; #count] = [
                    #( #offsets + <#types as ::firmware_acpi::le::LeField>::SIZE ),*
                ];
                let mut max = 0;
                let mut i = 0;
                while i < ends.len() {
                    if ends[i] > max {
                        max = ends[i];
                    }
                    i += 1;
                }
                max
            };

            fn read_le(bytes: &[u8]) -> ::core::option::Option<Self> {
                ::core::option::Option::Some(Self {
                    #( #names: <#types as ::firmware_acpi::le::LeField>::read_le(bytes, #offsets)?, )*
                })
            }

            fn write_le(&self, out: &mut [u8]) -> ::core::option::Option<()> {
                #( ::firmware_acpi::le::LeField::write_le(&self.#names, out, #offsets)?; )*
                ::core::option::Option::Some(())
            }
        }
    };

    TokenStream::from(expanded)
}

fn named_fields(ident: &Ident, data: Data, derive: &str) -> syn::Result<FieldsNamed> {
    match data {
        Data::Struct(s) => match s.fields {
            Fields::Named(n) => Ok(n),
            Fields::Unnamed(u) => Err(syn::Error::new(
                u.span(),
                format!("{derive} only supports named fields"),
            )),
            Fields::Unit => Err(syn::Error::new(
                ident.span(),
                format!("{derive} does not apply to unit structs"),
            )),
        },
        _ => Err(syn::Error::new(
            ident.span(),
            format!("{derive} can only be derived for structs"),
        )),
    }
}

#[derive(Default)]
struct SetterFlags {
    skip: bool,
    into: bool,
}

fn setter_flags(attrs: &[syn::Attribute]) -> SetterFlags {
    let mut flags = SetterFlags::default();
    for attr in attrs {
        if !attr.path().is_ident("setters") {
            continue;
        }

        // Accept #[setters(skip)], #[setters(skip = true)] and #[setters(into)]
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                if meta.input.is_empty() {
                    flags.skip = true;
                } else if let Ok(v) = meta.value()?.parse::<LitBool>()
                    && v.value
                {
                    flags.skip = true;
                }
            } else if meta.path.is_ident("into") {
                flags.into = true;
            }
            Ok(())
        });
    }
    flags
}

fn field_offset(name: &Ident, attrs: &[syn::Attribute]) -> syn::Result<usize> {
    let mut offset = None;
    for attr in attrs {
        if !attr.path().is_ident("le") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("offset") {
                let lit: LitInt = meta.value()?.parse()?;
                offset = Some(lit.base10_parse::<usize>()?);
                Ok(())
            } else {
                Err(meta.error("expected `offset = N`"))
            }
        })?;
    }
    offset.ok_or_else(|| {
        syn::Error::new(
            name.span(),
            format!("field `{name}` is missing #[le(offset = N)]"),
        )
    })
}
