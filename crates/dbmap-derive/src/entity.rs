//! Entity derive macro implementation.

mod attrs;

use attrs::{FieldAttrs, FieldOrder, StructAttrs};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

struct MappedField {
    ident: syn::Ident,
    column: String,
    attrs: FieldAttrs,
}

fn struct_attrs(input: &DeriveInput) -> Result<StructAttrs> {
    let mut merged = StructAttrs::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        let parsed: StructAttrs = attr.parse_args()?;
        merged.table = parsed.table.or(merged.table);
        merged.schema = parsed.schema.or(merged.schema);
    }
    Ok(merged)
}

fn mapped_fields(input: &DeriveInput) -> Result<Vec<MappedField>> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let mut mapped = Vec::new();
    for field in fields {
        let attrs = FieldAttrs::from_field(field)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let column = attrs
            .column
            .clone()
            .unwrap_or_else(|| ident.to_string().trim_start_matches("r#").to_string());
        mapped.push(MappedField {
            ident,
            column,
            attrs,
        });
    }

    if mapped.is_empty() {
        return Err(syn::Error::new_spanned(
            input,
            "Entity requires at least one mapped field",
        ));
    }
    Ok(mapped)
}

fn column_def(field: &MappedField) -> TokenStream {
    let column = &field.column;
    let mut def = quote! { ::dbmap::ColumnDef::new(#column) };
    if field.attrs.primary {
        def = quote! { #def.primary_key() };
    }
    if field.attrs.auto {
        def = quote! { #def.auto_increment() };
    }
    if let Some(op) = &field.attrs.filter {
        def = quote! { #def.filter(::dbmap::FilterOp::#op) };
    }
    if let Some(FieldOrder::Token(token)) = &field.attrs.order {
        def = quote! { #def.sort(::dbmap::SortToken::#token) };
    }
    def
}

pub(super) fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let attrs = struct_attrs(&input)?;
    let table = attrs.table.ok_or_else(|| {
        syn::Error::new_spanned(
            &input,
            "Entity requires #[orm(table = \"table_name\")] attribute",
        )
    })?;
    let fields = mapped_fields(&input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let schema = attrs.schema.map(|schema| {
        quote! { const SCHEMA: ::core::option::Option<&'static str> = ::core::option::Option::Some(#schema); }
    });
    let column_defs = fields.iter().map(column_def);
    let values = fields.iter().map(|f| {
        let ident = &f.ident;
        quote! { ::dbmap::FieldValue::of(&self.#ident) }
    });
    let targets = fields.iter().map(|f| {
        let ident = &f.ident;
        quote! { &mut self.#ident as &mut dyn ::dbmap::ScanTarget }
    });

    let order_terms: Vec<TokenStream> = fields
        .iter()
        .enumerate()
        .filter_map(|(idx, f)| {
            let order = f.attrs.order.as_ref()?;
            let ident = &f.ident;
            let value = if order.is_custom() {
                quote! { ::dbmap::IntoOrderValue::order_value(&self.#ident) }
            } else {
                quote! { ::dbmap::OrderValue::None }
            };
            Some(quote! {
                ::dbmap::OrderTerm::for_column(&columns[#idx], || #value)
            })
        })
        .collect();
    let order_body = if order_terms.is_empty() {
        quote! { ::std::vec::Vec::new() }
    } else {
        quote! {
            let columns = <Self as ::dbmap::Entity>::COLUMNS;
            ::std::vec![#(#order_terms),*]
        }
    };

    Ok(quote! {
        impl #impl_generics ::dbmap::Entity for #name #ty_generics #where_clause {
            const TABLE: &'static str = #table;
            #schema
            const COLUMNS: &'static [::dbmap::ColumnDef] = &[#(#column_defs),*];

            fn field_values(&self) -> ::std::vec::Vec<::dbmap::FieldValue> {
                ::std::vec![#(#values),*]
            }

            fn scan_targets(&mut self) -> ::std::vec::Vec<&mut dyn ::dbmap::ScanTarget> {
                ::std::vec![#(#targets),*]
            }
        }

        impl #impl_generics ::dbmap::FilterSource for #name #ty_generics #where_clause {
            fn filter_fields(&self) -> ::dbmap::DbResult<::std::vec::Vec<::dbmap::FieldDescriptor>> {
                ::dbmap::descriptors(self)
            }
        }

        impl #impl_generics ::dbmap::OrderSource for #name #ty_generics #where_clause {
            fn order_terms(&self) -> ::std::vec::Vec<::dbmap::OrderTerm> {
                #order_body
            }
        }
    })
}
