//! Attribute parsing for Entity derive macro.

use proc_macro2::Span;
use syn::{Error, LitStr, Result};

/// Filter operators accepted by `#[orm(filter = "...")]`, mapped to `FilterOp` variants.
const FILTER_OPS: &[(&str, &str)] = &[
    ("", "Eq"),
    ("=", "Eq"),
    ("<>", "Ne"),
    ("!=", "Ne"),
    (">", "Gt"),
    ("<", "Lt"),
    (">=", "Ge"),
    ("<=", "Le"),
    ("like", "Like"),
    ("in", "In"),
    ("custom", "Custom"),
];

/// Sort tokens accepted by `#[orm(order = "...")]`, mapped to `SortToken` variants.
const SORT_TOKENS: &[(&str, &str)] = &[("asc", "Asc"), ("desc", "Desc"), ("custom", "Custom")];

fn lookup_token(lit: &LitStr, table: &[(&str, &'static str)], what: &str) -> Result<syn::Ident> {
    let raw = lit.value();
    let key = raw.trim().to_ascii_lowercase();
    table
        .iter()
        .find(|(token, _)| *token == key)
        .map(|(_, variant)| syn::Ident::new(variant, Span::call_site()))
        .ok_or_else(|| Error::new(lit.span(), format!("unknown {what} token '{raw}'")))
}

fn is_valid_sql_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn sql_ident(lit: &LitStr, what: &str) -> Result<String> {
    let value = lit.value();
    let value = value.trim();
    if !is_valid_sql_ident(value) {
        return Err(Error::new(
            lit.span(),
            format!("{what} must be a valid SQL identifier (expected [A-Za-z_][A-Za-z0-9_]*)"),
        ));
    }
    Ok(value.to_string())
}

fn comma(input: syn::parse::ParseStream) -> Result<bool> {
    if input.peek(syn::Token![,]) {
        let _: syn::Token![,] = input.parse()?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// `#[orm(table = "...", schema = "...")]` on the struct.
#[derive(Default)]
pub(super) struct StructAttrs {
    pub(super) table: Option<String>,
    pub(super) schema: Option<String>,
}

impl syn::parse::Parse for StructAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = StructAttrs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: LitStr = input.parse()?;

            match ident.to_string().as_str() {
                "table" => attrs.table = Some(sql_ident(&value, "table")?),
                "schema" => attrs.schema = Some(sql_ident(&value, "schema")?),
                other => {
                    return Err(Error::new(
                        ident.span(),
                        format!("unknown struct attribute '{other}'"),
                    ));
                }
            }

            if !comma(input)? {
                break;
            }
        }

        Ok(attrs)
    }
}

/// Sort contribution of a field.
pub(super) enum FieldOrder {
    /// Bare `order`: sorted without a direction keyword.
    Plain,
    /// `order = "..."`, holding the `SortToken` variant.
    Token(syn::Ident),
}

impl FieldOrder {
    pub(super) fn is_custom(&self) -> bool {
        matches!(self, FieldOrder::Token(variant) if variant == "Custom")
    }
}

/// Field-level `#[orm(...)]`.
#[derive(Default)]
pub(super) struct FieldAttrs {
    pub(super) column: Option<String>,
    pub(super) primary: bool,
    pub(super) auto: bool,
    /// `FilterOp` variant.
    pub(super) filter: Option<syn::Ident>,
    pub(super) order: Option<FieldOrder>,
    pub(super) skip: bool,
}

impl FieldAttrs {
    /// Merge every `#[orm(...)]` on a field.
    pub(super) fn from_field(field: &syn::Field) -> Result<Self> {
        let mut merged = FieldAttrs::default();
        for attr in &field.attrs {
            if !attr.path().is_ident("orm") {
                continue;
            }
            let parsed: FieldAttrs = attr.parse_args()?;
            merged.column = parsed.column.or(merged.column);
            merged.primary |= parsed.primary;
            merged.auto |= parsed.auto;
            merged.filter = parsed.filter.or(merged.filter);
            merged.order = parsed.order.or(merged.order);
            merged.skip |= parsed.skip;
        }
        Ok(merged)
    }
}

impl syn::parse::Parse for FieldAttrs {
    fn parse(input: syn::parse::ParseStream) -> Result<Self> {
        let mut attrs = FieldAttrs::default();

        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            let key = ident.to_string();

            if input.peek(syn::Token![=]) {
                let _: syn::Token![=] = input.parse()?;
                let value: LitStr = input.parse()?;
                match key.as_str() {
                    "column" => attrs.column = Some(sql_ident(&value, "column")?),
                    "filter" => attrs.filter = Some(lookup_token(&value, FILTER_OPS, "filter")?),
                    "order" => {
                        let variant = lookup_token(&value, SORT_TOKENS, "order")?;
                        attrs.order = Some(FieldOrder::Token(variant));
                    }
                    other => {
                        return Err(Error::new(
                            ident.span(),
                            format!("unknown field attribute '{other} = ...'"),
                        ));
                    }
                }
            } else {
                match key.as_str() {
                    "id" | "primary" => attrs.primary = true,
                    "auto" => attrs.auto = true,
                    "order" => attrs.order = Some(FieldOrder::Plain),
                    "skip" => attrs.skip = true,
                    other => {
                        return Err(Error::new(
                            ident.span(),
                            format!("unknown field attribute '{other}'"),
                        ));
                    }
                }
            }

            if !comma(input)? {
                break;
            }
        }

        Ok(attrs)
    }
}
