//! Derive macros for dbmap
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derive `Entity`, `FilterSource` and `OrderSource` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use dbmap::Entity;
///
/// #[derive(Default, Entity)]
/// #[orm(table = "users", schema = "auth")]
/// struct User {
///     #[orm(id, auto)]
///     id: i64,
///     #[orm(filter = "like", order = "asc")]
///     name: String,
///     #[orm(column = "is_active")]
///     active: bool,
///     #[orm(order = "custom")]
///     rank: Option<i32>,
///     #[orm(skip)]
///     cache: Vec<String>,
/// }
/// ```
///
/// # Attributes
///
/// Struct level:
/// - `#[orm(table = "name")]` - Table name (required)
/// - `#[orm(schema = "name")]` - Schema prefix
///
/// Field level:
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(id)]` / `#[orm(primary)]` - Part of the primary key
/// - `#[orm(auto)]` - Generated by the database; never written
/// - `#[orm(filter = "op")]` - Filter operator: `=`, `<>`, `>`, `<`, `>=`, `<=`, `like`, `in`, `custom`
/// - `#[orm(order = "asc" | "desc" | "custom")]` - Sort contribution; bare `order` sorts without a direction
/// - `#[orm(skip)]` - Not mapped
///
/// Mapped fields must implement `ToValue` and `FromValue`; `custom` order fields must also
/// implement `IntoOrderValue`. Only `custom` fields are read for an order value, so a field
/// with an `asc`/`desc` token always sorts by that token. Hand-written `OrderSource` impls can
/// pass an `Order` value for any column through `OrderTerm::for_column`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
