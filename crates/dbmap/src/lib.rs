//! # dbmap
//!
//! Map plain structs onto relational tables and run CRUD, filtered, ordered and paginated
//! queries against any engine reachable through an [`Executor`].
//!
//! ## Features
//!
//! - **Declarative mapping**: `#[derive(Entity)]` with `#[orm(...)]` attributes describes the
//!   table, columns, keys, filter operators and sort behavior of a struct
//! - **Selective writes**: insert or update only fields holding a non-default value
//! - **Query-by-example**: any entity (or a list of [`FieldDescriptor`]s) is a filter source;
//!   filters combine with AND/OR inside and between groups
//! - **Dialect-aware SQL**: placeholders, identity retrieval and pagination follow the
//!   [`Dialect`] and the engine's [`Capabilities`]
//! - **Streaming reads**: row callbacks can stop or abort iteration
//! - **Structured SQL logging** on the `dbmap.sql` tracing target
//!
//! ## Example
//!
//! ```ignore
//! use dbmap::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id, auto)]
//!     id: i64,
//!     #[orm(filter = "like")]
//!     name: String,
//!     #[orm(order = "desc")]
//!     created: chrono::NaiveDateTime,
//! }
//!
//! let access = Access::new(&client);
//! let id = access.insert_selective(&User { name: "alice".into(), ..Default::default() }).await?;
//!
//! let probe = User { name: "al%".into(), ..Default::default() };
//! let users = access
//!     .select_all(&mut User::default(), Some(&probe), &[Filter::new(&probe)])
//!     .await?;
//! ```

pub mod access;
pub mod builder;
pub mod config;
pub mod dialect;
pub mod entity;
pub mod error;
pub mod executor;
pub mod field;
pub mod filter;
pub mod order;
pub mod pagination;
pub mod prelude;
pub mod result;
pub mod value;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
pub(crate) mod testing;

pub use access::{Access, RowControl};
pub use builder::QueryBuilder;
pub use config::{AccessConfig, SqlLogConfig};
pub use dialect::{Capabilities, Dialect, IdentityStrategy};
pub use entity::{Entity, EntityMap, FilterSource, ScanTarget, descriptors, hydrate};
pub use error::{DbError, DbResult};
pub use executor::{Column, ExecResult, Executor, Row, RowStream};
pub use field::{ColumnDef, FieldDescriptor, FilterOp, SortDirection, SortToken};
pub use filter::{Filter, apply_filters, map_filter_source};
pub use order::{
    IntoOrderValue, Order, OrderSource, OrderTerm, OrderValue, ResolvedOrder, order_by,
    resolve_order,
};
pub use pagination::{PageStrategy, Pagination};
pub use result::{SelectColumn, SelectResult, SelectRow};
pub use value::{ConversionError, FieldValue, FromValue, ToValue, Value};

#[cfg(feature = "pool")]
pub use pool::{PoolConfig, create_pool, create_pool_with_config, create_pool_with_tls};

#[cfg(feature = "derive")]
pub use dbmap_derive::Entity;
