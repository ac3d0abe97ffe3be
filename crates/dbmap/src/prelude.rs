//! Convenient imports for typical `dbmap` usage.
//!
//! ```ignore
//! use dbmap::prelude::*;
//! ```

pub use crate::{
    Access, AccessConfig, Capabilities, DbError, DbResult, Dialect, Entity, Executor,
    FieldDescriptor, Filter, FilterOp, Order, Pagination, RowControl, Value,
};

#[cfg(feature = "pool")]
pub use crate::{PoolConfig, create_pool, create_pool_with_config};
