//! Entity-level data access.
//!
//! [`Access`] ties the pieces together: it maps an entity, composes filters and ordering into
//! a [`QueryBuilder`], hands the statement to an [`Executor`] and hydrates result rows back
//! into the entity. Every operation runs its statements one after another and finishes before
//! returning. For atomicity across operations, build the `Access` over a transaction.
//!
//! ```ignore
//! use dbmap::{Access, Filter, Order, RowControl};
//!
//! let access = Access::new(&client);
//! let id = access.insert_selective(&User { name: "x".into(), ..Default::default() }).await?;
//!
//! let probe = User { active: true, ..Default::default() };
//! let order = vec![Order::desc("id", 1)];
//! let mut user = User::default();
//! let page = access
//!     .select_page(&mut user, 20, 1, Some(&order), &[Filter::new(&probe)], |_, u| {
//!         println!("{u:?}");
//!         RowControl::Continue
//!     })
//!     .await?;
//! ```

use crate::builder::QueryBuilder;
use crate::config::AccessConfig;
use crate::dialect::{Capabilities, Dialect};
use crate::entity::{Entity, EntityMap, hydrate};
use crate::error::{DbError, DbResult};
use crate::executor::{Executor, Row, RowStream};
use crate::field::{FieldDescriptor, SortDirection};
use crate::filter::{Filter, apply_filters};
use crate::order::{OrderSource, ResolvedOrder, order_by, order_clause};
use crate::pagination::{PageQuery, PageStrategy, Pagination, build_page_query, default_order_column};
use crate::result::SelectResult;
use crate::value::{FromValue, Value};
use futures_util::StreamExt;
use std::future::Future;
use tracing::Level;

/// Decision returned by a row callback.
#[derive(Debug)]
pub enum RowControl {
    /// Keep pulling rows.
    Continue,
    /// Stop without error. Rows already delivered stand.
    Stop,
    /// Stop and return this error from the operation.
    Abort(DbError),
}

/// Data access over one executor.
pub struct Access<'e, X: Executor> {
    executor: &'e X,
    config: AccessConfig,
}

impl<'e, X: Executor> Access<'e, X> {
    pub fn new(executor: &'e X) -> Self {
        Self::with_config(executor, AccessConfig::default())
    }

    pub fn with_config(executor: &'e X, config: AccessConfig) -> Self {
        Self { executor, config }
    }

    pub fn executor(&self) -> &'e X {
        self.executor
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub fn dialect(&self) -> Dialect {
        self.executor.dialect()
    }

    /// Configured capabilities, falling back to what the executor reports.
    pub fn capabilities(&self) -> Capabilities {
        self.config
            .capabilities
            .unwrap_or_else(|| self.executor.capabilities())
    }

    /// A fresh builder for this executor's dialect.
    pub fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.dialect())
    }

    // ==================== INSERT ====================

    /// Insert every non-auto-increment field. Returns the generated key, or `0` when the
    /// entity has no auto-increment column or the engine cannot report one.
    pub async fn insert<E: Entity>(&self, entity: &E) -> DbResult<i64> {
        self.insert_fields(entity, false, &[]).await
    }

    /// Insert only fields holding a non-empty value.
    pub async fn insert_selective<E: Entity>(&self, entity: &E) -> DbResult<i64> {
        self.insert_fields(entity, true, &[]).await
    }

    /// Insert every non-auto-increment field plus `extra` columns.
    pub async fn insert_with<E: Entity>(
        &self,
        entity: &E,
        extra: &[FieldDescriptor],
    ) -> DbResult<i64> {
        self.insert_fields(entity, false, extra).await
    }

    async fn insert_fields<E: Entity>(
        &self,
        entity: &E,
        selective: bool,
        extra: &[FieldDescriptor],
    ) -> DbResult<i64> {
        let map = EntityMap::of(entity)?;
        let mut qb = self.builder();
        qb.insert(map.table());

        let mut auto_column = None;
        for field in map.fields() {
            if field.auto_increment {
                auto_column = Some(field.name.as_str());
                continue;
            }
            if selective && field.value_empty() {
                continue;
            }
            qb.value(&field.name, field.value.clone());
        }
        for field in extra {
            qb.value(&field.name, field.value.clone());
        }
        let (mut sql, args) = qb.build()?;

        let Some(column) = auto_column else {
            self.execute_prepared("insert", &sql, &args).await?;
            return Ok(0);
        };

        if self.dialect().identity_strategy().decorate(&mut sql, column) {
            let row = self
                .run("insert", &sql, &args, self.executor.query_row(&sql, &args))
                .await?;
            scalar(row)
        } else {
            let result = self
                .run("insert", &sql, &args, self.executor.execute(&sql, &args))
                .await?;
            Ok(result.last_insert_id.unwrap_or(0))
        }
    }

    // ==================== DELETE / UPDATE ====================

    /// Delete the rows of `entity`'s table matching `filters`. With no usable filter every row
    /// is deleted.
    pub async fn delete<E: Entity>(&self, entity: &E, filters: &[Filter<'_>]) -> DbResult<u64> {
        let map = EntityMap::of(entity)?;
        let mut qb = self.builder();
        qb.delete(map.table());
        apply_filters(&mut qb, filters)?;
        let (sql, args) = qb.build()?;
        self.execute_prepared("delete", &sql, &args).await
    }

    /// Set every non-auto-increment field on the rows matching `filters`.
    pub async fn update<E: Entity>(&self, entity: &E, filters: &[Filter<'_>]) -> DbResult<u64> {
        self.update_fields(entity, false, filters).await
    }

    /// Set only non-empty fields on the rows matching `filters`.
    pub async fn update_selective<E: Entity>(
        &self,
        entity: &E,
        filters: &[Filter<'_>],
    ) -> DbResult<u64> {
        self.update_fields(entity, true, filters).await
    }

    async fn update_fields<E: Entity>(
        &self,
        entity: &E,
        selective: bool,
        filters: &[Filter<'_>],
    ) -> DbResult<u64> {
        let map = EntityMap::of(entity)?;
        let mut qb = self.builder();
        qb.update(map.table());
        push_sets(&mut qb, map.fields(), selective, false)?;
        apply_filters(&mut qb, filters)?;
        let (sql, args) = qb.build()?;
        self.execute_prepared("update", &sql, &args).await
    }

    /// Update the row identified by the entity's primary key.
    ///
    /// When nothing is affected a `COUNT(*)` probe on the same key decides the result, so an
    /// unchanged-but-present row reports `1` and a missing row reports `0`.
    pub async fn update_by_primary_key<E: Entity>(&self, entity: &E) -> DbResult<u64> {
        self.update_by_key(entity, false).await
    }

    /// Like [`update_by_primary_key`](Self::update_by_primary_key), writing only non-empty fields.
    pub async fn update_selective_by_primary_key<E: Entity>(&self, entity: &E) -> DbResult<u64> {
        self.update_by_key(entity, true).await
    }

    async fn update_by_key<E: Entity>(&self, entity: &E, selective: bool) -> DbResult<u64> {
        let map = EntityMap::of(entity)?;
        let keys: Vec<&FieldDescriptor> = map.primary_keys().collect();
        if keys.is_empty() {
            return Err(DbError::mapping(format!(
                "{} has no primary key",
                map.table()
            )));
        }

        let mut qb = self.builder();
        qb.update(map.table());
        push_sets(&mut qb, map.fields(), selective, true)?;
        push_key_where(&mut qb, &keys);
        let (sql, args) = qb.build()?;
        let affected = self.execute_prepared("update", &sql, &args).await?;
        if affected > 0 {
            return Ok(affected);
        }

        qb.reset();
        qb.select("COUNT(*)", false).from(map.table());
        push_key_where(&mut qb, &keys);
        let (sql, args) = qb.build()?;
        let row = self
            .run("update.probe", &sql, &args, self.executor.query_row(&sql, &args))
            .await?;
        scalar(row)
    }

    // ==================== SELECT ====================

    /// Count the rows of `entity`'s table matching `filters`.
    pub async fn select_count<E: Entity>(
        &self,
        entity: &E,
        filters: &[Filter<'_>],
    ) -> DbResult<u64> {
        let map = EntityMap::of(entity)?;
        self.count_rows(map.table(), filters).await
    }

    /// Load the first matching row into `entity`.
    ///
    /// Returns [`DbError::NoRows`] when nothing matches.
    pub async fn select_one<E: Entity>(
        &self,
        entity: &mut E,
        filters: &[Filter<'_>],
    ) -> DbResult<()> {
        let map = EntityMap::of(&*entity)?;
        let mut qb = self.builder();
        qb.select(&map.column_list(), false).from(map.table());
        apply_filters(&mut qb, filters)?;
        let (sql, args) = qb.build()?;
        let row = self
            .run("select_one", &sql, &args, self.executor.query_row(&sql, &args))
            .await?;
        hydrate(entity, row)
    }

    /// Stream matching rows through `entity`, calling `on_row` after each row is loaded.
    pub async fn select_list<E, F>(
        &self,
        entity: &mut E,
        order: Option<&(dyn OrderSource + Sync)>,
        filters: &[Filter<'_>],
        on_row: F,
    ) -> DbResult<()>
    where
        E: Entity,
        F: FnMut(u64, &E) -> RowControl,
    {
        self.select_rows(entity, false, order, filters, on_row).await
    }

    /// [`select_list`](Self::select_list) with `SELECT DISTINCT`.
    pub async fn select_distinct<E, F>(
        &self,
        entity: &mut E,
        order: Option<&(dyn OrderSource + Sync)>,
        filters: &[Filter<'_>],
        on_row: F,
    ) -> DbResult<()>
    where
        E: Entity,
        F: FnMut(u64, &E) -> RowControl,
    {
        self.select_rows(entity, true, order, filters, on_row).await
    }

    /// Collect every matching row.
    pub async fn select_all<E>(
        &self,
        entity: &mut E,
        order: Option<&(dyn OrderSource + Sync)>,
        filters: &[Filter<'_>],
    ) -> DbResult<Vec<E>>
    where
        E: Entity + Clone,
    {
        let mut out = Vec::new();
        self.select_rows(entity, false, order, filters, |_, row| {
            out.push(row.clone());
            RowControl::Continue
        })
        .await?;
        Ok(out)
    }

    async fn select_rows<E, F>(
        &self,
        entity: &mut E,
        distinct: bool,
        order: Option<&(dyn OrderSource + Sync)>,
        filters: &[Filter<'_>],
        on_row: F,
    ) -> DbResult<()>
    where
        E: Entity,
        F: FnMut(u64, &E) -> RowControl,
    {
        let map = EntityMap::of(&*entity)?;
        let mut qb = self.builder();
        qb.select(&map.column_list(), distinct).from(map.table());
        apply_filters(&mut qb, filters)?;
        if let Some(order) = order {
            qb.order_by(&order_by(order));
        }
        let (sql, args) = qb.build()?;
        self.stream_into(entity, "select_list", &sql, &args, on_row)
            .await
    }

    /// Load one page of matching rows.
    ///
    /// Counts first, clamps `page_index` into range, and skips the page query when nothing
    /// matches. Without an order the first primary key (else the first column) ascends.
    pub async fn select_page<E, F>(
        &self,
        entity: &mut E,
        page_size: u64,
        page_index: u64,
        order: Option<&(dyn OrderSource + Sync)>,
        filters: &[Filter<'_>],
        on_row: F,
    ) -> DbResult<Pagination>
    where
        E: Entity,
        F: FnMut(u64, &E) -> RowControl,
    {
        let map = EntityMap::of(&*entity)?;
        let total = self.count_rows(map.table(), filters).await?;
        let pagination = Pagination::new(total, page_size, page_index);
        if pagination.is_empty() {
            return Ok(pagination);
        }

        let mut order_sql = order.map(|o| order_by(o)).unwrap_or_default();
        if order_sql.is_empty() {
            let column = default_order_column(map.fields())
                .ok_or_else(|| DbError::mapping(format!("{} has no columns", map.table())))?;
            order_sql = order_clause(&[ResolvedOrder {
                column: column.to_string(),
                direction: Some(SortDirection::Asc),
            }]);
        }

        let columns = map.column_list();
        let query = PageQuery {
            table: map.table(),
            columns: &columns,
            order: &order_sql,
            filters,
        };
        let mut qb = self.builder();
        let strategy = PageStrategy::for_capabilities(self.capabilities());
        build_page_query(&mut qb, strategy, &query, &pagination)?;
        let (sql, args) = qb.build()?;
        self.stream_into(entity, "select_page", &sql, &args, on_row)
            .await?;
        Ok(pagination)
    }

    /// Run arbitrary SQL and collect the rows keyed by generated column ids.
    pub async fn query_result(&self, sql: &str, args: &[Value]) -> DbResult<SelectResult> {
        let mut rows = self
            .run("query_result", sql, args, self.executor.query(sql, args))
            .await?;
        let mut result = SelectResult::default();
        while let Some(row) = self.next_row("query_result", &mut rows).await? {
            result.push_row(row);
        }
        Ok(result)
    }

    // ==================== internals ====================

    async fn count_rows(&self, table: &str, filters: &[Filter<'_>]) -> DbResult<u64> {
        let mut qb = self.builder();
        qb.select("COUNT(*)", false).from(table);
        apply_filters(&mut qb, filters)?;
        let (sql, args) = qb.build()?;
        let row = self
            .run("select_count", &sql, &args, self.executor.query_row(&sql, &args))
            .await?;
        scalar(row)
    }

    async fn stream_into<E, F>(
        &self,
        entity: &mut E,
        op: &'static str,
        sql: &str,
        args: &[Value],
        mut on_row: F,
    ) -> DbResult<()>
    where
        E: Entity,
        F: FnMut(u64, &E) -> RowControl,
    {
        let mut rows = self
            .run(op, sql, args, self.executor.query(sql, args))
            .await?;
        let mut index = 0u64;
        while let Some(row) = self.next_row(op, &mut rows).await? {
            hydrate(entity, row)?;
            match on_row(index, entity) {
                RowControl::Continue => index += 1,
                RowControl::Stop => break,
                RowControl::Abort(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn execute_prepared(&self, op: &'static str, sql: &str, args: &[Value]) -> DbResult<u64> {
        let statement = self.run(op, sql, args, self.executor.prepare(sql)).await?;
        let result = self
            .timed(self.executor.execute_prepared(&statement, args))
            .await
            .inspect_err(|err| log_failure(op, err))?;
        Ok(result.rows_affected)
    }

    /// Log the statement, then await it under the configured timeout.
    async fn run<T, Fut>(&self, op: &'static str, sql: &str, args: &[Value], fut: Fut) -> DbResult<T>
    where
        Fut: Future<Output = DbResult<T>>,
    {
        self.log_statement(op, sql, args.len());
        self.timed(fut).await.inspect_err(|err| log_failure(op, err))
    }

    /// Pull the next row under the configured timeout.
    async fn next_row(&self, op: &'static str, rows: &mut RowStream) -> DbResult<Option<Row>> {
        self.timed(async { rows.next().await.transpose() })
            .await
            .inspect_err(|err| log_failure(op, err))
    }

    async fn timed<T, Fut>(&self, fut: Fut) -> DbResult<T>
    where
        Fut: Future<Output = DbResult<T>>,
    {
        match self.config.query_timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .unwrap_or_else(|_| Err(DbError::Timeout(limit))),
            None => fut.await,
        }
    }

    fn log_statement(&self, op: &'static str, sql: &str, param_count: usize) {
        /// Dispatch a tracing event at a runtime-determined level.
        macro_rules! emit_at_level {
            ($level:expr, $($field:tt)*) => {
                match $level {
                    Level::ERROR => tracing::error!($($field)*),
                    Level::WARN  => tracing::warn!($($field)*),
                    Level::INFO  => tracing::info!($($field)*),
                    Level::DEBUG => tracing::debug!($($field)*),
                    Level::TRACE => tracing::trace!($($field)*),
                }
            };
        }

        let log = &self.config.log;
        if !log.enabled {
            return;
        }
        let sql = log.display_sql(sql);
        emit_at_level!(
            log.level,
            target: "dbmap.sql",
            op,
            dialect = ?self.dialect(),
            param_count,
            sql = %sql,
        );
    }
}

fn log_failure(op: &'static str, err: &DbError) {
    tracing::warn!(target: "dbmap.sql", op, error = %err, "statement failed");
}

/// SET every writable field. Auto-increment fields are never written; key fields are skipped
/// when they address the row instead.
fn push_sets(
    qb: &mut QueryBuilder,
    fields: &[FieldDescriptor],
    selective: bool,
    skip_keys: bool,
) -> DbResult<()> {
    for field in fields {
        if field.auto_increment || (skip_keys && field.primary_key) {
            continue;
        }
        if selective && field.value_empty() {
            continue;
        }
        qb.set(&field.name, field.value.clone());
    }
    if qb.column_count() == 0 {
        return Err(DbError::mapping("no columns to update"));
    }
    Ok(())
}

fn push_key_where(qb: &mut QueryBuilder, keys: &[&FieldDescriptor]) {
    for (i, key) in keys.iter().enumerate() {
        let fragment = format!("{} = ?", key.name);
        if i == 0 {
            qb.where_sql(&fragment, [key.value.clone()]);
        } else {
            qb.and_where(&fragment, [key.value.clone()]);
        }
    }
}

/// First column of a single-value row.
fn scalar<T: FromValue>(row: Row) -> DbResult<T> {
    let column = row
        .columns()
        .first()
        .map(|c| c.name.clone())
        .unwrap_or_default();
    let value = row
        .into_values()
        .into_iter()
        .next()
        .ok_or_else(|| DbError::mapping("expected a single-column row, got no columns"))?;
    T::from_value(value).map_err(|e| DbError::decode(column, e.to_string()))
}

#[cfg(test)]
mod tests;
