//! tokio-postgres adapter.
//!
//! Implements [`Executor`] for [`tokio_postgres::Client`] and [`tokio_postgres::Transaction`].
//! Arguments are bound through [`ToSql`] for [`Value`]; result rows are converted column by
//! column from the server-reported type.

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::executor::{Column, ExecResult, Executor, Row, RowStream};
use crate::value::Value;
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures_core::Stream;
use std::error::Error;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio_postgres::types::{IsNull, ToSql, Type, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => b.to_sql_checked(ty, out),
            Value::Int(i) => {
                if *ty == Type::INT2 {
                    i16::try_from(*i)?.to_sql_checked(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*i)?.to_sql_checked(ty, out)
                } else if *ty == Type::OID {
                    u32::try_from(*i)?.to_sql_checked(ty, out)
                } else if *ty == Type::FLOAT8 {
                    (*i as f64).to_sql_checked(ty, out)
                } else {
                    i.to_sql_checked(ty, out)
                }
            }
            Value::Float(f) => {
                if *ty == Type::FLOAT4 {
                    (*f as f32).to_sql_checked(ty, out)
                } else {
                    f.to_sql_checked(ty, out)
                }
            }
            // Integer columns take decimal text (wide u64 values), range-checked like Int.
            Value::Text(s) if is_integer_type(ty) => {
                let wide: i64 = s.trim().parse()?;
                Value::Int(wide).to_sql(ty, out)
            }
            Value::Text(s) => s.to_sql_checked(ty, out),
            Value::Timestamp(ts) => {
                if *ty == Type::TIMESTAMPTZ {
                    ts.and_utc().to_sql_checked(ty, out)
                } else if *ty == Type::DATE {
                    ts.date().to_sql_checked(ty, out)
                } else {
                    ts.to_sql_checked(ty, out)
                }
            }
            Value::Uuid(u) => u.to_sql_checked(ty, out),
            Value::Json(j) => j.to_sql_checked(ty, out),
            Value::Bytes(b) => b.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn is_integer_type(ty: &Type) -> bool {
    *ty == Type::INT2 || *ty == Type::INT4 || *ty == Type::INT8
}

fn as_params(args: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    args.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn convert_columns(row: &tokio_postgres::Row) -> Arc<[Column]> {
    row.columns()
        .iter()
        .map(|c| Column::new(c.name(), c.type_().name()))
        .collect()
}

fn decode_value(row: &tokio_postgres::Row, idx: usize) -> DbResult<Value> {
    let column = &row.columns()[idx];
    let ty = column.type_();
    let fail = |e: tokio_postgres::Error| DbError::decode(column.name(), e.to_string());

    let value: Value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map_err(fail)?.into()
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx).map_err(fail)?.into()
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx).map_err(fail)?.into()
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map_err(fail)?.into()
    } else if *ty == Type::OID {
        row.try_get::<_, Option<u32>>(idx).map_err(fail)?.into()
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx).map_err(fail)?.into()
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map_err(fail)?.into()
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<NaiveDateTime>>(idx)
            .map_err(fail)?
            .into()
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<DateTime<Utc>>>(idx)
            .map_err(fail)?
            .map(|ts| ts.naive_utc())
            .into()
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<NaiveDate>>(idx)
            .map_err(fail)?
            .map(|d| d.and_time(NaiveTime::MIN))
            .into()
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(fail)?.into()
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(fail)?
            .into()
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx).map_err(fail)?.into()
    } else if <String as tokio_postgres::types::FromSql>::accepts(ty) {
        row.try_get::<_, Option<String>>(idx).map_err(fail)?.into()
    } else {
        return Err(DbError::decode(
            column.name(),
            format!("unsupported column type {}", ty.name()),
        ));
    };
    Ok(value)
}

fn convert_row(columns: Arc<[Column]>, row: &tokio_postgres::Row) -> DbResult<Row> {
    let values = (0..row.len())
        .map(|idx| decode_value(row, idx))
        .collect::<DbResult<Vec<_>>>()?;
    Ok(Row::new(columns, values))
}

/// Converts driver rows, sharing the column metadata of the first row.
struct MapPgRowStream<S> {
    inner: Pin<Box<S>>,
    columns: Option<Arc<[Column]>>,
}

impl<S> MapPgRowStream<S> {
    fn new(stream: S) -> Self {
        Self {
            inner: Box::pin(stream),
            columns: None,
        }
    }
}

impl<S> Stream for MapPgRowStream<S>
where
    S: Stream<Item = Result<tokio_postgres::Row, tokio_postgres::Error>> + Send + 'static,
{
    type Item = DbResult<Row>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let polled = self.inner.as_mut().poll_next(cx);
        match polled {
            Poll::Ready(Some(Ok(row))) => {
                let columns = self
                    .columns
                    .get_or_insert_with(|| convert_columns(&row))
                    .clone();
                Poll::Ready(Some(convert_row(columns, &row)))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(DbError::from(e)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

macro_rules! impl_pg_executor {
    ($ty:ty) => {
        impl Executor for $ty {
            type Statement = tokio_postgres::Statement;

            fn dialect(&self) -> Dialect {
                Dialect::Postgres
            }

            async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<ExecResult> {
                let params = as_params(args);
                let n = <$ty>::execute(self, sql, &params).await?;
                Ok(ExecResult::affected(n))
            }

            async fn query(&self, sql: &str, args: &[Value]) -> DbResult<RowStream> {
                let params = as_params(args);
                let stream = <$ty>::query_raw(self, sql, params.iter().copied()).await?;
                Ok(RowStream::new(MapPgRowStream::new(stream)))
            }

            async fn prepare(&self, sql: &str) -> DbResult<tokio_postgres::Statement> {
                Ok(<$ty>::prepare(self, sql).await?)
            }

            async fn execute_prepared(
                &self,
                statement: &tokio_postgres::Statement,
                args: &[Value],
            ) -> DbResult<ExecResult> {
                let params = as_params(args);
                let n = <$ty>::execute(self, statement, &params).await?;
                Ok(ExecResult::affected(n))
            }
        }
    };
}

impl_pg_executor!(tokio_postgres::Client);
impl_pg_executor!(tokio_postgres::Transaction<'_>);
