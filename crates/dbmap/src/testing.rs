//! Test fixtures: hand-written entities and a scripted executor.

use crate::dialect::{Capabilities, Dialect};
use crate::entity::{Entity, FilterSource, ScanTarget, descriptors};
use crate::error::{DbError, DbResult};
use crate::executor::{Column, ExecResult, Executor, Row, RowStream};
use crate::field::{ColumnDef, FieldDescriptor, FilterOp};
use crate::value::{FieldValue, Value};
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct User {
    pub id: i64,
    pub name: String,
    pub active: bool,
}

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id").primary_key().auto_increment(),
        ColumnDef::new("name").filter(FilterOp::Like),
        ColumnDef::new("active"),
    ];

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::of(&self.id),
            FieldValue::of(&self.name),
            FieldValue::of(&self.active),
        ]
    }

    fn scan_targets(&mut self) -> Vec<&mut dyn ScanTarget> {
        vec![
            &mut self.id as &mut dyn ScanTarget,
            &mut self.name as &mut dyn ScanTarget,
            &mut self.active as &mut dyn ScanTarget,
        ]
    }
}

impl FilterSource for User {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        descriptors(self)
    }
}

/// Composite key, no auto-increment column.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Membership {
    pub org_id: i64,
    pub user_id: i64,
    pub role: Option<String>,
}

impl Entity for Membership {
    const TABLE: &'static str = "memberships";
    const SCHEMA: Option<&'static str> = Some("auth");
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("org_id").primary_key(),
        ColumnDef::new("user_id").primary_key(),
        ColumnDef::new("role"),
    ];

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::of(&self.org_id),
            FieldValue::of(&self.user_id),
            FieldValue::of(&self.role),
        ]
    }

    fn scan_targets(&mut self) -> Vec<&mut dyn ScanTarget> {
        vec![
            &mut self.org_id as &mut dyn ScanTarget,
            &mut self.user_id as &mut dyn ScanTarget,
            &mut self.role as &mut dyn ScanTarget,
        ]
    }
}

/// Filter-only record using the literal operators.
#[derive(Debug, Clone, Default)]
pub(crate) struct UserSearch {
    pub ids: String,
    pub created: String,
    pub min_id: i64,
}

impl Entity for UserSearch {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::new("id").filter(FilterOp::In),
        ColumnDef::new("created").filter(FilterOp::Custom),
        ColumnDef::new("id").filter(FilterOp::Ge),
    ];

    fn field_values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::of(&self.ids),
            FieldValue::of(&self.created),
            FieldValue::of(&self.min_id),
        ]
    }

    fn scan_targets(&mut self) -> Vec<&mut dyn ScanTarget> {
        vec![
            &mut self.ids as &mut dyn ScanTarget,
            &mut self.created as &mut dyn ScanTarget,
            &mut self.min_id as &mut dyn ScanTarget,
        ]
    }
}

impl FilterSource for UserSearch {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        descriptors(self)
    }
}

pub(crate) fn user_row(id: i64, name: &str, active: bool) -> Row {
    let columns: Arc<[Column]> = Arc::from(vec![
        Column::new("id", "int8"),
        Column::new("name", "text"),
        Column::new("active", "bool"),
    ]);
    Row::new(
        columns,
        vec![Value::Int(id), Value::Text(name.into()), Value::Bool(active)],
    )
}

pub(crate) fn scalar_row(value: impl Into<Value>) -> Row {
    Row::from_values(vec![value.into()])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Execute,
    Query,
    Prepare,
    ExecutePrepared,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub kind: CallKind,
    pub sql: String,
    pub args: Vec<Value>,
}

pub(crate) enum Reply {
    Exec(ExecResult),
    Rows(Vec<Row>),
    /// Yield these rows, then never produce another.
    Stall(Vec<Row>),
    Fail(String),
}

/// Records every statement and answers from a queue of scripted replies.
///
/// `prepare` consumes no reply. An exhausted queue answers `0` rows affected or no rows.
pub(crate) struct ScriptedExecutor {
    dialect: Dialect,
    capabilities: Capabilities,
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedExecutor {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            capabilities: dialect.capabilities(),
            calls: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn reply(self, reply: Reply) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn rows(self, rows: Vec<Row>) -> Self {
        self.reply(Reply::Rows(rows))
    }

    pub fn affected(self, n: u64) -> Self {
        self.reply(Reply::Exec(ExecResult::affected(n)))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sql(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.sql).collect()
    }

    fn record(&self, kind: CallKind, sql: &str, args: &[Value]) {
        self.calls.lock().unwrap().push(Call {
            kind,
            sql: sql.to_string(),
            args: args.to_vec(),
        });
    }

    fn next_reply(&self) -> Option<Reply> {
        self.replies.lock().unwrap().pop_front()
    }

    fn exec_reply(&self) -> DbResult<ExecResult> {
        match self.next_reply() {
            Some(Reply::Exec(result)) => Ok(result),
            Some(Reply::Fail(message)) => Err(DbError::execution(message)),
            Some(Reply::Rows(_) | Reply::Stall(_)) => {
                Err(DbError::execution("scripted rows for an execute call"))
            }
            None => Ok(ExecResult::default()),
        }
    }
}

impl Executor for ScriptedExecutor {
    type Statement = String;

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> DbResult<ExecResult> {
        self.record(CallKind::Execute, sql, args);
        self.exec_reply()
    }

    async fn query(&self, sql: &str, args: &[Value]) -> DbResult<RowStream> {
        self.record(CallKind::Query, sql, args);
        match self.next_reply() {
            Some(Reply::Rows(rows)) => Ok(RowStream::from_rows(rows)),
            Some(Reply::Stall(rows)) => Ok(RowStream::new(
                futures_util::stream::iter(rows.into_iter().map(Ok))
                    .chain(futures_util::stream::pending()),
            )),
            Some(Reply::Fail(message)) => Err(DbError::execution(message)),
            Some(Reply::Exec(_)) => Err(DbError::execution("scripted exec for a query call")),
            None => Ok(RowStream::from_rows(Vec::new())),
        }
    }

    async fn prepare(&self, sql: &str) -> DbResult<String> {
        self.record(CallKind::Prepare, sql, &[]);
        Ok(sql.to_string())
    }

    async fn execute_prepared(&self, statement: &String, args: &[Value]) -> DbResult<ExecResult> {
        self.record(CallKind::ExecutePrepared, statement, args);
        self.exec_reply()
    }
}
