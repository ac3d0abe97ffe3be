//! Incremental SQL statement builder.
//!
//! [`QueryBuilder`] accumulates one statement at a time: a head (`SELECT`, `INSERT`, `UPDATE`,
//! `DELETE`), a `WHERE` clause and trailing text. Bound values are numbered with the dialect's
//! placeholder as they are pushed, so calls must follow clause order: head, then `WHERE`, then
//! trailing clauses. Out-of-order calls are recorded and reported by [`QueryBuilder::build`].
//!
//! ```ignore
//! use dbmap::{Dialect, QueryBuilder};
//!
//! let mut qb = QueryBuilder::new(Dialect::Postgres);
//! qb.select("id, name", false)
//!     .from("users")
//!     .where_sql("status = ?", ["active"])
//!     .and_where("age > ?", [18])
//!     .order_by("order by id ASC");
//! assert_eq!(
//!     qb.query(),
//!     "SELECT id, name FROM users WHERE status = $1 AND age > $2 order by id ASC"
//! );
//! ```

use crate::dialect::Dialect;
use crate::error::{DbError, DbResult};
use crate::value::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Head {
    None,
    Select { columns: String, distinct: bool },
    Insert { table: String },
    Update { table: String },
    Delete { table: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Head,
    Where,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conj {
    None,
    And,
    Or,
}

/// Stateful, single-use statement accumulator. Call [`QueryBuilder::reset`] before reuse.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    dialect: Dialect,
    head: Head,
    from: Option<String>,
    columns: Vec<String>,
    placeholders: Vec<String>,
    where_clause: String,
    tail: String,
    args: Vec<Value>,
    arg_count: usize,
    phase: Phase,
    build_error: Option<String>,
}

impl QueryBuilder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            head: Head::None,
            from: None,
            columns: Vec::new(),
            placeholders: Vec::new(),
            where_clause: String::new(),
            tail: String::new(),
            args: Vec::new(),
            arg_count: 0,
            phase: Phase::Head,
            build_error: None,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Clear all statement state, keeping the dialect.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::new(self.dialect);
        self
    }

    // ==================== Statement heads ====================

    pub fn select(&mut self, columns: &str, distinct: bool) -> &mut Self {
        self.set_head(Head::Select {
            columns: columns.to_string(),
            distinct,
        })
    }

    pub fn insert(&mut self, table: &str) -> &mut Self {
        self.set_head(Head::Insert {
            table: table.to_string(),
        })
    }

    pub fn update(&mut self, table: &str) -> &mut Self {
        self.set_head(Head::Update {
            table: table.to_string(),
        })
    }

    pub fn delete(&mut self, table: &str) -> &mut Self {
        self.set_head(Head::Delete {
            table: table.to_string(),
        })
    }

    /// Source of a SELECT. May be a table name or an opening subquery.
    pub fn from(&mut self, table: &str) -> &mut Self {
        self.from = Some(table.to_string());
        self
    }

    /// Add an INSERT column and bind its value.
    pub fn value(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_column(column, value.into())
    }

    /// Add an UPDATE `column = placeholder` pair and bind its value.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.push_column(column, value.into())
    }

    /// Number of columns pushed with [`value`](Self::value) or [`set`](Self::set).
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    // ==================== WHERE ====================

    /// Attach a fragment with no conjunction. `?` markers bind `args` in order; a fragment
    /// built around [`arg_name`](Self::arg_name) placeholders binds `args` to those instead.
    pub fn where_sql<I, V>(&mut self, sql: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let fragment = self.bind_template(sql, args);
        self.push_where(Conj::None, &fragment)
    }

    /// Attach a fragment joined with `AND`. An empty fragment only emits the conjunction.
    pub fn and_where<I, V>(&mut self, sql: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let fragment = self.bind_template(sql, args);
        self.push_where(Conj::And, &fragment)
    }

    /// Attach a fragment joined with `OR`. An empty fragment only emits the conjunction.
    pub fn or_where<I, V>(&mut self, sql: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let fragment = self.bind_template(sql, args);
        self.push_where(Conj::Or, &fragment)
    }

    /// Attach a formatted fragment verbatim. Nothing is bound.
    pub fn where_fmt(&mut self, fragment: fmt::Arguments<'_>) -> &mut Self {
        self.push_where(Conj::None, &fragment.to_string())
    }

    pub fn and_where_fmt(&mut self, fragment: fmt::Arguments<'_>) -> &mut Self {
        self.push_where(Conj::And, &fragment.to_string())
    }

    pub fn or_where_fmt(&mut self, fragment: fmt::Arguments<'_>) -> &mut Self {
        self.push_where(Conj::Or, &fragment.to_string())
    }

    pub fn has_where(&self) -> bool {
        !self.where_clause.is_empty()
    }

    // ==================== Trailing clauses ====================

    /// Append an `ORDER BY` clause rendered by the order composer. Empty input is ignored.
    pub fn order_by(&mut self, clause: &str) -> &mut Self {
        if clause.is_empty() {
            return self;
        }
        self.append_fmt(format_args!("{clause}"))
    }

    /// Append trailing text. `?` markers bind `args` in order.
    pub fn append<I, V>(&mut self, sql: &str, args: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enter(Phase::Tail);
        let fragment = self.bind_template(sql, args);
        push_spaced(&mut self.tail, &fragment);
        self
    }

    /// Append formatted trailing text verbatim.
    pub fn append_fmt(&mut self, fragment: fmt::Arguments<'_>) -> &mut Self {
        self.enter(Phase::Tail);
        push_spaced(&mut self.tail, &fragment.to_string());
        self
    }

    // ==================== Arguments ====================

    /// Next placeholder token. Advances the counter; pair every call with [`push_arg`](Self::push_arg).
    pub fn arg_name(&mut self) -> String {
        self.arg_count += 1;
        self.dialect.placeholder(self.arg_count)
    }

    pub fn push_arg(&mut self, value: impl Into<Value>) -> &mut Self {
        self.args.push(value.into());
        self
    }

    /// Bind one value and return its placeholder.
    pub fn bind(&mut self, value: impl Into<Value>) -> String {
        let name = self.arg_name();
        self.args.push(value.into());
        name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    // ==================== Rendering ====================

    /// Render the statement text.
    pub fn query(&self) -> String {
        let mut sql = String::new();
        match &self.head {
            Head::None => {}
            Head::Select { columns, distinct } => {
                sql.push_str("SELECT ");
                if *distinct {
                    sql.push_str("DISTINCT ");
                }
                sql.push_str(columns);
            }
            Head::Insert { table } => {
                sql.push_str("INSERT INTO ");
                sql.push_str(table);
                if self.columns.is_empty() {
                    sql.push(' ');
                    sql.push_str(self.dialect.default_values_clause());
                } else {
                    sql.push_str(" (");
                    sql.push_str(&self.columns.join(", "));
                    sql.push_str(") VALUES (");
                    sql.push_str(&self.placeholders.join(", "));
                    sql.push(')');
                }
            }
            Head::Update { table } => {
                sql.push_str("UPDATE ");
                sql.push_str(table);
                sql.push_str(" SET ");
                let sets: Vec<String> = self
                    .columns
                    .iter()
                    .zip(&self.placeholders)
                    .map(|(col, p)| format!("{col} = {p}"))
                    .collect();
                sql.push_str(&sets.join(", "));
            }
            Head::Delete { table } => {
                sql.push_str("DELETE FROM ");
                sql.push_str(table);
            }
        }

        if let (Head::Select { .. }, Some(from)) = (&self.head, &self.from) {
            sql.push_str(" FROM ");
            sql.push_str(from);
        }

        if !self.where_clause.is_empty() {
            push_spaced(&mut sql, "WHERE");
            push_spaced(&mut sql, &self.where_clause);
        }

        push_spaced(&mut sql, &self.tail);
        sql
    }

    /// Render the statement and take its arguments, failing on out-of-order or mismatched binds.
    pub fn build(&self) -> DbResult<(String, Vec<Value>)> {
        if let Some(err) = &self.build_error {
            return Err(DbError::mapping(err.clone()));
        }
        if self.arg_count != self.args.len() {
            return Err(DbError::mapping(format!(
                "{} placeholders issued but {} arguments bound",
                self.arg_count,
                self.args.len()
            )));
        }
        Ok((self.query(), self.args.clone()))
    }

    // ==================== internals ====================

    fn set_head(&mut self, head: Head) -> &mut Self {
        if self.head != Head::None {
            self.record_error("statement head set twice without reset");
        }
        self.head = head;
        self
    }

    fn push_column(&mut self, column: &str, value: Value) -> &mut Self {
        if self.phase > Phase::Head {
            self.record_error(format!("column {column} added after WHERE or trailing text"));
        }
        let placeholder = self.bind(value);
        self.columns.push(column.to_string());
        self.placeholders.push(placeholder);
        self
    }

    fn push_where(&mut self, conj: Conj, fragment: &str) -> &mut Self {
        self.enter(Phase::Where);
        let open = self.where_clause.is_empty() || self.where_clause.ends_with('(');
        match conj {
            Conj::And if !open => push_spaced(&mut self.where_clause, "AND"),
            Conj::Or if !open => push_spaced(&mut self.where_clause, "OR"),
            _ => {}
        }
        push_spaced(&mut self.where_clause, fragment.trim());
        self
    }

    fn enter(&mut self, phase: Phase) {
        if phase < self.phase {
            self.record_error("WHERE fragment added after trailing text");
        }
        self.phase = phase;
    }

    /// Bind `args` for a fragment.
    ///
    /// When placeholders issued by [`arg_name`](Self::arg_name) are still unbound, the fragment
    /// is taken as already numbered: `args` fill those placeholders and the text is kept as is.
    /// Otherwise each bare `?` becomes the next placeholder. `??` stands for a literal `?`, and
    /// `?` inside quoted literals or identifiers is left alone.
    fn bind_template<I, V>(&mut self, template: &str, args: I) -> String
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let args: Vec<Value> = args.into_iter().map(Into::into).collect();
        let pending = self.arg_count.saturating_sub(self.args.len());
        if pending > 0 && !args.is_empty() {
            if args.len() > pending {
                self.record_error(format!(
                    "fragment {template:?} supplies {} arguments for {pending} issued placeholders",
                    args.len()
                ));
            }
            self.args.extend(args);
            return template.to_string();
        }

        let mut args = args.into_iter();
        let mut out = String::with_capacity(template.len() + 8);
        let mut markers = 0usize;
        let mut bound = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = template.chars().peekable();
        while let Some(ch) = chars.next() {
            match (ch, quote) {
                (_, Some(q)) => {
                    if ch == q {
                        quote = None;
                    }
                    out.push(ch);
                }
                ('\'' | '"', None) => {
                    quote = Some(ch);
                    out.push(ch);
                }
                ('?', None) if chars.peek() == Some(&'?') => {
                    chars.next();
                    out.push('?');
                }
                ('?', None) => {
                    markers += 1;
                    match args.next() {
                        Some(value) => {
                            bound += 1;
                            let name = self.bind(value);
                            out.push_str(&name);
                        }
                        None => out.push(ch),
                    }
                }
                _ => out.push(ch),
            }
        }
        let supplied = bound + args.count();
        if supplied != markers {
            self.record_error(format!(
                "fragment {template:?} has {markers} markers but {supplied} arguments"
            ));
        }
        out
    }

    fn record_error(&mut self, message: impl Into<String>) {
        if self.build_error.is_none() {
            self.build_error = Some(message.into());
        }
    }
}

/// Append `part` with a separating space, except after `(` or before `)` and `,`.
fn push_spaced(buf: &mut String, part: &str) {
    if part.is_empty() {
        return;
    }
    if !buf.is_empty()
        && !buf.ends_with('(')
        && !buf.ends_with(' ')
        && !part.starts_with(')')
        && !part.starts_with(',')
        && !part.starts_with(' ')
    {
        buf.push(' ');
    }
    buf.push_str(part);
}
