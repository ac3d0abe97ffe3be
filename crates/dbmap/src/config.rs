//! Configuration for [`Access`](crate::Access).

use crate::dialect::Capabilities;
use std::time::Duration;
use tracing::Level;

/// Logging of generated SQL on the `dbmap.sql` target.
#[derive(Debug, Clone)]
pub struct SqlLogConfig {
    pub enabled: bool,
    /// Tracing event level to emit at.
    pub level: Level,
    /// Truncate long SQL strings (in bytes, on a char boundary). `None` means no truncation.
    pub max_sql_length: Option<usize>,
}

impl Default for SqlLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: Level::DEBUG,
            max_sql_length: Some(500),
        }
    }
}

impl SqlLogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Override the tracing event level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Set maximum SQL length to display.
    pub fn max_sql_length(mut self, len: usize) -> Self {
        self.max_sql_length = Some(len);
        self
    }

    /// Disable SQL truncation.
    pub fn no_truncate(mut self) -> Self {
        self.max_sql_length = None;
        self
    }

    pub(crate) fn display_sql<'a>(&self, sql: &'a str) -> std::borrow::Cow<'a, str> {
        match self.max_sql_length {
            Some(max) if sql.len() > max => format!("{}...", truncate_sql_bytes(sql, max)).into(),
            _ => sql.into(),
        }
    }
}

fn truncate_sql_bytes(sql: &str, max_bytes: usize) -> &str {
    if sql.len() <= max_bytes {
        return sql;
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    &sql[..end]
}

/// Settings for an [`Access`](crate::Access) handle.
///
/// # Example
///
/// ```ignore
/// use dbmap::{Access, AccessConfig, Capabilities};
/// use std::time::Duration;
///
/// let config = AccessConfig::new()
///     .capabilities(Capabilities::from_mssql_version(2008))
///     .query_timeout(Duration::from_secs(30));
/// let access = Access::with_config(&client, config);
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    /// Overrides [`Executor::capabilities`](crate::Executor::capabilities) when set.
    pub capabilities: Option<Capabilities>,
    /// Upper bound for each statement round-trip.
    pub query_timeout: Option<Duration>,
    pub log: SqlLogConfig,
}

impl AccessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.query_timeout = None;
        self
    }

    pub fn log(mut self, log: SqlLogConfig) -> Self {
        self.log = log;
        self
    }
}
