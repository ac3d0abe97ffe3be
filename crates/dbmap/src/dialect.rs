//! SQL dialects and engine capability flags.

use std::fmt::Write as _;

/// SQL flavour a statement is rendered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// `$1, $2, ...`
    #[default]
    Postgres,
    /// `?`
    MySql,
    /// `?`
    Sqlite,
    /// `@p1, @p2, ...`
    MsSql,
    /// `:1, :2, ...`
    Oracle,
}

impl Dialect {
    /// Placeholder token for the `n`-th (1-based) bound argument.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${n}"),
            Dialect::MySql | Dialect::Sqlite => "?".to_string(),
            Dialect::MsSql => format!("@p{n}"),
            Dialect::Oracle => format!(":{n}"),
        }
    }

    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Dialect::MsSql => format!("[{name}]"),
            Dialect::MySql => format!("`{name}`"),
            Dialect::Postgres | Dialect::Sqlite | Dialect::Oracle => format!("\"{name}\""),
        }
    }

    /// Capabilities assumed when the collaborator reports nothing more specific.
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::MODERN
    }

    pub fn identity_strategy(&self) -> IdentityStrategy {
        match self {
            Dialect::MsSql => IdentityStrategy::ScopeIdentity,
            Dialect::Postgres => IdentityStrategy::Returning,
            Dialect::MySql | Dialect::Sqlite => IdentityStrategy::LastInsertId,
            Dialect::Oracle => IdentityStrategy::Unavailable,
        }
    }

    /// Trailing clause selecting `size` rows after skipping `offset`.
    pub fn page_clause(&self, offset: u64, size: u64) -> String {
        match self {
            Dialect::MsSql | Dialect::Oracle => {
                format!("OFFSET {offset} ROWS FETCH NEXT {size} ROWS ONLY")
            }
            Dialect::Postgres | Dialect::MySql | Dialect::Sqlite => {
                format!("LIMIT {size} OFFSET {offset}")
            }
        }
    }

    /// Tail of an INSERT that names no columns.
    pub fn default_values_clause(&self) -> &'static str {
        match self {
            Dialect::MySql => "() VALUES ()",
            _ => "DEFAULT VALUES",
        }
    }
}

/// Pagination syntax the connected engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Capabilities {
    pub supports_offset_fetch: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::MODERN
    }
}

impl Capabilities {
    pub const MODERN: Self = Self {
        supports_offset_fetch: true,
    };

    /// Engines that can only page with a `ROW_NUMBER()` window.
    pub const LEGACY: Self = Self {
        supports_offset_fetch: false,
    };

    /// SQL Server gained `OFFSET ... FETCH` in 2012.
    pub fn from_mssql_version(year: u32) -> Self {
        Self {
            supports_offset_fetch: year >= 2012,
        }
    }

    /// Parse the banner returned by `SELECT @@VERSION`, e.g.
    /// `Microsoft SQL Server 2008 R2 (SP1) - 10.50.2500.0 ...`.
    pub fn from_mssql_banner(banner: &str) -> Option<Self> {
        banner
            .split_whitespace()
            .nth(3)
            .and_then(|year| year.parse().ok())
            .map(Self::from_mssql_version)
    }

    /// Oracle gained `OFFSET ... FETCH` in 12c.
    pub fn from_oracle_version(major: u32) -> Self {
        Self {
            supports_offset_fetch: major >= 12,
        }
    }
}

/// How an INSERT reports the generated key of its auto-increment column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Append `; SELECT SCOPE_IDENTITY()` and read one row.
    ScopeIdentity,
    /// Append `RETURNING <column>` and read one row.
    Returning,
    /// Read the id the driver reports after execution.
    LastInsertId,
    /// No generated key can be read back.
    Unavailable,
}

impl IdentityStrategy {
    /// Extend an INSERT so it yields the key, returning whether a row must be read.
    pub fn decorate(&self, sql: &mut String, column: &str) -> bool {
        match self {
            IdentityStrategy::ScopeIdentity => {
                sql.push_str("; SELECT SCOPE_IDENTITY()");
                true
            }
            IdentityStrategy::Returning => {
                let _ = write!(sql, " RETURNING {column}");
                true
            }
            IdentityStrategy::LastInsertId | IdentityStrategy::Unavailable => false,
        }
    }
}
