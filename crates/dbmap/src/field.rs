//! Column metadata and per-call field descriptors.

use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison used when a field takes part in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterOp {
    #[default]
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Like,
    /// `name in <value>`; the value is already a parenthesized list.
    In,
    /// `name <value>`; the value is a caller-trusted SQL fragment.
    Custom,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "<>",
            FilterOp::Gt => ">",
            FilterOp::Lt => "<",
            FilterOp::Ge => ">=",
            FilterOp::Le => "<=",
            FilterOp::Like => "like",
            FilterOp::In => "in",
            FilterOp::Custom => "custom",
        }
    }

    /// Whether the value is rendered into the SQL text instead of being bound.
    pub fn is_literal(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::Custom)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown filter operator or sort token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} token: {token:?}")]
pub struct ParseTokenError {
    pub kind: &'static str,
    pub token: String,
}

impl FromStr for FilterOp {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "" | "=" => FilterOp::Eq,
            "<>" | "!=" => FilterOp::Ne,
            ">" => FilterOp::Gt,
            "<" => FilterOp::Lt,
            ">=" => FilterOp::Ge,
            "<=" => FilterOp::Le,
            "like" => FilterOp::Like,
            "in" => FilterOp::In,
            "custom" => FilterOp::Custom,
            _ => {
                return Err(ParseTokenError {
                    kind: "filter",
                    token: s.to_string(),
                });
            }
        };
        Ok(op)
    }
}

/// Resolved sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }

    /// Direction for a signed sort value: positive ascends, negative descends, zero is unset.
    pub fn from_sign(sort: i64) -> Option<Self> {
        match sort {
            0 => None,
            s if s > 0 => Some(SortDirection::Asc),
            _ => Some(SortDirection::Desc),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort token declared on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortToken {
    Asc,
    Desc,
    /// Direction comes from the field's runtime value.
    Custom,
}

impl SortToken {
    pub fn direction(&self) -> Option<SortDirection> {
        match self {
            SortToken::Asc => Some(SortDirection::Asc),
            SortToken::Desc => Some(SortDirection::Desc),
            SortToken::Custom => None,
        }
    }
}

impl FromStr for SortToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortToken::Asc),
            "desc" => Ok(SortToken::Desc),
            "custom" => Ok(SortToken::Custom),
            _ => Err(ParseTokenError {
                kind: "sort",
                token: s.to_string(),
            }),
        }
    }
}

/// Static description of one mapped column.
///
/// Built in `const` context so an entity's column list is a `&'static` slice:
///
/// ```ignore
/// const COLUMNS: &'static [ColumnDef] = &[
///     ColumnDef::new("id").primary_key().auto_increment(),
///     ColumnDef::new("name").filter(FilterOp::Like).sort(SortToken::Asc),
/// ];
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub filter: FilterOp,
    pub sort: Option<SortToken>,
}

impl ColumnDef {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            primary_key: false,
            auto_increment: false,
            filter: FilterOp::Eq,
            sort: None,
        }
    }

    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub const fn filter(mut self, op: FilterOp) -> Self {
        self.filter = op;
        self
    }

    pub const fn sort(mut self, token: SortToken) -> Self {
        self.sort = Some(token);
        self
    }
}

/// One mapped column with the value captured from a record.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub value: Value,
    pub empty: bool,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub filter: FilterOp,
    pub sort: Option<SortToken>,
}

impl FieldDescriptor {
    /// A plain column/value pair, e.g. an extra column appended to an INSERT.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            empty: value.is_empty(),
            value,
            primary_key: false,
            auto_increment: false,
            filter: FilterOp::Eq,
            sort: None,
        }
    }

    pub(crate) fn from_column(def: &ColumnDef, value: Value, empty: bool) -> Self {
        Self {
            name: def.name.to_string(),
            value,
            empty,
            primary_key: def.primary_key,
            auto_increment: def.auto_increment,
            filter: def.filter,
            sort: def.sort,
        }
    }

    pub fn with_filter(mut self, op: FilterOp) -> Self {
        self.filter = op;
        self
    }

    pub fn value_empty(&self) -> bool {
        self.empty
    }
}
