//! Ad-hoc result sets keyed by generated column ids.

use crate::executor::{Column, Row};
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// A result column. `id` is `col00001`, `col00002`, ... so duplicate names stay addressable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectColumn {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

/// One row, mapping column id to value.
pub type SelectRow = BTreeMap<String, Value>;

/// Rows of an arbitrary query with their column metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectResult {
    pub columns: Vec<SelectColumn>,
    pub rows: Vec<SelectRow>,
}

pub(crate) fn column_id(ordinal: usize) -> String {
    format!("col{:05}", ordinal + 1)
}

impl SelectResult {
    pub fn with_columns(columns: &[Column]) -> Self {
        Self {
            columns: columns
                .iter()
                .enumerate()
                .map(|(i, c)| SelectColumn {
                    id: column_id(i),
                    name: c.name.clone(),
                    type_name: c.type_name.clone(),
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Row) {
        if self.columns.is_empty() {
            self.columns = Self::with_columns(row.columns()).columns;
        }
        let values = row
            .into_values()
            .into_iter()
            .enumerate()
            .map(|(i, v)| (column_id(i), v))
            .collect();
        self.rows.push(values);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the first column named `name`, one per row.
    pub fn column_values(&self, name: &str) -> Option<Vec<&Value>> {
        let id = &self.columns.iter().find(|c| c.name == name)?.id;
        Some(self.rows.iter().filter_map(|r| r.get(id)).collect())
    }
}
