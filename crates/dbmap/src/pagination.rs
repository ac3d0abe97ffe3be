//! Page arithmetic and page-query rendering.
//!
//! A page request runs a `COUNT(*)` with the same filters first, then the page query. The
//! two statements are not isolated from each other: rows written in between can make the
//! reported total disagree with the returned page.

use crate::builder::QueryBuilder;
use crate::dialect::Capabilities;
use crate::error::DbResult;
use crate::field::FieldDescriptor;
use crate::filter::{Filter, apply_filters};
use serde::Serialize;

/// Totals of a page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub page_count: u64,
    pub page_size: u64,
    /// 1-based, clamped into `[1, max(page_count, 1)]`.
    pub page_index: u64,
}

impl Pagination {
    /// A page size below 1 is treated as 1.
    pub fn new(total: u64, page_size: u64, page_index: u64) -> Self {
        let page_size = page_size.max(1);
        let page_count = total.div_ceil(page_size);
        let page_index = page_index.min(page_count).max(1);
        Self {
            total,
            page_count,
            page_size,
            page_index,
        }
    }

    /// Rows skipped before this page.
    pub fn offset(&self) -> u64 {
        (self.page_index - 1) * self.page_size
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

/// Paging syntax used for the page query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStrategy {
    /// Subquery numbering rows with `ROW_NUMBER() OVER(...)`, filtered on a range.
    RowNumber,
    /// `ORDER BY` followed by the dialect's offset clause.
    OffsetFetch,
}

impl PageStrategy {
    pub fn for_capabilities(capabilities: Capabilities) -> Self {
        if capabilities.supports_offset_fetch {
            PageStrategy::OffsetFetch
        } else {
            PageStrategy::RowNumber
        }
    }
}

/// Column used when no order is given: the first primary key, else the first field.
pub fn default_order_column(fields: &[FieldDescriptor]) -> Option<&str> {
    fields
        .iter()
        .find(|f| f.primary_key)
        .or_else(|| fields.first())
        .map(|f| f.name.as_str())
}

/// What a page query selects.
#[derive(Debug, Clone, Copy)]
pub struct PageQuery<'q> {
    pub table: &'q str,
    pub columns: &'q str,
    /// A rendered, non-empty `order by ...` clause.
    pub order: &'q str,
    pub filters: &'q [Filter<'q>],
}

/// Render the page query for `pagination` into a reset builder.
pub fn build_page_query(
    builder: &mut QueryBuilder,
    strategy: PageStrategy,
    query: &PageQuery<'_>,
    pagination: &Pagination,
) -> DbResult<()> {
    let offset = pagination.offset();
    let size = pagination.page_size;
    match strategy {
        PageStrategy::OffsetFetch => {
            builder.select(query.columns, false).from(query.table);
            apply_filters(builder, query.filters)?;
            builder.order_by(query.order);
            let clause = builder.dialect().page_clause(offset, size);
            builder.append_fmt(format_args!("{clause}"));
        }
        PageStrategy::RowNumber => {
            let row_number = builder.dialect().quote_ident("RowNumber");
            let source = format!(
                "(SELECT {}, ROW_NUMBER() OVER({}) AS {row_number} FROM {}",
                query.columns, query.order, query.table
            );
            builder.select(query.columns, false).from(&source);
            apply_filters(builder, query.filters)?;
            builder.append_fmt(format_args!(
                ") t WHERE {row_number} BETWEEN {} AND {}",
                offset + 1,
                offset + size
            ));
        }
    }
    Ok(())
}
