//! Predicate filters and WHERE composition.

use crate::builder::QueryBuilder;
use crate::entity::FilterSource;
use crate::error::DbResult;
use crate::field::{FieldDescriptor, FilterOp};

/// A group of predicates taken from a filter source.
///
/// `field_or` joins the group's predicates with `OR` instead of `AND`; `group_or` attaches
/// the whole group to the preceding groups with `OR` instead of `AND`.
#[derive(Clone, Copy)]
pub struct Filter<'a> {
    source: &'a (dyn FilterSource + Sync),
    field_or: bool,
    group_or: bool,
}

impl<'a> Filter<'a> {
    /// An `AND`-joined group attached with `AND`.
    pub fn new(source: &'a (dyn FilterSource + Sync)) -> Self {
        Self {
            source,
            field_or: false,
            group_or: false,
        }
    }

    /// An `OR`-joined group attached with `AND`.
    pub fn any(source: &'a (dyn FilterSource + Sync)) -> Self {
        Self::new(source).field_or(true)
    }

    pub fn field_or(mut self, field_or: bool) -> Self {
        self.field_or = field_or;
        self
    }

    pub fn group_or(mut self, group_or: bool) -> Self {
        self.group_or = group_or;
        self
    }

    /// The non-empty fields of this filter's source.
    pub fn fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        map_filter_source(self.source)
    }
}

impl std::fmt::Debug for Filter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter")
            .field("field_or", &self.field_or)
            .field("group_or", &self.group_or)
            .finish_non_exhaustive()
    }
}

/// Map a filter source, keeping only fields that hold a non-empty value.
pub fn map_filter_source(source: &dyn FilterSource) -> DbResult<Vec<FieldDescriptor>> {
    let mut fields = source.filter_fields()?;
    fields.retain(|f| !f.value_empty());
    Ok(fields)
}

/// Compose `filters` into the builder's WHERE clause.
///
/// Filters without usable fields are skipped, so a list of empty filters adds no WHERE.
pub fn apply_filters(builder: &mut QueryBuilder, filters: &[Filter<'_>]) -> DbResult<()> {
    for filter in filters {
        let fields = filter.fields()?;
        if fields.is_empty() {
            continue;
        }

        if filter.group_or {
            builder.or_where_fmt(format_args!(""));
        } else {
            builder.and_where_fmt(format_args!(""));
        }
        builder.where_fmt(format_args!("("));
        for (i, field) in fields.into_iter().enumerate() {
            push_predicate(builder, field, i == 0, filter.field_or);
        }
        builder.where_fmt(format_args!(")"));
    }
    Ok(())
}

fn push_predicate(builder: &mut QueryBuilder, field: FieldDescriptor, first: bool, or: bool) {
    let fragment = match field.filter {
        FilterOp::In => format!("{} in {}", field.name, field.value),
        FilterOp::Custom => format!("{} {}", field.name, field.value),
        op => {
            let placeholder = builder.bind(field.value);
            format!("{} {op} {placeholder}", field.name)
        }
    };
    match (first, or) {
        (true, _) => builder.where_fmt(format_args!("{fragment}")),
        (false, true) => builder.or_where_fmt(format_args!("{fragment}")),
        (false, false) => builder.and_where_fmt(format_args!("{fragment}")),
    };
}
