//! ORDER BY composition.
//!
//! An order source yields [`OrderTerm`]s: fixed columns with a declared direction, and
//! `custom` columns whose direction comes from a runtime value. Signed values resolve in
//! place; [`Order`] triples are ranked by `index` and appended after everything else.

use crate::field::{ColumnDef, SortDirection, SortToken};
use serde::{Deserialize, Serialize};

/// An explicit ordering entry: `sort` > 0 ascends, < 0 descends, 0 drops the entry.
/// Lower `index` sorts first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Order {
    #[serde(skip)]
    pub name: String,
    pub index: i64,
    pub sort: i64,
}

impl Order {
    pub fn new(name: impl Into<String>, index: i64, sort: i64) -> Self {
        Self {
            name: name.into(),
            index,
            sort,
        }
    }

    pub fn asc(name: impl Into<String>, index: i64) -> Self {
        Self::new(name, index, 1)
    }

    pub fn desc(name: impl Into<String>, index: i64) -> Self {
        Self::new(name, index, -1)
    }
}

/// Runtime value of a `custom` order field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderValue {
    None,
    Signed(i64),
    Ranked { index: i64, sort: i64 },
}

/// Conversion of a `custom` order field into an [`OrderValue`].
pub trait IntoOrderValue {
    fn order_value(&self) -> OrderValue;
}

macro_rules! signed_order_value {
    ($($t:ty),*) => {$(
        impl IntoOrderValue for $t {
            fn order_value(&self) -> OrderValue {
                OrderValue::Signed(i64::from(*self))
            }
        }
    )*};
}

signed_order_value!(i8, i16, i32, i64);

impl IntoOrderValue for Order {
    fn order_value(&self) -> OrderValue {
        OrderValue::Ranked {
            index: self.index,
            sort: self.sort,
        }
    }
}

impl<T: IntoOrderValue> IntoOrderValue for Option<T> {
    fn order_value(&self) -> OrderValue {
        self.as_ref().map_or(OrderValue::None, T::order_value)
    }
}

impl<T: IntoOrderValue + ?Sized> IntoOrderValue for &T {
    fn order_value(&self) -> OrderValue {
        (**self).order_value()
    }
}

/// One entry produced by an order source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderTerm {
    Fixed {
        column: String,
        direction: Option<SortDirection>,
    },
    Custom {
        column: String,
        value: OrderValue,
    },
}

impl OrderTerm {
    /// Term for a declared column.
    ///
    /// A `Ranked` value (an [`Order`]) joins the priority list whatever the column's token.
    /// Other values only count for `custom` columns; the rest render their static token.
    pub fn for_column(def: &ColumnDef, value: impl FnOnce() -> OrderValue) -> Self {
        let column = def.name.to_string();
        match (def.sort, value()) {
            (_, value @ OrderValue::Ranked { .. }) | (Some(SortToken::Custom), value) => {
                OrderTerm::Custom { column, value }
            }
            (token, _) => OrderTerm::Fixed {
                column,
                direction: token.and_then(|t| t.direction()),
            },
        }
    }
}

/// Anything that can describe an ordering.
pub trait OrderSource {
    fn order_terms(&self) -> Vec<OrderTerm>;
}

impl<T: OrderSource + ?Sized> OrderSource for &T {
    fn order_terms(&self) -> Vec<OrderTerm> {
        (**self).order_terms()
    }
}

impl OrderSource for [Order] {
    fn order_terms(&self) -> Vec<OrderTerm> {
        self.iter()
            .map(|o| OrderTerm::Custom {
                column: o.name.clone(),
                value: o.order_value(),
            })
            .collect()
    }
}

impl OrderSource for Vec<Order> {
    fn order_terms(&self) -> Vec<OrderTerm> {
        self.as_slice().order_terms()
    }
}

/// A column with its resolved direction. `None` leaves the engine default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrder {
    pub column: String,
    pub direction: Option<SortDirection>,
}

/// Resolve a source into the final column list: fixed and signed terms in declaration order,
/// then ranked terms by ascending index (stable), dropping zero sorts.
pub fn resolve_order(source: &dyn OrderSource) -> Vec<ResolvedOrder> {
    let mut resolved = Vec::new();
    let mut ranked = Vec::new();

    for term in source.order_terms() {
        match term {
            OrderTerm::Fixed { column, direction } => {
                resolved.push(ResolvedOrder { column, direction })
            }
            OrderTerm::Custom { column, value } => match value {
                OrderValue::None => {}
                OrderValue::Signed(sort) => {
                    if let Some(direction) = SortDirection::from_sign(sort) {
                        resolved.push(ResolvedOrder {
                            column,
                            direction: Some(direction),
                        });
                    }
                }
                OrderValue::Ranked { index, sort } => ranked.push((index, column, sort)),
            },
        }
    }

    ranked.sort_by_key(|(index, _, _)| *index);
    resolved.extend(ranked.into_iter().filter_map(|(_, column, sort)| {
        SortDirection::from_sign(sort).map(|direction| ResolvedOrder {
            column,
            direction: Some(direction),
        })
    }));
    resolved
}

/// Render `order by col dir, ...`, or an empty string for an empty list.
pub fn order_clause(terms: &[ResolvedOrder]) -> String {
    if terms.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = terms
        .iter()
        .map(|t| match t.direction {
            Some(direction) => format!("{} {direction}", t.column),
            None => t.column.clone(),
        })
        .collect();
    format!("order by {}", parts.join(", "))
}

/// Resolve and render in one step.
pub fn order_by(source: &dyn OrderSource) -> String {
    order_clause(&resolve_order(source))
}
