//! Entity schema description and mapping.
//!
//! A record type describes its table once, through the [`Entity`] trait (usually generated by
//! `#[derive(Entity)]`). [`EntityMap::of`] captures the record's current values into ordered
//! [`FieldDescriptor`]s for one statement; [`hydrate`] writes a result row back into it.

use crate::error::{DbError, DbResult};
use crate::executor::Row;
use crate::field::{ColumnDef, FieldDescriptor};
use crate::value::{ConversionError, FieldValue, FromValue, Value};

/// A record type mapped to one table.
///
/// `COLUMNS`, `field_values` and `scan_targets` must all list fields in the same declaration
/// order.
///
/// ```ignore
/// struct User { id: i64, name: String }
///
/// impl Entity for User {
///     const TABLE: &'static str = "users";
///     const COLUMNS: &'static [ColumnDef] = &[
///         ColumnDef::new("id").primary_key().auto_increment(),
///         ColumnDef::new("name"),
///     ];
///
///     fn field_values(&self) -> Vec<FieldValue> {
///         vec![FieldValue::of(&self.id), FieldValue::of(&self.name)]
///     }
///
///     fn scan_targets(&mut self) -> Vec<&mut dyn ScanTarget> {
///         vec![&mut self.id as &mut dyn ScanTarget, &mut self.name as &mut dyn ScanTarget]
///     }
/// }
/// ```
pub trait Entity {
    const TABLE: &'static str;
    const SCHEMA: Option<&'static str> = None;
    const COLUMNS: &'static [ColumnDef];

    /// Current value of every column, in declaration order.
    fn field_values(&self) -> Vec<FieldValue>;

    /// Writable location of every column, in declaration order.
    fn scan_targets(&mut self) -> Vec<&mut dyn ScanTarget>;

    /// Table name, qualified with the schema when one is declared.
    fn table_name() -> String {
        match Self::SCHEMA {
            Some(schema) if !schema.is_empty() => format!("{schema}.{}", Self::TABLE),
            _ => Self::TABLE.to_string(),
        }
    }
}

/// A type-erased destination for one scanned column.
pub trait ScanTarget {
    fn scan(&mut self, value: Value) -> Result<(), ConversionError>;
}

impl<T: FromValue> ScanTarget for T {
    fn scan(&mut self, value: Value) -> Result<(), ConversionError> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

/// The table and ordered field descriptors captured from one record.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityMap {
    table: String,
    fields: Vec<FieldDescriptor>,
}

impl EntityMap {
    /// Capture `record`'s table and current field values.
    pub fn of<E: Entity>(record: &E) -> DbResult<Self> {
        let table = E::table_name();
        if E::TABLE.trim().is_empty() {
            return Err(DbError::mapping(format!(
                "{} declares no table name",
                std::any::type_name::<E>()
            )));
        }
        Ok(Self {
            fields: descriptors(record)?,
            table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<FieldDescriptor> {
        self.fields
    }

    /// Comma-separated column list in declaration order.
    pub fn column_list(&self) -> String {
        self.fields
            .iter()
            .map(|f| f.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.primary_key)
    }

    pub fn auto_increment(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.auto_increment)
    }
}

/// Ordered descriptors for every declared column of `record`.
pub fn descriptors<E: Entity>(record: &E) -> DbResult<Vec<FieldDescriptor>> {
    let columns = E::COLUMNS;
    if columns.is_empty() {
        return Err(DbError::mapping(format!(
            "{} declares no columns",
            std::any::type_name::<E>()
        )));
    }
    if let Some(def) = columns.iter().find(|c| c.name.trim().is_empty()) {
        return Err(DbError::mapping(format!(
            "{} declares an empty column name ({def:?})",
            std::any::type_name::<E>()
        )));
    }
    let values = record.field_values();
    if values.len() != columns.len() {
        return Err(DbError::mapping(format!(
            "{} declares {} columns but yields {} values",
            std::any::type_name::<E>(),
            columns.len(),
            values.len()
        )));
    }
    Ok(columns
        .iter()
        .zip(values)
        .map(|(def, fv)| FieldDescriptor::from_column(def, fv.value, fv.empty))
        .collect())
}

/// Write one result row into `record`'s scan targets, in column order.
pub fn hydrate<E: Entity>(record: &mut E, row: Row) -> DbResult<()> {
    let mut targets = record.scan_targets();
    if targets.len() != row.len() {
        return Err(DbError::mapping(format!(
            "{} has {} scan targets but the row has {} columns",
            std::any::type_name::<E>(),
            targets.len(),
            row.len()
        )));
    }
    for ((target, value), def) in targets.iter_mut().zip(row.into_values()).zip(E::COLUMNS) {
        target
            .scan(value)
            .map_err(|e| DbError::decode(def.name, e.to_string()))?;
    }
    Ok(())
}

/// Anything that can supply filter fields: a record, an optional record, or a collection.
pub trait FilterSource {
    /// Every declared field, empty or not.
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>>;
}

impl<T: FilterSource + ?Sized> FilterSource for &T {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        (**self).filter_fields()
    }
}

impl<T: FilterSource> FilterSource for Option<T> {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        match self {
            Some(inner) => inner.filter_fields(),
            None => Ok(Vec::new()),
        }
    }
}

impl<T: FilterSource> FilterSource for [T] {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        let mut fields = Vec::new();
        for item in self {
            fields.extend(item.filter_fields()?);
        }
        Ok(fields)
    }
}

impl<T: FilterSource> FilterSource for Vec<T> {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        self.as_slice().filter_fields()
    }
}

impl FilterSource for FieldDescriptor {
    fn filter_fields(&self) -> DbResult<Vec<FieldDescriptor>> {
        Ok(vec![self.clone()])
    }
}
