//! Tagged column values.
//!
//! Every value that crosses the boundary between a mapped record and a statement travels as a
//! [`Value`]. Record fields convert into values through [`ToValue`] and are written back from
//! scanned values through [`FromValue`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Text layout used when a timestamp is rendered or serialized.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single column value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
    Uuid(Uuid),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True when the value is the zero/default for its type.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !*b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty(),
            Value::Timestamp(ts) => *ts == NaiveDateTime::default(),
            Value::Uuid(u) => u.is_nil(),
            Value::Json(j) => j.is_null(),
            Value::Bytes(b) => b.is_empty(),
        }
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Timestamp(_) => "timestamp",
            Value::Uuid(_) => "uuid",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Renders the value as the body of an SQL fragment. Text is emitted as-is, without quoting.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Json(j) => write!(f, "{j}"),
            Value::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Timestamp(ts) => serializer.collect_str(&ts.format(TIMESTAMP_FORMAT)),
            Value::Uuid(u) => serializer.collect_str(u),
            Value::Json(j) => j.serialize(serializer),
            Value::Bytes(b) => serializer.serialize_bytes(b),
        }
    }
}

/// Failure converting a [`Value`] into a Rust type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {found} into {expected}")]
pub struct ConversionError {
    pub expected: &'static str,
    pub found: String,
}

impl ConversionError {
    fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: value.type_name().to_string(),
        }
    }
}

/// Conversion of a record field into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;

    /// Whether the field holds the zero/default for its type.
    fn is_empty_value(&self) -> bool {
        self.to_value().is_empty()
    }
}

/// Conversion of a scanned [`Value`] back into a record field.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ConversionError>;
}

/// A field's current value together with its emptiness.
///
/// Emptiness is captured from the field itself rather than from the converted value, so an
/// `Option` holding a zero stays non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub value: Value,
    pub empty: bool,
}

impl FieldValue {
    pub fn of<T: ToValue + ?Sized>(field: &T) -> Self {
        Self {
            value: field.to_value(),
            empty: field.is_empty_value(),
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }

    fn is_empty_value(&self) -> bool {
        (**self).is_empty_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn is_empty_value(&self) -> bool {
        self.is_none()
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

macro_rules! int_to_value {
    ($($t:ty),*) => {$(
        impl ToValue for $t {
            fn to_value(&self) -> Value {
                Value::Int(i64::from(*self))
            }

            fn is_empty_value(&self) -> bool {
                *self == 0
            }
        }
    )*};
}

int_to_value!(i8, i16, i32, i64, u8, u16, u32);

/// Values above `i64::MAX` travel as decimal text and scan back through [`FromValue`].
impl ToValue for u64 {
    fn to_value(&self) -> Value {
        match i64::try_from(*self) {
            Ok(v) => Value::Int(v),
            Err(_) => Value::Text(self.to_string()),
        }
    }

    fn is_empty_value(&self) -> bool {
        *self == 0
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl ToValue for NaiveDateTime {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }
}

impl ToValue for NaiveDate {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.and_time(NaiveTime::MIN))
    }

    fn is_empty_value(&self) -> bool {
        *self == NaiveDate::default()
    }
}

impl ToValue for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(self.naive_utc())
    }
}

impl ToValue for Uuid {
    fn to_value(&self) -> Value {
        Value::Uuid(*self)
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }

    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(i64::from(b)),
            // Identity probes such as SCOPE_IDENTITY() come back as numeric.
            Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(f as i64),
            Value::Text(ref s) => s
                .trim()
                .parse()
                .map_err(|_| ConversionError::new("i64", &value)),
            other => Err(ConversionError::new("i64", &other)),
        }
    }
}

macro_rules! int_from_value {
    ($($t:ty),*) => {$(
        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self, ConversionError> {
                let wide = i64::from_value(value)?;
                <$t>::try_from(wide).map_err(|_| ConversionError {
                    expected: stringify!($t),
                    found: format!("out of range int {wide}"),
                })
            }
        }
    )*};
}

int_from_value!(i8, i16, i32, u8, u16, u32);

impl FromValue for u64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(ref s) => s
                .trim()
                .parse()
                .map_err(|_| ConversionError::new("u64", &value)),
            other => {
                let wide = i64::from_value(other)?;
                u64::try_from(wide).map_err(|_| ConversionError {
                    expected: "u64",
                    found: format!("out of range int {wide}"),
                })
            }
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::Text(ref s) => s
                .trim()
                .parse()
                .map_err(|_| ConversionError::new("f64", &value)),
            other => Err(ConversionError::new("f64", &other)),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        f64::from_value(value).map(|f| f as f32)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            other => Err(ConversionError::new("bool", &other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Null | Value::Bytes(_) => Err(ConversionError::new("String", &value)),
            other => Ok(other.to_string()),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Timestamp(ts) => Ok(ts),
            Value::Text(ref s) => NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
                .map_err(|_| ConversionError::new("NaiveDateTime", &value)),
            other => Err(ConversionError::new("NaiveDateTime", &other)),
        }
    }
}

impl FromValue for NaiveDate {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        NaiveDateTime::from_value(value).map(|ts| ts.date())
    }
}

impl FromValue for DateTime<Utc> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        NaiveDateTime::from_value(value).map(|ts| ts.and_utc())
    }
}

impl FromValue for Uuid {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Uuid(u) => Ok(u),
            Value::Text(ref s) => {
                Uuid::parse_str(s).map_err(|_| ConversionError::new("Uuid", &value))
            }
            other => Err(ConversionError::new("Uuid", &other)),
        }
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Json(j) => Ok(j),
            Value::Null => Ok(serde_json::Value::Null),
            Value::Text(ref s) => {
                serde_json::from_str(s).map_err(|_| ConversionError::new("json", &value))
            }
            other => Err(ConversionError::new("json", &other)),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(ConversionError::new("bytes", &other)),
        }
    }
}

macro_rules! value_from {
    ($($t:ty => $variant:ident),* $(,)?) => {$(
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v.into())
            }
        }
    )*};
}

value_from!(
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
    NaiveDateTime => Timestamp,
    Uuid => Uuid,
    serde_json::Value => Json,
    Vec<u8> => Bytes,
);

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_are_empty() {
        assert!(Value::Null.is_empty());
        assert!(Value::Int(0).is_empty());
        assert!(Value::Bool(false).is_empty());
        assert!(Value::Text(String::new()).is_empty());
        assert!(Value::Timestamp(NaiveDateTime::default()).is_empty());
        assert!(!Value::Int(-1).is_empty());
        assert!(!Value::Text("x".into()).is_empty());
    }

    #[test]
    fn present_option_is_not_empty() {
        assert!(FieldValue::of(&None::<i32>).empty);
        let zero = FieldValue::of(&Some(0_i32));
        assert!(!zero.empty);
        assert_eq!(zero.value, Value::Int(0));
        assert!(FieldValue::of(&0_i64).empty);
        assert!(FieldValue::of(&"").empty);
    }

    #[test]
    fn display_renders_literal_body() {
        assert_eq!(Value::Text("(1,2,3)".into()).to_string(), "(1,2,3)");
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
    }

    #[test]
    fn integer_narrowing_is_checked() {
        assert_eq!(i32::from_value(Value::Int(7)), Ok(7));
        assert!(i8::from_value(Value::Int(300)).is_err());
        assert_eq!(i64::from_value(Value::Float(15.0)), Ok(15));
        assert!(i64::from_value(Value::Float(1.5)).is_err());
        assert!(i64::from_value(Value::Null).is_err());
    }

    #[test]
    fn u64_beyond_i64_scans_back() {
        let big = u64::MAX.to_value();
        assert_eq!(big, Value::Text("18446744073709551615".into()));
        assert_eq!(u64::from_value(big), Ok(u64::MAX));
        assert_eq!(u64::from_value(7_u64.to_value()), Ok(7));
        assert!(u64::from_value(Value::Int(-1)).is_err());
        assert!(u64::from_value(Value::Text("-1".into())).is_err());
    }

    #[test]
    fn null_scans_into_none() {
        assert_eq!(Option::<String>::from_value(Value::Null), Ok(None));
        assert_eq!(
            Option::<String>::from_value(Value::Text("a".into())),
            Ok(Some("a".to_string()))
        );
    }

    #[test]
    fn timestamps_serialize_with_millis() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_milli_opt(8, 5, 1, 20))
            .unwrap();
        let json = serde_json::to_string(&Value::Timestamp(ts)).unwrap();
        assert_eq!(json, "\"2024-03-09 08:05:01.020\"");
        assert_eq!(
            NaiveDateTime::from_value(Value::Text("2024-03-09 08:05:01.020".into())),
            Ok(ts)
        );
    }
}
