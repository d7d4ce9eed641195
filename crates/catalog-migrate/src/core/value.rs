//! SQL value types decoded from driver rows.
//!
//! Each driver decodes its native column values into [`SqlValue`], which then
//! renders into the JSON shape stored in [`Row`](super::schema::Row). Decimals
//! render as strings so precision survives the trip into seed files.

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use uuid::Uuid;

/// A decoded column value.
///
/// The `'a` lifetime allows borrowing from driver buffers while decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue<'a> {
    Null,
    Bool(bool),
    I64(i64),
    U64(u64),
    F64(f64),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Uuid(Uuid),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Date(NaiveDate),
    Time(NaiveTime),
    Json(Value),
}

impl<'a> SqlValue<'a> {
    /// Check if this value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Render as a JSON value.
    ///
    /// Non-finite floats have no JSON representation and become `null`.
    pub fn into_json(self) -> Value {
        match self {
            SqlValue::Null => Value::Null,
            SqlValue::Bool(v) => Value::Bool(v),
            SqlValue::I64(v) => Value::Number(v.into()),
            SqlValue::U64(v) => Value::Number(v.into()),
            SqlValue::F64(v) => Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null),
            SqlValue::Text(v) => Value::String(v.into_owned()),
            SqlValue::Bytes(v) => Value::String(to_hex(&v)),
            SqlValue::Uuid(v) => Value::String(v.to_string()),
            SqlValue::Decimal(v) => Value::String(v.normalize().to_string()),
            SqlValue::DateTime(v) => Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            SqlValue::DateTimeOffset(v) => Value::String(v.to_rfc3339()),
            SqlValue::Date(v) => Value::String(v.format("%Y-%m-%d").to_string()),
            SqlValue::Time(v) => Value::String(v.format("%H:%M:%S%.f").to_string()),
            SqlValue::Json(v) => v,
        }
    }
}

impl<T> From<Option<T>> for SqlValue<'static>
where
    T: Into<SqlValue<'static>>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl From<bool> for SqlValue<'static> {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<i64> for SqlValue<'static> {
    fn from(v: i64) -> Self {
        SqlValue::I64(v)
    }
}

impl From<f64> for SqlValue<'static> {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<String> for SqlValue<'static> {
    fn from(v: String) -> Self {
        SqlValue::Text(Cow::Owned(v))
    }
}

impl From<Vec<u8>> for SqlValue<'static> {
    fn from(v: Vec<u8>) -> Self {
        SqlValue::Bytes(Cow::Owned(v))
    }
}

impl From<Decimal> for SqlValue<'static> {
    fn from(v: Decimal) -> Self {
        SqlValue::Decimal(v)
    }
}

impl From<Uuid> for SqlValue<'static> {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<NaiveDateTime> for SqlValue<'static> {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<NaiveDate> for SqlValue<'static> {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<NaiveTime> for SqlValue<'static> {
    fn from(v: NaiveTime) -> Self {
        SqlValue::Time(v)
    }
}

fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_scalars_into_json() {
        assert_eq!(SqlValue::I64(42).into_json(), Value::from(42));
        assert_eq!(SqlValue::Bool(true).into_json(), Value::Bool(true));
        assert_eq!(SqlValue::from(None::<String>).into_json(), Value::Null);
        assert_eq!(SqlValue::F64(f64::NAN).into_json(), Value::Null);
    }

    #[test]
    fn test_decimal_keeps_precision_as_string() {
        let d = Decimal::from_str("12345678901234567890.125").unwrap();
        assert_eq!(
            SqlValue::Decimal(d).into_json(),
            Value::String("12345678901234567890.125".into())
        );
    }

    #[test]
    fn test_temporal_values_are_iso_strings() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(SqlValue::DateTime(dt).into_json(), Value::String("2024-03-01T13:05:09".into()));
        assert_eq!(
            SqlValue::Date(dt.date()).into_json(),
            Value::String("2024-03-01".into())
        );
    }

    #[test]
    fn test_bytes_render_as_hex() {
        let v = SqlValue::from(vec![0x00u8, 0xab, 0x10]);
        assert_eq!(v.into_json(), Value::String("0x00ab10".into()));
    }
}
