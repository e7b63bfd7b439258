//! Value conversion between [`SqlValue`] and PostgreSQL wire types.
//!
//! Parameters are converted by the type the server inferred for each
//! placeholder, so a value read from another engine (an integer flag, a
//! date stored as text) binds to whatever the target column expects.

use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio_postgres::types::{to_sql_checked, IsNull, Kind, ToSql, Type};

use crate::core::{Row, SqlValue, DATE_FORMAT, TIMESTAMP_FORMAT};
use crate::error::Result;

type BoxError = Box<dyn Error + Sync + Send>;

/// Domains are encoded as their base type.
fn base_type(ty: &Type) -> &Type {
    match ty.kind() {
        Kind::Domain(inner) => base_type(inner),
        _ => ty,
    }
}

fn mismatch(value: &SqlValue, ty: &Type) -> BoxError {
    format!("cannot bind {:?} to a {} parameter", value, ty.name()).into()
}

impl ToSql for SqlValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        if self.is_null() {
            return Ok(IsNull::Yes);
        }

        let ty = base_type(ty);
        match *ty {
            Type::BOOL => self
                .as_bool()
                .ok_or_else(|| mismatch(self, ty))?
                .to_sql(ty, out),
            Type::INT2 => {
                let v = self.as_i64().ok_or_else(|| mismatch(self, ty))?;
                i16::try_from(v)?.to_sql(ty, out)
            }
            Type::INT4 => {
                let v = self.as_i64().ok_or_else(|| mismatch(self, ty))?;
                i32::try_from(v)?.to_sql(ty, out)
            }
            Type::INT8 => self
                .as_i64()
                .ok_or_else(|| mismatch(self, ty))?
                .to_sql(ty, out),
            Type::FLOAT4 => {
                let v = self.as_f64().ok_or_else(|| mismatch(self, ty))?;
                (v as f32).to_sql(ty, out)
            }
            Type::FLOAT8 => self
                .as_f64()
                .ok_or_else(|| mismatch(self, ty))?
                .to_sql(ty, out),
            Type::NUMERIC => to_decimal(self)?.to_sql(ty, out),
            Type::DATE => {
                let text = self.as_text().ok_or_else(|| mismatch(self, ty))?;
                parse_date(&text)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out)
            }
            Type::TIMESTAMP => {
                let text = self.as_text().ok_or_else(|| mismatch(self, ty))?;
                parse_timestamp(&text)
                    .ok_or_else(|| mismatch(self, ty))?
                    .to_sql(ty, out)
            }
            Type::TIMESTAMPTZ => {
                let text = self.as_text().ok_or_else(|| mismatch(self, ty))?;
                parse_timestamp(&text)
                    .ok_or_else(|| mismatch(self, ty))?
                    .and_utc()
                    .to_sql(ty, out)
            }
            _ => {
                let text = self.as_text().ok_or_else(|| mismatch(self, ty))?;
                <&str as ToSql>::to_sql(&&*text, ty, out)
            }
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn to_decimal(value: &SqlValue) -> std::result::Result<Decimal, BoxError> {
    Ok(match value {
        SqlValue::Int(i) => Decimal::from(*i),
        SqlValue::Bool(b) => Decimal::from(i64::from(*b)),
        SqlValue::Float(f) => Decimal::try_from(*f)?,
        SqlValue::Text(s) => s.trim().parse::<Decimal>()?,
        SqlValue::Null => return Err("NULL has no decimal value".into()),
    })
}

/// Parse a calendar date, tolerating a trailing time part.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let date_part = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()
}

/// Parse a timestamp in canonical, ISO 8601 or RFC 3339 form.
fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    if text.len() == 10 {
        return parse_date(text).and_then(|d| d.and_hms_opt(0, 0, 0));
    }
    None
}

/// Convert one column of a result row into a [`SqlValue`].
fn convert_pg_row_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Result<SqlValue> {
    let value: SqlValue = match *base_type(ty) {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.into(),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(i64::from)
            .into(),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(i64::from)
            .into(),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.into(),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(f64::from)
            .into(),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.into(),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)?
            .and_then(|d| d.to_f64())
            .into(),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)?
            .map(|d| d.format(DATE_FORMAT).to_string())
            .into(),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)?
            .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
            .into(),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)?
            .map(|dt| dt.naive_utc().format(TIMESTAMP_FORMAT).to_string())
            .into(),
        // Text-like and anything else readable as a string; unreadable types become NULL.
        _ => row.try_get::<_, Option<String>>(idx).ok().flatten().into(),
    };
    Ok(value)
}

/// Convert a result row into a column-name keyed [`Row`].
pub(crate) fn convert_row(row: &tokio_postgres::Row) -> Result<Row> {
    let mut out = Row::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = convert_pg_row_value(row, idx, column.type_())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}
