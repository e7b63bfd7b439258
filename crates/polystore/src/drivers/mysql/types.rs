//! Value conversion between [`SqlValue`] and `mysql_async::Value`.

use mysql_async::consts::ColumnType;
use mysql_async::Value;

use crate::core::{Row, SqlValue};

/// Convert SqlValue to mysql_async::Value.
pub(crate) fn sql_value_to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::from(*b),
        SqlValue::Int(i) => Value::from(*i),
        SqlValue::Float(f) => Value::from(*f),
        SqlValue::Text(s) => Value::from(s.as_str()),
    }
}

fn is_integer_column(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_TINY
            | ColumnType::MYSQL_TYPE_SHORT
            | ColumnType::MYSQL_TYPE_INT24
            | ColumnType::MYSQL_TYPE_LONG
            | ColumnType::MYSQL_TYPE_LONGLONG
            | ColumnType::MYSQL_TYPE_YEAR
    )
}

fn is_decimal_column(column_type: ColumnType) -> bool {
    matches!(
        column_type,
        ColumnType::MYSQL_TYPE_FLOAT
            | ColumnType::MYSQL_TYPE_DOUBLE
            | ColumnType::MYSQL_TYPE_DECIMAL
            | ColumnType::MYSQL_TYPE_NEWDECIMAL
    )
}

/// Convert one column value using its declared column type.
///
/// The binary protocol already types integers and floats; text-protocol
/// bytes and DECIMAL columns are parsed here.
fn convert_mysql_value(value: &Value, column_type: ColumnType) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(i) => SqlValue::Int(*i),
        Value::UInt(u) => match i64::try_from(*u) {
            Ok(i) => SqlValue::Int(i),
            Err(_) => SqlValue::Float(*u as f64),
        },
        Value::Float(f) => SqlValue::Float(f64::from(*f)),
        Value::Double(f) => SqlValue::Float(*f),
        Value::Date(year, month, day, hour, minute, second, _micros) => {
            if column_type == ColumnType::MYSQL_TYPE_DATE {
                SqlValue::Text(format!("{:04}-{:02}-{:02}", year, month, day))
            } else {
                SqlValue::Text(format!(
                    "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                    year, month, day, hour, minute, second
                ))
            }
        }
        Value::Time(negative, days, hours, minutes, seconds, _micros) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u32::from(*hours) + days * 24;
            SqlValue::Text(format!("{}{:02}:{:02}:{:02}", sign, hours, minutes, seconds))
        }
        Value::Bytes(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            if is_integer_column(column_type) {
                if let Ok(i) = text.trim().parse::<i64>() {
                    return SqlValue::Int(i);
                }
            } else if is_decimal_column(column_type) {
                if let Ok(f) = text.trim().parse::<f64>() {
                    return SqlValue::Float(f);
                }
            }
            SqlValue::Text(text.into_owned())
        }
    }
}

/// Convert a result row into a column-name keyed [`Row`].
pub(crate) fn convert_row(row: &mysql_async::Row) -> Row {
    let mut out = Row::new();
    for (idx, column) in row.columns_ref().iter().enumerate() {
        let value = row
            .as_ref(idx)
            .map(|v| convert_mysql_value(v, column.column_type()))
            .unwrap_or(SqlValue::Null);
        out.insert(column.name_str().into_owned(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_keep_scalar_kind() {
        assert_eq!(sql_value_to_mysql(&SqlValue::Null), Value::NULL);
        assert_eq!(sql_value_to_mysql(&SqlValue::Int(5)), Value::Int(5));
        assert_eq!(sql_value_to_mysql(&SqlValue::Float(1.5)), Value::Double(1.5));
        assert_eq!(
            sql_value_to_mysql(&SqlValue::Text("Acme".into())),
            Value::Bytes(b"Acme".to_vec())
        );
    }

    #[test]
    fn test_decimal_text_becomes_float() {
        let value = Value::Bytes(b"12.50".to_vec());
        assert_eq!(
            convert_mysql_value(&value, ColumnType::MYSQL_TYPE_NEWDECIMAL),
            SqlValue::Float(12.5)
        );
        assert_eq!(
            convert_mysql_value(&value, ColumnType::MYSQL_TYPE_VAR_STRING),
            SqlValue::Text("12.50".into())
        );
    }

    #[test]
    fn test_dates_use_canonical_text() {
        let date = Value::Date(2024, 3, 1, 0, 0, 0, 0);
        assert_eq!(
            convert_mysql_value(&date, ColumnType::MYSQL_TYPE_DATE),
            SqlValue::Text("2024-03-01".into())
        );
        let datetime = Value::Date(2024, 3, 1, 9, 5, 7, 0);
        assert_eq!(
            convert_mysql_value(&datetime, ColumnType::MYSQL_TYPE_DATETIME),
            SqlValue::Text("2024-03-01 09:05:07".into())
        );
    }

    #[test]
    fn test_unsigned_ids_fit_in_int() {
        assert_eq!(
            convert_mysql_value(&Value::UInt(42), ColumnType::MYSQL_TYPE_LONGLONG),
            SqlValue::Int(42)
        );
    }
}
