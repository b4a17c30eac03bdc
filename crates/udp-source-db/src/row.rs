use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

/// Converts a Postgres row into a plain JSON object, widening every column
/// to a serde_json value by its reported type name. Types this pipeline
/// never expects to see fall back to their textual representation rather
/// than failing the batch.
pub fn row_to_json(row: &PgRow) -> Value {
    let mut map = Map::with_capacity(row.columns().len());
    for column in row.columns() {
        let name = column.name().to_string();
        let value = decode_column(row, column.ordinal(), column.type_info().name());
        map.insert(name, value);
    }
    Value::Object(map)
}

fn decode_column(row: &PgRow, index: usize, type_name: &str) -> Value {
    let raw = match row.try_get_raw(index) {
        Ok(raw) => raw,
        Err(_) => return Value::Null,
    };
    if raw.is_null() {
        return Value::Null;
    }

    match type_name {
        "BOOL" => row.try_get::<bool, _>(index).map(Value::Bool).unwrap_or(Value::Null),
        "INT2" => row
            .try_get::<i16, _>(index)
            .map(|v| Value::from(v))
            .unwrap_or(Value::Null),
        "INT4" => row
            .try_get::<i32, _>(index)
            .map(|v| Value::from(v))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<i64, _>(index)
            .map(|v| Value::from(v))
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .map(|v| Value::from(v as f64))
            .unwrap_or(Value::Null),
        "FLOAT8" | "NUMERIC" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .or_else(|_| row.try_get::<String, _>(index).map(Value::from))
            .unwrap_or(Value::Null),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index).unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<chrono::DateTime<chrono::Utc>, _>(index)
            .map(|v| Value::from(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<chrono::NaiveDateTime, _>(index)
            .map(|v| Value::from(v.format("%Y-%m-%d %H:%M:%S%.f").to_string()))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<chrono::NaiveDate, _>(index)
            .map(|v| Value::from(v.to_string()))
            .unwrap_or(Value::Null),
        "UUID" => row
            .try_get::<uuid::Uuid, _>(index)
            .map(|v| Value::from(v.to_string()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<String, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
    }
}
