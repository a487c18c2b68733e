//! Conversions between `sentio_core::Value` and PostgreSQL wire types

use bytes::BytesMut;
use sentio_core::{Result, Value};
use tokio_postgres::Row as PgRow;
use tokio_postgres::types::{ToSql, Type};

/// Wrapper enum for converting sentio_core::Value to types implementing ToSql.
/// This is needed because tokio-postgres requires owned values that implement ToSql.
#[derive(Debug, PartialEq)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
}

impl PgValue {
    /// Convert a Value into a PgValue that matches the target column type so
    /// tokio-postgres writes the correct binary width (4 bytes for INT4, not
    /// 8 bytes from an i64).
    pub(crate) fn from_value_for_type(value: &Value, target_type: &Type) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),
            Value::Float64(v) => match *target_type {
                Type::FLOAT4 => PgValue::Float32(*v as f32),
                _ => PgValue::Float64(*v),
            },
            Value::String(v) => match *target_type {
                Type::UUID => uuid::Uuid::parse_str(v)
                    .map(PgValue::Uuid)
                    .unwrap_or_else(|_| PgValue::String(v.clone())),
                _ => PgValue::String(v.clone()),
            },
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
        }
    }

    fn coerce_int(value: i64, target_type: &Type) -> Self {
        match *target_type {
            Type::INT2 => PgValue::Int16(value as i16),
            Type::INT4 => PgValue::Int32(value as i32),
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::FLOAT8 => PgValue::Float64(value as f64),
            _ => PgValue::Int64(value),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<postgres_types::IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(postgres_types::IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// Bind a parameter list against the types the server reported for the statement
pub(crate) fn bind_params(params: &[Value], param_types: &[Type]) -> Vec<PgValue> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| match param_types.get(i) {
            Some(target) => PgValue::from_value_for_type(value, target),
            None => PgValue::from_value_for_type(value, &Type::TEXT),
        })
        .collect()
}

fn get<'a, T: tokio_postgres::types::FromSql<'a>>(row: &'a PgRow, idx: usize) -> Option<T> {
    row.try_get::<_, Option<T>>(idx).ok().flatten()
}

/// Convert one column of a PostgreSQL row into a Value
pub(crate) fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value> {
    let col = &row.columns()[idx];

    let value = match col.type_().name() {
        "bool" => get::<bool>(row, idx).map(Value::Bool),
        "int2" => get::<i16>(row, idx).map(|v| Value::Int32(v as i32)),
        "int4" => get::<i32>(row, idx).map(Value::Int32),
        "int8" => get::<i64>(row, idx).map(Value::Int64),
        "float4" => get::<f32>(row, idx).map(|v| Value::Float64(v as f64)),
        "float8" => get::<f64>(row, idx).map(Value::Float64),
        "text" | "varchar" | "bpchar" | "name" => get::<String>(row, idx).map(Value::String),
        "uuid" => get::<uuid::Uuid>(row, idx).map(Value::Uuid),
        "json" | "jsonb" => get::<serde_json::Value>(row, idx).map(Value::Json),
        "timestamptz" => get::<chrono::DateTime<chrono::Utc>>(row, idx).map(Value::DateTimeUtc),
        "timestamp" => get::<chrono::NaiveDateTime>(row, idx).map(|naive| {
            Value::DateTimeUtc(chrono::DateTime::from_naive_utc_and_offset(naive, chrono::Utc))
        }),
        _ => get::<String>(row, idx).map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}
