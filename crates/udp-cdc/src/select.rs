use chrono::{DateTime, Utc};

use crate::ident::Ident;
use crate::join::format_join;
use udp_model::{JobId, TableSpec};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    InvalidIdent(#[from] crate::ident::InvalidIdent),
}

fn alias_column(raw: &str, alias: &str) -> Result<String, RenderError> {
    let raw = crate::ident::unquote(raw);
    if let Some((table_alias, column)) = raw.split_once('.') {
        Ok(format!(
            "{}.{}",
            Ident::new(table_alias)?.quoted(),
            Ident::new(column)?.quoted()
        ))
    } else {
        Ok(format!("{}.{}", Ident::new(alias)?.quoted(), Ident::new(raw)?.quoted()))
    }
}

/// The `udp_timestamp` expression and, when timestamp-based CDC is
/// configured, the matching `WHERE` window predicate.
struct TimestampClause {
    value_expr: String,
    where_condition: Option<String>,
}

fn timestamp_clause(
    table: &TableSpec,
    current_timestamp: DateTime<Utc>,
    last_timestamp: DateTime<Utc>,
) -> Result<TimestampClause, RenderError> {
    if table.timestamp.is_empty() {
        return Ok(TimestampClause {
            value_expr: format!("'{}'", current_timestamp.format("%Y-%m-%d %H:%M:%S")),
            where_condition: None,
        });
    }

    let aliased: Vec<String> = table
        .timestamp
        .iter()
        .map(|c| alias_column(c, "s"))
        .collect::<Result<_, _>>()?;

    let value_expr = if aliased.len() == 1 {
        aliased[0].clone()
    } else {
        let values = aliased
            .iter()
            .map(|c| format!("({c})"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("(select max(\"v\") from (values {values}) as value(\"v\"))")
    };

    let where_condition = format!(
        "(\n        {value_expr} >= '{}' and\n        {value_expr} < '{}'\n    )",
        last_timestamp.format("%Y-%m-%d %H:%M:%S"),
        current_timestamp.format("%Y-%m-%d %H:%M:%S"),
    );

    Ok(TimestampClause {
        value_expr,
        where_condition: Some(where_condition),
    })
}

fn where_clause(table: &TableSpec, timestamp_where: Option<&str>) -> String {
    match (table.where_clause.trim(), timestamp_where) {
        ("", None) => String::new(),
        (user, None) => format!("where\n    ({user})"),
        ("", Some(ts)) => format!("where\n    {ts}"),
        (user, Some(ts)) => format!("where\n    ({user}) and\n    {ts}"),
    }
}

fn order_clause(table: &TableSpec) -> Result<String, RenderError> {
    if table.order.is_empty() {
        return Ok(String::new());
    }
    let columns: Vec<String> = table
        .order
        .iter()
        .map(|c| alias_column(c, "s"))
        .collect::<Result<_, _>>()?;
    Ok(format!("order by {}", columns.join(", ")))
}

/// Renders the ANSI-quoted CDC select statement for `table`, scanning the
/// open window `(last_timestamp, current_timestamp]`.
pub fn render_select(
    table: &TableSpec,
    column_names: &[String],
    job_id: JobId,
    current_timestamp: DateTime<Utc>,
    last_timestamp: DateTime<Utc>,
) -> Result<String, RenderError> {
    let schema = Ident::new(&table.schema_name)?;
    let table_ident = Ident::new(&table.table_name)?;

    let columns: Vec<String> = column_names
        .iter()
        .map(|c| alias_column(c, "s"))
        .collect::<Result<_, _>>()?;

    let ts = timestamp_clause(table, current_timestamp, last_timestamp)?;
    let join_clause = if table.join.trim().is_empty() {
        String::new()
    } else {
        format!("\n{}", format_join(&table.join, &table.schema_name))
    };
    let where_clause = where_clause(table, ts.where_condition.as_deref());
    let order_clause = order_clause(table)?;

    let mut sql = format!(
        "select\n  {columns},\n  {job_id} as \"udp_job\",\n  {timestamp_value} as \"udp_timestamp\"\n  from {schema}.{table_ident} as \"s\"{join_clause}",
        columns = columns.join(",\n  "),
        timestamp_value = ts.value_expr,
    );
    if !where_clause.is_empty() {
        sql.push_str("\n  ");
        sql.push_str(&where_clause);
    }
    if !order_clause.is_empty() {
        sql.push_str("\n  ");
        sql.push_str(&order_clause);
    }
    sql.push(';');
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use udp_model::Cdc;

    fn ts(s: &str) -> DateTime<Utc> {
        chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
    }

    #[test]
    fn no_cdc_omits_timestamp_predicate() {
        let mut table = TableSpec::new("public", "lookup");
        table.cdc = Cdc::None;
        let sql = render_select(&table, &["code".into()], 1, ts("2024-01-02 12:00:30"), ts("2020-01-01 00:00:00")).unwrap();
        assert!(!sql.contains(">="));
        assert!(sql.contains("'2024-01-02 12:00:30' as \"udp_timestamp\""));
    }

    #[test]
    fn single_timestamp_column_builds_window_predicate() {
        let mut table = TableSpec::new("public", "customer");
        table.cdc = Cdc::Timestamp;
        table.timestamp = vec!["updated_at".into()];
        let sql = render_select(
            &table,
            &["id".into(), "name".into()],
            7,
            ts("2024-01-03 12:00:30"),
            ts("2024-01-02 12:00:30"),
        )
        .unwrap();
        assert!(sql.contains("\"s\".\"updated_at\" >= '2024-01-02 12:00:30'"));
        assert!(sql.contains("\"s\".\"updated_at\" < '2024-01-03 12:00:30'"));
        assert!(sql.contains("7 as \"udp_job\""));
    }

    #[test]
    fn multi_column_timestamp_uses_values_max() {
        let mut table = TableSpec::new("public", "order_line");
        table.cdc = Cdc::Timestamp;
        table.timestamp = vec!["created_at".into(), "updated_at".into()];
        let sql = render_select(&table, &["id".into()], 1, ts("2024-01-02 00:00:00"), ts("2024-01-01 00:00:00")).unwrap();
        assert!(sql.contains("select max(\"v\") from (values"));
    }

    #[test]
    fn rejects_malicious_identifiers() {
        let mut table = TableSpec::new("public", "customer; drop table x");
        table.cdc = Cdc::None;
        let err = render_select(&table, &["id".into()], 1, ts("2024-01-01 00:00:00"), ts("2020-01-01 00:00:00"));
        assert!(err.is_err());
    }
}
