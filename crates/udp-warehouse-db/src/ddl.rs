use udp_cdc::Ident;
use udp_model::TableSchema;

use crate::types::translate_type;
use crate::WarehouseError;

/// The two extended columns every staged table carries, in the order Stage
/// appends them after a table's own translated columns.
pub const EXTENDED_COLUMNS: &[(&str, &str)] = &[("udp_jobid", "int"), ("udp_timestamp", "datetime2(7)")];

/// Renders `CREATE TABLE "schema"."table" (...)` from a discovered source
/// schema, translated to the warehouse's types, plus the fixed extended
/// columns. Column order matches `schema`'s iteration order so batch row
/// arrays line up positionally with the generated column list.
pub fn render_create_table(schema_name: &str, table_name: &str, schema: &TableSchema) -> Result<String, WarehouseError> {
    let schema_ident = Ident::new(schema_name).map_err(WarehouseError::InvalidIdent)?;
    let table_ident = Ident::new(table_name).map_err(WarehouseError::InvalidIdent)?;

    let mut columns = Vec::with_capacity(schema.columns.len() + EXTENDED_COLUMNS.len());
    for column in schema.columns.values() {
        let ident = Ident::new(&column.column_name).map_err(WarehouseError::InvalidIdent)?;
        let target_type = translate_type(column);
        let nullability = if column.is_nullable { "null" } else { "not null" };
        columns.push(format!("{ident} {target_type} {nullability}"));
    }
    for (name, data_type) in EXTENDED_COLUMNS {
        let ident = Ident::new(name).map_err(WarehouseError::InvalidIdent)?;
        columns.push(format!("{ident} {data_type} null"));
    }

    Ok(format!(
        "create table {schema_ident}.{table_ident} (\n  {}\n);",
        columns.join(",\n  ")
    ))
}

/// Every column name a created table carries, in DDL order: the source
/// schema's own columns followed by the extended provenance columns.
pub fn target_column_names(schema: &TableSchema) -> Vec<String> {
    let mut names = schema.column_names();
    names.extend(EXTENDED_COLUMNS.iter().map(|(name, _)| name.to_string()));
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use udp_model::Column;

    #[test]
    fn renders_translated_columns_plus_extended() {
        let mut schema = TableSchema::default();
        schema.columns.insert("id".into(), Column::new("id", "integer"));
        let mut name = Column::new("name", "character varying");
        name.is_nullable = false;
        schema.columns.insert("name".into(), name);

        let sql = render_create_table("acme_customer", "customer", &schema).unwrap();
        assert!(sql.contains("\"id\" int null"));
        assert!(sql.contains("\"name\" nvarchar(768) not null"));
        assert!(sql.contains("\"udp_jobid\" int null"));
        assert!(sql.contains("\"udp_timestamp\" datetime2(7) null"));
        assert!(sql.starts_with("create table \"acme_customer\".\"customer\""));
    }

    #[test]
    fn target_column_names_appends_extended_columns() {
        let mut schema = TableSchema::default();
        schema.columns.insert("id".into(), Column::new("id", "integer"));
        let names = target_column_names(&schema);
        assert_eq!(names, vec!["id", "udp_jobid", "udp_timestamp"]);
    }
}
