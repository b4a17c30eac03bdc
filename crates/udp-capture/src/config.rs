use udp_config::ConfigStore;
use udp_model::{Cdc, TableSpec};

const RESERVED_SECTIONS: &[&str] = &["default", "project", "cloud", "database"];

fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Builds this namespace's table list from a loaded `.tables` config: every
/// non-reserved `[schema.table]` section becomes one `TableSpec`, the way
/// `capture.py` walked its own table configuration on startup.
pub fn load_table_specs(store: &ConfigStore) -> Vec<TableSpec> {
    store
        .sections()
        .filter(|section_name| !RESERVED_SECTIONS.contains(section_name))
        .filter_map(|section_name| {
            let section = store.section(section_name)?;
            let (schema_name, table_name) = section_name.split_once('.')?;
            let mut table = TableSpec::new(schema_name, table_name);

            if let Some(cdc) = section.get("cdc") {
                table.cdc = Cdc::parse(cdc);
            }
            if let Some(timestamp) = section.get("timestamp") {
                table.timestamp = split_csv(timestamp);
            }
            if let Some(pk) = section.get("primary_key") {
                table.primary_key = split_csv(pk);
            }
            if let Some(first_timestamp) = section.get("first_timestamp") {
                table.first_timestamp = Some(first_timestamp.to_string());
            }
            if let Some(ignore_columns) = section.get("ignore_columns") {
                table.ignore_columns = split_csv(ignore_columns);
            }
            if let Some(ignore_table) = section.get("ignore_table") {
                table.ignore_table = parse_bool(ignore_table);
            }
            if let Some(drop_table) = section.get("drop_table") {
                table.drop_table = parse_bool(drop_table);
            }
            if let Some(join) = section.get("join") {
                table.join = join.to_string();
            }
            if let Some(where_clause) = section.get("where") {
                table.where_clause = where_clause.to_string();
            }
            if let Some(order) = section.get("order") {
                table.order = split_csv(order);
            }
            if let Some(table_type) = section.get("table_type") {
                table.table_type = Some(table_type.to_string());
            }

            Some(table)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_table_spec_per_schema_qualified_section() {
        let mut store = ConfigStore::new();
        store
            .load_str(
                "[project]\nbucket = acme\n\n[public.customer]\ncdc = timestamp\ntimestamp = updated_at\nprimary_key = id\n\n[public.lookup]\ncdc = none\norder = code\n",
            )
            .unwrap();

        let tables = load_table_specs(&store);
        assert_eq!(tables.len(), 2);

        let customer = tables.iter().find(|t| t.table_name == "customer").unwrap();
        assert_eq!(customer.schema_name, "public");
        assert_eq!(customer.cdc, Cdc::Timestamp);
        assert_eq!(customer.timestamp, vec!["updated_at".to_string()]);
        assert_eq!(customer.primary_key, vec!["id".to_string()]);

        let lookup = tables.iter().find(|t| t.table_name == "lookup").unwrap();
        assert_eq!(lookup.cdc, Cdc::None);
        assert_eq!(lookup.order, vec!["code".to_string()]);
    }

    #[test]
    fn ignore_table_and_drop_table_parse_as_booleans() {
        let mut store = ConfigStore::new();
        store
            .load_str("[public.secret]\nignore_table = true\n\n[public.retired]\ndrop_table = yes\n")
            .unwrap();
        let tables = load_table_specs(&store);
        assert!(tables.iter().find(|t| t.table_name == "secret").unwrap().ignore_table);
        assert!(tables.iter().find(|t| t.table_name == "retired").unwrap().drop_table);
    }
}
