use udp_model::Column;

/// Translates a source dialect's lower-cased column type into the target
/// warehouse's SQL Server type, sized from the source's own metadata where
/// that matters.
pub fn translate_type(column: &Column) -> String {
    match column.data_type.to_lowercase().as_str() {
        "array" => "nvarchar(512)".to_string(),
        "bigint" => "bigint".to_string(),
        "boolean" => "tinyint".to_string(),
        "character varying" => "nvarchar(768)".to_string(),
        "date" => "date".to_string(),
        "integer" => "int".to_string(),
        "jsonb" => "nvarchar(max)".to_string(),
        "text" => "nvarchar(max)".to_string(),
        "timestamp without time zone" => "datetime2(7)".to_string(),
        "user defined" | "user-defined" => "nvarchar(128)".to_string(),
        "uuid" => "nvarchar(36)".to_string(),
        other => other.to_string(),
    }
}

/// Whether a translated type is an `nvarchar` family type, for which row
/// values must be force-stringified before the warehouse driver binds them.
pub fn is_nvarchar(target_type: &str) -> bool {
    target_type.starts_with("nvarchar")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_translate_verbatim() {
        assert_eq!(translate_type(&Column::new("a", "boolean")), "tinyint");
        assert_eq!(translate_type(&Column::new("a", "jsonb")), "nvarchar(max)");
        assert_eq!(translate_type(&Column::new("a", "timestamp without time zone")), "datetime2(7)");
        assert_eq!(translate_type(&Column::new("a", "uuid")), "nvarchar(36)");
    }

    #[test]
    fn unknown_types_pass_through() {
        assert_eq!(translate_type(&Column::new("a", "money")), "money");
    }

    #[test]
    fn is_nvarchar_matches_sized_and_max_variants() {
        assert!(is_nvarchar("nvarchar(768)"));
        assert!(is_nvarchar("nvarchar(max)"));
        assert!(!is_nvarchar("bigint"));
    }
}
