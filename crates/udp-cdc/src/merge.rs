use crate::ident::Ident;
use crate::select::RenderError;

/// Renders the CDC merge statement described in the merge contract: matched
/// rows get every non-pk column overwritten (including `udp_jobid`,
/// `udp_timestamp`); unmatched source rows are inserted; unmatched target
/// rows are left alone (deletes are never propagated by this contract).
pub fn render_merge(
    schema_name: &str,
    target_table: &str,
    source_table: &str,
    primary_key: &[String],
    all_columns: &[String],
) -> Result<String, RenderError> {
    let schema = Ident::new(schema_name)?;
    let target = Ident::new(target_table)?;
    let source = Ident::new(source_table)?;

    let pk: Vec<Ident> = primary_key.iter().map(Ident::new).collect::<Result<_, _>>()?;
    let columns: Vec<Ident> = all_columns.iter().map(Ident::new).collect::<Result<_, _>>()?;

    let on_clause = pk
        .iter()
        .map(|c| format!("S.{c} = T.{c}"))
        .collect::<Vec<_>>()
        .join(" and ");

    let pk_names: std::collections::HashSet<&str> = pk.iter().map(|c| c.as_str()).collect();
    let update_set = columns
        .iter()
        .filter(|c| !pk_names.contains(c.as_str()))
        .map(|c| format!("T.{c} = S.{c}"))
        .collect::<Vec<_>>()
        .join(",\n    ");

    let insert_columns = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(", ");
    let insert_values = columns
        .iter()
        .map(|c| format!("S.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "merge {schema}.{target} as T\nusing {schema}.{source} as S\non ({on_clause})\nwhen matched then update set\n    {update_set}\nwhen not matched by target then insert ({insert_columns})\n    values ({insert_values});"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_updates_matched_and_inserts_unmatched() {
        let sql = render_merge(
            "acme_customer",
            "customer",
            "_customer",
            &["id".into()],
            &["id".into(), "name".into(), "udp_jobid".into(), "udp_timestamp".into()],
        )
        .unwrap();
        assert!(sql.contains("on (S.\"id\" = T.\"id\")"));
        assert!(sql.contains("T.\"name\" = S.\"name\""));
        assert!(sql.contains("T.\"udp_jobid\" = S.\"udp_jobid\""));
        assert!(!sql.contains("T.\"id\" = S.\"id\""));
        assert!(sql.contains("insert (\"id\", \"name\", \"udp_jobid\", \"udp_timestamp\")"));
    }

    #[test]
    fn merge_has_no_delete_clause() {
        let sql = render_merge("ns", "t", "_t", &["id".into()], &["id".into()]).unwrap();
        assert!(!sql.to_lowercase().contains("when not matched by source"));
    }
}
