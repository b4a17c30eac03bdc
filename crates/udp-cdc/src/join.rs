use crate::ident::{unquote, Ident};

const JOIN_KEYWORD_PHRASES: &[&str] = &[
    "full inner join",
    "full outer join",
    "left inner join",
    "left outer join",
    "right inner join",
    "right outer join",
    "cross join",
    "full join",
    "left join",
    "right join",
    "inner join",
    "outer join",
    "join",
];

const JOIN_CLAUSE_KEYWORDS: &[&str] = &[
    "full", "left", "right", "inner", "outer", "cross", "join", "on", "and", "or", "not",
];

/// Lower-cases, strips `-- ...` line comments, removes SQL-Server `[...]`
/// bracket quoting (re-applied later as ANSI quotes), space-delimits
/// `=`/`(`/`)`, collapses whitespace, and drops `WITH (NOLOCK)` hints.
fn clean_sql(text: &str) -> String {
    let text = text.to_lowercase();
    let text = text.replace("join[", "join [");
    let text = text.replace(['[', ']'], "");
    let text = text.replace('=', " = ").replace('(', " ( ").replace(')', " ) ");

    let without_comments: String = text
        .lines()
        .map(|line| line.split("--").next().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n");

    let normalized = without_comments.split_whitespace().collect::<Vec<_>>().join(" ");
    normalized.replace("with ( nolock )", "")
}

/// Normalizes raw, source-dialect join text into ANSI-quoted, schema-qualified
/// join clauses: strips `WITH (NOLOCK)` hints and bracket quoting, rewrites
/// `database..table` to a bare quoted `table`, and qualifies unqualified
/// tables immediately following a `JOIN` keyword with `schema_name`.
pub fn format_join(raw: &str, schema_name: &str) -> String {
    let text = clean_sql(raw);

    let mut output: Vec<String> = Vec::new();
    let mut last_token = String::new();

    for token in text.split_whitespace() {
        let rendered = if JOIN_CLAUSE_KEYWORDS.contains(&token) || !token.chars().next().map(|c| c.is_alphabetic()).unwrap_or(false) {
            token.to_string()
        } else {
            let quoted = if let Some((_, after)) = token.split_once("..") {
                quote_best_effort(after)
            } else if let Some(rest) = token.strip_prefix("dbo.") {
                quote_best_effort(rest)
            } else if let Some((alias, name)) = token.split_once('.') {
                format!("{}.{}", quote_best_effort(alias), quote_best_effort(name))
            } else {
                quote_best_effort(token)
            };

            if last_token.ends_with("join") && !quoted.contains('.') {
                format!("{}.{}", quote_best_effort(schema_name), quoted)
            } else {
                quoted
            }
        };

        last_token = rendered.clone();
        output.push(rendered);
    }

    let mut text = output.join(" ");

    // Collapse multi-word join phrases into single tokens so formatting below
    // can treat "left outer join" as one unit, then expand back.
    for phrase in JOIN_KEYWORD_PHRASES {
        let token = phrase.replace(' ', "::");
        text = text.replace(phrase, &token);
    }

    let mut formatted = String::new();
    for token in text.split_whitespace() {
        if token.ends_with("join") {
            formatted.push_str("\n  ");
            formatted.push_str(token);
        } else if token == "on" {
            formatted.push_str("\n    ");
            formatted.push_str(token);
        } else {
            formatted.push_str(token);
        }
        formatted.push(' ');
    }

    formatted.replace("::", " ")
}

fn quote_best_effort(token: &str) -> String {
    let bare = unquote(token);
    match Ident::new(bare) {
        Ok(ident) => ident.quoted(),
        Err(_) => format!("\"{bare}\""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_nolock_and_brackets_and_requalifies_database_table() {
        let raw = "Inner join [dbo].[rtp1_TransactionProduct] t with (nolock) On h.[rtp1_source_code] = t.[rtp1_source_code]";
        let out = format_join(raw, "public");
        assert!(!out.contains("nolock"));
        assert!(!out.contains('['));
        assert!(out.contains("\"rtp1_transactionproduct\""));
    }

    #[test]
    fn rewrites_database_dot_dot_table_to_bare_table() {
        let raw = "join database..table s on s.id = t.id";
        let out = format_join(raw, "public");
        assert!(out.contains("\"table\""));
        assert!(!out.contains("database"));
    }

    #[test]
    fn qualifies_unqualified_table_after_join_with_schema() {
        let raw = "join closeheader t1 on s.closeid = t1.closeid";
        let out = format_join(raw, "public");
        assert!(out.contains("\"public\".\"closeheader\""));
    }

    #[test]
    fn strips_line_comments() {
        let raw = "join closeheader t1 -- comment here\n  on s.closeid = t1.closeid -- trailing";
        let out = format_join(raw, "public");
        assert!(!out.contains("comment"));
        assert!(!out.contains("trailing"));
    }
}
