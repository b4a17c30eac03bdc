use std::fmt;

/// A validated, ANSI-quotable SQL identifier. Construction rejects anything
/// outside a strict character class so that untrusted table/column/schema
/// names from configuration can never break out of their quoted position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident(String);

#[derive(Debug, thiserror::Error)]
#[error("invalid identifier {0:?}: must be non-empty and contain only letters, digits, '_', '$', or '#'")]
pub struct InvalidIdent(pub String);

impl Ident {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, InvalidIdent> {
        let raw = raw.as_ref();
        // Already-quoted input arrives unquoted here; callers strip quotes first.
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '#'));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidIdent(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Renders as an ANSI double-quoted identifier.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.quoted())
    }
}

/// Strips a single layer of ANSI double-quotes or SQL-Server square brackets,
/// if present, leaving the bare identifier text.
pub fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else if raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_special_chars() {
        assert!(Ident::new("").is_err());
        assert!(Ident::new("a; drop table x").is_err());
        assert!(Ident::new("a\"b").is_err());
    }

    #[test]
    fn accepts_plain_identifiers() {
        assert_eq!(Ident::new("customer_id").unwrap().quoted(), "\"customer_id\"");
    }

    #[test]
    fn unquote_strips_brackets_and_quotes() {
        assert_eq!(unquote("[CloseHeader]"), "CloseHeader");
        assert_eq!(unquote("\"customer\""), "customer");
        assert_eq!(unquote("customer"), "customer");
    }
}
