use serde::{Deserialize, Serialize};
use std::fmt;

/// A namespace uniquely names one source-database-scoped data feed:
/// `entity_location_system_instance_subject`. It is both the logical feed
/// name and the target warehouse schema name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Builds a namespace from its five constituent project components.
    pub fn from_components(entity: &str, location: &str, system: &str, instance: &str, subject: &str) -> Self {
        Self(format!("{entity}_{location}_{system}_{instance}_{subject}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Namespace {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
