mod engine;
mod relay;

pub use engine::ArchiveEngine;
pub use relay::{ArchiveError, RelayOutcome};
