mod ini;
mod listen;
mod options;
mod schedule;

pub use ini::{ConfigError, ConfigStore};
pub use listen::{Command, CommandChannel};
pub use options::Options;
pub use schedule::Schedule;
