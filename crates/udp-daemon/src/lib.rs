mod cli;
mod lifecycle;
mod logging;

pub use cli::Args;
pub use lifecycle::Lifecycle;
pub use logging::init as init_logging;
