use clap::Parser;

/// Shared CLI surface for every `udp-*` daemon: a single positional project
/// name, plus the three standard scheduling-override flags. Every flag is
/// also honored via the `udp_<script_stem>` environment variable (layered in
/// by `udp_config::options::Options`), which `clap`'s `env` feature alone
/// cannot express since the variable name is script-specific rather than
/// fixed per flag.
#[derive(Debug, Clone, Parser)]
#[command(version, about)]
pub struct Args {
    /// Project name; maps to `<project>.project` in the config layers.
    pub project: String,

    /// Run one iteration and exit.
    #[arg(long, default_value_t = false)]
    pub onetime: bool,

    /// Run once immediately, then follow the configured schedule.
    #[arg(long, default_value_t = false)]
    pub nowait: bool,

    /// Skip all object-store uploads; local test mode.
    #[arg(long, default_value_t = false)]
    pub notransfer: bool,

    /// Directory holding per-namespace recovery state and the command file.
    #[arg(long, default_value = "state")]
    pub state_dir: std::path::PathBuf,
}
