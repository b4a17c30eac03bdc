use std::path::{Path, PathBuf};

/// A single-line command parsed from a `<stem>.listen` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Stop,
    Restart,
    Cancel,
    Pause,
    Continue,
    Uptime,
    Counters,
    Help(Option<String>),
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut parts = line.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_lowercase();
        let argument = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        match verb.as_str() {
            "stop" => Command::Stop,
            "restart" => Command::Restart,
            "cancel" => Command::Cancel,
            "pause" => Command::Pause,
            "continue" => Command::Continue,
            "uptime" => Command::Uptime,
            "counters" => Command::Counters,
            "help" => Command::Help(argument),
            _ => Command::Unknown(line.to_string()),
        }
    }
}

/// Polls a `<stem>.listen` file that an operator drops next to a running
/// daemon to steer it. Each poll reads the file's first line then deletes
/// it, so a command is consumed exactly once.
pub struct CommandChannel {
    path: PathBuf,
}

impl CommandChannel {
    pub fn new(state_dir: &Path, script_stem: &str) -> Self {
        Self {
            path: state_dir.join(format!("{script_stem}.listen")),
        }
    }

    /// Returns `Ok(None)` when no command file is present this tick.
    pub fn poll(&self) -> std::io::Result<Option<Command>> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err),
        };
        std::fs::remove_file(&self.path)?;
        let first_line = text.lines().next().unwrap_or("");
        Ok(Some(Command::parse(first_line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_no_command() {
        let dir = tempfile::tempdir().unwrap();
        let channel = CommandChannel::new(dir.path(), "capture");
        assert_eq!(channel.poll().unwrap(), None);
    }

    #[test]
    fn command_is_consumed_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("capture.listen"), "pause\n").unwrap();
        let channel = CommandChannel::new(dir.path(), "capture");
        assert_eq!(channel.poll().unwrap(), Some(Command::Pause));
        assert_eq!(channel.poll().unwrap(), None);
    }

    #[test]
    fn help_carries_optional_argument() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("capture.listen"), "help counters").unwrap();
        let channel = CommandChannel::new(dir.path(), "capture");
        assert_eq!(channel.poll().unwrap(), Some(Command::Help(Some("counters".into()))));
    }

    #[test]
    fn unrecognized_verb_is_unknown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("capture.listen"), "frobnicate").unwrap();
        let channel = CommandChannel::new(dir.path(), "capture");
        assert_eq!(channel.poll().unwrap(), Some(Command::Unknown("frobnicate".into())));
    }
}
