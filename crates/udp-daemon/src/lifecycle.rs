use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Instant;

use udp_config::{Command, CommandChannel, Schedule};

use crate::Args;

/// What the poll loop should do after the command channel was drained this
/// tick. Mirrors the original's exception-driven `DaemonStop`/`DaemonRestart`
/// as plain control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Continue,
    Restart,
    Stop,
}

/// The generic polling-loop harness shared by every `udp-*` daemon binary:
/// command-channel dispatch (`stop`/`restart`/`cancel`/`pause`/`continue`/
/// `uptime`/`counters`/`help`), `--onetime`/`--nowait` scheduling overrides,
/// and per-command counters. `tick` runs one job; its `Result::Err` is
/// logged and the loop continues (a daemon never exits on a single failed
/// job, per the transient-error policy).
pub struct Lifecycle {
    script_stem: String,
    command_channel: CommandChannel,
    start_time: Instant,
    counters: HashMap<String, u64>,
}

impl Lifecycle {
    pub fn new(state_dir: &Path, script_stem: impl Into<String>) -> Self {
        let script_stem = script_stem.into();
        Self {
            command_channel: CommandChannel::new(state_dir, &script_stem),
            script_stem,
            start_time: Instant::now(),
            counters: HashMap::new(),
        }
    }

    fn count(&mut self, name: &str) {
        *self.counters.entry(name.to_string()).or_insert(0) += 1;
    }

    fn uptime_line(&self) -> String {
        format!("uptime: {:.0}s", self.start_time.elapsed().as_secs_f64())
    }

    fn counters_line(&self) -> String {
        let mut names: Vec<&String> = self.counters.keys().collect();
        names.sort();
        names
            .into_iter()
            .map(|name| format!("{name}={}", self.counters[name]))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Drains at most one pending command and applies it, blocking on
    /// `pause` until `continue`/`stop`/`restart` arrives (polling every
    /// 500ms, matching the original's `do_pause`).
    async fn drain_commands(&mut self) -> Signal {
        loop {
            let command = match self.command_channel.poll() {
                Ok(Some(command)) => command,
                Ok(None) => return Signal::Continue,
                Err(err) => {
                    tracing::warn!(script = %self.script_stem, error = %err, "failed to read command file");
                    return Signal::Continue;
                }
            };

            match command {
                Command::Stop => {
                    self.count("stop");
                    return Signal::Stop;
                }
                Command::Restart => {
                    self.count("restart");
                    return Signal::Restart;
                }
                Command::Cancel => {
                    self.count("cancel");
                    return Signal::Continue;
                }
                Command::Continue => {
                    self.count("continue");
                    return Signal::Continue;
                }
                Command::Pause => {
                    self.count("pause");
                    tracing::info!(script = %self.script_stem, "paused");
                    loop {
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        match self.command_channel.poll() {
                            Ok(Some(Command::Continue)) => {
                                self.count("continue");
                                break;
                            }
                            Ok(Some(Command::Stop)) => {
                                self.count("stop");
                                return Signal::Stop;
                            }
                            Ok(Some(Command::Restart)) => {
                                self.count("restart");
                                return Signal::Restart;
                            }
                            Ok(Some(_)) | Ok(None) => continue,
                            Err(err) => {
                                tracing::warn!(script = %self.script_stem, error = %err, "failed to read command file while paused");
                            }
                        }
                    }
                }
                Command::Uptime => {
                    self.count("uptime");
                    tracing::info!(script = %self.script_stem, "{}", self.uptime_line());
                }
                Command::Counters => {
                    self.count("counters");
                    tracing::info!(script = %self.script_stem, "{}", self.counters_line());
                }
                Command::Help(_) => {
                    self.count("help");
                    tracing::info!(script = %self.script_stem, "commands: stop, restart, cancel, pause, continue, uptime, counters, help");
                }
                Command::Unknown(raw) => {
                    self.count("unknown");
                    tracing::warn!(script = %self.script_stem, command = %raw, "unhandled command");
                }
            }
        }
    }

    /// Runs `tick` according to `args`/`schedule` until a `stop` command
    /// arrives. A `restart` command re-enters this loop's top (there is no
    /// teardown state to discard since connections are already reconnected
    /// every iteration).
    pub async fn run<F, Fut>(&mut self, args: &Args, schedule: &Schedule, mut tick: F) -> anyhow::Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = anyhow::Result<()>>,
    {
        'restart: loop {
            if args.onetime {
                if let Err(err) = tick().await {
                    tracing::error!(script = %self.script_stem, error = ?err, "job failed");
                }
                return Ok(());
            }

            let mut last_run = None;
            if args.nowait {
                if let Err(err) = tick().await {
                    tracing::error!(script = %self.script_stem, error = ?err, "job failed");
                }
                last_run = Some(chrono::Utc::now());
                self.count("run");
            }

            loop {
                match self.drain_commands().await {
                    Signal::Stop => return Ok(()),
                    Signal::Restart => continue 'restart,
                    Signal::Continue => {}
                }

                let now = chrono::Utc::now();
                if schedule.should_run(last_run, now) {
                    if let Err(err) = tick().await {
                        tracing::error!(script = %self.script_stem, error = ?err, "job failed");
                    }
                    last_run = Some(now);
                    self.count("run");
                }

                tokio::time::sleep(std::time::Duration::from_secs(1)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn onetime_args() -> Args {
        Args {
            project: "test".into(),
            onetime: true,
            nowait: false,
            notransfer: false,
            state_dir: std::env::temp_dir(),
        }
    }

    #[tokio::test]
    async fn onetime_runs_exactly_once_and_returns() {
        let dir = tempfile::tempdir().unwrap();
        let mut lifecycle = Lifecycle::new(dir.path(), "capture");
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();

        let mut args = onetime_args();
        args.state_dir = dir.path().to_path_buf();

        lifecycle
            .run(&args, &Schedule::new(), || {
                let runs = runs_clone.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stop_command_ends_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("capture.listen"), "stop\n").unwrap();
        let mut lifecycle = Lifecycle::new(dir.path(), "capture");

        let mut args = onetime_args();
        args.onetime = false;
        args.state_dir = dir.path().to_path_buf();

        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = runs.clone();
        lifecycle
            .run(&args, &Schedule::new(), || {
                let runs = runs_clone.clone();
                async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
