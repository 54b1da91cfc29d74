use crate::error::{RadioError, Result};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// A command line that starts audio playback for one station.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchSpec {
    pub fn new<S: Into<String>>(program: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

struct Running {
    child: Child,
    spec: LaunchSpec,
    pid: u32,
    /// Set once the process is seen to have exited on its own.
    exit: Option<ExitStatus>,
}

/// Owns at most one playback process.
///
/// Children are spawned with `kill_on_drop`, so dropping the supervisor
/// terminates the player even if `stop` was never reached.
#[derive(Default)]
pub struct Supervisor {
    running: Option<Running>,
}

impl Supervisor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop whatever is playing and launch `spec`. Returns the new pid.
    ///
    /// # Errors
    /// Returns `RadioError::Launch` if the process cannot be spawned; no
    /// process is active afterwards.
    pub async fn play(&mut self, spec: &LaunchSpec) -> Result<u32> {
        self.stop().await;

        let child = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RadioError::Launch {
                command: spec.to_string(),
                source,
            })?;

        let pid = child.id().unwrap_or_default();
        info!("player started (pid {pid}): {spec}");
        self.running = Some(Running {
            child,
            spec: spec.clone(),
            pid,
            exit: None,
        });
        Ok(pid)
    }

    /// Kill and reap the active process. No-op when nothing is running.
    pub async fn stop(&mut self) {
        let Some(mut running) = self.running.take() else {
            return;
        };

        match running.child.kill().await {
            Ok(()) => info!("player stopped (pid {})", running.pid),
            Err(e) => debug!("player pid {} already gone: {e}", running.pid),
        }
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }

    /// The launch spec of the active process.
    pub fn active(&self) -> Option<&LaunchSpec> {
        self.running.as_ref().map(|r| &r.spec)
    }

    pub fn pid(&self) -> Option<u32> {
        self.running.as_ref().map(|r| r.pid)
    }

    /// Exit status of the active process, once `has_exited` has seen it.
    pub fn exit_status(&self) -> Option<ExitStatus> {
        self.running.as_ref().and_then(|r| r.exit)
    }

    /// True if the active process has exited on its own. The exit is logged
    /// the first time it is seen.
    pub fn has_exited(&mut self) -> bool {
        match self.running.as_mut() {
            Some(Running { exit: Some(_), .. }) => true,
            Some(r) => match r.child.try_wait() {
                Ok(Some(status)) => {
                    warn!("player pid {} exited: {status}", r.pid);
                    r.exit = Some(status);
                    true
                }
                Ok(None) => false,
                Err(e) => {
                    warn!("player pid {} wait failed: {e}", r.pid);
                    true
                }
            },
            None => false,
        }
    }
}
