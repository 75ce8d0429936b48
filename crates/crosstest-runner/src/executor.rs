//! Build execution backends.

use crate::build::{BuildCommand, BuildOutput};
use crate::error::BuildError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, warn};

/// Trait for build backends (child process, fakes for tests).
#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Run the build in `project_root` and return its complete output.
    async fn execute(&self, project_root: &Path) -> Result<BuildOutput, BuildError>;
}

/// Runs a [`BuildCommand`] as a child process.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    command: BuildCommand,
}

impl ProcessExecutor {
    pub fn new(command: BuildCommand) -> Self {
        Self { command }
    }

    pub fn command(&self) -> &BuildCommand {
        &self.command
    }
}

#[async_trait]
impl BuildExecutor for ProcessExecutor {
    async fn execute(&self, project_root: &Path) -> Result<BuildOutput, BuildError> {
        let start = Instant::now();
        let config = &self.command;

        if config.command.is_empty() {
            return Err(BuildError::EmptyCommand(config.name.clone()));
        }

        let exe = &config.command[0];
        let args = &config.command[1..];

        debug!(command = %config.name, cwd = %project_root.display(), "Spawning build");

        let mut command = Command::new(exe);
        command
            .args(args)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| BuildError::Spawn {
            program: exe.clone(),
            source,
        })?;

        let pgid = child.id();
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let run = async {
            let lines = collect_merged(stdout, stderr).await?;
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((lines, status))
        };

        let finished = if config.timeout_secs > 0 {
            tokio::time::timeout(Duration::from_secs(config.timeout_secs), run)
                .await
                .ok()
        } else {
            Some(run.await)
        };

        let Some(finished) = finished else {
            warn!(command = %config.name, secs = config.timeout_secs, "Build timed out, killing it");
            terminate(&mut child, pgid).await;
            return Err(BuildError::Timeout {
                name: config.name.clone(),
                secs: config.timeout_secs,
            });
        };

        // Descendants that detached from the pipes may still be running.
        #[cfg(unix)]
        if let Some(pgid) = pgid {
            process_group::kill(pgid).await;
        }

        let (lines, status) = finished?;
        Ok(BuildOutput {
            lines,
            exit_code: status.code().unwrap_or(-1),
            success: status.success(),
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Kill the build and everything it started.
///
/// Returns only once no process of the build's group is left, so the caller
/// can restore files the build was writing to.
async fn terminate(child: &mut Child, pgid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pgid) = pgid {
        process_group::signal_kill(pgid);
    }
    #[cfg(not(unix))]
    let _ = pgid;

    // Reaps the direct child; an unreaped leader keeps the group alive.
    if let Err(e) = child.kill().await {
        debug!(error = %e, "Build child already gone");
    }

    #[cfg(unix)]
    if let Some(pgid) = pgid {
        process_group::kill(pgid).await;
    }
}

#[cfg(unix)]
mod process_group {
    use std::time::Duration;
    use tracing::warn;

    const POLL_INTERVAL: Duration = Duration::from_millis(20);
    const MAX_POLLS: u32 = 250;

    /// SIGKILL every process in group `pgid` and wait until the group is empty.
    ///
    /// Members reparented to an init that never reaps them keep the group
    /// alive, so the wait is bounded.
    pub(super) async fn kill(pgid: u32) {
        if !signal_kill(pgid) {
            return;
        }
        for _ in 0..MAX_POLLS {
            if !signal(pgid, 0) {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        warn!(pgid, "Build process group still present after SIGKILL");
    }

    /// `false` if the group no longer exists.
    pub(super) fn signal_kill(pgid: u32) -> bool {
        signal(pgid, libc::SIGKILL)
    }

    fn signal(pgid: u32, sig: libc::c_int) -> bool {
        let Ok(pgid) = libc::pid_t::try_from(pgid) else {
            return false;
        };
        // SAFETY: killpg takes no pointers.
        unsafe { libc::killpg(pgid, sig) == 0 }
    }
}

/// Read both streams to EOF, interleaving lines as they arrive.
async fn collect_merged<O, E>(stdout: Option<O>, stderr: Option<E>) -> std::io::Result<Vec<String>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut out = stdout.map(BufReader::new);
    let mut err = stderr.map(BufReader::new);
    let mut out_buf = Vec::new();
    let mut err_buf = Vec::new();
    let mut lines = Vec::new();

    loop {
        tokio::select! {
            n = read_line(out.as_mut(), &mut out_buf), if out.is_some() => {
                if n? == 0 {
                    out = None;
                } else {
                    lines.push(take_line(&mut out_buf));
                }
            }
            n = read_line(err.as_mut(), &mut err_buf), if err.is_some() => {
                if n? == 0 {
                    err = None;
                } else {
                    lines.push(take_line(&mut err_buf));
                }
            }
            else => break,
        }
    }

    Ok(lines)
}

/// `read_until` keeps partial data in `buf`, so this is safe to cancel in `select!`.
async fn read_line<R>(reader: Option<&mut BufReader<R>>, buf: &mut Vec<u8>) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match reader {
        Some(reader) => reader.read_until(b'\n', buf).await,
        None => Ok(0),
    }
}

fn take_line(buf: &mut Vec<u8>) -> String {
    let line = String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string();
    buf.clear();
    line
}
