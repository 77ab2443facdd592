//! Runs rsync and turns its output into a log.
//!
//! [`SyncExecutor`] owns the only [`SyncRun`] of the process. Output and exit
//! status are produced by background tasks as [`RunEvent`]s and applied on the
//! control loop through [`SyncExecutor::handle`].

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use super::planner::SyncRequest;
use crate::config::RsyncConfig;
use crate::error::SyncError;
use crate::models::{SyncDirection, SyncMode};

pub type RunId = u64;

const SEPARATOR: &str = "───";
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
pub const CANCELLED_MESSAGE: &str = "Sync cancelled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Succeeded,
    /// `exit_code` is `None` when the process was cancelled, killed or never started
    Failed { exit_code: Option<i32> },
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    /// Monotonic offset from the start of the run
    pub elapsed: Duration,
    pub text: String,
    pub is_error: bool,
}

impl LogLine {
    pub fn formatted_time(&self) -> String {
        self.timestamp.format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone)]
pub struct SyncRun {
    pub id: RunId,
    pub request: SyncRequest,
    pub direction: SyncDirection,
    pub status: RunStatus,
    pub log: Vec<LogLine>,
    /// Latest stdout line, or a summary once the run ended
    pub progress: String,
    started: Instant,
}

impl SyncRun {
    fn new(id: RunId, request: SyncRequest, direction: SyncDirection) -> Self {
        Self {
            id,
            request,
            direction,
            status: RunStatus::Running,
            log: Vec::new(),
            progress: String::new(),
            started: Instant::now(),
        }
    }

    fn push(&mut self, text: impl Into<String>, is_error: bool) {
        self.log.push(LogLine {
            timestamp: Local::now(),
            elapsed: self.started.elapsed(),
            text: text.into(),
            is_error,
        });
    }

    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }
}

/// Output and exit of a spawned rsync
#[derive(Debug)]
pub enum RunEvent {
    Line {
        run_id: RunId,
        text: String,
        is_error: bool,
    },
    Exited {
        run_id: RunId,
        exit_code: Option<i32>,
    },
}

/// Emitted once a run ends on its own; `direction` tells which pane to refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCompletion {
    pub run_id: RunId,
    pub direction: SyncDirection,
    pub status: RunStatus,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub candidates: Vec<PathBuf>,
    pub fallback: PathBuf,
}

impl From<&RsyncConfig> for ExecutorConfig {
    fn from(config: &RsyncConfig) -> Self {
        Self {
            candidates: config.local_candidates.iter().map(PathBuf::from).collect(),
            fallback: PathBuf::from(&config.local_fallback),
        }
    }
}

pub type RunSender = mpsc::UnboundedSender<RunEvent>;
pub type RunReceiver = mpsc::UnboundedReceiver<RunEvent>;

pub struct SyncExecutor {
    config: ExecutorConfig,
    next_id: RunId,
    run: Option<SyncRun>,
    cancel: Option<oneshot::Sender<()>>,
    events: RunSender,
}

impl SyncExecutor {
    pub fn new(config: ExecutorConfig, events: RunSender) -> Self {
        Self {
            config,
            next_id: 1,
            run: None,
            cancel: None,
            events,
        }
    }

    /// First installed candidate, else the fallback location.
    pub fn resolve_binary(&self) -> PathBuf {
        self.config
            .candidates
            .iter()
            .find(|candidate| candidate.exists())
            .cloned()
            .unwrap_or_else(|| self.config.fallback.clone())
    }

    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(SyncRun::is_running)
    }

    pub fn current(&self) -> Option<&SyncRun> {
        self.run.as_ref()
    }

    pub fn run(
        &mut self,
        request: SyncRequest,
        direction: SyncDirection,
        mode: SyncMode,
    ) -> Result<RunId, SyncError> {
        if self.is_running() {
            tracing::warn!("sync requested while another one is running");
            return Err(SyncError::AlreadyRunning);
        }

        let binary = self.resolve_binary();
        let id = self.next_id;
        self.next_id += 1;

        let mut run = SyncRun::new(id, request, direction);
        write_header(&mut run, direction, mode);
        run.progress = format!("Starting {} sync...", mode);

        tracing::info!(
            run_id = id,
            binary = %binary.display(),
            args = ?run.request.args(),
            "starting rsync"
        );

        let child = Command::new(&binary)
            .args(run.request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        match child {
            Ok(child) => {
                let (cancel_tx, cancel_rx) = oneshot::channel();
                tokio::spawn(supervise(id, child, cancel_rx, self.events.clone()));
                self.cancel = Some(cancel_tx);
                self.run = Some(run);
                Ok(id)
            }
            Err(source) => {
                tracing::error!(binary = %binary.display(), error = %source, "failed to spawn rsync");
                run.push(format!("Failed: {}", source), true);
                run.status = RunStatus::Failed { exit_code: None };
                run.progress = "Sync failed".to_string();
                self.run = Some(run);
                Err(SyncError::Spawn {
                    binary: binary.display().to_string(),
                    source,
                })
            }
        }
    }

    /// Kill the running process. Returns `false` when nothing was running.
    pub fn cancel(&mut self) -> bool {
        let Some(run) = self.run.as_mut().filter(|run| run.is_running()) else {
            return false;
        };

        if let Some(cancel) = self.cancel.take() {
            // The supervisor may have exited already, its Exited event is ignored below
            let _ = cancel.send(());
        }
        run.status = RunStatus::Failed { exit_code: None };
        run.push(CANCELLED_MESSAGE, true);
        run.progress = CANCELLED_MESSAGE.to_string();
        tracing::info!(run_id = run.id, "sync cancelled");
        true
    }

    /// Drop a finished run and its log. Does nothing while running.
    pub fn clear(&mut self) {
        if !self.is_running() {
            self.run = None;
        }
    }

    pub fn handle(&mut self, event: RunEvent) -> Option<SyncCompletion> {
        match event {
            RunEvent::Line {
                run_id,
                text,
                is_error,
            } => {
                let run = self.running_mut(run_id)?;
                if !is_error {
                    run.progress = text.clone();
                }
                run.push(text, is_error);
                None
            }
            RunEvent::Exited { run_id, exit_code } => {
                self.running_mut(run_id)?;
                self.cancel = None;
                let run = self.run.as_mut()?;

                run.push(SEPARATOR, false);
                if exit_code == Some(0) {
                    run.status = RunStatus::Succeeded;
                    run.push("✓ Sync completed successfully", false);
                    run.progress = "Sync completed".to_string();
                } else {
                    run.status = RunStatus::Failed { exit_code };
                    let text = match exit_code {
                        Some(code) => format!("✗ Sync failed (exit: {})", code),
                        None => "✗ Sync failed (terminated by signal)".to_string(),
                    };
                    run.push(text, true);
                    run.progress = "Sync failed".to_string();
                }

                tracing::info!(run_id, status = ?run.status, "rsync finished");
                Some(SyncCompletion {
                    run_id,
                    direction: run.direction,
                    status: run.status.clone(),
                })
            }
        }
    }

    fn running_mut(&mut self, run_id: RunId) -> Option<&mut SyncRun> {
        self.run
            .as_mut()
            .filter(|run| run.id == run_id && run.is_running())
    }
}

/// Wait until the process of `run_id` has been reaped, at most `limit`.
///
/// Used after [`SyncExecutor::cancel`] when the caller is about to exit. Other
/// events are discarded. Returns `false` on timeout or a closed channel.
pub async fn wait_for_exit(events: &mut RunReceiver, run_id: RunId, limit: Duration) -> bool {
    let exited = async {
        while let Some(event) = events.recv().await {
            if matches!(event, RunEvent::Exited { run_id: id, .. } if id == run_id) {
                return true;
            }
        }
        false
    };
    tokio::time::timeout(limit, exited).await.unwrap_or(false)
}

fn write_header(run: &mut SyncRun, direction: SyncDirection, mode: SyncMode) {
    run.push(format!("Starting {} sync", mode), false);
    run.push(format!("Direction: {}", direction), false);

    let sources = run.request.sources().to_vec();
    if run.request.is_whole_directory() {
        run.push("Syncing entire directory", false);
    } else {
        run.push(format!("Syncing {} selected item(s)", sources.len()), false);
        for source in &sources {
            run.push(format!("  → {}", source), false);
        }
    }
    if let [source] = sources.as_slice() {
        run.push(format!("Source: {}", source), false);
    } else {
        run.push(format!("Sources: {} items", sources.len()), false);
        for source in &sources {
            run.push(format!("  • {}", display_name(source)), false);
        }
    }
    run.push(format!("Destination: {}", run.request.destination()), false);
    run.push(SEPARATOR, false);
}

fn display_name(source: &str) -> &str {
    let path = source.split_once(':').map_or(source, |(_, path)| path);
    Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(path)
}

async fn supervise(
    run_id: RunId,
    mut child: Child,
    mut cancel: oneshot::Receiver<()>,
    events: RunSender,
) {
    let readers = [
        child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(run_id, out, false, events.clone()))),
        child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(run_id, err, true, events.clone()))),
    ];

    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut cancel => {
            if let Err(e) = child.start_kill() {
                tracing::warn!(run_id, error = %e, "failed to kill rsync");
            }
            child.wait().await
        }
    };

    // Every line goes out before the exit so the terminal line is last.
    // Grandchildren (ssh) can hold the pipes open after a kill, so the drain is bounded.
    for mut reader in readers.into_iter().flatten() {
        if tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await.is_err() {
            reader.abort();
        }
    }

    let exit_code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            let _ = events.send(RunEvent::Line {
                run_id,
                text: format!("Failed to wait for rsync: {}", e),
                is_error: true,
            });
            None
        }
    };

    if events.send(RunEvent::Exited { run_id, exit_code }).is_err() {
        tracing::debug!(run_id, "run event receiver dropped");
    }
}

async fn forward_lines<R>(run_id: RunId, reader: R, is_error: bool, events: RunSender)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&buf);
                let text = text.trim_end_matches(['\n', '\r']);
                if text.trim().is_empty() {
                    continue;
                }
                let event = RunEvent::Line {
                    run_id,
                    text: text.to_string(),
                    is_error,
                };
                if events.send(event).is_err() {
                    break;
                }
            }
            Err(e) => {
                tracing::debug!(run_id, error = %e, "rsync output stream closed");
                break;
            }
        }
    }
}
