//! Per-pane connection lifecycle.
//!
//! A [`ConnectionController`] owns the state of one pane's remote endpoint.
//! Probes and listings run on the blocking pool and come back as
//! [`PaneEvent`]s; the control loop feeds them to [`ConnectionController::handle`],
//! which is the only place state changes after a request was issued.

use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{ConnectError, ProbeError};
use crate::models::{DirectoryEntry, PaneId};
use crate::remote::{RemoteDirectoryService, RemoteProbe};
use crate::ssh_service::RemoteShell;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed(String),
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of background work, tagged with the generation that requested it
#[derive(Debug)]
pub enum PaneEvent {
    Reachability {
        generation: u64,
        host: String,
        result: Result<(), ProbeError>,
    },
    ToolPath {
        generation: u64,
        path: Option<String>,
    },
    Home {
        generation: u64,
        home: Option<String>,
    },
    Listing {
        generation: u64,
        path: String,
        result: Result<Vec<DirectoryEntry>, String>,
    },
    Deleted {
        generation: u64,
        result: Result<(), String>,
    },
}

/// What the front-end needs to redraw after an event was applied
#[derive(Debug, Clone, PartialEq)]
pub enum PaneUpdate {
    State(ConnectionState),
    Listing {
        path: String,
        entries: Vec<DirectoryEntry>,
    },
    ListingFailed {
        path: String,
        reason: String,
    },
    Deleted(Result<(), String>),
}

pub type PaneSender = mpsc::UnboundedSender<(PaneId, PaneEvent)>;
pub type PaneReceiver = mpsc::UnboundedReceiver<(PaneId, PaneEvent)>;

pub struct ConnectionController<S: RemoteShell> {
    pane: PaneId,
    state: ConnectionState,
    host: Option<String>,
    remote_tool_path: Option<String>,
    // Bumped on every connect/disconnect so late results are dropped
    generation: u64,
    probe: Arc<RemoteProbe<S>>,
    directory: Arc<RemoteDirectoryService<S>>,
    events: PaneSender,
}

impl<S: RemoteShell> ConnectionController<S> {
    pub fn new(
        pane: PaneId,
        probe: Arc<RemoteProbe<S>>,
        directory: Arc<RemoteDirectoryService<S>>,
        events: PaneSender,
    ) -> Self {
        Self {
            pane,
            state: ConnectionState::Disconnected,
            host: None,
            remote_tool_path: None,
            generation: 0,
            probe,
            directory,
            events,
        }
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn remote_tool_path(&self) -> Option<&str> {
        self.remote_tool_path.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn connect(&mut self, host: &str) -> Result<(), ConnectError> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Failed(_) => {}
            _ => return Err(ConnectError::InvalidState(self.state.clone())),
        }
        let host = host.trim();
        if host.is_empty() {
            return Err(ConnectError::EmptyHost);
        }

        tracing::info!(pane = %self.pane, host = %host, "connecting");
        self.generation += 1;
        self.state = ConnectionState::Connecting;
        self.host = Some(host.to_string());
        self.remote_tool_path = None;

        let probe = self.probe.clone();
        let generation = self.generation;
        let host = host.to_string();
        self.spawn(move || PaneEvent::Reachability {
            generation,
            result: probe.test_reachable(&host),
            host,
        });
        Ok(())
    }

    pub fn retry(&mut self) -> Result<(), ConnectError> {
        if !matches!(self.state, ConnectionState::Failed(_)) {
            return Err(ConnectError::InvalidState(self.state.clone()));
        }
        let host = self.host.clone().ok_or(ConnectError::NothingToRetry)?;
        self.connect(&host)
    }

    pub fn disconnect(&mut self) {
        tracing::info!(pane = %self.pane, host = ?self.host, "disconnecting");
        self.generation += 1;
        self.state = ConnectionState::Disconnected;
        self.remote_tool_path = None;
    }

    /// Request a listing of `path` on the connected host.
    pub fn list(&self, path: &str) -> bool {
        let Some(host) = self.connected_host() else {
            return false;
        };
        let directory = self.directory.clone();
        let generation = self.generation;
        let path = path.to_string();
        self.spawn(move || PaneEvent::Listing {
            generation,
            result: directory.list(&host, &path).map_err(|e| e.to_string()),
            path,
        });
        true
    }

    pub fn delete(&self, paths: Vec<String>) -> bool {
        let Some(host) = self.connected_host() else {
            return false;
        };
        let directory = self.directory.clone();
        let generation = self.generation;
        self.spawn(move || PaneEvent::Deleted {
            generation,
            result: directory.delete(&host, &paths).map_err(|e| e.to_string()),
        });
        true
    }

    /// Apply a background result on the control thread.
    pub fn handle(&mut self, event: PaneEvent) -> Vec<PaneUpdate> {
        let generation = match &event {
            PaneEvent::Reachability { generation, .. }
            | PaneEvent::ToolPath { generation, .. }
            | PaneEvent::Home { generation, .. }
            | PaneEvent::Listing { generation, .. }
            | PaneEvent::Deleted { generation, .. } => *generation,
        };
        if generation != self.generation {
            tracing::debug!(pane = %self.pane, "dropping stale pane event");
            return Vec::new();
        }

        match event {
            PaneEvent::Reachability { host, result, .. } => {
                if self.state != ConnectionState::Connecting {
                    return Vec::new();
                }
                match result {
                    Ok(()) => {
                        tracing::info!(pane = %self.pane, host = %host, "connected");
                        self.state = ConnectionState::Connected;
                        self.start_post_connect(host);
                    }
                    Err(reason) => {
                        tracing::warn!(pane = %self.pane, host = %host, reason = %reason, "connection failed");
                        self.state = ConnectionState::Failed(reason.to_string());
                    }
                }
                vec![PaneUpdate::State(self.state.clone())]
            }
            PaneEvent::ToolPath { path, .. } => {
                self.remote_tool_path = path;
                Vec::new()
            }
            PaneEvent::Home { home, .. } => {
                let path = home.unwrap_or_else(|| "/".to_string());
                self.list(&path);
                Vec::new()
            }
            PaneEvent::Listing { path, result, .. } => match result {
                Ok(entries) => vec![PaneUpdate::Listing { path, entries }],
                Err(reason) => {
                    tracing::warn!(pane = %self.pane, path = %path, reason = %reason, "remote listing failed");
                    vec![PaneUpdate::ListingFailed { path, reason }]
                }
            },
            PaneEvent::Deleted { result, .. } => vec![PaneUpdate::Deleted(result)],
        }
    }

    fn start_post_connect(&self, host: String) {
        let generation = self.generation;

        let probe = self.probe.clone();
        let tool_host = host.clone();
        self.spawn(move || PaneEvent::ToolPath {
            generation,
            path: probe.detect_sync_tool_path(&tool_host),
        });

        let probe = self.probe.clone();
        self.spawn(move || PaneEvent::Home {
            generation,
            home: probe.discover_home_directory(&host),
        });
    }

    fn connected_host(&self) -> Option<String> {
        if self.is_connected() {
            self.host.clone()
        } else {
            None
        }
    }

    fn spawn<F>(&self, work: F)
    where
        F: FnOnce() -> PaneEvent + Send + 'static,
    {
        let events = self.events.clone();
        let pane = self.pane;
        tokio::task::spawn_blocking(move || {
            let event = work();
            if events.send((pane, event)).is_err() {
                tracing::debug!(pane = %pane, "pane event receiver dropped");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ssh_service::fake::FakeShell;
    use crate::ssh_service::ShellOutput;

    fn controller(shell: FakeShell) -> (ConnectionController<FakeShell>, PaneReceiver) {
        let shell = Arc::new(shell);
        let probe = Arc::new(RemoteProbe::new(
            shell.clone(),
            vec!["/usr/bin/rsync".to_string()],
        ));
        let directory = Arc::new(RemoteDirectoryService::new(shell));
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionController::new(PaneId::Right, probe, directory, tx), rx)
    }

    fn healthy_shell() -> FakeShell {
        FakeShell::new()
            .on("ls -la", ShellOutput::ok("drwxr-xr-x 2 u g 64 Jan 1 12:00 docs\n"))
            .on("pwd\n", ShellOutput::ok("Remote working directory: /home/u\n"))
            .on("pwd", ShellOutput::ok("/home/u\n"))
            .on("--version", ShellOutput::ok("rsync  version 3.2.7  protocol version 31\n"))
    }

    /// Pump events until a listing update shows up.
    async fn pump_until_listing(
        controller: &mut ConnectionController<FakeShell>,
        rx: &mut PaneReceiver,
    ) -> Vec<PaneUpdate> {
        let mut seen = Vec::new();
        while let Some((_, event)) = rx.recv().await {
            let updates = controller.handle(event);
            let done = updates
                .iter()
                .any(|u| matches!(u, PaneUpdate::Listing { .. } | PaneUpdate::ListingFailed { .. }));
            seen.extend(updates);
            if done {
                break;
            }
        }
        seen
    }

    #[tokio::test]
    async fn connect_lists_home_directory() {
        let (mut controller, mut rx) = controller(healthy_shell());

        controller.connect("box").unwrap();
        assert_eq!(controller.state(), &ConnectionState::Connecting);

        let updates = pump_until_listing(&mut controller, &mut rx).await;
        assert_eq!(updates[0], PaneUpdate::State(ConnectionState::Connected));
        match updates.last().unwrap() {
            PaneUpdate::Listing { path, entries } => {
                assert_eq!(path, "/home/u");
                assert_eq!(entries[0].full_path, "/home/u/docs");
            }
            other => panic!("unexpected update {:?}", other),
        }
        assert!(controller.is_connected());
    }

    #[tokio::test]
    async fn failed_home_discovery_falls_back_to_root() {
        let shell = FakeShell::new()
            .on("ls -la", ShellOutput::ok(""))
            .on("pwd\n", ShellOutput::failed("subsystem request failed"))
            .on("pwd", ShellOutput::ok("/home/u\n"));
        let (mut controller, mut rx) = controller(shell);

        controller.connect("box").unwrap();
        let updates = pump_until_listing(&mut controller, &mut rx).await;
        assert!(matches!(
            updates.last(),
            Some(PaneUpdate::Listing { path, .. }) if path == "/"
        ));
        // Tool detection failed too, the connection stays up
        assert!(controller.is_connected());
    }

    #[tokio::test]
    async fn unreachable_host_fails_and_can_retry() {
        let shell = FakeShell::new()
            .on("pwd", ShellOutput::failed("ssh: Could not resolve hostname nope"))
            .on("pwd", ShellOutput::ok("/root\n"));
        let (mut controller, mut rx) = controller(shell);

        controller.connect("nope").unwrap();
        let (_, event) = rx.recv().await.unwrap();
        let updates = controller.handle(event);
        assert_eq!(
            updates,
            vec![PaneUpdate::State(ConnectionState::Failed("unreachable".to_string()))]
        );

        controller.retry().unwrap();
        assert_eq!(controller.state(), &ConnectionState::Connecting);
        assert_eq!(controller.host(), Some("nope"));
    }

    #[tokio::test]
    async fn connect_rejected_while_connecting() {
        let (mut controller, _rx) = controller(healthy_shell());
        controller.connect("box").unwrap();
        assert_eq!(
            controller.connect("other"),
            Err(ConnectError::InvalidState(ConnectionState::Connecting))
        );
        assert!(controller.retry().is_err());
    }

    #[tokio::test]
    async fn disconnect_drops_pending_results() {
        let (mut controller, mut rx) = controller(healthy_shell());
        controller.connect("box").unwrap();
        controller.disconnect();

        let (_, event) = rx.recv().await.unwrap();
        assert!(controller.handle(event).is_empty());
        assert_eq!(controller.state(), &ConnectionState::Disconnected);
        assert_eq!(controller.remote_tool_path(), None);
    }

    #[tokio::test]
    async fn tool_path_is_cached_until_disconnect() {
        let (mut controller, mut rx) = controller(healthy_shell());
        controller.connect("box").unwrap();

        // Reachability, tool path and home arrive before the listing
        while controller.remote_tool_path().is_none() {
            let (_, event) = rx.recv().await.unwrap();
            controller.handle(event);
        }
        assert_eq!(controller.remote_tool_path(), Some("/usr/bin/rsync"));

        controller.disconnect();
        assert_eq!(controller.remote_tool_path(), None);
    }

    #[tokio::test]
    async fn empty_host_is_rejected() {
        let (mut controller, _rx) = controller(healthy_shell());
        assert_eq!(controller.connect("  "), Err(ConnectError::EmptyHost));
        assert_eq!(controller.state(), &ConnectionState::Disconnected);
    }
}
