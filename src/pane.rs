use anyhow::{anyhow, Result};
use std::path::Path;
use std::sync::Arc;

use crate::connection::{ConnectionController, ConnectionState, PaneEvent, PaneUpdate};
use crate::error::ConnectError;
use crate::local::{delete_local, LocalLister};
use crate::models::{parent_remote_path, DirectoryEntry, Endpoint, PaneId};
use crate::ssh_service::RemoteShell;

/// One browsing context: an endpoint, its listing and the operator's selection
pub struct Pane<S: RemoteShell> {
    pub id: PaneId,
    endpoint: Endpoint,
    default_local: String,
    entries: Vec<DirectoryEntry>,
    selection: Vec<String>,
    cursor: usize,
    loading: bool,
    last_error: Option<String>,
    controller: ConnectionController<S>,
    lister: Arc<dyn LocalLister>,
}

impl<S: RemoteShell> Pane<S> {
    pub fn new(
        id: PaneId,
        default_local: String,
        controller: ConnectionController<S>,
        lister: Arc<dyn LocalLister>,
    ) -> Self {
        let mut pane = Self {
            id,
            endpoint: Endpoint::local(default_local.clone()),
            default_local,
            entries: Vec::new(),
            selection: Vec::new(),
            cursor: 0,
            loading: false,
            last_error: None,
            controller,
            lister,
        };
        pane.refresh();
        pane
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn connection_state(&self) -> &ConnectionState {
        self.controller.state()
    }

    /// Anything other than Disconnected, including a pending or failed attempt
    pub fn has_connection(&self) -> bool {
        *self.controller.state() != ConnectionState::Disconnected
    }

    pub fn remote_host(&self) -> Option<&str> {
        self.controller.host()
    }

    pub fn remote_tool_path(&self) -> Option<&str> {
        self.controller.remote_tool_path()
    }

    pub fn current_entry(&self) -> Option<&DirectoryEntry> {
        self.entries.get(self.cursor)
    }

    pub fn is_selected(&self, entry: &DirectoryEntry) -> bool {
        self.selection.contains(&entry.full_path)
    }

    /// Name shown when confirming a whole-directory sync
    pub fn directory_name(&self) -> String {
        let path = self.endpoint.path.trim_end_matches('/');
        match path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "/".to_string(),
        }
    }

    pub fn navigate_to(&mut self, path: &str) {
        self.last_error = None;
        if self.endpoint.is_remote() {
            if self.controller.list(path) {
                self.loading = true;
            } else {
                self.last_error = Some("Not connected".to_string());
            }
        } else {
            self.endpoint = Endpoint::local(path);
            let entries = self.lister.list(Path::new(path));
            self.set_entries(entries);
        }
    }

    pub fn refresh(&mut self) {
        let path = self.endpoint.path.clone();
        self.navigate_to(&path);
    }

    pub fn go_parent(&mut self) {
        let parent = if self.endpoint.is_remote() {
            parent_remote_path(&self.endpoint.path)
        } else {
            match Path::new(&self.endpoint.path).parent() {
                Some(parent) => parent.display().to_string(),
                None => return,
            }
        };
        self.navigate_to(&parent);
    }

    /// Enter the directory under the cursor.
    pub fn open_current(&mut self) {
        if let Some(entry) = self.current_entry().filter(|e| e.is_directory) {
            let path = entry.full_path.clone();
            self.navigate_to(&path);
        }
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.entries.is_empty() {
            self.cursor = 0;
            return;
        }
        let len = self.entries.len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(len) as usize;
    }

    pub fn toggle_current(&mut self) {
        let Some(path) = self.current_entry().map(|e| e.full_path.clone()) else {
            return;
        };
        if let Some(idx) = self.selection.iter().position(|p| *p == path) {
            self.selection.remove(idx);
        } else {
            self.selection.push(path);
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn connect(&mut self, host: &str) -> Result<(), ConnectError> {
        self.controller.connect(host)?;
        self.last_error = None;
        self.loading = true;
        Ok(())
    }

    pub fn retry(&mut self) -> Result<(), ConnectError> {
        self.controller.retry()?;
        self.last_error = None;
        self.loading = true;
        Ok(())
    }

    /// Drop the remote side and fall back to the default local directory.
    pub fn disconnect(&mut self) {
        self.controller.disconnect();
        self.loading = false;
        let default = self.default_local.clone();
        self.endpoint = Endpoint::local(default.clone());
        self.navigate_to(&default);
    }

    pub fn delete_selection(&mut self) -> Result<()> {
        if self.selection.is_empty() {
            return Err(anyhow!("Nothing selected"));
        }
        let paths = self.selection.clone();
        if self.endpoint.is_remote() {
            if !self.controller.delete(paths) {
                return Err(anyhow!("Not connected"));
            }
            self.loading = true;
        } else {
            let result = delete_local(&paths);
            self.refresh();
            result?;
        }
        Ok(())
    }

    pub fn handle(&mut self, event: PaneEvent) -> Vec<PaneUpdate> {
        let updates = self.controller.handle(event);
        for update in &updates {
            match update {
                PaneUpdate::State(ConnectionState::Failed(reason)) => {
                    self.loading = false;
                    self.last_error = Some(reason.clone());
                }
                PaneUpdate::State(ConnectionState::Connected) => {
                    // Remote from here on, even if the first listing fails
                    if let Some(endpoint) = self
                        .controller
                        .host()
                        .and_then(|host| Endpoint::remote(host, "/"))
                    {
                        self.endpoint = endpoint;
                        self.entries.clear();
                        self.selection.clear();
                        self.cursor = 0;
                    }
                }
                PaneUpdate::State(_) => {}
                PaneUpdate::Listing { path, entries } => {
                    if let Some(endpoint) = self
                        .controller
                        .host()
                        .and_then(|host| Endpoint::remote(host, path.clone()))
                    {
                        self.endpoint = endpoint;
                    }
                    self.set_entries(entries.clone());
                }
                PaneUpdate::ListingFailed { reason, .. } => {
                    self.loading = false;
                    self.last_error = Some(reason.clone());
                }
                PaneUpdate::Deleted(Ok(())) => self.refresh(),
                PaneUpdate::Deleted(Err(reason)) => {
                    self.loading = false;
                    self.last_error = Some(reason.clone());
                }
            }
        }
        updates
    }

    fn set_entries(&mut self, entries: Vec<DirectoryEntry>) {
        self.entries = entries;
        self.selection.clear();
        self.cursor = 0;
        self.loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::PaneReceiver;
    use crate::remote::{RemoteDirectoryService, RemoteProbe};
    use crate::ssh_service::fake::FakeShell;
    use crate::ssh_service::ShellOutput;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Lister with a fixed directory tree, records the paths it was asked for
    struct StaticLister {
        listed: Mutex<Vec<String>>,
    }

    impl LocalLister for StaticLister {
        fn list(&self, path: &Path) -> Vec<DirectoryEntry> {
            let path = path.display().to_string();
            self.listed.lock().unwrap().push(path.clone());
            match path.as_str() {
                "/home/a" => vec![
                    DirectoryEntry::directory("docs", "/home/a/docs"),
                    DirectoryEntry::file("notes.txt", "/home/a/notes.txt", 3),
                ],
                _ => Vec::new(),
            }
        }
    }

    fn pane(shell: FakeShell) -> (Pane<FakeShell>, PaneReceiver) {
        let shell = Arc::new(shell);
        let probe = Arc::new(RemoteProbe::new(shell.clone(), Vec::new()));
        let directory = Arc::new(RemoteDirectoryService::new(shell));
        let (tx, rx) = mpsc::unbounded_channel();
        let controller = ConnectionController::new(PaneId::Right, probe, directory, tx);
        let lister = Arc::new(StaticLister {
            listed: Mutex::new(Vec::new()),
        });
        (
            Pane::new(PaneId::Right, "/home/a".to_string(), controller, lister),
            rx,
        )
    }

    async fn pump_until_idle(pane: &mut Pane<FakeShell>, rx: &mut PaneReceiver) {
        while pane.is_loading() {
            let (_, event) = rx.recv().await.unwrap();
            pane.handle(event);
        }
    }

    #[test]
    fn local_navigation_and_selection() {
        let (mut pane, _rx) = pane(FakeShell::new());
        assert_eq!(pane.entries().len(), 2);

        pane.move_cursor(1);
        pane.toggle_current();
        assert_eq!(pane.selection(), ["/home/a/notes.txt".to_string()]);
        pane.toggle_current();
        assert!(pane.selection().is_empty());

        pane.move_cursor(1);
        assert_eq!(pane.cursor(), 0);
        pane.toggle_current();
        pane.open_current();
        assert_eq!(pane.endpoint(), &Endpoint::local("/home/a/docs"));
        assert!(pane.selection().is_empty());

        pane.go_parent();
        assert_eq!(pane.endpoint().path, "/home/a");
        assert_eq!(pane.directory_name(), "a");
    }

    #[tokio::test]
    async fn remote_session_and_disconnect() {
        let shell = FakeShell::new()
            .on("ls -la", ShellOutput::ok("drwxr-xr-x 2 u g 64 Jan 1 12:00 logs\n"))
            .on("pwd\n", ShellOutput::ok("Remote working directory: /srv/b\n"))
            .on("pwd", ShellOutput::ok("/srv/b\n"));
        let (mut pane, mut rx) = pane(shell);

        pane.connect("host").unwrap();
        pump_until_idle(&mut pane, &mut rx).await;
        assert_eq!(pane.endpoint(), &Endpoint::remote("host", "/srv/b").unwrap());
        assert_eq!(pane.entries()[0].full_path, "/srv/b/logs");

        pane.go_parent();
        pump_until_idle(&mut pane, &mut rx).await;
        assert_eq!(pane.endpoint().path, "/srv");

        pane.disconnect();
        assert_eq!(pane.endpoint(), &Endpoint::local("/home/a"));
        assert_eq!(pane.connection_state(), &ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn failed_first_listing_still_leaves_a_remote_pane() {
        let shell = FakeShell::new()
            .on("ls -la", ShellOutput::failed("subsystem request failed on channel 0"))
            .on("pwd\n", ShellOutput::failed("subsystem request failed on channel 0"))
            .on("pwd", ShellOutput::ok("/home/u\n"));
        let (mut pane, mut rx) = pane(shell);

        pane.connect("host").unwrap();
        pump_until_idle(&mut pane, &mut rx).await;
        assert_eq!(pane.connection_state(), &ConnectionState::Connected);
        assert_eq!(pane.endpoint(), &Endpoint::remote("host", "/").unwrap());
        assert!(pane.entries().is_empty());
        assert!(pane.last_error().is_some());

        // Navigation goes to the host, never to the local disk
        pane.navigate_to("/etc");
        assert!(pane.is_loading());
        pump_until_idle(&mut pane, &mut rx).await;
        assert!(pane.endpoint().is_remote());

        assert!(pane.has_connection());
        pane.disconnect();
        assert!(!pane.has_connection());
        assert_eq!(pane.endpoint(), &Endpoint::local("/home/a"));
        assert_eq!(pane.entries().len(), 2);
        assert!(pane.connect("host").is_ok());
    }

    #[tokio::test]
    async fn disconnect_while_connecting_drops_the_attempt() {
        let shell = FakeShell::new().on("pwd", ShellOutput::ok("/home/u\n"));
        let (mut pane, mut rx) = pane(shell);

        pane.connect("host").unwrap();
        assert_eq!(pane.connection_state(), &ConnectionState::Connecting);
        assert!(pane.has_connection());

        pane.disconnect();
        assert_eq!(pane.connection_state(), &ConnectionState::Disconnected);
        assert!(!pane.is_loading());

        // The late reachability result belongs to the dropped attempt
        let (_, event) = rx.recv().await.unwrap();
        assert!(pane.handle(event).is_empty());
        assert_eq!(pane.connection_state(), &ConnectionState::Disconnected);
        assert_eq!(pane.endpoint(), &Endpoint::local("/home/a"));
        assert!(pane.connect("host").is_ok());
    }

    #[tokio::test]
    async fn disconnect_after_failure_allows_a_fresh_connect() {
        let shell = FakeShell::new().on("pwd", ShellOutput::failed("ssh: connect to host x: Connection refused"));
        let (mut pane, mut rx) = pane(shell);

        pane.connect("host").unwrap();
        pump_until_idle(&mut pane, &mut rx).await;
        assert_eq!(
            pane.connection_state(),
            &ConnectionState::Failed("unreachable".to_string())
        );
        assert!(pane.has_connection());

        pane.disconnect();
        assert_eq!(pane.connection_state(), &ConnectionState::Disconnected);
        assert!(pane.retry().is_err());
        assert!(pane.connect("other").is_ok());
    }

    #[tokio::test]
    async fn failed_connection_keeps_local_endpoint() {
        let shell = FakeShell::new().on("pwd", ShellOutput::failed("Permission denied (publickey)"));
        let (mut pane, mut rx) = pane(shell);

        pane.connect("host").unwrap();
        pump_until_idle(&mut pane, &mut rx).await;
        assert_eq!(
            pane.connection_state(),
            &ConnectionState::Failed("authentication failed".to_string())
        );
        assert_eq!(pane.last_error(), Some("authentication failed"));
        assert!(!pane.endpoint().is_remote());
    }
}
