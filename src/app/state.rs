use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

use pairsync::config::AppConfig;
use pairsync::connection::{ConnectionController, PaneSender, PaneUpdate};
use pairsync::local::FsLister;
use pairsync::models::{PaneId, SyncDirection, SyncMode};
use pairsync::pane::Pane;
use pairsync::remote::{RemoteDirectoryService, RemoteProbe};
use pairsync::ssh_service::SshShell;
use pairsync::sync::{plan, ExecutorConfig, PlanInput, RunStatus, SyncExecutor};

use crate::app::types::{App, InputMode};

impl App {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let shell = Arc::new(SshShell::new(&config.ssh));
        let probe = Arc::new(RemoteProbe::new(
            shell.clone(),
            config.rsync.remote_candidates.clone(),
        ));
        let directory = Arc::new(RemoteDirectoryService::new(shell));
        let lister = Arc::new(FsLister);

        let (pane_sender, pane_receiver) = mpsc::unbounded_channel();
        let (run_sender, run_receiver) = mpsc::unbounded_channel();

        let make_pane = |id: PaneId, default: String, events: PaneSender| {
            let controller = ConnectionController::new(id, probe.clone(), directory.clone(), events);
            Pane::new(id, default, controller, lister.clone())
        };
        let left = make_pane(PaneId::Left, config.left_default(), pane_sender.clone());
        let right = make_pane(PaneId::Right, config.right_default(), pane_sender);

        let executor = SyncExecutor::new(ExecutorConfig::from(&config.rsync), run_sender);
        tracing::info!(rsync = %executor.resolve_binary().display(), "local rsync resolved");

        Ok(Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            input: String::new(),
            status_message: None,
            left,
            right,
            active: PaneId::Left,
            pane_receiver,
            direction: SyncDirection::LeftToRight,
            executor,
            run_receiver,
        })
    }

    pub fn pane(&self, id: PaneId) -> &Pane<SshShell> {
        match id {
            PaneId::Left => &self.left,
            PaneId::Right => &self.right,
        }
    }

    pub fn pane_mut(&mut self, id: PaneId) -> &mut Pane<SshShell> {
        match id {
            PaneId::Left => &mut self.left,
            PaneId::Right => &mut self.right,
        }
    }

    pub fn active_pane_mut(&mut self) -> &mut Pane<SshShell> {
        self.pane_mut(self.active)
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    pub fn clear_status_message(&mut self) {
        self.status_message = None;
    }

    pub fn switch_pane(&mut self) {
        self.active = self.active.other();
        tracing::debug!("Switched to {} pane", self.active);
    }

    /// Apply everything background work produced since the last frame.
    pub fn process_events(&mut self) {
        while let Ok((id, event)) = self.pane_receiver.try_recv() {
            let updates = self.pane_mut(id).handle(event);
            for update in updates {
                match update {
                    PaneUpdate::State(state) => self.set_status(format!("{} pane: {}", id, state)),
                    PaneUpdate::ListingFailed { path, reason } => {
                        self.set_status(format!("Failed to list {}: {}", path, reason))
                    }
                    PaneUpdate::Deleted(Ok(())) => self.set_status("Deleted selection"),
                    PaneUpdate::Deleted(Err(reason)) => {
                        self.set_status(format!("Delete failed: {}", reason))
                    }
                    PaneUpdate::Listing { .. } => {}
                }
            }
        }

        while let Ok(event) = self.run_receiver.try_recv() {
            if let Some(completion) = self.executor.handle(event) {
                let destination = completion.direction.destination();
                self.pane_mut(destination).refresh();
                match completion.status {
                    RunStatus::Succeeded => self.set_status("Sync completed successfully"),
                    _ => self.set_status("Sync failed, see log"),
                }
            }
        }
    }

    pub fn connect_active(&mut self, host: &str) {
        let id = self.active;
        match self.pane_mut(id).connect(host) {
            Ok(()) => self.set_status(format!("Connecting to {}...", host.trim())),
            Err(e) => self.set_status(format!("Error: {}", e)),
        }
    }

    pub fn retry_active(&mut self) {
        if let Err(e) = self.active_pane_mut().retry() {
            self.set_status(format!("Error: {}", e));
        }
    }

    pub fn disconnect_active(&mut self) {
        if !self.pane(self.active).has_connection() {
            self.set_status("Pane is not connected");
            return;
        }
        self.active_pane_mut().disconnect();
        self.set_status(format!("{} pane disconnected", self.active));
    }

    pub fn go_to(&mut self, path: &str) {
        let path = path.trim();
        if path.is_empty() {
            return;
        }
        self.active_pane_mut().navigate_to(path);
    }

    /// Start a sync, asking first when the whole directory would be synced.
    pub fn request_sync(&mut self, mode: SyncMode) {
        if self.executor.is_running() {
            self.set_status("Error: a sync is already running");
            return;
        }
        if self.pane(self.direction.source()).selection().is_empty() {
            self.input_mode = InputMode::ConfirmSync(mode);
        } else {
            self.start_sync(mode, false);
        }
    }

    pub fn start_sync(&mut self, mode: SyncMode, confirmed_whole_directory: bool) {
        let source = self.pane(self.direction.source());
        let destination = self.pane(self.direction.destination());
        let remote_tool_path = source
            .remote_tool_path()
            .or_else(|| destination.remote_tool_path());

        let planned = plan(&PlanInput {
            left: self.left.endpoint(),
            right: self.right.endpoint(),
            direction: self.direction,
            mode,
            selection: source.selection(),
            confirmed_whole_directory,
            remote_tool_path,
        });

        let request = match planned {
            Ok(request) => request,
            Err(e) => {
                self.set_status(format!("Error: {}", e));
                return;
            }
        };

        match self.executor.run(request, self.direction, mode) {
            Ok(_) => self.set_status(format!("{} sync started ({})", mode, self.direction)),
            Err(e) => self.set_status(format!("Error: {}", e)),
        }
    }

    pub fn cancel_sync(&mut self) {
        if !self.executor.cancel() {
            self.set_status("No sync is running");
        }
    }

    pub fn clear_log(&mut self) {
        if self.executor.is_running() {
            self.set_status("Cannot clear the log while syncing");
            return;
        }
        self.executor.clear();
    }

    pub fn delete_selection(&mut self) {
        if let Err(e) = self.active_pane_mut().delete_selection() {
            self.set_status(format!("Error: {}", e));
        }
    }

    pub fn shutdown(&mut self) {
        if self.executor.cancel() {
            tracing::info!("Cancelled running sync on exit");
        }
        self.should_quit = true;
    }
}
