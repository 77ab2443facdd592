use pairsync::connection::PaneReceiver;
use pairsync::models::{PaneId, SyncDirection, SyncMode};
use pairsync::pane::Pane;
use pairsync::ssh_service::SshShell;
use pairsync::sync::{RunReceiver, SyncExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    /// Typing a host for the active pane
    Connect,
    /// Typing a directory for the active pane
    GoTo,
    /// Nothing is selected, waiting for y/n before syncing the whole directory
    ConfirmSync(SyncMode),
    ConfirmDelete,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub input: String,

    pub status_message: Option<(String, std::time::Instant)>,

    // Panes
    pub left: Pane<SshShell>,
    pub right: Pane<SshShell>,
    pub active: PaneId,
    pub pane_receiver: PaneReceiver,

    // Sync
    pub direction: SyncDirection,
    pub executor: SyncExecutor,
    pub run_receiver: RunReceiver,
}
