use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Which side of the window a pane lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaneId {
    Left,
    Right,
}

impl PaneId {
    pub fn other(self) -> Self {
        match self {
            PaneId::Left => PaneId::Right,
            PaneId::Right => PaneId::Left,
        }
    }
}

impl fmt::Display for PaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaneId::Left => write!(f, "left"),
            PaneId::Right => write!(f, "right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointKind {
    Local,
    Remote { host: String },
}

/// One side of a transfer: a local directory or a directory on a remote host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub kind: EndpointKind,
    pub path: String,
}

impl Endpoint {
    pub fn local(path: impl Into<String>) -> Self {
        Self {
            kind: EndpointKind::Local,
            path: path.into(),
        }
    }

    /// Returns `None` when `host` is empty, a remote endpoint always names its host.
    pub fn remote(host: impl Into<String>, path: impl Into<String>) -> Option<Self> {
        let host = host.into();
        if host.is_empty() {
            return None;
        }
        Some(Self {
            kind: EndpointKind::Remote { host },
            path: path.into(),
        })
    }

    /// Parses `host:path` as remote and anything else as a local path.
    ///
    /// A leading `/`, `.` or `~` always means local, so `./a:b` stays local.
    pub fn parse(spec: &str) -> Self {
        if !spec.starts_with(['/', '.', '~']) {
            if let Some((host, path)) = spec.split_once(':') {
                if !host.is_empty() && !host.contains('/') {
                    let path = if path.is_empty() { "/" } else { path };
                    return Self {
                        kind: EndpointKind::Remote {
                            host: host.to_string(),
                        },
                        path: path.to_string(),
                    };
                }
            }
        }
        Self::local(spec)
    }

    pub fn host(&self) -> Option<&str> {
        match &self.kind {
            EndpointKind::Local => None,
            EndpointKind::Remote { host } => Some(host),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.kind, EndpointKind::Remote { .. })
    }

    /// Prefixes `path` with `host:` for remote endpoints.
    pub fn render_path(&self, path: &str) -> String {
        match &self.kind {
            EndpointKind::Local => path.to_string(),
            EndpointKind::Remote { host } => format!("{}:{}", host, path),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_path(&self.path))
    }
}

/// A file or directory shown in a pane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub full_path: String,
    pub is_directory: bool,
    pub size_bytes: i64,
    pub modified_at: Option<NaiveDateTime>,
}

impl DirectoryEntry {
    pub fn directory(name: impl Into<String>, full_path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            is_directory: true,
            size_bytes: 0,
            modified_at: None,
        }
    }

    pub fn file(name: impl Into<String>, full_path: impl Into<String>, size_bytes: i64) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            is_directory: false,
            size_bytes,
            modified_at: None,
        }
    }
}

/// Directories first, then case-insensitive by name.
pub fn compare_entries(a: &DirectoryEntry, b: &DirectoryEntry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}

pub fn sort_entries(entries: &mut [DirectoryEntry]) {
    entries.sort_by(compare_entries);
}

/// Join a directory path and an entry name with exactly one `/` between them.
pub fn join_remote_path(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name)
}

/// Parent of a `/`-separated path, `/` stays `/`.
pub fn parent_remote_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => trimmed[..idx].to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncDirection {
    LeftToRight,
    RightToLeft,
}

impl SyncDirection {
    pub fn toggled(self) -> Self {
        match self {
            SyncDirection::LeftToRight => SyncDirection::RightToLeft,
            SyncDirection::RightToLeft => SyncDirection::LeftToRight,
        }
    }

    pub fn source(self) -> PaneId {
        match self {
            SyncDirection::LeftToRight => PaneId::Left,
            SyncDirection::RightToLeft => PaneId::Right,
        }
    }

    pub fn destination(self) -> PaneId {
        self.source().other()
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::LeftToRight => write!(f, "LEFT → RIGHT"),
            SyncDirection::RightToLeft => write!(f, "RIGHT → LEFT"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyncMode {
    /// Mirror the source, extra destination files are deleted
    Force,
    /// Copy new and changed files, the destination keeps its extras
    Slurp,
}

impl SyncMode {
    pub fn description(self) -> &'static str {
        match self {
            SyncMode::Force => "Mirror source → destination (deletes extra files)",
            SyncMode::Slurp => "Copy new/changed files (preserves destination)",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncMode::Force => write!(f, "Force"),
            SyncMode::Slurp => write!(f, "Slurp"),
        }
    }
}
