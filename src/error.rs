use thiserror::Error;

use crate::connection::ConnectionState;

/// Why a remote host could not be used
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("unreachable")]
    Unreachable,

    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    /// Map ssh's stderr onto a reason an operator can act on.
    pub fn from_stderr(stderr: &str) -> Self {
        let lower = stderr.to_lowercase();
        if lower.contains("permission denied") || lower.contains("host key verification failed") {
            ProbeError::AuthenticationFailed
        } else if lower.contains("could not resolve")
            || lower.contains("connection refused")
            || lower.contains("timed out")
            || lower.contains("no route to host")
            || lower.contains("network is unreachable")
        {
            ProbeError::Unreachable
        } else if stderr.trim().is_empty() {
            ProbeError::Other("remote command failed without output".to_string())
        } else {
            ProbeError::Other(stderr.trim().to_string())
        }
    }
}

/// A sync could not be planned from the current pane state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("No {0} selected")]
    MissingEndpoint(&'static str),

    #[error("No files are selected, syncing the entire directory needs confirmation")]
    UnconfirmedWholeDirectory,
}

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("A sync is already running")]
    AlreadyRunning,

    #[error("Failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("cannot connect while {0}")]
    InvalidState(ConnectionState),

    #[error("no previous host to retry")]
    NothingToRetry,

    #[error("host must not be empty")]
    EmptyHost,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_ssh_stderr() {
        assert_eq!(
            ProbeError::from_stderr("user@box: Permission denied (publickey)."),
            ProbeError::AuthenticationFailed
        );
        assert_eq!(
            ProbeError::from_stderr("ssh: Could not resolve hostname nope: Name or service not known"),
            ProbeError::Unreachable
        );
        assert_eq!(
            ProbeError::from_stderr("ssh: connect to host 10.0.0.9 port 22: Connection timed out"),
            ProbeError::Unreachable
        );
        assert_eq!(
            ProbeError::from_stderr("  something odd  \n"),
            ProbeError::Other("something odd".to_string())
        );
    }

    #[test]
    fn probe_error_reasons() {
        assert_eq!(ProbeError::AuthenticationFailed.to_string(), "authentication failed");
        assert_eq!(ProbeError::Unreachable.to_string(), "unreachable");
    }
}
