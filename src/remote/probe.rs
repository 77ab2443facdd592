use regex::Regex;
use std::sync::Arc;

use crate::error::ProbeError;
use crate::ssh_service::{quote, RemoteShell};

/// Short diagnostic round trips against a remote host
pub struct RemoteProbe<S: RemoteShell> {
    shell: Arc<S>,
    tool_candidates: Vec<String>,
    accepted_banner: Regex,
}

impl<S: RemoteShell> RemoteProbe<S> {
    pub fn new(shell: Arc<S>, tool_candidates: Vec<String>) -> Self {
        Self {
            shell,
            tool_candidates,
            // openrsync and rsync 2.x lack --info
            accepted_banner: Regex::new(r"(?m)^rsync\s+version\s+v?3\.").expect("valid banner regex"),
        }
    }

    /// Minimal round trip: `pwd` must exit zero and print an absolute path.
    pub fn test_reachable(&self, host: &str) -> Result<(), ProbeError> {
        tracing::info!(host = %host, "testing reachability");

        let output = self
            .shell
            .exec(host, "pwd")
            .map_err(|e| ProbeError::Other(e.to_string()))?;

        if !output.success {
            let reason = ProbeError::from_stderr(&output.stderr);
            tracing::warn!(host = %host, reason = %reason, "host not reachable");
            return Err(reason);
        }

        if output.stdout.lines().any(|line| line.trim().starts_with('/')) {
            Ok(())
        } else {
            Err(ProbeError::Other(format!(
                "unexpected response: {}",
                output.stdout.trim()
            )))
        }
    }

    pub fn is_reachable(&self, host: &str) -> bool {
        self.test_reachable(host).is_ok()
    }

    /// Working directory of a fresh sftp session, usually the login home.
    pub fn discover_home_directory(&self, host: &str) -> Option<String> {
        let output = match self.shell.batch(host, "pwd\n") {
            Ok(output) if output.success => output,
            Ok(output) => {
                tracing::warn!(host = %host, stderr = %output.stderr.trim(), "home discovery failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(host = %host, error = %e, "home discovery failed");
                return None;
            }
        };

        let home = extract_working_directory(&output.stdout);
        tracing::debug!(host = %host, home = ?home, "discovered home directory");
        home
    }

    /// First candidate whose `--version` banner is an rsync 3.x.
    pub fn detect_sync_tool_path(&self, host: &str) -> Option<String> {
        for candidate in &self.tool_candidates {
            let command = format!("{} --version", quote(candidate));
            let output = match self.shell.exec(host, &command) {
                Ok(output) => output,
                Err(e) => {
                    tracing::debug!(host = %host, candidate = %candidate, error = %e, "probe failed");
                    continue;
                }
            };

            if output.success && self.accepted_banner.is_match(&output.stdout) {
                tracing::info!(host = %host, path = %candidate, "found remote rsync");
                return Some(candidate.clone());
            }
            tracing::debug!(host = %host, candidate = %candidate, "remote rsync candidate rejected");
        }

        tracing::debug!(host = %host, "no compatible remote rsync, using default resolution");
        None
    }
}

fn extract_working_directory(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        let line = line.trim();
        if let Some(path) = line.strip_prefix("Remote working directory:") {
            let path = path.trim();
            if path.starts_with('/') {
                return Some(path.to_string());
            }
            return None;
        }
        if line.starts_with('/') {
            return Some(line.to_string());
        }
    }
    None
}
