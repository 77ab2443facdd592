use anyhow::{anyhow, Context, Result};
use std::sync::Arc;

use super::listing::parse_listing;
use crate::models::DirectoryEntry;
use crate::ssh_service::{quote, sftp_quote, RemoteShell};

/// Remote browsing: listings through an sftp batch session, deletes through ssh
pub struct RemoteDirectoryService<S: RemoteShell> {
    shell: Arc<S>,
}

impl<S: RemoteShell> RemoteDirectoryService<S> {
    pub fn new(shell: Arc<S>) -> Self {
        Self { shell }
    }

    pub fn list(&self, host: &str, path: &str) -> Result<Vec<DirectoryEntry>> {
        let script = format!("cd {}\nls -la\n", sftp_quote(path));
        let output = self
            .shell
            .batch(host, &script)
            .with_context(|| format!("Failed to list {}:{}", host, path))?;

        if !output.success {
            return Err(anyhow!("Remote ls failed: {}", output.stderr.trim()));
        }

        let entries = parse_listing(path, &output.stdout);
        tracing::debug!(host = %host, path = %path, count = entries.len(), "remote listing");
        Ok(entries)
    }

    pub fn delete(&self, host: &str, paths: &[String]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        if paths.iter().any(|p| p.trim_end_matches('/').is_empty()) {
            return Err(anyhow!("Refusing to delete the remote root"));
        }

        let quoted: Vec<String> = paths.iter().map(|p| quote(p)).collect();
        let command = format!("rm -rf -- {}", quoted.join(" "));
        tracing::info!(host = %host, count = paths.len(), "deleting remote entries");

        let output = self
            .shell
            .exec(host, &command)
            .with_context(|| format!("Failed to delete on {}", host))?;

        if !output.success {
            return Err(anyhow!("Remote delete failed: {}", output.stderr.trim()));
        }
        Ok(())
    }
}
