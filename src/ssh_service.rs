use crate::config::SshConfig;
use anyhow::{Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// Captured result of one remote round trip
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ShellOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Blocking transport to a remote host.
///
/// Callers run these off the control loop (`spawn_blocking`), the timeout is
/// whatever the transport enforces.
pub trait RemoteShell: Send + Sync + 'static {
    /// Run a single command string through the remote shell.
    fn exec(&self, host: &str, command: &str) -> Result<ShellOutput>;

    /// Feed a line-oriented script to a file-transfer session.
    fn batch(&self, host: &str, script: &str) -> Result<ShellOutput>;
}

/// `ssh`/`sftp` binaries in batch mode, key-based auth only
#[derive(Debug, Clone)]
pub struct SshShell {
    connect_timeout_secs: u64,
    extra_options: Vec<String>,
}

impl SshShell {
    pub fn new(config: &SshConfig) -> Self {
        Self {
            connect_timeout_secs: config.connect_timeout_secs,
            extra_options: config.extra_options.clone(),
        }
    }

    fn options(&self) -> Vec<String> {
        let mut options = vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout_secs),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
        ];
        for option in &self.extra_options {
            options.push("-o".to_string());
            options.push(option.clone());
        }
        options
    }
}

impl RemoteShell for SshShell {
    fn exec(&self, host: &str, command: &str) -> Result<ShellOutput> {
        tracing::debug!(host = %host, command = %command, "ssh exec");

        let output = Command::new("ssh")
            .args(self.options())
            .arg("-T")
            .arg("--")
            .arg(host)
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to execute ssh for {}", host))?;

        Ok(ShellOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn batch(&self, host: &str, script: &str) -> Result<ShellOutput> {
        tracing::debug!(host = %host, script = %script.trim_end(), "sftp batch");

        let mut command = Command::new("sftp");
        command.args(self.options()).arg("-b").arg("-").arg(host);
        feed_script(command, script).with_context(|| format!("sftp batch on {}", host))
    }
}

/// Run `command` with `script` on stdin and capture both streams.
///
/// The child is always reaped. A failed write (the child exited before reading)
/// is not an error; the child's own exit status and stderr are reported instead.
fn feed_script(mut command: Command, script: &str) -> Result<ShellOutput> {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to spawn batch session")?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(script.as_bytes()) {
            tracing::debug!(error = %e, "batch session closed stdin early");
        }
    }

    let output = child
        .wait_with_output()
        .context("Failed to wait for batch session")?;

    Ok(ShellOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Single-quote `value` for a POSIX shell.
pub fn quote(value: &str) -> String {
    shell_words::quote(value).into_owned()
}

/// Double-quote a path for an sftp batch line.
pub fn sftp_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
pub mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted shell: replies are matched by substring of the command/script,
    /// the first matching rule wins. Every call is recorded.
    #[derive(Default)]
    pub struct FakeShell {
        rules: Mutex<Vec<(String, VecDeque<ShellOutput>)>>,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeShell {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(self, needle: &str, reply: ShellOutput) -> Self {
            {
                let mut rules = self.rules.lock().unwrap();
                if let Some((_, replies)) = rules.iter_mut().find(|(n, _)| n == needle) {
                    replies.push_back(reply);
                } else {
                    rules.push((needle.to_string(), VecDeque::from(vec![reply])));
                }
            }
            self
        }

        fn reply(&self, host: &str, text: &str) -> Result<ShellOutput> {
            self.calls.lock().unwrap().push(format!("{}: {}", host, text));
            let mut rules = self.rules.lock().unwrap();
            for (needle, replies) in rules.iter_mut() {
                if text.contains(needle.as_str()) {
                    // Repeat the last reply once the queue is down to one
                    let reply = if replies.len() > 1 {
                        replies.pop_front()
                    } else {
                        replies.front().cloned()
                    };
                    if let Some(reply) = reply {
                        return Ok(reply);
                    }
                }
            }
            Ok(ShellOutput::failed("no scripted reply"))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl RemoteShell for FakeShell {
        fn exec(&self, host: &str, command: &str) -> Result<ShellOutput> {
            self.reply(host, command)
        }

        fn batch(&self, host: &str, script: &str) -> Result<ShellOutput> {
            self.reply(host, script)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssh_options_include_batch_mode_and_timeout() {
        let shell = SshShell::new(&SshConfig {
            connect_timeout_secs: 4,
            extra_options: vec!["StrictHostKeyChecking=accept-new".to_string()],
        });
        let options = shell.options();
        assert!(options.contains(&"BatchMode=yes".to_string()));
        assert!(options.contains(&"ConnectTimeout=4".to_string()));
        assert_eq!(options.last().unwrap(), "StrictHostKeyChecking=accept-new");
    }

    #[test]
    fn early_exit_keeps_the_session_stderr() {
        // Closes stdin at once, so writing the large script fails with a broken pipe
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "exec 0<&-; echo 'subsystem request failed' >&2; exit 3"]);
        let script = "ls -la\n".repeat(200_000);

        let output = feed_script(command, &script).unwrap();
        assert!(!output.success);
        assert!(output.stderr.contains("subsystem request failed"));
    }

    #[test]
    fn script_reaches_stdin() {
        let mut command = Command::new("/bin/sh");
        command.args(["-c", "cat"]);
        let output = feed_script(command, "cd \"/srv\"\nls -la\n").unwrap();
        assert!(output.success);
        assert_eq!(output.stdout, "cd \"/srv\"\nls -la\n");
    }

    #[test]
    fn quoting() {
        assert_eq!(quote("/srv/my file"), "'/srv/my file'");
        assert_eq!(sftp_quote("/srv/a \"b\""), "\"/srv/a \\\"b\\\"\"");
    }
}
