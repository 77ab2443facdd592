//! Command line surface: the TUI by default, plus headless subcommands.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use pairsync::config::AppConfig;
use pairsync::models::{join_remote_path, Endpoint, SyncDirection, SyncMode};
use pairsync::remote::{RemoteDirectoryService, RemoteProbe};
use pairsync::ssh_service::SshShell;
use pairsync::sync::{plan, wait_for_exit, ExecutorConfig, PlanInput, RunStatus, SyncExecutor};

#[derive(Parser, Debug)]
#[command(name = "pairsync", version, about = "Two-pane directory sync over rsync and ssh")]
pub struct Cli {
    /// Use this config file instead of the default location
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one sync without the TUI
    Sync(SyncArgs),
    /// List a remote directory
    Ls(LsArgs),
    /// Check reachability, home directory and rsync on a host
    Probe { host: String },
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Left endpoint, `path` or `host:path`
    pub left: String,
    /// Right endpoint, `path` or `host:path`
    pub right: String,
    #[arg(long, value_enum, default_value_t = DirectionArg::L2r)]
    pub direction: DirectionArg,
    #[arg(long, value_enum, default_value_t = ModeArg::Slurp)]
    pub mode: ModeArg,
    /// Items on the source side to sync instead of the whole directory
    #[arg(long = "select", value_name = "PATH")]
    pub select: Vec<String>,
    /// Sync the whole source directory without a selection
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    pub host: String,
    /// Directory to list, the login directory when omitted
    pub path: Option<String>,
    /// Print entries as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DirectionArg {
    L2r,
    R2l,
}

impl From<DirectionArg> for SyncDirection {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::L2r => SyncDirection::LeftToRight,
            DirectionArg::R2l => SyncDirection::RightToLeft,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Force,
    Slurp,
}

impl From<ModeArg> for SyncMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Force => SyncMode::Force,
            ModeArg::Slurp => SyncMode::Slurp,
        }
    }
}

fn probe(config: &AppConfig) -> Arc<RemoteProbe<SshShell>> {
    Arc::new(RemoteProbe::new(
        Arc::new(SshShell::new(&config.ssh)),
        config.rsync.remote_candidates.clone(),
    ))
}

/// Selection paths relative to the source directory are made absolute.
fn resolve_selection(source: &Endpoint, select: &[String]) -> Vec<String> {
    select
        .iter()
        .map(|path| {
            if path.starts_with('/') {
                path.clone()
            } else {
                join_remote_path(&source.path, path)
            }
        })
        .collect()
}

/// How long a cancelled headless sync waits for rsync to go away
const CANCEL_WAIT: Duration = Duration::from_secs(5);

/// Runs the sync to completion, streaming the log to stdout. Returns rsync's exit code.
pub async fn run_sync(config: &AppConfig, args: SyncArgs) -> Result<i32> {
    let left = Endpoint::parse(&args.left);
    let right = Endpoint::parse(&args.right);
    let direction = SyncDirection::from(args.direction);
    let mode = SyncMode::from(args.mode);

    let source = match direction {
        SyncDirection::LeftToRight => &left,
        SyncDirection::RightToLeft => &right,
    };
    let selection = resolve_selection(source, &args.select);
    if selection.is_empty() && !args.yes {
        bail!(
            "Refusing to {} sync the whole directory {} without --yes",
            mode,
            source
        );
    }

    let remote_tool_path = match left.host().or_else(|| right.host()) {
        Some(host) => {
            let probe = probe(config);
            let host = host.to_string();
            tokio::task::spawn_blocking(move || probe.detect_sync_tool_path(&host))
                .await
                .context("Remote rsync detection panicked")?
        }
        None => None,
    };

    let request = plan(&PlanInput {
        left: &left,
        right: &right,
        direction,
        mode,
        selection: &selection,
        confirmed_whole_directory: args.yes,
        remote_tool_path: remote_tool_path.as_deref(),
    })?;

    let (sender, mut receiver) = mpsc::unbounded_channel();
    let mut executor = SyncExecutor::new(ExecutorConfig::from(&config.rsync), sender);
    let mut printed = 0;

    let started = executor.run(request, direction, mode);
    print_new_lines(&executor, &mut printed)?;
    started?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = receiver.recv() => {
                let Some(event) = event else {
                    bail!("Sync event channel closed unexpectedly");
                };
                let completion = executor.handle(event);
                print_new_lines(&executor, &mut printed)?;
                if let Some(completion) = completion {
                    return Ok(match completion.status {
                        RunStatus::Succeeded => 0,
                        RunStatus::Failed { exit_code: Some(code) } => code,
                        _ => 1,
                    });
                }
            }
            _ = &mut ctrl_c => {
                executor.cancel();
                print_new_lines(&executor, &mut printed)?;
                // process::exit follows, so rsync must be reaped first
                if let Some(run_id) = executor.current().map(|run| run.id) {
                    if !wait_for_exit(&mut receiver, run_id, CANCEL_WAIT).await {
                        tracing::warn!(run_id, "rsync still running after cancel");
                    }
                }
                return Ok(130);
            }
        }
    }
}

fn print_new_lines(executor: &SyncExecutor, printed: &mut usize) -> Result<()> {
    let Some(run) = executor.current() else {
        return Ok(());
    };
    let mut stdout = std::io::stdout().lock();
    for line in run.log.iter().skip(*printed) {
        writeln!(stdout, "[{}] {}", line.formatted_time(), line.text)?;
    }
    *printed = run.log.len();
    stdout.flush()?;
    Ok(())
}

pub async fn run_ls(config: &AppConfig, args: LsArgs) -> Result<i32> {
    let probe = probe(config);
    let directory = Arc::new(RemoteDirectoryService::new(Arc::new(SshShell::new(
        &config.ssh,
    ))));

    let host = args.host.clone();
    let entries = tokio::task::spawn_blocking(move || {
        let path = match args.path {
            Some(path) => path,
            None => probe
                .discover_home_directory(&host)
                .unwrap_or_else(|| "/".to_string()),
        };
        directory.list(&host, &path)
    })
    .await
    .context("Remote listing panicked")??;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(0);
    }

    for entry in &entries {
        let kind = if entry.is_directory { 'd' } else { '-' };
        let modified = entry
            .modified_at
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{} {:>12} {:>16} {}", kind, entry.size_bytes, modified, entry.name);
    }
    Ok(0)
}

pub async fn run_probe(config: &AppConfig, host: &str) -> Result<i32> {
    let probe = probe(config);
    let host = host.to_string();

    let (reachable, home, tool) = tokio::task::spawn_blocking(move || {
        let reachable = probe.test_reachable(&host);
        if reachable.is_err() {
            return (reachable, None, None);
        }
        let home = probe.discover_home_directory(&host);
        let tool = probe.detect_sync_tool_path(&host);
        (reachable, home, tool)
    })
    .await
    .context("Probe panicked")?;

    match reachable {
        Ok(()) => println!("reachable: yes"),
        Err(reason) => {
            println!("reachable: no ({})", reason);
            return Ok(1);
        }
    }
    println!("home:      {}", home.as_deref().unwrap_or("unknown"));
    println!("rsync:     {}", tool.as_deref().unwrap_or("not found, using remote default"));
    Ok(0)
}
