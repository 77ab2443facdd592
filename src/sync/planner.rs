//! Turns pane state into an rsync invocation.
//!
//! Trailing slashes carry meaning for rsync: `dir/` syncs the contents of
//! `dir`, `dir` syncs the directory itself. Whole-directory syncs end both
//! sides with exactly one `/`; selected items never get one.

use crate::error::PlanError;
use crate::models::{Endpoint, SyncDirection, SyncMode};

/// Flags that make rsync remove destination files missing from the source
pub const DELETION_FLAGS: [&str; 2] = ["--delete", "--force-delete"];

/// A fully resolved rsync invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    sources: Vec<String>,
    destination: String,
    flags: Vec<String>,
    whole_directory: bool,
}

impl SyncRequest {
    /// A request for explicitly selected sources.
    pub fn new(flags: Vec<String>, sources: Vec<String>, destination: String) -> Self {
        Self {
            sources,
            destination,
            flags,
            whole_directory: false,
        }
    }

    /// A request syncing the contents of one source directory.
    pub fn whole_directory(flags: Vec<String>, source: String, destination: String) -> Self {
        Self {
            sources: vec![source],
            destination,
            flags,
            whole_directory: true,
        }
    }

    pub fn is_whole_directory(&self) -> bool {
        self.whole_directory
    }

    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn flags(&self) -> &[String] {
        &self.flags
    }

    /// Positional arguments: flags, then sources, then the destination.
    pub fn args(&self) -> Vec<String> {
        let mut args = self.flags.clone();
        args.extend(self.sources.iter().cloned());
        args.push(self.destination.clone());
        args
    }
}

#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    pub left: &'a Endpoint,
    pub right: &'a Endpoint,
    pub direction: SyncDirection,
    pub mode: SyncMode,
    /// Absolute paths on the source side, in selection order
    pub selection: &'a [String],
    /// The operator agreed to sync a whole directory when nothing is selected
    pub confirmed_whole_directory: bool,
    /// rsync path found on the remote host, if any
    pub remote_tool_path: Option<&'a str>,
}

pub fn mode_flags(mode: SyncMode) -> Vec<String> {
    let flags: &[&str] = match mode {
        SyncMode::Force => &["-haz", "--info=name,del", "--delete", "--force-delete"],
        SyncMode::Slurp => &["-haz", "--info=name"],
    };
    flags.iter().map(|f| f.to_string()).collect()
}

pub fn plan(input: &PlanInput<'_>) -> Result<SyncRequest, PlanError> {
    let (source, destination) = match input.direction {
        SyncDirection::LeftToRight => (input.left, input.right),
        SyncDirection::RightToLeft => (input.right, input.left),
    };

    if source.path.trim().is_empty() {
        return Err(PlanError::MissingEndpoint("source"));
    }
    if destination.path.trim().is_empty() {
        return Err(PlanError::MissingEndpoint("destination"));
    }

    if input.selection.is_empty() && !input.confirmed_whole_directory {
        return Err(PlanError::UnconfirmedWholeDirectory);
    }

    let destination_arg = destination.render_path(&with_trailing_slash(&destination.path));

    let mut flags = mode_flags(input.mode);
    if source.is_remote() || destination.is_remote() {
        if let Some(path) = input.remote_tool_path {
            flags.push(format!("--rsync-path={}", path));
        }
    }

    if input.selection.is_empty() {
        let source_arg = source.render_path(&with_trailing_slash(&source.path));
        return Ok(SyncRequest::whole_directory(flags, source_arg, destination_arg));
    }

    let sources = input
        .selection
        .iter()
        .map(|path| source.render_path(without_trailing_slash(path)))
        .collect();
    Ok(SyncRequest::new(flags, sources, destination_arg))
}

fn with_trailing_slash(path: &str) -> String {
    format!("{}/", path.trim_end_matches('/'))
}

fn without_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_a() -> Endpoint {
        Endpoint::local("/home/a")
    }

    fn remote_b() -> Endpoint {
        Endpoint::remote("host", "/srv/b").unwrap()
    }

    fn input<'a>(
        left: &'a Endpoint,
        right: &'a Endpoint,
        mode: SyncMode,
        selection: &'a [String],
    ) -> PlanInput<'a> {
        PlanInput {
            left,
            right,
            direction: SyncDirection::LeftToRight,
            mode,
            selection,
            confirmed_whole_directory: true,
            remote_tool_path: None,
        }
    }

    #[test]
    fn slurp_whole_directory_to_remote() {
        let (left, right) = (local_a(), remote_b());
        let request = plan(&input(&left, &right, SyncMode::Slurp, &[])).unwrap();

        assert_eq!(request.sources(), ["/home/a/".to_string()]);
        assert_eq!(request.destination(), "host:/srv/b/");
        assert_eq!(request.flags(), ["-haz".to_string(), "--info=name".to_string()]);
        assert!(request.is_whole_directory());
    }

    #[test]
    fn force_selection_keeps_source_without_slash() {
        let (left, right) = (local_a(), remote_b());
        let selection = vec!["/home/a/report.pdf".to_string()];
        let request = plan(&input(&left, &right, SyncMode::Force, &selection)).unwrap();

        assert_eq!(request.sources(), ["/home/a/report.pdf".to_string()]);
        assert_eq!(request.destination(), "host:/srv/b/");
        assert!(!request.is_whole_directory());
        for flag in DELETION_FLAGS {
            assert!(request.flags().iter().any(|f| f == flag));
        }
    }

    #[test]
    fn deletion_flags_only_in_force_mode() {
        let force = mode_flags(SyncMode::Force);
        let slurp = mode_flags(SyncMode::Slurp);
        for flag in DELETION_FLAGS {
            assert!(force.iter().any(|f| f == flag));
            assert!(!slurp.iter().any(|f| f == flag));
        }
        assert!(!slurp.iter().any(|f| f.contains("del")));
    }

    #[test]
    fn planning_is_deterministic() {
        let (left, right) = (local_a(), remote_b());
        let selection = vec!["/home/a/x".to_string(), "/home/a/y/".to_string()];
        let first = plan(&input(&left, &right, SyncMode::Force, &selection)).unwrap();
        let second = plan(&input(&left, &right, SyncMode::Force, &selection)).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.args(), second.args());
    }

    #[test]
    fn exactly_one_trailing_slash() {
        let left = Endpoint::local("/home/a///");
        let right = Endpoint::local("/");
        let request = plan(&input(&left, &right, SyncMode::Slurp, &[])).unwrap();
        assert_eq!(request.sources(), ["/home/a/".to_string()]);
        assert_eq!(request.destination(), "/");
    }

    #[test]
    fn selected_directories_sync_as_a_unit() {
        let (left, right) = (local_a(), Endpoint::local("/backup"));
        let selection = vec!["/home/a/photos/".to_string()];
        let request = plan(&input(&left, &right, SyncMode::Slurp, &selection)).unwrap();
        assert_eq!(request.sources(), ["/home/a/photos".to_string()]);
        assert_eq!(request.destination(), "/backup/");
    }

    #[test]
    fn right_to_left_from_remote_prefixes_selection() {
        let (left, right) = (local_a(), remote_b());
        let selection = vec!["/srv/b/logs".to_string()];
        let mut plan_input = input(&left, &right, SyncMode::Slurp, &selection);
        plan_input.direction = SyncDirection::RightToLeft;

        let request = plan(&plan_input).unwrap();
        assert_eq!(request.sources(), ["host:/srv/b/logs".to_string()]);
        assert_eq!(request.destination(), "/home/a/");
    }

    #[test]
    fn remote_tool_path_only_with_a_remote_side() {
        let (left, right) = (local_a(), remote_b());
        let mut plan_input = input(&left, &right, SyncMode::Slurp, &[]);
        plan_input.remote_tool_path = Some("/opt/homebrew/bin/rsync");
        let request = plan(&plan_input).unwrap();
        assert_eq!(
            request.flags().last().unwrap(),
            "--rsync-path=/opt/homebrew/bin/rsync"
        );

        let local_b = Endpoint::local("/srv/b");
        let mut plan_input = input(&left, &local_b, SyncMode::Slurp, &[]);
        plan_input.remote_tool_path = Some("/opt/homebrew/bin/rsync");
        let request = plan(&plan_input).unwrap();
        assert!(!request.flags().iter().any(|f| f.starts_with("--rsync-path")));
    }

    #[test]
    fn whole_directory_needs_confirmation() {
        let (left, right) = (local_a(), remote_b());
        let mut plan_input = input(&left, &right, SyncMode::Force, &[]);
        plan_input.confirmed_whole_directory = false;
        assert_eq!(plan(&plan_input), Err(PlanError::UnconfirmedWholeDirectory));
    }

    #[test]
    fn missing_endpoint_is_a_configuration_error() {
        let left = local_a();
        let right = Endpoint::local("");
        assert_eq!(
            plan(&input(&left, &right, SyncMode::Slurp, &[])),
            Err(PlanError::MissingEndpoint("destination"))
        );
    }

    #[test]
    fn args_order() {
        let request = SyncRequest::new(
            vec!["-haz".to_string()],
            vec!["/a/".to_string()],
            "/b/".to_string(),
        );
        assert_eq!(request.args(), vec!["-haz", "/a/", "/b/"]);
    }
}
