use crate::command::ExitCode;
use crate::env::Environment;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};

/// A program to run in a child process.
#[derive(Debug)]
pub struct ExternalCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    /// Resolve `name` against the environment's `PATH`.
    ///
    /// Fails with "command not found" when no matching file exists.
    pub fn resolve(env: &Environment, name: &str, args: &[String]) -> Result<Self> {
        let search_paths = env.get_var("PATH").unwrap_or_default();
        let program = find_command_path(OsStr::new(&search_paths), Path::new(name))
            .ok_or_else(|| anyhow::anyhow!("{name}: command not found"))?
            .into_owned();
        Ok(Self {
            program,
            args: args.iter().map(OsString::from).collect(),
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Start the program with the given standard streams, without waiting for it.
    pub fn spawn(&self, stdin: Stdio, stdout: Stdio, env: &Environment) -> Result<Child> {
        let child = std::process::Command::new(&self.program)
            .args(&self.args)
            .stdin(stdin)
            .stdout(stdout)
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn()
            .with_context(|| format!("{}: could not execute command", self.program.display()))?;
        log::debug!("spawned {} as pid {}", self.program.display(), child.id());
        Ok(child)
    }
}

/// Exit code of a finished child; signals map to `128 + signo` like in POSIX shells.
pub fn exit_code(exit_status: ExitStatus) -> ExitCode {
    match exit_status.code() {
        Some(code) => code,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// - Absolute path: returned if it exists.
/// - `./foo`, or a relative path with several components (`bin/sh`): returned if it exists.
/// - A single component: the first existing match in `search_paths` (PATH).
/// - Empty path: `None`.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    if path.starts_with("./") && path.exists() {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(single), None) => find_in_path(search_paths, single.as_os_str()).map(Cow::Owned),
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|candidate| candidate.is_file())
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
