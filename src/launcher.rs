//! Turning a [`Plan`](crate::parser::Plan) into running child processes.
//!
//! Redirections are opened as owned handles and given to the stage that asked
//! for them; the shell's own standard streams are never replaced, so there is
//! nothing to restore once a command finishes or fails.

use crate::command::{ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::external::{ExternalCommand, exit_code};
use crate::parser::{OutputMode, OutputSink, Stage};
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Stdio};

/// The standard streams of a single stage after redirections were applied.
pub struct StageIo {
    pub stdin: Box<dyn Stdin>,
    pub stdout: Box<dyn Stdout>,
}

impl StageIo {
    /// Open the stage's `<`, `>` and `>>` targets, inheriting the shell's streams otherwise.
    pub fn open(stage: &Stage) -> Result<Self> {
        let stdin: Box<dyn Stdin> = match &stage.input {
            Some(path) => Box::new(open_input(path)?),
            None => Box::new(InheritedStdin),
        };
        let stdout: Box<dyn Stdout> = match &stage.output {
            Some(sink) => Box::new(open_output(sink)?),
            None => Box::new(std::io::stdout()),
        };
        Ok(Self { stdin, stdout })
    }
}

fn open_input(path: &Path) -> Result<File> {
    File::open(path).with_context(|| format!("redirection '<': {}", path.display()))
}

fn open_output(sink: &OutputSink) -> Result<File> {
    let mut options = OpenOptions::new();
    options.create(true);
    let op = match sink.mode {
        OutputMode::Truncate => {
            options.write(true).truncate(true);
            ">"
        }
        OutputMode::Append => {
            options.append(true);
            ">>"
        }
    };
    options
        .open(&sink.path)
        .with_context(|| format!("redirection '{op}': {}", sink.path.display()))
}

/// The shell's own standard input, handed to children as-is.
struct InheritedStdin;

impl Read for InheritedStdin {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::stdin().read(buf)
    }
}

impl Stdin for InheritedStdin {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

/// Spawns external programs and keeps track of the ones left running in the background.
#[derive(Debug, Default)]
pub struct ProcessLauncher {
    background: Vec<Child>,
}

impl ProcessLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one external program.
    ///
    /// In the foreground this blocks until the child exits and returns its
    /// exit code; in the background it returns 0 right after the spawn.
    pub fn run_external(
        &mut self,
        stage: &Stage,
        io: StageIo,
        background: bool,
        env: &Environment,
    ) -> Result<ExitCode> {
        let cmd = ExternalCommand::resolve(env, stage.name(), stage.args())?;
        let mut child = cmd.spawn(io.stdin.stdio(), io.stdout.stdio(), env)?;
        if background {
            log::info!("[{}] {} running in background", child.id(), stage.name());
            self.background.push(child);
            return Ok(0);
        }
        let status = child
            .wait()
            .with_context(|| format!("{}: wait failed", cmd.program().display()))?;
        Ok(exit_code(status))
    }

    /// Run `first | second` and wait for both children.
    ///
    /// All redirection files are opened and both programs resolved before
    /// anything is spawned. An explicit `>` on the first stage or `<` on the
    /// second one takes precedence over the pipe. Returns the second stage's
    /// exit code.
    pub fn run_pipeline(
        &mut self,
        first: &Stage,
        second: &Stage,
        env: &Environment,
    ) -> Result<ExitCode> {
        let upstream_cmd = ExternalCommand::resolve(env, first.name(), first.args())?;
        let downstream_cmd = ExternalCommand::resolve(env, second.name(), second.args())?;

        let upstream_in = match &first.input {
            Some(path) => Stdio::from(open_input(path)?),
            None => Stdio::inherit(),
        };
        let upstream_out = match &first.output {
            Some(sink) => Stdio::from(open_output(sink)?),
            None => Stdio::piped(),
        };
        let downstream_in = second.input.as_deref().map(open_input).transpose()?;
        let downstream_out = match &second.output {
            Some(sink) => Stdio::from(open_output(sink)?),
            None => Stdio::inherit(),
        };

        let mut upstream = upstream_cmd.spawn(upstream_in, upstream_out, env)?;
        let pipe_read = upstream.stdout.take();
        let downstream_in = match (downstream_in, pipe_read) {
            (Some(file), _) => Stdio::from(file),
            (None, Some(pipe)) => Stdio::from(pipe),
            // The first stage writes to a file; the second one sees an empty pipe.
            (None, None) => Stdio::null(),
        };

        let downstream = match downstream_cmd.spawn(downstream_in, downstream_out, env) {
            Ok(child) => child,
            Err(e) => {
                let _ = upstream.wait();
                return Err(e);
            }
        };

        let codes = [upstream, downstream].map(|mut child| {
            let pid = child.id();
            match child.wait() {
                Ok(status) => exit_code(status),
                Err(e) => {
                    log::warn!("waiting for pid {pid} failed: {e}");
                    1
                }
            }
        });
        log::debug!("pipeline finished with codes {codes:?}");
        Ok(codes[1])
    }

    /// Collect background children that have exited, without blocking.
    ///
    /// Returns how many were reaped.
    pub fn reap_background(&mut self) -> usize {
        let before = self.background.len();
        self.background.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                log::info!("[{}] done, exit code {}", child.id(), exit_code(status));
                false
            }
            Ok(None) => true,
            Err(e) => {
                log::warn!("[{}] could not be polled: {e}", child.id());
                false
            }
        });
        before - self.background.len()
    }

    /// Number of background children not reaped yet.
    pub fn background_jobs(&self) -> usize {
        self.background.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::tests::lock_current_dir;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    fn stage(argv: &[&str]) -> Stage {
        Stage {
            argv: argv.iter().map(|a| a.to_string()).collect(),
            ..Stage::default()
        }
    }

    fn temp_file(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rawsh_launcher_{}_{}", tag, std::process::id()));
        let _ = fs::remove_file(&path);
        path
    }

    fn truncate(path: &Path) -> Option<OutputSink> {
        Some(OutputSink {
            path: path.to_path_buf(),
            mode: OutputMode::Truncate,
        })
    }

    #[test]
    fn test_foreground_output_redirection() {
        let _lock = lock_current_dir();
        let out = temp_file("fg");
        let mut stage = stage(&["sh", "-c", "echo hello; exit 3"]);
        stage.output = truncate(&out);

        let env = Environment::new(4);
        let mut launcher = ProcessLauncher::new();
        let io = StageIo::open(&stage).unwrap();
        let code = launcher.run_external(&stage, io, false, &env).unwrap();

        assert_eq!(code, 3);
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_append_and_input_redirection() {
        let _lock = lock_current_dir();
        let input = temp_file("in");
        let out = temp_file("append");
        fs::write(&input, "b\na\n").unwrap();
        fs::write(&out, "first\n").unwrap();

        let mut sort = stage(&["sort"]);
        sort.input = Some(input.clone());
        sort.output = Some(OutputSink {
            path: out.clone(),
            mode: OutputMode::Append,
        });

        let env = Environment::new(4);
        let io = StageIo::open(&sort).unwrap();
        ProcessLauncher::new()
            .run_external(&sort, io, false, &env)
            .unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "first\na\nb\n");
        let _ = fs::remove_file(input);
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_missing_input_file_is_reported() {
        let mut cat = stage(&["cat"]);
        cat.input = Some(PathBuf::from("/definitely/not/here.txt"));
        let err = StageIo::open(&cat).err().expect("open must fail");
        assert!(err.to_string().starts_with("redirection '<'"));
    }

    #[test]
    fn test_background_does_not_block() {
        let _lock = lock_current_dir();
        let env = Environment::new(4);
        let mut launcher = ProcessLauncher::new();
        let sleep = stage(&["sleep", "5"]);

        let started = Instant::now();
        let io = StageIo::open(&sleep).unwrap();
        let code = launcher.run_external(&sleep, io, true, &env).unwrap();
        assert_eq!(code, 0);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(launcher.background_jobs(), 1);
        assert_eq!(launcher.reap_background(), 0);

        for child in &mut launcher.background {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    #[test]
    fn test_finished_background_jobs_are_reaped() {
        let _lock = lock_current_dir();
        let env = Environment::new(4);
        let mut launcher = ProcessLauncher::new();
        let quick = stage(&["true"]);
        let io = StageIo::open(&quick).unwrap();
        launcher.run_external(&quick, io, true, &env).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while launcher.background_jobs() > 0 && Instant::now() < deadline {
            launcher.reap_background();
            std::thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(launcher.background_jobs(), 0);
    }

    #[test]
    fn test_pipeline_with_final_redirection() {
        let _lock = lock_current_dir();
        let out = temp_file("pipe");
        let first = stage(&["sh", "-c", "printf 'foo 1\\nbar\\nfoo 2\\n'"]);
        let mut second = stage(&["grep", "foo"]);
        second.output = truncate(&out);

        let env = Environment::new(4);
        let code = ProcessLauncher::new()
            .run_pipeline(&first, &second, &env)
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "foo 1\nfoo 2\n");
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_pipeline_waits_for_both_children() {
        let _lock = lock_current_dir();
        let marker = temp_file("marker");
        let script = format!("sleep 1; touch {}", marker.display());
        let first = stage(&["sh", "-c", &script]);
        let second = stage(&["true"]);

        let env = Environment::new(4);
        ProcessLauncher::new()
            .run_pipeline(&first, &second, &env)
            .unwrap();

        assert!(marker.exists());
        let _ = fs::remove_file(marker);
    }

    #[test]
    fn test_redirected_first_stage_leaves_pipe_empty() {
        let _lock = lock_current_dir();
        let side = temp_file("side");
        let out = temp_file("count");
        let mut first = stage(&["echo", "hello"]);
        first.output = truncate(&side);
        let mut second = stage(&["wc", "-c"]);
        second.output = truncate(&out);

        let env = Environment::new(4);
        ProcessLauncher::new()
            .run_pipeline(&first, &second, &env)
            .unwrap();

        assert_eq!(fs::read_to_string(&side).unwrap(), "hello\n");
        assert_eq!(fs::read_to_string(&out).unwrap().trim(), "0");
        let _ = fs::remove_file(side);
        let _ = fs::remove_file(out);
    }

    #[test]
    fn test_pipeline_with_unknown_program_spawns_nothing() {
        let env = Environment::new(4);
        let first = stage(&["echo", "hi"]);
        let second = stage(&["surely-not-a-real-program"]);
        let err = ProcessLauncher::new()
            .run_pipeline(&first, &second, &env)
            .unwrap_err();
        assert!(err.to_string().contains("command not found"));
    }
}
