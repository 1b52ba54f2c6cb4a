use crate::command::{CommandFactory, ExitCode};
use crate::config::ShellConfig;
use crate::editor::{LineEditor, LineOutcome};
use crate::env::Environment;
use crate::keys::{InterruptFlag, KeyReader};
use crate::launcher::{ProcessLauncher, StageIo};
use crate::lexer;
use crate::parser::{self, Plan, Stage};
use crate::suggest::{SuggestionEngine, SuggestionOutcome};
use crate::terminal::RawTerminalGuard;
use anyhow::{Context, Result};
use std::io::{self, BufRead, IsTerminal, Write};

/// Factory allows creating instances of builtin commands by name.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// The shell: reads lines, plans them and runs builtins or external programs.
///
/// Interactive and batch mode share everything after a line has been obtained.
///
/// Example
/// ```
/// use rawsh::Interpreter;
/// let mut sh = Interpreter::default();
/// assert_eq!(sh.execute_line("true"), 0);
/// assert_eq!(sh.execute_line("exit"), 0);
/// assert!(sh.should_exit());
/// ```
pub struct Interpreter {
    env: Environment,
    builtins: Vec<Box<dyn CommandFactory>>,
    launcher: ProcessLauncher,
    config: ShellConfig,
    last_status: ExitCode,
}

impl Interpreter {
    /// Create a shell with a custom set of builtin factories.
    pub fn new(config: ShellConfig, builtins: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(config.history_capacity),
            builtins,
            launcher: ProcessLauncher::new(),
            config,
            last_status: 0,
        }
    }

    /// Create a shell with the standard builtins: `cd`, `exit` and `history`.
    pub fn from_config(config: ShellConfig) -> Self {
        use crate::builtin::{Cd, Exit, History};
        Self::new(
            config,
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<History>::default()),
            ],
        )
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// True once `exit` has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Exit code of the last executed line.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// Tokenize, plan and run one line.
    ///
    /// Failures are reported on stderr and turned into exit code 1; they never
    /// end the shell. A line without tokens is reported as such.
    pub fn execute_line(&mut self, line: &str) -> ExitCode {
        let code = match self.try_execute_line(line) {
            Ok(code) => code,
            Err(e) => {
                eprintln!("rawsh: {e:#}");
                1
            }
        };
        self.last_status = code;
        code
    }

    fn try_execute_line(&mut self, line: &str) -> Result<ExitCode> {
        let tokens = lexer::split_into_tokens(line);
        let plan = parser::construct_plan(tokens)?;
        io::stdout().flush()?;
        match plan {
            Plan::Single { stage, background } => self.run_single(&stage, background),
            Plan::Pipeline { first, second } => {
                self.launcher.run_pipeline(&first, &second, &self.env)
            }
        }
    }

    fn run_single(&mut self, stage: &Stage, background: bool) -> Result<ExitCode> {
        let io = StageIo::open(stage)?;
        let args: Vec<&str> = stage.args().iter().map(String::as_str).collect();
        for factory in &self.builtins {
            if let Some(cmd) = factory.try_create(&self.env, stage.name(), &args) {
                if background {
                    log::debug!("builtin {} always runs in the foreground", stage.name());
                }
                return cmd.execute(io.stdin, io.stdout, &mut self.env);
            }
        }
        self.launcher.run_external(stage, io, background, &self.env)
    }

    /// Run every line of `reader` without line editing or prompts.
    ///
    /// Each line is cut at its first CR or LF and blank lines are skipped.
    /// Stops early when `exit` runs.
    pub fn run_batch(&mut self, mut reader: impl BufRead) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader
                .read_until(b'\n', &mut buf)
                .context("reading batch file")?
                == 0
            {
                break;
            }
            let text = String::from_utf8_lossy(&buf);
            let line = text.split(['\r', '\n']).next().unwrap_or_default();
            if line.trim().is_empty() {
                continue;
            }
            self.execute_line(line);
            self.launcher.reap_background();
            if self.env.should_exit {
                break;
            }
        }
        Ok(())
    }

    /// The interactive loop: prompt, edit a line in raw mode, run it.
    ///
    /// Ctrl-C at the prompt switches to suggestion mode; end of input or `exit` ends the loop.
    pub fn repl(&mut self) -> Result<()> {
        let interrupt = InterruptFlag::install().context("installing SIGINT handler")?;
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        let is_terminal = stdin.is_terminal();
        if !is_terminal {
            log::debug!("stdin is not a terminal, raw mode disabled");
        }
        if self.config.show_banner {
            print_banner(&mut stdout)?;
        }
        let mut editor = LineEditor::new(self.config.max_line_len);

        while !self.env.should_exit {
            self.launcher.reap_background();
            interrupt.clear();
            write!(stdout, "{}$ ", self.env.current_dir.display())?;
            stdout.flush()?;

            let line = {
                let _raw = if is_terminal { enter_raw_mode(&stdin) } else { None };
                let mut keys = KeyReader::new(stdin.lock(), interrupt.clone());
                match editor.read_line(&mut keys, &mut stdout, &mut self.env.history)? {
                    LineOutcome::Line(line) => line,
                    LineOutcome::Empty => continue,
                    LineOutcome::Eof => break,
                    LineOutcome::Interrupted => {
                        write!(stdout, "suggestion mode (Ctrl-C to cancel): ")?;
                        stdout.flush()?;
                        let mut engine = SuggestionEngine::new(&self.env.history);
                        match engine.run(&mut keys, &mut stdout, &mut self.env.history)? {
                            SuggestionOutcome::Accepted(command) => command,
                            SuggestionOutcome::Cancelled => continue,
                            SuggestionOutcome::Eof => break,
                        }
                    }
                }
            };
            self.execute_line(&line);
        }
        Ok(())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::from_config(ShellConfig::default())
    }
}

fn enter_raw_mode(stdin: &io::Stdin) -> Option<RawTerminalGuard> {
    match RawTerminalGuard::enter(stdin, false) {
        Ok(guard) => Some(guard),
        Err(e) => {
            log::warn!("could not switch terminal to raw mode: {e}");
            None
        }
    }
}

fn print_banner(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "\n------------------------------------------")?;
    writeln!(out, "\n\t    Welcome to rawsh")?;
    writeln!(out, "\n   Up/Down: history   Ctrl-C: suggestions")?;
    writeln!(out, "\n------------------------------------------")
}
