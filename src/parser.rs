use std::path::PathBuf;
use thiserror::Error;

/// How an output redirection opens its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// `>`: create the file, or truncate it if it exists.
    Truncate,
    /// `>>`: create the file, or append to it if it exists.
    Append,
}

/// Destination of a `>` or `>>` redirection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSink {
    pub path: PathBuf,
    pub mode: OutputMode,
}

/// One program invocation of a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage {
    /// The program name followed by its arguments. Redirection operators and
    /// their file names never appear here.
    pub argv: Vec<String>,
    /// File to read standard input from (`<`).
    pub input: Option<PathBuf>,
    /// File to write standard output to (`>` or `>>`).
    pub output: Option<OutputSink>,
}

impl Stage {
    /// The program name, or `""` for a stage without one.
    pub fn name(&self) -> &str {
        self.argv.first().map_or("", String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.argv.get(1..).unwrap_or_default()
    }
}

/// What a command line asks the launcher to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// A single stage, optionally detached from the shell with a trailing `&`.
    Single { stage: Stage, background: bool },
    /// Two stages, the first one's output feeding the second one's input.
    ///
    /// Pipelines always run in the foreground.
    Pipeline { first: Stage, second: Stage },
}

/// Errors that can occur while turning tokens into a [`Plan`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The line contained nothing but separators.
    #[error("no tokens")]
    NoTokens,
    /// A stage ended up without a program name (e.g. `| wc` or `< in.txt`).
    #[error("missing command")]
    EmptyCommand,
    /// A redirection operator was not followed by a file name.
    #[error("syntax error: expected a file name after `{0}`")]
    MissingRedirectTarget(String),
    /// More than one `|` on the line.
    #[error("only a single pipe is supported")]
    UnsupportedPipeline,
}

const PIPE: &str = "|";
const BACKGROUND: &str = "&";

/// Build an execution [`Plan`] from the tokens of one line.
///
/// Tokens before the `|` form the first stage, tokens after it the second.
/// Redirections bind to the stage whose tokens contain them, so an output
/// redirection written anywhere after the pipe always targets the pipeline's
/// final output. A trailing `&` requests background execution and is
/// ignored for pipelines.
pub fn construct_plan(mut tokens: Vec<String>) -> Result<Plan, PlanError> {
    if tokens.is_empty() {
        return Err(PlanError::NoTokens);
    }
    let background = tokens.last().is_some_and(|t| t == BACKGROUND);
    if background {
        tokens.pop();
    }

    let mut parts = tokens.split(|t| t == PIPE);
    let first = build_stage(parts.next().unwrap_or_default())?;
    let plan = match parts.next() {
        None => Plan::Single {
            stage: first,
            background,
        },
        Some(rest) => {
            if parts.next().is_some() {
                return Err(PlanError::UnsupportedPipeline);
            }
            if background {
                log::debug!("ignoring `&` on a pipeline");
            }
            Plan::Pipeline {
                first,
                second: build_stage(rest)?,
            }
        }
    };
    log::debug!("plan: {plan:?}");
    Ok(plan)
}

fn build_stage(tokens: &[String]) -> Result<Stage, PlanError> {
    let mut stage = Stage::default();
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        match token.as_str() {
            "<" => stage.input = Some(redirect_target(token, iter.next())?),
            ">" => {
                stage.output = Some(OutputSink {
                    path: redirect_target(token, iter.next())?,
                    mode: OutputMode::Truncate,
                })
            }
            ">>" => {
                stage.output = Some(OutputSink {
                    path: redirect_target(token, iter.next())?,
                    mode: OutputMode::Append,
                })
            }
            _ => stage.argv.push(token.clone()),
        }
    }
    if stage.argv.is_empty() {
        return Err(PlanError::EmptyCommand);
    }
    Ok(stage)
}

fn redirect_target(op: &str, target: Option<&String>) -> Result<PathBuf, PlanError> {
    match target.map(String::as_str) {
        Some("<" | ">" | ">>") | None => Err(PlanError::MissingRedirectTarget(op.to_string())),
        Some(path) => Ok(PathBuf::from(path)),
    }
}
