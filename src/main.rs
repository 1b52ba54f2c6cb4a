use argh::FromArgs;
use env_logger::Env;
use log::LevelFilter;
use rawsh::{Interpreter, ShellConfig};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(FromArgs)]
/// Interactive shell with history recall and prefix suggestions.
/// With a file argument, runs the file's commands line by line instead.
struct Args {
    #[argh(positional)]
    /// file of commands to run in batch mode.
    batch_file: Option<PathBuf>,

    #[argh(option, default = "rawsh::history::DEFAULT_CAPACITY")]
    /// number of commands kept in history.
    history_size: usize,

    #[argh(option, default = "rawsh::editor::DEFAULT_MAX_LINE_LEN")]
    /// line length at which input is submitted automatically.
    max_line_length: usize,

    #[argh(switch)]
    /// do not print the welcome banner.
    no_banner: bool,

    #[argh(switch, short = 'v')]
    /// log debug output to stderr.
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()))
        .try_init();
}

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    init_logging(args.verbose);

    let config = ShellConfig {
        history_capacity: args.history_size,
        max_line_len: args.max_line_length,
        show_banner: !args.no_banner,
    };
    let mut shell = Interpreter::from_config(config);

    let result = match &args.batch_file {
        Some(path) => match File::open(path) {
            Ok(file) => shell.run_batch(BufReader::new(file)),
            Err(e) => {
                eprintln!("rawsh: error opening batch file {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => shell.repl(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("rawsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}
