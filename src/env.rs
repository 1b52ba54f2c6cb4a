use crate::history::HistoryStore;
use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, shell-level state shared by the builtins and the interpreter loop.
///
/// - `vars`: snapshot of the process environment, used for `PATH` and `HOME` lookups.
/// - `current_dir`: the working directory shown in the prompt and given to children.
/// - `history`: the command log used by the editor, suggestion mode and `history`.
/// - `should_exit`: set by `exit`; the loop checks it after every command.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub history: HistoryStore,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state, with an empty history of `history_capacity` entries.
    pub fn new(history_capacity: usize) -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            history: HistoryStore::new(history_capacity),
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// The user's home directory, as given by `HOME`.
    pub fn home_dir(&self) -> Option<PathBuf> {
        self.get_var("HOME")
            .filter(|home| !home.is_empty())
            .map(PathBuf::from)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(crate::history::DEFAULT_CAPACITY)
    }
}
