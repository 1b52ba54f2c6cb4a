use crate::editor::DEFAULT_MAX_LINE_LEN;
use crate::history::DEFAULT_CAPACITY;

/// Tunables of a shell session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    /// Number of commands kept in history before the oldest is evicted.
    pub history_capacity: usize,
    /// Line length at which the editor submits the line by itself.
    pub max_line_len: usize,
    /// Print the welcome banner when the interactive loop starts.
    pub show_banner: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            history_capacity: DEFAULT_CAPACITY,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            show_banner: true,
        }
    }
}
