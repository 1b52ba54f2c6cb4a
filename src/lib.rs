//! An interactive command shell with a raw-mode line editor.
//!
//! Lines are typed character by character with the terminal in non-canonical
//! mode: Up/Down recall earlier commands from a bounded history, and Ctrl-C
//! switches to a suggestion mode that completes a history entry from a unique
//! prefix. A finished line is split into tokens, planned into one or two
//! stages (`|`, `<`, `>`, `>>`, trailing `&`) and run either as a builtin
//! (`cd`, `exit`, `history`) or as external processes.
//!
//! The main entry point is [`Interpreter`]. The building blocks are public so
//! they can be driven from tests or other front ends: [`editor::LineEditor`]
//! and [`suggest::SuggestionEngine`] read from any [`keys::KeyReader`], and
//! write to any `Write`.

mod builtin;
pub mod command;
pub mod config;
pub mod editor;
pub mod env;
mod external;
pub mod history;
mod interpreter;
pub mod keys;
mod launcher;
pub mod lexer;
pub mod parser;
pub mod suggest;
pub mod terminal;

pub use config::ShellConfig;
pub use interpreter::Interpreter;
