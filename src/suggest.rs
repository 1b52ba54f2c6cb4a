//! Suggestion mode: pick a history entry by typing a unique prefix.

use crate::history::HistoryStore;
use crate::keys::{KeyEvent, KeyReader};
use std::io::{self, Read, Write};

const ERASE: &[u8] = b"\x08 \x08";

/// How a suggestion session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionOutcome {
    /// The auto-filled command was confirmed with Enter and appended to history.
    Accepted(String),
    /// Ctrl-C left suggestion mode without choosing anything.
    Cancelled,
    Eof,
}

/// Narrows the distinct history entries down by a typed prefix.
///
/// As soon as exactly one candidate starts with the prefix, the typed text on
/// screen is replaced by that candidate and further characters are ignored
/// until Enter confirms it. There is no backspace in this mode.
#[derive(Debug)]
pub struct SuggestionEngine {
    candidates: Vec<String>,
    prefix: String,
    filled: Option<String>,
}

impl SuggestionEngine {
    pub fn new(history: &HistoryStore) -> Self {
        Self {
            candidates: history.unique_entries(),
            prefix: String::new(),
            filled: None,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Candidates starting with the current prefix, in history order.
    pub fn matches(&self) -> impl Iterator<Item = &str> {
        self.candidates
            .iter()
            .map(String::as_str)
            .filter(|c| c.starts_with(self.prefix.as_str()))
    }

    pub fn filled(&self) -> Option<&str> {
        self.filled.as_deref()
    }

    /// Run the suggestion loop until a command is accepted, the mode is cancelled or input ends.
    pub fn run<R: Read, W: Write>(
        &mut self,
        keys: &mut KeyReader<R>,
        out: &mut W,
        history: &mut HistoryStore,
    ) -> io::Result<SuggestionOutcome> {
        log::debug!("suggestion mode with {} candidates", self.candidates.len());
        loop {
            match keys.next_raw_event()? {
                KeyEvent::Char(ch) if self.filled.is_none() => self.type_char(out, ch)?,
                KeyEvent::Enter => {
                    if let Some(command) = self.filled.take() {
                        writeln!(out)?;
                        out.flush()?;
                        history.append(command.as_str());
                        return Ok(SuggestionOutcome::Accepted(command));
                    }
                    log::debug!("no unique match for {:?}, ignoring enter", self.prefix);
                }
                KeyEvent::Interrupt => {
                    writeln!(out)?;
                    out.flush()?;
                    return Ok(SuggestionOutcome::Cancelled);
                }
                KeyEvent::Eof => return Ok(SuggestionOutcome::Eof),
                _ => {}
            }
            out.flush()?;
        }
    }

    /// The only candidate matching the current prefix, if there is exactly one.
    pub fn unique_match(&self) -> Option<String> {
        let mut matches = self.matches();
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only.to_string()),
            _ => None,
        }
    }

    fn type_char<W: Write>(&mut self, out: &mut W, ch: u8) -> io::Result<()> {
        self.prefix.push(char::from(ch));
        out.write_all(&[ch])?;

        let Some(only) = self.unique_match() else {
            return Ok(());
        };
        for _ in 0..self.prefix.len() {
            out.write_all(ERASE)?;
        }
        out.write_all(only.as_bytes())?;
        self.filled = Some(only);
        Ok(())
    }
}
