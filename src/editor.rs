//! Raw-mode line editor with history recall.
//!
//! Every change to the buffer is paired with the terminal write that mirrors
//! it, so the text under construction always equals what is drawn after the
//! prompt.

use crate::history::HistoryStore;
use crate::keys::{KeyEvent, KeyReader};
use std::io::{self, Read, Write};

/// Longest line accepted before the editor submits on its own.
pub const DEFAULT_MAX_LINE_LEN: usize = 999;

const ERASE: &[u8] = b"\x08 \x08";

/// How a call to [`LineEditor::read_line`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// A non-blank or recalled line; it has already been appended to history.
    Line(String),
    /// Enter on a blank line; nothing to run.
    Empty,
    /// Ctrl-C or SIGINT: the caller should switch to suggestion mode.
    Interrupted,
    /// Input stream closed.
    Eof,
}

pub struct LineEditor {
    buffer: String,
    max_len: usize,
    /// Net number of steps back into history taken in the current session.
    recall_depth: usize,
}

impl LineEditor {
    pub fn new(max_len: usize) -> Self {
        Self {
            buffer: String::new(),
            max_len: max_len.max(1),
            recall_depth: 0,
        }
    }

    /// Edit one line, echoing to `out`, until Enter, a full buffer, an interrupt or EOF.
    pub fn read_line<R: Read, W: Write>(
        &mut self,
        keys: &mut KeyReader<R>,
        out: &mut W,
        history: &mut HistoryStore,
    ) -> io::Result<LineOutcome> {
        self.buffer.clear();
        self.recall_depth = 0;
        loop {
            match keys.next_event()? {
                KeyEvent::Char(ch) => {
                    self.buffer.push(char::from(ch));
                    out.write_all(&[ch])?;
                    if self.buffer.len() >= self.max_len {
                        return self.submit(out, history);
                    }
                }
                KeyEvent::Backspace => {
                    if self.buffer.pop().is_some() {
                        out.write_all(ERASE)?;
                    }
                }
                KeyEvent::HistoryPrev => {
                    if history.step_back() {
                        self.recall_depth += 1;
                        self.redraw(out, history.recalled())?;
                    }
                }
                KeyEvent::HistoryNext => {
                    if history.step_forward() {
                        self.recall_depth = self.recall_depth.saturating_sub(1);
                        self.redraw(out, history.recalled())?;
                    }
                }
                KeyEvent::Enter => return self.submit(out, history),
                KeyEvent::Interrupt => {
                    writeln!(out)?;
                    out.flush()?;
                    return Ok(LineOutcome::Interrupted);
                }
                KeyEvent::Eof => {
                    writeln!(out)?;
                    out.flush()?;
                    return Ok(LineOutcome::Eof);
                }
                KeyEvent::Raw(byte) => log::trace!("ignoring byte {byte:#04x}"),
            }
            out.flush()?;
        }
    }

    /// Erase the visible line and draw `text` in its place.
    fn redraw<W: Write>(&mut self, out: &mut W, text: &str) -> io::Result<()> {
        for _ in 0..self.buffer.len() {
            out.write_all(ERASE)?;
        }
        self.buffer.clear();
        self.buffer.push_str(text);
        out.write_all(self.buffer.as_bytes())
    }

    fn submit<W: Write>(
        &mut self,
        out: &mut W,
        history: &mut HistoryStore,
    ) -> io::Result<LineOutcome> {
        writeln!(out)?;
        out.flush()?;
        // A recalled line is resubmitted even if it was edited down to blanks.
        if self.recall_depth == 0 && self.buffer.trim().is_empty() {
            self.buffer.clear();
            return Ok(LineOutcome::Empty);
        }
        let line = std::mem::take(&mut self.buffer);
        history.append(line.as_str());
        Ok(LineOutcome::Line(line))
    }
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::InterruptFlag;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    struct Session {
        outcome: LineOutcome,
        screen: String,
    }

    fn edit(input: &[u8], history: &mut HistoryStore, max_len: usize) -> Session {
        let mut keys = KeyReader::new(Cursor::new(input.to_vec()), InterruptFlag::new());
        let mut out = Vec::new();
        let outcome = LineEditor::new(max_len)
            .read_line(&mut keys, &mut out, history)
            .unwrap();
        Session {
            outcome,
            screen: String::from_utf8(out).unwrap(),
        }
    }

    fn history_of(entries: &[&str]) -> HistoryStore {
        let mut history = HistoryStore::new(10);
        for entry in entries {
            history.append(*entry);
        }
        history
    }

    #[test]
    fn test_typed_line_is_echoed_and_recorded() {
        let mut history = HistoryStore::new(10);
        let session = edit(b"ls -la\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("ls -la".to_string()));
        assert_eq!(session.screen, "ls -la\n");
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["ls -la"]);
    }

    #[test]
    fn test_backspace_erases_last_char() {
        let mut history = HistoryStore::new(10);
        let session = edit(b"lx\x7fs\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("ls".to_string()));
        assert_eq!(session.screen, "lx\x08 \x08s\n");
    }

    #[test]
    fn test_backspace_on_empty_line_draws_nothing() {
        let mut history = HistoryStore::new(10);
        let session = edit(b"\x7f\x7fa\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("a".to_string()));
        assert_eq!(session.screen, "a\n");
    }

    #[test]
    fn test_blank_line_leaves_history_untouched() {
        let mut history = history_of(&["ls", "pwd"]);
        history.step_back();
        let cursor = history.cursor();

        for input in [&b"\n"[..], b"   \n", b"ab\x7f\x7f\n"] {
            let session = edit(input, &mut history, DEFAULT_MAX_LINE_LEN);
            assert_eq!(session.outcome, LineOutcome::Empty);
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.cursor(), cursor);
    }

    #[test]
    fn test_up_arrow_recalls_and_redraws() {
        let mut history = history_of(&["a", "bb"]);
        let session = edit(b"\x1b[A\x1b[A\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("a".to_string()));
        assert_eq!(session.screen, "bb\x08 \x08\x08 \x08a\n");
        assert_eq!(history.iter().collect::<Vec<_>>(), vec!["a", "bb", "a"]);
    }

    #[test]
    fn test_up_arrow_past_oldest_stays_on_oldest() {
        let mut history = history_of(&["first", "second"]);
        let session = edit(b"\x1b[A\x1b[A\x1b[A\x1b[A\x1b[A\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("first".to_string()));
    }

    #[test]
    fn test_down_arrow_at_newest_is_ignored() {
        let mut history = history_of(&["ls"]);
        let session = edit(b"\x1b[B\x1b[Bx\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("x".to_string()));
        assert_eq!(session.screen, "x\n");
    }

    #[test]
    fn test_down_arrow_returns_to_empty_slot() {
        let mut history = history_of(&["ls"]);
        let session = edit(b"\x1b[A\x1b[B\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Empty);
        assert_eq!(session.screen, "ls\x08 \x08\x08 \x08\n");
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_recalled_line_erased_to_blank_is_still_accepted() {
        let mut history = history_of(&["ls"]);
        let session = edit(b"\x1b[A\x7f\x7f\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line(String::new()));
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(1), Some(""));
    }

    #[test]
    fn test_recall_state_does_not_leak_into_next_session() {
        let mut history = history_of(&["ls"]);
        let mut keys = KeyReader::new(
            Cursor::new(b"\x1b[A\n\n".to_vec()),
            InterruptFlag::new(),
        );
        let mut out = Vec::new();
        let mut editor = LineEditor::default();
        assert_eq!(
            editor.read_line(&mut keys, &mut out, &mut history).unwrap(),
            LineOutcome::Line("ls".to_string())
        );
        assert_eq!(
            editor.read_line(&mut keys, &mut out, &mut history).unwrap(),
            LineOutcome::Empty
        );
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn test_recalled_line_can_be_extended() {
        let mut history = history_of(&["ls"]);
        let session = edit(b"\x1b[A -la\n", &mut history, DEFAULT_MAX_LINE_LEN);
        assert_eq!(session.outcome, LineOutcome::Line("ls -la".to_string()));
    }

    #[test]
    fn test_full_buffer_submits_without_newline() {
        let mut history = HistoryStore::new(10);
        let session = edit(b"abcdef", &mut history, 3);
        assert_eq!(session.outcome, LineOutcome::Line("abc".to_string()));
        assert_eq!(history.get(0), Some("abc"));
    }

    #[test]
    fn test_interrupt_and_eof() {
        let mut history = HistoryStore::new(10);
        assert_eq!(
            edit(b"ab\x03", &mut history, DEFAULT_MAX_LINE_LEN).outcome,
            LineOutcome::Interrupted
        );
        assert_eq!(
            edit(b"ab", &mut history, DEFAULT_MAX_LINE_LEN).outcome,
            LineOutcome::Eof
        );
        assert!(history.is_empty());
    }
}
