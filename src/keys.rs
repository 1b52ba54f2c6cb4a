//! Decoding of raw terminal bytes into logical key events.

use std::io::{self, ErrorKind, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

const ESC: u8 = 0x1b;
const CTRL_C: u8 = 0x03;
const BACKSPACE: u8 = 0x7f;

/// One logical key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    /// Printable ASCII character (`0x20..=0x7e`).
    Char(u8),
    Enter,
    Backspace,
    /// Up arrow: recall the previous (older) history entry.
    HistoryPrev,
    /// Down arrow: recall the next (newer) history entry.
    HistoryNext,
    /// Ctrl-C typed at the terminal, or a SIGINT delivered to the shell.
    Interrupt,
    /// Any other byte; callers ignore it.
    Raw(u8),
    /// The input stream is closed.
    Eof,
}

/// Shared "interrupt pending" flag.
///
/// [`InterruptFlag::install`] wires the flag to SIGINT so the shell is not
/// killed by Ctrl-C while a foreground child runs; the flag is later consumed
/// by [`KeyReader`] at the top of its blocking wait.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag and register it as the process's SIGINT handler.
    pub fn install() -> io::Result<Self> {
        let flag = Self::new();
        signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag.0))?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag, returning whether it was set.
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Reads single bytes from a terminal and turns them into [`KeyEvent`]s.
///
/// The reader does not touch history state: arrow keys are reported as neutral
/// [`KeyEvent::HistoryPrev`] / [`KeyEvent::HistoryNext`] intents and the editor
/// decides what to do with them.
pub struct KeyReader<R> {
    input: R,
    interrupt: InterruptFlag,
}

impl<R: Read> KeyReader<R> {
    pub fn new(input: R, interrupt: InterruptFlag) -> Self {
        Self { input, interrupt }
    }

    /// Block until one logical key event is available.
    ///
    /// `ESC [ A` and `ESC [ B` decode to history intents; any other escape
    /// sequence is swallowed and reading continues.
    pub fn next_event(&mut self) -> io::Result<KeyEvent> {
        loop {
            if self.interrupt.take() {
                return Ok(KeyEvent::Interrupt);
            }
            let Some(byte) = self.read_byte()? else {
                return Ok(KeyEvent::Eof);
            };
            if byte != ESC {
                return Ok(classify(byte));
            }
            match self.read_byte()? {
                None => return Ok(KeyEvent::Eof),
                Some(b'[') => {}
                Some(other) => {
                    log::debug!("ignoring escape sequence ESC {other:#04x}");
                    continue;
                }
            }
            match self.read_byte()? {
                None => return Ok(KeyEvent::Eof),
                Some(b'A') => return Ok(KeyEvent::HistoryPrev),
                Some(b'B') => return Ok(KeyEvent::HistoryNext),
                Some(other) => log::debug!("ignoring escape sequence ESC [ {other:#04x}"),
            }
        }
    }

    /// Like [`KeyReader::next_event`] but without escape-sequence decoding.
    pub fn next_raw_event(&mut self) -> io::Result<KeyEvent> {
        if self.interrupt.take() {
            return Ok(KeyEvent::Interrupt);
        }
        Ok(match self.read_byte()? {
            Some(byte) => classify(byte),
            None => KeyEvent::Eof,
        })
    }

    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(buf[0])),
                Err(e) if e.kind() == ErrorKind::Interrupted => {
                    if self.interrupt.take() {
                        // Report the signal as if Ctrl-C had been typed.
                        return Ok(Some(CTRL_C));
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn classify(byte: u8) -> KeyEvent {
    match byte {
        b'\n' | b'\r' => KeyEvent::Enter,
        BACKSPACE => KeyEvent::Backspace,
        CTRL_C => KeyEvent::Interrupt,
        0x20..=0x7e => KeyEvent::Char(byte),
        other => KeyEvent::Raw(other),
    }
}
