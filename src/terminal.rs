//! Scoped raw (non-canonical) terminal mode.

use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// Puts a terminal into non-canonical, byte-at-a-time mode for as long as the
/// guard is alive.
///
/// The settings captured in [`RawTerminalGuard::enter`] are restored when the
/// guard is dropped, so every exit path (including `?` on read errors) leaves
/// the terminal the way it was found.
///
/// Besides `ICANON`, `ISIG` is cleared so that Ctrl-C reaches the key reader as
/// a plain `0x03` byte instead of being turned into a signal mid-read.
pub struct RawTerminalGuard {
    fd: RawFd,
    saved: libc::termios,
}

impl RawTerminalGuard {
    /// Capture the current settings of `fd` and switch it to raw mode.
    ///
    /// Fails with the OS error when `fd` is not a terminal.
    pub fn enter(fd: &impl AsRawFd, echo: bool) -> io::Result<Self> {
        let fd = fd.as_raw_fd();
        let mut saved = std::mem::MaybeUninit::<libc::termios>::uninit();
        // SAFETY: tcgetattr fully initializes `saved` when it returns 0.
        if unsafe { libc::tcgetattr(fd, saved.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: checked above.
        let saved = unsafe { saved.assume_init() };

        let mut raw = saved;
        raw.c_lflag &= !(libc::ICANON | libc::ISIG);
        if echo {
            raw.c_lflag |= libc::ECHO;
        } else {
            raw.c_lflag &= !libc::ECHO;
        }
        raw.c_cc[libc::VMIN] = 1;
        raw.c_cc[libc::VTIME] = 0;

        // SAFETY: `raw` is a valid termios derived from the current settings.
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return Err(io::Error::last_os_error());
        }
        log::debug!("terminal fd {fd} switched to raw mode (echo: {echo})");
        Ok(Self { fd, saved })
    }

    /// Restore the captured settings now instead of at end of scope.
    pub fn leave(self) {
        drop(self);
    }
}

impl Drop for RawTerminalGuard {
    fn drop(&mut self) {
        // SAFETY: `saved` came from tcgetattr on the same descriptor.
        if unsafe { libc::tcsetattr(self.fd, libc::TCSANOW, &self.saved) } != 0 {
            log::warn!(
                "failed to restore terminal settings: {}",
                io::Error::last_os_error()
            );
        }
    }
}
