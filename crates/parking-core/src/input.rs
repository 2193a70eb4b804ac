//! Abstract single-key input signal: terminal raw mode, no echo, delivered one byte at a time
//! to a callback until [`crate::tasks::running`] goes false. A thin collaborator — the spec
//! treats keypress handling as an opaque input signal, so this module does nothing beyond
//! putting the terminal in raw mode and polling `read(2)` with a short timeout, the same
//! direct-`libc` style [`crate::shm::sync`] uses for the process-shared primitives.

use std::io::Read;
use std::mem::MaybeUninit;
use std::os::fd::AsRawFd;

struct RawModeGuard {
    original: libc::termios,
}

impl RawModeGuard {
    fn enable() -> Option<Self> {
        let fd = std::io::stdin().as_raw_fd();
        if unsafe { libc::isatty(fd) } == 0 {
            return None;
        }
        let mut original = MaybeUninit::<libc::termios>::uninit();
        if unsafe { libc::tcgetattr(fd, original.as_mut_ptr()) } != 0 {
            return None;
        }
        let original = unsafe { original.assume_init() };
        let mut raw = original;
        unsafe {
            libc::cfmakeraw(&mut raw);
        }
        raw.c_cc[libc::VMIN] = 0;
        raw.c_cc[libc::VTIME] = 1;
        if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &raw) } != 0 {
            return None;
        }
        Some(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let fd = std::io::stdin().as_raw_fd();
        unsafe {
            libc::tcsetattr(fd, libc::TCSANOW, &self.original);
        }
    }
}

/// Blocks the calling thread reading single bytes from stdin in raw, unechoed mode, invoking
/// `on_key` for each one, until `running` returns false. Falls back to doing nothing if stdin
/// is not a terminal (e.g. under a test harness or when input is redirected).
pub fn read_keys(running: impl Fn() -> bool, mut on_key: impl FnMut(u8)) {
    let Some(_guard) = RawModeGuard::enable() else {
        return;
    };
    let mut stdin = std::io::stdin();
    let mut byte = [0u8; 1];
    while running() {
        match stdin.read(&mut byte) {
            Ok(1) => on_key(byte[0]),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_tty_stdin_returns_without_blocking() {
        // In the test harness stdin is not a terminal, so enable() returns None and
        // read_keys must return immediately without ever invoking on_key.
        let mut called = false;
        read_keys(|| true, |_| called = true);
        assert!(!called);
    }
}
