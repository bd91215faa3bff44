// SPDX-License-Identifier: MIT
//
// Terminal control — raw mode, window size, and guaranteed restore.
//
// Safety: This module necessarily uses `unsafe` for termios (tcgetattr,
// tcsetattr), ioctl (TIOCGWINSZ), isatty, sigaction, and raw fd reads and
// writes. These are the standard POSIX interfaces for terminal control —
// there is no safe alternative. Each unsafe block is minimal.
#![allow(unsafe_code)]
//
// This module owns the terminal's raw state. Raw mode here is the editor
// flavor: every input transformation off (no echo, no canonical line
// editing, no signals, no flow control, no CR translation), output
// post-processing off, and a polling read discipline of `VMIN=0, VTIME=1`
// so a read returns within ~100ms whether or not a byte arrived. That
// short poll is what lets a lone ESC byte resolve into the Escape key.
//
// The saved termios must be restored on *every* exit path. Three layers
// guarantee it: `leave()` for the orderly path, `Drop` for early returns
// and propagated errors, and a panic hook that writes a pre-built restore
// sequence plus the saved termios directly to the fds — bypassing Rust's
// stdout lock, which may still be held if the panic happened mid-frame.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, Once};

// ─── Size ───────────────────────────────────────────────────────────────────

/// Terminal dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    /// Number of columns (width in character cells).
    pub cols: u16,
    /// Number of rows (height in character cells).
    pub rows: u16,
}

// ─── Tty Seam ───────────────────────────────────────────────────────────────

/// The byte-level terminal interface the editor engine is written against.
///
/// [`Terminal`] is the real implementation; tests drive the engine through
/// scripted in-memory doubles. Two operations are all the engine needs:
/// pull one byte of input (with the raw-mode poll timeout surfacing as
/// `Ok(None)`), and push one fully composed frame.
pub trait Tty {
    /// Read a single input byte.
    ///
    /// Returns `Ok(None)` when the poll interval expired without input
    /// (`VTIME`) or the read was interrupted; the caller decides whether
    /// to retry or to treat the silence as meaningful (escape-sequence
    /// disambiguation does the latter).
    ///
    /// # Errors
    ///
    /// Returns an error only for genuine read failures — those are fatal
    /// to the editor.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write a complete frame (or any control sequence) to the terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying write fails.
    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()>;
}

// ─── Terminal Queries ───────────────────────────────────────────────────────

/// Query the current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// Returns `None` if the query fails or reports zero columns; the caller
/// falls back to the cursor-report probe in that case.
#[must_use]
pub fn ioctl_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size {
            cols: ws.ws_col,
            rows: ws.ws_row,
        })
    } else {
        None
    }
}

/// Check whether stdin is connected to a terminal (TTY).
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

// ─── SIGWINCH ───────────────────────────────────────────────────────────────

/// Set by the SIGWINCH handler, consumed by [`Terminal::take_resize`].
static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

/// Install a signal handler for SIGWINCH (terminal resize).
///
/// The handler only sets [`SIGWINCH_RECEIVED`]; writing an atomic is one
/// of the few operations permitted inside a signal handler.
fn install_sigwinch_handler() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = sigwinch_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&raw mut sa.sa_mask);
        libc::sigaction(libc::SIGWINCH, &raw const sa, std::ptr::null_mut());
    }
}

extern "C" fn sigwinch_handler(_sig: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
}

// ─── Panic-Safe Terminal Restore ────────────────────────────────────────────

/// Global backup of the original termios for panic recovery.
///
/// The [`Terminal`] struct owns its own copy, but the panic hook can't
/// access it. This backup — behind a [`Mutex`], not `static mut` — lets
/// the hook restore cooked mode without the struct.
static TERMIOS_BACKUP: Mutex<Option<libc::termios>> = Mutex::new(None);

/// Restore termios from the global backup. Best-effort, ignores errors.
fn restore_termios_from_backup() {
    if let Ok(guard) = TERMIOS_BACKUP.lock() {
        if let Some(ref original) = *guard {
            unsafe {
                let _ = libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, original);
            }
        }
    }
}

/// Emergency screen-reset sequence: clear screen, home cursor, show cursor.
///
/// Leaves the restored cooked-mode terminal with a clean screen instead of
/// half a frame and a hidden cursor.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[2J\x1b[H\x1b[?25h";

/// Panic hook guard — ensures the hook is installed at most once per process.
static PANIC_HOOK_INSTALLED: Once = Once::new();

/// Install a panic hook that restores the terminal before printing the error.
///
/// Without this, a panic in raw mode leaves the user's terminal broken:
/// no echo, no line editing, no way to read the error message. The hook
/// writes [`EMERGENCY_RESTORE`] directly to fd 1 (bypassing Rust's stdout
/// lock to avoid deadlock), restores termios, then delegates to the
/// original panic handler so the error prints to a working terminal.
fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            restore_termios_from_backup();
            original(info);
        }));
    });
}

/// Write the screen-reset sequence directly to stdout's file descriptor.
fn emergency_restore() {
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// Terminal handle with RAII cleanup.
///
/// Call [`enter`](Self::enter) to switch to raw mode. The original termios
/// is restored by [`leave`](Self::leave), on drop, and on panic.
///
/// # Example
///
/// ```no_run
/// use kilo_term::terminal::Terminal;
///
/// let mut term = Terminal::new()?;
/// term.enter()?;
/// let size = term.window_size()?;
/// // ... read keys, write frames ...
/// term.leave()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    /// Original termios saved before entering raw mode.
    original_termios: Option<libc::termios>,

    /// Last known terminal size.
    size: Size,

    /// Whether raw mode is active.
    active: bool,
}

impl Terminal {
    /// Create a terminal handle.
    ///
    /// Does **not** enter raw mode — call [`enter`](Self::enter) for that.
    /// The size starts at an 80×24 fallback; [`window_size`](Self::window_size)
    /// replaces it with the real geometry.
    ///
    /// # Errors
    ///
    /// Currently infallible, but returns `Result` so the constructor can
    /// grow platform checks without an API break.
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            original_termios: None,
            size: Size { cols: 80, rows: 24 },
            active: false,
        })
    }

    /// Last known terminal size (columns, rows).
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    /// Whether raw mode is currently active.
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Has a SIGWINCH arrived since the last call? Consumes the flag.
    #[must_use]
    pub fn take_resize(&mut self) -> bool {
        SIGWINCH_RECEIVED.swap(false, Ordering::Relaxed)
    }

    /// Re-query the terminal size after a resize.
    ///
    /// Keeps the previous size if the query fails (the terminal that just
    /// delivered SIGWINCH answers TIOCGWINSZ in practice).
    pub fn refresh_size(&mut self) -> Size {
        if let Some(s) = ioctl_size() {
            self.size = s;
        }
        self.size
    }

    /// Determine the window size, with the escape-sequence fallback.
    ///
    /// Tries `ioctl(TIOCGWINSZ)` first. If that fails or reports zero
    /// columns, drives the cursor to the far bottom-right corner with
    /// `ESC[999C ESC[999B` and asks the device for a cursor position
    /// report (`ESC[6n`), parsing the `ESC[<rows>;<cols>R` reply.
    ///
    /// Requires raw mode to be active — the reply arrives on stdin and
    /// must not be echoed or line-buffered.
    ///
    /// # Errors
    ///
    /// Returns an error if both methods fail; the editor cannot start
    /// without a geometry.
    pub fn window_size(&mut self) -> io::Result<Size> {
        if let Some(s) = ioctl_size() {
            self.size = s;
            return Ok(s);
        }

        self.write_frame(b"\x1b[999C\x1b[999B")?;
        let s = self.cursor_position()?;
        self.size = s;
        Ok(s)
    }

    /// Query the cursor position via the device status report.
    fn cursor_position(&mut self) -> io::Result<Size> {
        self.write_frame(b"\x1b[6n")?;

        // Reply: ESC [ <rows> ; <cols> R. Stop on 'R' or on poll expiry.
        let mut reply = Vec::with_capacity(32);
        while reply.len() < 32 {
            match self.read_byte()? {
                Some(b'R') | None => break,
                Some(b) => reply.push(b),
            }
        }

        parse_cursor_report(&reply).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "unable to determine window size")
        })
    }

    /// Enter raw mode.
    ///
    /// Saves the current termios, installs the panic hook and the SIGWINCH
    /// handler, and applies the editor's raw disciplines: BRKINT, INPCK,
    /// ISTRIP, IXON, ICRNL off; OPOST off; CS8 on; ECHO, ICANON, IEXTEN,
    /// ISIG off; `VMIN=0, VTIME=1`.
    ///
    /// Idempotent: calling `enter()` while already active is a no-op.
    /// A no-op as well when stdin is not a TTY (tests, pipes) so the rest
    /// of the terminal handle stays usable.
    ///
    /// # Errors
    ///
    /// Returns an error if termios cannot be read or applied.
    pub fn enter(&mut self) -> io::Result<()> {
        if self.active {
            return Ok(());
        }

        install_panic_hook();
        install_sigwinch_handler();

        if is_tty() {
            unsafe {
                let mut termios: libc::termios = std::mem::zeroed();
                if libc::tcgetattr(libc::STDIN_FILENO, &raw mut termios) != 0 {
                    return Err(io::Error::last_os_error());
                }

                self.original_termios = Some(termios);
                if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                    *guard = Some(termios);
                }

                termios.c_iflag &=
                    !(libc::BRKINT | libc::INPCK | libc::ISTRIP | libc::IXON | libc::ICRNL);
                termios.c_oflag &= !libc::OPOST;
                termios.c_cflag |= libc::CS8;
                termios.c_lflag &= !(libc::ECHO | libc::ICANON | libc::IEXTEN | libc::ISIG);

                // Polling read: return after >=0 bytes within ~100ms.
                termios.c_cc[libc::VMIN] = 0;
                termios.c_cc[libc::VTIME] = 1;

                if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, &raw const termios) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }
        }

        self.active = true;
        Ok(())
    }

    /// Leave raw mode and restore the saved termios.
    ///
    /// Idempotent: calling `leave()` while inactive is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the termios restore fails.
    pub fn leave(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }

        if let Some(ref original) = self.original_termios {
            unsafe {
                if libc::tcsetattr(libc::STDIN_FILENO, libc::TCSAFLUSH, original) != 0 {
                    return Err(io::Error::last_os_error());
                }
            }

            // Restored successfully — the panic hook has nothing to do now.
            if let Ok(mut guard) = TERMIOS_BACKUP.lock() {
                *guard = None;
            }

            self.original_termios = None;
        }

        self.active = false;
        Ok(())
    }
}

impl Tty for Terminal {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut byte = 0u8;
        let n = unsafe {
            libc::read(
                libc::STDIN_FILENO,
                (&raw mut byte).cast::<libc::c_void>(),
                1,
            )
        };

        match n {
            1 => Ok(Some(byte)),
            0 => Ok(None),
            _ => {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => Ok(None),
                    _ => Err(err),
                }
            }
        }
    }

    fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(bytes)?;
        stdout.flush()
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if self.active {
            let _ = self.leave();
        }
    }
}

/// Parse the body of a cursor position report: `ESC [ <rows> ; <cols>`.
///
/// The terminating `R` has already been consumed by the reader.
fn parse_cursor_report(reply: &[u8]) -> Option<Size> {
    let body = reply.strip_prefix(b"\x1b[")?;
    let text = std::str::from_utf8(body).ok()?;
    let (rows, cols) = text.split_once(';')?;
    let rows: u16 = rows.parse().ok()?;
    let cols: u16 = cols.parse().ok()?;
    Some(Size { cols, rows })
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Size ──────────────────────────────────────────────────────────

    #[test]
    fn size_equality() {
        assert_eq!(Size { cols: 80, rows: 24 }, Size { cols: 80, rows: 24 });
    }

    #[test]
    fn size_inequality() {
        assert_ne!(Size { cols: 80, rows: 24 }, Size { cols: 120, rows: 40 });
    }

    #[test]
    fn size_is_copy() {
        let a = Size { cols: 80, rows: 24 };
        let b = a;
        assert_eq!(a, b);
    }

    // ── Terminal queries ─────────────────────────────────────────────

    #[test]
    fn ioctl_size_does_not_panic() {
        let _ = ioctl_size();
    }

    #[test]
    fn is_tty_does_not_panic() {
        let _ = is_tty();
    }

    // ── Emergency restore sequence ──────────────────────────────────

    #[test]
    fn emergency_restore_clears_homes_and_shows_cursor() {
        let s = std::str::from_utf8(EMERGENCY_RESTORE).unwrap();
        assert!(s.starts_with("\x1b[2J"), "must clear the screen first");
        assert!(s.contains("\x1b[H"), "must home the cursor");
        assert!(s.ends_with("\x1b[?25h"), "must show the cursor last");
    }

    // ── Cursor report parsing ───────────────────────────────────────

    #[test]
    fn parse_cursor_report_accepts_well_formed_reply() {
        assert_eq!(
            parse_cursor_report(b"\x1b[24;80"),
            Some(Size { cols: 80, rows: 24 })
        );
    }

    #[test]
    fn parse_cursor_report_rejects_missing_prefix() {
        assert_eq!(parse_cursor_report(b"24;80"), None);
    }

    #[test]
    fn parse_cursor_report_rejects_missing_semicolon() {
        assert_eq!(parse_cursor_report(b"\x1b[2480"), None);
    }

    #[test]
    fn parse_cursor_report_rejects_non_numeric_fields() {
        assert_eq!(parse_cursor_report(b"\x1b[24;eighty"), None);
    }

    #[test]
    fn parse_cursor_report_rejects_empty_reply() {
        assert_eq!(parse_cursor_report(b""), None);
    }

    // ── Terminal struct ─────────────────────────────────────────────

    #[test]
    fn terminal_new_starts_inactive() {
        let term = Terminal::new().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn terminal_has_reasonable_default_size() {
        let term = Terminal::new().unwrap();
        let s = term.size();
        assert!(s.cols > 0);
        assert!(s.rows > 0);
    }

    #[test]
    fn terminal_enter_leave_cycle() {
        let mut term = Terminal::new().unwrap();
        term.enter().unwrap();
        assert!(term.is_active());
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn terminal_double_enter_is_idempotent() {
        let mut term = Terminal::new().unwrap();
        term.enter().unwrap();
        term.enter().unwrap();
        assert!(term.is_active());
        term.leave().unwrap();
    }

    #[test]
    fn terminal_leave_without_enter() {
        let mut term = Terminal::new().unwrap();
        term.leave().unwrap();
        assert!(!term.is_active());
    }

    #[test]
    fn terminal_drop_after_enter() {
        let mut term = Terminal::new().unwrap();
        term.enter().unwrap();
        drop(term);
    }

    #[test]
    fn take_resize_consumes_the_flag() {
        let mut term = Terminal::new().unwrap();
        SIGWINCH_RECEIVED.store(true, Ordering::Relaxed);
        assert!(term.take_resize());
        assert!(!term.take_resize());
    }
}
