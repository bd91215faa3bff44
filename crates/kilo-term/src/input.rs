// SPDX-License-Identifier: MIT
//
// Terminal input decoding.
//
// Turns the raw stdin byte stream into logical keys. Handles the legacy
// escape encodings a raw-mode editor actually receives:
//
// - CSI sequences (arrows, Home/End, Delete, PageUp/PageDown)
// - VT-style `CSI <digit> ~` editing keys (both 1/7 Home and 4/8 End forms)
// - SS3 sequences (`ESC O H` / `ESC O F` Home/End from some terminals)
// - DEL (0x7F) as Backspace, CR as Enter
// - Everything else as a plain byte, control bytes included
//
// # Escape vs escape-sequence ambiguity
//
// A bare ESC byte (0x1B) could be either a standalone Escape keypress or
// the start of a multi-byte sequence. Raw mode uses `VMIN=0, VTIME=1`, so
// a read that finds no byte within ~100ms returns empty — if that happens
// while we're mid-sequence, the ESC was a real Escape keypress and we
// report it as such. Malformed or unrecognized sequences also resolve to
// Escape rather than leaking partial bytes into the buffer as text.

use std::io;

use crate::terminal::Tty;

// ─── Key ────────────────────────────────────────────────────────────────────

/// A decoded logical key.
///
/// Plain bytes (printable and control alike) pass through as
/// [`Byte`](Key::Byte); keys that arrive as multi-byte escape sequences —
/// plus Enter, Backspace, and Escape — get named variants so the dispatch
/// table never has to reason about encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A single input byte, returned as itself.
    Byte(u8),
    Enter,
    Backspace,
    Escape,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
}

/// The control-key combination for a letter: `ctrl(b'q')` is what the
/// terminal sends for Ctrl-Q.
#[inline]
#[must_use]
pub const fn ctrl(c: u8) -> u8 {
    c & 0x1f
}

// ─── Decoding ───────────────────────────────────────────────────────────────

/// Read the next logical key, blocking until one arrives.
///
/// Poll expiries (`VTIME`) outside an escape sequence are retried
/// indefinitely — this is the editor's single suspension point.
///
/// # Errors
///
/// Returns an error on a genuine read failure (fatal to the editor).
pub fn next_key(tty: &mut impl Tty) -> io::Result<Key> {
    loop {
        if let Some(key) = poll_key(tty)? {
            return Ok(key);
        }
    }
}

/// Read one logical key if input is available within the poll interval.
///
/// Returns `Ok(None)` when the interval expired with no input, letting the
/// caller interleave other work (resize handling) between polls.
///
/// # Errors
///
/// Returns an error on a genuine read failure (fatal to the editor).
pub fn poll_key(tty: &mut impl Tty) -> io::Result<Option<Key>> {
    let Some(byte) = tty.read_byte()? else {
        return Ok(None);
    };

    let key = match byte {
        0x1b => decode_escape(tty),
        0x0d => Key::Enter,
        0x7f => Key::Backspace,
        b => Key::Byte(b),
    };
    Ok(Some(key))
}

/// Decode the remainder of an escape sequence after the leading ESC.
///
/// A timeout or read failure at any point means the ESC stood alone (or
/// the sequence is something we don't speak) — either way the answer is
/// the Escape key.
fn decode_escape(tty: &mut impl Tty) -> Key {
    let Some(first) = seq_byte(tty) else {
        return Key::Escape;
    };

    match first {
        b'[' => {
            let Some(second) = seq_byte(tty) else {
                return Key::Escape;
            };
            if second.is_ascii_digit() {
                // CSI <digit> ~ editing keys.
                match seq_byte(tty) {
                    Some(b'~') => match second {
                        b'1' | b'7' => Key::Home,
                        b'3' => Key::Delete,
                        b'4' | b'8' => Key::End,
                        b'5' => Key::PageUp,
                        b'6' => Key::PageDown,
                        _ => Key::Escape,
                    },
                    _ => Key::Escape,
                }
            } else {
                match second {
                    b'A' => Key::ArrowUp,
                    b'B' => Key::ArrowDown,
                    b'C' => Key::ArrowRight,
                    b'D' => Key::ArrowLeft,
                    b'H' => Key::Home,
                    b'F' => Key::End,
                    _ => Key::Escape,
                }
            }
        }
        b'O' => match seq_byte(tty) {
            Some(b'H') => Key::Home,
            Some(b'F') => Key::End,
            _ => Key::Escape,
        },
        _ => Key::Escape,
    }
}

/// Read one byte of an in-flight escape sequence.
///
/// Timeouts and read errors both collapse to `None`: mid-sequence, either
/// means "treat the ESC as a keypress", never "kill the editor".
fn seq_byte(tty: &mut impl Tty) -> Option<u8> {
    tty.read_byte().ok().flatten()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
