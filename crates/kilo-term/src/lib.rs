// SPDX-License-Identifier: MIT
//
// kilo-term — Terminal layer for the kilo editor.
//
// The thin collaborator between the editor engine and the POSIX TTY:
// raw-mode entry and guaranteed restore, window-size discovery (with the
// cursor-report fallback for terminals where the ioctl lies), a byte-level
// input decoder that turns escape sequences into logical keys, and the
// append buffer that stages a whole frame for a single write.
//
// This crate intentionally avoids external TUI frameworks (ratatui,
// crossterm) in favor of direct terminal control via ANSI escape
// sequences and raw termios. Every byte sent to the terminal is
// accounted for, and every frame is one syscall.

#[allow(clippy::missing_errors_doc)] // ANSI functions all just forward io::Write errors.
pub mod ansi;
pub mod input;
pub mod output;
pub mod terminal;
