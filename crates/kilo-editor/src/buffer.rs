//! Text buffer — the fundamental unit of text storage.
//!
//! A `Buffer` is an ordered sequence of [`Row`]s plus document metadata:
//! the backing filename (absent until the first save-as), the selected
//! language descriptor, and a dirty counter that is zero exactly when the
//! on-disk file matches the rows.
//!
//! # Design choices
//!
//! - **Rows, not a rope.** Every editing operation, the renderer, and the
//!   highlighter work line-at-a-time, and the highlighter additionally
//!   needs a per-row open-comment bit that feeds the next row. An ordered
//!   `Vec<Row>` makes all of that direct.
//!
//! - **Bytes, not chars.** The buffer is a byte stream: load strips line
//!   terminators and keeps everything else verbatim, save writes each row
//!   followed by `\n`. No encoding normalization anywhere.
//!
//! - **Derived data stays in sync here.** Raw byte edits go through this
//!   type so every mutation re-renders the touched row, re-runs its
//!   highlight, propagates the open-comment state down the file while it
//!   keeps changing, and bumps the dirty counter. Out-of-range operations
//!   are silent no-ops.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::fs::OpenOptionsExt;

use crate::row::Row;
use crate::syntax::{self, Syntax};

/// An ordered sequence of rows with document metadata.
#[derive(Debug, Default)]
pub struct Buffer {
    rows: Vec<Row>,
    filename: Option<String>,
    syntax: Option<&'static Syntax>,
    dirty: u64,
}

impl Buffer {
    /// Create an empty, nameless buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a file into a fresh buffer.
    ///
    /// Reads line by line; trailing `\r` and `\n` bytes are stripped
    /// before each row is inserted. The buffer starts clean (`dirty == 0`)
    /// with its language selected from the filename.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or read — a fatal
    /// condition at startup.
    pub fn open(filename: String) -> io::Result<Self> {
        let file = File::open(&filename)?;
        let mut buffer = Self::new();
        buffer.filename = Some(filename);
        buffer.select_syntax();

        let mut reader = BufReader::new(file);
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            while matches!(line.last(), Some(b'\n' | b'\r')) {
                line.pop();
            }
            buffer.insert_row(buffer.rows.len(), line.clone());
        }

        buffer.dirty = 0;
        Ok(buffer)
    }

    // -- Metadata -----------------------------------------------------------

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the buffer has no rows at all.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows in order.
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// The row at `at`, if in range.
    #[inline]
    #[must_use]
    pub fn row(&self, at: usize) -> Option<&Row> {
        self.rows.get(at)
    }

    pub(crate) fn row_mut(&mut self, at: usize) -> Option<&mut Row> {
        self.rows.get_mut(at)
    }

    /// The backing filename, if one has been set.
    #[inline]
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Set the filename (save-as) and re-select the language.
    ///
    /// Rows highlighted before a language was known are re-highlighted
    /// under the newly selected descriptor.
    pub fn set_filename(&mut self, filename: String) {
        self.filename = Some(filename);
        self.select_syntax();
    }

    /// The selected language descriptor, if any.
    #[inline]
    #[must_use]
    pub const fn syntax(&self) -> Option<&'static Syntax> {
        self.syntax
    }

    /// Count of unsaved mutations. Zero means the disk matches the buffer.
    #[inline]
    #[must_use]
    pub const fn dirty(&self) -> u64 {
        self.dirty
    }

    /// Whether there are unsaved changes.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty > 0
    }

    /// Re-select the language from the filename and re-highlight all rows.
    ///
    /// A language change can recolor rows whose open-comment state does
    /// not move, so this is a full pass in order, not the worklist.
    fn select_syntax(&mut self) {
        self.syntax = self.filename.as_deref().and_then(syntax::detect);
        for at in 0..self.rows.len() {
            let seed = at > 0 && self.rows[at - 1].open_comment();
            self.rows[at].update_syntax(self.syntax, seed);
        }
    }

    // -- Row operations -----------------------------------------------------

    /// Insert a row at `at` (`0..=len`), shifting later rows down.
    ///
    /// Out-of-range `at` is a silent no-op.
    pub fn insert_row(&mut self, at: usize, chars: Vec<u8>) {
        if at > self.rows.len() {
            return;
        }

        self.rows.insert(at, Row::new(at, chars));
        for row in &mut self.rows[at + 1..] {
            row.set_index(row.index() + 1);
        }
        self.update_row(at);
        self.dirty += 1;
    }

    /// Delete the row at `at`, shifting later rows up.
    ///
    /// Out-of-range `at` is a silent no-op.
    pub fn delete_row(&mut self, at: usize) {
        if at >= self.rows.len() {
            return;
        }

        self.rows.remove(at);
        for row in &mut self.rows[at..] {
            row.set_index(row.index() - 1);
        }
        self.dirty += 1;
    }

    /// Insert one byte into a row at column `at` (clamped to the row end).
    pub fn row_insert_char(&mut self, row: usize, at: usize, c: u8) {
        if row >= self.rows.len() {
            return;
        }
        self.rows[row].insert_byte(at, c);
        self.update_row(row);
        self.dirty += 1;
    }

    /// Delete one byte from a row. Out-of-range positions are no-ops.
    pub fn row_delete_char(&mut self, row: usize, at: usize) {
        if row >= self.rows.len() {
            return;
        }
        if !self.rows[row].delete_byte(at) {
            return;
        }
        self.update_row(row);
        self.dirty += 1;
    }

    /// Concatenate bytes onto the end of a row (line join).
    pub fn row_append_bytes(&mut self, row: usize, bytes: &[u8]) {
        if row >= self.rows.len() {
            return;
        }
        self.rows[row].append_bytes(bytes);
        self.update_row(row);
        self.dirty += 1;
    }

    /// Split the row at `(row, at)`: the tail becomes a new row below.
    pub fn split_row(&mut self, row: usize, at: usize) {
        if row >= self.rows.len() {
            return;
        }
        let tail = self.rows[row].split_off(at);
        self.insert_row(row + 1, tail);
        self.update_row(row);
    }

    /// Re-derive a row's render and highlights after a chars mutation.
    fn update_row(&mut self, at: usize) {
        self.rows[at].update_render();
        self.update_syntax_from(at);
    }

    /// Re-highlight `at` and propagate open-comment state downward.
    ///
    /// Worklist form of the cross-row propagation: each row is highlighted
    /// with its predecessor's open-comment seed, and the walk continues to
    /// the next row only while a row's own open-comment output changed.
    /// Bounded by the number of rows below `at`.
    fn update_syntax_from(&mut self, mut at: usize) {
        while at < self.rows.len() {
            let seed = at > 0 && self.rows[at - 1].open_comment();
            let changed = self.rows[at].update_syntax(self.syntax, seed);
            if !changed {
                break;
            }
            at += 1;
        }
    }

    // -- File I/O -----------------------------------------------------------

    /// The buffer serialized for disk: every row's bytes followed by `\n`.
    #[must_use]
    pub fn contents(&self) -> Vec<u8> {
        let total: usize = self.rows.iter().map(|r| r.len() + 1).sum();
        let mut out = Vec::with_capacity(total);
        for row in &self.rows {
            out.extend_from_slice(row.chars());
            out.push(b'\n');
        }
        out
    }

    /// Write the buffer to its file and clear the dirty counter.
    ///
    /// Creates the file with mode 0644 if absent, truncates it to the
    /// exact content length, and writes everything in one call. On any
    /// failure the dirty counter is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error when no filename is set or the write fails; the
    /// caller surfaces it as a status message, never as a crash.
    pub fn save(&mut self) -> io::Result<usize> {
        let Some(filename) = self.filename.as_deref() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "no filename set",
            ));
        };

        let contents = self.contents();
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .mode(0o644)
            .open(filename)?;
        file.set_len(contents.len() as u64)?;
        file.write_all(&contents)?;

        self.dirty = 0;
        Ok(contents.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
