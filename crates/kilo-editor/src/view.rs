//! View — the viewport and the frame composer.
//!
//! A `View` maps a window of the [`Buffer`] onto the terminal: it owns the
//! scroll offsets and the screen geometry, and it composes the complete
//! frame — text rows, status bar, message bar, cursor placement — into an
//! [`AppendBuffer`] for a single write.
//!
//! The View is intentionally lightweight — it holds only scroll state and
//! geometry. It doesn't own the buffer or cursor; those are passed to
//! [`render_frame`](View::render_frame) as parameters.
//!
//! # Coordinates
//!
//! Scrolling works in *render* coordinates: `rowoff` is the first visible
//! row, `coloff` the first visible render column. [`scroll`](View::scroll)
//! runs before every frame: it derives the cursor's render column and then
//! clamps both offsets so the cursor is inside the window.
//!
//! # Frame layout
//!
//! ```text
//! ~ fn main() {                 ← `rows` text lines (render slice,
//! ~     println!("hi");            SGR-colored per highlight class)
//! ~
//! main.rs - 3 lines (modified)  ← status bar, inverse video
//! HELP: Ctrl-S = save | ...     ← message bar (5s expiry)
//! ```
//!
//! Every text line — including the last — ends with `\r\n` so the status
//! bar always lands on its own terminal row.

use std::io;

use kilo_term::ansi;
use kilo_term::output::AppendBuffer;
use kilo_term::terminal::Size;

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::row::Row;
use crate::syntax::Highlight;
use crate::VERSION;

/// Scroll state and screen geometry.
#[derive(Debug)]
pub struct View {
    /// First visible row (render coordinates).
    pub rowoff: usize,
    /// First visible render column.
    pub coloff: usize,
    /// Visible text lines — the terminal height minus the two bars.
    pub rows: usize,
    /// Visible columns.
    pub cols: usize,
}

impl View {
    /// Create a view for a terminal of `size`.
    ///
    /// Two lines are reserved: the status bar and the message bar.
    #[must_use]
    pub fn new(size: Size) -> Self {
        let mut view = Self {
            rowoff: 0,
            coloff: 0,
            rows: 0,
            cols: 0,
        };
        view.set_size(size);
        view
    }

    /// Adopt a new terminal geometry (startup or SIGWINCH).
    pub fn set_size(&mut self, size: Size) {
        self.rows = (size.rows as usize).saturating_sub(2);
        self.cols = size.cols as usize;
    }

    /// Derive the cursor's render column and clamp the offsets so the
    /// cursor is inside the window. Runs before every frame.
    pub fn scroll(&mut self, cursor: &mut Cursor, buffer: &Buffer) {
        cursor.update_rx(buffer);

        self.rowoff = clamp_into_window(cursor.y, self.rowoff, self.rows);
        self.coloff = clamp_into_window(cursor.rx, self.coloff, self.cols);
    }

    // -- Frame composition --------------------------------------------------

    /// Compose one complete frame into `ab`.
    ///
    /// Hide cursor, home, text rows, status bar, message bar, reposition
    /// the cursor, show it again. The caller writes the buffer to the
    /// terminal in a single call and drops it.
    ///
    /// # Errors
    ///
    /// Propagates writer errors; writing to an [`AppendBuffer`] cannot
    /// actually fail.
    pub fn render_frame(
        &self,
        buffer: &Buffer,
        cursor: &Cursor,
        message: Option<&str>,
        ab: &mut AppendBuffer,
    ) -> io::Result<()> {
        ansi::cursor_hide(ab)?;
        ansi::cursor_home(ab)?;

        self.draw_rows(buffer, ab)?;
        self.draw_status_bar(buffer, cursor, ab)?;
        self.draw_message_bar(message, ab)?;

        ansi::cursor_to(ab, cursor.rx - self.coloff, cursor.y - self.rowoff)?;
        ansi::cursor_show(ab)?;
        Ok(())
    }

    /// Draw the visible text rows.
    ///
    /// Rows past the end of the buffer get a `~` marker; a pristine empty
    /// buffer gets the welcome line a third of the way down.
    fn draw_rows(&self, buffer: &Buffer, ab: &mut AppendBuffer) -> io::Result<()> {
        for y in 0..self.rows {
            let filerow = y + self.rowoff;

            if filerow >= buffer.len() {
                if buffer.is_empty() && y == self.rows / 3 {
                    self.draw_welcome(ab);
                } else {
                    ab.push(b'~');
                }
            } else {
                self.draw_text_row(&buffer.rows()[filerow], ab)?;
            }

            ansi::clear_line(ab)?;
            ab.append(b"\r\n");
        }
        Ok(())
    }

    /// Draw the centered welcome line for an empty buffer.
    fn draw_welcome(&self, ab: &mut AppendBuffer) {
        let welcome = format!("Kilo Editor -- version {VERSION}");
        let text = truncate_bytes(&welcome, self.cols);

        let mut padding = (self.cols - text.len()) / 2;
        if padding > 0 {
            ab.push(b'~');
            padding -= 1;
        }
        for _ in 0..padding {
            ab.push(b' ');
        }
        ab.append(text.as_bytes());
    }

    /// Draw the visible slice of one text row with SGR coloring.
    fn draw_text_row(&self, row: &Row, ab: &mut AppendBuffer) -> io::Result<()> {
        let render = row.render();
        let hl = row.hl();
        let start = self.coloff.min(render.len());
        let end = (self.coloff + self.cols).min(render.len());

        // The color currently in effect, to skip redundant SGR sequences.
        let mut current: Option<u8> = None;

        for j in start..end {
            let c = render[j];

            if c < 0x20 || c == 0x7f {
                // Control glyph: inverse '@'..'Z' (or '?'), then put the
                // active color back since SGR 0 wiped it.
                let sym = if c <= 26 { b'@' + c } else { b'?' };
                ansi::invert(ab)?;
                ab.push(sym);
                ansi::reset_attrs(ab)?;
                if let Some(color) = current {
                    ansi::fg_color(ab, color)?;
                }
            } else if hl[j] == Highlight::Normal {
                if current.is_some() {
                    ansi::fg_default(ab)?;
                    current = None;
                }
                ab.push(c);
            } else {
                let color = hl[j].color();
                if current != Some(color) {
                    ansi::fg_color(ab, color)?;
                    current = Some(color);
                }
                ab.push(c);
            }
        }

        ansi::fg_default(ab)
    }

    /// Draw the inverse-video status bar.
    ///
    /// Left: filename (20 bytes max, `[No Name]` fallback), line count,
    /// modified flag. Right: filetype and cursor position, flush against
    /// the right edge.
    fn draw_status_bar(
        &self,
        buffer: &Buffer,
        cursor: &Cursor,
        ab: &mut AppendBuffer,
    ) -> io::Result<()> {
        ansi::invert(ab)?;

        let name = truncate_bytes(buffer.filename().unwrap_or("[No Name]"), 20);
        let modified = if buffer.is_dirty() { "(modified)" } else { "" };
        let left = format!("{name} - {} lines {modified}", buffer.len());
        let left = truncate_bytes(&left, self.cols);

        let filetype = buffer.syntax().map_or("no ft", |s| s.filetype);
        let right = format!("{filetype} | {}/{}", cursor.y + 1, buffer.len());

        ab.append(left.as_bytes());
        let mut len = left.len();
        while len < self.cols {
            if self.cols - len == right.len() {
                ab.append(right.as_bytes());
                break;
            }
            ab.push(b' ');
            len += 1;
        }

        ansi::reset_attrs(ab)?;
        ab.append(b"\r\n");
        Ok(())
    }

    /// Draw the message bar: clear the line, then the message if fresh.
    fn draw_message_bar(&self, message: Option<&str>, ab: &mut AppendBuffer) -> io::Result<()> {
        ansi::clear_line(ab)?;
        if let Some(msg) = message {
            ab.append(truncate_bytes(msg, self.cols).as_bytes());
        }
        Ok(())
    }
}

/// Scroll `off` so that `v` falls inside a window of `span` cells.
fn clamp_into_window(v: usize, off: usize, span: usize) -> usize {
    if v < off {
        v
    } else if v >= off + span {
        v + 1 - span
    } else {
        off
    }
}

/// Truncate a string to at most `max` bytes, respecting char boundaries.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
