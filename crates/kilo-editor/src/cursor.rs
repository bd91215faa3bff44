//! Cursor — position tracking in logical coordinates.
//!
//! The cursor lives in *logical* (chars) coordinates: `x` indexes into a
//! row's raw bytes, `y` indexes rows. `y == buffer.len()` is legal — the
//! virtual empty line past the last row, where new text begins on an
//! empty buffer. The *render* column `rx` is derived from `(x, y)` every
//! frame, right before scrolling.
//!
//! Movement rules: LEFT at column 0 wraps to the end of the previous
//! line, RIGHT at the end of a line wraps to the start of the next, and
//! after any move the column snaps back inside the row it landed on.

use kilo_term::input::Key;

use crate::buffer::Buffer;

/// The editor cursor.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cursor {
    /// Logical column: an index into the current row's `chars`.
    pub x: usize,
    /// Row index; `buffer.len()` is the virtual trailing line.
    pub y: usize,
    /// Render column, derived each frame from `(x, y)`.
    pub rx: usize,
}

impl Cursor {
    /// A cursor at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one arrow-key motion, then snap the column into the row.
    ///
    /// Non-arrow keys are ignored; HOME/END/PAGE motions need viewport
    /// state and live with the editor dispatch.
    pub fn move_key(&mut self, key: Key, buffer: &Buffer) {
        match key {
            Key::ArrowLeft => {
                if self.x > 0 {
                    self.x -= 1;
                } else if self.y > 0 {
                    // Wrap to the end of the previous line.
                    self.y -= 1;
                    self.x = buffer.row(self.y).map_or(0, |r| r.len());
                }
            }
            Key::ArrowRight => {
                if let Some(row) = buffer.row(self.y) {
                    if self.x < row.len() {
                        self.x += 1;
                    } else {
                        // Wrap to the start of the next line.
                        self.y += 1;
                        self.x = 0;
                    }
                }
            }
            Key::ArrowUp => {
                self.y = self.y.saturating_sub(1);
            }
            Key::ArrowDown => {
                if self.y < buffer.len() {
                    self.y += 1;
                }
            }
            _ => return,
        }

        self.snap(buffer);
    }

    /// Snap the column to the end of the current row if it hangs past it.
    pub fn snap(&mut self, buffer: &Buffer) {
        let row_len = buffer.row(self.y).map_or(0, |r| r.len());
        if self.x > row_len {
            self.x = row_len;
        }
    }

    /// Recompute the render column from the logical position.
    pub fn update_rx(&mut self, buffer: &Buffer) {
        self.rx = buffer.row(self.y).map_or(0, |r| r.cx_to_rx(self.x));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with(lines: &[&str]) -> Buffer {
        let mut buf = Buffer::new();
        for line in lines {
            buf.insert_row(buf.len(), line.as_bytes().to_vec());
        }
        buf
    }

    #[test]
    fn left_at_column_zero_wraps_to_previous_line_end() {
        let buf = buffer_with(&["hello", "world"]);
        let mut cur = Cursor { x: 0, y: 1, rx: 0 };
        cur.move_key(Key::ArrowLeft, &buf);
        assert_eq!((cur.x, cur.y), (5, 0));
    }

    #[test]
    fn left_at_origin_stays_put() {
        let buf = buffer_with(&["hello"]);
        let mut cur = Cursor::new();
        cur.move_key(Key::ArrowLeft, &buf);
        assert_eq!((cur.x, cur.y), (0, 0));
    }

    #[test]
    fn right_at_line_end_wraps_to_next_line_start() {
        let buf = buffer_with(&["hi", "there"]);
        let mut cur = Cursor { x: 2, y: 0, rx: 0 };
        cur.move_key(Key::ArrowRight, &buf);
        assert_eq!((cur.x, cur.y), (0, 1));
    }

    #[test]
    fn right_on_the_virtual_line_is_inert() {
        let buf = buffer_with(&["hi"]);
        let mut cur = Cursor { x: 0, y: 1, rx: 0 };
        cur.move_key(Key::ArrowRight, &buf);
        assert_eq!((cur.x, cur.y), (0, 1));
    }

    #[test]
    fn down_stops_at_the_virtual_trailing_line() {
        let buf = buffer_with(&["a", "b"]);
        let mut cur = Cursor::new();
        for _ in 0..5 {
            cur.move_key(Key::ArrowDown, &buf);
        }
        assert_eq!(cur.y, 2);
    }

    #[test]
    fn vertical_moves_snap_the_column() {
        let buf = buffer_with(&["a long line", "ab"]);
        let mut cur = Cursor { x: 11, y: 0, rx: 0 };
        cur.move_key(Key::ArrowDown, &buf);
        assert_eq!((cur.x, cur.y), (2, 1));
    }

    #[test]
    fn snap_to_zero_on_the_virtual_line() {
        let buf = buffer_with(&["abc"]);
        let mut cur = Cursor { x: 3, y: 0, rx: 0 };
        cur.move_key(Key::ArrowDown, &buf);
        assert_eq!((cur.x, cur.y), (0, 1));
    }

    #[test]
    fn update_rx_expands_tabs() {
        let buf = buffer_with(&["\tX"]);
        let mut cur = Cursor { x: 1, y: 0, rx: 0 };
        cur.update_rx(&buf);
        assert_eq!(cur.rx, 8);
    }

    #[test]
    fn update_rx_is_zero_on_the_virtual_line() {
        let buf = buffer_with(&["abc"]);
        let mut cur = Cursor { x: 0, y: 1, rx: 0 };
        cur.update_rx(&buf);
        assert_eq!(cur.rx, 0);
    }

    #[test]
    fn non_arrow_keys_are_ignored() {
        let buf = buffer_with(&["abc"]);
        let mut cur = Cursor { x: 1, y: 0, rx: 0 };
        cur.move_key(Key::Enter, &buf);
        assert_eq!((cur.x, cur.y), (1, 0));
    }
}
