//! Row — one logical line with its rendered expansion and highlights.
//!
//! A row stores three parallel views of a line:
//!
//! - **`chars`** — the raw bytes, exactly what load read and save writes
//! - **`render`** — the display bytes: TABs expanded to the next 8-column
//!   stop, everything else copied through
//! - **`hl`** — one highlight class per render byte
//!
//! `render` and `hl` are derived data, regenerated whenever `chars`
//! changes; `render.len() == hl.len()` always holds. The `index` field
//! records the row's position in the buffer and is maintained by the
//! buffer on every insert and delete — rows hold no back-pointers.
//!
//! Cursor positions come in two coordinate systems: a *logical* column
//! (an index into `chars`) and a *render* column (the screen cell after
//! TAB expansion). [`cx_to_rx`](Row::cx_to_rx) and
//! [`rx_to_cx`](Row::rx_to_cx) convert between them.

use crate::syntax::{self, Highlight, Syntax};

/// TAB stops every eight columns.
pub const TAB_STOP: usize = 8;

/// One logical line of the buffer.
#[derive(Debug)]
pub struct Row {
    /// Position of this row in the buffer. Maintained by the buffer.
    index: usize,
    /// Raw bytes of the line, without any line terminator.
    chars: Vec<u8>,
    /// Display bytes: TABs expanded, everything else verbatim.
    render: Vec<u8>,
    /// Highlight class per render byte.
    hl: Vec<Highlight>,
    /// Does this row end inside an unterminated multi-line comment?
    open_comment: bool,
}

impl Row {
    /// Create a row from raw bytes.
    ///
    /// The caller (the buffer) is responsible for running
    /// [`update_render`](Self::update_render) and
    /// [`update_syntax`](Self::update_syntax) before the row is drawn.
    #[must_use]
    pub fn new(index: usize, chars: Vec<u8>) -> Self {
        Self {
            index,
            chars,
            render: Vec::new(),
            hl: Vec::new(),
            open_comment: false,
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// This row's position in the buffer.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// The raw bytes of the line.
    #[inline]
    #[must_use]
    pub fn chars(&self) -> &[u8] {
        &self.chars
    }

    /// Number of raw bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Whether the line has no bytes.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// The rendered (TAB-expanded) bytes.
    #[inline]
    #[must_use]
    pub fn render(&self) -> &[u8] {
        &self.render
    }

    /// Number of rendered bytes.
    #[inline]
    #[must_use]
    pub fn render_len(&self) -> usize {
        self.render.len()
    }

    /// The highlight classes, one per rendered byte.
    #[inline]
    #[must_use]
    pub fn hl(&self) -> &[Highlight] {
        &self.hl
    }

    /// Does this row end inside an unterminated multi-line comment?
    #[inline]
    #[must_use]
    pub const fn open_comment(&self) -> bool {
        self.open_comment
    }

    // -- Derived data -------------------------------------------------------

    /// Regenerate `render` from `chars`.
    ///
    /// Each TAB becomes at least one space and then spaces up to the next
    /// multiple of [`TAB_STOP`]; every other byte copies through unchanged.
    pub fn update_render(&mut self) {
        let tabs = self.chars.iter().filter(|&&c| c == b'\t').count();
        let mut render = Vec::with_capacity(self.chars.len() + tabs * (TAB_STOP - 1));

        for &c in &self.chars {
            if c == b'\t' {
                render.push(b' ');
                while render.len() % TAB_STOP != 0 {
                    render.push(b' ');
                }
            } else {
                render.push(c);
            }
        }
        self.render = render;
    }

    /// Regenerate `hl` from `render`.
    ///
    /// `in_comment` seeds the scan with the predecessor row's open-comment
    /// state. Returns `true` when this row's own open-comment state
    /// changed — the signal for the buffer to keep propagating downward.
    pub fn update_syntax(&mut self, syntax: Option<&Syntax>, in_comment: bool) -> bool {
        let (hl, open) = match syntax {
            Some(syntax) => syntax::highlight_row(&self.render, syntax, in_comment),
            None => (vec![Highlight::Normal; self.render.len()], false),
        };
        self.hl = hl;

        let changed = open != self.open_comment;
        self.open_comment = open;
        changed
    }

    // -- Coordinate conversion ----------------------------------------------

    /// Convert a logical column to a render column.
    ///
    /// Walks `chars[..cx]`: a TAB advances to the next TAB stop, any other
    /// byte advances one cell.
    #[must_use]
    pub fn cx_to_rx(&self, cx: usize) -> usize {
        let mut rx = 0;
        for &c in self.chars.iter().take(cx) {
            if c == b'\t' {
                rx += (TAB_STOP - 1) - (rx % TAB_STOP);
            }
            rx += 1;
        }
        rx
    }

    /// Convert a render column back to a logical column.
    ///
    /// Returns the first `cx` whose cumulative render width strictly
    /// exceeds `rx` — the character occupying that cell. A render column
    /// past the end of the row maps to the end of `chars`.
    #[must_use]
    pub fn rx_to_cx(&self, rx: usize) -> usize {
        let mut cur_rx = 0;
        for (cx, &c) in self.chars.iter().enumerate() {
            if c == b'\t' {
                cur_rx += (TAB_STOP - 1) - (cur_rx % TAB_STOP);
            }
            cur_rx += 1;
            if cur_rx > rx {
                return cx;
            }
        }
        self.chars.len()
    }

    // -- Raw byte edits -----------------------------------------------------
    //
    // These touch only `chars`; the buffer re-derives render/highlights and
    // bumps the dirty counter around them.

    /// Splice one byte in at `at`, clamped to `[0, len]`.
    pub(crate) fn insert_byte(&mut self, at: usize, c: u8) {
        let at = at.min(self.chars.len());
        self.chars.insert(at, c);
    }

    /// Remove one byte. Returns `false` when `at` is out of range.
    pub(crate) fn delete_byte(&mut self, at: usize) -> bool {
        if at >= self.chars.len() {
            return false;
        }
        self.chars.remove(at);
        true
    }

    /// Concatenate bytes onto the end of the line.
    pub(crate) fn append_bytes(&mut self, bytes: &[u8]) {
        self.chars.extend_from_slice(bytes);
    }

    /// Cut the line at `at`, returning the tail.
    pub(crate) fn split_off(&mut self, at: usize) -> Vec<u8> {
        self.chars.split_off(at)
    }

    // -- Search overlay -----------------------------------------------------

    /// Paint `len` render bytes starting at `at` as a search match.
    pub(crate) fn paint_match(&mut self, at: usize, len: usize) {
        let end = (at + len).min(self.hl.len());
        let start = at.min(self.hl.len());
        for h in &mut self.hl[start..end] {
            *h = Highlight::Match;
        }
    }

    /// Replace the highlight array wholesale (overlay restore).
    pub(crate) fn restore_hl(&mut self, hl: Vec<Highlight>) {
        debug_assert_eq!(hl.len(), self.render.len());
        self.hl = hl;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn row(chars: &[u8]) -> Row {
        let mut row = Row::new(0, chars.to_vec());
        row.update_render();
        row.update_syntax(None, false);
        row
    }

    // -- Tab expansion ------------------------------------------------------

    #[test]
    fn tab_expands_to_the_next_stop() {
        let r = row(b"\tX");
        assert_eq!(r.render(), b"        X");
        assert_eq!(r.render_len(), 9);
    }

    #[test]
    fn tab_mid_line_pads_to_the_stop() {
        let r = row(b"ab\tc");
        assert_eq!(r.render(), b"ab      c");
    }

    #[test]
    fn tab_at_a_stop_boundary_still_emits_one_space_minimum() {
        let r = row(b"12345678\tx");
        assert_eq!(r.render(), b"12345678        x");
    }

    #[test]
    fn plain_bytes_render_verbatim() {
        let r = row(b"hello");
        assert_eq!(r.render(), b"hello");
    }

    #[test]
    fn render_and_hl_lengths_match() {
        for chars in [&b""[..], b"x", b"\t", b"a\tb\tc"] {
            let r = row(chars);
            assert_eq!(r.render_len(), r.hl().len());
        }
    }

    // -- Coordinate conversion ----------------------------------------------

    #[test]
    fn cx_to_rx_crosses_the_tab() {
        let r = row(b"\tX");
        assert_eq!(r.cx_to_rx(0), 0);
        assert_eq!(r.cx_to_rx(1), 8);
        assert_eq!(r.cx_to_rx(2), 9);
    }

    #[test]
    fn rx_to_cx_inside_the_tab_is_the_tab() {
        let r = row(b"\tX");
        assert_eq!(r.rx_to_cx(0), 0);
        assert_eq!(r.rx_to_cx(4), 0);
        assert_eq!(r.rx_to_cx(7), 0);
        assert_eq!(r.rx_to_cx(8), 1);
    }

    #[test]
    fn rx_past_the_row_maps_to_the_end() {
        let r = row(b"\tX");
        assert_eq!(r.rx_to_cx(100), 2);
    }

    #[test]
    fn conversions_are_identity_without_tabs() {
        let r = row(b"plain");
        for i in 0..=5 {
            assert_eq!(r.cx_to_rx(i), i);
        }
        for i in 0..5 {
            assert_eq!(r.rx_to_cx(i), i);
        }
    }

    // -- Byte edits ---------------------------------------------------------

    #[test]
    fn insert_byte_splices() {
        let mut r = row(b"ac");
        r.insert_byte(1, b'b');
        assert_eq!(r.chars(), b"abc");
    }

    #[test]
    fn insert_byte_clamps_past_the_end() {
        let mut r = row(b"ab");
        r.insert_byte(99, b'c');
        assert_eq!(r.chars(), b"abc");
    }

    #[test]
    fn delete_byte_in_range() {
        let mut r = row(b"abc");
        assert!(r.delete_byte(1));
        assert_eq!(r.chars(), b"ac");
    }

    #[test]
    fn delete_byte_out_of_range_is_refused() {
        let mut r = row(b"abc");
        assert!(!r.delete_byte(3));
        assert_eq!(r.chars(), b"abc");
    }

    #[test]
    fn split_off_returns_the_tail() {
        let mut r = row(b"hello world");
        let tail = r.split_off(5);
        assert_eq!(r.chars(), b"hello");
        assert_eq!(tail, b" world");
    }

    #[test]
    fn append_bytes_concatenates() {
        let mut r = row(b"foo");
        r.append_bytes(b"bar");
        assert_eq!(r.chars(), b"foobar");
    }

    // -- Search overlay -----------------------------------------------------

    #[test]
    fn paint_and_restore_match_overlay() {
        let mut r = row(b"alphabet");
        let saved = r.hl().to_vec();

        r.paint_match(0, 3);
        assert_eq!(r.hl()[0], Highlight::Match);
        assert_eq!(r.hl()[2], Highlight::Match);
        assert_eq!(r.hl()[3], Highlight::Normal);

        r.restore_hl(saved);
        assert!(r.hl().iter().all(|&h| h == Highlight::Normal));
    }

    #[test]
    fn paint_match_clamps_to_the_row() {
        let mut r = row(b"ab");
        r.paint_match(1, 10);
        assert_eq!(r.hl()[0], Highlight::Normal);
        assert_eq!(r.hl()[1], Highlight::Match);
    }
}
