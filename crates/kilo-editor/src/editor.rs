//! Editor — the owned top-level state and the key dispatch.
//!
//! One `Editor` value holds everything: the buffer, the cursor, the view,
//! the transient status message, and the quit guard. It is threaded
//! explicitly through every controller call — there is no global editor
//! state anywhere; the only process-wide singleton is the terminal's
//! panic-restore backup, because the TTY itself is process-wide.
//!
//! Each loop iteration composes and writes one frame, reads one logical
//! key, and dispatches it here. Editing keys mutate the buffer through
//! its invariant-preserving operations; motion keys move the cursor;
//! CTRL-S and CTRL-F run their own mini-loops (prompt, search) that
//! reuse the same frame composer.

use std::io;
use std::time::{Duration, Instant};

use kilo_term::input::{ctrl, Key};
use kilo_term::output::AppendBuffer;
use kilo_term::terminal::{Size, Tty};

use crate::buffer::Buffer;
use crate::cursor::Cursor;
use crate::prompt;
use crate::row::Row;
use crate::search::SearchState;
use crate::view::View;

/// How many consecutive CTRL-Q presses discard unsaved changes.
pub const QUIT_TIMES: u8 = 3;

/// Status messages disappear after this long.
const MESSAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Status messages are bounded; the bar truncates to the screen anyway.
const MESSAGE_MAX: usize = 80;

/// What the main loop should do after a keypress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Keep running.
    Continue,
    /// Exit cleanly.
    Quit,
}

/// A transient status-bar message with its birth time.
#[derive(Debug)]
struct StatusMessage {
    text: String,
    time: Instant,
}

/// The complete editor state.
pub struct Editor {
    pub(crate) buffer: Buffer,
    pub(crate) cursor: Cursor,
    pub(crate) view: View,
    status: Option<StatusMessage>,
    quit_times: u8,
}

impl Editor {
    /// An editor with an empty, nameless buffer.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            buffer: Buffer::new(),
            cursor: Cursor::new(),
            view: View::new(size),
            status: None,
            quit_times: QUIT_TIMES,
        }
    }

    /// An editor with a file loaded from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read — fatal at startup.
    pub fn open(size: Size, filename: String) -> io::Result<Self> {
        let mut editor = Self::new(size);
        editor.buffer = Buffer::open(filename)?;
        Ok(editor)
    }

    /// Adopt a new terminal geometry after SIGWINCH.
    pub fn resize(&mut self, size: Size) {
        self.view.set_size(size);
    }

    // -- Status message -----------------------------------------------------

    /// Set the status-bar message and restart its 5-second clock.
    pub fn set_status_message(&mut self, text: impl Into<String>) {
        let mut text = text.into();
        if text.len() > MESSAGE_MAX {
            let mut end = MESSAGE_MAX;
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            text.truncate(end);
        }
        self.status = Some(StatusMessage {
            text,
            time: Instant::now(),
        });
    }

    /// The status message, if non-empty and younger than five seconds.
    #[must_use]
    pub fn status_text(&self) -> Option<&str> {
        let msg = self.status.as_ref()?;
        if msg.text.is_empty() || msg.time.elapsed() >= MESSAGE_TIMEOUT {
            return None;
        }
        Some(&msg.text)
    }

    // -- Frame --------------------------------------------------------------

    /// Compose the current frame and write it to the terminal in one call.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal write fails.
    pub fn refresh_screen(&mut self, tty: &mut impl Tty) -> io::Result<()> {
        self.view.scroll(&mut self.cursor, &self.buffer);

        let mut frame = AppendBuffer::new();
        let message = self.status_text();
        self.view
            .render_frame(&self.buffer, &self.cursor, message, &mut frame)?;
        tty.write_frame(frame.as_bytes())
    }

    // -- Dispatch -----------------------------------------------------------

    /// Handle one logical key.
    ///
    /// Any key other than CTRL-Q re-arms the quit guard.
    ///
    /// # Errors
    ///
    /// Returns an error if a nested mini-loop (prompt, search) hits a
    /// terminal failure.
    pub fn process_key(&mut self, key: Key, tty: &mut impl Tty) -> io::Result<Action> {
        match key {
            Key::Enter => self.insert_newline(),

            Key::Byte(c) if c == ctrl(b'q') => {
                if self.buffer.is_dirty() && self.quit_times > 1 {
                    self.quit_times -= 1;
                    self.set_status_message(format!(
                        "WARNING!!! File has unsaved changes. \
                         Press Ctrl-Q {} more times to quit.",
                        self.quit_times
                    ));
                    return Ok(Action::Continue);
                }
                return Ok(Action::Quit);
            }

            Key::Byte(c) if c == ctrl(b's') => self.save(tty)?,
            Key::Byte(c) if c == ctrl(b'f') => self.find(tty)?,

            Key::Home => self.cursor.x = 0,
            Key::End => {
                if let Some(row) = self.buffer.row(self.cursor.y) {
                    self.cursor.x = row.len();
                }
            }

            Key::Backspace => self.delete_char(),
            Key::Byte(c) if c == ctrl(b'h') => self.delete_char(),
            Key::Delete => {
                self.cursor.move_key(Key::ArrowRight, &self.buffer);
                self.delete_char();
            }

            Key::PageUp | Key::PageDown => self.page_move(key),

            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                self.cursor.move_key(key, &self.buffer);
            }

            // CTRL-L asks for a repaint; every loop iteration repaints.
            Key::Escape => {}
            Key::Byte(c) if c == ctrl(b'l') => {}

            Key::Byte(c) => self.insert_char(c),
        }

        self.quit_times = QUIT_TIMES;
        Ok(Action::Continue)
    }

    /// PAGE_UP/PAGE_DOWN: snap to the window edge, then move a windowful.
    fn page_move(&mut self, key: Key) {
        if key == Key::PageUp {
            self.cursor.y = self.view.rowoff;
        } else {
            self.cursor.y =
                (self.view.rowoff + self.view.rows.saturating_sub(1)).min(self.buffer.len());
        }

        let step = if key == Key::PageUp {
            Key::ArrowUp
        } else {
            Key::ArrowDown
        };
        for _ in 0..self.view.rows {
            self.cursor.move_key(step, &self.buffer);
        }
    }

    // -- Editing operations -------------------------------------------------

    /// Insert one byte at the cursor, growing the buffer onto the virtual
    /// trailing line if needed.
    pub fn insert_char(&mut self, c: u8) {
        if self.cursor.y == self.buffer.len() {
            self.buffer.insert_row(self.buffer.len(), Vec::new());
        }
        self.buffer.row_insert_char(self.cursor.y, self.cursor.x, c);
        self.cursor.x += 1;
    }

    /// Break the current line at the cursor.
    pub fn insert_newline(&mut self) {
        if self.cursor.x == 0 {
            self.buffer.insert_row(self.cursor.y, Vec::new());
        } else {
            self.buffer.split_row(self.cursor.y, self.cursor.x);
        }
        self.cursor.y += 1;
        self.cursor.x = 0;
    }

    /// Delete the byte left of the cursor, joining lines at column zero.
    pub fn delete_char(&mut self) {
        if self.cursor.y == self.buffer.len() {
            return;
        }
        if self.cursor.x == 0 && self.cursor.y == 0 {
            return;
        }

        if self.cursor.x > 0 {
            self.buffer.row_delete_char(self.cursor.y, self.cursor.x - 1);
            self.cursor.x -= 1;
        } else {
            let prev_len = self.buffer.row(self.cursor.y - 1).map_or(0, Row::len);
            let line = self
                .buffer
                .row(self.cursor.y)
                .map_or_else(Vec::new, |r| r.chars().to_vec());

            self.cursor.x = prev_len;
            self.buffer.row_append_bytes(self.cursor.y - 1, &line);
            self.buffer.delete_row(self.cursor.y);
            self.cursor.y -= 1;
        }
    }

    // -- Save and search ----------------------------------------------------

    /// Save the buffer, prompting for a filename on a nameless buffer.
    ///
    /// Write failures surface as a status message; `dirty` is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error only if the save-as prompt hits a terminal failure.
    pub fn save(&mut self, tty: &mut impl Tty) -> io::Result<()> {
        if self.buffer.filename().is_none() {
            let Some(name) = prompt::prompt(self, tty, "Save as: {} (ESC to cancel)")? else {
                self.set_status_message("Save aborted");
                return Ok(());
            };
            self.buffer.set_filename(name);
        }

        match self.buffer.save() {
            Ok(len) => self.set_status_message(format!("{len} bytes written to disk")),
            Err(e) => self.set_status_message(format!("Can't save! I/O error: {e}")),
        }
        Ok(())
    }

    /// Incremental search: prompt with a live observer, restore on cancel.
    ///
    /// # Errors
    ///
    /// Returns an error if the prompt hits a terminal failure.
    pub fn find(&mut self, tty: &mut impl Tty) -> io::Result<()> {
        let saved_cursor = self.cursor;
        let saved_rowoff = self.view.rowoff;
        let saved_coloff = self.view.coloff;

        let mut search = SearchState::new();
        let query =
            prompt::prompt_with(self, tty, "Search: {} (Use ESC/Arrows/Enter)", &mut search)?;

        if query.is_none() {
            self.cursor = saved_cursor;
            self.view.rowoff = saved_rowoff;
            self.view.coloff = saved_coloff;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::fs;

    const SIZE: Size = Size { cols: 80, rows: 24 };

    /// Scripted terminal double: queued input bytes (`None` = poll expiry),
    /// captured frames. Reading past the script errors out so a runaway
    /// mini-loop fails instead of hanging.
    struct Script {
        input: VecDeque<Option<u8>>,
        frames: Vec<u8>,
    }

    impl Script {
        fn silent() -> Self {
            Self {
                input: VecDeque::new(),
                frames: Vec::new(),
            }
        }

        fn typing(bytes: &[u8]) -> Self {
            Self {
                input: bytes.iter().map(|&b| Some(b)).collect(),
                frames: Vec::new(),
            }
        }

        fn push_timeout(&mut self) {
            self.input.push_back(None);
        }
    }

    impl Tty for Script {
        fn read_byte(&mut self) -> io::Result<Option<u8>> {
            self.input
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "script exhausted"))
        }

        fn write_frame(&mut self, bytes: &[u8]) -> io::Result<()> {
            self.frames.extend_from_slice(bytes);
            Ok(())
        }
    }

    fn editor_with(lines: &[&str]) -> Editor {
        let mut ed = Editor::new(SIZE);
        for line in lines {
            ed.buffer.insert_row(ed.buffer.len(), line.as_bytes().to_vec());
        }
        ed
    }

    fn press(ed: &mut Editor, key: Key) -> Action {
        ed.process_key(key, &mut Script::silent()).unwrap()
    }

    fn type_str(ed: &mut Editor, text: &str) {
        for &b in text.as_bytes() {
            press(ed, Key::Byte(b));
        }
    }

    // -- Editing ------------------------------------------------------------

    #[test]
    fn typing_into_an_empty_buffer_creates_the_first_row() {
        let mut ed = Editor::new(SIZE);
        type_str(&mut ed, "hi");
        assert_eq!(ed.buffer.len(), 1);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"hi");
        assert_eq!(ed.cursor.x, 2);
        assert!(ed.buffer.is_dirty());
    }

    #[test]
    fn enter_splits_the_line_at_the_cursor() {
        let mut ed = editor_with(&["helloworld"]);
        ed.cursor.x = 5;
        press(&mut ed, Key::Enter);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"hello");
        assert_eq!(ed.buffer.row(1).unwrap().chars(), b"world");
        assert_eq!((ed.cursor.x, ed.cursor.y), (0, 1));
    }

    #[test]
    fn enter_at_column_zero_opens_a_line_above() {
        let mut ed = editor_with(&["text"]);
        press(&mut ed, Key::Enter);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"");
        assert_eq!(ed.buffer.row(1).unwrap().chars(), b"text");
        assert_eq!((ed.cursor.x, ed.cursor.y), (0, 1));
    }

    #[test]
    fn backspace_deletes_left_of_the_cursor() {
        let mut ed = editor_with(&["abc"]);
        ed.cursor.x = 2;
        press(&mut ed, Key::Backspace);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"ac");
        assert_eq!(ed.cursor.x, 1);
    }

    #[test]
    fn backspace_at_column_zero_joins_lines() {
        let mut ed = editor_with(&["hello", "world"]);
        ed.cursor.y = 1;
        press(&mut ed, Key::Backspace);
        assert_eq!(ed.buffer.len(), 1);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"helloworld");
        assert_eq!((ed.cursor.x, ed.cursor.y), (5, 0));
    }

    #[test]
    fn backspace_at_the_origin_is_a_no_op() {
        let mut ed = editor_with(&["abc"]);
        let dirty = ed.buffer.dirty();
        press(&mut ed, Key::Backspace);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"abc");
        assert_eq!(ed.buffer.dirty(), dirty);
    }

    #[test]
    fn backspace_on_the_virtual_line_is_a_no_op() {
        let mut ed = editor_with(&["abc"]);
        ed.cursor.y = 1;
        press(&mut ed, Key::Backspace);
        assert_eq!(ed.buffer.len(), 1);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"abc");
    }

    #[test]
    fn delete_removes_the_byte_under_the_cursor() {
        let mut ed = editor_with(&["abc"]);
        ed.cursor.x = 1;
        press(&mut ed, Key::Delete);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"ac");
        assert_eq!(ed.cursor.x, 1);
    }

    #[test]
    fn delete_at_line_end_joins_with_the_next_line() {
        let mut ed = editor_with(&["ab", "cd"]);
        ed.cursor.x = 2;
        press(&mut ed, Key::Delete);
        assert_eq!(ed.buffer.len(), 1);
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"abcd");
    }

    #[test]
    fn ctrl_h_is_backspace() {
        let mut ed = editor_with(&["ab"]);
        ed.cursor.x = 2;
        press(&mut ed, Key::Byte(ctrl(b'h')));
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"a");
    }

    #[test]
    fn tab_inserts_a_literal_tab_byte() {
        let mut ed = Editor::new(SIZE);
        press(&mut ed, Key::Byte(b'\t'));
        assert_eq!(ed.buffer.row(0).unwrap().chars(), b"\t");
        assert_eq!(ed.buffer.row(0).unwrap().render(), b"        ");
    }

    // -- Motions ------------------------------------------------------------

    #[test]
    fn home_and_end_jump_within_the_line() {
        let mut ed = editor_with(&["some text"]);
        press(&mut ed, Key::End);
        assert_eq!(ed.cursor.x, 9);
        press(&mut ed, Key::Home);
        assert_eq!(ed.cursor.x, 0);
    }

    #[test]
    fn end_on_the_virtual_line_is_inert() {
        let mut ed = editor_with(&["abc"]);
        ed.cursor.y = 1;
        press(&mut ed, Key::End);
        assert_eq!(ed.cursor.x, 0);
    }

    #[test]
    fn page_down_moves_a_windowful() {
        let lines: Vec<String> = (0..100).map(|i| format!("l{i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut ed = editor_with(&refs);

        press(&mut ed, Key::PageDown);
        // Snapped to the window bottom (rowoff 0 + 21), then 22 moves down.
        assert_eq!(ed.cursor.y, 21 + 22);
    }

    #[test]
    fn page_up_returns_to_the_top() {
        let lines: Vec<String> = (0..100).map(|i| format!("l{i}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut ed = editor_with(&refs);
        ed.cursor.y = 50;
        ed.view.rowoff = 40;

        press(&mut ed, Key::PageUp);
        assert_eq!(ed.cursor.y, 40_usize.saturating_sub(22));
    }

    #[test]
    fn page_down_clamps_to_the_virtual_line() {
        let mut ed = editor_with(&["a", "b"]);
        press(&mut ed, Key::PageDown);
        assert_eq!(ed.cursor.y, 2);
    }

    // -- Quit guard ---------------------------------------------------------

    #[test]
    fn clean_buffer_quits_immediately() {
        let mut ed = editor_with(&[]);
        assert_eq!(press(&mut ed, Key::Byte(ctrl(b'q'))), Action::Quit);
    }

    #[test]
    fn dirty_buffer_needs_three_presses() {
        let mut ed = Editor::new(SIZE);
        type_str(&mut ed, "x");
        assert!(ed.buffer.is_dirty());

        assert_eq!(press(&mut ed, Key::Byte(ctrl(b'q'))), Action::Continue);
        assert!(ed.status_text().unwrap().contains("unsaved changes"));
        assert_eq!(ed.quit_times, 2);

        assert_eq!(press(&mut ed, Key::Byte(ctrl(b'q'))), Action::Continue);
        assert_eq!(press(&mut ed, Key::Byte(ctrl(b'q'))), Action::Quit);
    }

    #[test]
    fn any_other_key_rearms_the_quit_guard() {
        let mut ed = Editor::new(SIZE);
        type_str(&mut ed, "x");

        press(&mut ed, Key::Byte(ctrl(b'q')));
        assert_eq!(ed.quit_times, 2);
        press(&mut ed, Key::ArrowLeft);
        assert_eq!(ed.quit_times, QUIT_TIMES);
    }

    #[test]
    fn escape_and_ctrl_l_are_no_ops() {
        let mut ed = editor_with(&["abc"]);
        let dirty = ed.buffer.dirty();
        press(&mut ed, Key::Escape);
        press(&mut ed, Key::Byte(ctrl(b'l')));
        assert_eq!(ed.buffer.dirty(), dirty);
        assert_eq!((ed.cursor.x, ed.cursor.y), (0, 0));
    }

    // -- Status message -----------------------------------------------------

    #[test]
    fn status_message_is_visible_while_fresh() {
        let mut ed = Editor::new(SIZE);
        ed.set_status_message("HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find");
        assert_eq!(
            ed.status_text(),
            Some("HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find")
        );
    }

    #[test]
    fn empty_status_message_is_hidden() {
        let mut ed = Editor::new(SIZE);
        ed.set_status_message("");
        assert_eq!(ed.status_text(), None);
    }

    #[test]
    fn status_message_is_bounded() {
        let mut ed = Editor::new(SIZE);
        ed.set_status_message("x".repeat(500));
        assert_eq!(ed.status_text().unwrap().len(), 80);
    }

    // -- Save ---------------------------------------------------------------

    #[test]
    fn typed_text_saves_through_the_save_as_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        let path_str = path.to_string_lossy().into_owned();

        let mut ed = Editor::new(SIZE);
        type_str(&mut ed, "hello");
        press(&mut ed, Key::Enter);
        type_str(&mut ed, "world");

        // CTRL-S prompts for the filename; answer with the path and Enter.
        let mut script = Script::typing(path_str.as_bytes());
        script.input.push_back(Some(b'\r'));
        ed.process_key(Key::Byte(ctrl(b's')), &mut script).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"hello\nworld\n");
        assert_eq!(
            ed.status_text(),
            Some("12 bytes written to disk"),
        );
        assert_eq!(ed.buffer.dirty(), 0);
    }

    #[test]
    fn cancelled_save_as_aborts_without_writing() {
        let mut ed = Editor::new(SIZE);
        type_str(&mut ed, "x");

        let mut script = Script::silent();
        script.input.push_back(Some(0x1b));
        script.push_timeout();
        script.push_timeout();
        ed.process_key(Key::Byte(ctrl(b's')), &mut script).unwrap();

        assert_eq!(ed.status_text(), Some("Save aborted"));
        assert!(ed.buffer.filename().is_none());
        assert!(ed.buffer.is_dirty());
    }

    #[test]
    fn save_with_a_filename_skips_the_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known.txt");
        fs::write(&path, b"old\n").unwrap();

        let mut ed = Editor::open(SIZE, path.to_string_lossy().into_owned()).unwrap();
        ed.cursor.y = 0;
        ed.cursor.x = 3;
        type_str(&mut ed, "er");
        ed.save(&mut Script::silent()).unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"older\n");
        assert_eq!(ed.buffer.dirty(), 0);
    }

    #[test]
    fn failed_save_reports_and_stays_dirty() {
        let mut ed = Editor::new(SIZE);
        type_str(&mut ed, "x");
        ed.buffer.set_filename("/nonexistent/dir/file.txt".to_string());
        ed.save(&mut Script::silent()).unwrap();

        assert!(ed.status_text().unwrap().starts_with("Can't save! I/O error:"));
        assert!(ed.buffer.is_dirty());
    }

    // -- Search (end to end) ------------------------------------------------

    #[test]
    fn search_walks_matches_and_restores_on_escape() {
        let mut ed = editor_with(&["alpha", "beta", "alphabet"]);

        // CTRL-F, type "alp", ArrowDown twice, then ESC (lone, resolved
        // by two poll expiries).
        let mut script = Script::typing(b"alp");
        for b in *b"\x1b[B\x1b[B" {
            script.input.push_back(Some(b));
        }
        script.input.push_back(Some(0x1b));
        script.push_timeout();
        script.push_timeout();

        ed.process_key(Key::Byte(ctrl(b'f')), &mut script).unwrap();

        // ESC restored the pre-search cursor and scroll.
        assert_eq!((ed.cursor.x, ed.cursor.y), (0, 0));
        assert_eq!(ed.view.rowoff, 0);
        assert_eq!(ed.view.coloff, 0);

        // Every match overlay has been reverted.
        for row in ed.buffer.rows() {
            assert!(
                row.hl().iter().all(|&h| h == crate::syntax::Highlight::Normal),
                "stale match overlay on {:?}",
                String::from_utf8_lossy(row.chars())
            );
        }
    }

    #[test]
    fn search_enter_keeps_the_cursor_on_the_match() {
        let mut ed = editor_with(&["alpha", "beta", "alphabet"]);

        let mut script = Script::typing(b"beta");
        script.input.push_back(Some(b'\r'));
        ed.process_key(Key::Byte(ctrl(b'f')), &mut script).unwrap();

        assert_eq!((ed.cursor.x, ed.cursor.y), (0, 1));
    }
}
