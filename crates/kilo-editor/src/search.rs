//! Search — incremental search with match highlighting.
//!
//! Searches are literal byte matches over the *rendered* rows, so
//! TAB-expanded content is found by its visible form. The search runs as
//! a prompt observer: every keystroke in the search prompt lands in
//! [`SearchState::on_key`], which walks to the next match and repaints.
//!
//! # Search flow
//!
//! 1. CTRL-F saves the cursor and scroll, then opens the prompt
//! 2. Each typed byte restarts the walk from the top; each arrow key
//!    steps to the next or previous match, wrapping cyclically
//! 3. ENTER confirms — the cursor stays on the match
//! 4. ESC cancels — the caller restores the saved cursor and scroll
//!
//! # Match highlighting
//!
//! The current match is painted [`Highlight::Match`] directly into its
//! row's highlight array. The row's previous highlights are saved here
//! and restored on the next observer call (or on termination), so the
//! overlay never outlives the step that drew it.

use kilo_term::input::Key;

use crate::editor::Editor;
use crate::prompt::PromptObserver;
use crate::syntax::Highlight;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    /// The row step for one walk iteration.
    const fn step(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

// ---------------------------------------------------------------------------
// SearchState
// ---------------------------------------------------------------------------

/// Per-search observer state, created fresh by each CTRL-F.
pub struct SearchState {
    /// Row of the last match, if any.
    last_match: Option<usize>,
    /// Direction of the next step.
    direction: SearchDirection,
    /// A row's pre-overlay highlights, with its row index.
    saved_hl: Option<(usize, Vec<Highlight>)>,
}

impl SearchState {
    /// Fresh search state: no match yet, walking forward.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_match: None,
            direction: SearchDirection::Forward,
            saved_hl: None,
        }
    }

    /// Drop any painted overlay, restoring the row's real highlights.
    fn restore_overlay(&mut self, editor: &mut Editor) {
        if let Some((row, hl)) = self.saved_hl.take() {
            if let Some(row) = editor.buffer.row_mut(row) {
                row.restore_hl(hl);
            }
        }
    }

    /// Walk the rows once, cyclically, looking for `query`.
    ///
    /// Starts stepping from the last match (or the top on a fresh query)
    /// and wraps at both ends. On a hit: move the cursor there, force the
    /// viewport to re-center on the next scroll, and paint the overlay.
    fn step_to_next_match(&mut self, editor: &mut Editor, query: &str) {
        let numrows = editor.buffer.len();
        if numrows == 0 || query.is_empty() {
            return;
        }

        let mut current = self.last_match.map_or(-1, |m| m as isize);
        for _ in 0..numrows {
            current += self.direction.step();
            if current == -1 {
                current = numrows as isize - 1;
            } else if current == numrows as isize {
                current = 0;
            }

            let at = current as usize;
            let row = &editor.buffer.rows()[at];
            let Some(offset) = find_bytes(row.render(), query.as_bytes()) else {
                continue;
            };

            self.last_match = Some(at);
            editor.cursor.y = at;
            editor.cursor.x = row.rx_to_cx(offset);
            // Park the offset past the last row so the next scroll snaps
            // the match into view.
            editor.view.rowoff = numrows;

            self.saved_hl = Some((at, row.hl().to_vec()));
            if let Some(row) = editor.buffer.row_mut(at) {
                row.paint_match(offset, query.len());
            }
            return;
        }
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptObserver for SearchState {
    fn on_key(&mut self, editor: &mut Editor, input: &str, key: Key) {
        self.restore_overlay(editor);

        match key {
            Key::Enter | Key::Escape => {
                self.last_match = None;
                self.direction = SearchDirection::Forward;
                return;
            }
            Key::ArrowRight | Key::ArrowDown => {
                self.direction = SearchDirection::Forward;
            }
            Key::ArrowLeft | Key::ArrowUp => {
                self.direction = SearchDirection::Backward;
            }
            _ => {
                // The query text changed: restart the walk.
                self.last_match = None;
                self.direction = SearchDirection::Forward;
            }
        }

        // Stepping backward needs a match to step from.
        if self.last_match.is_none() {
            self.direction = SearchDirection::Forward;
        }

        self.step_to_next_match(editor, input);
    }
}

/// First occurrence of `needle` in `haystack`, bytewise.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
