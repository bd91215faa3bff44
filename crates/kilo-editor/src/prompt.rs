//! Prompt — the bottom-line mini-input-loop.
//!
//! `prompt` drives its own small read/refresh loop on top of the normal
//! frame composer: the template's `{}` is replaced by the input assembled
//! so far and shown as the status message, so the user types "into" the
//! message bar. ENTER with a non-empty input confirms it; ESC cancels and
//! yields nothing.
//!
//! An observer hook sees every key together with the input at that
//! moment. That one hook is what turns the save-as prompt into an
//! incremental search: the search observer reacts to each keystroke by
//! moving the cursor to the next match while the user is still typing.
//! Observer state lives in the observer value itself — the prompt knows
//! nothing about searching.

use std::io;

use kilo_term::input::{self, ctrl, Key};
use kilo_term::terminal::Tty;

use crate::editor::Editor;

/// Sees every prompt keystroke with the input assembled so far.
pub trait PromptObserver {
    /// Called once per key, after the key was applied to the input.
    fn on_key(&mut self, editor: &mut Editor, input: &str, key: Key);
}

/// The do-nothing observer for plain prompts (save-as).
struct Silent;

impl PromptObserver for Silent {
    fn on_key(&mut self, _editor: &mut Editor, _input: &str, _key: Key) {}
}

/// Run a prompt without an observer. See [`prompt_with`].
///
/// # Errors
///
/// Returns an error if reading keys or writing frames fails.
pub fn prompt(editor: &mut Editor, tty: &mut impl Tty, template: &str) -> io::Result<Option<String>> {
    prompt_with(editor, tty, template, &mut Silent)
}

/// Run a prompt, returning the confirmed input or `None` on cancel.
///
/// `template` contains a `{}` placeholder for the live input. Keys:
/// printable bytes append, BACKSPACE/DEL/CTRL-H trim, ESC cancels,
/// ENTER confirms a non-empty input. The observer sees every key,
/// including the terminating ones.
///
/// # Errors
///
/// Returns an error if reading keys or writing frames fails.
pub fn prompt_with<O: PromptObserver>(
    editor: &mut Editor,
    tty: &mut impl Tty,
    template: &str,
    observer: &mut O,
) -> io::Result<Option<String>> {
    let mut input = String::new();

    loop {
        editor.set_status_message(template.replace("{}", &input));
        editor.refresh_screen(tty)?;

        let key = input::next_key(tty)?;
        match key {
            Key::Backspace | Key::Delete => {
                input.pop();
            }
            Key::Byte(c) if c == ctrl(b'h') => {
                input.pop();
            }
            Key::Escape => {
                editor.set_status_message("");
                observer.on_key(editor, &input, key);
                return Ok(None);
            }
            Key::Enter if !input.is_empty() => {
                editor.set_status_message("");
                observer.on_key(editor, &input, key);
                return Ok(Some(input));
            }
            Key::Byte(c) if c.is_ascii() && !c.is_ascii_control() => {
                input.push(c as char);
            }
            _ => {}
        }

        observer.on_key(editor, &input, key);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
