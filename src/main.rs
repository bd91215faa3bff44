// SPDX-License-Identifier: MIT
//
// kilo — a minimal raw-TTY terminal text editor.
//
// This is the main binary that wires together the crates:
//
//   kilo-term   → raw mode, window size, key decoding, frame writes
//   kilo-editor → buffer, cursor, highlighting, viewport, search
//
// Each keypress flows through:
//
//   stdin → next_key → Editor::process_key → buffer/cursor mutation
//   refresh_screen → frame composer → append buffer → one TTY write
//
// Layout:
//
//   ┌──────────────────────────────┐
//   │ text area (~ past the end)   │  ← rows - 2 (managed by View)
//   ├──────────────────────────────┤
//   │ status bar (INVERSE)         │  ← 1 row
//   ├──────────────────────────────┤
//   │ message bar (5s expiry)      │  ← 1 row
//   └──────────────────────────────┘
//
// The terminal's raw state is scoped: entered here, restored by
// Terminal::leave / Drop / the panic hook on every exit path. The fatal
// path clears the screen before reporting so the restored cooked-mode
// terminal comes back clean.

use std::env;
use std::io::{self, Write};
use std::process;

use kilo_editor::editor::{Action, Editor};
use kilo_term::input;
use kilo_term::terminal::{self, Terminal, Tty};

fn main() {
    let filename = env::args().nth(1);

    if let Err(e) = run(filename) {
        // The terminal has been restored by the time we get here; leave
        // it cleared and homed so the error is readable.
        let mut stdout = io::stdout();
        let _ = stdout.write_all(b"\x1b[2J\x1b[H");
        let _ = stdout.flush();
        eprintln!("kilo: {e}");
        process::exit(1);
    }
}

fn run(filename: Option<String>) -> io::Result<()> {
    if !terminal::is_tty() {
        return Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "standard input is not a terminal",
        ));
    }

    let mut term = Terminal::new()?;
    term.enter()?;
    let size = term.window_size()?;

    let mut editor = match filename {
        Some(name) => Editor::open(size, name)?,
        None => Editor::new(size),
    };
    editor.set_status_message("HELP: Ctrl-S = save | Ctrl-Q = quit | Ctrl-F = find");

    loop {
        editor.refresh_screen(&mut term)?;

        // Block for the next key, folding resizes in between polls.
        let key = loop {
            if term.take_resize() {
                editor.resize(term.refresh_size());
                editor.refresh_screen(&mut term)?;
            }
            if let Some(key) = input::poll_key(&mut term)? {
                break key;
            }
        };

        if editor.process_key(key, &mut term)? == Action::Quit {
            break;
        }
    }

    term.write_frame(b"\x1b[2J\x1b[H")?;
    term.leave()?;
    Ok(())
}
