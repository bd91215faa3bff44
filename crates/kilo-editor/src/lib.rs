//! # kilo-editor — Editor engine for kilo
//!
//! This crate contains the fundamental building blocks of the editor:
//!
//! - **[`row`]** — one logical line: raw bytes, TAB-expanded render,
//!   per-byte highlights, logical↔render column conversion
//! - **[`syntax`]** — highlight classes, the language descriptor table,
//!   and the per-row highlight scanner with cross-row comment state
//! - **[`buffer`]** — the ordered row sequence with file I/O, the dirty
//!   counter, and invariant-preserving mutations
//! - **[`cursor`]** — the logical cursor with motion and wrap rules
//! - **[`view`]** — scroll offsets and the frame composer
//! - **[`prompt`]** — the bottom-line mini-input-loop with its observer hook
//! - **[`search`]** — incremental directional search built on that hook
//! - **[`editor`]** — the owned top-level state and the key dispatch

pub mod buffer;
pub mod cursor;
pub mod editor;
pub mod prompt;
pub mod row;
pub mod search;
pub mod syntax;
pub mod view;

/// The version shown on the welcome screen.
pub const VERSION: &str = "0.0.1";
