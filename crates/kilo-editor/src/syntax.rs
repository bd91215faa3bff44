//! Syntax highlighting — per-row highlight classes and language descriptors.
//!
//! Highlighting is computed per rendered row by a single left-to-right scan
//! that tracks three pieces of state: whether the previous character was a
//! separator, whether we are inside a string (and which quote opened it),
//! and whether we are inside a multi-line comment. The multi-line comment
//! state is the only state that crosses rows: a row that ends inside an
//! unterminated comment seeds the next row's scan, and the buffer
//! propagates that seed forward with an iterative worklist.
//!
//! Languages are described by a static table of [`Syntax`] descriptors:
//! filename match patterns, a keyword list (a trailing `|` marks the
//! secondary class used for type names), comment markers, and feature
//! flags. The table lives for the whole process; a buffer holds at most a
//! `&'static` reference into it.

use bitflags::bitflags;

// ---------------------------------------------------------------------------
// Highlight classes
// ---------------------------------------------------------------------------

/// The highlight class of one rendered byte.
///
/// Every byte of a row's render gets exactly one class; the frame composer
/// maps classes to SGR color codes at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Normal,
    Comment,
    MultilineComment,
    Keyword1,
    Keyword2,
    String,
    Number,
    /// Transient search-match overlay, painted and restored by the search.
    Match,
}

impl Highlight {
    /// The ANSI SGR foreground code for this class.
    #[must_use]
    pub const fn color(self) -> u8 {
        match self {
            Self::Normal => 39,
            Self::Comment | Self::MultilineComment => 36,
            Self::Keyword1 => 33,
            Self::Keyword2 => 32,
            Self::String => 35,
            Self::Number => 31,
            Self::Match => 34,
        }
    }
}

bitflags! {
    /// Which token classes a language wants highlighted.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SyntaxFlags: u8 {
        /// Highlight numeric literals.
        const NUMBERS = 1 << 0;
        /// Highlight string and character literals.
        const STRINGS = 1 << 1;
    }
}

// ---------------------------------------------------------------------------
// Language descriptors
// ---------------------------------------------------------------------------

/// An immutable language description.
///
/// `filematch` patterns starting with `.` match the filename's extension
/// (the substring from the last `.`); any other pattern matches as a
/// substring of the filename. Keywords carrying a trailing `|` belong to
/// the secondary class ([`Highlight::Keyword2`]) — conventionally type
/// names.
#[derive(Debug)]
pub struct Syntax {
    /// Display name shown in the status bar.
    pub filetype: &'static str,
    /// Filename patterns that select this language.
    pub filematch: &'static [&'static str],
    /// Keywords; a trailing `|` marks the secondary class.
    pub keywords: &'static [&'static str],
    /// Single-line comment marker, if the language has one.
    pub singleline_comment: Option<&'static str>,
    /// Multi-line comment open/close markers, if the language has them.
    pub multiline_comment: Option<(&'static str, &'static str)>,
    /// Which token classes to highlight.
    pub flags: SyntaxFlags,
}

/// The built-in language table. Process-lifetime immutable.
pub static SYNTAXES: &[Syntax] = &[
    Syntax {
        filetype: "c",
        filematch: &[".c", ".h", ".cpp"],
        keywords: &[
            "switch", "if", "while", "for", "break", "continue", "return", "else", "struct",
            "union", "typedef", "static", "enum", "class", "case", "int|", "long|", "double|",
            "float|", "char|", "unsigned|", "signed|", "void|",
        ],
        singleline_comment: Some("//"),
        multiline_comment: Some(("/*", "*/")),
        flags: SyntaxFlags::NUMBERS.union(SyntaxFlags::STRINGS),
    },
    Syntax {
        filetype: "rust",
        filematch: &[".rs"],
        keywords: &[
            "fn", "let", "mut", "pub", "if", "else", "match", "while", "loop", "for", "in",
            "return", "break", "continue", "struct", "enum", "impl", "trait", "use", "mod",
            "const", "static", "unsafe", "move", "ref", "where", "as", "dyn", "crate", "super",
            "u8|", "u16|", "u32|", "u64|", "usize|", "i8|", "i16|", "i32|", "i64|", "isize|",
            "f32|", "f64|", "bool|", "char|", "str|", "String|", "Vec|", "Option|", "Result|",
            "Self|",
        ],
        singleline_comment: Some("//"),
        multiline_comment: Some(("/*", "*/")),
        flags: SyntaxFlags::NUMBERS.union(SyntaxFlags::STRINGS),
    },
];

/// Pick the language for a filename, or `None` if nothing matches.
///
/// Patterns are tried in table order; the first hit wins.
#[must_use]
pub fn detect(filename: &str) -> Option<&'static Syntax> {
    let extension = filename.rfind('.').map(|dot| &filename[dot..]);

    for syntax in SYNTAXES {
        for pattern in syntax.filematch {
            let matched = if pattern.starts_with('.') {
                extension == Some(pattern)
            } else {
                filename.contains(pattern)
            };
            if matched {
                return Some(syntax);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// The row scanner
// ---------------------------------------------------------------------------

/// Is this byte a token separator?
#[must_use]
pub fn is_separator(c: u8) -> bool {
    c.is_ascii_whitespace() || c == 0 || b",.()+-/=~%<>[];".contains(&c)
}

/// Highlight one rendered row.
///
/// `in_comment` seeds the scanner with the predecessor row's open-comment
/// state. Returns the per-byte classes (same length as `render`) and
/// whether the row ends inside an unterminated multi-line comment.
#[must_use]
pub fn highlight_row(render: &[u8], syntax: &Syntax, in_comment: bool) -> (Vec<Highlight>, bool) {
    let mut hl = vec![Highlight::Normal; render.len()];
    let mut prev_sep = true;
    let mut in_string: Option<u8> = None;
    let mut in_comment = in_comment;

    let mut i = 0;
    while i < render.len() {
        let c = render[i];
        let prev_hl = if i > 0 { hl[i - 1] } else { Highlight::Normal };

        // Single-line comment: paints to end of row, nothing can follow.
        if let Some(marker) = syntax.singleline_comment {
            if in_string.is_none() && !in_comment && render[i..].starts_with(marker.as_bytes()) {
                for h in &mut hl[i..] {
                    *h = Highlight::Comment;
                }
                break;
            }
        }

        // Multi-line comment state machine.
        if let Some((open, close)) = syntax.multiline_comment {
            if in_string.is_none() {
                if in_comment {
                    hl[i] = Highlight::MultilineComment;
                    if render[i..].starts_with(close.as_bytes()) {
                        for h in &mut hl[i..i + close.len()] {
                            *h = Highlight::MultilineComment;
                        }
                        i += close.len();
                        in_comment = false;
                        prev_sep = true;
                        continue;
                    }
                    i += 1;
                    continue;
                } else if render[i..].starts_with(open.as_bytes()) {
                    for h in &mut hl[i..i + open.len()] {
                        *h = Highlight::MultilineComment;
                    }
                    i += open.len();
                    in_comment = true;
                    continue;
                }
            }
        }

        // Strings: a backslash protects the next byte.
        if syntax.flags.contains(SyntaxFlags::STRINGS) {
            if let Some(quote) = in_string {
                hl[i] = Highlight::String;
                if c == b'\\' && i + 1 < render.len() {
                    hl[i + 1] = Highlight::String;
                    i += 2;
                    continue;
                }
                if c == quote {
                    in_string = None;
                }
                i += 1;
                prev_sep = true;
                continue;
            } else if c == b'"' || c == b'\'' {
                in_string = Some(c);
                hl[i] = Highlight::String;
                i += 1;
                continue;
            }
        }

        // Numbers: digits after a separator or continuing a number, and a
        // decimal point continuing a number.
        if syntax.flags.contains(SyntaxFlags::NUMBERS)
            && ((c.is_ascii_digit() && (prev_sep || prev_hl == Highlight::Number))
                || (c == b'.' && prev_hl == Highlight::Number))
        {
            hl[i] = Highlight::Number;
            i += 1;
            prev_sep = false;
            continue;
        }

        // Keywords: only start at a separator boundary and must end at one.
        if prev_sep {
            let mut matched = false;
            for keyword in syntax.keywords {
                let (word, class) = match keyword.strip_suffix('|') {
                    Some(word) => (word, Highlight::Keyword2),
                    None => (*keyword, Highlight::Keyword1),
                };
                let end = i + word.len();
                if render[i..].starts_with(word.as_bytes())
                    && render.get(end).map_or(true, |&b| is_separator(b))
                {
                    for h in &mut hl[i..end] {
                        *h = class;
                    }
                    i = end;
                    matched = true;
                    break;
                }
            }
            if matched {
                prev_sep = false;
                continue;
            }
        }

        prev_sep = is_separator(c);
        i += 1;
    }

    (hl, in_comment)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
