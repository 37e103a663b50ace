//! Markdown markup applied to a selection.

use crate::buffer::TextBuffer;
use crate::selection::Selection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A markup style the format engine can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Bold,
    Italic,
    Code,
    Heading,
    Quote,
    List,
    Link,
}

impl FormatKind {
    pub const ALL: [FormatKind; 7] = [
        FormatKind::Bold,
        FormatKind::Italic,
        FormatKind::Code,
        FormatKind::Heading,
        FormatKind::Quote,
        FormatKind::List,
        FormatKind::Link,
    ];

    /// Returns the (prefix, suffix) inserted around the selected text.
    pub fn markers(self) -> (&'static str, &'static str) {
        match self {
            FormatKind::Bold => ("**", "**"),
            FormatKind::Italic => ("_", "_"),
            FormatKind::Code => ("`", "`"),
            FormatKind::Heading => ("# ", ""),
            FormatKind::Quote => ("> ", ""),
            FormatKind::List => ("- ", ""),
            FormatKind::Link => ("[", "](url)"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FormatKind::Bold => "bold",
            FormatKind::Italic => "italic",
            FormatKind::Code => "code",
            FormatKind::Heading => "heading",
            FormatKind::Quote => "quote",
            FormatKind::List => "list",
            FormatKind::Link => "link",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown format: {s}"))
    }
}

/// Wraps `selection` in `buffer` with the markers for `kind`.
///
/// Returns the new content and a selection covering the original text at
/// its shifted position. Existing markers are not detected, so wrapping
/// twice nests the markup.
pub fn wrap(buffer: &TextBuffer, kind: FormatKind, selection: &Selection) -> (String, Selection) {
    let (prefix, suffix) = kind.markers();
    let mut out = buffer.clone();
    // Suffix first so the start offset stays valid.
    out.insert(selection.end, suffix);
    out.insert(selection.start, prefix);

    let shift = prefix.chars().count();
    let selection = Selection::new(
        selection.start + shift,
        selection.end + shift,
        selection.text.clone(),
    );
    (out.text(), selection)
}
