//! Defines the [`Format`] type, which identifies the markup a post source file
//! is written in and knows how to turn that markup into HTML.

use pulldown_cmark::{html, Parser};
use std::fmt;

/// The source markup of a post.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Markdown, converted to HTML with [`pulldown_cmark`].
    Markdown,

    /// Already-rendered HTML, passed through untouched.
    Html,
}

/// Maps file extensions (without the leading `.`) onto formats. Lookups are
/// case-sensitive.
pub const FORMATS: &[(&str, Format)] = &[
    ("txt", Format::Markdown),
    ("md", Format::Markdown),
    ("html", Format::Html),
];

impl Format {
    /// Resolves a raw file extension (e.g., `md`) into a [`Format`]. Returns
    /// [`None`] for extensions that aren't registered in [`FORMATS`].
    pub fn from_extension(extension: &str) -> Option<Format> {
        FORMATS
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, format)| *format)
    }

    /// Converts `input` into HTML. Markdown is rendered with no extensions
    /// enabled; HTML is returned as-is.
    pub fn convert(&self, input: &[u8]) -> Vec<u8> {
        match self {
            Format::Markdown => {
                let markdown = String::from_utf8_lossy(input);
                let mut out = String::with_capacity(markdown.len() * 3 / 2);
                html::push_html(&mut out, Parser::new(&markdown));
                out.into_bytes()
            }
            Format::Html => input.to_vec(),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Format::Markdown => write!(f, "markdown"),
            Format::Html => write!(f, "html"),
        }
    }
}
