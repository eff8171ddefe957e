//! Markdown text utilities shared by the Markdown importer and exporter.
//!
//! - [`escape`]: escaping text so that CommonMark reads it back literally
//! - [`front_matter`]: the optional `---` header block
//! - [`outline`]: ATX headings outside fenced code, used to split a
//!   document into nested sections
//!
//! None of these parse Markdown inline syntax; that is left to
//! `pulldown-cmark` in the importer.

mod escape;
mod front_matter;
mod outline;

pub use escape::escape_markdown;
pub use front_matter::{render_front_matter, split_front_matter};
pub use outline::{HeadingLine, atx_headings};
