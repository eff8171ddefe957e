//! Markdown escaping.

/// Escape special Markdown characters in text.
///
/// Inline syntax is escaped everywhere:
/// - Backslash: `\\`
/// - Emphasis: `*`, `_`
/// - Links: `[`, `]`
/// - Code: `` ` ``
/// - Tables: `|`
/// - HTML and entities: `<`, `>`, `&`
///
/// Block syntax only where a block could start, at the beginning of a line:
/// headings (`#`), block quotes (`>`), bullets (`-`, `+`), setext underlines
/// (`=`) and the delimiter of an ordered list item (`1. `, `1) `).
///
/// # Examples
///
/// ```
/// use bindery::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("*bold*"), "\\*bold\\*");
/// assert_eq!(escape_markdown("1. not a list"), "1\\. not a list");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 10);
    let mut at_line_start = true;
    let mut leading_digits = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' | '*' | '_' | '[' | ']' | '`' | '|' | '<' | '>' | '&' => {
                result.push('\\');
                result.push(c);
            }
            '#' | '-' | '+' | '=' if at_line_start => {
                result.push('\\');
                result.push(c);
            }
            '.' | ')' if leading_digits && matches!(chars.peek(), None | Some(' ' | '\t')) => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
        leading_digits = c.is_ascii_digit() && (at_line_start || leading_digits);
        at_line_start = c == '\n' || (at_line_start && c == ' ');
    }

    result
}
