//! ISBN recognition and URN normalization.

use std::sync::LazyLock;

use regex::Regex;

static ISBN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ISBN(?:-1[03])?:?\s*([0-9][0-9 \-]*[0-9Xx])$").expect("valid ISBN pattern")
});

/// Return the digits of an `ISBN ...` string when it is ISBN-shaped.
///
/// Digits may be grouped with spaces or dashes; 9 to 13 digits in total
/// (a trailing `X` check digit counts as one).
pub fn isbn_digits(value: &str) -> Option<String> {
    let captures = ISBN_PATTERN.captures(value.trim())?;
    let digits: String = captures[1]
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X' || *c == 'x')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    (9..=13).contains(&digits.len()).then_some(digits)
}

/// Normalize an ISBN string to `urn:isbn:<digits>`.
///
/// ```
/// use bindery::metadata::isbn_to_urn;
///
/// assert_eq!(isbn_to_urn("ISBN 81-7525-766-0").as_deref(), Some("urn:isbn:8175257660"));
/// assert_eq!(isbn_to_urn("not an isbn"), None);
/// ```
pub fn isbn_to_urn(value: &str) -> Option<String> {
    isbn_digits(value).map(|digits| format!("urn:isbn:{digits}"))
}
