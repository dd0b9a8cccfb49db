//! Indentation columns
//!
//! Block membership is decided purely by indentation. A column is the number of
//! leading whitespace characters, with each tab counting as `tab_width` columns.

/// Tab width used when none is configured.
pub const DEFAULT_TAB_WIDTH: usize = 8;

/// Column of the first non-whitespace character of `text`.
pub fn indentation(text: &str, tab_width: usize) -> usize {
    text.chars()
        .take_while(|c| c.is_whitespace() && *c != '\n' && *c != '\r')
        .map(|c| if c == '\t' { tab_width } else { 1 })
        .sum()
}

/// Replace the leading whitespace of `text` with `columns` spaces.
pub fn reindent(text: &str, columns: usize) -> String {
    let body = text.trim_start_matches(|c: char| c.is_whitespace() && c != '\n' && c != '\r');
    let mut out = String::with_capacity(columns + body.len());
    out.extend(std::iter::repeat(' ').take(columns));
    out.push_str(body);
    out
}
