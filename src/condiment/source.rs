//! Pushback line source
//!
//!     The block state machine reads lines through a single cursor shared by every
//!     state, including recursive ones. A state that reads one line too far (the first
//!     line past the end of a block) hands it back with [`LineSource::push`], and the
//!     next call to `next` returns it before resuming the underlying sequence. This way
//!     every line is consumed exactly once per run.
//!
//!     Lines keep their terminators (`\n`, `\r\n`, or nothing for a final unterminated
//!     line), so text that passes through untouched is reproduced byte for byte.

use std::borrow::Cow;

/// One line of input, numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub number: usize,
    pub text: Cow<'a, str>,
}

impl<'a> Line<'a> {
    pub fn new(number: usize, text: impl Into<Cow<'a, str>>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }

    /// The line without surrounding whitespace or its terminator.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Whitespace-only (or empty) line.
    pub fn is_blank(&self) -> bool {
        self.trimmed().is_empty()
    }
}

/// A line iterator with single-item pushback.
pub struct LineSource<I: Iterator> {
    inner: I,
    pending: Option<I::Item>,
}

impl<'a> LineSource<TextLines<'a>> {
    /// Split `text` into numbered lines, keeping line terminators.
    pub fn from_text(text: &'a str) -> Self {
        Self::new(TextLines {
            inner: text.split_inclusive('\n').enumerate(),
        })
    }
}

impl<I: Iterator> LineSource<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            pending: None,
        }
    }

    /// Un-consume `item` so the next call to `next` returns it.
    ///
    /// Callers hold at most one unconsumed lookahead line at a time.
    pub fn push(&mut self, item: I::Item) {
        debug_assert!(self.pending.is_none(), "only one line may be pushed back");
        self.pending = Some(item);
    }

    /// True when a pushed-back item is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl<I: Iterator> Iterator for LineSource<I> {
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        self.pending.take().or_else(|| self.inner.next())
    }
}

/// Numbered lines of a borrowed text.
pub struct TextLines<'a> {
    inner: std::iter::Enumerate<std::str::SplitInclusive<'a, char>>,
}

impl<'a> Iterator for TextLines<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(index, text)| Line::new(index + 1, text))
    }
}
