//! Block state machine
//!
//!     The preprocessor reads a source line by line and classifies each line:
//!
//!         - Guard line: `if <condition>:`, where `if` is a keyword and the flag prefix
//!           appears in the line. The prefix check is a cheap textual filter that runs
//!           before any parsing, so ordinary `if` lines are never touched.
//!         - Exclude line: exactly `#exclude` once trimmed.
//!         - Plain line: everything else.
//!
//!     Plain lines are emitted after bare-word flag substitution. An exclude line
//!     starts a region that is dropped up to and including the next `#endexclude`
//!     line; regions do not nest. A guard whose condition is false strips its block.
//!     A guard whose condition is true emits its block without the guard line, shifted
//!     left so the body sits at the guard's column.
//!
//! Blocks
//!
//!     A block is every line after the guard that is indented deeper than the guard.
//!     Blank lines never end a block. The first non-blank line at or left of the
//!     guard's column ends it; that line is pushed back onto the shared
//!     [`LineSource`] and read again by the enclosing state. End of input closes any
//!     open block.
//!
//!     Emit blocks classify their body lines with the same rules as the top level, so
//!     nested guards are decided, stripped or shifted before the outer block shifts
//!     what survives. The shift is fixed by the first surviving non-blank body line.

use crate::condiment::condition::{Condition, ConditionError};
use crate::condiment::error::{CondimentError, CondimentResult};
use crate::condiment::flags::{Environment, FlagTable, ProcessEnvironment, DEFAULT_PREFIX};
use crate::condiment::indent::{indentation, reindent, DEFAULT_TAB_WIDTH};
use crate::condiment::source::{Line, LineSource};
use crate::condiment::substitute::substitute;
use std::borrow::Cow;

const EXCLUDE_MARKER: &str = "#exclude";
const END_EXCLUDE_MARKER: &str = "#endexclude";

/// Knobs for a preprocessing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Identifier prefix that marks a flag
    pub prefix: String,
    /// Columns per tab when measuring indentation
    pub tab_width: usize,
    /// Fail on `#exclude` without `#endexclude` instead of dropping to end of input
    pub strict_exclude: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            tab_width: DEFAULT_TAB_WIDTH,
            strict_exclude: false,
        }
    }
}

/// Kind of a line, decided on its trimmed text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'l> {
    /// A guard, carrying its condition text
    Guard(&'l str),
    Exclude,
    Plain,
}

/// Classify a trimmed line.
pub fn classify<'l>(trimmed: &'l str, prefix: &str) -> LineKind<'l> {
    if trimmed == EXCLUDE_MARKER {
        return LineKind::Exclude;
    }
    match guard_condition(trimmed, prefix) {
        Some(condition) => LineKind::Guard(condition),
        None => LineKind::Plain,
    }
}

fn guard_condition<'l>(trimmed: &'l str, prefix: &str) -> Option<&'l str> {
    let rest = trimmed.strip_prefix("if")?;
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return None;
    }
    let condition = rest.strip_suffix(':')?;
    if prefix.is_empty() || !trimmed.contains(prefix) {
        return None;
    }
    Some(condition.trim())
}

/// Output of a preprocessing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed<'a> {
    /// Surviving lines, in source order
    pub lines: Vec<Line<'a>>,
    /// Every flag referenced during the run
    pub flags: FlagTable,
}

impl Processed<'_> {
    /// The surviving lines joined back into text.
    pub fn text(&self) -> String {
        self.lines.iter().map(|line| line.text.as_ref()).collect()
    }
}

/// Resolves guards in a source against an environment
#[derive(Debug, Clone)]
pub struct Preprocessor<E = ProcessEnvironment> {
    options: ParseOptions,
    env: E,
}

impl Preprocessor<ProcessEnvironment> {
    /// A preprocessor reading flags from the process environment.
    pub fn new(options: ParseOptions) -> Self {
        Self::with_environment(options, ProcessEnvironment)
    }
}

impl Default for Preprocessor<ProcessEnvironment> {
    fn default() -> Self {
        Self::new(ParseOptions::default())
    }
}

impl<E: Environment> Preprocessor<E> {
    pub fn with_environment(options: ParseOptions, env: E) -> Self {
        Self { options, env }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Run the state machine over `text`. Each call starts with an empty flag table.
    pub fn process<'a>(&self, text: &'a str) -> CondimentResult<Processed<'a>> {
        let mut run = Run {
            options: &self.options,
            env: &self.env,
            flags: FlagTable::new(),
        };
        let mut source = LineSource::from_text(text);
        let mut lines = Vec::new();
        run.detect(&mut source, &mut lines)?;
        Ok(Processed {
            lines,
            flags: run.flags,
        })
    }

    /// Run the state machine only for the flags it resolves.
    pub fn resolve_flags(&self, text: &str) -> CondimentResult<FlagTable> {
        self.process(text).map(|processed| processed.flags)
    }
}

/// State of one run. The flag table lives exactly as long as the run.
struct Run<'p, E: ?Sized> {
    options: &'p ParseOptions,
    env: &'p E,
    flags: FlagTable,
}

impl<'p, E: Environment + ?Sized> Run<'p, E> {
    fn detect<'a, I>(
        &mut self,
        source: &mut LineSource<I>,
        out: &mut Vec<Line<'a>>,
    ) -> CondimentResult<()>
    where
        I: Iterator<Item = Line<'a>>,
    {
        while let Some(line) = source.next() {
            self.dispatch(line, source, out)?;
        }
        Ok(())
    }

    fn dispatch<'a, I>(
        &mut self,
        line: Line<'a>,
        source: &mut LineSource<I>,
        out: &mut Vec<Line<'a>>,
    ) -> CondimentResult<()>
    where
        I: Iterator<Item = Line<'a>>,
    {
        let guard = match classify(line.trimmed(), &self.options.prefix) {
            LineKind::Guard(condition) => Some(condition.to_string()),
            LineKind::Exclude => return self.skip_excluded(&line, source),
            LineKind::Plain => None,
        };

        match guard {
            Some(condition) => {
                if self.decide(&line, &condition)? {
                    self.emit_block(&line, source, out)
                } else {
                    self.strip_block(&line, source);
                    Ok(())
                }
            }
            None => {
                out.push(self.substitute(line));
                Ok(())
            }
        }
    }

    fn decide(&mut self, line: &Line<'_>, condition: &str) -> CondimentResult<bool> {
        let malformed = |err: ConditionError| match err {
            ConditionError::Syntax { .. } => CondimentError::MalformedGuard {
                line: line.number,
                condition: condition.to_string(),
                message: err.to_string(),
            },
            ConditionError::Evaluation(message) => CondimentError::GuardEvaluation {
                line: line.number,
                condition: condition.to_string(),
                message,
            },
        };

        let parsed = Condition::parse(condition).map_err(malformed)?;
        let decided = parsed
            .decide(&self.options.prefix, &mut self.flags, self.env)
            .map_err(malformed)?;
        tracing::debug!(line = line.number, condition, decided, "guard");
        Ok(decided)
    }

    fn indent_of(&self, line: &Line<'_>) -> usize {
        indentation(&line.text, self.options.tab_width)
    }

    /// Drop every line of the block opened by `guard`.
    fn strip_block<'a, I>(&self, guard: &Line<'a>, source: &mut LineSource<I>)
    where
        I: Iterator<Item = Line<'a>>,
    {
        let block_start = self.indent_of(guard);
        while let Some(line) = source.next() {
            if line.is_blank() {
                continue;
            }
            if self.indent_of(&line) <= block_start {
                tracing::trace!(line = line.number, "strip block ends");
                source.push(line);
                return;
            }
        }
    }

    /// Emit the block opened by `guard` without the guard, shifted to its column.
    fn emit_block<'a, I>(
        &mut self,
        guard: &Line<'a>,
        source: &mut LineSource<I>,
        out: &mut Vec<Line<'a>>,
    ) -> CondimentResult<()>
    where
        I: Iterator<Item = Line<'a>>,
    {
        let block_start = self.indent_of(guard);

        let mut body = Vec::new();
        while let Some(line) = source.next() {
            if line.is_blank() {
                body.push(line);
                continue;
            }
            if self.indent_of(&line) <= block_start {
                tracing::trace!(line = line.number, "emit block ends");
                source.push(line);
                break;
            }
            self.dispatch(line, source, &mut body)?;
        }

        let mut shift = None;
        for line in body {
            if line.is_blank() {
                out.push(line);
                continue;
            }
            let indent = self.indent_of(&line);
            let offset = *shift.get_or_insert(indent.saturating_sub(block_start));
            let text = reindent(&line.text, indent.saturating_sub(offset));
            out.push(Line::new(line.number, text));
        }
        Ok(())
    }

    /// Drop lines up to and including the next `#endexclude`.
    fn skip_excluded<'a, I>(&self, start: &Line<'a>, source: &mut LineSource<I>) -> CondimentResult<()>
    where
        I: Iterator<Item = Line<'a>>,
    {
        while let Some(line) = source.next() {
            if line.trimmed() == END_EXCLUDE_MARKER {
                return Ok(());
            }
        }
        if self.options.strict_exclude {
            return Err(CondimentError::UnterminatedExclude { line: start.number });
        }
        tracing::debug!(line = start.number, "#exclude runs to end of input");
        Ok(())
    }

    fn substitute<'a>(&mut self, line: Line<'a>) -> Line<'a> {
        let text = match line.text {
            Cow::Borrowed(text) => substitute(text, &self.options.prefix, &mut self.flags, self.env),
            Cow::Owned(text) => Cow::Owned(
                substitute(&text, &self.options.prefix, &mut self.flags, self.env).into_owned(),
            ),
        };
        Line::new(line.number, text)
    }
}
