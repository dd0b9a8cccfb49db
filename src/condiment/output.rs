//! Rewriting a source to a destination
//!
//!     Rewrite mode reads the source, runs the preprocessor, and writes the surviving
//!     lines followed by a debug trailer listing every resolved flag:
//!
//!         # ----- CONDIMENT VARIABLES -----
//!         # Generated at 2024-05-01 09:30
//!         # WITH_DEBUG = 1
//!         # ---------------------------------
//!
//!     Output is encoded in the encoding the source declared. The destination is
//!     either standard output or a file; a file destination is only created once the
//!     source has been processed successfully, and a failed write removes it again.

use crate::condiment::encoding::SourceEncoding;
use crate::condiment::error::CondimentResult;
use crate::condiment::flags::{Environment, FlagTable};
use crate::condiment::preprocessor::{Preprocessor, Processed};
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const TRAILER_HEADER: &str = "# ----- CONDIMENT VARIABLES -----";
const TRAILER_FOOTER: &str = "# ---------------------------------";

/// Prefix of files generated next to their source.
pub const DEFAULT_GENERATED_PREFIX: &str = "_ft_";

/// Timestamp layout used in the trailer.
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Where rewritten output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Pass output straight through to standard output
    Stdout,
    /// Write output to a file
    File(PathBuf),
}

/// Knobs for rewrite mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Append the flag trailer
    pub trailer: bool,
    /// chrono format string for the trailer timestamp
    pub timestamp_format: String,
    /// File name prefix for generated side files
    pub generated_prefix: String,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            trailer: true,
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            generated_prefix: DEFAULT_GENERATED_PREFIX.to_string(),
        }
    }
}

/// The debug comment block appended to rewritten output
pub struct Trailer<'a> {
    pub flags: &'a FlagTable,
    pub generated_at: NaiveDateTime,
    pub timestamp_format: &'a str,
}

impl fmt::Display for Trailer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", TRAILER_HEADER)?;
        writeln!(
            f,
            "# Generated at {}",
            self.generated_at.format(self.timestamp_format)
        )?;
        for flag in self.flags.iter() {
            writeln!(f, "# {} = {}", flag.name, flag.value)?;
        }
        writeln!(f, "{}", TRAILER_FOOTER)
    }
}

/// Render processed lines and, if enabled, the trailer.
pub fn render(processed: &Processed<'_>, options: &RewriteOptions, generated_at: NaiveDateTime) -> String {
    let mut out = processed.text();
    if options.trailer {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        let timestamp_format = if is_valid_timestamp_format(&options.timestamp_format) {
            options.timestamp_format.as_str()
        } else {
            tracing::warn!(format = %options.timestamp_format, "invalid timestamp format, using default");
            DEFAULT_TIMESTAMP_FORMAT
        };
        let trailer = Trailer {
            flags: &processed.flags,
            generated_at,
            timestamp_format,
        };
        out.push_str(&trailer.to_string());
    }
    out
}

fn is_valid_timestamp_format(format: &str) -> bool {
    StrftimeItems::new(format).all(|item| !matches!(item, Item::Error))
}

/// A source read from disk, decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: String,
    pub encoding: SourceEncoding,
}

impl SourceText {
    pub fn read(path: &Path) -> CondimentResult<Self> {
        let bytes = fs::read(path)?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let encoding = SourceEncoding::sniff(bytes);
        Self {
            text: encoding.decode(bytes).into_owned(),
            encoding,
        }
    }
}

/// Process `source` and write the result to `writer`.
pub fn rewrite_to<E: Environment, W: Write>(
    preprocessor: &Preprocessor<E>,
    source: &SourceText,
    options: &RewriteOptions,
    writer: &mut W,
) -> CondimentResult<FlagTable> {
    let processed = preprocessor.process(&source.text)?;
    let rendered = render(&processed, options, chrono::Local::now().naive_local());
    writer.write_all(&source.encoding.encode(&rendered))?;
    writer.flush()?;
    Ok(processed.flags)
}

/// Process the file at `input` and write the result to `destination`.
pub fn rewrite<E: Environment>(
    preprocessor: &Preprocessor<E>,
    input: &Path,
    destination: &Destination,
    options: &RewriteOptions,
) -> CondimentResult<FlagTable> {
    let source = SourceText::read(input)?;
    match destination {
        Destination::Stdout => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            rewrite_to(preprocessor, &source, options, &mut lock)
        }
        Destination::File(path) => {
            let processed = preprocessor.process(&source.text)?;
            let rendered = render(&processed, options, chrono::Local::now().naive_local());
            if let Err(err) = fs::write(path, source.encoding.encode(&rendered)) {
                remove_generated(path);
                return Err(err.into());
            }
            tracing::debug!(input = %input.display(), output = %path.display(), "rewrote source");
            Ok(processed.flags)
        }
    }
}

/// Path of the side file generated for `input`: same directory, prefixed name.
pub fn generated_path(input: &Path, prefix: &str) -> PathBuf {
    let name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", prefix, name))
}

/// Delete a generated file. Failure is logged, never raised.
pub fn remove_generated(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed generated file"),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "could not remove generated file")
        }
    }
}
