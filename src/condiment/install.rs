//! Install-style entry point and mode selection
//!
//!     `install` is meant to be called on behalf of a file that is being loaded or run.
//!     What it does depends on the [`Host`], the execution context that asked for it:
//!
//!         - Inject mode, when the host is in the middle of loading the file: the file
//!           is processed only to resolve its flags, and the flags are handed to the
//!           host to bind into the already-loading caller. Nothing is written; a file
//!           that is being loaded is never rewritten underneath its loader.
//!         - Rewrite mode otherwise: the file is rewritten to a destination. When the
//!           destination is a file, the host executes it, a side file generated here
//!           is deleted again (best effort), and if the caller was the program's main
//!           entry point the outcome tells it to terminate successfully.
//!
//!     The host is queried once, at the start of the run.

use crate::condiment::error::{CondimentError, CondimentResult, HostError};
use crate::condiment::flags::{Environment, FlagTable};
use crate::condiment::output::{
    generated_path, remove_generated, rewrite, Destination, RewriteOptions, SourceText,
};
use crate::condiment::preprocessor::{ParseOptions, Preprocessor};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The execution context `install` runs in
pub trait Host {
    /// True while the host is loading the caller, i.e. the caller must not be rewritten.
    fn is_embedded_load(&self) -> bool;

    /// Path of the file on whose behalf `install` was called, if the host knows it.
    fn caller_path(&self) -> Option<PathBuf> {
        None
    }

    /// True when the caller is the program's main entry point.
    fn caller_is_main(&self) -> bool {
        false
    }

    /// Bind resolved flags into the caller.
    fn inject(&mut self, flags: &FlagTable) -> Result<(), HostError>;

    /// Run a generated file in place of the caller.
    fn execute(&mut self, generated: &Path) -> Result<(), HostError>;
}

/// Options for [`install`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOptions {
    pub parse: ParseOptions,
    pub rewrite: RewriteOptions,
    /// Source to process instead of the host's caller
    pub input: Option<PathBuf>,
    /// Destination instead of a generated side file
    pub output: Option<Destination>,
}

/// What [`install`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Flags were injected into the loading caller
    Injected,
    /// Output went to a stream; nothing was executed
    Written,
    /// The rewritten file was executed
    Executed,
    /// The rewritten file was executed on behalf of the main entry point, which
    /// should now terminate successfully
    Exit,
}

/// Result of a successful [`install`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    pub outcome: InstallOutcome,
    pub flags: FlagTable,
}

/// Process the caller according to what the host is doing.
pub fn install<E: Environment, H: Host + ?Sized>(
    options: &InstallOptions,
    env: E,
    host: &mut H,
) -> CondimentResult<Installation> {
    let embedded = host.is_embedded_load();
    let input = options
        .input
        .clone()
        .or_else(|| host.caller_path())
        .ok_or(CondimentError::MissingInput)?;
    let preprocessor = Preprocessor::with_environment(options.parse.clone(), env);

    if embedded {
        let source = SourceText::read(&input)?;
        let flags = preprocessor.resolve_flags(&source.text)?;
        host.inject(&flags)?;
        tracing::debug!(input = %input.display(), flags = flags.len(), "injected flags");
        return Ok(Installation {
            outcome: InstallOutcome::Injected,
            flags,
        });
    }

    let (destination, generated) = match &options.output {
        Some(destination) => (destination.clone(), false),
        None => (
            Destination::File(generated_path(&input, &options.rewrite.generated_prefix)),
            true,
        ),
    };
    let flags = rewrite(&preprocessor, &input, &destination, &options.rewrite)?;

    let path = match destination {
        Destination::Stdout => {
            return Ok(Installation {
                outcome: InstallOutcome::Written,
                flags,
            })
        }
        Destination::File(path) => path,
    };

    let executed = host.execute(&path);
    if generated {
        remove_generated(&path);
    }
    executed?;

    let outcome = if host.caller_is_main() {
        InstallOutcome::Exit
    } else {
        InstallOutcome::Executed
    };
    Ok(Installation { outcome, flags })
}

/// Runs generated files with an external interpreter, as the main entry point.
#[derive(Debug, Clone)]
pub struct ProcessHost {
    interpreter: Vec<String>,
    caller: Option<PathBuf>,
}

impl ProcessHost {
    /// `interpreter` is a shell-style command line, e.g. `python3 -u`.
    pub fn new(interpreter: &str) -> Result<Self, HostError> {
        let words = shlex::split(interpreter)
            .filter(|words| !words.is_empty())
            .ok_or_else(|| HostError::Spawn {
                command: interpreter.to_string(),
                message: "invalid interpreter command".to_string(),
            })?;
        Ok(Self {
            interpreter: words,
            caller: None,
        })
    }

    pub fn with_caller(mut self, caller: impl Into<PathBuf>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    fn command_line(&self, generated: &Path) -> String {
        format!("{} {}", self.interpreter.join(" "), generated.display())
    }
}

impl Host for ProcessHost {
    fn is_embedded_load(&self) -> bool {
        false
    }

    fn caller_path(&self) -> Option<PathBuf> {
        self.caller.clone()
    }

    fn caller_is_main(&self) -> bool {
        true
    }

    fn inject(&mut self, _flags: &FlagTable) -> Result<(), HostError> {
        Err(HostError::Inject(
            "an external interpreter cannot receive bindings".to_string(),
        ))
    }

    fn execute(&mut self, generated: &Path) -> Result<(), HostError> {
        let command = self.command_line(generated);
        let (program, args) = self
            .interpreter
            .split_first()
            .ok_or_else(|| HostError::Spawn {
                command: command.clone(),
                message: "empty interpreter command".to_string(),
            })?;
        tracing::debug!(command = %command, "running generated file");
        let status = Command::new(program)
            .args(args)
            .arg(generated)
            .status()
            .map_err(|err| HostError::Spawn {
                command: command.clone(),
                message: err.to_string(),
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(HostError::ExitStatus {
                command,
                code: status.code(),
            })
        }
    }
}

/// How [`BindingsHost`] renders flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingsFormat {
    /// A JSON list of `{"name", "value"}` objects
    Json,
    /// `export NAME='value'` lines for a POSIX shell
    Shell,
}

/// Injects flags by writing them as bindings the caller can evaluate.
pub struct BindingsHost<W> {
    writer: W,
    format: BindingsFormat,
    caller: Option<PathBuf>,
}

impl<W: Write> BindingsHost<W> {
    pub fn new(writer: W, format: BindingsFormat) -> Self {
        Self {
            writer,
            format,
            caller: None,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<PathBuf>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Quote `value` for a POSIX shell.
fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Is `name` usable as a POSIX shell variable, i.e. `[A-Za-z_][A-Za-z0-9_]*`?
fn is_shell_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl<W: Write> Host for BindingsHost<W> {
    fn is_embedded_load(&self) -> bool {
        true
    }

    fn caller_path(&self) -> Option<PathBuf> {
        self.caller.clone()
    }

    fn inject(&mut self, flags: &FlagTable) -> Result<(), HostError> {
        match self.format {
            BindingsFormat::Json => {
                serde_json::to_writer_pretty(&mut self.writer, flags)
                    .map_err(|err| HostError::Inject(err.to_string()))?;
                writeln!(self.writer)?;
            }
            BindingsFormat::Shell => {
                for flag in flags.iter() {
                    if !is_shell_name(&flag.name) {
                        tracing::warn!(flag = %flag.name, "not a valid shell variable name, skipped");
                        continue;
                    }
                    writeln!(self.writer, "export {}={}", flag.name, shell_quote(&flag.value))?;
                }
            }
        }
        self.writer.flush()?;
        Ok(())
    }

    fn execute(&mut self, generated: &Path) -> Result<(), HostError> {
        Err(HostError::Spawn {
            command: generated.display().to_string(),
            message: "bindings hosts do not execute files".to_string(),
        })
    }
}
