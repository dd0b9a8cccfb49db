//! Shared configuration loader for condiment.
//!
//! `defaults/condiment.default.toml` is embedded into every binary so that docs and
//! runtime behavior stay in sync. Applications layer user-specific files on top
//! of those defaults via [`Loader`] before deserializing into [`CondimentConfig`].

use condiment::condiment::{ParseOptions, RewriteOptions};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_TOML: &str = include_str!("../defaults/condiment.default.toml");

/// Name of the project-local configuration file picked up from the working directory.
pub const PROJECT_CONFIG: &str = "condiment.toml";

/// Top-level configuration consumed by condiment applications.
#[derive(Debug, Clone, Deserialize)]
pub struct CondimentConfig {
    pub flags: FlagsConfig,
    pub parsing: ParsingConfig,
    pub rewrite: RewriteConfig,
    pub exec: ExecConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlagsConfig {
    pub prefix: String,
}

/// Mirrors the knobs exposed by the preprocessor.
#[derive(Debug, Clone, Deserialize)]
pub struct ParsingConfig {
    pub tab_width: usize,
    pub strict_exclude: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RewriteConfig {
    pub trailer: bool,
    pub generated_prefix: String,
    pub timestamp_format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecConfig {
    pub interpreter: String,
}

impl CondimentConfig {
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            prefix: self.flags.prefix.clone(),
            tab_width: self.parsing.tab_width,
            strict_exclude: self.parsing.strict_exclude,
        }
    }

    pub fn rewrite_options(&self) -> RewriteOptions {
        RewriteOptions {
            trailer: self.rewrite.trailer,
            timestamp_format: self.rewrite.timestamp_format.clone(),
            generated_prefix: self.rewrite.generated_prefix.clone(),
        }
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override (useful for CLI settings).
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<CondimentConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<CondimentConfig, ConfigError> {
    Loader::new().build()
}
