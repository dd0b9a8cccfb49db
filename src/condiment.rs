//! Main module for condiment library functionality

pub mod condition;
pub mod encoding;
pub mod error;
pub mod flags;
pub mod indent;
pub mod install;
pub mod output;
pub mod preprocessor;
pub mod source;
pub mod substitute;

pub use error::{CondimentError, CondimentResult, HostError};
pub use flags::{Environment, Flag, FlagTable, ProcessEnvironment, DEFAULT_PREFIX};
pub use install::{
    install, BindingsFormat, BindingsHost, Host, InstallOptions, InstallOutcome, Installation,
    ProcessHost,
};
pub use output::{rewrite, rewrite_to, Destination, RewriteOptions, SourceText};
pub use preprocessor::{ParseOptions, Preprocessor, Processed};
