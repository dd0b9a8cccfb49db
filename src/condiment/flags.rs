//! Flags and where their values come from
//!
//!     A flag is an identifier starting with the configured prefix. Its value is the
//!     environment variable of the same name, or the empty string when unset. The
//!     [`FlagTable`] resolves each flag once, on first reference, and keeps that value
//!     for the rest of the run even if the environment changes underneath it.

use serde::Serialize;
use std::collections::HashMap;

/// Default identifier prefix for flags.
pub const DEFAULT_PREFIX: &str = "WITH_";

/// Read access to environment variables.
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// The process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl<E: Environment + ?Sized> Environment for &E {
    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// A resolved flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flag {
    pub name: String,
    pub value: String,
}

/// Flags resolved during one run, in first-reference order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FlagTable {
    flags: Vec<Flag>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FlagTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `name` from `env` unless it is already known, and return its value.
    pub fn define<E: Environment + ?Sized>(&mut self, name: &str, env: &E) -> &str {
        let position = match self.index.get(name) {
            Some(&position) => position,
            None => {
                let value = env.var(name).unwrap_or_default();
                tracing::debug!(flag = name, value = %value, "resolved flag");
                self.flags.push(Flag {
                    name: name.to_string(),
                    value,
                });
                self.index.insert(name.to_string(), self.flags.len() - 1);
                self.flags.len() - 1
            }
        };
        &self.flags[position].value
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.index
            .get(name)
            .map(|&position| self.flags[position].value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}
