//! # condiment
//!
//! Conditional inclusion of source blocks driven by environment variables.
//!
//! A guard line such as `if WITH_DEBUG:` is decided once, when the file is
//! processed. A true guard keeps its body, shifted to the guard's column; a false
//! guard drops it. Bare flag names elsewhere are replaced by their values, and
//! `#exclude` / `#endexclude` regions are removed unconditionally.
//!
//! The entry points are [`condiment::Preprocessor`] for in-memory text,
//! [`condiment::rewrite`] for files, and [`condiment::install`] for running a file
//! through a [`condiment::Host`].

pub mod condiment;
