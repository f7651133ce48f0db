#![deny(missing_docs)]

//! Bridges `rcopy`'s `-v`/`-q`/`--debug` flags onto a `tracing-subscriber`
//! `EnvFilter` + fmt subscriber (spec §1 ambient logging, SPEC_FULL.md §1).
//!
//! # Design
//!
//! Rather than a bespoke level-plumbing system, verbosity is translated into
//! an `EnvFilter` directive string the way `oc-rsync`'s `logging` crate
//! bridges its own verbosity flags onto `tracing` behind its `tracing`
//! feature: `-v` maps to `relaycopy=debug`, `-vv` to `relaycopy=trace`, `-q`
//! to `relaycopy=error`, and the default to `relaycopy=info`. `RUST_LOG`, if
//! set, always wins over the derived directive so an operator can override
//! it without recompiling.
//!
//! # Invariants
//!
//! - [`init`] may be called at most once per process; a second call returns
//!   [`InitError::AlreadyInitialized`].

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Verbosity level derived from repeated `-v`/`-q` flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verbosity {
    /// `-q`: only errors.
    Quiet,
    /// Default: informational messages and above.
    Normal,
    /// `-v`: debug messages and above.
    Verbose,
    /// `-vv` or more: trace messages and above.
    Trace,
}

impl Verbosity {
    /// Maps a repeated-flag count (`-v` occurrences minus `-q` occurrences)
    /// onto a level: negative is [`Verbosity::Quiet`], `0` is
    /// [`Verbosity::Normal`], `1` is [`Verbosity::Verbose`], `2` or more is
    /// [`Verbosity::Trace`].
    #[must_use]
    pub fn from_count(count: i32) -> Self {
        match count {
            i32::MIN..=-1 => Verbosity::Quiet,
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Verbosity::Quiet => "relaycopy=error",
            Verbosity::Normal => "relaycopy=info",
            Verbosity::Verbose => "relaycopy=debug",
            Verbosity::Trace => "relaycopy=trace",
        }
    }
}

/// Failure installing the global subscriber.
#[derive(Debug, Error)]
pub enum InitError {
    /// A subscriber was already installed for this process.
    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Installs a global `fmt` subscriber filtered by `verbosity`, unless
/// `RUST_LOG` is set in the environment, in which case that takes priority.
///
/// # Errors
///
/// Returns [`InitError::AlreadyInitialized`] if a global subscriber is
/// already set.
pub fn init(verbosity: Verbosity) -> Result<(), InitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|_| InitError::AlreadyInitialized)
}
