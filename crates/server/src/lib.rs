#![deny(missing_docs)]

//! The peer server: session manager, admission control, and the
//! `WriteFile`/`ReadFile` decision trees (spec §4.2, §4.4, §4.6).
//!
//! # Design
//!
//! [`listener`] owns the accept loop and per-connection command dispatch.
//! [`decision`] holds the pure(ish) decision trees it dispatches into, each
//! taking a borrowed [`decision::ServerContext`] rather than the full
//! [`listener::ServerState`] so they stay testable against in-memory fakes.
//! [`session`] tracks live client sessions keyed by secret GUID;
//! [`admission`] rate-limits concurrent `ReadFile` transfers per priority
//! level; [`report`] aggregates the counters a `RequestReport` command
//! returns; [`settings`] holds the tunables bound once at startup.

pub mod admission;
pub mod decision;
pub mod listener;
pub mod report;
pub mod session;
pub mod settings;

pub use listener::{run, serve_connection, ServerState, PROTOCOL_VERSION};
pub use settings::{ServerSettings, DEFAULT_HISTORY_SIZE, DEFAULT_PORT};
