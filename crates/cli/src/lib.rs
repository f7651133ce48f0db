#![deny(missing_docs)]

//! # Overview
//!
//! `relaycopy_cli` implements the thin command-line front-end for `rcopy`.
//! It recognises three invocation shapes: a client copy (`rcopy SRC DST
//! [flags]`), a peer server (`rcopy --server [--port N] [--root DIR]`), and a
//! thin stats report (`rcopy --stats ADDR`), and parses each into the
//! settings struct the corresponding crate consumes (spec §6's CLI
//! contract).
//!
//! # Design
//!
//! [`parse`] accepts an iterator of arguments, mirroring `oc-rsync`'s own
//! `rsync_cli::run` entry point, and performs a light-weight parse with a
//! hand-built [`clap::Command`] (the `std` feature only, no `derive`,
//! matching that crate's own dependency declaration) rather than a derived
//! struct. `--help`/`--version` are handled by clap directly and surfaced as
//! [`RunMode::Help`]/[`RunMode::Version`] so the caller controls where the
//! text is written.
//!
//! # Errors
//!
//! [`parse`] returns [`CliError`] when argument processing fails; the
//! message is clap's own formatted diagnostic.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command};

use engine::settings::{ClientSettings, CompressionLevel, UseServer, COMPRESSION_DYNAMIC};
use server::settings::{ServerSettings, DEFAULT_HISTORY_SIZE, DEFAULT_PORT};

/// A fully parsed invocation, ready for `bin/rcopy.rs` to dispatch on.
#[derive(Debug)]
pub enum RunMode {
    /// Run one client copy with these settings, at this verbosity.
    Client(Box<ClientSettings>, i32),
    /// Run the peer server with these settings.
    Server(Box<ServerSettings>),
    /// Connect to `addr` and print its `RequestReport` response.
    Stats(SocketAddr),
    /// `--help` was requested; print this text and exit `0`.
    Help(String),
    /// `--version` was requested; print this text and exit `0`.
    Version(String),
}

/// Failure parsing the command line.
#[derive(Debug)]
pub struct CliError(pub String);

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CliError {}

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parses `args` (including the program name in position `0`, matching
/// `std::env::args`) into a [`RunMode`].
///
/// # Errors
///
/// Returns [`CliError`] if an argument fails to parse (unknown flag, a
/// value that cannot be converted to the expected type, or a conflicting
/// combination such as `--server` together with a positional source path).
pub fn parse<I, T>(args: I) -> Result<RunMode, CliError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command()
        .try_get_matches_from(args)
        .map_err(|e| CliError(e.to_string()))?;

    if matches.get_flag("version") {
        return Ok(RunMode::Version(format!("rcopy {VERSION}")));
    }
    if matches.get_flag("help") {
        return Ok(RunMode::Help(command().render_help().to_string()));
    }
    if let Some(addr) = matches.get_one::<String>("stats") {
        let addr = addr
            .parse::<SocketAddr>()
            .map_err(|e| CliError(format!("invalid --stats address {addr:?}: {e}")))?;
        return Ok(RunMode::Stats(addr));
    }
    if matches.get_flag("server") {
        return Ok(RunMode::Server(Box::new(server_settings(&matches)?)));
    }

    Ok(RunMode::Client(
        Box::new(client_settings(&matches)?),
        verbosity_count(&matches),
    ))
}

fn command() -> Command {
    Command::new("rcopy")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(Arg::new("help").long("help").action(ArgAction::SetTrue))
        .arg(Arg::new("version").long("version").short('V').action(ArgAction::SetTrue))
        .arg(Arg::new("verbose").short('v').long("verbose").action(ArgAction::Count))
        .arg(Arg::new("quiet").short('q').long("quiet").action(ArgAction::SetTrue).conflicts_with("verbose"))
        .arg(Arg::new("stats").long("stats").value_name("ADDR").num_args(1))
        .arg(Arg::new("server").long("server").action(ArgAction::SetTrue))
        .arg(Arg::new("port").long("port").value_name("PORT").num_args(1).value_parser(clap::value_parser!(u16)))
        .arg(Arg::new("root").long("root").value_name("DIR").num_args(1))
        .arg(Arg::new("history-size").long("history-size").value_name("N").num_args(1).value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("odx").long("odx").action(ArgAction::SetTrue))
        .arg(Arg::new("security-file").long("security-file").action(ArgAction::SetTrue))
        .arg(Arg::new("source").value_name("SRC").index(1))
        .arg(Arg::new("destination").value_name("DST").index(2))
        .arg(Arg::new("include").long("include").value_name("PATTERN").action(ArgAction::Append))
        .arg(Arg::new("exclude").long("exclude").value_name("PATTERN").action(ArgAction::Append))
        .arg(Arg::new("include-dir").long("include-dir").value_name("PATTERN").action(ArgAction::Append))
        .arg(Arg::new("exclude-dir").long("exclude-dir").value_name("PATTERN").action(ArgAction::Append))
        .arg(Arg::new("files-from").long("files-from").value_name("FILE").num_args(1))
        .arg(Arg::new("retries").long("retries").value_name("N").num_args(1).value_parser(clap::value_parser!(u32)))
        .arg(Arg::new("retry-wait").long("retry-wait").value_name("MS").num_args(1).value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("depth").long("depth").value_name("N").num_args(1).value_parser(clap::value_parser!(u32)))
        .arg(Arg::new("purge").long("purge").action(ArgAction::SetTrue))
        .arg(Arg::new("flatten").long("flatten").action(ArgAction::SetTrue))
        .arg(Arg::new("force").long("force").action(ArgAction::SetTrue))
        .arg(Arg::new("use-server").long("use-server").value_name("MODE").num_args(1))
        .arg(Arg::new("server-addr").long("server-addr").value_name("ADDR").num_args(1))
        .arg(Arg::new("compression").long("compression").value_name("LEVEL").num_args(1))
        .arg(Arg::new("delta-threshold").long("delta-threshold").value_name("BYTES").num_args(1).value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("link-threshold").long("link-threshold").value_name("BYTES").num_args(1).value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("hash-mode").long("hash-mode").action(ArgAction::SetTrue))
        .arg(Arg::new("replace-symlinks").long("replace-symlinks").action(ArgAction::SetTrue))
        .arg(Arg::new("threads").long("threads").value_name("N").num_args(1).value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("no-buffered-io").long("no-buffered-io").action(ArgAction::SetTrue))
        .arg(Arg::new("link-db").long("link-db").value_name("FILE").num_args(1))
        .arg(Arg::new("max-downloads").long("max-downloads").value_name("N").num_args(1).value_parser(clap::value_parser!(usize)))
}

fn verbosity_count(matches: &clap::ArgMatches) -> i32 {
    if matches.get_flag("quiet") {
        -1
    } else {
        i32::try_from(matches.get_count("verbose")).unwrap_or(i32::MAX)
    }
}

fn strings(matches: &clap::ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn parse_compression(raw: &str) -> Result<CompressionLevel, CliError> {
    if raw.eq_ignore_ascii_case("dynamic") {
        return Ok(COMPRESSION_DYNAMIC);
    }
    raw.parse::<CompressionLevel>()
        .map_err(|_| CliError(format!("invalid --compression value {raw:?}")))
}

fn parse_use_server(raw: &str) -> Result<UseServer, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "automatic" => Ok(UseServer::Automatic),
        "required" => Ok(UseServer::Required),
        "disabled" => Ok(UseServer::Disabled),
        other => Err(CliError(format!(
            "invalid --use-server value {other:?}, expected automatic, required, or disabled"
        ))),
    }
}

fn client_settings(matches: &clap::ArgMatches) -> Result<ClientSettings, CliError> {
    let source = matches
        .get_one::<String>("source")
        .ok_or_else(|| CliError("missing required SRC argument".into()))?;
    let destination = matches
        .get_one::<String>("destination")
        .ok_or_else(|| CliError("missing required DST argument".into()))?;

    let use_server = matches
        .get_one::<String>("use-server")
        .map(|raw| parse_use_server(raw))
        .transpose()?
        .unwrap_or(UseServer::Disabled);
    let compression_level = matches
        .get_one::<String>("compression")
        .map(|raw| parse_compression(raw))
        .transpose()?
        .unwrap_or(0);
    let server_addr = matches
        .get_one::<String>("server-addr")
        .map(|raw| raw.parse::<SocketAddr>())
        .transpose()
        .map_err(|e| CliError(format!("invalid --server-addr: {e}")))?;

    let mut settings = ClientSettings {
        source: PathBuf::from(source),
        destination: PathBuf::from(destination),
        include_files: strings(matches, "include"),
        exclude_files: strings(matches, "exclude"),
        include_dirs: strings(matches, "include-dir"),
        exclude_dirs: strings(matches, "exclude-dir"),
        file_list: matches.get_one::<String>("files-from").map(PathBuf::from),
        purge_destination: matches.get_flag("purge"),
        flatten_destination: matches.get_flag("flatten"),
        force_copy: matches.get_flag("force"),
        use_server,
        compression_level,
        hash_mode: matches.get_flag("hash-mode"),
        replace_symlinks_at_destination: matches.get_flag("replace-symlinks"),
        use_buffered_io: !matches.get_flag("no-buffered-io"),
        link_database_file: matches.get_one::<String>("link-db").map(PathBuf::from),
        server_addr,
        ..ClientSettings::default()
    };

    if let Some(&retries) = matches.get_one::<u32>("retries") {
        settings.retry_count = retries;
    }
    if let Some(&wait) = matches.get_one::<u64>("retry-wait") {
        settings.retry_wait_ms = wait;
    }
    if let Some(&depth) = matches.get_one::<u32>("depth") {
        settings.copy_subdir_depth = depth;
    }
    if let Some(&threshold) = matches.get_one::<u64>("delta-threshold") {
        settings.delta_compression_threshold = threshold;
    }
    if let Some(&threshold) = matches.get_one::<u64>("link-threshold") {
        settings.use_links_threshold = threshold;
    }
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        settings.thread_count = threads;
    }
    if let Some(&max) = matches.get_one::<usize>("max-downloads") {
        settings.max_concurrent_downloads = max;
    }
    settings.security_file_mode = matches.get_flag("security-file");

    Ok(settings)
}

fn server_settings(matches: &clap::ArgMatches) -> Result<ServerSettings, CliError> {
    let mut settings = ServerSettings {
        port: matches.get_one::<u16>("port").copied().unwrap_or(DEFAULT_PORT),
        odx_enabled: matches.get_flag("odx"),
        hash_mode: matches.get_flag("hash-mode"),
        use_security_file: matches.get_flag("security-file"),
        history_size: matches
            .get_one::<usize>("history-size")
            .copied()
            .unwrap_or(DEFAULT_HISTORY_SIZE),
        ..ServerSettings::default()
    };
    if let Some(root) = matches.get_one::<String>("root") {
        settings.root = PathBuf::from(root);
    }
    if let Some(&threshold) = matches.get_one::<u64>("delta-threshold") {
        settings.delta_compression_threshold = threshold;
    }
    if let Some(&threshold) = matches.get_one::<u64>("link-threshold") {
        settings.use_links_threshold = threshold;
    }
    if let Some(&max) = matches.get_one::<usize>("max-downloads") {
        settings.max_concurrent_downloads = max;
    }
    Ok(settings)
}
