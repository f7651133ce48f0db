//! The `rcopy` binary: dispatches a parsed [`cli::RunMode`] into a client
//! copy, a peer server, or a thin stats query (spec §1, §6).

mod local_fs;

use std::io;
use std::net::{TcpListener, TcpStream};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use cli::RunMode;
use core::log::LogContext;
use filedb::FileDatabase;
use logging_init::Verbosity;
use transport::Connection;

use local_fs::LocalFileSystem;

fn main() -> ExitCode {
    let mode = match cli::parse(std::env::args_os()) {
        Ok(mode) => mode,
        Err(err) => {
            eprintln!("rcopy: {err}");
            return ExitCode::FAILURE;
        }
    };

    match mode {
        RunMode::Help(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        RunMode::Version(text) => {
            println!("{text}");
            ExitCode::SUCCESS
        }
        RunMode::Stats(addr) => run_stats(addr),
        RunMode::Server(settings) => run_server(*settings),
        RunMode::Client(settings, verbosity) => run_client(*settings, verbosity),
    }
}

fn run_client(settings: engine::ClientSettings, verbosity: i32) -> ExitCode {
    if logging_init::init(Verbosity::from_count(verbosity)).is_err() {
        eprintln!("rcopy: logging already initialized");
    }

    let fs: Arc<dyn core::fs::FileSystem> = Arc::new(LocalFileSystem);
    let db = Arc::new(Mutex::new(load_database(&settings)));
    let log_ctx = LogContext::new(tracing::info_span!("rcopy"));

    let settings = Arc::new(settings);
    let result = engine::process(Arc::clone(&settings), fs, Arc::clone(&db), &log_ctx);

    match result {
        Ok(stats) => {
            println!(
                "copied={} ({} bytes) skipped={} linked={} odx={} delta={} failed={} purged={}",
                stats.copy_count,
                stats.copy_size,
                stats.skip_count,
                stats.link_count,
                stats.odx_count,
                stats.delta_count,
                stats.fail_count,
                stats.purge_count,
            );
            if let Err(err) = save_database(&settings, &db) {
                eprintln!("rcopy: failed to persist link database: {err}");
            }
            if stats.fail_count > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("rcopy: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_database(settings: &engine::ClientSettings) -> FileDatabase {
    let Some(path) = &settings.link_database_file else {
        return FileDatabase::new();
    };
    match std::fs::File::open(path) {
        Ok(mut file) => filedb::persist::load(&mut file).unwrap_or_else(|err| {
            eprintln!("rcopy: ignoring unreadable link database {}: {err}", path.display());
            FileDatabase::new()
        }),
        Err(_) => FileDatabase::new(),
    }
}

fn save_database(settings: &engine::ClientSettings, db: &Mutex<FileDatabase>) -> io::Result<()> {
    let Some(path) = &settings.link_database_file else {
        return Ok(());
    };
    let mut file = std::fs::File::create(path)?;
    filedb::persist::save(&db.lock().unwrap_or_else(|e| e.into_inner()), &mut file)
}

fn run_server(settings: server::ServerSettings) -> ExitCode {
    if logging_init::init(Verbosity::Normal).is_err() {
        eprintln!("rcopy: logging already initialized");
    }

    let fs: Arc<dyn core::fs::FileSystem> = Arc::new(LocalFileSystem);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));
    let listener = match TcpListener::bind(addr) {
        Ok(listener) => listener,
        Err(err) => {
            eprintln!("rcopy: failed to bind {addr}: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(port = settings.port, root = %settings.root.display(), "listening");

    let state = Arc::new(server::ServerState::new(fs, settings));
    let stop = Arc::new(AtomicBool::new(false));
    match server::run(&listener, &state, &stop) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("rcopy: server loop failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_stats(addr: std::net::SocketAddr) -> ExitCode {
    match request_report(addr) {
        Ok(report) => {
            println!("{report}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("rcopy: failed to query {addr}: {err}");
            ExitCode::FAILURE
        }
    }
}

fn request_report(addr: std::net::SocketAddr) -> io::Result<String> {
    let stream = TcpStream::connect(addr)?;
    transport::configure_stream(&stream)?;
    let mut conn = Connection::new(stream);

    let (greeting_kind, greeting_payload) = conn.recv_record()?;
    let greeting = protocol::Command::decode(greeting_kind, &greeting_payload)?;
    if !matches!(greeting, protocol::Command::Version(_)) {
        return Err(io::Error::other("expected a Version greeting"));
    }

    let (kind, payload) = protocol::Command::RequestReport.encode();
    conn.send_record(kind, &payload)?;
    let (_response_kind, response_payload) = conn.recv_record()?;
    protocol::wire::decode_utf16(&response_payload)
}
