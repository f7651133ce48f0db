//! Accepts connections and drives the per-connection command loop (spec
//! §4.2, §4.4): unsolicited `Version` greeting, `Environment` binding, then
//! dispatch to the decision trees in [`crate::decision`].

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use core::fs::FileSystem;
use core::{Hash, SeekShim};
use filedb::FileDatabase;
use protocol::{
    kind, secret_guid_hex, Command, CreateDirResponse, DeleteFilesResponse, DoneFooter,
    EnvironmentCommand, ReadFileCommand, ReadFileResponse, SecretGuid, TrailingSuccess,
    VersionCommand, WriteFileCommand, WriteFileResponse, FLAG_USE_SECURITY_FILE,
};
use transport::Connection;

use crate::admission::PriorityQueues;
use crate::decision::{self, ReadDecision, ServerContext, WriteDecision};
use crate::report::ReportCounters;
use crate::session::{generate_secret_guid, ActiveSession, ActiveSessions};
use crate::settings::ServerSettings;

/// Protocol version this implementation speaks (spec §4.2, §6).
pub const PROTOCOL_VERSION: u32 = 1;

/// State shared by every session thread.
pub struct ServerState {
    /// Filesystem capability sessions read/write/stat against.
    pub fs: Arc<dyn FileSystem>,
    /// The content-addressed database, shared across every session.
    pub db: Arc<Mutex<FileDatabase>>,
    /// Server-wide tunables.
    pub settings: Arc<ServerSettings>,
    /// Live sessions keyed by secret GUID.
    pub sessions: Arc<ActiveSessions>,
    /// `ReadFile` admission control.
    pub admission: Arc<PriorityQueues>,
    /// `RequestReport` counters.
    pub counters: Arc<ReportCounters>,
    connection_counter: AtomicU64,
    secret_counter: AtomicU64,
}

impl ServerState {
    /// Builds server state from its filesystem capability and settings.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, settings: ServerSettings) -> Self {
        let admission = PriorityQueues::new(16, settings.max_concurrent_downloads);
        Self {
            fs,
            db: Arc::new(Mutex::new(FileDatabase::new())),
            admission: Arc::new(admission),
            settings: Arc::new(settings),
            sessions: Arc::new(ActiveSessions::new()),
            counters: Arc::new(ReportCounters::new()),
            connection_counter: AtomicU64::new(1),
            secret_counter: AtomicU64::new(1),
        }
    }

    fn context(&self) -> ServerContext<'_> {
        ServerContext {
            fs: self.fs.as_ref(),
            db: &self.db,
            settings: &self.settings,
        }
    }
}

fn resolve_net_directory(settings: &ServerSettings, net_directory: &str) -> PathBuf {
    let cleaned = net_directory.trim_start_matches('\\').replace('\\', "/");
    settings.root.join(cleaned)
}

/// Runs the accept loop against an already-bound `listener` until `stop` is
/// set, spawning one thread per accepted connection (spec §4.4, §5: the
/// listener tolerates individual session failures).
pub fn run(listener: &TcpListener, state: &Arc<ServerState>, stop: &Arc<AtomicBool>) -> io::Result<()> {
    loop {
        let accepted = transport::accept_cooperatively(listener, || stop.load(Ordering::Relaxed))?;
        let Some((stream, addr)) = accepted else {
            return Ok(());
        };
        let state = Arc::clone(state);
        thread::spawn(move || {
            if let Err(err) = serve_connection(stream, &state) {
                tracing::warn!(peer = %addr, error = %err, "session thread terminated");
            }
        });
    }
}

struct Bound {
    session: Arc<ActiveSession>,
    secret_guid: [u8; 16],
    connection_index: usize,
}

/// Drives one accepted connection end to end: greeting, `Environment`
/// binding, command loop, and session/admission teardown on exit.
pub fn serve_connection(stream: TcpStream, state: &ServerState) -> io::Result<()> {
    transport::configure_stream(&stream)?;
    let mut conn = Connection::new(stream);
    let connection_id = state.connection_counter.fetch_add(1, Ordering::Relaxed);
    state.counters.record_connection();

    let greeting = Command::Version(VersionCommand {
        protocol_version: PROTOCOL_VERSION,
        flags: if state.settings.use_security_file {
            FLAG_USE_SECURITY_FILE
        } else {
            0
        },
        info: "relaycopy-server".into(),
    });
    let (greeting_kind, greeting_payload) = greeting.encode();
    conn.send_record(greeting_kind, &greeting_payload)?;

    let mut bound: Option<Bound> = None;

    loop {
        let (cmd_kind, payload) = match conn.recv_record() {
            Ok(v) => v,
            Err(err) if transport::is_orderly_close(&err) => break,
            Err(err) => return Err(err),
        };
        let cmd = Command::decode(cmd_kind, &payload)?;

        match cmd {
            Command::Environment(env) => match bind_environment(&mut conn, state, connection_id, env) {
                Ok(b) => bound = Some(b),
                Err(err) => {
                    tracing::warn!(error = %err, "security-file handshake failed, dropping connection");
                    return Err(err);
                }
            },
            Command::WriteFile(write_cmd) => match &bound {
                None => send_byte(&mut conn, WriteFileResponse::BadDestination.to_byte())?,
                Some(b) => handle_write_file(&mut conn, state, &b.session, &write_cmd)?,
            },
            Command::ReadFile(read_cmd) => match &bound {
                None => send_byte(&mut conn, ReadFileResponse::BadSource.to_byte())?,
                Some(b) => handle_read_file(&mut conn, state, b, connection_id, &read_cmd)?,
            },
            Command::CreateDir { path } => match &bound {
                None => send_byte(&mut conn, CreateDirResponse::BadDestination.to_byte())?,
                Some(b) => {
                    let resp = decision::handle_create_dir(&state.context(), &b.session, &path);
                    send_byte(&mut conn, resp.to_byte())?;
                }
            },
            Command::DeleteFiles { path } => match &bound {
                None => send_byte(&mut conn, DeleteFilesResponse::BadDestination.to_byte())?,
                Some(b) => {
                    let resp = decision::handle_delete_files(&state.context(), &b.session, &path);
                    send_byte(&mut conn, resp.to_byte())?;
                }
            },
            Command::FindFiles { path } => {
                let text = match &bound {
                    Some(b) => decision::handle_find_files(&state.context(), &b.session, &path)?
                        .into_iter()
                        .map(|e| e.name)
                        .collect::<Vec<_>>()
                        .join("\n"),
                    None => String::new(),
                };
                conn.send_record(kind::TEXT, &protocol::wire::encode_utf16(&text))?;
            }
            Command::GetFileInfo { path } => {
                let bytes = match &bound {
                    Some(b) => {
                        let info = decision::handle_get_file_info(&state.context(), &b.session, &path)?;
                        protocol::wire::encode_file_info(&info).to_vec()
                    }
                    None => Vec::new(),
                };
                conn.send_record(kind::TEXT, &bytes)?;
            }
            Command::RequestReport => {
                let report = state.counters.report(state.db.lock().unwrap().len());
                conn.send_record(kind::TEXT, &protocol::wire::encode_utf16(&report))?;
            }
            Command::Done => {
                let footer = DoneFooter { compression_level_sum: state.counters.compression_level_sum() };
                conn.send_record(kind::DONE, &footer.to_bytes())?;
                break;
            }
            Command::Version(_) | Command::Text(_) => {}
        }
    }

    if let Some(b) = bound {
        state.sessions.leave(b.secret_guid);
        state.admission.leave(b.connection_index, connection_id);
    }
    Ok(())
}

/// Binds one connection's `Environment` request to a session (spec §4.2).
///
/// When the server requires the security-file handshake, a zero secret is
/// proven by planting a hidden nonce file under the net directory and
/// reading back the client's claimed content, and a nonzero secret is
/// rejected unless it already names a live session.
fn bind_environment(
    conn: &mut Connection<TcpStream>,
    state: &ServerState,
    connection_id: u64,
    env: EnvironmentCommand,
) -> io::Result<Bound> {
    let net_directory = resolve_net_directory(&state.settings, &env.net_directory);

    let secret_guid = if state.settings.use_security_file {
        verify_security_file(conn, state, &net_directory, env.secret_guid)?
    } else if env.secret_guid == [0u8; 16] {
        generate_secret_guid(&state.secret_counter)
    } else {
        env.secret_guid
    };

    let session = state.sessions.join(secret_guid, net_directory);
    let connection_index = env.connection_index as usize;
    state.admission.join(connection_index, connection_id);
    Ok(Bound {
        session,
        secret_guid,
        connection_index,
    })
}

/// The security-file handshake itself (spec §4.2 Environment): a nonzero
/// claimed secret must already name a live session, or the connection is
/// rejected; a zero secret is proven fresh by round-tripping a hidden file
/// through the net directory.
fn verify_security_file(
    conn: &mut Connection<TcpStream>,
    state: &ServerState,
    net_directory: &Path,
    claimed_secret: SecretGuid,
) -> io::Result<SecretGuid> {
    if claimed_secret != [0u8; 16] {
        return state
            .sessions
            .get(claimed_secret)
            .map(|_| claimed_secret)
            .ok_or_else(|| io::Error::other("unknown session secret"));
    }

    let secret_guid = generate_secret_guid(&state.secret_counter);
    let filename_guid = generate_secret_guid(&state.secret_counter);
    let nonce_path = net_directory.join(format!(".relaycopy-{}", secret_guid_hex(&filename_guid)));

    {
        let mut writer = core::fs::WriteAdapter::new(state.fs.open_write(&nonce_path)?);
        writer.write_all(&secret_guid)?;
    }

    let exchange: io::Result<SecretGuid> = (|| {
        conn.guarded(|stream| stream.write_all(&filename_guid))?;
        let mut echoed = [0u8; 16];
        conn.guarded(|stream| stream.read_exact(&mut echoed))?;
        Ok(echoed)
    })();

    let _ = state.fs.delete(&nonce_path);

    match exchange {
        Ok(echoed) if echoed == secret_guid => Ok(secret_guid),
        Ok(_) => Err(io::Error::other("security-file secret mismatch")),
        Err(err) => Err(err),
    }
}

fn send_byte(conn: &mut Connection<TcpStream>, byte: u8) -> io::Result<()> {
    conn.guarded(|stream| stream.write_all(&[byte]))
}

fn handle_write_file(
    conn: &mut Connection<TcpStream>,
    state: &ServerState,
    session: &ActiveSession,
    cmd: &WriteFileCommand,
) -> io::Result<()> {
    let ctx = state.context();
    let mut decision = decision::decide_write_file(&ctx, session, cmd)?;

    if matches!(decision, WriteDecision::NeedsHash) {
        send_byte(conn, WriteFileResponse::Hash.to_byte())?;
        let mut hash_bytes = [0u8; 16];
        conn.guarded(|stream| stream.read_exact(&mut hash_bytes))?;
        decision =
            decision::decide_write_file_after_hash(&ctx, session, cmd, Hash::from_bytes(hash_bytes))?;
    }

    match decision {
        WriteDecision::Terminal(resp) => {
            send_byte(conn, resp.to_byte())?;
            if resp == WriteFileResponse::Link {
                state.counters.record_link();
            }
        }
        WriteDecision::NeedsHash => unreachable!("resolved above"),
        WriteDecision::Transfer(resp) => {
            send_byte(conn, resp.to_byte())?;
            let dest_path = session.net_directory.join(&cmd.path);
            let compressed = !matches!(resp, WriteFileResponse::CopyUsingSmb);

            let receive: io::Result<()> = (|| {
                let mut writer = core::fs::WriteAdapter::new(state.fs.open_write(&dest_path)?);
                if resp == WriteFileResponse::CopyDelta {
                    let key = decision::file_key_for(&cmd.path, cmd.file_info);
                    let reference_path = state
                        .db
                        .lock()
                        .unwrap()
                        .find_delta_candidate(&key)
                        .map(|record| record.full_path)
                        .ok_or_else(|| io::Error::other("delta reference vanished"))?;
                    let reference_path = std::path::Path::new(&reference_path);
                    let signature = {
                        let mut reference = core::fs::ReadAdapter::new(state.fs.open_read(reference_path)?);
                        delta::Signature::generate(&mut reference, delta::DEFAULT_BLOCK_SIZE)?
                    };
                    conn.guarded(|stream| protocol::send_signature(stream, &signature))?;
                    let ops = conn.guarded(|stream| protocol::recv_delta_ops(stream))?;
                    let reference = state.fs.open_read(reference_path)?;
                    let mut shim = SeekShim::new(reference);
                    delta::patch(&mut shim, &ops, &mut writer)
                } else {
                    conn.guarded(|stream| protocol::recv_file_body(stream, &mut writer, compressed))
                }
            })();

            let success = receive.is_ok();
            if success {
                let hash = {
                    let mut reader = core::fs::ReadAdapter::new(state.fs.open_read(&dest_path)?);
                    checksums::digest_reader(&mut reader)?.0
                };
                decision::finalize_write(&ctx, session, cmd, hash)?;
                state.counters.record_write();
                state.counters.record_compression_level(cmd.compression_level);
            }
            conn.guarded(|stream| stream.write_all(&[TrailingSuccess(success).to_byte()]))?;
        }
    }
    Ok(())
}

fn handle_read_file(
    conn: &mut Connection<TcpStream>,
    state: &ServerState,
    bound: &Bound,
    connection_id: u64,
    cmd: &ReadFileCommand,
) -> io::Result<()> {
    let ctx = state.context();
    let decision = decision::decide_read_file(
        &ctx,
        &state.admission,
        bound.connection_index,
        connection_id,
        cmd,
        &bound.session.net_directory,
    )?;

    match decision {
        ReadDecision::Terminal(resp) => send_byte(conn, resp.to_byte())?,
        ReadDecision::NeedsHash => send_byte(conn, ReadFileResponse::Hash.to_byte())?,
        ReadDecision::Transfer(resp) => {
            send_byte(conn, resp.to_byte())?;
            let source_path = bound.session.net_directory.join(&cmd.path);
            if resp == ReadFileResponse::CopyDelta {
                let signature = conn.guarded(protocol::recv_signature)?;
                let mut reader = core::fs::ReadAdapter::new(state.fs.open_read(&source_path)?);
                let ops = delta::encode_delta(&signature, &mut reader)?;
                conn.guarded(|stream| protocol::send_delta_ops(stream, &ops))?;
            } else {
                let mut reader = core::fs::ReadAdapter::new(state.fs.open_read(&source_path)?);
                conn.guarded(|stream| protocol::send_file_body(stream, &mut reader, cmd.compression_level))?;
            }
            state.counters.record_read();
            state.counters.record_compression_level(cmd.compression_level);
        }
    }
    Ok(())
}
