//! The client's half of the wire protocol (spec §4.1, §4.2, §4.6): the
//! counterpart to `relaycopy-server`'s `listener` module, driving the same
//! command/response sequence from the other end of the socket.

use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;

use core::fs::FileSystem;
use core::{FileInfo, SeekShim};
use protocol::{
    kind, Command, CreateDirResponse, DeleteFilesResponse, DoneFooter, EnvironmentCommand,
    ReadFileCommand, ReadFileResponse, SecretGuid, TrailingSuccess, VersionCommand,
    WriteFileCommand, WriteFileResponse,
};
use transport::Connection;

/// Protocol version this client speaks. A server greeting that disagrees is
/// a version mismatch (spec §7): `Automatic` mode downgrades to direct I/O
/// with a one-time warning, `Required` mode is fatal.
pub const CLIENT_PROTOCOL_VERSION: u32 = 1;

/// Outcome of a driven `WriteFile` exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Bytes were transferred (plain, delta, or SMB-path) and committed.
    Transferred(WriteFileResponse),
    /// The server satisfied the request without a transfer.
    Linked,
    /// The server performed a server-local offloaded copy.
    Odx,
    /// Destination already matched; nothing was sent.
    Skipped,
}

/// Outcome of a driven `ReadFile` exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Bytes were received and written to the destination.
    Transferred,
    /// Destination already matched; nothing was received.
    Skipped,
    /// Admission control rejected the request; caller should requeue.
    ServerBusy,
}

/// Cleans `net_directory` the same way the server's `resolve_net_directory`
/// does, so both sides land on the same local path for the shared net
/// directory.
fn resolve_local_directory(root: &Path, net_directory: &str) -> std::path::PathBuf {
    let cleaned = net_directory.trim_start_matches('\\').replace('\\', "/");
    root.join(cleaned)
}

/// The client's half of the security-file handshake (spec §4.2): reads the
/// filename GUID the server sends, opens the nonce file it names under
/// `local_net_directory`, and echoes its content back as the proven secret.
fn prove_security_file(
    conn: &mut Connection<TcpStream>,
    fs: &dyn FileSystem,
    local_net_directory: &Path,
    net_directory: &str,
) -> io::Result<SecretGuid> {
    let mut filename_guid = [0u8; 16];
    conn.guarded(|s| s.read_exact(&mut filename_guid))?;

    let dir = resolve_local_directory(local_net_directory, net_directory);
    let nonce_path = dir.join(format!(".relaycopy-{}", protocol::secret_guid_hex(&filename_guid)));
    let mut secret = [0u8; 16];
    {
        let mut reader = core::fs::ReadAdapter::new(fs.open_read(&nonce_path)?);
        reader.read_exact(&mut secret)?;
    }
    conn.guarded(|s| s.write_all(&secret))?;
    Ok(secret)
}

/// A connected, environment-bound session with a peer server.
pub struct PeerConnection {
    conn: Connection<TcpStream>,
    server_protocol_version: u32,
    bound_secret_guid: SecretGuid,
}

impl PeerConnection {
    /// Connects to `addr`, reads the server's greeting, and binds the
    /// session with an `Environment` command.
    ///
    /// When the greeting requires the security-file handshake and
    /// `secret_guid` is still all-zero, performs the client's half of it
    /// against `local_net_directory` (this side's view of the same share
    /// the server resolves `net_directory` under) and returns the proven
    /// secret via [`Self::bound_secret_guid`], so later connections on the
    /// same session can skip straight to the nonzero-secret path.
    pub fn connect(
        addr: SocketAddr,
        connection_index: u32,
        secret_guid: SecretGuid,
        net_directory: String,
        delta_threshold: u64,
        fs: &dyn FileSystem,
        local_net_directory: &Path,
    ) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        transport::configure_stream(&stream)?;
        let mut conn = Connection::new(stream);

        let (greeting_kind, greeting_payload) = conn.recv_record()?;
        let greeting = Command::decode(greeting_kind, &greeting_payload)?;
        let Command::Version(version) = greeting else {
            return Err(io::Error::other("expected a Version greeting"));
        };
        let protocol_version = version.protocol_version;

        let env = Command::Environment(EnvironmentCommand {
            delta_threshold,
            connection_index,
            major: 1,
            minor: 0,
            secret_guid,
            net_directory: net_directory.clone(),
        });
        let (k, p) = env.encode();
        conn.send_record(k, &p)?;

        let bound_secret_guid = if version.use_security_file() && secret_guid == [0u8; 16] {
            prove_security_file(&mut conn, fs, local_net_directory, &net_directory)?
        } else {
            secret_guid
        };

        Ok(Self {
            conn,
            server_protocol_version: protocol_version,
            bound_secret_guid,
        })
    }

    /// Whether the server's greeting matched [`CLIENT_PROTOCOL_VERSION`].
    #[must_use]
    pub fn protocol_matches(&self) -> bool {
        self.server_protocol_version == CLIENT_PROTOCOL_VERSION
    }

    /// The secret GUID this connection bound under: the caller's original
    /// `secret_guid` unless a fresh security-file proof replaced it.
    #[must_use]
    pub fn bound_secret_guid(&self) -> SecretGuid {
        self.bound_secret_guid
    }

    /// Offers `path`'s content to the server under the `WriteFile` protocol,
    /// reading source bytes through `fs` (possibly more than once: a plain
    /// copy reads once, a delta transfer reads once for the signature
    /// exchange and the source is never re-read after that, since
    /// `encode_delta` only needs to see it a single time).
    pub fn write_file(
        &mut self,
        fs: &dyn FileSystem,
        source_path: &Path,
        info: FileInfo,
        dest_path: &str,
        compression_level: u8,
    ) -> io::Result<WriteOutcome> {
        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level,
            file_info: info,
            path: dest_path.to_string(),
        };
        let (k, p) = Command::WriteFile(cmd).encode();
        self.conn.send_record(k, &p)?;

        loop {
            let mut byte = [0u8; 1];
            self.conn.guarded(|s| s.read_exact(&mut byte))?;
            let resp = WriteFileResponse::from_byte(byte[0])?;

            match resp {
                WriteFileResponse::BadDestination => {
                    return Err(io::Error::other("server has no environment bound"));
                }
                WriteFileResponse::Skip => return Ok(WriteOutcome::Skipped),
                WriteFileResponse::Link => return Ok(WriteOutcome::Linked),
                WriteFileResponse::Odx => return Ok(WriteOutcome::Odx),
                WriteFileResponse::Hash => {
                    let mut reader = core::fs::ReadAdapter::new(fs.open_read(source_path)?);
                    let (hash, _stats) = checksums::digest_reader(&mut reader)?;
                    self.conn.guarded(|s| s.write_all(hash.as_bytes()))?;
                    continue;
                }
                WriteFileResponse::CopyDelta => {
                    let signature = self.conn.guarded(protocol::recv_signature)?;
                    let mut reader = core::fs::ReadAdapter::new(fs.open_read(source_path)?);
                    let ops = delta::encode_delta(&signature, &mut reader)?;
                    self.conn
                        .guarded(|s| protocol::send_delta_ops(s, &ops))?;
                    return self.finish_write(resp);
                }
                WriteFileResponse::Copy | WriteFileResponse::CopyUsingSmb => {
                    let mut reader = core::fs::ReadAdapter::new(fs.open_read(source_path)?);
                    self.conn.guarded(|s| {
                        protocol::send_file_body(s, &mut reader, compression_level).map(|_| ())
                    })?;
                    return self.finish_write(resp);
                }
            }
        }
    }

    fn finish_write(&mut self, resp: WriteFileResponse) -> io::Result<WriteOutcome> {
        let mut byte = [0u8; 1];
        self.conn.guarded(|s| s.read_exact(&mut byte))?;
        if TrailingSuccess::from_byte(byte[0]).0 {
            Ok(WriteOutcome::Transferred(resp))
        } else {
            Err(io::Error::other("server failed to commit the write"))
        }
    }

    /// Requests `source_path` from the server under the `ReadFile` protocol,
    /// writing the result to `dest_path` through `fs`.
    ///
    /// `CopyDelta` reverses the roles `write_file` uses: the client
    /// generates a signature of its own stale `dest_path`, the server
    /// encodes the delta ops against it, and the client patches them into a
    /// fresh file before atomically replacing `dest_path`.
    pub fn read_file(
        &mut self,
        fs: &dyn FileSystem,
        source_path: &str,
        info: FileInfo,
        dest_path: &Path,
        compression_level: u8,
    ) -> io::Result<ReadOutcome> {
        let cmd = ReadFileCommand {
            compression_level,
            file_info: info,
            path: source_path.to_string(),
        };
        let (k, p) = Command::ReadFile(cmd).encode();
        self.conn.send_record(k, &p)?;

        loop {
            let mut byte = [0u8; 1];
            self.conn.guarded(|s| s.read_exact(&mut byte))?;
            let resp = ReadFileResponse::from_byte(byte[0])?;

            match resp {
                ReadFileResponse::BadSource => {
                    return Err(io::Error::other("server has no environment bound"));
                }
                ReadFileResponse::Skip => return Ok(ReadOutcome::Skipped),
                ReadFileResponse::ServerBusy => return Ok(ReadOutcome::ServerBusy),
                ReadFileResponse::Hash => {
                    let mut reader = core::fs::ReadAdapter::new(fs.open_read(dest_path)?);
                    let (hash, _stats) = checksums::digest_reader(&mut reader)?;
                    self.conn.guarded(|s| s.write_all(hash.as_bytes()))?;
                    continue;
                }
                ReadFileResponse::CopyDelta => {
                    let signature = {
                        let mut reader = core::fs::ReadAdapter::new(fs.open_read(dest_path)?);
                        delta::Signature::generate(&mut reader, delta::DEFAULT_BLOCK_SIZE)?
                    };
                    self.conn.guarded(|s| protocol::send_signature(s, &signature))?;
                    let ops = self.conn.guarded(protocol::recv_delta_ops)?;

                    let temp_path = {
                        let mut name =
                            dest_path.file_name().and_then(|n| n.to_str()).unwrap_or("relaycopy").to_string();
                        name.push_str(".relaycopy-tmp");
                        dest_path.with_file_name(name)
                    };
                    {
                        let mut reference = SeekShim::new(fs.open_read(dest_path)?);
                        let mut writer = core::fs::WriteAdapter::new(fs.open_write(&temp_path)?);
                        delta::patch(&mut reference, &ops, &mut writer)?;
                    }
                    fs.move_file(&temp_path, dest_path)?;
                    return Ok(ReadOutcome::Transferred);
                }
                ReadFileResponse::Copy | ReadFileResponse::CopyUsingSmb => {
                    let mut writer = core::fs::WriteAdapter::new(fs.open_write(dest_path)?);
                    let compressed = resp != ReadFileResponse::CopyUsingSmb;
                    self.conn
                        .guarded(|s| protocol::recv_file_body(s, &mut writer, compressed))?;
                    return Ok(ReadOutcome::Transferred);
                }
            }
        }
    }

    /// Issues `CreateDir` and returns the number of directory levels freshly
    /// created (spec §4.2).
    pub fn create_dir(&mut self, path: &str) -> io::Result<CreateDirResponse> {
        let (k, p) = Command::CreateDir { path: path.to_string() }.encode();
        self.conn.send_record(k, &p)?;
        let mut byte = [0u8; 1];
        self.conn.guarded(|s| s.read_exact(&mut byte))?;
        Ok(CreateDirResponse::from_byte(byte[0]))
    }

    /// Issues `DeleteFiles`, recursively deleting everything under `path`.
    pub fn delete_files(&mut self, path: &str) -> io::Result<DeleteFilesResponse> {
        let (k, p) = Command::DeleteFiles { path: path.to_string() }.encode();
        self.conn.send_record(k, &p)?;
        let mut byte = [0u8; 1];
        self.conn.guarded(|s| s.read_exact(&mut byte))?;
        DeleteFilesResponse::from_byte(byte[0])
    }

    /// Enumerates a server-side directory, returning each child's name.
    pub fn find_files(&mut self, path: &str) -> io::Result<Vec<String>> {
        let (k, p) = Command::FindFiles { path: path.to_string() }.encode();
        self.conn.send_record(k, &p)?;
        let (resp_kind, payload) = self.conn.recv_record()?;
        if resp_kind != kind::TEXT {
            return Err(io::Error::other("expected a Text response to FindFiles"));
        }
        let text = protocol::wire::decode_utf16(&payload)?;
        Ok(if text.is_empty() {
            Vec::new()
        } else {
            text.lines().map(str::to_string).collect()
        })
    }

    /// Stats a server-side path.
    pub fn get_file_info(&mut self, path: &str) -> io::Result<FileInfo> {
        let (k, p) = Command::GetFileInfo { path: path.to_string() }.encode();
        self.conn.send_record(k, &p)?;
        let (resp_kind, payload) = self.conn.recv_record()?;
        if resp_kind != kind::TEXT || payload.len() < protocol::wire::FILE_INFO_WIRE_LEN {
            return Err(io::Error::other("expected a FileInfo-bearing Text response"));
        }
        protocol::wire::decode_file_info(&payload[..protocol::wire::FILE_INFO_WIRE_LEN])
    }

    /// Requests the human-readable `/STATS`-style report.
    pub fn request_report(&mut self) -> io::Result<String> {
        let (k, p) = Command::RequestReport.encode();
        self.conn.send_record(k, &p)?;
        let (resp_kind, payload) = self.conn.recv_record()?;
        if resp_kind != kind::TEXT {
            return Err(io::Error::other("expected a Text response to RequestReport"));
        }
        protocol::wire::decode_utf16(&payload)
    }

    /// Sends `Done` and consumes the matching footer, ending the session.
    pub fn done(mut self) -> io::Result<DoneFooter> {
        let (k, p) = Command::Done.encode();
        self.conn.send_record(k, &p)?;
        let (resp_kind, payload) = self.conn.recv_record()?;
        if resp_kind != kind::DONE {
            return Err(io::Error::other("expected a Done footer"));
        }
        DoneFooter::from_bytes(&payload)
    }
}
