//! Command kinds and their wire payloads (spec §4.1, §6).

use std::io;

use core::FileInfo;

use crate::wire::{decode_file_info, decode_utf16, encode_file_info, encode_utf16};

/// Single-byte command discriminants.
pub mod kind {
    /// Unsolicited server greeting.
    pub const VERSION: u8 = 0;
    /// Human-readable text, used for diagnostics.
    pub const TEXT: u8 = 1;
    /// Client asks the server to accept a file.
    pub const WRITE_FILE: u8 = 2;
    /// Client asks the server to send a file.
    pub const READ_FILE: u8 = 3;
    /// Client asks the server to create a directory.
    pub const CREATE_DIR: u8 = 4;
    /// First command on every connection: binds the session.
    pub const ENVIRONMENT: u8 = 5;
    /// Recursive delete under a path.
    pub const DELETE_FILES: u8 = 6;
    /// Terminates the command loop.
    pub const DONE: u8 = 7;
    /// Requests the `/STATS`-style human-readable report.
    pub const REQUEST_REPORT: u8 = 8;
    /// Server-side directory enumeration.
    pub const FIND_FILES: u8 = 9;
    /// Server-side single-path stat.
    pub const GET_FILE_INFO: u8 = 10;
}

/// `flags` bit reserved on [`VersionCommand`] for the security-file scheme.
pub const FLAG_USE_SECURITY_FILE: u32 = 1 << 0;

/// 16-byte session secret exchanged during the `Environment` handshake.
pub type SecretGuid = [u8; 16];

/// Renders a [`SecretGuid`] as lowercase hex, the form both sides derive a
/// security-file's hidden filename from so the derivation matches without
/// either side sending the filename as a separate string.
#[must_use]
pub fn secret_guid_hex(guid: &SecretGuid) -> String {
    let mut out = String::with_capacity(32);
    for byte in guid {
        use std::fmt::Write as _;
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Unsolicited greeting the server sends immediately after accepting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionCommand {
    /// Protocol version implemented by the sender.
    pub protocol_version: u32,
    /// Capability flags; bit 0 is [`FLAG_USE_SECURITY_FILE`].
    pub flags: u32,
    /// Free-form implementation identifier.
    pub info: String,
}

impl VersionCommand {
    /// Whether the sender requires the security-file handshake.
    #[must_use]
    pub const fn use_security_file(&self) -> bool {
        self.flags & FLAG_USE_SECURITY_FILE != 0
    }
}

/// First command on a connection: binds `secret_guid`, `connection_index`,
/// and the net directory (spec §4.2).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvironmentCommand {
    /// Delta-compression threshold, in bytes, the client will honor.
    pub delta_threshold: u64,
    /// 0 for the controlling connection, 1..N for workers.
    pub connection_index: u32,
    /// Client major version.
    pub major: u16,
    /// Client minor version.
    pub minor: u16,
    /// Session secret; zero means "request a new one" under the
    /// security-file scheme.
    pub secret_guid: SecretGuid,
    /// UNC or local path identifying the session's working directory.
    pub net_directory: String,
}

/// `WriteFile` request: client offers a file for the server to accept.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteFileCommand {
    /// Client-chosen write strategy hint.
    pub write_type: u8,
    /// Compression level the client used (or will use) encoding the body
    /// that follows, so the server can fold it into `compressionLevelSum`.
    pub compression_level: u8,
    /// Source file metadata.
    pub file_info: FileInfo,
    /// Destination-relative path.
    pub path: String,
}

/// `ReadFile` request: client asks the server to stream a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadFileCommand {
    /// Requested compression level (`0` off, `1..=22` fixed, `255` dynamic).
    pub compression_level: u8,
    /// Client's best-known metadata for the source file, if any.
    pub file_info: FileInfo,
    /// Source-relative path.
    pub path: String,
}

/// A decoded command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Unsolicited server greeting.
    Version(VersionCommand),
    /// Diagnostic text.
    Text(String),
    /// Client offers a file.
    WriteFile(WriteFileCommand),
    /// Client requests a file.
    ReadFile(ReadFileCommand),
    /// Ensure a destination directory exists.
    CreateDir {
        /// Path to ensure.
        path: String,
    },
    /// Bind the session.
    Environment(EnvironmentCommand),
    /// Recursively delete everything under a path.
    DeleteFiles {
        /// Path to delete.
        path: String,
    },
    /// Terminate the command loop.
    Done,
    /// Request the human-readable status report.
    RequestReport,
    /// Enumerate a server-side directory.
    FindFiles {
        /// Path to enumerate.
        path: String,
    },
    /// Stat a server-side path.
    GetFileInfo {
        /// Path to stat.
        path: String,
    },
}

impl Command {
    /// Encodes the command into its `(kind, payload)` wire form. The
    /// transport layer is responsible for prefixing the record length.
    #[must_use]
    pub fn encode(&self) -> (u8, Vec<u8>) {
        match self {
            Self::Version(cmd) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(&cmd.protocol_version.to_le_bytes());
                payload.extend_from_slice(&cmd.flags.to_le_bytes());
                payload.extend_from_slice(&encode_utf16(&cmd.info));
                (kind::VERSION, payload)
            }
            Self::Text(text) => (kind::TEXT, encode_utf16(text)),
            Self::WriteFile(cmd) => {
                let mut payload = Vec::with_capacity(2 + 24);
                payload.push(cmd.write_type);
                payload.push(cmd.compression_level);
                payload.extend_from_slice(&encode_file_info(&cmd.file_info));
                payload.extend_from_slice(&encode_utf16(&cmd.path));
                (kind::WRITE_FILE, payload)
            }
            Self::ReadFile(cmd) => {
                let mut payload = Vec::with_capacity(1 + 24);
                payload.push(cmd.compression_level);
                payload.extend_from_slice(&encode_file_info(&cmd.file_info));
                payload.extend_from_slice(&encode_utf16(&cmd.path));
                (kind::READ_FILE, payload)
            }
            Self::CreateDir { path } => (kind::CREATE_DIR, encode_utf16(path)),
            Self::Environment(cmd) => {
                let mut payload = Vec::new();
                payload.extend_from_slice(&cmd.delta_threshold.to_le_bytes());
                payload.extend_from_slice(&cmd.connection_index.to_le_bytes());
                payload.extend_from_slice(&cmd.major.to_le_bytes());
                payload.extend_from_slice(&cmd.minor.to_le_bytes());
                payload.extend_from_slice(&cmd.secret_guid);
                payload.extend_from_slice(&encode_utf16(&cmd.net_directory));
                (kind::ENVIRONMENT, payload)
            }
            Self::DeleteFiles { path } => (kind::DELETE_FILES, encode_utf16(path)),
            Self::Done => (kind::DONE, Vec::new()),
            Self::RequestReport => (kind::REQUEST_REPORT, Vec::new()),
            Self::FindFiles { path } => (kind::FIND_FILES, encode_utf16(path)),
            Self::GetFileInfo { path } => (kind::GET_FILE_INFO, encode_utf16(path)),
        }
    }

    /// Decodes a `(kind, payload)` pair back into a [`Command`].
    pub fn decode(kind: u8, payload: &[u8]) -> io::Result<Self> {
        match kind {
            kind::VERSION => {
                if payload.len() < 8 {
                    return Err(truncated("Version"));
                }
                let protocol_version = u32::from_le_bytes(payload[0..4].try_into().unwrap());
                let flags = u32::from_le_bytes(payload[4..8].try_into().unwrap());
                let info = decode_utf16(&payload[8..])?;
                Ok(Self::Version(VersionCommand {
                    protocol_version,
                    flags,
                    info,
                }))
            }
            kind::TEXT => Ok(Self::Text(decode_utf16(payload)?)),
            kind::WRITE_FILE => {
                if payload.len() < 2 + 24 {
                    return Err(truncated("WriteFile"));
                }
                let write_type = payload[0];
                let compression_level = payload[1];
                let file_info = decode_file_info(&payload[2..26])?;
                let path = decode_utf16(&payload[26..])?;
                Ok(Self::WriteFile(WriteFileCommand {
                    write_type,
                    compression_level,
                    file_info,
                    path,
                }))
            }
            kind::READ_FILE => {
                if payload.len() < 1 + 24 {
                    return Err(truncated("ReadFile"));
                }
                let compression_level = payload[0];
                let file_info = decode_file_info(&payload[1..25])?;
                let path = decode_utf16(&payload[25..])?;
                Ok(Self::ReadFile(ReadFileCommand {
                    compression_level,
                    file_info,
                    path,
                }))
            }
            kind::CREATE_DIR => Ok(Self::CreateDir {
                path: decode_utf16(payload)?,
            }),
            kind::ENVIRONMENT => {
                if payload.len() < 8 + 4 + 2 + 2 + 16 {
                    return Err(truncated("Environment"));
                }
                let delta_threshold = u64::from_le_bytes(payload[0..8].try_into().unwrap());
                let connection_index = u32::from_le_bytes(payload[8..12].try_into().unwrap());
                let major = u16::from_le_bytes(payload[12..14].try_into().unwrap());
                let minor = u16::from_le_bytes(payload[14..16].try_into().unwrap());
                let mut secret_guid = [0u8; 16];
                secret_guid.copy_from_slice(&payload[16..32]);
                let net_directory = decode_utf16(&payload[32..])?;
                Ok(Self::Environment(EnvironmentCommand {
                    delta_threshold,
                    connection_index,
                    major,
                    minor,
                    secret_guid,
                    net_directory,
                }))
            }
            kind::DELETE_FILES => Ok(Self::DeleteFiles {
                path: decode_utf16(payload)?,
            }),
            kind::DONE => Ok(Self::Done),
            kind::REQUEST_REPORT => Ok(Self::RequestReport),
            kind::FIND_FILES => Ok(Self::FindFiles {
                path: decode_utf16(payload)?,
            }),
            kind::GET_FILE_INFO => Ok(Self::GetFileInfo {
                path: decode_utf16(payload)?,
            }),
            other => Err(io::Error::other(format!("unknown command kind {other}"))),
        }
    }
}

fn truncated(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, format!("truncated {name} payload"))
}
