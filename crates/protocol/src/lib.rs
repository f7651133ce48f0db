#![deny(missing_docs)]

//! Wire commands, responses, and the body-transfer plumbing they carry
//! (spec §4.1, §4.2, §6). This crate defines *what* goes on the wire; the
//! per-side state machines (server command loop, client connection) live in
//! `relaycopy-server` and `relaycopy-engine`, which depend on it.

pub mod command;
pub mod response;
pub mod transfer;
pub mod wire;

pub use command::{
    kind, secret_guid_hex, Command, EnvironmentCommand, ReadFileCommand, SecretGuid, VersionCommand,
    WriteFileCommand, FLAG_USE_SECURITY_FILE,
};
pub use response::{
    CreateDirResponse, DeleteFilesResponse, DoneFooter, ReadFileResponse, TrailingSuccess,
    WriteFileResponse, MAX_CREATED_DIR_LEVELS,
};
pub use transfer::{
    recv_delta_ops, recv_file_body, recv_signature, send_delta_ops, send_file_body, send_signature,
};
