#![deny(missing_docs)]

//! Binary-delta signature/delta/patch pipeline (spec §4.1, §4.6).
//!
//! The pipeline has three stages, mirroring the server-initiated exchange
//! in spec §4.6 ("The server initiates the signature→delta→patch
//! exchange"): [`signature::Signature::generate`] runs against the
//! reference file the server already holds; [`ops::encode_delta`] runs on
//! the sender against the target file and the received signature;
//! [`ops::patch`] runs on the receiver against its local reference file and
//! the received op stream.

pub mod ops;
pub mod rolling;
pub mod signature;

pub use ops::{deserialize, encode_delta, patch, serialize, DeltaOp};
pub use rolling::RollingChecksum;
pub use signature::{BlockSignature, Signature, DEFAULT_BLOCK_SIZE};
