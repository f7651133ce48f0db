#![deny(missing_docs)]

//! Length-prefixed command framing and TCP socket setup (spec §4.1).
//!
//! [`record`] implements the `{total_size, kind, ...}` record codec every
//! command rides on; [`connection::Connection`] adds the poisoning
//! discipline spec §4.1 requires on send/receive failure; [`socket`] applies
//! the transport's Nagle/buffer-size tuning and the listener's cooperative
//! accept-poll loop (spec §4.4, §5).

pub mod connection;
pub mod record;
pub mod socket;

pub use connection::Connection;
pub use record::{is_orderly_close, read_record, write_record, MAX_RECORD_SIZE};
pub use socket::{
    accept_cooperatively, configure_stream, ACCEPT_POLL_INTERVAL, DEFAULT_RECV_BUFFER_SIZE,
    DEFAULT_SEND_BUFFER_SIZE,
};
