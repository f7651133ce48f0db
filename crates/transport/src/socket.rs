//! TCP socket tuning and cooperative-shutdown accept polling (spec §4.1,
//! §4.4, §5): Nagle disabled, multi-megabyte send buffer, short listener
//! poll timeout so the server's shutdown signal can be observed promptly.

use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use socket2::SockRef;

/// Default send-socket buffer size (spec §6: "4 MiB send socket buffer").
pub const DEFAULT_SEND_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Default receive buffer size (spec §6: "512 KiB receive buffer").
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 512 * 1024;

/// Interval the listener polls at while waiting for a connection, allowing
/// a shutdown signal to be observed between polls.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Applies the transport's socket tuning to a connected stream: disables
/// Nagle's algorithm and sizes the send/receive buffers.
pub fn configure_stream(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nodelay(true)?;
    let sock = SockRef::from(stream);
    sock.set_send_buffer_size(DEFAULT_SEND_BUFFER_SIZE)?;
    sock.set_recv_buffer_size(DEFAULT_RECV_BUFFER_SIZE)?;
    Ok(())
}

/// Accepts one connection from `listener`, polling in `ACCEPT_POLL_INTERVAL`
/// increments so callers can re-check a shutdown flag between attempts.
/// Returns `Ok(None)` if `deadline_check` reports shutdown before a
/// connection arrives.
pub fn accept_cooperatively(
    listener: &TcpListener,
    mut should_stop: impl FnMut() -> bool,
) -> std::io::Result<Option<(TcpStream, std::net::SocketAddr)>> {
    listener.set_nonblocking(true)?;
    loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                listener.set_nonblocking(false)?;
                return Ok(Some((stream, addr)));
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                if should_stop() {
                    return Ok(None);
                }
                let start = Instant::now();
                while start.elapsed() < ACCEPT_POLL_INTERVAL {
                    thread::sleep(Duration::from_millis(10));
                    if should_stop() {
                        return Ok(None);
                    }
                }
            }
            Err(err) => return Err(err),
        }
    }
}
