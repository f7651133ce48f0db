//! A poisoning wrapper around a byte stream (spec §4.1: "on error the
//! connection is poisoned").

use std::io::{self, Read, Write};

use crate::record::{read_record, write_record};

/// Wraps a connected stream, refusing further use after the first I/O error.
pub struct Connection<S> {
    stream: S,
    poisoned: bool,
}

impl<S: Read + Write> Connection<S> {
    /// Wraps an already-connected stream.
    pub const fn new(stream: S) -> Self {
        Self {
            stream,
            poisoned: false,
        }
    }

    /// Whether a previous operation has poisoned this connection.
    #[must_use]
    pub const fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Sends one record, poisoning the connection on failure.
    pub fn send_record(&mut self, kind: u8, payload: &[u8]) -> io::Result<()> {
        self.guarded(|stream| write_record(stream, kind, payload))
    }

    /// Receives one record, poisoning the connection on failure.
    pub fn recv_record(&mut self) -> io::Result<(u8, Vec<u8>)> {
        self.guarded(read_record)
    }

    /// Gives a guarded closure direct access to the inner stream.
    pub fn guarded<T>(&mut self, f: impl FnOnce(&mut S) -> io::Result<T>) -> io::Result<T> {
        if self.poisoned {
            return Err(io::Error::other("connection is poisoned by a prior error"));
        }
        match f(&mut self.stream) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.poisoned = true;
                Err(err)
            }
        }
    }

    /// Returns the inner stream, consuming the connection.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Borrows the inner stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }
}
