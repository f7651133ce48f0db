//! The length-prefixed command record: `{total_size: u32, kind: u8, ...}`
//! (spec §4.1, §6). `total_size` covers the whole record including itself
//! and the kind byte; the reader trusts it to know how much to read.

use std::io::{self, Read, Write};

/// Records larger than this are a protocol error, bounding how much a
/// misbehaving peer can make a receiver allocate.
pub const MAX_RECORD_SIZE: u32 = 16 * 1024 * 1024;

/// Writes one record: `kind` followed by `payload`, all-or-nothing. Short
/// writes are looped internally by [`Write::write_all`]; on error the caller
/// must treat the connection as poisoned (see [`crate::Connection`]).
pub fn write_record(writer: &mut impl Write, kind: u8, payload: &[u8]) -> io::Result<()> {
    let total_size = u32::try_from(5 + payload.len())
        .map_err(|_| io::Error::other("record payload too large to frame"))?;
    writer.write_all(&total_size.to_le_bytes())?;
    writer.write_all(&[kind])?;
    writer.write_all(payload)
}

/// Reads one record. A zero-byte read at the very start of `total_size`
/// means the peer closed the connection in an orderly fashion; any other
/// short read is an I/O error.
pub fn read_record(reader: &mut impl Read) -> io::Result<(u8, Vec<u8>)> {
    let mut size_buf = [0u8; 4];
    reader.read_exact(&mut size_buf)?;
    let total_size = u32::from_le_bytes(size_buf);
    if total_size < 5 {
        return Err(io::Error::other(format!(
            "record total_size {total_size} smaller than the 5-byte header"
        )));
    }
    if total_size > MAX_RECORD_SIZE {
        return Err(io::Error::other(format!(
            "record of {total_size} bytes exceeds the {MAX_RECORD_SIZE}-byte cap"
        )));
    }
    let mut kind_buf = [0u8; 1];
    reader.read_exact(&mut kind_buf)?;
    let payload_len = (total_size - 5) as usize;
    let mut payload = vec![0u8; payload_len];
    reader.read_exact(&mut payload)?;
    Ok((kind_buf[0], payload))
}

/// Returns `true` if `err` represents an orderly peer close rather than a
/// genuine I/O failure (a zero-byte read where at least one byte was
/// expected surfaces as [`io::ErrorKind::UnexpectedEof`]).
#[must_use]
pub fn is_orderly_close(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
}
