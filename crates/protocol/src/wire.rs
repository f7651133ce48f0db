//! Primitive wire encodings shared by the command payloads (spec §6): UTF-16
//! inline strings and the 24-byte `FileInfo` layout.

use std::io;

use core::{FileInfo, FileTime};

/// Encodes `s` as a little-endian UTF-16 byte sequence, the `u16[]` shape
/// spec §6 uses for `info`, `net_directory`, and `path` tails.
#[must_use]
pub fn encode_utf16(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Decodes a little-endian UTF-16 byte sequence back into a `String`.
pub fn decode_utf16(bytes: &[u8]) -> io::Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(io::Error::other("UTF-16 field has an odd byte length"));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).map_err(io::Error::other)
}

/// Wire length of the fixed `FileInfo` record: three little-endian `u64`s.
pub const FILE_INFO_WIRE_LEN: usize = 24;

/// Encodes a [`FileInfo`] into its fixed 24-byte wire form.
#[must_use]
pub fn encode_file_info(info: &FileInfo) -> [u8; FILE_INFO_WIRE_LEN] {
    let mut out = [0u8; FILE_INFO_WIRE_LEN];
    out[0..8].copy_from_slice(&info.creation_time.as_raw().to_le_bytes());
    out[8..16].copy_from_slice(&info.last_write_time.as_raw().to_le_bytes());
    out[16..24].copy_from_slice(&info.size.to_le_bytes());
    out
}

/// Decodes a 24-byte `FileInfo` record.
pub fn decode_file_info(bytes: &[u8]) -> io::Result<FileInfo> {
    if bytes.len() != FILE_INFO_WIRE_LEN {
        return Err(io::Error::other(format!(
            "file_info field must be {FILE_INFO_WIRE_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    let creation_time = FileTime::from_raw(u64::from_le_bytes(bytes[0..8].try_into().unwrap()));
    let last_write_time = FileTime::from_raw(u64::from_le_bytes(bytes[8..16].try_into().unwrap()));
    let size = u64::from_le_bytes(bytes[16..24].try_into().unwrap());
    Ok(FileInfo::new(creation_time, last_write_time, size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf16_round_trips_ascii_and_unicode() {
        for s in ["plain/ascii/path.txt", "résumé/日本語.bin", ""] {
            let encoded = encode_utf16(s);
            assert_eq!(decode_utf16(&encoded).unwrap(), s);
        }
    }

    #[test]
    fn file_info_round_trips() {
        let info = FileInfo::new(FileTime::from_raw(1), FileTime::from_raw(2), 12345);
        let wire = encode_file_info(&info);
        assert_eq!(decode_file_info(&wire).unwrap(), info);
    }

    #[test]
    fn odd_length_utf16_is_rejected() {
        assert!(decode_utf16(&[0u8]).is_err());
    }
}
