//! Saves and restores a [`FileDatabase`] as a bincode-encoded history list
//! (spec §4.11), so a long-running client does not re-prime its link
//! database from scratch on every invocation.

use std::io::{self, Read, Write};

use core::{FileKey, Hash};
use serde::{Deserialize, Serialize};

use crate::FileDatabase;

#[derive(Serialize, Deserialize)]
struct Row {
    key: FileKey,
    full_path: String,
    hash: Hash,
}

/// Serializes `db`'s history (oldest first) to `writer` as a bincode-encoded
/// sequence.
pub fn save(db: &FileDatabase, writer: &mut impl Write) -> io::Result<()> {
    let rows: Vec<Row> = db
        .iter_history()
        .map(|(key, path, hash)| Row {
            key: key.clone(),
            full_path: path.to_string(),
            hash,
        })
        .collect();
    bincode::serialize_into(writer, &rows).map_err(|e| io::Error::other(e.to_string()))
}

/// Restores a [`FileDatabase`] from bytes written by [`save`], replaying
/// rows in their original history order so eviction order is preserved.
pub fn load(reader: &mut impl Read) -> io::Result<FileDatabase> {
    let rows: Vec<Row> =
        bincode::deserialize_from(reader).map_err(|e| io::Error::other(e.to_string()))?;
    let mut db = FileDatabase::new();
    for row in rows {
        db.insert(row.key, row.full_path, row.hash);
    }
    Ok(db)
}
