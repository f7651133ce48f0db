//! Local-to-local content and link decisions (spec §4.6), used when the
//! engine is not routed through a peer connection (`UseServer::Disabled`,
//! or a connection that fell back to direct I/O per spec §7).

use std::io;
use std::path::Path;
use std::sync::Mutex;

use core::fs::{FileSystem, ReadAdapter, WriteAdapter};
use core::key::{FileInfo, FileKey};
use filedb::FileDatabase;

use crate::settings::ClientSettings;
use crate::stats::Stats;

/// What happened to one file processed by [`copy_local`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalOutcome {
    /// Destination already matched source metadata; nothing was written.
    Skipped,
    /// A hard link was created against a previously seen copy of this
    /// content.
    Linked,
    /// The file's bytes were copied in full.
    Copied,
}

/// Decides and performs the copy/link/skip action for one local source file
/// against its local destination, updating `db` and `stats` as it goes.
///
/// Mirrors the server's `WriteFile` decision tree (spec §4.6) but without a
/// network hop: the "does the destination already have this content"
/// question is answered against the local [`FileDatabase`] instead of the
/// server's.
pub fn copy_local(
    fs: &dyn FileSystem,
    db: &Mutex<FileDatabase>,
    settings: &ClientSettings,
    name: &str,
    src_path: &Path,
    dest_path: &Path,
    info: FileInfo,
    stats: &mut Stats,
) -> io::Result<LocalOutcome> {
    if !settings.force_copy {
        if let Ok(dest_info) = fs.stat(dest_path) {
            if dest_info == info {
                stats.skip_count += 1;
                stats.skip_size += info.size;
                return Ok(LocalOutcome::Skipped);
            }
        }
    }

    let key = FileKey::new(name, info.last_write_time, info.size);

    if info.size >= settings.use_links_threshold {
        let mut reader = ReadAdapter::new(fs.open_read(src_path)?);
        let (hash, hash_stats) = checksums::digest_reader(&mut reader)?;
        stats.bytes_hashed += hash_stats.bytes_hashed;
        stats.hash_time += hash_stats.elapsed;

        let candidate = db.lock().unwrap().get_by_hash(hash);
        if let Some(record) = candidate {
            let reference = Path::new(&record.full_path);
            if reference != dest_path && fs.hardlink(reference, dest_path).is_ok() {
                db.lock().unwrap().insert(key, dest_path.to_string_lossy(), hash);
                stats.link_count += 1;
                return Ok(LocalOutcome::Linked);
            }
        }

        copy_bytes(fs, src_path, dest_path)?;
        fs.set_mtime(dest_path, info.last_write_time)?;
        db.lock().unwrap().insert(key, dest_path.to_string_lossy(), hash);
        stats.copy_count += 1;
        stats.copy_size += info.size;
        return Ok(LocalOutcome::Copied);
    }

    copy_bytes(fs, src_path, dest_path)?;
    fs.set_mtime(dest_path, info.last_write_time)?;
    db.lock().unwrap().insert(key, dest_path.to_string_lossy(), core::Hash::ZERO);
    stats.copy_count += 1;
    stats.copy_size += info.size;
    Ok(LocalOutcome::Copied)
}

fn copy_bytes(fs: &dyn FileSystem, src_path: &Path, dest_path: &Path) -> io::Result<()> {
    let mut reader = ReadAdapter::new(fs.open_read(src_path)?);
    let mut writer = WriteAdapter::new(fs.open_write(dest_path)?);
    io::copy(&mut reader, &mut writer)?;
    Ok(())
}
