//! Top-level orchestration: traversal, worker pool, purge, and priming tied
//! together into the one entry point a CLI or test calls (spec §4.5–§4.9).

use std::sync::atomic::AtomicU32;
use std::sync::{Arc, Mutex};

use core::fs::FileSystem;
use core::log::LogContext;
use core::{CoreError, CoreResult};
use filedb::FileDatabase;

use crate::entry::{CopyDestination, CopySource, DirEntry, WorkItem};
use crate::handled::HandledFiles;
use crate::prime::Primer;
use crate::purge::purge_dir;
use crate::settings::ClientSettings;
use crate::stats::Stats;
use crate::worker::{run_pool, WorkerContext};

/// Runs one full copy: seeds the queue with the source root, drains it with
/// a `thread_count`-sized worker pool (plus the caller), then purges unhandled
/// destination entries if requested, returning the merged [`Stats`].
///
/// `db` is shared across calls so a caller can prime it first (spec §4.9)
/// via [`Primer`] before invoking `process`.
pub fn process(
    settings: Arc<ClientSettings>,
    fs: Arc<dyn FileSystem>,
    db: Arc<Mutex<FileDatabase>>,
    log_ctx: &LogContext,
) -> CoreResult<Stats> {
    let root_destination = CopyDestination::Local(settings.destination.clone());
    let handled = Arc::new(HandledFiles::new());

    let ctx = Arc::new(WorkerContext {
        fs: Arc::clone(&fs),
        db: Arc::clone(&db),
        settings: Arc::clone(&settings),
        handled: Arc::clone(&handled),
        root_destination: root_destination.clone(),
        secret_guid: Mutex::new([0u8; 16]),
        next_connection_index: AtomicU32::new(0),
    });

    let queue = Arc::new(crate::queue::WorkQueue::new());
    queue.seed(WorkItem::Dir(DirEntry {
        source: CopySource::Local(settings.source.clone()),
        destination: root_destination,
        depth: 0,
    }));

    let mut stats = run_pool(ctx, queue, log_ctx.clone());

    if settings.purge_destination {
        purge_dir(fs.as_ref(), &settings, &handled, &settings.destination, 0, &mut stats)
            .map_err(|err| CoreError::io(settings.destination.to_string_lossy(), err))?;
    }

    Ok(stats)
}

/// Primes `db` from `reference_dir` before a [`process`] call, so early
/// link/delta decisions can reuse content already on disk there without
/// first needing to copy it (spec §4.9).
pub fn prime_then_process(
    settings: Arc<ClientSettings>,
    fs: Arc<dyn FileSystem>,
    db: Arc<Mutex<FileDatabase>>,
    reference_dir: impl Into<std::path::PathBuf>,
    log_ctx: &LogContext,
) -> CoreResult<Stats> {
    let primer = Primer::new();
    primer.prime_directory(reference_dir);
    primer
        .drain_all(fs.as_ref(), &db)
        .map_err(|err| CoreError::io("priming", err))?;
    primer.wait();
    process(settings, fs, db, log_ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::key::{FileInfo, FileTime};
    use std::collections::HashMap;
    use std::io::{Cursor, Read, Write};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex as StdMutex;
    use tracing::Span;

    struct MemHandle(Cursor<Vec<u8>>);
    impl Read for MemHandle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.0.read(buf)
        }
    }
    impl core::fs::ReadHandle for MemHandle {
        fn seek_to(&mut self, offset: u64) -> std::io::Result<()> {
            use std::io::{Seek, SeekFrom};
            self.0.seek(SeekFrom::Start(offset))?;
            Ok(())
        }
    }
    struct MemWriteHandle<'a> {
        fs: &'a InMemoryFs,
        path: PathBuf,
        buf: Vec<u8>,
    }
    impl Write for MemWriteHandle<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.buf.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    impl core::fs::WriteHandle for MemWriteHandle<'_> {}
    impl Drop for MemWriteHandle<'_> {
        fn drop(&mut self) {
            let info = FileInfo::new(FileTime(0), FileTime(0), self.buf.len() as u64);
            self.fs
                .files
                .lock()
                .unwrap()
                .insert(self.path.clone(), (std::mem::take(&mut self.buf), info));
        }
    }

    #[derive(Default)]
    struct InMemoryFs {
        files: StdMutex<HashMap<PathBuf, (Vec<u8>, FileInfo)>>,
        dirs: StdMutex<HashMap<PathBuf, Vec<core::fs::DirEntry>>>,
    }

    impl FileSystem for InMemoryFs {
        fn open_read(&self, path: &Path) -> std::io::Result<Box<dyn core::fs::ReadHandle>> {
            let files = self.files.lock().unwrap();
            let (bytes, _) =
                files.get(path).ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
            Ok(Box::new(MemHandle(Cursor::new(bytes.clone()))))
        }
        fn open_write(&self, path: &Path) -> std::io::Result<Box<dyn core::fs::WriteHandle>> {
            Ok(Box::new(MemWriteHandle { fs: self, path: path.to_path_buf(), buf: Vec::new() }))
        }
        fn stat(&self, path: &Path) -> std::io::Result<FileInfo> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|(_, info)| *info)
                .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))
        }
        fn set_mtime(&self, path: &Path, time: FileTime) -> std::io::Result<()> {
            let mut files = self.files.lock().unwrap();
            let entry =
                files.get_mut(path).ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
            entry.1.last_write_time = time;
            Ok(())
        }
        fn hardlink(&self, _src: &Path, _dst: &Path) -> std::io::Result<()> {
            Err(std::io::Error::other("unsupported"))
        }
        fn delete(&self, path: &Path) -> std::io::Result<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }
        fn ensure_dir(&self, _path: &Path) -> std::io::Result<u32> {
            Ok(0)
        }
        fn enumerate(&self, path: &Path) -> std::io::Result<Vec<core::fs::DirEntry>> {
            Ok(self.dirs.lock().unwrap().get(path).cloned().unwrap_or_default())
        }
        fn move_file(&self, src: &Path, dst: &Path) -> std::io::Result<()> {
            let mut files = self.files.lock().unwrap();
            if let Some(entry) = files.remove(src) {
                files.insert(dst.to_path_buf(), entry);
            }
            Ok(())
        }
        fn set_writable(&self, _path: &Path) -> std::io::Result<()> {
            Ok(())
        }
        fn delete_tree(&self, path: &Path) -> std::io::Result<()> {
            self.files.lock().unwrap().retain(|p, _| !p.starts_with(path));
            Ok(())
        }
    }

    #[test]
    fn a_small_tree_copies_end_to_end_and_purges_leftovers() {
        let fs = InMemoryFs::default();
        fs.dirs
            .lock()
            .unwrap()
            .insert(PathBuf::from("/src"), vec![core::fs::DirEntry { name: "a.txt".into(), is_dir: false, is_symlink: false }]);
        fs.dirs
            .lock()
            .unwrap()
            .insert(PathBuf::from("/dst"), vec![core::fs::DirEntry { name: "stale.txt".into(), is_dir: false, is_symlink: false }]);
        let info = FileInfo::new(FileTime(0), FileTime(1), 3);
        fs.files.lock().unwrap().insert(PathBuf::from("/src/a.txt"), (b"aaa".to_vec(), info));
        fs.files
            .lock()
            .unwrap()
            .insert(PathBuf::from("/dst/stale.txt"), (b"old".to_vec(), FileInfo::new(FileTime(0), FileTime(0), 3)));

        let settings = Arc::new(ClientSettings {
            source: "/src".into(),
            destination: "/dst".into(),
            purge_destination: true,
            ..ClientSettings::default()
        });
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let db = Arc::new(Mutex::new(FileDatabase::new()));
        let log_ctx = LogContext::new(Span::none());

        let stats = process(settings, Arc::clone(&fs), db, &log_ctx).unwrap();

        assert_eq!(stats.copy_count, 1);
        assert_eq!(stats.purge_count, 1);
        assert_eq!(fs.stat(Path::new("/dst/a.txt")).unwrap().size, 3);
        assert!(fs.stat(Path::new("/dst/stale.txt")).is_err());
    }

    #[test]
    fn a_destination_file_already_matching_is_skipped_not_recopied() {
        let fs = InMemoryFs::default();
        fs.dirs.lock().unwrap().insert(
            PathBuf::from("/src"),
            vec![core::fs::DirEntry { name: "a.txt".into(), is_dir: false, is_symlink: false }],
        );
        fs.dirs.lock().unwrap().insert(PathBuf::from("/dst"), vec![]);
        let same_info = FileInfo::new(FileTime(0), FileTime(42), 3);
        fs.files.lock().unwrap().insert(PathBuf::from("/src/a.txt"), (b"aaa".to_vec(), same_info));
        fs.files.lock().unwrap().insert(PathBuf::from("/dst/a.txt"), (b"aaa".to_vec(), same_info));

        let settings = Arc::new(ClientSettings {
            source: "/src".into(),
            destination: "/dst".into(),
            ..ClientSettings::default()
        });
        let fs: Arc<dyn FileSystem> = Arc::new(fs);
        let db = Arc::new(Mutex::new(FileDatabase::new()));
        let log_ctx = LogContext::new(Span::none());

        let stats = process(settings, fs, db, &log_ctx).unwrap();

        assert_eq!(stats.copy_count, 0);
        assert_eq!(stats.skip_count, 1);
    }
}
