//! Directory priming (spec §4.9): pre-populates the [`FileDatabase`] with
//! key entries from a tree the caller expects to reuse as link/delta
//! sources, without hashing any bytes up front.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use core::fs::FileSystem;
use core::key::FileKey;
use core::Hash;
use filedb::FileDatabase;

/// Mutex-guarded work list of directories still to prime, plus the count of
/// workers currently draining it, so [`Primer::wait`] can tell "empty" from
/// "empty but a worker is still mid-enumeration".
struct State {
    queue: VecDeque<PathBuf>,
    active: usize,
}

/// Background-capable directory primer. `prime_directory` enqueues work and
/// returns immediately; a call to [`Primer::drain_one`] (driven by a worker
/// thread) or [`Primer::drain_all`] (synchronous) performs the actual
/// enumeration and `FileDatabase` inserts.
pub struct Primer {
    state: Mutex<State>,
}

impl Default for Primer {
    fn default() -> Self {
        Self::new()
    }
}

impl Primer {
    /// Creates an empty primer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State { queue: VecDeque::new(), active: 0 }),
        }
    }

    /// Enqueues `path` to be primed. Does not itself enumerate or block.
    pub fn prime_directory(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().queue.push_back(path.into());
    }

    /// Pops and enumerates one queued directory: subdirectories are
    /// re-enqueued, files are inserted into `db` with [`Hash::ZERO`] (not
    /// valid, so hash-match reuse is unavailable, but key-match still
    /// works). Returns `false` if the queue was empty.
    pub fn drain_one(&self, fs: &dyn FileSystem, db: &Mutex<FileDatabase>) -> io::Result<bool> {
        let dir = {
            let mut state = self.state.lock().unwrap();
            let Some(dir) = state.queue.pop_front() else {
                return Ok(false);
            };
            state.active += 1;
            dir
        };

        let result = prime_one(fs, db, &dir, &self.state);
        self.state.lock().unwrap().active -= 1;
        result?;
        Ok(true)
    }

    /// Drains the queue synchronously on the calling thread until empty.
    pub fn drain_all(&self, fs: &dyn FileSystem, db: &Mutex<FileDatabase>) -> io::Result<()> {
        while self.drain_one(fs, db)? {}
        Ok(())
    }

    /// Blocks (by polling) until the queue is empty and no worker is
    /// mid-enumeration.
    pub fn wait(&self) {
        loop {
            let state = self.state.lock().unwrap();
            if state.queue.is_empty() && state.active == 0 {
                return;
            }
            drop(state);
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
    }

    /// Whether the queue is currently empty (does not account for active
    /// workers; prefer [`Primer::wait`] to know priming has fully settled).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().queue.is_empty()
    }
}

fn prime_one(
    fs: &dyn FileSystem,
    db: &Mutex<FileDatabase>,
    dir: &Path,
    state: &Mutex<State>,
) -> io::Result<()> {
    for entry in fs.enumerate(dir)? {
        if entry.is_symlink {
            continue;
        }
        let child = dir.join(&entry.name);
        if entry.is_dir {
            state.lock().unwrap().queue.push_back(child);
        } else {
            let info = fs.stat(&child)?;
            let key = FileKey::new(entry.name, info.last_write_time, info.size);
            db.lock().unwrap().insert(key, child.to_string_lossy(), Hash::ZERO);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::key::{FileInfo, FileTime};
    use std::collections::HashMap;
    use std::io::{Cursor, Read, Write};
    use std::sync::Mutex as StdMutex;

    struct MemHandle(Cursor<Vec<u8>>);
    impl Read for MemHandle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.0.read(buf)
        }
    }
    impl core::fs::ReadHandle for MemHandle {
        fn seek_to(&mut self, offset: u64) -> io::Result<()> {
            use std::io::{Seek, SeekFrom};
            self.0.seek(SeekFrom::Start(offset))?;
            Ok(())
        }
    }
    struct NullWrite;
    impl Write for NullWrite {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    impl core::fs::WriteHandle for NullWrite {}

    #[derive(Default)]
    struct FakeFs {
        dirs: HashMap<PathBuf, Vec<core::fs::DirEntry>>,
        files: StdMutex<HashMap<PathBuf, FileInfo>>,
    }

    impl FileSystem for FakeFs {
        fn open_read(&self, _path: &Path) -> io::Result<Box<dyn core::fs::ReadHandle>> {
            Ok(Box::new(MemHandle(Cursor::new(Vec::new()))))
        }
        fn open_write(&self, _path: &Path) -> io::Result<Box<dyn core::fs::WriteHandle>> {
            Ok(Box::new(NullWrite))
        }
        fn stat(&self, path: &Path) -> io::Result<FileInfo> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
        fn set_mtime(&self, _path: &Path, _time: FileTime) -> io::Result<()> {
            Ok(())
        }
        fn hardlink(&self, _src: &Path, _dst: &Path) -> io::Result<()> {
            Err(io::Error::other("unsupported"))
        }
        fn delete(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn ensure_dir(&self, _path: &Path) -> io::Result<u32> {
            Ok(0)
        }
        fn enumerate(&self, path: &Path) -> io::Result<Vec<core::fs::DirEntry>> {
            Ok(self.dirs.get(path).cloned().unwrap_or_default())
        }
        fn move_file(&self, _src: &Path, _dst: &Path) -> io::Result<()> {
            Ok(())
        }
        fn set_writable(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn delete_tree(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn priming_inserts_zero_hash_entries_and_recurses() {
        let mut fs = FakeFs::default();
        fs.dirs.insert(
            PathBuf::from("/ref"),
            vec![
                core::fs::DirEntry { name: "a.txt".into(), is_dir: false, is_symlink: false },
                core::fs::DirEntry { name: "sub".into(), is_dir: true, is_symlink: false },
            ],
        );
        fs.dirs.insert(
            PathBuf::from("/ref/sub"),
            vec![core::fs::DirEntry { name: "b.txt".into(), is_dir: false, is_symlink: false }],
        );
        let info = FileInfo::new(FileTime(0), FileTime(1), 10);
        fs.files.lock().unwrap().insert(PathBuf::from("/ref/a.txt"), info);
        fs.files.lock().unwrap().insert(PathBuf::from("/ref/sub/b.txt"), info);

        let primer = Primer::new();
        primer.prime_directory("/ref");
        let db = Mutex::new(FileDatabase::new());
        primer.drain_all(&fs, &db).unwrap();
        primer.wait();

        let db = db.into_inner().unwrap();
        assert_eq!(db.len(), 2);
        let key = FileKey::new("a.txt", FileTime(1), 10);
        let record = db.get_by_key(&key).expect("a.txt primed");
        assert!(!record.hash.is_valid());
        assert_eq!(db.get_by_hash(Hash::ZERO), None);
    }

    #[test]
    fn draining_an_empty_queue_returns_false() {
        let fs = FakeFs::default();
        let db = Mutex::new(FileDatabase::new());
        let primer = Primer::new();
        assert!(!primer.drain_one(&fs, &db).unwrap());
    }
}
