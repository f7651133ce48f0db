//! Directory traversal (spec §4.5 "processDir"): walks the source tree,
//! applies the include/exclude filters, and enqueues one [`CopyEntry`] per
//! file plus recursive [`DirEntry`] work for subdirectories up to
//! `copy_subdir_depth`.

use std::io;
use std::path::{Path, PathBuf};

use core::fs::{DirEntry as FsDirEntry, FileSystem};

use crate::entry::{CopyDestination, CopyEntry, CopySource, DirEntry, WorkItem};
use crate::filter;
use crate::handled::HandledFiles;
use crate::queue::WorkQueue;
use crate::settings::ClientSettings;

/// Expands one directory popped off `queue` into its children: files are
/// pushed back as [`WorkItem::File`], subdirectories as further
/// [`WorkItem::Dir`], both counted against the same pending total so the
/// queue only closes once traversal and every file it has produced have
/// finished (spec §4.5, §5).
pub fn expand_dir(
    fs: &dyn FileSystem,
    settings: &ClientSettings,
    queue: &WorkQueue<WorkItem>,
    handled: &HandledFiles,
    root: &CopyDestination,
    dir: &DirEntry,
) -> io::Result<()> {
    let CopySource::Local(src_dir) = &dir.source else {
        // Server-side source traversal is out of scope for this pass: a
        // server-rooted source is expected to be mirrored through a prior
        // local staging step, not walked directly by this function.
        return Ok(());
    };

    let entries = fs.enumerate(src_dir)?;
    for entry in entries {
        if entry.is_symlink && !settings.replace_symlinks_at_destination {
            continue;
        }
        if entry.is_dir {
            if dir.depth >= settings.copy_subdir_depth {
                continue;
            }
            if !filter::passes(&settings.include_dirs, &settings.exclude_dirs, &entry.name) {
                continue;
            }
            let (child_src, child_dest) = child_paths(dir, &entry);
            queue.push_back(WorkItem::Dir(DirEntry {
                source: CopySource::Local(child_src),
                destination: child_dest,
                depth: dir.depth + 1,
            }));
        } else {
            if !filter::passes(&settings.include_files, &settings.exclude_files, &entry.name) {
                continue;
            }
            let src_path = src_dir.join(&entry.name);
            let info = fs.stat(&src_path)?;
            let destination = destination_for_file(dir, root, &entry.name, settings);
            handled.mark(entry.name.clone());
            queue.push_back(WorkItem::File(CopyEntry {
                name: entry.name,
                source: CopySource::Local(src_path),
                destination,
                info,
                depth: dir.depth,
                purge_exempt: false,
            }));
        }
    }

    Ok(())
}

fn child_paths(dir: &DirEntry, entry: &FsDirEntry) -> (PathBuf, CopyDestination) {
    let CopySource::Local(src_dir) = &dir.source else {
        unreachable!("guarded by caller")
    };
    let child_src = src_dir.join(&entry.name);
    let child_dest = match &dir.destination {
        CopyDestination::Local(base) => CopyDestination::Local(base.join(&entry.name)),
        CopyDestination::Server { path } => CopyDestination::Server {
            path: join_server_path(path, &entry.name),
        },
    };
    (child_src, child_dest)
}

fn destination_for_file(
    dir: &DirEntry,
    root: &CopyDestination,
    name: &str,
    settings: &ClientSettings,
) -> CopyDestination {
    let base = if settings.flatten_destination { root } else { &dir.destination };
    match base {
        CopyDestination::Local(base) => CopyDestination::Local(base.join(name)),
        CopyDestination::Server { path } => CopyDestination::Server {
            path: join_server_path(path, name),
        },
    }
}

fn join_server_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::key::FileInfo;
    use core::FileTime;
    use std::collections::HashMap;
    use std::io::{Cursor, Read, Write};
    use std::sync::Mutex;

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
        dirs: HashMap<PathBuf, Vec<FsDirEntry>>,
        files: Mutex<HashMap<PathBuf, (Vec<u8>, FileInfo)>>,
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
                .map(|(_, info)| *info)
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
        fn enumerate(&self, path: &Path) -> io::Result<Vec<FsDirEntry>> {
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
    fn files_are_enqueued_and_subdirectories_recurse() {
        let mut fs = FakeFs::default();
        fs.dirs.insert(
            PathBuf::from("/src"),
            vec![
                FsDirEntry { name: "a.txt".into(), is_dir: false, is_symlink: false },
                FsDirEntry { name: "sub".into(), is_dir: true, is_symlink: false },
            ],
        );
        let info = FileInfo::new(FileTime(0), FileTime(1), 5);
        fs.files.lock().unwrap().insert(PathBuf::from("/src/a.txt"), (Vec::new(), info));

        let queue = WorkQueue::new();
        let handled = HandledFiles::new();
        let dir = DirEntry {
            source: CopySource::Local("/src".into()),
            destination: CopyDestination::Local("/dst".into()),
            depth: 0,
        };

        let settings = ClientSettings::default();
        expand_dir(&fs, &settings, &queue, &handled, &dir.destination.clone(), &dir).unwrap();

        assert_eq!(queue.len(), 2);
        let mut saw_file = false;
        let mut saw_dir = false;
        for _ in 0..2 {
            let item = queue.pop().expect("item queued above");
            match item {
                WorkItem::File(entry) => {
                    assert_eq!(entry.name, "a.txt");
                    assert!(handled.contains("a.txt"));
                    saw_file = true;
                }
                WorkItem::Dir(sub) => {
                    assert_eq!(sub.depth, 1);
                    assert_eq!(sub.source, CopySource::Local("/src/sub".into()));
                    saw_dir = true;
                }
            }
        }
        assert!(saw_file && saw_dir);
    }

    #[test]
    fn depth_limit_stops_recursion() {
        let mut fs = FakeFs::default();
        fs.dirs.insert(
            PathBuf::from("/src"),
            vec![FsDirEntry { name: "sub".into(), is_dir: true, is_symlink: false }],
        );
        let queue = WorkQueue::new();
        let handled = HandledFiles::new();
        let dir = DirEntry {
            source: CopySource::Local("/src".into()),
            destination: CopyDestination::Local("/dst".into()),
            depth: 0,
        };

        let settings = ClientSettings { copy_subdir_depth: 0, ..ClientSettings::default() };
        expand_dir(&fs, &settings, &queue, &handled, &dir.destination.clone(), &dir).unwrap();
        assert_eq!(queue.len(), 0);
    }
}
