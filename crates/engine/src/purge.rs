//! Post-copy purge (spec §4.7): deletes destination entries that were not
//! touched by this run's traversal, up to `copy_subdir_depth`, never
//! descending into symlinks.

use std::io;
use std::path::Path;

use core::fs::FileSystem;

use crate::handled::HandledFiles;
use crate::settings::ClientSettings;
use crate::stats::Stats;

/// Walks `dest_dir` and deletes every child not recorded in `handled`,
/// recursing into subdirectories up to `settings.copy_subdir_depth`.
///
/// A subdirectory whose name *is* handled is still recursed into (its own
/// contents get their own purge pass one level down); a subdirectory whose
/// name is *not* handled is removed wholesale via
/// [`FileSystem::delete_tree`] rather than recursed into file-by-file.
/// `purge_exempt` entries (spec §6, a file-list line marked `/PURGE`) are
/// skipped by never being passed to this function for their containing
/// directory; callers exempt a whole directory by simply not calling
/// `purge_dir` on it.
pub fn purge_dir(
    fs: &dyn FileSystem,
    settings: &ClientSettings,
    handled: &HandledFiles,
    dest_dir: &Path,
    depth: u32,
    stats: &mut Stats,
) -> io::Result<()> {
    if !settings.purge_destination {
        return Ok(());
    }

    let entries = match fs.enumerate(dest_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    for entry in entries {
        if entry.is_symlink {
            continue;
        }
        let child_path = dest_dir.join(&entry.name);
        if handled.contains(&entry.name) {
            if entry.is_dir && depth < settings.copy_subdir_depth {
                purge_dir(fs, settings, handled, &child_path, depth + 1, stats)?;
            }
            continue;
        }
        if entry.is_dir {
            fs.delete_tree(&child_path)?;
        } else {
            fs.delete(&child_path)?;
        }
        stats.purge_count += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::key::{FileInfo, FileTime};
    use std::collections::HashMap;
    use std::io::{Cursor, Read, Write};
    use std::path::{Path as StdPath, PathBuf};
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
        dirs: StdMutex<HashMap<PathBuf, Vec<core::fs::DirEntry>>>,
        deleted_files: StdMutex<Vec<PathBuf>>,
        deleted_trees: StdMutex<Vec<PathBuf>>,
    }

    impl FileSystem for FakeFs {
        fn open_read(&self, _path: &StdPath) -> io::Result<Box<dyn core::fs::ReadHandle>> {
            Ok(Box::new(MemHandle(Cursor::new(Vec::new()))))
        }
        fn open_write(&self, _path: &StdPath) -> io::Result<Box<dyn core::fs::WriteHandle>> {
            Ok(Box::new(NullWrite))
        }
        fn stat(&self, _path: &StdPath) -> io::Result<FileInfo> {
            Ok(FileInfo::new(FileTime(0), FileTime(0), 0))
        }
        fn set_mtime(&self, _path: &StdPath, _time: FileTime) -> io::Result<()> {
            Ok(())
        }
        fn hardlink(&self, _src: &StdPath, _dst: &StdPath) -> io::Result<()> {
            Err(io::Error::other("unsupported"))
        }
        fn delete(&self, path: &StdPath) -> io::Result<()> {
            self.deleted_files.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
        fn ensure_dir(&self, _path: &StdPath) -> io::Result<u32> {
            Ok(0)
        }
        fn enumerate(&self, path: &StdPath) -> io::Result<Vec<core::fs::DirEntry>> {
            Ok(self.dirs.lock().unwrap().get(path).cloned().unwrap_or_default())
        }
        fn move_file(&self, _src: &StdPath, _dst: &StdPath) -> io::Result<()> {
            Ok(())
        }
        fn set_writable(&self, _path: &StdPath) -> io::Result<()> {
            Ok(())
        }
        fn delete_tree(&self, path: &StdPath) -> io::Result<()> {
            self.deleted_trees.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn unhandled_children_are_deleted_handled_ones_survive() {
        let fs = FakeFs::default();
        fs.dirs.lock().unwrap().insert(
            PathBuf::from("/dst"),
            vec![
                core::fs::DirEntry { name: "kept.txt".into(), is_dir: false, is_symlink: false },
                core::fs::DirEntry { name: "stale.txt".into(), is_dir: false, is_symlink: false },
                core::fs::DirEntry { name: "stale_dir".into(), is_dir: true, is_symlink: false },
            ],
        );
        let handled = HandledFiles::new();
        handled.mark("kept.txt");
        let settings = ClientSettings { purge_destination: true, ..ClientSettings::default() };
        let mut stats = Stats::default();

        purge_dir(&fs, &settings, &handled, Path::new("/dst"), 0, &mut stats).unwrap();

        assert_eq!(fs.deleted_files.lock().unwrap().as_slice(), &[PathBuf::from("/dst/stale.txt")]);
        assert_eq!(fs.deleted_trees.lock().unwrap().as_slice(), &[PathBuf::from("/dst/stale_dir")]);
        assert_eq!(stats.purge_count, 2);
    }

    #[test]
    fn disabled_purge_is_a_no_op() {
        let fs = FakeFs::default();
        fs.dirs.lock().unwrap().insert(
            PathBuf::from("/dst"),
            vec![core::fs::DirEntry { name: "stale.txt".into(), is_dir: false, is_symlink: false }],
        );
        let handled = HandledFiles::new();
        let settings = ClientSettings::default();
        let mut stats = Stats::default();

        purge_dir(&fs, &settings, &handled, Path::new("/dst"), 0, &mut stats).unwrap();
        assert!(fs.deleted_files.lock().unwrap().is_empty());
        assert_eq!(stats.purge_count, 0);
    }

    #[test]
    fn symlinks_are_never_touched() {
        let fs = FakeFs::default();
        fs.dirs.lock().unwrap().insert(
            PathBuf::from("/dst"),
            vec![core::fs::DirEntry { name: "link".into(), is_dir: false, is_symlink: true }],
        );
        let handled = HandledFiles::new();
        let settings = ClientSettings { purge_destination: true, ..ClientSettings::default() };
        let mut stats = Stats::default();

        purge_dir(&fs, &settings, &handled, Path::new("/dst"), 0, &mut stats).unwrap();
        assert!(fs.deleted_files.lock().unwrap().is_empty());
        assert!(fs.deleted_trees.lock().unwrap().is_empty());
    }
}
