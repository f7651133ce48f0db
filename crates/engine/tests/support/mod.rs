//! A real, `std::fs`-backed [`FileSystem`] for integration tests, mirroring
//! the binary's own `LocalFileSystem`. `creation_time` is pinned equal to
//! `last_write_time` rather than read from OS birth-time metadata (not
//! reliably settable or even available across the filesystems CI runs on),
//! so scenarios that pre-populate both a source and a destination file can
//! make them compare equal deterministically.

use std::fs::{self, File, FileTimes};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use core::fs::{DirEntry, FileSystem, ReadHandle, WriteHandle};
use core::key::{FileInfo, FileTime};

/// A handle over a real, open [`File`] opened for reading.
pub struct FileReadHandle(File);

impl Read for FileReadHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl ReadHandle for FileReadHandle {
    fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.0.seek(SeekFrom::Start(offset))?;
        Ok(())
    }
}

/// A handle over a real, open [`File`] opened for writing.
pub struct FileWriteHandle(File);

impl Write for FileWriteHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl WriteHandle for FileWriteHandle {}

fn to_file_time(time: SystemTime) -> FileTime {
    let nanos = time.duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0);
    FileTime::from_raw(nanos)
}

fn from_file_time(time: FileTime) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(time.as_raw())
}

/// `FileSystem` backed directly by the host OS under a scenario's temp
/// directory.
#[derive(Default)]
pub struct DiskFs;

impl FileSystem for DiskFs {
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>> {
        Ok(Box::new(FileReadHandle(File::open(path)?)))
    }

    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::options().write(true).create(true).truncate(true).open(path)?;
        Ok(Box::new(FileWriteHandle(file)))
    }

    fn stat(&self, path: &Path) -> io::Result<FileInfo> {
        let metadata = fs::metadata(path)?;
        let modified = to_file_time(metadata.modified().unwrap_or(UNIX_EPOCH));
        Ok(FileInfo::new(modified, modified, metadata.len()))
    }

    fn set_mtime(&self, path: &Path, time: FileTime) -> io::Result<()> {
        let file = File::options().write(true).open(path)?;
        file.set_times(FileTimes::new().set_modified(from_file_time(time)))
    }

    fn hardlink(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::hard_link(src, dst)
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn ensure_dir(&self, path: &Path) -> io::Result<u32> {
        let missing = path.ancestors().take_while(|p| !p.as_os_str().is_empty() && !p.exists()).count();
        fs::create_dir_all(path)?;
        Ok(u32::try_from(missing).unwrap_or(u32::MAX).min(200))
    }

    fn enumerate(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            entries.push(DirEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: file_type.is_dir(),
                is_symlink: file_type.is_symlink(),
            });
        }
        Ok(entries)
    }

    fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(src, dst)
    }

    fn set_writable(&self, path: &Path) -> io::Result<()> {
        let mut permissions = fs::metadata(path)?.permissions();
        if permissions.readonly() {
            permissions.set_readonly(false);
            fs::set_permissions(path, permissions)?;
        }
        Ok(())
    }

    fn delete_tree(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir_all(path)
    }
}

/// Writes `content` to `path`, creating parent directories as needed, then
/// pins its mtime so callers get a known [`FileInfo`] back from `stat`.
pub fn write_file(path: &Path, content: &[u8], mtime_nanos: u64) -> FileInfo {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
    let file = File::options().write(true).open(path).unwrap();
    file.set_times(FileTimes::new().set_modified(from_file_time(FileTime::from_raw(mtime_nanos)))).unwrap();
    let time = FileTime::from_raw(mtime_nanos);
    FileInfo::new(time, time, content.len() as u64)
}
