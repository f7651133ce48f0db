//! The `WriteFile`/`ReadFile`/`CreateDir`/`DeleteFiles` decision trees
//! (spec §4.2, §4.6).

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use core::fs::FileSystem;
use core::{FileKey, Hash};
use filedb::FileDatabase;
use protocol::{
    CreateDirResponse, DeleteFilesResponse, ReadFileCommand, ReadFileResponse, WriteFileCommand,
    WriteFileResponse,
};

use crate::admission::PriorityQueues;
use crate::session::ActiveSession;
use crate::settings::ServerSettings;

/// Borrowed state a single command decision needs. Cheap to construct per
/// command; owns nothing.
pub struct ServerContext<'a> {
    /// Filesystem capability the decision may stat/link/copy against.
    pub fs: &'a dyn FileSystem,
    /// The content-addressed database backing link/delta reuse.
    pub db: &'a Mutex<FileDatabase>,
    /// Server-wide tunables.
    pub settings: &'a ServerSettings,
}

/// Outcome of evaluating a `WriteFile` request.
#[derive(Debug)]
pub enum WriteDecision {
    /// No file body follows; the response itself is final.
    Terminal(WriteFileResponse),
    /// The server needs the client's content hash before deciding; the
    /// caller must send [`WriteFileResponse::Hash`] and then call
    /// [`decide_write_file_after_hash`] with the reply.
    NeedsHash,
    /// A file body (plain, SMB-style, or delta) follows this response.
    Transfer(WriteFileResponse),
}

fn parent_rel(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn base_name(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The database key approximates "same file identity" by name alone (spec
/// §4.3), not the full destination-relative path: the same file copied to
/// two different destination directories must key identically so the
/// second copy can be satisfied by a link to the first.
pub(crate) fn file_key_for(rel_path: &str, info: core::FileInfo) -> FileKey {
    FileKey::new(base_name(rel_path), info.last_write_time, info.size)
}

fn try_link_or_odx(
    ctx: &ServerContext<'_>,
    src: &Path,
    dest: &Path,
) -> io::Result<Option<WriteFileResponse>> {
    if ctx.fs.hardlink(src, dest).is_ok() {
        return Ok(Some(WriteFileResponse::Link));
    }
    if ctx.settings.odx_enabled {
        let mut reader = core::fs::ReadAdapter::new(ctx.fs.open_read(src)?);
        let mut writer = core::fs::WriteAdapter::new(ctx.fs.open_write(dest)?);
        io::copy(&mut reader, &mut writer)?;
        return Ok(Some(WriteFileResponse::Odx));
    }
    Ok(None)
}

/// Evaluates a `WriteFile` request per spec §4.2 steps 1-6 (the hash
/// round-trip, step 5, is split out as [`decide_write_file_after_hash`]).
pub fn decide_write_file(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    cmd: &WriteFileCommand,
) -> io::Result<WriteDecision> {
    let dest_path = session.net_directory.join(&cmd.path);
    let key = file_key_for(&cmd.path, cmd.file_info);

    if cmd.file_info.size >= ctx.settings.use_links_threshold {
        let candidate = ctx.db.lock().unwrap().get_by_key(&key);
        if let Some(record) = candidate {
            if let Ok(existing) = ctx.fs.stat(&dest_path) {
                if existing == cmd.file_info {
                    return Ok(WriteDecision::Terminal(WriteFileResponse::Skip));
                }
            }
            if let Some(resp) = try_link_or_odx(ctx, Path::new(&record.full_path), &dest_path)? {
                return Ok(WriteDecision::Terminal(resp));
            }
        }
    }

    if !session.created_dir(parent_rel(&cmd.path)) {
        if let Ok(existing) = ctx.fs.stat(&dest_path) {
            if existing == cmd.file_info {
                return Ok(WriteDecision::Terminal(WriteFileResponse::Skip));
            }
        }
    }

    let mut response = WriteFileResponse::Copy;
    if cmd.file_info.size > ctx.settings.delta_compression_threshold {
        let candidate = ctx.db.lock().unwrap().find_delta_candidate(&key);
        if candidate.is_some() {
            response = WriteFileResponse::CopyDelta;
        }
    }

    if ctx.settings.hash_mode
        && matches!(response, WriteFileResponse::Copy | WriteFileResponse::CopyUsingSmb)
    {
        return Ok(WriteDecision::NeedsHash);
    }

    Ok(WriteDecision::Transfer(response))
}

/// Continues a `WriteFile` decision after the client answered a
/// [`WriteDecision::NeedsHash`] with its content hash (spec §4.2 step 5,
/// §4.6 "Hash path").
pub fn decide_write_file_after_hash(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    cmd: &WriteFileCommand,
    hash: Hash,
) -> io::Result<WriteDecision> {
    let dest_path = session.net_directory.join(&cmd.path);
    if hash.is_valid() {
        let candidate = ctx.db.lock().unwrap().get_by_hash(hash);
        if let Some(record) = candidate {
            if let Some(resp) = try_link_or_odx(ctx, Path::new(&record.full_path), &dest_path)? {
                return Ok(WriteDecision::Terminal(resp));
            }
        }
    }
    Ok(WriteDecision::Transfer(WriteFileResponse::Copy))
}

/// Records the outcome of a completed `WriteFile` transfer: sets the
/// destination's mtime and inserts `(file_key, hash, path)` into the
/// database (spec §4.2: "adds the pair to the database").
pub fn finalize_write(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    cmd: &WriteFileCommand,
    hash: Hash,
) -> io::Result<()> {
    let dest_path = session.net_directory.join(&cmd.path);
    ctx.fs.set_mtime(&dest_path, cmd.file_info.last_write_time)?;
    let key = file_key_for(&cmd.path, cmd.file_info);
    ctx.db
        .lock()
        .unwrap()
        .insert(key, dest_path.display().to_string(), hash);
    Ok(())
}

/// Outcome of evaluating a `ReadFile` request.
#[derive(Debug)]
pub enum ReadDecision {
    /// No file body follows.
    Terminal(ReadFileResponse),
    /// The server needs the client's hash to confirm equality.
    NeedsHash,
    /// A file body follows this response.
    Transfer(ReadFileResponse),
}

/// Evaluates a `ReadFile` request, applying admission control first (spec
/// §4.4) and then the content comparison (spec §4.2, §4.6).
pub fn decide_read_file(
    ctx: &ServerContext<'_>,
    admission: &PriorityQueues,
    connection_index: usize,
    connection_id: u64,
    cmd: &ReadFileCommand,
    source_root: &Path,
) -> io::Result<ReadDecision> {
    if !admission.admit(connection_index, connection_id) {
        return Ok(ReadDecision::Terminal(ReadFileResponse::ServerBusy));
    }

    let source_path = source_root.join(&cmd.path);
    let existing = ctx.fs.stat(&source_path)?;

    if existing == cmd.file_info {
        return Ok(ReadDecision::Terminal(ReadFileResponse::Skip));
    }

    if ctx.settings.hash_mode
        && existing.size == cmd.file_info.size
        && existing.last_write_time != cmd.file_info.last_write_time
    {
        return Ok(ReadDecision::NeedsHash);
    }

    // Eligibility mirrors `WriteFile`'s delta path but looks at the
    // client's claim instead of the server's own database: the server has
    // no access to the client's stale destination file, only its report
    // that one exists (a nonzero size, per the all-zero "absent" sentinel
    // `FileInfo::default()` uses elsewhere). That stale file is what the
    // client will patch against once it receives this server's delta ops.
    if existing.size > ctx.settings.delta_compression_threshold && cmd.file_info.size > 0 {
        return Ok(ReadDecision::Transfer(ReadFileResponse::CopyDelta));
    }

    Ok(ReadDecision::Transfer(ReadFileResponse::Copy))
}

/// Ensures `dir` exists under `root`, recording it in `session` so later
/// `WriteFile` decisions on the same session skip the destination-equality
/// stat (spec §4.2 "CreateDir").
pub fn handle_create_dir(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    dir: &str,
) -> CreateDirResponse {
    let path = session.net_directory.join(dir);
    match ctx.fs.ensure_dir(&path) {
        Ok(created) => {
            session.record_created_dir(dir);
            CreateDirResponse::SuccessExisted { created }
        }
        Err(_) => CreateDirResponse::Error,
    }
}

/// Recursively deletes everything under `path` within the session's root
/// (spec §4.2 "DeleteFiles").
pub fn handle_delete_files(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    path: &str,
) -> DeleteFilesResponse {
    let target = session.net_directory.join(path);
    match ctx.fs.delete_tree(&target) {
        Ok(()) => DeleteFilesResponse::Success,
        Err(_) => DeleteFilesResponse::Error,
    }
}

/// Server-side directory enumeration (spec §4.2 "FindFiles").
pub fn handle_find_files(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    path: &str,
) -> io::Result<Vec<core::fs::DirEntry>> {
    ctx.fs.enumerate(&session.net_directory.join(path))
}

/// Server-side single-path stat (spec §4.2 "GetFileInfo").
pub fn handle_get_file_info(
    ctx: &ServerContext<'_>,
    session: &ActiveSession,
    path: &str,
) -> io::Result<core::FileInfo> {
    ctx.fs.stat(&session.net_directory.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::{FileInfo, FileTime};
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

    struct MemWriteHandle<'a> {
        fs: &'a InMemoryFs,
        path: PathBuf,
        buf: Vec<u8>,
    }
    impl Write for MemWriteHandle<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.buf.extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
    impl core::fs::WriteHandle for MemWriteHandle<'_> {}
    impl Drop for MemWriteHandle<'_> {
        fn drop(&mut self) {
            self.fs.files.lock().unwrap().insert(
                self.path.clone(),
                (std::mem::take(&mut self.buf), FileInfo::default()),
            );
        }
    }

    #[derive(Default)]
    struct InMemoryFs {
        files: StdMutex<HashMap<PathBuf, (Vec<u8>, FileInfo)>>,
        links: StdMutex<HashMap<PathBuf, PathBuf>>,
        fail_links: StdMutex<bool>,
        dirs: StdMutex<std::collections::HashSet<PathBuf>>,
    }

    impl InMemoryFs {
        fn put(&self, path: &Path, bytes: &[u8], info: FileInfo) {
            self.files
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), (bytes.to_vec(), info));
        }
    }

    impl FileSystem for InMemoryFs {
        fn open_read(&self, path: &Path) -> io::Result<Box<dyn core::fs::ReadHandle>> {
            let files = self.files.lock().unwrap();
            let (bytes, _) = files
                .get(path)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            Ok(Box::new(MemHandle(Cursor::new(bytes.clone()))))
        }
        fn open_write(&self, path: &Path) -> io::Result<Box<dyn core::fs::WriteHandle>> {
            Ok(Box::new(MemWriteHandle {
                fs: self,
                path: path.to_path_buf(),
                buf: Vec::new(),
            }))
        }
        fn stat(&self, path: &Path) -> io::Result<FileInfo> {
            self.files
                .lock()
                .unwrap()
                .get(path)
                .map(|(_, info)| *info)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
        fn set_mtime(&self, path: &Path, time: FileTime) -> io::Result<()> {
            let mut files = self.files.lock().unwrap();
            let entry = files
                .get_mut(path)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
            entry.1.last_write_time = time;
            Ok(())
        }
        fn hardlink(&self, src: &Path, dst: &Path) -> io::Result<()> {
            if *self.fail_links.lock().unwrap() {
                return Err(io::Error::other("link refused"));
            }
            if !self.files.lock().unwrap().contains_key(src) {
                return Err(io::Error::from(io::ErrorKind::NotFound));
            }
            self.links
                .lock()
                .unwrap()
                .insert(dst.to_path_buf(), src.to_path_buf());
            Ok(())
        }
        fn delete(&self, path: &Path) -> io::Result<()> {
            self.files.lock().unwrap().remove(path);
            Ok(())
        }
        fn ensure_dir(&self, path: &Path) -> io::Result<u32> {
            let mut dirs = self.dirs.lock().unwrap();
            if dirs.insert(path.to_path_buf()) {
                Ok(1)
            } else {
                Ok(0)
            }
        }
        fn enumerate(&self, _path: &Path) -> io::Result<Vec<core::fs::DirEntry>> {
            Ok(Vec::new())
        }
        fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()> {
            let mut files = self.files.lock().unwrap();
            if let Some(entry) = files.remove(src) {
                files.insert(dst.to_path_buf(), entry);
            }
            Ok(())
        }
        fn set_writable(&self, _path: &Path) -> io::Result<()> {
            Ok(())
        }
        fn delete_tree(&self, path: &Path) -> io::Result<()> {
            self.files
                .lock()
                .unwrap()
                .retain(|p, _| !p.starts_with(path));
            Ok(())
        }
    }

    fn settings() -> ServerSettings {
        ServerSettings {
            use_links_threshold: 0,
            ..ServerSettings::default()
        }
    }

    fn info(mtime: u64, size: u64) -> FileInfo {
        FileInfo::new(FileTime(mtime), FileTime(mtime), size)
    }

    #[test]
    fn write_file_skips_when_destination_already_matches() {
        let fs = InMemoryFs::default();
        let db = Mutex::new(FileDatabase::new());
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        fs.put(Path::new("/dst/a.txt"), b"hello", info(1, 5));
        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level: 0,
            file_info: info(1, 5),
            path: "a.txt".into(),
        };
        match decide_write_file(&ctx, &session, &cmd).unwrap() {
            WriteDecision::Terminal(WriteFileResponse::Skip) => {}
            other => panic!("expected Skip, got {other:?}"),
        }
    }

    #[test]
    fn write_file_links_when_a_matching_key_is_already_known() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/store/orig.txt"), b"content", info(1, 7));
        let db = Mutex::new(FileDatabase::new());
        db.lock().unwrap().insert(
            FileKey::new("a.txt", FileTime(1), 7),
            "/store/orig.txt",
            Hash::from_bytes([9u8; 16]),
        );
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level: 0,
            file_info: info(1, 7),
            path: "a.txt".into(),
        };
        match decide_write_file(&ctx, &session, &cmd).unwrap() {
            WriteDecision::Terminal(WriteFileResponse::Link) => {}
            other => panic!("expected Link, got {other:?}"),
        }
    }

    #[test]
    fn write_file_falls_back_to_odx_when_link_fails() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/store/orig.txt"), b"content", info(1, 7));
        *fs.fail_links.lock().unwrap() = true;
        let db = Mutex::new(FileDatabase::new());
        db.lock().unwrap().insert(
            FileKey::new("a.txt", FileTime(1), 7),
            "/store/orig.txt",
            Hash::from_bytes([9u8; 16]),
        );
        let settings = ServerSettings { odx_enabled: true, ..settings() };
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level: 0,
            file_info: info(1, 7),
            path: "a.txt".into(),
        };
        match decide_write_file(&ctx, &session, &cmd).unwrap() {
            WriteDecision::Terminal(WriteFileResponse::Odx) => {}
            other => panic!("expected Odx, got {other:?}"),
        }
    }

    #[test]
    fn write_file_requests_hash_before_falling_back_to_copy() {
        let fs = InMemoryFs::default();
        let db = Mutex::new(FileDatabase::new());
        let settings = ServerSettings { hash_mode: true, ..settings() };
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level: 0,
            file_info: info(1, 100),
            path: "new.txt".into(),
        };
        match decide_write_file(&ctx, &session, &cmd).unwrap() {
            WriteDecision::NeedsHash => {}
            other => panic!("expected NeedsHash, got {other:?}"),
        }
    }

    #[test]
    fn write_file_after_hash_links_on_by_hash_match() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/store/orig.txt"), b"content", info(1, 100));
        let db = Mutex::new(FileDatabase::new());
        let h = Hash::from_bytes([5u8; 16]);
        db.lock()
            .unwrap()
            .insert(FileKey::new("orig.txt", FileTime(1), 100), "/store/orig.txt", h);
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level: 0,
            file_info: info(1, 100),
            path: "new.txt".into(),
        };
        match decide_write_file_after_hash(&ctx, &session, &cmd, h).unwrap() {
            WriteDecision::Terminal(WriteFileResponse::Link) => {}
            other => panic!("expected Link, got {other:?}"),
        }
    }

    #[test]
    fn write_file_picks_delta_when_a_near_match_exists() {
        let fs = InMemoryFs::default();
        let db = Mutex::new(FileDatabase::new());
        db.lock().unwrap().insert(
            FileKey::new("big.bin", FileTime(1), 1_000),
            "/dst/big.bin",
            Hash::from_bytes([3u8; 16]),
        );
        let settings = ServerSettings { delta_compression_threshold: 10, ..settings() };
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let cmd = WriteFileCommand {
            write_type: 0,
            compression_level: 0,
            file_info: info(2, 1_100),
            path: "big.bin".into(),
        };
        match decide_write_file(&ctx, &session, &cmd).unwrap() {
            WriteDecision::Transfer(WriteFileResponse::CopyDelta) => {}
            other => panic!("expected CopyDelta, got {other:?}"),
        }
    }

    #[test]
    fn read_file_is_rejected_when_admission_denies_it() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/src/a.txt"), b"hi", info(1, 2));
        let db = Mutex::new(FileDatabase::new());
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let admission = PriorityQueues::new(1, 0);
        admission.join(0, 1);

        let cmd = ReadFileCommand {
            compression_level: 0,
            file_info: FileInfo::default(),
            path: "a.txt".into(),
        };
        match decide_read_file(&ctx, &admission, 0, 1, &cmd, Path::new("/src")).unwrap() {
            ReadDecision::Terminal(ReadFileResponse::ServerBusy) => {}
            other => panic!("expected ServerBusy, got {other:?}"),
        }
    }

    #[test]
    fn read_file_skips_when_client_already_matches() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/src/a.txt"), b"hi", info(1, 2));
        let db = Mutex::new(FileDatabase::new());
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let admission = PriorityQueues::new(1, 4);
        admission.join(0, 1);

        let cmd = ReadFileCommand {
            compression_level: 0,
            file_info: info(1, 2),
            path: "a.txt".into(),
        };
        match decide_read_file(&ctx, &admission, 0, 1, &cmd, Path::new("/src")).unwrap() {
            ReadDecision::Terminal(ReadFileResponse::Skip) => {}
            other => panic!("expected Skip, got {other:?}"),
        }
    }

    #[test]
    fn read_file_picks_delta_when_the_client_reports_an_existing_file() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/src/big.bin"), &vec![7u8; 1_100], info(2, 1_100));
        let db = Mutex::new(FileDatabase::new());
        let settings = ServerSettings { delta_compression_threshold: 10, ..settings() };
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let admission = PriorityQueues::new(1, 4);
        admission.join(0, 1);

        let cmd = ReadFileCommand {
            compression_level: 0,
            file_info: info(1, 900),
            path: "big.bin".into(),
        };
        match decide_read_file(&ctx, &admission, 0, 1, &cmd, Path::new("/src")).unwrap() {
            ReadDecision::Transfer(ReadFileResponse::CopyDelta) => {}
            other => panic!("expected CopyDelta, got {other:?}"),
        }
    }

    #[test]
    fn read_file_copies_in_full_when_the_client_has_no_existing_file() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/src/big.bin"), &vec![7u8; 1_100], info(2, 1_100));
        let db = Mutex::new(FileDatabase::new());
        let settings = ServerSettings { delta_compression_threshold: 10, ..settings() };
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let admission = PriorityQueues::new(1, 4);
        admission.join(0, 1);

        let cmd = ReadFileCommand {
            compression_level: 0,
            file_info: FileInfo::default(),
            path: "big.bin".into(),
        };
        match decide_read_file(&ctx, &admission, 0, 1, &cmd, Path::new("/src")).unwrap() {
            ReadDecision::Transfer(ReadFileResponse::Copy) => {}
            other => panic!("expected Copy, got {other:?}"),
        }
    }

    #[test]
    fn create_dir_records_the_session_and_reports_fresh_levels() {
        let fs = InMemoryFs::default();
        let db = Mutex::new(FileDatabase::new());
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let resp = handle_create_dir(&ctx, &session, "sub");
        assert_eq!(resp, CreateDirResponse::SuccessExisted { created: 1 });
        assert!(session.created_dir("sub"));
    }

    #[test]
    fn delete_files_removes_everything_under_the_path() {
        let fs = InMemoryFs::default();
        fs.put(Path::new("/dst/sub/a.txt"), b"x", info(1, 1));
        let db = Mutex::new(FileDatabase::new());
        let settings = settings();
        let ctx = ServerContext { fs: &fs, db: &db, settings: &settings };
        let session = ActiveSession::new(PathBuf::from("/dst"));

        let resp = handle_delete_files(&ctx, &session, "sub");
        assert_eq!(resp, DeleteFilesResponse::Success);
        assert!(fs.stat(Path::new("/dst/sub/a.txt")).is_err());
    }
}
