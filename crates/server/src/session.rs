//! The `ActiveSession` registry, keyed by secret GUID (spec §4.2, §4.4).

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use protocol::SecretGuid;
use rustc_hash::FxHashMap;

/// Generates a fresh session secret for the security-file handshake (spec
/// §4.2). Uniqueness, not secrecy, is what the handshake's correctness
/// depends on here; a deployment that actually needs unguessable secrets
/// would source this from a CSPRNG, which is out of scope (spec §1).
#[must_use]
pub fn generate_secret_guid(counter: &AtomicU64) -> SecretGuid {
    let seq = counter.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    let mut guid = [0u8; 16];
    guid[0..8].copy_from_slice(&seq.to_le_bytes());
    guid[8..16].copy_from_slice(&nanos.to_le_bytes());
    guid
}

/// One client session, shared by every connection that joined under the
/// same secret GUID. Reference-counted: the last connection to leave tears
/// it down and drops `created_dirs`.
pub struct ActiveSession {
    /// Resolved local root the session's relative paths are joined against.
    pub net_directory: PathBuf,
    /// Destination-relative directories created by a `CreateDir` on this
    /// session, folded to lowercase for case-insensitive lookup (spec §4.2:
    /// "if the destination directory was NOT created by this session").
    created_dirs: Mutex<HashSet<String>>,
    connection_count: Mutex<u32>,
}

impl ActiveSession {
    /// Creates a standalone session not registered in any [`ActiveSessions`]
    /// registry (tests, or a server running without the security-file
    /// handshake's session-reuse semantics).
    #[must_use]
    pub fn new(net_directory: PathBuf) -> Self {
        Self {
            net_directory,
            created_dirs: Mutex::new(HashSet::new()),
            connection_count: Mutex::new(0),
        }
    }

    /// Records that `dir` was created (or already existed) via `CreateDir`
    /// on this session.
    pub fn record_created_dir(&self, dir: &str) {
        self.created_dirs.lock().unwrap().insert(dir.to_ascii_lowercase());
    }

    /// Whether `dir` was created by this session.
    #[must_use]
    pub fn created_dir(&self, dir: &str) -> bool {
        self.created_dirs.lock().unwrap().contains(&dir.to_ascii_lowercase())
    }
}

/// Registry of live sessions, keyed by secret GUID.
#[derive(Default)]
pub struct ActiveSessions {
    sessions: Mutex<FxHashMap<SecretGuid, Arc<ActiveSession>>>,
}

impl ActiveSessions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins (creating if absent) the session for `secret_guid`, bumping its
    /// connection count.
    pub fn join(&self, secret_guid: SecretGuid, net_directory: PathBuf) -> Arc<ActiveSession> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .entry(secret_guid)
            .or_insert_with(|| Arc::new(ActiveSession::new(net_directory)))
            .clone();
        *session.connection_count.lock().unwrap() += 1;
        session
    }

    /// Leaves the session for `secret_guid`; the registry entry is dropped
    /// once its connection count reaches zero.
    pub fn leave(&self, secret_guid: SecretGuid) {
        let mut sessions = self.sessions.lock().unwrap();
        let Some(session) = sessions.get(&secret_guid) else {
            return;
        };
        let mut count = session.connection_count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            drop(count);
            sessions.remove(&secret_guid);
        }
    }

    /// Looks up a session without joining it, e.g. to verify a nonzero
    /// secret GUID the security-file scheme expects to already exist.
    #[must_use]
    pub fn get(&self, secret_guid: SecretGuid) -> Option<Arc<ActiveSession>> {
        self.sessions.lock().unwrap().get(&secret_guid).cloned()
    }
}
