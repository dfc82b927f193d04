use chrono::{DateTime, Duration, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::SessionRecord;

const RECORD_EXTENSION: &str = ".json";
const STAGING_MARKER: &str = ".json.staging-";
const CLAIM_MARKER: &str = ".json.claimed-";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("Session {0} already exists")]
    AlreadyExists(Uuid),

    #[error("Corrupt session record {}: {reason}", .path.display())]
    CorruptRecord { path: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<SessionStoreError> for ValidationError {
    fn from(err: SessionStoreError) -> Self {
        ValidationError::Storage(err.to_string())
    }
}

/// Durable store of pending validation sessions, one JSON file per session.
///
/// A record leaves the store exactly once. Both consumption and the expiry
/// sweep take ownership of a record by renaming it to a unique claim name
/// before deleting it, so when they race only one rename succeeds.
pub struct SessionStore {
    dir: PathBuf,
    validity: Duration,
}

enum DirEntryKind {
    Record(Uuid),
    Leftover,
    Other,
}

impl SessionStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>, validity: Duration) -> Result<Self, SessionStoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;

        tracing::info!(
            dir = %dir.display(),
            "Session store opened with validity of {} minutes",
            validity.num_minutes()
        );

        Ok(Self { dir, validity })
    }

    /// Build a record whose expiry is fixed now, one validity window ahead.
    pub fn new_record(&self, user_data: serde_json::Value, liveness_pid: String) -> SessionRecord {
        SessionRecord {
            user_data,
            liveness_pid,
            expires_at: Utc::now() + self.validity,
        }
    }

    /// Persist `record` under a freshly generated identifier.
    pub async fn create(&self, record: &SessionRecord) -> Result<Uuid, SessionStoreError> {
        let session_id = Uuid::new_v4();
        self.create_with_id(session_id, record).await?;
        Ok(session_id)
    }

    /// Persist `record` under an identifier the caller already handed out.
    ///
    /// Fails with [`SessionStoreError::AlreadyExists`] rather than replacing a
    /// live record.
    pub async fn create_with_id(
        &self,
        session_id: Uuid,
        record: &SessionRecord,
    ) -> Result<(), SessionStoreError> {
        let json = serde_json::to_vec_pretty(record)?;
        let staging_path = self.staging_path(&session_id);
        let record_path = self.record_path(&session_id);

        let result = write_staged(&staging_path, &record_path, &json).await;

        if let Err(e) = tokio::fs::remove_file(&staging_path).await {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(
                    path = %staging_path.display(),
                    "Failed to remove staging file: {}",
                    e
                );
            }
        }

        match result {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(SessionStoreError::AlreadyExists(session_id));
            }
            Err(e) => return Err(e.into()),
        }

        sync_dir(&self.dir).await;

        tracing::debug!(
            session_id = %session_id,
            expires_at = %record.expires_at,
            "Created session"
        );
        Ok(())
    }

    /// Remove and return the record stored under `session_id`.
    ///
    /// Returns `Ok(None)` for identifiers that are malformed, unknown, already
    /// consumed, expired or corrupt. Concurrent callers for the same
    /// identifier get at most one `Some`.
    pub async fn fetch_and_consume(
        &self,
        session_id: &str,
    ) -> Result<Option<SessionRecord>, SessionStoreError> {
        let Some(session_id) = parse_session_id(session_id) else {
            tracing::debug!("Rejected malformed session identifier");
            return Ok(None);
        };

        let Some(claimed_path) = self.claim(&session_id).await? else {
            tracing::debug!(session_id = %session_id, "Session not present");
            return Ok(None);
        };

        let contents = tokio::fs::read(&claimed_path).await;
        if let Err(e) = remove_entry(&claimed_path).await {
            tracing::warn!(
                session_id = %session_id,
                "Failed to remove consumed session file: {}",
                e
            );
        }

        let contents = match contents {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "Unreadable session record: {}", e);
                return Ok(None);
            }
        };

        match parse_record(&claimed_path, &contents) {
            Ok(record) if record.is_expired_at(Utc::now()) => {
                tracing::debug!(session_id = %session_id, "Session expired before consumption");
                Ok(None)
            }
            Ok(record) => {
                tracing::debug!(session_id = %session_id, "Session consumed");
                Ok(Some(record))
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, "{}", e);
                Ok(None)
            }
        }
    }

    /// Remove every record whose expiry is at or before now. Returns how many
    /// records were removed.
    ///
    /// Corrupt or unreadable records are logged and left in place until they
    /// are older than the validity window, then removed. Staging and claim
    /// files past that age are crash leftovers and are removed too.
    pub async fn sweep_expired(&self) -> Result<usize, SessionStoreError> {
        let now = Utc::now();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            match classify(name) {
                DirEntryKind::Record(session_id) => {
                    if self.sweep_record(session_id, &path, now).await {
                        removed += 1;
                    }
                }
                DirEntryKind::Leftover => self.sweep_leftover(&path, now).await,
                DirEntryKind::Other => {}
            }
        }

        if removed > 0 {
            tracing::info!("Swept {} expired sessions", removed);
        }
        Ok(removed)
    }

    async fn sweep_record(&self, session_id: Uuid, path: &Path, now: DateTime<Utc>) -> bool {
        let contents = match tokio::fs::read(path).await {
            Ok(contents) => contents,
            // Consumed between listing and reading.
            Err(e) if e.kind() == ErrorKind::NotFound => return false,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "Unreadable session record: {}", e);
                return self.discard_if_stale(session_id, path, now).await;
            }
        };

        let record = match parse_record(path, &contents) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "{}", e);
                return self.discard_if_stale(session_id, path, now).await;
            }
        };

        if !record.is_expired_at(now) {
            return false;
        }

        self.remove_claimed(session_id).await
    }

    /// Corrupt records never expire on their own; drop them once their file is
    /// older than the validity window.
    async fn discard_if_stale(&self, session_id: Uuid, path: &Path, now: DateTime<Utc>) -> bool {
        if !self.is_stale(path, now).await {
            return false;
        }

        tracing::info!(session_id = %session_id, "Discarding stale corrupt session record");
        self.remove_claimed(session_id).await
    }

    async fn remove_claimed(&self, session_id: Uuid) -> bool {
        match self.claim(&session_id).await {
            Ok(Some(claimed_path)) => match remove_entry(&claimed_path).await {
                Ok(()) => {
                    tracing::debug!(session_id = %session_id, "Removed session record");
                    true
                }
                Err(e) => {
                    tracing::warn!(session_id = %session_id, "Failed to remove session record: {}", e);
                    false
                }
            },
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(session_id = %session_id, "Failed to claim session record: {}", e);
                false
            }
        }
    }

    async fn is_stale(&self, path: &Path, now: DateTime<Utc>) -> bool {
        match tokio::fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => now.signed_duration_since(DateTime::<Utc>::from(modified)) > self.validity,
            Err(_) => false,
        }
    }

    async fn sweep_leftover(&self, path: &Path, now: DateTime<Utc>) {
        if !self.is_stale(path, now).await {
            return;
        }

        match remove_entry(path).await {
            Ok(()) => tracing::info!(path = %path.display(), "Removed stale session leftover"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "Failed to remove leftover: {}", e),
        }
    }

    /// Atomically move the record out of its live name. `None` means someone
    /// else got there first or it never existed.
    async fn claim(&self, session_id: &Uuid) -> Result<Option<PathBuf>, SessionStoreError> {
        let claimed_path = self.dir.join(format!("{}{}{}", session_id, CLAIM_MARKER, Uuid::new_v4()));

        match tokio::fs::rename(self.record_path(session_id), &claimed_path).await {
            Ok(()) => Ok(Some(claimed_path)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn record_path(&self, session_id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}{}", session_id, RECORD_EXTENSION))
    }

    fn staging_path(&self, session_id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}{}{}", session_id, STAGING_MARKER, Uuid::new_v4()))
    }
}

/// Accepts only the canonical hyphenated form so that one identifier maps to
/// exactly one file name.
fn parse_session_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw)
        .ok()
        .filter(|id| id.hyphenated().to_string() == raw)
}

fn classify(name: &str) -> DirEntryKind {
    if name.contains(STAGING_MARKER) || name.contains(CLAIM_MARKER) {
        return DirEntryKind::Leftover;
    }

    name.strip_suffix(RECORD_EXTENSION)
        .and_then(parse_session_id)
        .map(DirEntryKind::Record)
        .unwrap_or(DirEntryKind::Other)
}

/// Removes `path` whether it is a file or a directory.
async fn remove_entry(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => match tokio::fs::symlink_metadata(path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(path).await,
            _ => Err(e),
        },
        other => other,
    }
}

fn parse_record(path: &Path, contents: &[u8]) -> Result<SessionRecord, SessionStoreError> {
    serde_json::from_slice(contents).map_err(|e| SessionStoreError::CorruptRecord {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Write `contents` to a fresh staging file, flush it to disk, then link it
/// into place. Linking fails if the target exists.
async fn write_staged(staging_path: &Path, record_path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create_new(true);

    // Read/write for owner only
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options.open(staging_path).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::hard_link(staging_path, record_path).await
}

async fn sync_dir(dir: &Path) {
    #[cfg(unix)]
    {
        let result = match tokio::fs::File::open(dir).await {
            Ok(handle) => handle.sync_all().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::debug!(dir = %dir.display(), "Directory sync failed: {}", e);
        }
    }
    #[cfg(not(unix))]
    let _ = dir;
}
