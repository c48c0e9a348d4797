//! Recipient directory backed by a JSON file
//!
//! The document looks like `{"recipients": [{"username": ..., "launcher": {...},
//! "is_active": true, "email": null, "services": ["AEMET"]}]}`. Records are parsed
//! leniently: a record with an invalid username or malformed fields is skipped with a
//! warning instead of failing the whole directory, and launchers degrade to
//! `Launcher::Invalid`.

use super::validation::validate_username;
use super::RecipientDirectory;
use crate::error::DirectoryError;
use crate::launcher::Launcher;
use crate::models::Recipient;
use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::RwLock;

/// How long a loaded snapshot is trusted when the file has not changed.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

/// Coarsest modification time resolution we expect from a filesystem (FAT).
const MTIME_GRANULARITY: Duration = Duration::from_secs(2);

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    recipients: Vec<Value>,
}

/// What the file looked like on disk when it was last stat'ed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    /// Whether a write landing after `loaded_wall` could leave the same modification
    /// time. Such a snapshot cannot be validated by its fingerprint.
    fn is_racy(&self, loaded_wall: SystemTime) -> bool {
        match self.modified {
            Some(modified) => modified + MTIME_GRANULARITY >= loaded_wall,
            None => false,
        }
    }
}

struct Snapshot {
    recipients: Vec<Recipient>,
    loaded_at: Instant,
    loaded_wall: SystemTime,
    fingerprint: Fingerprint,
}

/// JSON file directory with a cached snapshot.
///
/// The snapshot is reloaded when it is older than the refresh interval, when the
/// file's modification time or length differs from the one seen at load time, or
/// when the file was modified too close to the load for its modification time to
/// tell two writes apart.
pub struct JsonFileDirectory {
    path: PathBuf,
    refresh_interval: Duration,
    cache: RwLock<Option<Snapshot>>,
}

impl JsonFileDirectory {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cache: RwLock::new(None),
        }
    }

    pub fn with_refresh_interval(mut self, refresh_interval: Duration) -> Self {
        self.refresh_interval = refresh_interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop the cached snapshot so the next lookup rereads the file.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    /// Replace the whole document with `recipients`, creating parent directories.
    pub async fn save(&self, recipients: &[Recipient]) -> Result<(), DirectoryError> {
        let path = self.path.clone();
        let records = recipients
            .iter()
            .map(|r| serde_json::to_value(r).map_err(|e| parse_error(&path, e)))
            .collect::<Result<Vec<_>, _>>()?;
        let document = Document { recipients: records };

        run_blocking(&self.path, move || write_document(&path, &document)).await?;
        self.invalidate().await;
        Ok(())
    }

    /// Persist a new launcher for `username`, leaving every other field untouched.
    pub async fn save_launcher(
        &self,
        username: &str,
        launcher: &Launcher,
    ) -> Result<(), DirectoryError> {
        let path = self.path.clone();
        let username_owned = username.to_string();
        let launcher_json = launcher.to_json();

        run_blocking(&self.path, move || {
            update_record(&path, &username_owned, |record| {
                record.insert("launcher".to_string(), launcher_json);
            })
        })
        .await?;

        self.invalidate().await;
        tracing::info!(username, launcher = launcher.kind(), "launcher saved");
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<Recipient>, DirectoryError> {
        let fingerprint = self.fingerprint().await?;

        {
            let cache = self.cache.read().await;
            if let Some(snapshot) = cache.as_ref() {
                if self.is_fresh(snapshot, fingerprint) {
                    return Ok(snapshot.recipients.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(snapshot) = cache.as_ref() {
            if self.is_fresh(snapshot, fingerprint) {
                return Ok(snapshot.recipients.clone());
            }
        }

        let loaded_wall = SystemTime::now();
        let path = self.path.clone();
        let document = run_blocking(&self.path, move || read_document(&path)).await?;
        let recipients = parse_records(&self.path, document.recipients);
        tracing::debug!(
            path = %self.path.display(),
            recipients = recipients.len(),
            "recipient directory loaded"
        );

        *cache = Some(Snapshot {
            recipients: recipients.clone(),
            loaded_at: Instant::now(),
            loaded_wall,
            fingerprint,
        });
        Ok(recipients)
    }

    fn is_fresh(&self, snapshot: &Snapshot, fingerprint: Fingerprint) -> bool {
        snapshot.loaded_at.elapsed() < self.refresh_interval
            && snapshot.fingerprint == fingerprint
            && !snapshot.fingerprint.is_racy(snapshot.loaded_wall)
    }

    async fn fingerprint(&self) -> Result<Fingerprint, DirectoryError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Ok(Fingerprint {
                modified: metadata.modified().ok(),
                len: metadata.len(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DirectoryError::Missing(self.path.clone()))
            }
            Err(e) => Err(io_error(&self.path, e)),
        }
    }
}

#[async_trait]
impl RecipientDirectory for JsonFileDirectory {
    async fn all(&self) -> Result<Vec<Recipient>, DirectoryError> {
        self.snapshot().await
    }
}

async fn run_blocking<T, F>(path: &Path, f: F) -> Result<T, DirectoryError>
where
    F: FnOnce() -> Result<T, DirectoryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| io_error(path, std::io::Error::other(e.to_string())))?
}

fn parse_records(path: &Path, records: Vec<Value>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    let mut recipients = Vec::with_capacity(records.len());

    for record in records {
        let username = record
            .get("username")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if let Err(e) = validate_username(&username) {
            tracing::warn!(path = %path.display(), username = %username, error = %e, "skipping recipient record");
            continue;
        }

        let mut recipient: Recipient = match serde_json::from_value(record) {
            Ok(recipient) => recipient,
            Err(e) => {
                tracing::warn!(path = %path.display(), username = %username, error = %e, "skipping malformed recipient record");
                continue;
            }
        };

        if !seen.insert(recipient.username.clone()) {
            tracing::warn!(path = %path.display(), username = %username, "duplicate recipient record ignored");
            continue;
        }

        recipient.services = recipient
            .services
            .into_iter()
            .map(|s| s.to_uppercase())
            .collect();
        recipients.push(recipient);
    }

    recipients
}

fn read_document(path: &Path) -> Result<Document, DirectoryError> {
    let file = open_existing(path, false)?;
    FileExt::lock_shared(&file).map_err(|e| io_error(path, e))?;

    let mut contents = String::new();
    (&file)
        .read_to_string(&mut contents)
        .map_err(|e| io_error(path, e))?;
    drop(file);

    if contents.trim().is_empty() {
        return Ok(Document::default());
    }
    serde_json::from_str(&contents).map_err(|e| parse_error(path, e))
}

fn write_document(path: &Path, document: &Document) -> Result<(), DirectoryError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error(path, e))?;
    }

    let json = serde_json::to_string_pretty(document).map_err(|e| parse_error(path, e))?;

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .map_err(|e| io_error(path, e))?;
    FileExt::lock_exclusive(&file).map_err(|e| io_error(path, e))?;

    file.set_len(0).map_err(|e| io_error(path, e))?;
    let mut writer = std::io::BufWriter::new(&file);
    writer
        .write_all(json.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|e| io_error(path, e))
}

/// Locked read-modify-write of the raw record for `username`.
fn update_record<F>(path: &Path, username: &str, f: F) -> Result<(), DirectoryError>
where
    F: FnOnce(&mut serde_json::Map<String, Value>),
{
    let mut file = open_existing(path, true)?;
    FileExt::lock_exclusive(&file).map_err(|e| io_error(path, e))?;

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|e| io_error(path, e))?;
    let mut document: Document = if contents.trim().is_empty() {
        Document::default()
    } else {
        serde_json::from_str(&contents).map_err(|e| parse_error(path, e))?
    };

    let record = document
        .recipients
        .iter_mut()
        .filter_map(Value::as_object_mut)
        .find(|r| r.get("username").and_then(Value::as_str) == Some(username))
        .ok_or_else(|| DirectoryError::NotFound(username.to_string()))?;
    f(record);

    let json = serde_json::to_string_pretty(&document).map_err(|e| parse_error(path, e))?;
    file.set_len(0).map_err(|e| io_error(path, e))?;
    file.seek(SeekFrom::Start(0)).map_err(|e| io_error(path, e))?;
    file.write_all(json.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| io_error(path, e))
}

fn open_existing(path: &Path, write: bool) -> Result<File, DirectoryError> {
    OpenOptions::new()
        .read(true)
        .write(write)
        .open(path)
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => DirectoryError::Missing(path.to_path_buf()),
            _ => io_error(path, e),
        })
}

fn io_error(path: &Path, source: std::io::Error) -> DirectoryError {
    DirectoryError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn parse_error(path: &Path, source: serde_json::Error) -> DirectoryError {
    DirectoryError::Parse {
        path: path.to_path_buf(),
        source,
    }
}
