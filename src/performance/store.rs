use super::SessionMetrics;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetricsStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Json serde error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence for session metrics, keyed by session id
pub trait MetricsStore: Send + Sync {
    fn save(&self, metrics: &SessionMetrics) -> Result<(), MetricsStoreError>;
    fn load_all(&self) -> Result<Vec<SessionMetrics>, MetricsStoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryMetricsStore {
    sessions: Mutex<HashMap<String, SessionMetrics>>,
}

impl MemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsStore for MemoryMetricsStore {
    fn save(&self, metrics: &SessionMetrics) -> Result<(), MetricsStoreError> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(metrics.session_id.clone(), metrics.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<SessionMetrics>, MetricsStoreError> {
        let mut sessions: Vec<SessionMetrics> = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect();
        sessions.sort_by_key(|session| session.started_at);
        Ok(sessions)
    }
}

/// One `<session_id>.json` file per session.
///
/// Inside a tokio runtime, snapshots are written on the blocking pool so the
/// dialogue loop never waits on disk. Writes carry a sequence number and an
/// older snapshot never replaces a newer one. A closed session is written
/// before `save` returns.
pub struct JsonFileMetricsStore {
    dir: PathBuf,
    next_seq: AtomicU64,
    last_written: Arc<Mutex<u64>>,
}

impl JsonFileMetricsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, MetricsStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            next_seq: AtomicU64::new(1),
            last_written: Arc::new(Mutex::new(0)),
        })
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    fn read_file(path: &Path) -> Result<SessionMetrics, MetricsStoreError> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

impl MetricsStore for JsonFileMetricsStore {
    fn save(&self, metrics: &SessionMetrics) -> Result<(), MetricsStoreError> {
        let path = self.session_path(&metrics.session_id);
        let bytes = serde_json::to_vec_pretty(metrics)?;
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let last_written = self.last_written.clone();

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if metrics.ended_at.is_none() => {
                handle.spawn_blocking(move || {
                    if let Err(e) = write_in_order(&last_written, seq, &path, &bytes) {
                        log::warn!("📊 Failed to write {}: {}", path.display(), e);
                    }
                });
                Ok(())
            }
            _ => write_in_order(&last_written, seq, &path, &bytes),
        }
    }

    fn load_all(&self) -> Result<Vec<SessionMetrics>, MetricsStoreError> {
        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match Self::read_file(&path) {
                Ok(session) => sessions.push(session),
                Err(e) => log::warn!("Skipping unreadable metrics file {}: {}", path.display(), e),
            }
        }
        sessions.sort_by_key(|session| session.started_at);
        Ok(sessions)
    }
}

fn write_in_order(
    last_written: &Mutex<u64>,
    seq: u64,
    path: &Path,
    bytes: &[u8],
) -> Result<(), MetricsStoreError> {
    let mut last = last_written
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if seq < *last {
        log::debug!("Skipping stale metrics snapshot {} for {}", seq, path.display());
        return Ok(());
    }
    // Write-then-rename so a crash never leaves half a file behind
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    *last = seq;
    Ok(())
}
