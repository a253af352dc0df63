//! Verification record store
//!
//! The in-memory record set is authoritative for the session. Every change
//! is applied in memory first and then queued to a background writer that
//! persists it through a [`KeyValueStore`], so status updates never wait on
//! storage. Writes are applied strictly in submission order. Storage failures
//! become [`PersistenceWarning`]s instead of errors.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{VerificationRecord, VerificationStatus};
use crate::cpf::clean_cpf;
use crate::error::{Error, Result};
use crate::storage::{KeyValueStore, StorageError, StorageResult};

/// Namespace of verification records in the key-value store
pub const KEY_PREFIX: &str = "checadoc:ver:";

/// Written and read back by [`VerificationStore::check_connection`]
pub const PROBE_KEY: &str = "checadoc:connection-test";

pub(crate) fn record_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Storage operation that produced a warning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersistOperation {
    Load,
    Save,
    Delete,
    Clear,
}

impl fmt::Display for PersistOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Delete => "delete",
            Self::Clear => "clear",
        };
        f.write_str(label)
    }
}

/// A persistence failure surfaced to the operator. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersistenceWarning {
    pub operation: PersistOperation,
    pub record_id: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl PersistenceWarning {
    fn from_storage(operation: PersistOperation, record_id: Option<String>, err: &StorageError) -> Self {
        Self {
            operation,
            record_id,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl fmt::Display for PersistenceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.record_id {
            Some(id) => write!(f, "{} of {} failed: {}", self.operation, id, self.message)?,
            None => write!(f, "{} failed: {}", self.operation, self.message)?,
        }
        if self.retryable {
            f.write_str(" (retryable)")?;
        }
        Ok(())
    }
}

/// Filter for [`VerificationStore::list`]
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: Option<VerificationStatus>,
    /// Case-insensitive match on name, CPF, institution or id
    pub search: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &VerificationRecord) -> bool {
        if self.status.is_some_and(|status| record.status != status) {
            return false;
        }

        let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = search.to_lowercase();
        let fields = [
            &record.form.name,
            &record.form.cpf,
            &record.form.institution,
            &record.id,
        ];
        if fields.iter().any(|field| field.to_lowercase().contains(&needle)) {
            return true;
        }

        // "52998224725" should find "529.982.247-25"
        let looks_numeric = search
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | ' '));
        let digits = clean_cpf(search);
        looks_numeric && !digits.is_empty() && clean_cpf(&record.form.cpf).contains(&digits)
    }
}

/// Record counts per status
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub pending: usize,
    pub in_review: usize,
    pub approved: usize,
    pub rejected: usize,
}

enum WriteOp {
    Save { id: String, value: Value },
    Delete { id: String },
    Clear,
    Flush(oneshot::Sender<()>),
}

type Warnings = Arc<Mutex<Vec<PersistenceWarning>>>;

/// Verification records with fire-and-forget persistence
pub struct VerificationStore {
    records: RwLock<Vec<VerificationRecord>>,
    kv: Arc<dyn KeyValueStore>,
    tx: mpsc::UnboundedSender<WriteOp>,
    warnings: Warnings,
    _writer: JoinHandle<()>,
}

impl VerificationStore {
    /// Create an empty store and start its writer. Call [`Self::load`] to
    /// restore persisted records.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let warnings = Warnings::default();
        let writer = tokio::spawn(run_writer(kv.clone(), rx, warnings.clone()));

        Self {
            records: RwLock::new(Vec::new()),
            kv,
            tx,
            warnings,
            _writer: writer,
        }
    }

    /// Replace the in-memory set with the persisted records, newest first.
    ///
    /// On failure the set is left empty and a warning is recorded.
    pub async fn load(&self) -> usize {
        let entries = match self.kv.scan_prefix(KEY_PREFIX).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load verification records: {}", e);
                self.records.write().await.clear();
                self.push_warning(PersistenceWarning::from_storage(PersistOperation::Load, None, &e))
                    .await;
                return 0;
            }
        };

        let mut loaded = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match serde_json::from_value::<VerificationRecord>(value) {
                Ok(record) => loaded.push(record),
                Err(e) => {
                    let id = key.strip_prefix(KEY_PREFIX).unwrap_or(&key).to_string();
                    warn!("Skipping undecodable record {}: {}", id, e);
                    self.push_warning(PersistenceWarning {
                        operation: PersistOperation::Load,
                        record_id: Some(id),
                        message: format!("undecodable record: {e}"),
                        retryable: false,
                    })
                    .await;
                }
            }
        }
        loaded.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let count = loaded.len();
        *self.records.write().await = loaded;
        info!("Loaded {} verification records", count);
        count
    }

    /// Add a record at the front of the set and queue it for persistence
    pub async fn create(&self, record: VerificationRecord) -> VerificationRecord {
        let failure = {
            let mut records = self.records.write().await;
            records.insert(0, record.clone());
            self.queue_save(&record)
        };
        self.note(failure).await;
        record
    }

    pub async fn get(&self, id: &str) -> Option<VerificationRecord> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    /// Matching records, newest first
    pub async fn list(&self, filter: &RecordFilter) -> Vec<VerificationRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn stats(&self) -> StoreStats {
        let records = self.records.read().await;
        let mut stats = StoreStats {
            total: records.len(),
            ..Default::default()
        };
        for record in records.iter() {
            match record.status {
                VerificationStatus::Pending => stats.pending += 1,
                VerificationStatus::InReview => stats.in_review += 1,
                VerificationStatus::Approved => stats.approved += 1,
                VerificationStatus::Rejected => stats.rejected += 1,
            }
        }
        stats
    }

    /// Force a status. Check results are left untouched.
    pub async fn set_status(
        &self,
        id: &str,
        status: VerificationStatus,
    ) -> Result<VerificationRecord> {
        let (updated, failure) = {
            let mut records = self.records.write().await;
            let record = records
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| Error::NotFound(format!("verification {id}")))?;
            record.status = status;
            let updated = record.clone();
            let failure = self.queue_save(&updated);
            (updated, failure)
        };
        debug!(id = %id, status = %status, "Status updated");
        self.note(failure).await;
        Ok(updated)
    }

    pub async fn approve(&self, id: &str) -> Result<VerificationRecord> {
        self.set_status(id, VerificationStatus::Approved).await
    }

    pub async fn reject(&self, id: &str) -> Result<VerificationRecord> {
        self.set_status(id, VerificationStatus::Rejected).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        {
            let mut records = self.records.write().await;
            let position = records
                .iter()
                .position(|r| r.id == id)
                .ok_or_else(|| Error::NotFound(format!("verification {id}")))?;
            records.remove(position);
            self.send(WriteOp::Delete { id: id.to_string() });
        }
        Ok(())
    }

    /// Remove every record, including persisted ones that were never loaded
    pub async fn clear_all(&self) -> usize {
        let removed = {
            let mut records = self.records.write().await;
            let count = records.len();
            records.clear();
            self.send(WriteOp::Clear);
            count
        };
        removed
    }

    /// Write, read back and delete a probe key. Returns the round-trip time.
    pub async fn check_connection(&self) -> StorageResult<Duration> {
        let start = Instant::now();
        let probe = serde_json::json!({ "checked_at": Utc::now().to_rfc3339() });

        self.kv.set(PROBE_KEY, &probe).await?;
        let read_back = self.kv.get(PROBE_KEY).await?;
        self.kv.delete(PROBE_KEY).await?;

        if read_back.as_ref() != Some(&probe) {
            return Err(StorageError::unavailable(
                "probe key read back a different value",
            ));
        }
        Ok(start.elapsed())
    }

    /// Wait until every write queued so far has been attempted
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriteOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Drain the warnings collected so far
    pub async fn take_warnings(&self) -> Vec<PersistenceWarning> {
        std::mem::take(&mut *self.warnings.lock().await)
    }

    pub fn backend_type(&self) -> &'static str {
        self.kv.backend_type()
    }

    /// Queue a save. Callers hold the records write guard so queue order
    /// matches the order of in-memory changes.
    fn queue_save(&self, record: &VerificationRecord) -> Option<PersistenceWarning> {
        match serde_json::to_value(record) {
            Ok(value) => {
                self.send(WriteOp::Save {
                    id: record.id.clone(),
                    value,
                });
                None
            }
            Err(e) => Some(PersistenceWarning::from_storage(
                PersistOperation::Save,
                Some(record.id.clone()),
                &StorageError::from(e),
            )),
        }
    }

    async fn note(&self, failure: Option<PersistenceWarning>) {
        if let Some(warning) = failure {
            self.push_warning(warning).await;
        }
    }

    fn send(&self, op: WriteOp) {
        if self.tx.send(op).is_err() {
            warn!("Persistence writer has stopped; change kept in memory only");
        }
    }

    async fn push_warning(&self, warning: PersistenceWarning) {
        self.warnings.lock().await.push(warning);
    }
}

async fn run_writer(
    kv: Arc<dyn KeyValueStore>,
    mut rx: mpsc::UnboundedReceiver<WriteOp>,
    warnings: Warnings,
) {
    debug!("Persistence writer started ({})", kv.backend_type());
    let mut written = 0usize;

    while let Some(op) = rx.recv().await {
        let failure = match op {
            WriteOp::Save { id, value } => kv
                .set(&record_key(&id), &value)
                .await
                .err()
                .map(|e| PersistenceWarning::from_storage(PersistOperation::Save, Some(id), &e)),
            WriteOp::Delete { id } => kv
                .delete(&record_key(&id))
                .await
                .err()
                .map(|e| PersistenceWarning::from_storage(PersistOperation::Delete, Some(id), &e)),
            WriteOp::Clear => clear_namespace(kv.as_ref())
                .await
                .err()
                .map(|e| PersistenceWarning::from_storage(PersistOperation::Clear, None, &e)),
            WriteOp::Flush(done) => {
                let _ = done.send(());
                continue;
            }
        };

        match failure {
            Some(warning) => {
                warn!("Persistence failure: {}", warning);
                warnings.lock().await.push(warning);
            }
            None => written += 1,
        }
    }

    debug!("Persistence writer shutting down ({} writes)", written);
}

async fn clear_namespace(kv: &dyn KeyValueStore) -> StorageResult<()> {
    for (key, _) in kv.scan_prefix(KEY_PREFIX).await? {
        kv.delete(&key).await?;
    }
    Ok(())
}
