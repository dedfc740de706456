//! Upload history records.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vidrelay_common::{Error, ProviderId, Result, UploadOutcome};

/// How many records the cross-user admin view returns.
pub const ADMIN_HISTORY_LIMIT: usize = 100;

/// One provider's result for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: String,
    pub user_id: String,
    /// File name, or the source URL for remote uploads.
    pub filename: String,
    pub provider: ProviderId,
    /// `success` or `failed`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    /// Record an upload outcome now.
    pub fn from_outcome(user_id: &str, filename: &str, outcome: &UploadOutcome) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            filename: filename.to_string(),
            provider: outcome.provider,
            status: if outcome.success { "success" } else { "failed" }.to_string(),
            url: outcome.url.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Append-only store of upload history.
pub trait HistoryStore: Send + Sync {
    /// Append a record.
    fn record(&self, entry: &HistoryRecord) -> Result<()>;

    /// A user's records, newest first.
    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>>;

    /// Records across all users, newest first.
    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>>;
}

/// In-memory history store.
#[derive(Default)]
pub struct MemoryHistoryStore {
    records: RwLock<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first<F>(&self, limit: usize, keep: F) -> Result<Vec<HistoryRecord>>
    where
        F: Fn(&HistoryRecord) -> bool,
    {
        let records = self
            .records
            .read()
            .map_err(|_| Error::Storage("history store lock poisoned".to_string()))?;
        // Insertion order breaks timestamp ties.
        let mut out: Vec<_> = records.iter().rev().filter(|r| keep(r)).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        out.truncate(limit);
        Ok(out)
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn record(&self, entry: &HistoryRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| Error::Storage("history store lock poisoned".to_string()))?
            .push(entry.clone());
        Ok(())
    }

    fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.newest_first(limit, |r| r.user_id == user_id)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<HistoryRecord>> {
        self.newest_first(limit, |_| true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use vidrelay_common::UploadedFile;

    fn record_at(user: &str, name: &str, minutes_ago: i64) -> HistoryRecord {
        let outcome = UploadOutcome::failed(ProviderId::VidGuard, "x");
        let mut record = HistoryRecord::from_outcome(user, name, &outcome);
        record.created_at = Utc::now() - Duration::minutes(minutes_ago);
        record
    }

    #[test]
    fn test_from_outcome() {
        let ok = UploadOutcome::succeeded(
            ProviderId::BigWarp,
            UploadedFile {
                url: Some("https://bigwarp.io/a.html".into()),
                id: Some("a".into()),
            },
        );
        let record = HistoryRecord::from_outcome("u1", "clip.mp4", &ok);
        assert_eq!(record.status, "success");
        assert_eq!(record.url.as_deref(), Some("https://bigwarp.io/a.html"));

        let bad = UploadOutcome::failed(ProviderId::BigWarp, "nope");
        assert_eq!(HistoryRecord::from_outcome("u1", "clip.mp4", &bad).status, "failed");
    }

    #[test]
    fn test_newest_first_and_scoped() {
        let store = MemoryHistoryStore::new();
        store.record(&record_at("u1", "old", 10)).unwrap();
        store.record(&record_at("u2", "other", 5)).unwrap();
        store.record(&record_at("u1", "new", 1)).unwrap();

        let mine = store.list_for_user("u1", 50).unwrap();
        let names: Vec<_> = mine.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);

        let all = store.list_recent(2).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].filename, "other");
    }
}
