// src/models/records.rs

//! Durable row types written by the ingest core.
//!
//! These are the fields the core reads and writes; index management and
//! anything else document-store-specific belongs to the backing store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::court::{CaseStatus, Court};

/// How many samples the per-case status history retains.
pub const STATUS_HISTORY_LIMIT: usize = 100;

/// Durable per-court view, keyed by `court_code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtRecord {
    pub court_code: String,
    /// Last full observation
    pub data: Court,
    /// Canonical hash of `data` at the last real change
    pub data_hash: String,
    pub checked_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
    /// Consecutive ticks the court has been absent from the board
    pub missing_count: u32,
    pub is_visible: bool,
}

/// One append-only case-history observation.
///
/// Unique on `(case_number, status, position, court_number, scraped_at)`
/// so bulk inserts are idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseHistoryEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
    pub court_number: String,
    pub judge_name: String,
    pub scraped_at: DateTime<Utc>,
}

impl CaseHistoryEvent {
    /// The uniqueness tuple backing the dedup index.
    pub fn dedup_key(&self) -> (Option<String>, Option<CaseStatus>, Option<u32>, String, DateTime<Utc>) {
        (
            self.case_number.clone(),
            self.status,
            self.queue_position,
            self.court_number.clone(),
            self.scraped_at,
        )
    }
}

/// One entry in a case's bounded status tail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    pub timestamp: DateTime<Utc>,
    pub court_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
}

/// Aggregated statistics per case number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseStatistics {
    pub case_number: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_appearances: u64,
    /// Distinct court numbers the case has appeared in
    pub courts: Vec<String>,
    /// Distinct judges the case has appeared before
    pub judges: Vec<String>,
    pub status_history: Vec<StatusSample>,
    pub watch_count: u64,
}

impl CaseStatistics {
    /// First observation of a case.
    pub fn first_observation(case_number: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            case_number: case_number.into(),
            first_seen: now,
            last_seen: now,
            total_appearances: 0,
            courts: Vec::new(),
            judges: Vec::new(),
            status_history: Vec::new(),
            watch_count: 0,
        }
    }

    /// Fold one court observation into the statistics.
    ///
    /// Set-valued fields stay deduplicated and the status tail is
    /// bounded at [`STATUS_HISTORY_LIMIT`].
    pub fn observe(&mut self, court: &Court, now: DateTime<Utc>) {
        self.last_seen = now;
        self.total_appearances += 1;

        if !self.courts.contains(&court.court_number) {
            self.courts.push(court.court_number.clone());
        }
        if !court.judge_name.is_empty() && !self.judges.contains(&court.judge_name) {
            self.judges.push(court.judge_name.clone());
        }

        self.status_history.push(StatusSample {
            status: court.case_status,
            timestamp: now,
            court_number: court.court_number.clone(),
            queue_position: court.queue_position,
        });
        if self.status_history.len() > STATUS_HISTORY_LIMIT {
            let excess = self.status_history.len() - STATUS_HISTORY_LIMIT;
            self.status_history.drain(..excess);
        }
    }
}

/// One push-send attempt, kept for dedup and audit.
///
/// Dedup-indexed on `(device_id, case_number, notification_type,
/// court_number)`; the store expires rows after 30 days.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLog {
    pub device_id: String,
    pub case_number: String,
    pub notification_type: String,
    pub court_number: String,
    pub success: bool,
    pub sent_at: DateTime<Utc>,
}

/// Periodic snapshot of the durable court view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourtSnapshot {
    pub captured_at: DateTime<Utc>,
    pub courts: Vec<CourtRecord>,
}

/// A registered mobile device. Read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_id: String,
    pub push_token: String,
    pub is_active: bool,
}
