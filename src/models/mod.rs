//! Domain models for the courtwatch service.
//!
//! Transient entities (`Court`) are rebuilt from the display board on
//! every tick; the `records` module holds the durable rows derived from
//! them.

mod config;
pub mod court;
mod records;
mod watchlist;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-export all public types
pub use config::{Config, PushConfig, ScraperConfig, UpstreamConfig};
pub use court::{BenchType, CaseFooter, CaseStatus, CaseType, Court};
pub use records::{
    CaseHistoryEvent, CaseStatistics, CourtRecord, CourtSnapshot, Device, NotificationLog,
    StatusSample, STATUS_HISTORY_LIMIT,
};
pub use watchlist::{
    Alert, AlertDetails, AlertType, NotificationSettings, WatchState, Watchlist,
};

/// Counters for one completed tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickStats {
    pub parsed_courts: usize,
    pub changed_courts: usize,
    pub missing_courts: usize,
    pub history_rows: usize,
    pub stats_upserts: usize,
    pub watchlists_processed: usize,
    pub alerts_sent: usize,
}

/// Outcome of one scheduled tick.
#[derive(Debug, Clone)]
pub enum TickReport {
    /// Upstream answered 304; nothing downstream ran.
    Skipped,
    /// The full pipeline ran.
    Completed(TickStats),
}

impl TickReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, TickReport::Skipped)
    }

    pub fn stats(&self) -> Option<&TickStats> {
        match self {
            TickReport::Completed(stats) => Some(stats),
            TickReport::Skipped => None,
        }
    }
}

/// Broadcast payload for connected clients, sent only on non-empty deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaBroadcast {
    #[serde(rename = "type")]
    pub kind: String,
    pub courts: Vec<Court>,
    #[serde(rename = "scrapedAt")]
    pub scraped_at: DateTime<Utc>,
}

impl DeltaBroadcast {
    pub const KIND: &'static str = "COURT_DELTA";

    pub fn new(courts: Vec<Court>, scraped_at: DateTime<Utc>) -> Self {
        Self {
            kind: Self::KIND.to_string(),
            courts,
            scraped_at,
        }
    }
}
