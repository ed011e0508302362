// src/storage/mod.rs

//! Persistence seams for the ingest core.
//!
//! The durable collections live in an external document store; the core
//! only depends on these narrow traits. `MemoryStore` is the in-process
//! backend used by local runs and tests.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{
    CaseHistoryEvent, CaseStatistics, CourtRecord, CourtSnapshot, Device, NotificationLog,
    Watchlist,
};

pub use memory::MemoryStore;

/// Durable per-court view and periodic snapshots.
#[async_trait]
pub trait CourtStore: Send + Sync {
    async fn load_records(&self) -> Result<Vec<CourtRecord>>;

    async fn save_record(&self, record: CourtRecord) -> Result<()>;

    /// Refresh `checked_at` on every visible record without touching
    /// anything else. Used by 304 ticks.
    async fn touch_checked(&self, now: DateTime<Utc>) -> Result<()>;

    async fn write_snapshot(&self, snapshot: CourtSnapshot) -> Result<()>;

    async fn latest_snapshot(&self) -> Result<Option<CourtSnapshot>>;
}

/// Watchlist subscriptions and their processor-owned state fields.
#[async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn active_watchlists(&self) -> Result<Vec<Watchlist>>;

    async fn save_watchlist(&self, watchlist: Watchlist) -> Result<()>;
}

/// Append-only case history plus per-case statistics.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Unordered bulk insert. Rows whose uniqueness tuple already
    /// exists are skipped; returns how many rows were actually new.
    async fn insert_events(&self, events: &[CaseHistoryEvent]) -> Result<usize>;

    async fn statistics_for(&self, case_number: &str) -> Result<Option<CaseStatistics>>;

    async fn save_statistics(&self, stats: CaseStatistics) -> Result<()>;
}

/// Registered devices. Read-only to the core.
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn device(&self, device_id: &str) -> Result<Option<Device>>;
}

/// Audit log of push sends.
#[async_trait]
pub trait NotificationLedger: Send + Sync {
    async fn record(&self, entry: NotificationLog) -> Result<()>;
}
