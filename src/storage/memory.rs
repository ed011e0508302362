// src/storage/memory.rs

//! In-process storage backend.
//!
//! Backs local runs and the test suite. All writers sit inside the
//! single in-flight tick, so plain mutexed maps are sufficient; the
//! CaseHistory uniqueness index is modeled with a key set so replayed
//! ticks insert nothing.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{AppError, Result};
use crate::models::{
    CaseHistoryEvent, CaseStatistics, CourtRecord, CourtSnapshot, Device, NotificationLog,
    Watchlist,
};
use crate::storage::{
    CourtStore, DeviceDirectory, HistoryStore, NotificationLedger, WatchlistStore,
};

#[derive(Default)]
struct Inner {
    records: BTreeMap<String, CourtRecord>,
    snapshots: Vec<CourtSnapshot>,
    watchlists: BTreeMap<String, Watchlist>,
    history: Vec<CaseHistoryEvent>,
    history_keys: HashSet<String>,
    statistics: BTreeMap<String, CaseStatistics>,
    devices: BTreeMap<String, Device>,
    notifications: Vec<NotificationLog>,
}

/// In-memory implementation of every storage trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| AppError::storage("memory store mutex poisoned"))
    }

    /// Register a device (test/dev seeding; registration CRUD is an
    /// external collaborator).
    pub fn put_device(&self, device: Device) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.devices.insert(device.device_id.clone(), device);
        }
    }

    /// Insert or replace a watchlist (test/dev seeding).
    pub fn put_watchlist(&self, watchlist: Watchlist) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.watchlists.insert(watchlist.id.clone(), watchlist);
        }
    }

    /// Read back a watchlist by id.
    pub fn watchlist(&self, id: &str) -> Option<Watchlist> {
        self.inner.lock().ok()?.watchlists.get(id).cloned()
    }

    /// Number of stored history rows.
    pub fn history_len(&self) -> usize {
        self.inner.lock().map(|i| i.history.len()).unwrap_or(0)
    }

    /// All recorded push sends, in order.
    pub fn notifications(&self) -> Vec<NotificationLog> {
        self.inner
            .lock()
            .map(|i| i.notifications.clone())
            .unwrap_or_default()
    }

    /// Read back one court record.
    pub fn record(&self, court_code: &str) -> Option<CourtRecord> {
        self.inner.lock().ok()?.records.get(court_code).cloned()
    }

    fn history_key(event: &CaseHistoryEvent) -> String {
        format!(
            "{}|{:?}|{:?}|{}|{}",
            event.case_number.as_deref().unwrap_or(""),
            event.status,
            event.queue_position,
            event.court_number,
            event.scraped_at.timestamp_millis()
        )
    }
}

#[async_trait]
impl CourtStore for MemoryStore {
    async fn load_records(&self) -> Result<Vec<CourtRecord>> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    async fn save_record(&self, record: CourtRecord) -> Result<()> {
        self.lock()?
            .records
            .insert(record.court_code.clone(), record);
        Ok(())
    }

    async fn touch_checked(&self, now: DateTime<Utc>) -> Result<()> {
        for record in self.lock()?.records.values_mut() {
            if record.is_visible {
                record.checked_at = now;
            }
        }
        Ok(())
    }

    async fn write_snapshot(&self, snapshot: CourtSnapshot) -> Result<()> {
        self.lock()?.snapshots.push(snapshot);
        Ok(())
    }

    async fn latest_snapshot(&self) -> Result<Option<CourtSnapshot>> {
        Ok(self.lock()?.snapshots.last().cloned())
    }
}

#[async_trait]
impl WatchlistStore for MemoryStore {
    async fn active_watchlists(&self) -> Result<Vec<Watchlist>> {
        Ok(self
            .lock()?
            .watchlists
            .values()
            .filter(|w| w.is_active)
            .cloned()
            .collect())
    }

    async fn save_watchlist(&self, watchlist: Watchlist) -> Result<()> {
        self.lock()?
            .watchlists
            .insert(watchlist.id.clone(), watchlist);
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn insert_events(&self, events: &[CaseHistoryEvent]) -> Result<usize> {
        let mut inner = self.lock()?;
        let mut inserted = 0;
        for event in events {
            let key = Self::history_key(event);
            if inner.history_keys.insert(key) {
                inner.history.push(event.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn statistics_for(&self, case_number: &str) -> Result<Option<CaseStatistics>> {
        Ok(self.lock()?.statistics.get(case_number).cloned())
    }

    async fn save_statistics(&self, stats: CaseStatistics) -> Result<()> {
        self.lock()?
            .statistics
            .insert(stats.case_number.clone(), stats);
        Ok(())
    }
}

#[async_trait]
impl DeviceDirectory for MemoryStore {
    async fn device(&self, device_id: &str) -> Result<Option<Device>> {
        Ok(self.lock()?.devices.get(device_id).cloned())
    }
}

#[async_trait]
impl NotificationLedger for MemoryStore {
    async fn record(&self, entry: NotificationLog) -> Result<()> {
        self.lock()?.notifications.push(entry);
        Ok(())
    }
}
