// src/pipeline/delta.rs

//! Per-court change detection.
//!
//! Two independent change signals: a cheap in-memory signature
//! (card innerHTML hash, raw case footer, serial number) that decides
//! what gets dispatched this tick, and a canonical full-object hash in
//! the durable view that records the last real change.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Court, CourtRecord};
use crate::services::parse::ParsedCourt;
use crate::storage::CourtStore;

/// Consecutive absent ticks before a durable court stops being visible.
pub const VISIBILITY_MISS_THRESHOLD: u32 = 3;

/// Cheap change signature for one court.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaSignature {
    /// SHA-256 of the card's innerHTML
    pub html_hash: String,
    /// Raw case footer, pre-derivation
    pub case_footer: String,
    /// Cleaned serial-number text
    pub sr_no: String,
}

impl DeltaSignature {
    fn of(parsed: &ParsedCourt) -> Self {
        Self {
            html_hash: parsed.html_hash.clone(),
            case_footer: parsed.raw_footer.clone(),
            sr_no: parsed.court.sr_no.clone().unwrap_or_default(),
        }
    }
}

/// The tick's court set split into changed and unchanged.
#[derive(Debug, Default)]
pub struct DeltaOutcome {
    /// Every court parsed this tick
    pub all: Vec<Court>,
    /// Courts whose signature differs from the previous tick
    pub changed: Vec<Court>,
}

/// In-memory change detector, owned by the tick loop.
///
/// Only the signature map lives here; the last full observation per
/// court is already held durably in [`CourtRecord::data`].
#[derive(Default)]
pub struct DeltaEngine {
    last_signature: HashMap<String, DeltaSignature>,
}

impl DeltaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick's parsed courts into the signature map.
    ///
    /// Unchanged courts still refresh the map, so it always reflects
    /// the latest observation afterwards.
    pub fn apply(&mut self, parsed: Vec<ParsedCourt>) -> DeltaOutcome {
        let mut outcome = DeltaOutcome::default();

        for item in parsed {
            let signature = DeltaSignature::of(&item);
            let code = item.court.court_code.clone();

            let unchanged = self
                .last_signature
                .get(&code)
                .map(|previous| *previous == signature)
                .unwrap_or(false);

            if !unchanged {
                outcome.changed.push(item.court.clone());
            }
            self.last_signature.insert(code, signature);
            outcome.all.push(item.court);
        }

        outcome
    }
}

/// Counters from one durable-view sync.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecordSyncStats {
    /// Records whose canonical hash changed
    pub changed: usize,
    /// Records absent from this tick
    pub missing: usize,
    /// Records that crossed the visibility threshold this tick
    pub hidden: usize,
}

/// Reconcile the durable per-court view with this tick's observations.
///
/// Present courts refresh `checked_at` and reset the miss counter;
/// their `data_hash`/`changed_at` move only on a real change. Absent
/// courts accumulate misses and lose visibility at the threshold.
pub async fn sync_records(
    store: &dyn CourtStore,
    courts: &[Court],
    now: DateTime<Utc>,
) -> Result<RecordSyncStats> {
    let mut existing: HashMap<String, CourtRecord> = store
        .load_records()
        .await?
        .into_iter()
        .map(|r| (r.court_code.clone(), r))
        .collect();

    let mut stats = RecordSyncStats::default();

    for court in courts {
        let hash = court.data_hash();
        let record = match existing.remove(&court.court_code) {
            Some(mut record) => {
                if record.data_hash != hash {
                    record.data = court.clone();
                    record.data_hash = hash;
                    record.changed_at = now;
                    stats.changed += 1;
                }
                record.checked_at = now;
                record.missing_count = 0;
                record.is_visible = true;
                record
            }
            None => {
                stats.changed += 1;
                CourtRecord {
                    court_code: court.court_code.clone(),
                    data: court.clone(),
                    data_hash: hash,
                    checked_at: now,
                    changed_at: now,
                    missing_count: 0,
                    is_visible: true,
                }
            }
        };
        store.save_record(record).await?;
    }

    // Anything left was not on the board this tick.
    for (_, mut record) in existing {
        record.missing_count += 1;
        let was_visible = record.is_visible;
        record.is_visible = record.missing_count < VISIBILITY_MISS_THRESHOLD;
        if was_visible && !record.is_visible {
            stats.hidden += 1;
        }
        stats.missing += 1;
        store.save_record(record).await?;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BenchType, CaseStatus, CaseType};
    use crate::storage::{CourtStore, MemoryStore};

    fn parsed(code: &str, footer: &str, sr_no: Option<&str>, html_hash: &str) -> ParsedCourt {
        let (case_status, case_number, case_type) =
            crate::models::CaseFooter::parse(footer).derive();
        ParsedCourt {
            court: Court {
                court_code: code.to_string(),
                court_number: code.to_string(),
                judge_name: "J. A".to_string(),
                bench_type: BenchType::SingleBench,
                judge_count: 1,
                judge_photos: vec![],
                case_number,
                case_status,
                case_type,
                sr_no: sr_no.map(|s| s.to_string()),
                queue_position: None,
                stream_url: None,
                has_stream: false,
                is_live: false,
                is_active: false,
                scraped_at: Utc::now(),
            },
            html_hash: html_hash.to_string(),
            raw_footer: footer.to_string(),
        }
    }

    #[test]
    fn test_first_sight_is_a_change() {
        let mut engine = DeltaEngine::new();
        let outcome = engine.apply(vec![parsed("5", "C/1", Some("SR 1"), "h1")]);
        assert_eq!(outcome.changed.len(), 1);
        assert_eq!(outcome.all.len(), 1);
    }

    #[test]
    fn test_identical_signature_is_unchanged() {
        let mut engine = DeltaEngine::new();
        engine.apply(vec![parsed("5", "C/1", Some("SR 1"), "h1")]);
        let outcome = engine.apply(vec![parsed("5", "C/1", Some("SR 1"), "h1")]);
        assert!(outcome.changed.is_empty());
        assert_eq!(outcome.all.len(), 1);
    }

    #[test]
    fn test_any_signature_field_triggers_change() {
        let mut engine = DeltaEngine::new();
        engine.apply(vec![parsed("5", "C/1", Some("SR 1"), "h1")]);

        let html = engine.apply(vec![parsed("5", "C/1", Some("SR 1"), "h2")]);
        assert_eq!(html.changed.len(), 1);

        let footer = engine.apply(vec![parsed("5", "C/2", Some("SR 1"), "h2")]);
        assert_eq!(footer.changed.len(), 1);

        let sr = engine.apply(vec![parsed("5", "C/2", Some("SR 2"), "h2")]);
        assert_eq!(sr.changed.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_writes_changed_at_only_on_real_change() {
        let store = MemoryStore::new();
        let first = parsed("5", "C/1", Some("SR 1"), "h1").court;
        let t0 = Utc::now();
        sync_records(&store, &[first.clone()], t0).await.unwrap();
        let record = store.record("5").unwrap();
        assert_eq!(record.changed_at, t0);
        assert!(record.is_visible);

        // Same observation later: checked_at moves, changed_at does not.
        let t1 = t0 + chrono::Duration::seconds(30);
        let mut same = first.clone();
        same.scraped_at = t1;
        sync_records(&store, &[same], t1).await.unwrap();
        let record = store.record("5").unwrap();
        assert_eq!(record.changed_at, t0);
        assert_eq!(record.checked_at, t1);

        // Semantically different observation: changed_at moves.
        let t2 = t1 + chrono::Duration::seconds(30);
        let mut moved = first;
        moved.queue_position = Some(4);
        moved.scraped_at = t2;
        let stats = sync_records(&store, &[moved], t2).await.unwrap();
        assert_eq!(stats.changed, 1);
        assert_eq!(store.record("5").unwrap().changed_at, t2);
    }

    #[tokio::test]
    async fn test_visibility_needs_three_consecutive_misses() {
        let store = MemoryStore::new();
        let court = parsed("5", "C/1", Some("SR 1"), "h1").court;
        let now = Utc::now();
        sync_records(&store, &[court.clone()], now).await.unwrap();

        // Two absent ticks: still visible.
        sync_records(&store, &[], now).await.unwrap();
        sync_records(&store, &[], now).await.unwrap();
        let record = store.record("5").unwrap();
        assert_eq!(record.missing_count, 2);
        assert!(record.is_visible);

        // Third absent tick crosses the threshold.
        let stats = sync_records(&store, &[], now).await.unwrap();
        let record = store.record("5").unwrap();
        assert_eq!(record.missing_count, 3);
        assert!(!record.is_visible);
        assert_eq!(stats.hidden, 1);

        // Reappearance restores visibility and resets the counter.
        sync_records(&store, &[court], now).await.unwrap();
        let record = store.record("5").unwrap();
        assert_eq!(record.missing_count, 0);
        assert!(record.is_visible);
    }

    #[tokio::test]
    async fn test_touch_checked_skips_hidden_records() {
        let store = MemoryStore::new();
        let visible = parsed("5", "C/1", Some("SR 1"), "h1").court;
        let hidden = parsed("9", "C/2", Some("SR 2"), "h2").court;
        let t0 = Utc::now();
        sync_records(&store, &[visible.clone(), hidden], t0)
            .await
            .unwrap();
        for _ in 0..VISIBILITY_MISS_THRESHOLD {
            sync_records(&store, &[visible.clone()], t0).await.unwrap();
        }
        assert!(!store.record("9").unwrap().is_visible);

        // A 304 tick refreshes visible records only.
        let t1 = t0 + chrono::Duration::seconds(30);
        store.touch_checked(t1).await.unwrap();
        assert_eq!(store.record("5").unwrap().checked_at, t1);
        assert_eq!(store.record("9").unwrap().checked_at, t0);
    }

    #[tokio::test]
    async fn test_flicker_does_not_hide_court() {
        let store = MemoryStore::new();
        let court = parsed("5", "C/1", Some("SR 1"), "h1").court;
        let now = Utc::now();
        for _ in 0..3 {
            sync_records(&store, &[court.clone()], now).await.unwrap();
            sync_records(&store, &[], now).await.unwrap();
        }
        assert!(store.record("5").unwrap().is_visible);
    }

    #[test]
    fn test_recess_footer_derivation_survives_delta() {
        let mut engine = DeltaEngine::new();
        let outcome = engine.apply(vec![parsed("5", "C/1 (RECESS)", None, "h1")]);
        assert_eq!(
            outcome.all[0].case_status,
            Some(CaseStatus::Recess)
        );
        assert_eq!(outcome.all[0].case_type, Some(CaseType::Recess));
    }
}
