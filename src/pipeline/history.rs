// src/pipeline/history.rs

//! Historian: durable per-court change events and per-case statistics.
//!
//! Both writes are idempotent: history rows dedup on their uniqueness
//! tuple in the store, and the statistics upsert is keyed by case
//! number inside the single-writer tick.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{CaseHistoryEvent, CaseStatistics, CaseStatus, Court};
use crate::storage::HistoryStore;

/// The fields whose change makes a court observation history-worthy.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CourtState {
    case_number: Option<String>,
    status: Option<CaseStatus>,
    queue_position: Option<u32>,
}

impl CourtState {
    fn of(court: &Court) -> Self {
        Self {
            case_number: court.case_number.clone(),
            status: court.case_status,
            queue_position: court.queue_position,
        }
    }
}

/// Counters from one history pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoryOutcome {
    pub events_written: usize,
    pub stats_upserts: usize,
}

/// Process-local change tracker feeding the durable history.
#[derive(Default)]
pub struct Historian {
    last_state: HashMap<String, CourtState>,
}

impl Historian {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one tick's observations.
    pub async fn record(
        &mut self,
        store: &dyn HistoryStore,
        courts: &[Court],
        now: DateTime<Utc>,
    ) -> Result<HistoryOutcome> {
        let mut events = Vec::new();
        for court in courts {
            if court.court_number.is_empty() {
                continue;
            }
            let state = CourtState::of(court);
            let changed = self
                .last_state
                .get(&court.court_number)
                .map(|previous| *previous != state)
                .unwrap_or(true);
            if changed {
                events.push(CaseHistoryEvent {
                    case_number: court.case_number.clone(),
                    status: court.case_status,
                    queue_position: court.queue_position,
                    court_number: court.court_number.clone(),
                    judge_name: court.judge_name.clone(),
                    scraped_at: court.scraped_at,
                });
                self.last_state.insert(court.court_number.clone(), state);
            }
        }

        // Unordered bulk write: duplicate-key rows are expected and
        // skipped by the store.
        let events_written = if events.is_empty() {
            0
        } else {
            store.insert_events(&events).await?
        };

        let mut stats_upserts = 0;
        for court in courts {
            let Some(case_number) = &court.case_number else {
                continue;
            };
            let mut stats = store
                .statistics_for(case_number)
                .await?
                .unwrap_or_else(|| CaseStatistics::first_observation(case_number.as_str(), now));
            stats.observe(court, now);
            store.save_statistics(stats).await?;
            stats_upserts += 1;
        }

        Ok(HistoryOutcome {
            events_written,
            stats_upserts,
        })
    }
}
