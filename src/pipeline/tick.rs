// src/pipeline/tick.rs

//! One full ingest-and-dispatch tick.
//!
//! Fetch → parse → delta → (durable sync ‖ history) → queues →
//! watchlists → broadcast. Everything runs serially inside the tick;
//! ticks themselves never overlap.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{DeltaBroadcast, TickReport, TickStats};
use crate::pipeline::delta::{sync_records, DeltaEngine};
use crate::pipeline::history::Historian;
use crate::services::dispatch::{Broadcaster, PushGateway};
use crate::services::fetch::{BoardSource, FetchOutcome};
use crate::services::parse::BoardParser;
use crate::services::queue::build_queues;
use crate::services::watchlist::WatchlistProcessor;
use crate::storage::{
    CourtStore, DeviceDirectory, HistoryStore, NotificationLedger, WatchlistStore,
};

/// Shared handles to the stores and outbound capabilities.
#[derive(Clone)]
pub struct TickServices {
    pub courts: Arc<dyn CourtStore>,
    pub watchlists: Arc<dyn WatchlistStore>,
    pub history: Arc<dyn HistoryStore>,
    pub devices: Arc<dyn DeviceDirectory>,
    pub ledger: Arc<dyn NotificationLedger>,
    pub gateway: Arc<dyn PushGateway>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

/// Owns the per-process caches and drives one tick at a time.
pub struct TickRunner {
    source: Box<dyn BoardSource>,
    parser: BoardParser,
    delta: DeltaEngine,
    historian: Historian,
    services: TickServices,
}

impl TickRunner {
    pub fn new(source: Box<dyn BoardSource>, parser: BoardParser, services: TickServices) -> Self {
        Self {
            source,
            parser,
            delta: DeltaEngine::new(),
            historian: Historian::new(),
            services,
        }
    }

    /// Run the pipeline once.
    pub async fn run_tick(&mut self) -> Result<TickReport> {
        let started = Utc::now();

        let (rows, html) = match self.source.fetch().await? {
            FetchOutcome::NotModified => {
                log::debug!("Upstream not modified; skipping tick");
                self.services.courts.touch_checked(started).await?;
                return Ok(TickReport::Skipped);
            }
            FetchOutcome::Fresh { rows, html } => (rows, html),
        };

        let parsed = self.parser.parse(&rows, &html, started);
        let outcome = self.delta.apply(parsed);

        let sync = sync_records(self.services.courts.as_ref(), &outcome.all, started).await?;
        let history = self
            .historian
            .record(self.services.history.as_ref(), &outcome.all, started)
            .await?;

        let queues = build_queues(&outcome.all);
        let processor = WatchlistProcessor::new(
            self.services.watchlists.as_ref(),
            self.services.devices.as_ref(),
            self.services.ledger.as_ref(),
            self.services.gateway.as_ref(),
        );
        let watch = processor.process_all(&outcome.all, &queues, started).await?;

        if !outcome.changed.is_empty() {
            let delta = DeltaBroadcast::new(outcome.changed.clone(), started);
            // A broadcast failure degrades the live channel only; the
            // tick itself already succeeded.
            if let Err(e) = self.services.broadcaster.broadcast(&delta).await {
                log::warn!("broadcast failed: {e}");
            }
        }

        let stats = TickStats {
            parsed_courts: outcome.all.len(),
            changed_courts: outcome.changed.len(),
            missing_courts: sync.missing,
            history_rows: history.events_written,
            stats_upserts: history.stats_upserts,
            watchlists_processed: watch.processed,
            alerts_sent: watch.alerts_sent,
        };
        log::info!(
            "tick: {} courts ({} changed, {} missing), {} history rows, {} alerts",
            stats.parsed_courts,
            stats.changed_courts,
            stats.missing_courts,
            stats.history_rows,
            stats.alerts_sent
        );

        Ok(TickReport::Completed(stats))
    }
}
