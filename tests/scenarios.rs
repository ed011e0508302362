//! End-to-end tick scenarios over a scripted board source and the
//! in-memory stores.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use courtwatch::error::{AppError, Result};
use courtwatch::models::{DeltaBroadcast, Device, WatchState, Watchlist};
use courtwatch::pipeline::{TickRunner, TickServices};
use courtwatch::services::dispatch::{Broadcaster, PushGateway, PushMessage};
use courtwatch::services::fetch::{BoardRow, BoardSource, FetchOutcome};
use courtwatch::services::BoardParser;
use courtwatch::storage::MemoryStore;

const BASE: &str = "https://court.example.gov/display/board.html";

/// Feeds pre-scripted fetch outcomes to the tick runner.
struct ScriptedSource {
    script: VecDeque<Result<FetchOutcome>>,
}

impl ScriptedSource {
    fn new(script: Vec<Result<FetchOutcome>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait]
impl BoardSource for ScriptedSource {
    async fn fetch(&mut self) -> Result<FetchOutcome> {
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(AppError::fetch("script", "script exhausted")))
    }
}

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<(PushMessage, HashMap<String, String>)>>,
}

impl RecordingGateway {
    fn sent(&self) -> Vec<(PushMessage, HashMap<String, String>)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(
        &self,
        _token: &str,
        message: &PushMessage,
        data: &HashMap<String, String>,
    ) -> Result<()> {
        self.sent.lock().unwrap().push((message.clone(), data.clone()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingBroadcaster {
    deltas: Mutex<Vec<DeltaBroadcast>>,
}

impl RecordingBroadcaster {
    fn count(&self) -> usize {
        self.deltas.lock().unwrap().len()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, delta: &DeltaBroadcast) -> Result<()> {
        self.deltas.lock().unwrap().push(delta.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<RecordingGateway>,
    broadcaster: Arc<RecordingBroadcaster>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            gateway: Arc::new(RecordingGateway::default()),
            broadcaster: Arc::new(RecordingBroadcaster::default()),
        }
    }

    fn runner(&self, script: Vec<Result<FetchOutcome>>) -> TickRunner {
        let services = TickServices {
            courts: self.store.clone(),
            watchlists: self.store.clone(),
            history: self.store.clone(),
            devices: self.store.clone(),
            ledger: self.store.clone(),
            gateway: self.gateway.clone(),
            broadcaster: self.broadcaster.clone(),
        };
        TickRunner::new(
            Box::new(ScriptedSource::new(script)),
            BoardParser::new(BASE).unwrap(),
            services,
        )
    }

    fn watch(&self, id: &str, case: &str) -> Watchlist {
        self.store.put_device(Device {
            device_id: "d1".to_string(),
            push_token: "token-1".to_string(),
            is_active: true,
        });
        Watchlist::new(id, "d1", case)
    }
}

/// One card per (courtcode, court number label, judge).
fn board_html(cards: &[(&str, &str, &str)]) -> String {
    let mut html = String::from("<html><body>");
    for (code, number, judge) in cards {
        html.push_str(&format!(
            r#"<span id="court_{code}">COURT NO: {number}</span>
               <div id="dv_{code}" class="card">
                 <div class="card-category"><b>{judge}</b></div>
                 <a href="/stream/{code}">Watch</a>
                 <img class="photoclass" src="./photos/{code}.jpg">
               </div>"#
        ));
    }
    html.push_str("</body></html>");
    html
}

fn row(code: &str, caseinfo: &str, gsrno: &str) -> BoardRow {
    BoardRow {
        courtcode: code.to_string(),
        caseinfo: caseinfo.to_string(),
        gsrno: gsrno.to_string(),
    }
}

fn fresh(rows: Vec<BoardRow>, html: String) -> Result<FetchOutcome> {
    Ok(FetchOutcome::Fresh { rows, html })
}

// S1: cold first tick parses the court, writes one history row, and
// sends no alerts.
#[tokio::test]
async fn cold_first_tick() {
    let harness = Harness::new();
    let html = board_html(&[("5", "5", "J. A")]);
    let mut runner = harness.runner(vec![fresh(
        vec![row("5", "SCA/1/2024", "SR 7")],
        html,
    )]);

    let report = runner.run_tick().await.unwrap();
    let stats = report.stats().expect("completed tick");
    assert_eq!(stats.parsed_courts, 1);
    assert_eq!(stats.changed_courts, 1);
    assert_eq!(stats.history_rows, 1);
    assert_eq!(stats.alerts_sent, 0);

    let record = harness.store.record("5").expect("durable record");
    assert_eq!(record.data.queue_position, Some(7));
    assert_eq!(record.data.case_number.as_deref(), Some("SCA/1/2024"));
    assert_eq!(
        record.data.case_status,
        Some(courtwatch::models::CaseStatus::InSession)
    );
    assert_eq!(record.data.judge_name, "J. A");
    assert!(record.is_visible);

    assert_eq!(harness.store.history_len(), 1);
    assert!(harness.gateway.sent().is_empty());
    assert_eq!(harness.broadcaster.count(), 1);
}

// S2: a 304 short-circuits the tick: no history, no broadcast.
#[tokio::test]
async fn not_modified_short_circuits() {
    let harness = Harness::new();
    let html = board_html(&[("5", "5", "J. A")]);
    let mut runner = harness.runner(vec![
        fresh(vec![row("5", "SCA/1/2024", "SR 7")], html),
        Ok(FetchOutcome::NotModified),
    ]);

    runner.run_tick().await.unwrap();
    let broadcasts_before = harness.broadcaster.count();
    let history_before = harness.store.history_len();

    let report = runner.run_tick().await.unwrap();
    assert!(report.is_skipped());
    assert_eq!(harness.store.history_len(), history_before);
    assert_eq!(harness.broadcaster.count(), broadcasts_before);
}

// Replaying an identical board produces no new history rows and no
// broadcast (idempotent history + empty delta).
#[tokio::test]
async fn identical_board_replay_is_idempotent() {
    let harness = Harness::new();
    let html = board_html(&[("5", "5", "J. A")]);
    let rows = vec![row("5", "SCA/1/2024", "SR 7")];
    let mut runner = harness.runner(vec![
        fresh(rows.clone(), html.clone()),
        fresh(rows, html),
    ]);

    runner.run_tick().await.unwrap();
    let report = runner.run_tick().await.unwrap();
    let stats = report.stats().unwrap();
    assert_eq!(stats.changed_courts, 0);
    assert_eq!(stats.history_rows, 0);
    assert_eq!(harness.store.history_len(), 1);
    assert_eq!(harness.broadcaster.count(), 1);
}

// S3: a watched case jumping from position 12 to 2 emits an
// approaching alert carrying position and velocity.
#[tokio::test]
async fn state_transition_emits_alert_with_velocity() {
    let harness = Harness::new();
    let mut watchlist = harness.watch("w1", "SCA/1/2024");
    watchlist.last_seen_status = Some(WatchState::Far);
    watchlist.last_seen_position = Some(12);
    harness.store.put_watchlist(watchlist);

    // Another pending case sits at serial 1, the watched case at 2.
    let html = board_html(&[("4", "5", "J. A"), ("5", "5", "J. A")]);
    let mut runner = harness.runner(vec![fresh(
        vec![row("4", "OTH/9/2024", "SR 1"), row("5", "SCA/1/2024", "SR 2")],
        html,
    )]);

    let report = runner.run_tick().await.unwrap();
    assert_eq!(report.stats().unwrap().alerts_sent, 1);

    let sent = harness.gateway.sent();
    assert_eq!(sent.len(), 1);
    let (message, data) = &sent[0];
    assert_eq!(message.title, "🔔 Case Next - SCA/1/2024");
    assert_eq!(data.get("position").map(String::as_str), Some("2"));
    assert_eq!(data.get("velocity").map(String::as_str), Some("10"));

    let saved = harness.store.watchlist("w1").unwrap();
    assert_eq!(saved.last_seen_status, Some(WatchState::VeryNear));
    assert_eq!(saved.last_seen_position, Some(2));
}

// S4: completion is detected only after two consecutive absent ticks.
#[tokio::test]
async fn completion_by_absence() {
    let harness = Harness::new();
    let mut watchlist = harness.watch("w1", "SCA/1/2024");
    watchlist.last_seen_status = Some(WatchState::InSession);
    watchlist.last_seen_court = Some("5".to_string());
    harness.store.put_watchlist(watchlist);

    let empty = board_html(&[("9", "9", "K. B")]);
    let mut runner = harness.runner(vec![
        fresh(vec![row("9", "-", "")], empty.clone()),
        fresh(vec![row("9", "-", "")], empty),
    ]);

    // Tick 1: counted, no alert yet.
    let report = runner.run_tick().await.unwrap();
    assert_eq!(report.stats().unwrap().alerts_sent, 0);
    let saved = harness.store.watchlist("w1").unwrap();
    assert_eq!(saved.miss_count, 1);
    assert_ne!(saved.last_seen_status, Some(WatchState::Completed));

    // Tick 2: completed alert fires.
    let report = runner.run_tick().await.unwrap();
    assert_eq!(report.stats().unwrap().alerts_sent, 1);
    let saved = harness.store.watchlist("w1").unwrap();
    assert_eq!(saved.miss_count, 2);
    assert_eq!(saved.last_seen_status, Some(WatchState::Completed));

    let sent = harness.gateway.sent();
    assert_eq!(sent[0].0.title, "✅ Case Completed - SCA/1/2024");
    assert_eq!(sent[0].0.body, "Your case hearing has ended in Court 5");
}

// S5: a transition inside the cooldown window is suppressed but
// bookkeeping still advances.
#[tokio::test]
async fn cooldown_suppresses_alert() {
    let harness = Harness::new();
    let mut watchlist = harness.watch("w1", "SCA/1/2024");
    watchlist.last_seen_status = Some(WatchState::Near);
    watchlist.last_seen_position = Some(8);
    watchlist.last_notification_time = Some(Utc::now() - Duration::minutes(2));
    harness.store.put_watchlist(watchlist);

    let html = board_html(&[("4", "5", "J. A"), ("5", "5", "J. A")]);
    let mut runner = harness.runner(vec![fresh(
        vec![row("4", "OTH/9/2024", "SR 1"), row("5", "SCA/1/2024", "SR 2")],
        html,
    )]);

    let report = runner.run_tick().await.unwrap();
    assert_eq!(report.stats().unwrap().alerts_sent, 0);
    assert!(harness.gateway.sent().is_empty());

    let saved = harness.store.watchlist("w1").unwrap();
    assert_eq!(saved.last_seen_status, Some(WatchState::Near));
    assert_eq!(saved.last_seen_position, Some(2));
}

// Fetch failures propagate out of the tick so the scheduler can back
// off.
#[tokio::test]
async fn fetch_failure_propagates() {
    let harness = Harness::new();
    let mut runner = harness.runner(vec![Err(AppError::UpstreamStatus {
        status: 502,
        url: "https://court.example.gov/display/data".to_string(),
    })]);

    let result = runner.run_tick().await;
    assert!(matches!(
        result,
        Err(AppError::UpstreamStatus { status: 502, .. })
    ));
}

// A court that disappears and returns within two ticks never triggers
// a completed alert (watchlist hysteresis).
#[tokio::test]
async fn flicker_never_completes_watchlist() {
    let harness = Harness::new();
    let mut watchlist = harness.watch("w1", "SCA/1/2024");
    watchlist.last_seen_status = Some(WatchState::Near);
    harness.store.put_watchlist(watchlist);

    let with_case = board_html(&[("5", "5", "J. A")]);
    let without = board_html(&[("9", "9", "K. B")]);
    let mut runner = harness.runner(vec![
        fresh(vec![row("5", "SCA/1/2024", "SR 5")], with_case.clone()),
        fresh(vec![row("9", "-", "")], without.clone()),
        fresh(vec![row("5", "SCA/1/2024", "SR 5")], with_case),
        fresh(vec![row("9", "-", "")], without),
    ]);

    for _ in 0..4 {
        runner.run_tick().await.unwrap();
        let saved = harness.store.watchlist("w1").unwrap();
        assert_ne!(saved.last_seen_status, Some(WatchState::Completed));
    }
}
