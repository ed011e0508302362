// src/services/watchlist.rs

//! Per-watchlist state machine.
//!
//! Runs once per tick over every active watchlist, deciding when a
//! watched case has moved close enough (or disappeared for long
//! enough) to warrant a push alert.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::{
    Alert, AlertDetails, AlertType, CaseStatus, Court, NotificationLog, WatchState, Watchlist,
};
use crate::services::dispatch::{alert_message, PushGateway};
use crate::services::queue::CourtQueue;
use crate::storage::{DeviceDirectory, NotificationLedger, WatchlistStore};

/// Minimum gap between two alerts on the same watchlist.
pub const COOLDOWN_SECS: i64 = 5 * 60;

/// Consecutive absent ticks before a case counts as completed.
pub const COMPLETION_MISS_THRESHOLD: u32 = 2;

/// Whether enough time has passed since the last alert.
pub fn cooldown_passed(last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last {
        Some(at) => now - at >= Duration::seconds(COOLDOWN_SECS),
        None => true,
    }
}

/// Derive the watch state and alert type for a found case.
///
/// An in-session case always maps to `IN_SESSION` regardless of any
/// queue position.
pub fn derive_state(court: &Court, position: Option<u32>) -> Option<(WatchState, AlertType)> {
    if court.case_status == Some(CaseStatus::InSession) {
        return Some((WatchState::InSession, AlertType::InSession));
    }
    match position {
        Some(1) => Some((WatchState::Next, AlertType::Approaching)),
        Some(p) if p <= 3 => Some((WatchState::VeryNear, AlertType::Approaching)),
        Some(p) if p <= 10 => Some((WatchState::Near, AlertType::EarlyWarning)),
        Some(_) => Some((WatchState::Far, AlertType::EarlyWarning)),
        None => None,
    }
}

/// Processes every active watchlist against one tick's court set.
pub struct WatchlistProcessor<'a> {
    watchlists: &'a dyn WatchlistStore,
    devices: &'a dyn DeviceDirectory,
    ledger: &'a dyn NotificationLedger,
    gateway: &'a dyn PushGateway,
}

/// Counts from one watchlist pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct WatchlistOutcome {
    pub processed: usize,
    pub alerts_sent: usize,
}

impl<'a> WatchlistProcessor<'a> {
    pub fn new(
        watchlists: &'a dyn WatchlistStore,
        devices: &'a dyn DeviceDirectory,
        ledger: &'a dyn NotificationLedger,
        gateway: &'a dyn PushGateway,
    ) -> Self {
        Self {
            watchlists,
            devices,
            ledger,
            gateway,
        }
    }

    /// Process all active watchlists sequentially.
    ///
    /// A failure in one watchlist is logged and does not stop the
    /// others.
    pub async fn process_all(
        &self,
        courts: &[Court],
        queues: &HashMap<String, CourtQueue>,
        now: DateTime<Utc>,
    ) -> Result<WatchlistOutcome> {
        let by_case: HashMap<&str, &Court> = courts
            .iter()
            .filter_map(|c| c.case_number.as_deref().map(|n| (n, c)))
            .collect();

        let mut outcome = WatchlistOutcome::default();
        for mut watchlist in self.watchlists.active_watchlists().await? {
            let id = watchlist.id.clone();
            match self.process_one(&mut watchlist, &by_case, queues, now).await {
                Ok(sent) => {
                    outcome.processed += 1;
                    if sent {
                        outcome.alerts_sent += 1;
                    }
                }
                Err(e) => log::warn!("watchlist {id}: {e}"),
            }
        }
        Ok(outcome)
    }

    async fn process_one(
        &self,
        watchlist: &mut Watchlist,
        by_case: &HashMap<&str, &Court>,
        queues: &HashMap<String, CourtQueue>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let mut sent = false;
        match by_case.get(watchlist.case_number.as_str()) {
            None => {
                watchlist.miss_count += 1;
                let due = watchlist.miss_count >= COMPLETION_MISS_THRESHOLD
                    && watchlist.last_seen_status != Some(WatchState::Completed)
                    && watchlist.notification_settings.completed
                    && cooldown_passed(watchlist.last_notification_time, now);
                if due {
                    let alert = Alert {
                        alert_type: AlertType::Completed,
                        watchlist_id: watchlist.id.clone(),
                        device_id: watchlist.device_id.clone(),
                        case_number: watchlist.case_number.clone(),
                        details: AlertDetails {
                            court_number: watchlist.last_seen_court.clone(),
                            ..AlertDetails::default()
                        },
                    };
                    if self.emit(watchlist, &alert, now).await? {
                        watchlist.last_seen_status = Some(WatchState::Completed);
                        watchlist.last_notification_time = Some(now);
                        sent = true;
                    }
                }
            }
            Some(court) => {
                watchlist.miss_count = 0;

                let position = queues
                    .get(&court.court_number)
                    .and_then(|q| q.position_of(&watchlist.case_number));
                let velocity = match (watchlist.last_seen_position, position) {
                    (Some(previous), Some(current)) => previous as i64 - current as i64,
                    _ => 0,
                };

                if let Some((state, alert_type)) = derive_state(court, position) {
                    let due = watchlist.last_seen_status != Some(state)
                        && watchlist.notification_settings.allows(alert_type)
                        && cooldown_passed(watchlist.last_notification_time, now);
                    if due {
                        let alert = Alert {
                            alert_type,
                            watchlist_id: watchlist.id.clone(),
                            device_id: watchlist.device_id.clone(),
                            case_number: watchlist.case_number.clone(),
                            details: AlertDetails {
                                court_number: Some(court.court_number.clone()),
                                judge_name: Some(court.judge_name.clone()),
                                position,
                                velocity,
                                stream_url: court.stream_url.clone(),
                            },
                        };
                        if self.emit(watchlist, &alert, now).await? {
                            watchlist.last_seen_status = Some(state);
                            watchlist.last_notification_time = Some(now);
                            sent = true;
                        }
                    }
                }

                watchlist.last_seen_position = position;
                watchlist.last_seen_court = Some(court.court_number.clone());
            }
        }

        self.watchlists.save_watchlist(watchlist.clone()).await?;
        Ok(sent)
    }

    /// Send one alert and record it in the ledger.
    ///
    /// Returns whether the send succeeded; a failed send leaves the
    /// watchlist's status fields alone so the alert retries later.
    async fn emit(&self, watchlist: &Watchlist, alert: &Alert, now: DateTime<Utc>) -> Result<bool> {
        let token = self
            .devices
            .device(&watchlist.device_id)
            .await?
            .filter(|d| d.is_active)
            .map(|d| d.push_token);

        let success = match token {
            Some(token) => {
                let message = alert_message(alert);
                match self.gateway.send(&token, &message, &alert.data_map()).await {
                    Ok(()) => true,
                    Err(e) => {
                        log::warn!(
                            "push send failed for watchlist {} ({}): {e}",
                            watchlist.id,
                            alert.alert_type.as_str()
                        );
                        false
                    }
                }
            }
            None => {
                log::warn!(
                    "no active device {} for watchlist {}",
                    watchlist.device_id,
                    watchlist.id
                );
                false
            }
        };

        self.ledger
            .record(NotificationLog {
                device_id: watchlist.device_id.clone(),
                case_number: alert.case_number.clone(),
                notification_type: alert.alert_type.as_str().to_string(),
                court_number: alert.details.court_number.clone().unwrap_or_default(),
                success,
                sent_at: now,
            })
            .await?;

        Ok(success)
    }
}
