// src/models/watchlist.rs

//! Watchlist entities and alert types.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Watch states a case moves through as its hearing nears.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchState {
    Far,
    Near,
    VeryNear,
    Next,
    InSession,
    Completed,
}

/// Alert categories, each gated by a matching user setting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    EarlyWarning,
    Approaching,
    InSession,
    Completed,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::EarlyWarning => "early_warning",
            AlertType::Approaching => "approaching",
            AlertType::InSession => "in_session",
            AlertType::Completed => "completed",
        }
    }
}

/// Per-watchlist notification toggles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub early_warning: bool,
    pub approaching: bool,
    pub in_session: bool,
    pub completed: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            early_warning: true,
            approaching: true,
            in_session: true,
            completed: true,
        }
    }
}

impl NotificationSettings {
    /// Whether the setting gating the given alert type is enabled.
    pub fn allows(&self, alert: AlertType) -> bool {
        match alert {
            AlertType::EarlyWarning => self.early_warning,
            AlertType::Approaching => self.approaching,
            AlertType::InSession => self.in_session,
            AlertType::Completed => self.completed,
        }
    }
}

/// A device's subscription to a single case number.
///
/// Created on subscribe; the state fields are mutated only by the
/// watchlist processor; deactivated by user action.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watchlist {
    pub id: String,
    pub device_id: String,
    pub case_number: String,
    #[serde(default)]
    pub notification_settings: NotificationSettings,
    pub is_active: bool,

    // State fields owned by the processor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_status: Option<WatchState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_court: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen_position: Option<u32>,
    #[serde(default)]
    pub miss_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_notification_time: Option<DateTime<Utc>>,
}

impl Watchlist {
    /// A fresh subscription with default settings and no state.
    pub fn new(id: impl Into<String>, device_id: impl Into<String>, case_number: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            device_id: device_id.into(),
            case_number: case_number.into(),
            notification_settings: NotificationSettings::default(),
            is_active: true,
            last_seen_status: None,
            last_seen_court: None,
            last_seen_position: None,
            miss_count: 0,
            last_notification_time: None,
        }
    }
}

/// Detail payload attached to an alert.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(default)]
    pub velocity: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
}

/// An alert emitted by the watchlist processor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub alert_type: AlertType,
    pub watchlist_id: String,
    pub device_id: String,
    pub case_number: String,
    pub details: AlertDetails,
}

impl Alert {
    /// Flat string map handed to the push gateway alongside the message.
    pub fn data_map(&self) -> HashMap<String, String> {
        let mut data = HashMap::new();
        data.insert("type".to_string(), self.alert_type.as_str().to_string());
        data.insert("caseNumber".to_string(), self.case_number.clone());
        if let Some(court) = &self.details.court_number {
            data.insert("courtNumber".to_string(), court.clone());
        }
        if let Some(position) = self.details.position {
            data.insert("position".to_string(), position.to_string());
            data.insert("velocity".to_string(), self.details.velocity.to_string());
        }
        data
    }
}
