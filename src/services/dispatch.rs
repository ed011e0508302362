// src/services/dispatch.rs

//! Outbound capabilities: push gateway and client broadcast.
//!
//! The real FCM SDK and the WebSocket transport are external
//! collaborators; the core talks to them through these traits. The
//! logging implementations here are the default wiring for local runs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Alert, AlertType, DeltaBroadcast};

/// Title/body pair for one push notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
}

/// Push-notification gateway capability.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(
        &self,
        token: &str,
        message: &PushMessage,
        data: &HashMap<String, String>,
    ) -> Result<()>;
}

/// Real-time broadcast capability for connected clients.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, delta: &DeltaBroadcast) -> Result<()>;
}

/// Build the push copy for an alert.
pub fn alert_message(alert: &Alert) -> PushMessage {
    let case = &alert.case_number;
    let court = alert.details.court_number.as_deref().unwrap_or("");
    match alert.alert_type {
        AlertType::EarlyWarning => PushMessage {
            title: format!("⚠️ Case Approaching - {case}"),
            body: format!(
                "Your case is {} cases away in Court {court}",
                alert
                    .details
                    .position
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "?".to_string())
            ),
        },
        AlertType::Approaching => PushMessage {
            title: format!("🔔 Case Next - {case}"),
            body: format!("Your case is next in line in Court {court}"),
        },
        AlertType::InSession => {
            let mut body = format!("Your case is now IN SESSION in Court {court}");
            if let Some(judge) = alert.details.judge_name.as_deref().filter(|j| !j.is_empty()) {
                body.push_str(&format!(" - {judge}"));
            }
            PushMessage {
                title: format!("⚖️ Case Started - {case}"),
                body,
            }
        }
        AlertType::Completed => PushMessage {
            title: format!("✅ Case Completed - {case}"),
            body: format!("Your case hearing has ended in Court {court}"),
        },
    }
}

/// Gateway that only logs. Used when no push credentials are wired.
#[derive(Debug, Default)]
pub struct LoggingGateway;

#[async_trait]
impl PushGateway for LoggingGateway {
    async fn send(
        &self,
        token: &str,
        message: &PushMessage,
        _data: &HashMap<String, String>,
    ) -> Result<()> {
        log::info!(
            "push [{}…]: {} / {}",
            &token[..token.len().min(8)],
            message.title,
            message.body
        );
        Ok(())
    }
}

/// Broadcaster that only logs the delta size.
#[derive(Debug, Default)]
pub struct LoggingBroadcaster;

#[async_trait]
impl Broadcaster for LoggingBroadcaster {
    async fn broadcast(&self, delta: &DeltaBroadcast) -> Result<()> {
        log::info!("broadcast {}: {} courts", delta.kind, delta.courts.len());
        Ok(())
    }
}
