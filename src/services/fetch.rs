// src/services/fetch.rs

//! Upstream fetch cycle.
//!
//! Each tick performs up to two GETs: the JSON XHR endpoint with
//! conditional-request headers, then (on a 200) the display-board page.
//! A 304 short-circuits the whole tick.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::UpstreamConfig;

/// One row of the XHR payload.
///
/// Fields default so partial rows survive decoding; the parser drops
/// rows without a `courtcode`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoardRow {
    #[serde(default)]
    pub courtcode: String,
    #[serde(default)]
    pub caseinfo: String,
    #[serde(default)]
    pub gsrno: String,
}

/// Result of one fetch cycle.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Upstream answered 304; the board is unchanged.
    NotModified,
    /// Fresh payload: XHR rows plus the page HTML.
    Fresh { rows: Vec<BoardRow>, html: String },
}

/// Source of display-board data, one fetch per tick.
#[async_trait]
pub trait BoardSource: Send + Sync {
    async fn fetch(&mut self) -> Result<FetchOutcome>;
}

/// HTTP implementation holding the conditional-request state.
pub struct HttpBoardSource {
    client: reqwest::Client,
    base_url: String,
    xhr_url: String,
    last_etag: Option<String>,
    last_modified: Option<String>,
}

impl HttpBoardSource {
    /// Build a source with a configured client.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            xhr_url: config.xhr_url.clone(),
            last_etag: None,
            last_modified: None,
        })
    }
}

#[async_trait]
impl BoardSource for HttpBoardSource {
    async fn fetch(&mut self) -> Result<FetchOutcome> {
        let mut request = self.client.get(&self.xhr_url);
        if let Some(etag) = &self.last_etag {
            request = request.header(IF_NONE_MATCH, etag.as_str());
        }
        if let Some(modified) = &self.last_modified {
            request = request.header(IF_MODIFIED_SINCE, modified.as_str());
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::NOT_MODIFIED => return Ok(FetchOutcome::NotModified),
            StatusCode::OK => {}
            status => {
                return Err(AppError::UpstreamStatus {
                    status: status.as_u16(),
                    url: self.xhr_url.clone(),
                })
            }
        }

        // Remember the validators for the next tick.
        self.last_etag = header_string(&response, ETAG);
        self.last_modified = header_string(&response, LAST_MODIFIED);

        let body = response.text().await?;
        let rows = decode_rows(&body)?;

        let page = self.client.get(&self.base_url).send().await?;
        if !page.status().is_success() {
            return Err(AppError::UpstreamStatus {
                status: page.status().as_u16(),
                url: self.base_url.clone(),
            });
        }
        let html = page.text().await?;

        Ok(FetchOutcome::Fresh { rows, html })
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Decode the XHR payload leniently.
///
/// The endpoint returns either a JSON array, or a JSON string that
/// itself contains the array. An empty string means no rows.
pub fn decode_rows(body: &str) -> Result<Vec<BoardRow>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| AppError::fetch("XHR payload", e))?;
    let array = match value {
        serde_json::Value::String(inner) => {
            if inner.trim().is_empty() {
                return Ok(Vec::new());
            }
            serde_json::from_str(&inner).map_err(|e| AppError::fetch("nested XHR payload", e))?
        }
        other => other,
    };
    serde_json::from_value(array).map_err(|e| AppError::fetch("XHR rows", e))
}
