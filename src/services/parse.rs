// src/services/parse.rs

//! Display-board parser.
//!
//! Fuses the XHR rows with the page DOM: each row is matched to its
//! card by id (`dv_<courtcode>`) and normalized into a [`Court`].
//! Rows without a courtcode or without a matching card are dropped.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{BenchType, CaseFooter, Court};
use crate::services::fetch::BoardRow;
use crate::utils::{collapse_ws, resolve_against_origin, resolve_url, sha256_hex};

/// A parsed court plus the raw signature inputs the delta engine needs.
#[derive(Debug, Clone)]
pub struct ParsedCourt {
    pub court: Court,
    /// SHA-256 of the card's innerHTML
    pub html_hash: String,
    /// Whitespace-collapsed case footer, pre-derivation
    pub raw_footer: String,
}

/// Parser with selectors compiled once.
pub struct BoardParser {
    base: Url,
    card_sel: Selector,
    label_sel: Selector,
    judge_sel: Selector,
    judge_fallback_sel: Selector,
    anchor_sel: Selector,
    photo_sel: Selector,
    blink_sel: Selector,
    court_no_re: Regex,
    digits_re: Regex,
}

impl BoardParser {
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base: Url::parse(base_url)?,
            card_sel: parse_selector(r#"[id^="dv_"]"#)?,
            label_sel: parse_selector(r#"[id^="court_"]"#)?,
            judge_sel: parse_selector(".card-category b")?,
            judge_fallback_sel: parse_selector(".card-header, .card-title, .card-body")?,
            anchor_sel: parse_selector("a")?,
            photo_sel: parse_selector(".photoclass, img")?,
            blink_sel: parse_selector(".blink_me")?,
            court_no_re: Regex::new(r"(?i)^\s*court\s*no\.?\s*:?\s*")
                .map_err(|e| AppError::config(format!("court number pattern: {e}")))?,
            digits_re: Regex::new(r"\d+")
                .map_err(|e| AppError::config(format!("digits pattern: {e}")))?,
        })
    }

    /// Parse the tick's rows against the page document.
    pub fn parse(
        &self,
        rows: &[BoardRow],
        html: &str,
        scraped_at: DateTime<Utc>,
    ) -> Vec<ParsedCourt> {
        let document = Html::parse_document(html);

        // Index cards and court-number labels once per document.
        let mut cards: HashMap<String, ElementRef> = HashMap::new();
        for element in document.select(&self.card_sel) {
            if let Some(code) = element.value().attr("id").and_then(|id| id.strip_prefix("dv_")) {
                cards.insert(code.to_string(), element);
            }
        }
        let mut labels: HashMap<String, String> = HashMap::new();
        for element in document.select(&self.label_sel) {
            if let Some(code) = element
                .value()
                .attr("id")
                .and_then(|id| id.strip_prefix("court_"))
            {
                labels.insert(code.to_string(), element_text(&element));
            }
        }

        let mut courts = Vec::new();
        for row in rows {
            if row.courtcode.is_empty() {
                continue;
            }
            let Some(card) = cards.get(&row.courtcode) else {
                log::debug!("No card for courtcode {}; dropping row", row.courtcode);
                continue;
            };
            courts.push(self.parse_card(row, card, labels.get(&row.courtcode), scraped_at));
        }
        courts
    }

    fn parse_card(
        &self,
        row: &BoardRow,
        card: &ElementRef,
        label: Option<&String>,
        scraped_at: DateTime<Utc>,
    ) -> ParsedCourt {
        let judge_name = self.judge_name(card);
        let judge_photos = self.judge_photos(card);
        let bench_type = if judge_photos.len() >= 2 {
            BenchType::DivisionBench
        } else {
            BenchType::SingleBench
        };
        let judge_count = judge_photos.len().max(1);

        let court_number = label
            .map(|text| self.court_no_re.replace(text, "").trim().to_string())
            .unwrap_or_default();

        let stream_url = card
            .select(&self.anchor_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|href| !href.is_empty())
            .map(|href| resolve_against_origin(&self.base, href));

        let sr_no = Some(collapse_ws(&row.gsrno)).filter(|s| !s.is_empty());
        let queue_position = sr_no
            .as_deref()
            .and_then(|s| self.digits_re.find(s))
            .and_then(|m| m.as_str().parse::<u32>().ok());

        let raw_footer = collapse_ws(&row.caseinfo);
        let (case_status, case_number, case_type) = CaseFooter::parse(&raw_footer).derive();

        let is_live = card.select(&self.blink_sel).next().is_some();
        let is_active = is_live
            || matches!(
                case_status,
                Some(crate::models::CaseStatus::InSession) | Some(crate::models::CaseStatus::Recess)
            );

        let html_hash = sha256_hex(card.inner_html().as_bytes());

        ParsedCourt {
            court: Court {
                court_code: row.courtcode.clone(),
                court_number,
                judge_name,
                bench_type,
                judge_count,
                judge_photos,
                case_number,
                case_status,
                case_type,
                sr_no,
                queue_position,
                has_stream: stream_url.is_some(),
                stream_url,
                is_live,
                is_active,
                scraped_at,
            },
            html_hash,
            raw_footer,
        }
    }

    fn judge_name(&self, card: &ElementRef) -> String {
        let primary = card
            .select(&self.judge_sel)
            .next()
            .map(|e| element_text(&e))
            .filter(|t| !t.is_empty());
        let raw = primary.unwrap_or_else(|| {
            card.select(&self.judge_fallback_sel)
                .next()
                .map(|e| element_text(&e))
                .unwrap_or_default()
        });
        collapse_ws(&raw.replace("[Live]", ""))
    }

    fn judge_photos(&self, card: &ElementRef) -> Vec<String> {
        card.select(&self.photo_sel)
            .filter_map(|e| {
                e.value()
                    .attr("src")
                    .or_else(|| e.value().attr("data-src"))
            })
            .filter(|src| !src.is_empty())
            .map(|src| resolve_url(&self.base, src.trim_start_matches("./")))
            .collect()
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn element_text(element: &ElementRef) -> String {
    collapse_ws(&element.text().collect::<String>())
}
