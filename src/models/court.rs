// src/models/court.rs

//! Court entity and case-footer parsing.
//!
//! A `Court` is transient: the full set is regenerated from the display
//! board on every tick. Durable state derived from it lives in
//! [`crate::models::records`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::{collapse_ws, sha256_hex};

/// Case status as shown on the display board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaseStatus {
    InSession,
    Recess,
    SittingOver,
}

impl CaseStatus {
    /// Statuses that take a case out of the pending queue.
    pub fn is_terminal_for_queue(&self) -> bool {
        matches!(self, CaseStatus::InSession | CaseStatus::SittingOver)
    }
}

/// Coarse activity classification derived from the case footer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseType {
    Active,
    Recess,
    SittingOver,
}

/// Bench composition, inferred from the number of judge photos.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BenchType {
    SingleBench,
    DivisionBench,
}

/// The case footer of a court card, parsed once into a tagged variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseFooter {
    /// The court has finished sitting for the day.
    SittingOver,
    /// The named case is paused for recess.
    Recess(String),
    /// The named case is being heard.
    InSession(String),
    /// No case information on the card.
    Empty,
}

impl CaseFooter {
    /// Parse a raw `caseinfo` string.
    ///
    /// Whitespace is collapsed first; the SITTING OVER marker matches
    /// case-insensitively, the `(RECESS)` marker literally.
    pub fn parse(raw: &str) -> Self {
        let footer = collapse_ws(raw);
        if footer.to_uppercase().contains("COURT SITTING OVER") {
            return CaseFooter::SittingOver;
        }
        if footer.contains("(RECESS)") {
            let number = collapse_ws(&footer.replace("(RECESS)", ""));
            return CaseFooter::Recess(number);
        }
        if !footer.is_empty() && footer != "-" {
            return CaseFooter::InSession(footer);
        }
        CaseFooter::Empty
    }

    /// Derive `(case_status, case_number, case_type)` from the variant.
    pub fn derive(&self) -> (Option<CaseStatus>, Option<String>, Option<CaseType>) {
        match self {
            CaseFooter::SittingOver => {
                (Some(CaseStatus::SittingOver), None, Some(CaseType::SittingOver))
            }
            CaseFooter::Recess(number) => (
                Some(CaseStatus::Recess),
                Some(number.clone()),
                Some(CaseType::Recess),
            ),
            CaseFooter::InSession(number) => (
                Some(CaseStatus::InSession),
                Some(number.clone()),
                Some(CaseType::Active),
            ),
            CaseFooter::Empty => (None, None, None),
        }
    }
}

/// A court as observed on the display board during one tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Court {
    /// Upstream primary key (opaque)
    pub court_code: String,

    /// Human-readable court label ("15", "COURT NO 15" stripped)
    pub court_number: String,

    /// Presiding judge name(s)
    pub judge_name: String,

    /// Bench composition
    pub bench_type: BenchType,

    /// Number of judges on the bench
    pub judge_count: usize,

    /// Judge photo URLs, resolved absolute
    pub judge_photos: Vec<String>,

    /// Case number currently shown, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_number: Option<String>,

    /// Case status, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_status: Option<CaseStatus>,

    /// Coarse case classification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_type: Option<CaseType>,

    /// Cleaned serial-number text from the board
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sr_no: Option<String>,

    /// Queue position parsed out of `sr_no`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,

    /// Stream URL, resolved absolute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,

    /// Whether the card carries a stream link
    pub has_stream: bool,

    /// Whether the live indicator is blinking on the card
    pub is_live: bool,

    /// Live, in session, or in recess
    pub is_active: bool,

    /// When this observation was scraped
    pub scraped_at: DateTime<Utc>,
}

/// The fields of a `Court` that participate in the canonical hash.
///
/// `scraped_at` is volatile (new every tick) and excluded so hash
/// equality tracks semantic equality of the observation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CanonicalCourt<'a> {
    court_code: &'a str,
    court_number: &'a str,
    judge_name: &'a str,
    bench_type: BenchType,
    judge_count: usize,
    judge_photos: &'a [String],
    case_number: &'a Option<String>,
    case_status: &'a Option<CaseStatus>,
    case_type: &'a Option<CaseType>,
    sr_no: &'a Option<String>,
    queue_position: &'a Option<u32>,
    stream_url: &'a Option<String>,
    has_stream: bool,
    is_live: bool,
    is_active: bool,
}

impl Court {
    /// Canonical content hash over the stable JSON serialization.
    ///
    /// Equal hashes mean the observation is semantically unchanged.
    pub fn data_hash(&self) -> String {
        let canonical = CanonicalCourt {
            court_code: &self.court_code,
            court_number: &self.court_number,
            judge_name: &self.judge_name,
            bench_type: self.bench_type,
            judge_count: self.judge_count,
            judge_photos: &self.judge_photos,
            case_number: &self.case_number,
            case_status: &self.case_status,
            case_type: &self.case_type,
            sr_no: &self.sr_no,
            queue_position: &self.queue_position,
            stream_url: &self.stream_url,
            has_stream: self.has_stream,
            is_live: self.is_live,
            is_active: self.is_active,
        };
        let json = serde_json::to_vec(&canonical).expect("court serialization cannot fail");
        sha256_hex(&json)
    }
}
