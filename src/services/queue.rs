// src/services/queue.rs

//! Pending-queue construction.
//!
//! Groups the tick's courts by court number and orders the cases still
//! waiting to be heard.

use std::collections::HashMap;

use crate::models::Court;

/// The queue view of one court number for this tick.
#[derive(Debug, Clone, Default)]
pub struct CourtQueue {
    /// Cases with a queue position and a non-terminal status, ascending
    pub pending: Vec<Court>,
    /// First court in the group that is in session
    pub current_case: Option<Court>,
}

impl CourtQueue {
    /// 1-based rank of a case in the pending queue.
    pub fn position_of(&self, case_number: &str) -> Option<u32> {
        self.pending
            .iter()
            .position(|c| c.case_number.as_deref() == Some(case_number))
            .map(|idx| idx as u32 + 1)
    }
}

/// Build per-court-number queues. Courts without a court number are
/// excluded.
pub fn build_queues(courts: &[Court]) -> HashMap<String, CourtQueue> {
    let mut queues: HashMap<String, CourtQueue> = HashMap::new();

    for court in courts {
        if court.court_number.is_empty() {
            continue;
        }
        let queue = queues.entry(court.court_number.clone()).or_default();

        let terminal = court
            .case_status
            .map(|s| s.is_terminal_for_queue())
            .unwrap_or(false);
        if court.queue_position.is_some() && !terminal {
            queue.pending.push(court.clone());
        }

        if queue.current_case.is_none()
            && court.case_status == Some(crate::models::CaseStatus::InSession)
        {
            queue.current_case = Some(court.clone());
        }
    }

    for queue in queues.values_mut() {
        queue.pending.sort_by_key(|c| c.queue_position);
    }

    queues
}
