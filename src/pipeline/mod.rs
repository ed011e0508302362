//! Tick orchestration: change detection, durable history, the tick
//! runner, and the scheduler that drives it.

pub mod delta;
pub mod history;
pub mod scheduler;
pub mod tick;

pub use delta::{sync_records, DeltaEngine, DeltaOutcome, DeltaSignature, RecordSyncStats};
pub use history::{Historian, HistoryOutcome};
pub use scheduler::{Scheduler, TickGate};
pub use tick::{TickRunner, TickServices};
