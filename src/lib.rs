//! courtwatch ingest-and-dispatch core
//!
//! Watches a courthouse display board, detects per-court changes on a
//! short interval, and fans deltas out to push notifications, a live
//! broadcast channel, and durable history stores.
//!
//! # Architecture
//!
//! - `models`: Data structures (Config, Court, Watchlist, durable rows)
//! - `services`: Business logic (fetch, parse, queues, watch states, dispatch)
//! - `pipeline`: High-level operations (delta, history, tick, scheduler)
//! - `storage`: Persistence seams (store traits, in-memory backend)
//! - `utils`: Shared utilities (URLs, hashing, text)
//! - `error`: Unified error handling

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use error::{AppError, Result};
