//! Business logic: fetching, parsing, queue building, watch-state
//! processing, and outbound dispatch.

pub mod dispatch;
pub mod fetch;
pub mod parse;
pub mod queue;
pub mod watchlist;

pub use dispatch::{alert_message, Broadcaster, LoggingBroadcaster, LoggingGateway, PushGateway};
pub use fetch::{BoardRow, BoardSource, FetchOutcome, HttpBoardSource};
pub use parse::{BoardParser, ParsedCourt};
pub use queue::{build_queues, CourtQueue};
pub use watchlist::{WatchlistOutcome, WatchlistProcessor};
