//! Client side of the vidiprinter: polls the feed endpoint and renders only
//! what it has not shown yet.

pub mod client;
pub mod session;
pub mod task;

pub use client::{FeedClient, HttpFeedClient};
pub use session::{ConnectionState, RenderedEntry, Session, Watermark};
pub use task::{PollEvent, Poller, PollerHandle, DEFAULT_POLL_INTERVAL};
