// Data acquisition for the PTO monitor
//
// Provides:
// - Pull (HTTP poll) and push (websocket) sample sources
// - The feed state machine and per-sample pipeline
// - Error taxonomy for transport and sample failures

mod controller;
pub mod error;
pub mod source;

pub use controller::{FeedController, RatePipeline, snap_rate};
pub use error::FeedError;
pub use source::{Backoff, FeedEvent, PollSource, PushSource, SampleSource};
