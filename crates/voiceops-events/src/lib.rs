//! Queue log processing for voiceops
//!
//! This crate provides event classification, caller filtering, alert
//! formatting, recording lookup and log following.

mod filter;
pub mod format;
mod parser;
mod recording;
mod stream;

pub use filter::PhoneFilter;
pub use parser::EventParser;
pub use recording::{RecordingError, RecordingLocator, recording_url_for};
pub use stream::{FollowError, LogFollower};

// Re-export types used in our public API
pub use voiceops_types::{CallerIdentity, EventKind, EventRecord};
