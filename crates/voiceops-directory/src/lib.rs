//! Customer directory for voiceops
//!
//! This crate provides phone number lookups against the Redis customer store.

mod client;

pub use client::{CustomerDirectory, MemoryDirectory, RedisDirectory, connection_url};

// Re-export types that are used in our public API
pub use voiceops_types::{CallerIdentity, CustomerRecord};
