//! Redis client for customer lookups

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::{debug, warn};

use voiceops_types::CallerIdentity;

/// Point lookup of callers by phone number
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Look up a phone number; misses and store errors yield an unknown caller
    async fn lookup(&self, phone: &str) -> CallerIdentity;
}

/// Build a `redis://` URL from a host and optional password
pub fn connection_url(host: &str, password: &str) -> String {
    if host.starts_with("redis://") || host.starts_with("rediss://") {
        return host.to_string();
    }
    if password.is_empty() {
        format!("redis://{}/", host)
    } else {
        format!("redis://:{}@{}/", password, host)
    }
}

/// Customer directory stored as JSON values in Redis
pub struct RedisDirectory {
    client: redis::Client,

    /// Key prefix prepended to the phone number
    prefix: String,
}

impl RedisDirectory {
    /// Create a directory client; no connection is made until the first lookup
    pub fn new(host: &str, password: &str, prefix: &str) -> redis::RedisResult<Self> {
        let client = redis::Client::open(connection_url(host, password))?;
        Ok(Self {
            client,
            prefix: prefix.to_string(),
        })
    }

    /// Redis key for a phone number
    pub fn key_for(&self, phone: &str) -> String {
        format!("{}{}", self.prefix, phone)
    }

    async fn fetch(&self, key: &str) -> redis::RedisResult<Option<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.get(key).await
    }
}

#[async_trait]
impl CustomerDirectory for RedisDirectory {
    async fn lookup(&self, phone: &str) -> CallerIdentity {
        let key = self.key_for(phone);
        match self.fetch(&key).await {
            Ok(Some(value)) if !value.is_empty() => {
                debug!(%key, "Customer found");
                CallerIdentity::from_stored(phone, value)
            }
            Ok(_) => {
                debug!(%key, "Customer not found");
                CallerIdentity::unknown(phone)
            }
            Err(e) => {
                warn!(%key, error = %e, "Customer lookup failed");
                CallerIdentity::unknown(phone)
            }
        }
    }
}

/// In-memory directory keyed by phone number
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    entries: HashMap<String, String>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw directory value for a phone number
    pub fn insert(&mut self, phone: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(phone.into(), value.into());
    }

    pub fn with_entry(mut self, phone: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(phone, value);
        self
    }
}

#[async_trait]
impl CustomerDirectory for MemoryDirectory {
    async fn lookup(&self, phone: &str) -> CallerIdentity {
        match self.entries.get(phone) {
            Some(value) if !value.is_empty() => CallerIdentity::from_stored(phone, value.clone()),
            _ => CallerIdentity::unknown(phone),
        }
    }
}
