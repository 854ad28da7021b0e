//! Alert delivery for voiceops
//!
//! This crate posts formatted alerts to a Mattermost incoming webhook.

mod webhook;

pub use webhook::{MattermostNotifier, Notifier, StdoutNotifier, WebhookPayload};
