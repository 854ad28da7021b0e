//! Alert message templates

use std::collections::HashMap;

use voiceops_types::CallerIdentity;

/// Display name for a queue code, empty when unmapped
pub fn queue_name<'a>(queues: &'a HashMap<String, String>, code: &str) -> &'a str {
    queues.get(code).map(String::as_str).unwrap_or("")
}

/// Phone number embedded in a recording URL
///
/// Recording files are named `<prefix>-<queue>-<phone>[-...].<ext>`; the
/// caller is re-derived from the third dash-separated segment of the file
/// name instead of the queue log. When that segment ends the name, its
/// extension is dropped.
pub fn phone_from_recording_url(url: &str) -> Option<&str> {
    let file_name = url.rsplit('/').next().unwrap_or(url);
    let mut segments = file_name.split('-');
    let phone = segments.nth(2)?;
    if segments.next().is_some() {
        return Some(phone);
    }
    Some(phone.rsplit_once('.').map_or(phone, |(stem, _)| stem))
}

pub fn incoming_message(identity: &CallerIdentity, queue: &str) -> String {
    format!(
        "Incoming call from {} in **{}** queue{}",
        identity.render(),
        queue,
        identity.detail_block()
    )
}

pub fn completed_message(
    identity: &CallerIdentity,
    recording_url: &str,
    add_contact: Option<&str>,
) -> String {
    let mut msg = format!(
        "Recording for call from {} at: {}",
        identity.render(),
        recording_url
    );
    if let Some(link) = add_contact {
        msg.push_str(&format!("\n[Add contact]({})", link));
    }
    msg
}

pub fn abandoned_message(identity: &CallerIdentity, queue: &str) -> String {
    format!(
        "Call from {} has left the **{}** queue",
        identity.render(),
        queue
    )
}

/// Link for adding an unknown caller to the directory
pub fn add_contact_link(base_url: &str, identity: &CallerIdentity) -> Option<String> {
    if identity.is_known() || identity.phone.is_empty() || base_url.is_empty() {
        return None;
    }
    Some(format!("{}{}", base_url, identity.phone))
}
