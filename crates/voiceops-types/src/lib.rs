//! Shared types for voiceops
//!
//! This crate contains data structures used across multiple voiceops crates.

use serde::Deserialize;

// ============================================================================
// Queue Log Types
// ============================================================================

/// Field positions in a queue log line (`time|callid|queue|agent|event|data...`)
pub const FIELD_CALL_ID: usize = 1;
pub const FIELD_QUEUE: usize = 2;
pub const FIELD_CALLER: usize = 6;

/// Call-lifecycle event recognized in the queue log
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Caller entered a queue (`ENTERQUEUE`)
    Incoming,
    /// Call finished by either side (`COMPLETEAGENT`, `COMPLETECALLER`)
    Completed,
    /// Caller hung up while waiting (`ABANDON`)
    Abandoned,
}

impl EventKind {
    /// Every marker string with the event it maps to
    pub const MARKERS: [(&'static str, EventKind); 4] = [
        ("ENTERQUEUE", EventKind::Incoming),
        ("COMPLETEAGENT", EventKind::Completed),
        ("COMPLETECALLER", EventKind::Completed),
        ("ABANDON", EventKind::Abandoned),
    ];

    /// Map a marker string to its event
    pub fn from_marker(marker: &str) -> Option<Self> {
        Self::MARKERS
            .iter()
            .find(|(m, _)| *m == marker)
            .map(|(_, kind)| *kind)
    }

    /// Short label for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incoming => "incoming",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        }
    }
}

/// A classified queue log line
#[derive(Clone, Debug)]
pub struct EventRecord {
    /// Detected event
    pub kind: EventKind,

    /// Marker text that matched
    pub marker: String,

    /// Pipe-separated fields of the raw line
    pub fields: Vec<String>,
}

impl EventRecord {
    pub fn new(kind: EventKind, marker: impl Into<String>, line: &str) -> Self {
        Self {
            kind,
            marker: marker.into(),
            fields: line.split('|').map(str::to_string).collect(),
        }
    }

    /// Positional field, empty when the line is too short
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn call_id(&self) -> &str {
        self.field(FIELD_CALL_ID)
    }

    pub fn queue_code(&self) -> &str {
        self.field(FIELD_QUEUE)
    }

    pub fn caller(&self) -> &str {
        self.field(FIELD_CALLER)
    }
}

// ============================================================================
// Customer Types
// ============================================================================

/// Customer entry stored in the directory
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerRecord {
    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Company", default)]
    pub company: String,

    #[serde(rename = "Note", default)]
    pub note: String,
}

impl CustomerRecord {
    /// Parse a stored value, falling back to an empty record
    pub fn from_stored(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

/// Result of a directory lookup for one phone number
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Phone number the lookup was made for
    pub phone: String,

    /// Directory entry, if one exists
    pub customer: Option<CustomerRecord>,

    /// Stored value as found in the directory (empty on a miss)
    pub raw: String,
}

impl CallerIdentity {
    /// Identity for a number with no directory entry
    pub fn unknown(phone: impl Into<String>) -> Self {
        Self {
            phone: phone.into(),
            customer: None,
            raw: String::new(),
        }
    }

    /// Identity built from a stored directory value
    pub fn from_stored(phone: impl Into<String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            phone: phone.into(),
            customer: Some(CustomerRecord::from_stored(&raw)),
            raw,
        }
    }

    pub fn is_known(&self) -> bool {
        self.customer.is_some()
    }

    /// Markdown identity: `**Name**, **Phone** (Note) from **Company** company`
    pub fn render(&self) -> String {
        let phone = if self.phone.is_empty() {
            "unknown"
        } else {
            self.phone.as_str()
        };

        let Some(customer) = &self.customer else {
            return format!("**{}**", phone);
        };

        let mut out = format!("**{}**, **{}**", customer.name, phone);
        if !customer.note.is_empty() {
            out.push_str(&format!(" ({})", customer.note));
        }
        if !customer.company.is_empty() {
            out.push_str(&format!(" from **{}** company", customer.company));
        }
        out
    }

    /// Stored value collapsed for a chat code block (braces, quotes and CRs removed)
    pub fn collapsed_record(&self) -> String {
        self.raw
            .chars()
            .filter(|c| !matches!(c, '{' | '}' | '"' | '\r'))
            .collect()
    }

    /// Code block appended to incoming-call alerts, empty on a miss
    pub fn detail_block(&self) -> String {
        if self.is_known() {
            format!("\n```{}```", self.collapsed_record())
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_access_out_of_range() {
        let record = EventRecord::new(EventKind::Incoming, "ENTERQUEUE", "a|b");
        assert_eq!(record.call_id(), "b");
        assert_eq!(record.queue_code(), "");
        assert_eq!(record.caller(), "");
    }

    #[test]
    fn test_render_miss() {
        let identity = CallerIdentity::unknown("420777888999");
        assert_eq!(identity.render(), "**420777888999**");
        assert_eq!(identity.detail_block(), "");
    }

    #[test]
    fn test_render_full_record() {
        let identity = CallerIdentity::from_stored(
            "420777888999",
            r#"{"Name":"Jane","Company":"Acme","Note":"VIP"}"#,
        );
        assert_eq!(
            identity.render(),
            "**Jane**, **420777888999** (VIP) from **Acme** company"
        );
    }

    #[test]
    fn test_render_optional_segments() {
        let identity = CallerIdentity::from_stored("1", r#"{"Name":"Jane"}"#);
        assert_eq!(identity.render(), "**Jane**, **1**");

        let identity = CallerIdentity::from_stored("1", r#"{"Name":"Jane","Note":"late"}"#);
        assert_eq!(identity.render(), "**Jane**, **1** (late)");

        let identity = CallerIdentity::from_stored("1", r#"{"Name":"Jane","Company":"Acme"}"#);
        assert_eq!(identity.render(), "**Jane**, **1** from **Acme** company");
    }

    #[test]
    fn test_malformed_record_degrades() {
        let identity = CallerIdentity::from_stored("1", "not json at all");
        assert_eq!(identity.customer, Some(CustomerRecord::default()));
        assert_eq!(identity.render(), "****, **1**");
    }

    #[test]
    fn test_collapsed_record() {
        let identity = CallerIdentity::from_stored(
            "1",
            "{\r\n  \"Name\": \"Jane\",\n  \"Note\": \"VIP\"\n}",
        );
        assert_eq!(identity.collapsed_record(), "\n  Name: Jane,\n  Note: VIP\n");
        assert_eq!(
            identity.detail_block(),
            "\n```\n  Name: Jane,\n  Note: VIP\n```"
        );
    }

    #[test]
    fn test_empty_phone_renders_placeholder() {
        assert_eq!(CallerIdentity::unknown("").render(), "**unknown**");
    }

    #[test]
    fn test_marker_lookup() {
        assert_eq!(EventKind::from_marker("COMPLETECALLER"), Some(EventKind::Completed));
        assert_eq!(EventKind::from_marker("CONNECT"), None);
    }
}
