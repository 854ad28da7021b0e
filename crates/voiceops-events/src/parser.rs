use regex::Regex;

use voiceops_types::{EventKind, EventRecord};

/// Classifier for raw queue log lines
#[derive(Clone, Debug)]
pub struct EventParser {
    /// Alternation of every recognized marker
    markers: Regex,
}

impl EventParser {
    /// Build the marker matcher
    pub fn new() -> Result<Self, regex::Error> {
        let pattern = EventKind::MARKERS
            .iter()
            .map(|(marker, _)| regex::escape(marker))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            markers: Regex::new(&format!("({})", pattern))?,
        })
    }

    /// Find the first marker anywhere in the line
    ///
    /// The marker is matched against the whole line rather than the event
    /// field, so garbled lines that still carry a marker are classified.
    pub fn classify<'a>(&self, line: &'a str) -> Option<(EventKind, &'a str)> {
        let marker = self.markers.find(line)?.as_str();
        EventKind::from_marker(marker).map(|kind| (kind, marker))
    }

    /// Classify and split a line into an event record
    pub fn parse(&self, line: &str) -> Option<EventRecord> {
        let (kind, marker) = self.classify(line)?;
        Some(EventRecord::new(kind, marker, line))
    }
}
