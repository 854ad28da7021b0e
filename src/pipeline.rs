//! Classify, enrich and deliver one queue log line at a time

use std::collections::HashMap;

use tracing::{debug, info, warn};

use voiceops_directory::CustomerDirectory;
use voiceops_events::format::{
    abandoned_message, add_contact_link, completed_message, incoming_message,
    phone_from_recording_url, queue_name,
};
use voiceops_events::{
    CallerIdentity, EventKind, EventParser, EventRecord, LogFollower, PhoneFilter,
    RecordingLocator,
};
use voiceops_notify::Notifier;

use crate::config::Config;

/// Sequential consumer turning queue log lines into chat alerts
pub struct Pipeline<D, N> {
    parser: EventParser,
    filter: PhoneFilter,
    locator: RecordingLocator,
    queues: HashMap<String, String>,
    add_contact_url: Option<String>,
    directory: D,
    notifier: N,
}

impl<D, N> Pipeline<D, N>
where
    D: CustomerDirectory,
    N: Notifier,
{
    pub fn new(config: &Config, directory: D, notifier: N) -> Result<Self, regex::Error> {
        Ok(Self {
            parser: EventParser::new()?,
            filter: PhoneFilter::new(config.phone_numbers_whitelist.iter().cloned()),
            locator: RecordingLocator::new(&config.recording_path, config.recording_url.clone()),
            queues: config.queues.clone(),
            add_contact_url: config.add_contact_base().map(str::to_string),
            directory,
            notifier,
        })
    }

    /// Consume lines until the follower stops
    pub async fn run(&self, follower: &mut LogFollower) {
        while let Some(line) = follower.next_line().await {
            self.handle_line(&line).await;
        }
        warn!(running = follower.is_running(), "Queue log follower ended");
    }

    /// Process one line, returning the alert that was sent
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        let record = self.parser.parse(line)?;
        debug!(kind = record.kind.as_str(), marker = %record.marker, "Queue event");

        let message = match record.kind {
            EventKind::Incoming => self.incoming(&record).await?,
            EventKind::Completed => self.completed(&record).await?,
            EventKind::Abandoned => self.abandoned(&record).await?,
        };

        info!(kind = record.kind.as_str(), %message, "Sending alert");
        self.notifier.notify(&message).await;
        Some(message)
    }

    async fn incoming(&self, record: &EventRecord) -> Option<String> {
        let identity = self.identify(record.caller()).await?;
        Some(incoming_message(
            &identity,
            queue_name(&self.queues, record.queue_code()),
        ))
    }

    async fn completed(&self, record: &EventRecord) -> Option<String> {
        let url = self.locator.url_for(record.call_id()).await;
        let identity = self.identify(recording_phone(&url)).await?;
        let link = self
            .add_contact_url
            .as_deref()
            .and_then(|base| add_contact_link(base, &identity));
        Some(completed_message(&identity, &url, link.as_deref()))
    }

    async fn abandoned(&self, record: &EventRecord) -> Option<String> {
        let url = self.locator.url_for(record.call_id()).await;
        let identity = self.identify(recording_phone(&url)).await?;
        Some(abandoned_message(
            &identity,
            queue_name(&self.queues, record.queue_code()),
        ))
    }

    /// Apply the allow-list and look the caller up
    async fn identify(&self, phone: &str) -> Option<CallerIdentity> {
        if !self.filter.allows(phone) {
            info!(phone, "Caller not in allow-list, skipping");
            return None;
        }
        if phone.is_empty() {
            return Some(CallerIdentity::unknown(phone));
        }
        Some(self.directory.lookup(phone).await)
    }
}

/// Caller number taken from the recording file name, empty when it cannot be derived
fn recording_phone(url: &str) -> &str {
    phone_from_recording_url(url).unwrap_or_else(|| {
        if !url.is_empty() {
            warn!(url, "Cannot derive caller from recording name");
        }
        ""
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use voiceops_directory::MemoryDirectory;

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl CapturingNotifier {
        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for CapturingNotifier {
        async fn notify(&self, text: &str) {
            self.sent.lock().unwrap().push(text.to_string());
        }
    }

    const JANE: &str = r#"{"Name":"Jane","Company":"Acme","Note":"VIP"}"#;

    fn config(recordings: &std::path::Path, whitelist: &[&str]) -> Config {
        let mut config = Config::from_toml(&format!(
            r#"
queue_log = "/tmp/queue_log"
mattermost_api_url = "http://localhost/hooks/x"
recording_path = "{}"
recording_url = "https://pbx/rec/"
redis_host = "127.0.0.1:6379"

[queues]
1000 = "support"
"#,
            recordings.display()
        ))
        .unwrap();
        config.phone_numbers_whitelist = whitelist.iter().map(|s| s.to_string()).collect();
        config
    }

    fn pipeline(
        config: &Config,
        directory: MemoryDirectory,
    ) -> Pipeline<MemoryDirectory, CapturingNotifier> {
        Pipeline::new(config, directory, CapturingNotifier::default()).unwrap()
    }

    const ENTER: &str = "1577880000|1577880000.123|1000|NONE|ENTERQUEUE||420777888999|1";

    #[tokio::test]
    async fn test_incoming_unknown_caller() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&config(dir.path(), &[]), MemoryDirectory::new());

        let msg = p.handle_line(ENTER).await.unwrap();
        assert_eq!(
            msg,
            "Incoming call from **420777888999** in **support** queue"
        );
        assert_eq!(p.notifier.sent(), vec![msg]);
    }

    #[tokio::test]
    async fn test_incoming_known_caller() {
        let dir = tempfile::tempdir().unwrap();
        let directory = MemoryDirectory::new().with_entry("420777888999", JANE);
        let p = pipeline(&config(dir.path(), &[]), directory);

        let msg = p.handle_line(ENTER).await.unwrap();
        assert_eq!(
            msg,
            "Incoming call from **Jane**, **420777888999** (VIP) from **Acme** company \
             in **support** queue\n```Name:Jane,Company:Acme,Note:VIP```"
        );
    }

    #[tokio::test]
    async fn test_abandon_unmapped_queue() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("q-4242-420777888999-1577880000.9.wav"), b"").unwrap();
        let p = pipeline(&config(dir.path(), &[]), MemoryDirectory::new());

        let msg = p
            .handle_line("1577880000|1577880000.9|4242|NONE|ABANDON|1|1|12")
            .await
            .unwrap();
        assert_eq!(msg, "Call from **420777888999** has left the **** queue");
    }

    #[tokio::test]
    async fn test_allow_list_rejects_caller() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&config(dir.path(), &["420777888999"]), MemoryDirectory::new());

        let line = "1577880000|1577880000.5|1000|NONE|ENTERQUEUE||420111222333|1";
        assert_eq!(p.handle_line(line).await, None);
        assert!(p.notifier.sent().is_empty());

        assert!(p.handle_line(ENTER).await.is_some());
    }

    #[tokio::test]
    async fn test_unrecognized_line_is_silent() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&config(dir.path(), &[]), MemoryDirectory::new());

        assert_eq!(
            p.handle_line("1577880000|1577880000.1|1000|SIP/100|CONNECT|3|1|2").await,
            None
        );
        assert!(p.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_completed_uses_recording_phone() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("q-1000-420777888999-1577880000.7.wav"), b"").unwrap();
        let directory = MemoryDirectory::new().with_entry("420777888999", JANE);
        let p = pipeline(&config(dir.path(), &[]), directory);

        // Caller field differs from the recording name on purpose
        let msg = p
            .handle_line("1577880000|1577880000.7|1000|SIP/100|COMPLETECALLER|5|60|1|000")
            .await
            .unwrap();
        assert_eq!(
            msg,
            "Recording for call from **Jane**, **420777888999** (VIP) from **Acme** company \
             at: https://pbx/rec/q-1000-420777888999-1577880000.7.wav"
        );
    }

    #[tokio::test]
    async fn test_completed_short_recording_name_passes_allow_list() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("foo-123-420777888999.wav"), b"").unwrap();
        let directory = MemoryDirectory::new().with_entry("420777888999", JANE);
        let p = pipeline(&config(dir.path(), &["420777888999"]), directory);

        let msg = p
            .handle_line("1|123|1000|SIP/1|COMPLETEAGENT|5|60|1")
            .await
            .unwrap();
        assert_eq!(
            msg,
            "Recording for call from **Jane**, **420777888999** (VIP) from **Acme** company \
             at: https://pbx/rec/foo-123-420777888999.wav"
        );
        assert_eq!(p.notifier.sent(), vec![msg]);
    }

    #[tokio::test]
    async fn test_completed_adds_contact_link_for_unknown_caller() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("q-1000-420777888999-1577880000.8.wav"), b"").unwrap();
        let mut config = config(dir.path(), &[]);
        config.show_add_contact_url = true;
        config.add_contact_url = "https://crm/new?phone=".to_string();
        let p = pipeline(&config, MemoryDirectory::new());

        let msg = p
            .handle_line("1577880000|1577880000.8|1000|SIP/100|COMPLETEAGENT|5|60|1")
            .await
            .unwrap();
        assert_eq!(
            msg,
            "Recording for call from **420777888999** at: \
             https://pbx/rec/q-1000-420777888999-1577880000.8.wav\n\
             [Add contact](https://crm/new?phone=420777888999)"
        );
    }

    #[tokio::test]
    async fn test_missing_recording_does_not_crash() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&config(dir.path(), &[]), MemoryDirectory::new());

        let msg = p
            .handle_line("1577880000|1577880000.404|1000|SIP/100|COMPLETEAGENT|5|60|1")
            .await
            .unwrap();
        assert_eq!(msg, "Recording for call from **unknown** at: ");

        // Unknown caller cannot pass a non-empty allow-list
        let strict = pipeline(&config(dir.path(), &["420777888999"]), MemoryDirectory::new());
        assert_eq!(
            strict.handle_line("1577880000|1577880000.404|1000|NONE|ABANDON|1|1|3").await,
            None
        );
    }

    #[tokio::test]
    async fn test_short_line_does_not_crash() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(&config(dir.path(), &[]), MemoryDirectory::new());

        assert_eq!(
            p.handle_line("ENTERQUEUE").await.as_deref(),
            Some("Incoming call from **unknown** in **** queue")
        );
    }
}
