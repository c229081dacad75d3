//! Debounced statistics refresh
//!
//! Host events (character selected, chat changed, message sent) arrive in
//! bursts. [`CharacterEvents`] fans each event out to registered listeners and
//! [`StatsRefresher`] collapses a burst into a single pipeline run once the
//! quiet period has elapsed, publishing the resulting [`StatsReport`].

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::config::RefreshConfig;
use crate::pipeline::StatsPipeline;
use crate::report::StatsReport;
use crate::types::CharacterContext;

type ContextListener = Box<dyn Fn(&CharacterContext) + Send + Sync>;

/// Registry of character-change listeners
#[derive(Default)]
pub struct CharacterEvents {
    listeners: Mutex<Vec<ContextListener>>,
}

impl std::fmt::Debug for CharacterEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl CharacterEvents {
    /// Create a registry with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener called on every [`emit`](Self::emit)
    pub fn on_character_changed<F>(&self, listener: F)
    where
        F: Fn(&CharacterContext) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Box::new(listener));
    }

    /// Notify all listeners in registration order
    pub fn emit(&self, context: &CharacterContext) {
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tracing::debug!(listeners = listeners.len(), "Character event");
        for listener in listeners.iter() {
            listener(context);
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Runs an action once triggers stop arriving for `delay`
///
/// Every trigger restarts the quiet period. Triggers that arrive while the
/// action is running schedule one more run afterwards. The background task
/// ends when the last clone is dropped; a pending run is discarded.
#[derive(Debug, Clone)]
pub struct Debouncer {
    trigger: mpsc::UnboundedSender<()>,
}

impl Debouncer {
    /// Spawn the debounce task on the current tokio runtime
    pub fn spawn<F, Fut>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (trigger, mut rx) = mpsc::unbounded_channel::<()>();
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                loop {
                    match tokio::time::timeout(delay, rx.recv()).await {
                        Ok(Some(())) => continue,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }
                action().await;
            }
        });
        Self { trigger }
    }

    /// Request a run
    pub fn trigger(&self) {
        if self.trigger.send(()).is_err() {
            tracing::debug!("Debounce task has stopped");
        }
    }
}

/// Keeps a [`StatsReport`] current for the most recently requested character
#[derive(Debug)]
pub struct StatsRefresher {
    context: watch::Sender<CharacterContext>,
    reports: watch::Receiver<Option<StatsReport>>,
    debouncer: Debouncer,
}

impl StatsRefresher {
    /// Start refreshing with the given quiet period
    pub fn spawn(pipeline: Arc<StatsPipeline>, debounce: Duration) -> Self {
        let (context, context_rx) = watch::channel(CharacterContext::default());
        let (report_tx, reports) = watch::channel(None);
        let report_tx = Arc::new(report_tx);

        let debouncer = Debouncer::spawn(debounce, move || {
            let pipeline = Arc::clone(&pipeline);
            let report_tx = Arc::clone(&report_tx);
            let requested = context_rx.borrow().clone();
            async move {
                let outcome = pipeline.aggregate(&requested).await;
                let report = StatsReport::from_outcome(
                    &outcome,
                    requested.display_name_or_default(),
                    chrono::Local::now().date_naive(),
                );
                report_tx.send_replace(Some(report));
            }
        });

        Self {
            context,
            reports,
            debouncer,
        }
    }

    /// Start refreshing with the quiet period from `config`
    pub fn from_config(pipeline: Arc<StatsPipeline>, config: &RefreshConfig) -> Self {
        tracing::debug!(debounce_ms = config.debounce_ms, "Starting stats refresher");
        Self::spawn(pipeline, Duration::from_millis(config.debounce_ms))
    }

    /// Record `context` as current and schedule a refresh
    pub fn request(&self, context: CharacterContext) {
        self.context.send_replace(context);
        self.debouncer.trigger();
    }

    /// Route every event from `events` into [`request`](Self::request)
    pub fn attach(self: &Arc<Self>, events: &CharacterEvents) {
        let refresher = Arc::clone(self);
        events.on_character_changed(move |context| refresher.request(context.clone()));
    }

    /// Receiver that observes every published report
    pub fn subscribe(&self) -> watch::Receiver<Option<StatsReport>> {
        self.reports.clone()
    }

    /// Most recently published report
    pub fn latest(&self) -> Option<StatsReport> {
        self.reports.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::source::InMemoryChatSource;
    use crate::types::ChatFileMetadata;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_character_events_notify_in_order() {
        let events = CharacterEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = Arc::clone(&seen);
            events.on_character_changed(move |ctx| {
                seen.lock()
                    .unwrap()
                    .push(format!("{}:{}", tag, ctx.identifier().unwrap_or_default()));
            });
        }

        events.emit(&CharacterContext::for_character("Alice.png"));
        assert_eq!(events.listener_count(), 2);
        assert_eq!(
            *seen.lock().unwrap(),
            vec!["first:Alice.png".to_string(), "second:Alice.png".to_string()]
        );
    }

    #[tokio::test]
    async fn test_debouncer_collapses_bursts() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let debouncer = Debouncer::spawn(Duration::from_millis(50), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        for _ in 0..5 {
            debouncer.trigger();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        debouncer.trigger();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_debouncer_idle_does_nothing() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let _debouncer = Debouncer::spawn(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    fn alice_source() -> Arc<InMemoryChatSource> {
        let chat = concat!(
            "{\"user_name\":\"You\",\"character_name\":\"Alice\"}\n",
            "{\"mes\":\"Hello there\",\"is_user\":false,\"send_date\":\"March 5, 2024 2:30pm\"}\n",
            "{\"mes\":\"Hi Alice\",\"is_user\":true,\"send_date\":\"March 5, 2024 2:31pm\"}\n",
        );
        Arc::new(
            InMemoryChatSource::new()
                .with_listing(
                    "Alice.png",
                    vec![ChatFileMetadata::new(
                        "Alice - 2024-03-05@14h30m00s.jsonl",
                        2,
                        "1KB",
                        "March 5, 2024 2:31pm",
                    )],
                )
                .with_file("Alice", "Alice - 2024-03-05@14h30m00s.jsonl", chat),
        )
    }

    #[tokio::test]
    async fn test_refresher_publishes_report_for_latest_context() {
        let pipeline = Arc::new(StatsPipeline::from_source(
            alice_source(),
            PipelineConfig::default(),
        ));
        let refresher = Arc::new(StatsRefresher::spawn(pipeline, Duration::from_millis(20)));
        let events = CharacterEvents::new();
        refresher.attach(&events);

        let mut reports = refresher.subscribe();
        events.emit(&CharacterContext::for_character("Bob.png"));
        events.emit(&CharacterContext::for_character("Alice.png").with_display_name("Alice"));

        tokio::time::timeout(Duration::from_secs(2), reports.changed())
            .await
            .unwrap()
            .unwrap();
        let report = refresher.latest().unwrap();
        assert_eq!(report.character_name, "Alice");
        assert_eq!(report.messages, "2");
        assert_eq!(report.first_met, "2024-03-05 14:31");
        assert!(report.share_enabled);
    }

    #[tokio::test]
    async fn test_refresher_from_config_waits_for_configured_quiet_period() {
        let pipeline = Arc::new(StatsPipeline::from_source(
            alice_source(),
            PipelineConfig::default(),
        ));
        let config = RefreshConfig { debounce_ms: 300 };
        let refresher = StatsRefresher::from_config(pipeline, &config);

        refresher.request(CharacterContext::for_character("Alice.png"));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(refresher.latest().is_none());

        let mut reports = refresher.subscribe();
        tokio::time::timeout(Duration::from_secs(2), reports.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(refresher.latest().unwrap().messages, "2");
    }
}
