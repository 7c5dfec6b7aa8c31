//! Explainer - trigger point for explanations
//!
//! Guards the trigger (selection, credential), extracts context, applies
//! the concurrent-trigger policy and runs one session per trigger.

use crate::completion::{config_factory, CredentialProvider, SourceFactory};
use crate::config::{AppConfig, TriggerPolicy};
use crate::context::{ContextExtractor, DocumentSnapshot};
use crate::errors::{ExplainError, Result};
use crate::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::lifecycle::{ExplainSession, SessionHandle};
use super::observer::SessionObserver;
use super::state::SessionReport;

/// Runs explanations for an editor host
pub struct Explainer {
    extractor: ContextExtractor,
    credentials: Arc<dyn CredentialProvider>,
    factory: SourceFactory,
    policy: TriggerPolicy,
    timeout: Option<Duration>,
    active: Mutex<Option<SessionHandle>>,
}

impl Explainer {
    /// Create an explainer wired from configuration
    pub fn new(config: &AppConfig) -> Self {
        Self {
            extractor: ContextExtractor::from_config(&config.context),
            credentials: Arc::new(config.completion.clone()),
            factory: config_factory(config.completion.clone()),
            policy: config.session.trigger_policy,
            timeout: config.session_timeout(),
            active: Mutex::new(None),
        }
    }

    /// Replace the completion source factory
    pub fn with_factory(mut self, factory: SourceFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Replace the credential provider
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_policy(mut self, policy: TriggerPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Explain the selection in `snapshot`, streaming to `observer`.
    ///
    /// Trigger-point failures (`EmptySelection`, `MissingCredential`,
    /// `SessionActive`, configuration) come back as `Err` and no session is
    /// created. Everything that happens once a session runs is in the report.
    pub async fn explain(
        &self,
        snapshot: &DocumentSnapshot,
        observer: Arc<dyn SessionObserver>,
    ) -> Result<SessionReport> {
        if !snapshot.has_selection() {
            metrics::record_rejection("empty_selection");
            return Err(ExplainError::EmptySelection);
        }

        let Some(api_key) = self.credentials.api_key() else {
            metrics::record_rejection("missing_credential");
            tracing::warn!("No API key configured, explanation not started");
            return Err(ExplainError::MissingCredential);
        };

        let context = self.extractor.extract_snapshot(snapshot)?;
        self.admit().await?;
        let source = (self.factory)(&api_key)?;

        let mut session = ExplainSession::new(observer);
        self.register(&session).await?;

        session.start(&context, source.as_ref(), self.timeout).await;

        let mut active = self.active.lock().await;
        if active.as_ref().is_some_and(|h| h.id() == session.id()) {
            *active = None;
        }

        Ok(session.report())
    }

    /// Dismiss the tracked session, if it is still running
    pub async fn dismiss(&self) -> bool {
        let active = self.active.lock().await;
        match active.as_ref() {
            Some(handle) if !handle.is_finished() => {
                tracing::info!(session_id = %handle.id(), "Explain session dismissed");
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    /// Handle of the tracked session
    pub async fn active_session(&self) -> Option<SessionHandle> {
        self.active.lock().await.clone()
    }

    /// Refuse early under `IgnoreNew`, before any source is built
    async fn admit(&self) -> Result<()> {
        if self.policy != TriggerPolicy::IgnoreNew {
            return Ok(());
        }
        let active = self.active.lock().await;
        match active.as_ref().filter(|h| !h.is_finished()) {
            Some(current) => {
                metrics::record_rejection("session_active");
                tracing::info!(session_id = %current.id(), "Explain session already running, trigger ignored");
                Err(ExplainError::SessionActive)
            }
            None => Ok(()),
        }
    }

    async fn register(&self, session: &ExplainSession) -> Result<()> {
        let mut active = self.active.lock().await;

        if let Some(current) = active.as_ref().filter(|h| !h.is_finished()) {
            match self.policy {
                TriggerPolicy::IgnoreNew => {
                    metrics::record_rejection("session_active");
                    tracing::info!(session_id = %current.id(), "Explain session already running, trigger ignored");
                    return Err(ExplainError::SessionActive);
                }
                TriggerPolicy::CancelReplace => {
                    tracing::info!(
                        replaced = %current.id(),
                        session_id = %session.id(),
                        "Replacing running explain session"
                    );
                    current.cancel();
                }
                TriggerPolicy::AllowConcurrent => {}
            }
        }

        *active = Some(session.handle());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{CompletionSource, ScriptedSource};
    use crate::config::CompletionConfig;
    use crate::session::observer::{NullObserver, RecordingObserver, SessionEvent};
    use crate::session::state::SessionState;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> DocumentSnapshot {
        DocumentSnapshot {
            text: "# Biology\n## Plants\nPlants rely on photosynthesis for energy.".to_string(),
            selection: 35..49,
            cursor_line: None,
            title: Some("Botany".to_string()),
        }
    }

    fn credentials(key: Option<&str>) -> Arc<dyn CredentialProvider> {
        Arc::new(CompletionConfig {
            api_key: key.map(String::from),
            ..CompletionConfig::default()
        })
    }

    fn queue_factory(sources: Vec<ScriptedSource>, calls: Arc<AtomicUsize>) -> SourceFactory {
        let queue = std::sync::Mutex::new(VecDeque::from(sources));
        Arc::new(move |_key: &str| {
            calls.fetch_add(1, Ordering::SeqCst);
            let source = queue
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| ScriptedSource::new(["fallback"]));
            Ok::<_, ExplainError>(Arc::new(source) as Arc<dyn CompletionSource>)
        })
    }

    fn explainer(sources: Vec<ScriptedSource>) -> (Explainer, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let explainer = Explainer::new(&AppConfig::default())
            .with_credentials(credentials(Some("test-key")))
            .with_factory(queue_factory(sources, calls.clone()));
        (explainer, calls)
    }

    async fn wait_for_streaming(explainer: &Explainer) -> SessionHandle {
        loop {
            if let Some(mut handle) = explainer.active_session().await {
                handle.wait_until(|s| *s != SessionState::Idle && *s != SessionState::Loading).await;
                return handle;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }

    #[tokio::test]
    async fn test_explain_streams_to_done() {
        let (explainer, _) = explainer(vec![ScriptedSource::new(["Light ", "to sugar."])]);
        let observer = Arc::new(RecordingObserver::new());

        let report = explainer.explain(&snapshot(), observer.clone()).await.unwrap();

        assert!(report.is_done());
        assert_eq!(report.text, "Light to sugar.");
        assert_eq!(report.error, None);
        assert_eq!(observer.events().first(), Some(&SessionEvent::Loading));
        assert!(explainer.active_session().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_credential_short_circuits() {
        let (explainer, calls) = explainer(vec![]);
        let explainer = explainer.with_credentials(credentials(Some("  ")));
        let observer = Arc::new(RecordingObserver::new());

        let result = explainer.explain(&snapshot(), observer.clone()).await;

        assert!(matches!(result, Err(ExplainError::MissingCredential)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(observer.events().is_empty());
    }

    #[tokio::test]
    async fn test_empty_selection_rejected() {
        let (explainer, calls) = explainer(vec![]);
        let mut blank = snapshot();
        blank.selection = 9..10;

        let result = explainer.explain(&blank, Arc::new(NullObserver)).await;

        assert!(matches!(result, Err(ExplainError::EmptySelection)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_session_errors_land_in_report() {
        let (explainer, _) = explainer(vec![ScriptedSource::failing_on_open(
            crate::errors::CompletionError::message("API key not valid"),
        )]);

        let report = explainer.explain(&snapshot(), Arc::new(NullObserver)).await.unwrap();

        assert_eq!(report.state, SessionState::Errored);
        assert_eq!(
            report.error.as_deref(),
            Some("Invalid API key. Please check your Gemini API key in settings.")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_replace_policy() {
        let (explainer, _) = explainer(vec![
            ScriptedSource::new(["first"]).then_hang(),
            ScriptedSource::new(["second"]).with_delay(Duration::from_millis(5)),
        ]);
        let explainer = Arc::new(explainer);

        let first = tokio::spawn({
            let explainer = explainer.clone();
            async move { explainer.explain(&snapshot(), Arc::new(NullObserver)).await }
        });
        wait_for_streaming(&explainer).await;

        let second = explainer.explain(&snapshot(), Arc::new(NullObserver)).await.unwrap();
        let first = first.await.unwrap().unwrap();

        assert_eq!(first.state, SessionState::Cancelled);
        assert_eq!(first.text, "first");
        assert!(second.is_done());
        assert_eq!(second.text, "second");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ignore_new_policy() {
        let (explainer, calls) = explainer(vec![
            ScriptedSource::new(["first", " done"]).with_delay(Duration::from_millis(20)),
        ]);
        let explainer = Arc::new(explainer.with_policy(TriggerPolicy::IgnoreNew));

        let first = tokio::spawn({
            let explainer = explainer.clone();
            async move { explainer.explain(&snapshot(), Arc::new(NullObserver)).await }
        });
        wait_for_streaming(&explainer).await;

        let second = explainer.explain(&snapshot(), Arc::new(NullObserver)).await;
        let first = first.await.unwrap().unwrap();

        assert!(matches!(second, Err(ExplainError::SessionActive)));
        assert!(first.is_done());
        assert_eq!(first.text, "first done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_cancels_running_session() {
        let (explainer, _) = explainer(vec![ScriptedSource::new(["partial"]).then_hang()]);
        let explainer = Arc::new(explainer);
        let observer = Arc::new(RecordingObserver::new());

        let running = tokio::spawn({
            let explainer = explainer.clone();
            let observer = observer.clone();
            async move { explainer.explain(&snapshot(), observer).await }
        });
        wait_for_streaming(&explainer).await;

        assert!(explainer.dismiss().await);
        let report = running.await.unwrap().unwrap();

        assert_eq!(report.state, SessionState::Cancelled);
        assert_eq!(observer.events().last(), Some(&SessionEvent::Cancelled));
        assert!(!explainer.dismiss().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_timeout() {
        let (explainer, _) = explainer(vec![ScriptedSource::new(["thinking"]).then_hang()]);
        let explainer = explainer.with_timeout(Some(Duration::from_secs(30)));

        let report = explainer.explain(&snapshot(), Arc::new(NullObserver)).await.unwrap();

        assert_eq!(report.state, SessionState::Errored);
        assert_eq!(report.text, "thinking");
        assert!(report.error.unwrap().starts_with("Gemini API error:"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_explain_frees_slot() {
        let (explainer, calls) = explainer(vec![
            ScriptedSource::new(["stuck"]).then_hang(),
            ScriptedSource::new(["next"]),
        ]);
        let explainer = explainer.with_policy(TriggerPolicy::IgnoreNew);
        let observer = Arc::new(RecordingObserver::new());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            explainer.explain(&snapshot(), observer.clone()),
        )
        .await;
        assert!(abandoned.is_err());

        let stale = explainer.active_session().await.unwrap();
        assert_eq!(stale.state(), SessionState::Cancelled);
        assert!(stale.is_finished());
        assert_eq!(observer.events().last(), Some(&SessionEvent::Cancelled));
        assert!(!explainer.dismiss().await);

        let report = explainer.explain(&snapshot(), Arc::new(NullObserver)).await.unwrap();
        assert!(report.is_done());
        assert_eq!(report.text, "next");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_handle_of_dropped_session_does_not_block() {
        let (explainer, _) = explainer(vec![ScriptedSource::new(["fresh"])]);
        let explainer = explainer.with_policy(TriggerPolicy::IgnoreNew);

        let orphan = ExplainSession::new(Arc::new(NullObserver));
        explainer.register(&orphan).await.unwrap();
        drop(orphan);

        assert!(!explainer.dismiss().await);
        let report = explainer.explain(&snapshot(), Arc::new(NullObserver)).await.unwrap();
        assert_eq!(report.text, "fresh");
    }
}
