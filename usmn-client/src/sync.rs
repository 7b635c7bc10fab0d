//! Background settings sync
//!
//! Keeps a local copy of the settings in step with the server without
//! clobbering an edit in progress:
//!
//! - the first successful read populates `settings` and clears `is_loading`
//! - the periodic poll only refreshes the side cache once `settings` is set
//! - [`SettingsSync::refetch`] and [`SettingsSync::notify_updated`] replace
//!   `settings` with the latest read
//!
//! A failed read leaves everything as it was.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shared::models::settings::SettingsRecord;
use tokio::sync::{Notify, RwLock, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::{ClientConfig, ClientResult, HttpClient};

/// Where the sync handle reads settings from
#[async_trait]
pub trait SettingsSource: Send + Sync + 'static {
    async fn fetch(&self) -> ClientResult<SettingsRecord>;
}

#[async_trait]
impl SettingsSource for HttpClient {
    async fn fetch(&self) -> ClientResult<SettingsRecord> {
        self.fetch_settings().await.map(|envelope| envelope.settings)
    }
}

/// What a UI binds to
#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub settings: Option<SettingsRecord>,
    pub is_loading: bool,
}

impl SyncState {
    fn initial() -> Self {
        Self {
            settings: None,
            is_loading: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Apply {
    /// Cache-warm only once settings are populated
    Poll,
    /// Authoritative replace
    Replace,
}

struct Inner<S> {
    source: S,
    state: watch::Sender<SyncState>,
    cache: RwLock<Option<SettingsRecord>>,
    refetch: Notify,
}

impl<S: SettingsSource> Inner<S> {
    async fn load(&self, apply: Apply) -> ClientResult<SettingsRecord> {
        let record = match self.source.fetch().await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    transient = e.is_transient(),
                    ?apply,
                    "Settings fetch failed"
                );
                return Err(e);
            }
        };

        *self.cache.write().await = Some(record.clone());

        self.state.send_if_modified(|state| {
            let keep = apply == Apply::Poll && state.settings.is_some();
            let unchanged = !state.is_loading && state.settings.as_ref() == Some(&record);
            if keep || unchanged {
                return false;
            }
            state.settings = Some(record.clone());
            state.is_loading = false;
            true
        });

        Ok(record)
    }
}

/// Handle to a running settings sync
///
/// Dropping the handle stops the poll loop.
pub struct SettingsSync<S: SettingsSource> {
    inner: Arc<Inner<S>>,
    cancel: CancellationToken,
}

impl<S: SettingsSource> SettingsSync<S> {
    /// Start polling `source` every `poll_interval`; the first read happens
    /// immediately
    pub fn spawn(source: S, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(SyncState::initial());
        let inner = Arc::new(Inner {
            source,
            state,
            cache: RwLock::new(None),
            refetch: Notify::new(),
        });
        let cancel = CancellationToken::new();

        tokio::spawn(run(inner.clone(), poll_interval, cancel.clone()));

        Self { inner, cancel }
    }

    /// Read now and replace `settings` with the result
    pub async fn refetch(&self) -> ClientResult<SettingsRecord> {
        self.inner.load(Apply::Replace).await
    }

    /// Signal that settings were changed elsewhere (e.g. saved from another tab)
    pub fn notify_updated(&self) {
        self.inner.refetch.notify_one();
    }

    pub fn snapshot(&self) -> SyncState {
        self.inner.state.borrow().clone()
    }

    pub fn settings(&self) -> Option<SettingsRecord> {
        self.inner.state.borrow().settings.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    /// Latest successful read, including poll results not yet applied
    pub async fn cached(&self) -> Option<SettingsRecord> {
        self.inner.cache.read().await.clone()
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl SettingsSync<HttpClient> {
    /// Poll the settings API at `config.poll_interval`
    pub fn connect(config: &ClientConfig) -> ClientResult<Self> {
        let client = config.build_http_client()?;
        Ok(Self::spawn(client, config.poll_interval))
    }
}

impl<S: SettingsSource> Drop for SettingsSync<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<S: SettingsSource>(
    inner: Arc<Inner<S>>,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let apply = tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => Apply::Poll,
            _ = inner.refetch.notified() => Apply::Replace,
        };

        tokio::select! {
            _ = cancel.cancelled() => break,
            // Errors are logged in load
            _ = inner.load(apply) => {}
        }
    }

    tracing::debug!("Settings sync stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientError;
    use shared::models::settings::SettingValue;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const POLL: Duration = Duration::from_secs(30);

    #[derive(Clone, Default)]
    struct FakeSource {
        current: Arc<Mutex<SettingsRecord>>,
        fail: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeSource {
        fn with_name(name: &str) -> Self {
            let source = Self::default();
            source.set_name(name);
            source
        }

        fn set_name(&self, name: &str) {
            self.current
                .lock()
                .unwrap()
                .insert("websiteName".to_string(), SettingValue::from(name));
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SettingsSource for FakeSource {
        async fn fetch(&self) -> ClientResult<SettingsRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ClientError::Internal("unavailable".to_string()));
            }
            Ok(self.current.lock().unwrap().clone())
        }
    }

    fn name_of(record: &Option<SettingsRecord>) -> Option<String> {
        record
            .as_ref()
            .and_then(|r| r.get("websiteName"))
            .and_then(SettingValue::as_str)
            .map(str::to_string)
    }

    async fn loaded<S: SettingsSource>(sync: &SettingsSync<S>) {
        sync.subscribe()
            .wait_for(|state| !state.is_loading)
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_then_loaded() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);

        assert_eq!(sync.snapshot(), SyncState::initial());

        loaded(&sync).await;
        assert!(!sync.is_loading());
        assert_eq!(name_of(&sync.settings()), Some("v1".to_string()));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_only_warms_cache() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);
        loaded(&sync).await;

        source.set_name("v2");
        tokio::time::sleep(POLL + Duration::from_secs(1)).await;

        assert_eq!(source.calls(), 2);
        assert_eq!(name_of(&sync.cached().await), Some("v2".to_string()));
        assert_eq!(name_of(&sync.settings()), Some("v1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetch_replaces_settings() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);
        loaded(&sync).await;

        source.set_name("v2");
        let record = sync.refetch().await.unwrap();

        assert_eq!(name_of(&Some(record)), Some("v2".to_string()));
        assert_eq!(name_of(&sync.settings()), Some("v2".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_signal_replaces_settings() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);
        loaded(&sync).await;

        source.set_name("v3");
        sync.notify_updated();

        let mut rx = sync.subscribe();
        rx.wait_for(|state| name_of(&state.settings).as_deref() == Some("v3"))
            .await
            .unwrap();
        assert_eq!(name_of(&sync.cached().await), Some("v3".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refetch_keeps_state() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);
        loaded(&sync).await;
        let before = sync.snapshot();

        source.fail.store(true, Ordering::SeqCst);
        source.set_name("v2");

        assert!(sync.refetch().await.is_err());
        assert_eq!(sync.snapshot(), before);
        assert_eq!(name_of(&sync.cached().await), Some("v1".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_success_after_failures_populates() {
        let source = FakeSource::with_name("v1");
        source.fail.store(true, Ordering::SeqCst);
        let sync = SettingsSync::spawn(source.clone(), POLL);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(source.calls(), 1);
        assert_eq!(sync.snapshot(), SyncState::initial());

        source.fail.store(false, Ordering::SeqCst);
        loaded(&sync).await;
        assert_eq!(name_of(&sync.settings()), Some("v1".to_string()));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_polling() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);
        loaded(&sync).await;
        let calls = source.calls();

        drop(sync);
        tokio::time::sleep(POLL * 10).await;

        assert_eq!(source.calls(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_polling() {
        let source = FakeSource::with_name("v1");
        let sync = SettingsSync::spawn(source.clone(), POLL);
        loaded(&sync).await;

        sync.shutdown();
        tokio::time::sleep(POLL * 10).await;

        assert_eq!(source.calls(), 1);
    }
}
