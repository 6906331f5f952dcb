//! Connection Supervisor
//!
//! Drives the feed connection state machine on top of a [`Transport`]:
//!
//! ```text
//!                start()
//! Disconnected ──────────► Connecting ──Opened──► Connected
//!      ▲                       │                     │
//!      │                     Error                 Error
//!      │                       ▼                     ▼
//!      └────────Closed──────── Errored ◄─────────────┘
//! ```
//!
//! Any `Closed` event moves to `Disconnected`. A close with a code other
//! than 1000 that we did not initiate schedules one reconnect after a fixed
//! delay. The pending reconnect is a cancelable timer task; [`stop`]
//! cancels it and closes the live session normally.
//!
//! Every entry point runs under one mutex, and each session's events are
//! consumed by a single dispatch task, so transitions never interleave.
//!
//! [`stop`]: ConnectionSupervisor::stop

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::ports::{
    CloseReason, SupervisorStats, Transport, TransportEvent, TransportSession,
};
use crate::domain::streaming::ConnectionState;
use crate::infrastructure::feed::codec::JsonCodec;
use crate::infrastructure::feed::messages::ConfigFrame;
use crate::infrastructure::feed::reconnect::{ReconnectConfig, ReconnectPolicy};
use crate::infrastructure::feed::router::MessageRouter;
use crate::infrastructure::metrics;

/// Default client identifier prefix.
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "stream-client";

// =============================================================================
// Configuration
// =============================================================================

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Feed endpoint; the client identifier is appended as the last path
    /// segment.
    pub base_url: String,
    /// Prefix for generated client identifiers.
    pub client_id_prefix: String,
    /// Frame sent once after each session opens.
    pub config_frame: ConfigFrame,
    /// Reconnection timing.
    pub reconnect: ReconnectConfig,
}

impl SupervisorConfig {
    /// Create a configuration for `base_url` with default settings.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
            config_frame: ConfigFrame::default(),
            reconnect: ReconnectConfig::default(),
        }
    }

    /// Connection URL for a client identifier.
    #[must_use]
    pub fn session_url(&self, client_id: &str) -> String {
        format!("{}/{client_id}", self.base_url.trim_end_matches('/'))
    }
}

/// Generate a client identifier unique to one connection attempt.
///
/// Format: `<prefix>-<unix millis>-<8 hex chars>`.
#[must_use]
pub fn generate_client_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{prefix}-{}-{}",
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

// =============================================================================
// Supervisor
// =============================================================================

struct ActiveSession<S> {
    id: u64,
    handle: S,
    client_id: String,
    closing: bool,
}

struct PendingReconnect {
    id: u64,
    token: CancellationToken,
}

struct Inner<S> {
    state: ConnectionState,
    stopped: bool,
    session: Option<ActiveSession<S>>,
    pending_reconnect: Option<PendingReconnect>,
    next_id: u64,
    policy: ReconnectPolicy,
    stats: SupervisorStats,
}

struct Shared<T: Transport> {
    transport: T,
    router: MessageRouter,
    codec: JsonCodec,
    config: SupervisorConfig,
    inner: Mutex<Inner<T::Session>>,
    state_tx: watch::Sender<ConnectionState>,
}

/// Owner of the feed connection lifecycle.
///
/// Cloning yields another handle to the same supervisor.
pub struct ConnectionSupervisor<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for ConnectionSupervisor<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> std::fmt::Debug for ConnectionSupervisor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("base_url", &self.shared.config.base_url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: Transport> ConnectionSupervisor<T> {
    /// Create a supervisor in the `Disconnected` state.
    #[must_use]
    pub fn new(transport: T, router: MessageRouter, config: SupervisorConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let policy = ReconnectPolicy::new(config.reconnect);
        Self {
            shared: Arc::new(Shared {
                transport,
                router,
                codec: JsonCodec::new(),
                config,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    stopped: false,
                    session: None,
                    pending_reconnect: None,
                    next_id: 0,
                    policy,
                    stats: SupervisorStats::default(),
                }),
                state_tx,
            }),
        }
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.inner.lock().state
    }

    /// Observe connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Counters since construction.
    #[must_use]
    pub fn stats(&self) -> SupervisorStats {
        self.shared.inner.lock().stats
    }

    /// Client identifier of the live session, if any.
    #[must_use]
    pub fn client_id(&self) -> Option<String> {
        self.shared
            .inner
            .lock()
            .session
            .as_ref()
            .map(|s| s.client_id.clone())
    }

    /// Whether [`stop`](Self::stop) was called and no start has followed.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.inner.lock().stopped
    }

    /// Whether a reconnect is currently scheduled.
    #[must_use]
    pub fn reconnect_pending(&self) -> bool {
        self.shared.inner.lock().pending_reconnect.is_some()
    }

    /// Open a session unless one is already connecting or connected.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut inner = self.shared.inner.lock();
        self.start_locked(&mut inner);
    }

    /// Close the live session normally and cancel any pending reconnect.
    pub fn stop(&self) {
        let mut inner = self.shared.inner.lock();
        inner.stopped = true;

        if let Some(pending) = inner.pending_reconnect.take() {
            pending.token.cancel();
            debug!("Cancelled pending reconnect");
        }

        if let Some(session) = inner.session.as_mut() {
            if !session.closing {
                session.closing = true;
                info!(client_id = %session.client_id, "Closing feed session");
                session.handle.close(CloseReason::NORMAL, "client stopped");
            }
        } else {
            self.set_state(&mut inner, ConnectionState::Disconnected);
        }
    }

    fn start_locked(&self, inner: &mut Inner<T::Session>) {
        if inner.state.is_active() || inner.session.is_some() {
            debug!(state = %inner.state, "Session already live, ignoring start");
            return;
        }

        if let Some(pending) = inner.pending_reconnect.take() {
            pending.token.cancel();
        }
        inner.stopped = false;

        let config = &self.shared.config;
        let client_id = generate_client_id(&config.client_id_prefix);
        let url = config.session_url(&client_id);

        self.set_state(inner, ConnectionState::Connecting);
        inner.next_id += 1;
        let session_id = inner.next_id;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        match self.shared.transport.connect(&url, events_tx) {
            Ok(handle) => {
                info!(client_id = %client_id, url = %url, "Connecting to feed");
                inner.session = Some(ActiveSession {
                    id: session_id,
                    handle,
                    client_id,
                    closing: false,
                });
                tokio::spawn(self.clone().dispatch(session_id, events_rx));
            }
            Err(e) => {
                error!(url = %url, error = %e, "Failed to open feed session");
                self.set_state(inner, ConnectionState::Errored);
            }
        }
    }

    async fn dispatch(self, session_id: u64, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            let closed = matches!(event, TransportEvent::Closed(_));
            self.handle_event(session_id, event);
            if closed {
                return;
            }
        }

        // Transport went away without reporting a close.
        self.handle_event(
            session_id,
            TransportEvent::Closed(CloseReason::abnormal("event channel closed")),
        );
    }

    fn handle_event(&self, session_id: u64, event: TransportEvent) {
        let mut inner = self.shared.inner.lock();

        if inner.session.as_ref().is_none_or(|s| s.id != session_id) {
            debug!(session_id, "Ignoring event from stale session");
            return;
        }

        match event {
            TransportEvent::Opened => self.on_opened(&mut inner),
            TransportEvent::Frame(text) => match self.shared.router.route(&text) {
                Ok(_) => inner.stats.frames_routed += 1,
                Err(_) => inner.stats.frames_discarded += 1,
            },
            TransportEvent::UndecodableFrame(len) => {
                warn!(len, reason = "malformed", "Discarding non-UTF-8 feed frame");
                metrics::record_frame_discarded("malformed");
                inner.stats.frames_discarded += 1;
            }
            TransportEvent::Error(message) => {
                warn!(error = %message, "Feed transport error");
                self.set_state(&mut inner, ConnectionState::Errored);
            }
            TransportEvent::Closed(reason) => self.on_closed(&mut inner, &reason),
        }
    }

    fn on_opened(&self, inner: &mut Inner<T::Session>) {
        self.set_state(inner, ConnectionState::Connected);
        inner.policy.reset();
        inner.stats.sessions_opened += 1;

        let frame = self.shared.config.config_frame;
        let text = match self.shared.codec.encode_config(&frame) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to encode config frame");
                return;
            }
        };

        let Some(session) = inner.session.as_ref() else {
            return;
        };
        match session.handle.send(text) {
            Ok(()) => {
                inner.stats.config_frames_sent += 1;
                metrics::record_config_frame_sent();
                info!(
                    client_id = %session.client_id,
                    frequency = frame.frequency,
                    volatility = frame.volatility,
                    "Feed connected, config sent"
                );
            }
            Err(e) => warn!(error = %e, "Failed to send config frame"),
        }
    }

    fn on_closed(&self, inner: &mut Inner<T::Session>, reason: &CloseReason) {
        let closing = inner.session.take().is_some_and(|s| s.closing);
        self.set_state(inner, ConnectionState::Disconnected);

        if reason.is_normal() || closing {
            info!(code = reason.code, reason = %reason.reason, "Feed session closed");
            return;
        }

        warn!(code = reason.code, reason = %reason.reason, "Feed session closed abnormally");
        self.schedule_reconnect(inner);
    }

    fn schedule_reconnect(&self, inner: &mut Inner<T::Session>) {
        if let Some(previous) = inner.pending_reconnect.take() {
            previous.token.cancel();
        }

        let delay = inner.policy.next_delay();
        inner.next_id += 1;
        let reconnect_id = inner.next_id;
        let token = CancellationToken::new();
        inner.pending_reconnect = Some(PendingReconnect {
            id: reconnect_id,
            token: token.clone(),
        });
        inner.stats.reconnects_scheduled += 1;
        metrics::record_reconnect_scheduled();

        #[allow(clippy::cast_possible_truncation)]
        let delay_ms = delay.as_millis() as u64;
        info!(
            attempt = inner.policy.attempt_count(),
            delay_ms, "Scheduling reconnect"
        );

        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => this.fire_reconnect(reconnect_id),
            }
        });
    }

    fn fire_reconnect(&self, reconnect_id: u64) {
        let mut inner = self.shared.inner.lock();
        if inner
            .pending_reconnect
            .as_ref()
            .is_none_or(|p| p.id != reconnect_id)
        {
            return;
        }
        inner.pending_reconnect = None;
        self.start_locked(&mut inner);
    }

    fn set_state(&self, inner: &mut Inner<T::Session>, next: ConnectionState) {
        if inner.state == next {
            return;
        }
        debug!(from = %inner.state, to = %next, "Connection state change");
        inner.state = next;
        self.shared.state_tx.send_replace(next);
        metrics::set_connection_state(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::TransportError;
    use crate::domain::retention::Aggregator;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeState {
        urls: Vec<String>,
        events: Vec<mpsc::UnboundedSender<TransportEvent>>,
        sent: Vec<(usize, String)>,
        closes: Vec<(usize, u16)>,
        fail_connect: bool,
    }

    #[derive(Clone, Default)]
    struct FakeTransport {
        state: Arc<Mutex<FakeState>>,
    }

    struct FakeSession {
        index: usize,
        state: Arc<Mutex<FakeState>>,
    }

    impl Transport for FakeTransport {
        type Session = FakeSession;

        fn connect(
            &self,
            url: &str,
            events: mpsc::UnboundedSender<TransportEvent>,
        ) -> Result<FakeSession, TransportError> {
            let mut state = self.state.lock();
            if state.fail_connect {
                return Err(TransportError::InvalidEndpoint {
                    url: url.to_string(),
                    reason: "refused".to_string(),
                });
            }
            state.urls.push(url.to_string());
            state.events.push(events);
            Ok(FakeSession {
                index: state.urls.len() - 1,
                state: Arc::clone(&self.state),
            })
        }
    }

    impl TransportSession for FakeSession {
        fn send(&self, text: String) -> Result<(), TransportError> {
            self.state.lock().sent.push((self.index, text));
            Ok(())
        }

        fn close(&self, code: u16, _reason: &str) {
            self.state.lock().closes.push((self.index, code));
        }
    }

    impl FakeTransport {
        fn emit(&self, session: usize, event: TransportEvent) {
            let _ = self.state.lock().events[session].send(event);
        }

        fn connects(&self) -> usize {
            self.state.lock().urls.len()
        }

        fn sent(&self) -> Vec<(usize, String)> {
            self.state.lock().sent.clone()
        }
    }

    fn supervisor(transport: &FakeTransport) -> ConnectionSupervisor<FakeTransport> {
        let router = MessageRouter::new(Arc::new(Aggregator::default()));
        ConnectionSupervisor::new(
            transport.clone(),
            router,
            SupervisorConfig::new("ws://feed.test/stream/"),
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_connects_with_client_id_in_url() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();

        assert_eq!(sup.state(), ConnectionState::Connecting);
        let urls = transport.state.lock().urls.clone();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("ws://feed.test/stream/stream-client-"));
        assert_eq!(
            urls[0].rsplit('/').next().map(str::to_string),
            sup.client_id()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_is_ignored_while_session_live() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        sup.start();
        transport.emit(0, TransportEvent::Opened);
        settle().await;
        sup.start();

        assert_eq!(transport.connects(), 1);
        assert_eq!(sup.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn open_sends_exactly_one_config_frame() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        for i in 0..5 {
            transport.emit(
                0,
                TransportEvent::Frame(format!(
                    r#"{{"type":"price_update","symbol":"S{i}","price":1}}"#
                )),
            );
        }
        settle().await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        let frame: serde_json::Value = serde_json::from_str(&sent[0].1).unwrap();
        assert_eq!(frame, serde_json::json!({"frequency": 1.0, "volatility": 0.02}));
        assert_eq!(sup.stats().config_frames_sent, 1);
        assert_eq!(sup.stats().frames_routed, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn each_open_gets_its_own_config_frame() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        settle().await;
        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("reset")));
        tokio::time::sleep(Duration::from_secs(6)).await;
        transport.emit(1, TransportEvent::Opened);
        settle().await;

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, 0);
        assert_eq!(sent[1].0, 1);
        assert_eq!(sup.stats().sessions_opened, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn normal_close_does_not_reconnect() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        transport.emit(0, TransportEvent::Closed(CloseReason::new(1000, "bye")));
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(!sup.reconnect_pending());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abnormal_close_reconnects_after_fixed_delay() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("")));
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.reconnect_pending());

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert_eq!(transport.connects(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(transport.connects(), 2);
        assert_eq!(sup.state(), ConnectionState::Connecting);

        let urls = transport.state.lock().urls.clone();
        assert_ne!(urls[0], urls[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_abnormal_closes_keep_retrying() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        for session in 0..4 {
            transport.emit(session, TransportEvent::Closed(CloseReason::new(1011, "")));
            tokio::time::sleep(Duration::from_millis(5_001)).await;
        }

        assert_eq!(transport.connects(), 5);
        assert_eq!(sup.stats().reconnects_scheduled, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn error_then_close_reconnects() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Error("handshake failed".to_string()));
        settle().await;
        assert_eq!(sup.state(), ConnectionState::Errored);
        assert!(!sup.reconnect_pending());

        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("")));
        settle().await;
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_reconnect() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("")));
        settle().await;
        assert!(sup.reconnect_pending());

        sup.stop();
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert!(!sup.reconnect_pending());
        assert_eq!(transport.connects(), 1);
        assert_eq!(sup.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_flag_tracks_deliberate_stop() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("")));
        settle().await;
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(!sup.is_stopped());

        sup.stop();
        assert!(sup.is_stopped());

        sup.start();
        assert!(!sup.is_stopped());
        assert_eq!(sup.state(), ConnectionState::Connecting);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_normally_and_suppresses_reconnect() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        settle().await;

        sup.stop();
        assert_eq!(transport.state.lock().closes, vec![(0, 1000)]);

        // Peer dropped instead of echoing the close.
        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("")));
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(!sup.reconnect_pending());
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(transport.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_failure_sets_errored_without_retry() {
        let transport = FakeTransport::default();
        transport.state.lock().fail_connect = true;
        let sup = supervisor(&transport);

        sup.start();

        assert_eq!(sup.state(), ConnectionState::Errored);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!sup.reconnect_pending());

        transport.state.lock().fail_connect = false;
        sup.start();
        assert_eq!(transport.connects(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn events_from_stale_session_are_ignored() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Closed(CloseReason::abnormal("")));
        tokio::time::sleep(Duration::from_millis(5_001)).await;
        assert_eq!(transport.connects(), 2);

        sup.handle_event(1, TransportEvent::Opened);
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Connecting);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_event_channel_is_treated_as_abnormal_close() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        settle().await;
        transport.state.lock().events.clear();
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn state_changes_are_observable() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);
        let mut rx = sup.subscribe_state();

        sup.start();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connecting);

        transport.emit(0, TransportEvent::Opened);
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_frames_are_counted_not_fatal() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        transport.emit(0, TransportEvent::Frame("garbage".to_string()));
        transport.emit(0, TransportEvent::Frame(r#"{"type":"news"}"#.to_string()));
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Connected);
        assert_eq!(sup.stats().frames_discarded, 2);
        assert_eq!(sup.stats().frames_routed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn undecodable_frames_count_as_discarded() {
        let transport = FakeTransport::default();
        let sup = supervisor(&transport);

        sup.start();
        transport.emit(0, TransportEvent::Opened);
        transport.emit(0, TransportEvent::UndecodableFrame(4));
        settle().await;

        assert_eq!(sup.state(), ConnectionState::Connected);
        assert_eq!(sup.stats().frames_discarded, 1);
    }

    #[test]
    fn client_ids_are_unique() {
        let a = generate_client_id("p");
        let b = generate_client_id("p");
        assert_ne!(a, b);
        assert!(a.starts_with("p-"));
    }

    #[test]
    fn session_url_joins_single_slash() {
        let config = SupervisorConfig::new("wss://mockly.me/ws/stream");
        assert_eq!(config.session_url("abc"), "wss://mockly.me/ws/stream/abc");
    }
}
