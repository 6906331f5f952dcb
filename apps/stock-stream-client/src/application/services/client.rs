//! Stream Client Service
//!
//! Composes the aggregator, message router and connection supervisor into
//! one owned client with explicit `start`/`stop`. Display collaborators get
//! the client as a [`FeedView`] and never see a mutable path.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::application::ports::{FeedStatus, FeedView, SupervisorStats, Transport};
use crate::domain::retention::{Aggregator, RetentionPolicy};
use crate::domain::streaming::{ConnectionState, StockRecord};
use crate::infrastructure::config::FeedConfig;
use crate::infrastructure::feed::router::MessageRouter;
use crate::infrastructure::feed::supervisor::{ConnectionSupervisor, SupervisorConfig};

/// Streaming stock client.
///
/// # Example
///
/// ```rust,no_run
/// use stock_stream_client::application::ports::FeedView;
/// use stock_stream_client::application::services::StreamClient;
/// use stock_stream_client::infrastructure::config::FeedConfig;
/// use stock_stream_client::infrastructure::feed::WsTransport;
///
/// # async fn run() {
/// let client = StreamClient::from_config(WsTransport::default(), &FeedConfig::default());
/// client.start();
///
/// for record in client.snapshot() {
///     println!("{} {:?}", record.symbol, record.price);
/// }
///
/// client.stop();
/// # }
/// ```
pub struct StreamClient<T: Transport> {
    aggregator: Arc<Aggregator>,
    supervisor: ConnectionSupervisor<T>,
}

impl<T: Transport> std::fmt::Debug for StreamClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamClient")
            .field("aggregator", &self.aggregator)
            .field("supervisor", &self.supervisor)
            .finish()
    }
}

impl<T: Transport> StreamClient<T> {
    /// Create a client around an existing aggregator.
    #[must_use]
    pub fn new(transport: T, aggregator: Arc<Aggregator>, config: SupervisorConfig) -> Self {
        let router = MessageRouter::new(Arc::clone(&aggregator));
        let supervisor = ConnectionSupervisor::new(transport, router, config);
        Self {
            aggregator,
            supervisor,
        }
    }

    /// Create a client from loaded settings.
    #[must_use]
    pub fn from_config(transport: T, config: &FeedConfig) -> Self {
        Self::new(
            transport,
            Arc::new(config.build_aggregator()),
            config.supervisor_config(),
        )
    }

    /// Open the feed session.
    pub fn start(&self) {
        self.supervisor.start();
    }

    /// Close the feed session and cancel any pending reconnect.
    pub fn stop(&self) {
        self.supervisor.stop();
    }

    /// Stop and wait up to `timeout` for the session to close.
    ///
    /// Returns `true` if the client reached `Disconnected` in time.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let mut state = self.supervisor.subscribe_state();
        self.stop();
        tokio::time::timeout(
            timeout,
            state.wait_for(|s| *s == ConnectionState::Disconnected),
        )
        .await
        .is_ok_and(|r| r.is_ok())
    }

    /// Observe connection state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.supervisor.subscribe_state()
    }

    /// The retained record store.
    #[must_use]
    pub const fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// The connection supervisor.
    #[must_use]
    pub const fn supervisor(&self) -> &ConnectionSupervisor<T> {
        &self.supervisor
    }
}

impl<T: Transport> FeedView for StreamClient<T> {
    fn snapshot(&self) -> Vec<StockRecord> {
        self.aggregator.snapshot()
    }

    fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }
}

impl<T: Transport> FeedStatus for StreamClient<T> {
    fn stats(&self) -> SupervisorStats {
        self.supervisor.stats()
    }

    fn retention_capacity(&self) -> usize {
        self.aggregator.capacity()
    }

    fn retention_policy(&self) -> RetentionPolicy {
        self.aggregator.policy()
    }

    fn is_stopped(&self) -> bool {
        self.supervisor.is_stopped()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{
        CloseReason, TransportError, TransportEvent, TransportSession,
    };
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use tokio::sync::mpsc;

    #[derive(Clone, Default)]
    struct LoopbackTransport {
        events: Arc<Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>>,
    }

    struct LoopbackSession {
        events: mpsc::UnboundedSender<TransportEvent>,
    }

    impl Transport for LoopbackTransport {
        type Session = LoopbackSession;

        fn connect(
            &self,
            _url: &str,
            events: mpsc::UnboundedSender<TransportEvent>,
        ) -> Result<LoopbackSession, TransportError> {
            self.events.lock().push(events.clone());
            Ok(LoopbackSession { events })
        }
    }

    impl TransportSession for LoopbackSession {
        fn send(&self, _text: String) -> Result<(), TransportError> {
            Ok(())
        }

        fn close(&self, code: u16, reason: &str) {
            let _ = self
                .events
                .send(TransportEvent::Closed(CloseReason::new(code, reason)));
        }
    }

    impl LoopbackTransport {
        fn emit(&self, event: TransportEvent) {
            if let Some(tx) = self.events.lock().last() {
                let _ = tx.send(event);
            }
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn feed_view_reflects_routed_frames() {
        let transport = LoopbackTransport::default();
        let client = StreamClient::from_config(transport.clone(), &FeedConfig::default());

        client.start();
        transport.emit(TransportEvent::Opened);
        transport.emit(TransportEvent::Frame(
            r#"{"type":"stock_info","symbol":"AAA","name":"Alpha","timestamp":"2024-01-15T14:30:00Z"}"#.to_string(),
        ));
        transport.emit(TransportEvent::Frame(
            r#"{"type":"price_update","symbol":"AAA","price":10.5,"timestamp":"2024-01-15T14:30:01Z"}"#.to_string(),
        ));
        settle().await;

        let view: &dyn FeedStatus = &client;
        assert_eq!(view.connection_state(), ConnectionState::Connected);
        assert_eq!(view.retention_capacity(), 10);
        assert_eq!(view.retention_policy(), RetentionPolicy::Reference);
        assert!(!view.is_stopped());
        assert_eq!(view.stats().frames_routed, 2);

        let snapshot = view.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display_name.as_deref(), Some("Alpha"));
        assert_eq!(snapshot[0].price, Some(Decimal::new(105, 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_waits_for_disconnect() {
        let transport = LoopbackTransport::default();
        let client = StreamClient::from_config(transport.clone(), &FeedConfig::default());

        client.start();
        transport.emit(TransportEvent::Opened);
        settle().await;

        assert!(client.shutdown(Duration::from_secs(1)).await);
        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert!(client.is_stopped());
        assert!(!client.supervisor().reconnect_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_survives_disconnect() {
        let transport = LoopbackTransport::default();
        let client = StreamClient::from_config(transport.clone(), &FeedConfig::default());

        client.start();
        transport.emit(TransportEvent::Opened);
        transport.emit(TransportEvent::Frame(
            r#"{"type":"price_update","symbol":"AAA","price":1}"#.to_string(),
        ));
        transport.emit(TransportEvent::Closed(CloseReason::abnormal("")));
        settle().await;

        assert_eq!(client.connection_state(), ConnectionState::Disconnected);
        assert_eq!(client.snapshot().len(), 1);
    }
}
