//! Message Router
//!
//! Decodes each inbound frame and applies it to the aggregator. Frames are
//! routed one at a time in arrival order by the supervisor's dispatch task.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::domain::retention::{Aggregator, UpsertKind, UpsertOutcome};
use crate::infrastructure::feed::codec::{CodecError, JsonCodec};
use crate::infrastructure::feed::messages::FeedMessage;
use crate::infrastructure::metrics;

/// Result of routing one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteOutcome {
    /// Symbol the frame referred to.
    pub symbol: String,
    /// Wire discriminator of the frame.
    pub message_type: &'static str,
    /// What the aggregator did with it.
    pub upsert: UpsertOutcome,
}

/// Routes decoded feed messages into the aggregator.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    codec: JsonCodec,
    aggregator: Arc<Aggregator>,
}

impl MessageRouter {
    /// Create a router that writes into `aggregator`.
    #[must_use]
    pub const fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            codec: JsonCodec::new(),
            aggregator,
        }
    }

    /// The aggregator this router writes into.
    #[must_use]
    pub const fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    /// Decode and apply one raw frame.
    ///
    /// A frame without a timestamp is stamped with the receive time.
    ///
    /// # Errors
    ///
    /// Returns the codec error for malformed or unknown frames. The
    /// aggregator is left untouched in that case.
    pub fn route(&self, raw: &str) -> Result<RouteOutcome, CodecError> {
        let message = match self.codec.decode(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!(reason = e.discard_reason(), error = %e, "Discarding feed frame");
                metrics::record_frame_discarded(e.discard_reason());
                return Err(e);
            }
        };

        let message_type = message.message_type();
        metrics::record_frame_received(message_type);

        let (symbol, upsert) = match message {
            FeedMessage::StockInfo(m) => {
                let at = m.timestamp.unwrap_or_else(Utc::now);
                let upsert = self.aggregator.upsert_metadata(&m.symbol, m.name, m.industry, at);
                (m.symbol, upsert)
            }
            FeedMessage::PriceUpdate(m) => {
                let at = m.timestamp.unwrap_or_else(Utc::now);
                let upsert = self.aggregator.upsert_price(&m.symbol, m.price, at);
                (m.symbol, upsert)
            }
        };

        if upsert.kind == UpsertKind::Dropped {
            debug!(symbol = %symbol, message_type, "Retention list full, symbol dropped");
            metrics::record_dropped_by_capacity(1);
        }
        if !upsert.evicted.is_empty() {
            debug!(evicted = ?upsert.evicted, "Truncated retention list");
            metrics::record_dropped_by_capacity(upsert.evicted.len());
        }
        metrics::set_retained_records(self.aggregator.len());

        Ok(RouteOutcome {
            symbol,
            message_type,
            upsert,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn router() -> MessageRouter {
        MessageRouter::new(Arc::new(Aggregator::default()))
    }

    #[test]
    fn routes_metadata_and_price_into_one_record() {
        let router = router();
        router
            .route(r#"{"type":"stock_info","symbol":"AAA","name":"Alpha","timestamp":"2024-01-15T14:30:00Z"}"#)
            .unwrap();
        let outcome = router
            .route(r#"{"type":"price_update","symbol":"AAA","price":10.5,"timestamp":"2024-01-15T14:30:01Z"}"#)
            .unwrap();

        assert_eq!(outcome.symbol, "AAA");
        assert_eq!(outcome.message_type, "price_update");
        assert_eq!(outcome.upsert.kind, UpsertKind::Updated);

        let snapshot = router.aggregator().snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].display_name.as_deref(), Some("Alpha"));
        assert_eq!(snapshot[0].price, Some(Decimal::new(105, 1)));
    }

    #[test]
    fn malformed_frame_leaves_state_untouched() {
        let router = router();
        router
            .route(r#"{"type":"price_update","symbol":"AAA","price":1}"#)
            .unwrap();
        let before = router.aggregator().snapshot();

        assert!(router.route("{not json").is_err());
        assert!(router.route(r#"{"type":"trade","symbol":"BBB"}"#).is_err());
        assert!(router.route(r#"{"type":"price_update","symbol":"AAA"}"#).is_err());

        assert_eq!(router.aggregator().snapshot(), before);
    }

    #[test]
    fn out_of_range_price_is_its_own_discard_reason() {
        let router = router();
        let err = router
            .route(r#"{"type":"price_update","symbol":"BIG","price":1e30,"timestamp":"2024-01-15T14:30:00Z"}"#)
            .unwrap_err();

        assert!(matches!(err, CodecError::PriceOutOfRange(_)));
        assert_eq!(err.discard_reason(), "out_of_range");
        assert!(router.aggregator().is_empty());
    }

    #[test]
    fn missing_timestamp_uses_receive_time() {
        let router = router();
        let before = Utc::now();
        router
            .route(r#"{"type":"price_update","symbol":"AAA","price":1}"#)
            .unwrap();

        assert!(router.aggregator().snapshot()[0].observed_at >= before);
    }

    #[test]
    fn full_list_reports_dropped_symbol() {
        let router = router();
        for i in 0..10 {
            router
                .route(&format!(r#"{{"type":"price_update","symbol":"S{i}","price":{i}}}"#))
                .unwrap();
        }

        let outcome = router
            .route(r#"{"type":"price_update","symbol":"LATE","price":1}"#)
            .unwrap();

        assert_eq!(outcome.upsert.kind, UpsertKind::Dropped);
        assert!(!router.aggregator().contains("LATE"));
    }
}
