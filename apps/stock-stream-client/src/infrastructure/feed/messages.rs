//! Feed Wire Messages
//!
//! Wire format types for the stock price feed. Every inbound frame is a
//! single JSON object carrying a `type` discriminator; the one outbound
//! frame is the configuration sent after the session opens.
//!
//! # Inbound
//!
//! - `stock_info`: company metadata for a symbol
//! - `price_update`: latest traded price for a symbol
//!
//! # Outbound
//!
//! - [`ConfigFrame`]: `{"frequency": <float>, "volatility": <float>}`

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Discriminator value for metadata messages.
pub const STOCK_INFO_TYPE: &str = "stock_info";

/// Discriminator value for price messages.
pub const PRICE_UPDATE_TYPE: &str = "price_update";

// =============================================================================
// Inbound Messages
// =============================================================================

/// Company metadata for a symbol.
///
/// ```json
/// {"type":"stock_info","symbol":"AAPL","name":"Apple Inc.","industry":"Technology","timestamp":"2024-01-15T14:30:00Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockInfoMessage {
    /// Ticker symbol.
    pub symbol: String,
    /// Company name.
    #[serde(default)]
    pub name: Option<String>,
    /// Industry category.
    #[serde(default)]
    pub industry: Option<String>,
    /// Server timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Latest price for a symbol.
///
/// ```json
/// {"type":"price_update","symbol":"AAPL","price":190.52,"timestamp":"2024-01-15T14:30:01Z"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdateMessage {
    /// Ticker symbol.
    pub symbol: String,
    /// Traded price.
    pub price: Decimal,
    /// Server timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A decoded inbound feed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Company metadata.
    StockInfo(StockInfoMessage),
    /// Price update.
    PriceUpdate(PriceUpdateMessage),
}

impl FeedMessage {
    /// Symbol the message refers to.
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::StockInfo(m) => &m.symbol,
            Self::PriceUpdate(m) => &m.symbol,
        }
    }

    /// Wire discriminator of the message.
    #[must_use]
    pub const fn message_type(&self) -> &'static str {
        match self {
            Self::StockInfo(_) => STOCK_INFO_TYPE,
            Self::PriceUpdate(_) => PRICE_UPDATE_TYPE,
        }
    }
}

// =============================================================================
// Outbound Messages
// =============================================================================

/// Feed configuration sent once after each session opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigFrame {
    /// Updates per second requested from the feed.
    pub frequency: f64,
    /// Relative price volatility of the simulated feed.
    pub volatility: f64,
}

impl Default for ConfigFrame {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            volatility: 0.02,
        }
    }
}

// =============================================================================
// Timestamp Parsing
// =============================================================================

/// Parse a feed timestamp.
///
/// Accepts RFC 3339 and falls back to an ISO-8601 date-time without an
/// offset, which is read as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {s}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deserialize_stock_info() {
        let json = r#"{"type":"stock_info","symbol":"AAPL","name":"Apple Inc.","industry":"Technology","timestamp":"2024-01-15T14:30:00Z"}"#;
        let msg: StockInfoMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.symbol, "AAPL");
        assert_eq!(msg.name.as_deref(), Some("Apple Inc."));
        assert_eq!(msg.industry.as_deref(), Some("Technology"));
        assert_eq!(
            msg.timestamp,
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap())
        );
    }

    #[test]
    fn deserialize_stock_info_without_optional_fields() {
        let json = r#"{"type":"stock_info","symbol":"MSFT"}"#;
        let msg: StockInfoMessage = serde_json::from_str(json).unwrap();

        assert!(msg.name.is_none());
        assert!(msg.industry.is_none());
        assert!(msg.timestamp.is_none());
    }

    #[test]
    fn deserialize_price_update_from_float() {
        let json = r#"{"type":"price_update","symbol":"AAPL","price":190.52,"timestamp":"2024-01-15T14:30:01.250Z"}"#;
        let msg: PriceUpdateMessage = serde_json::from_str(json).unwrap();

        assert_eq!(msg.price, Decimal::new(19052, 2));
        assert!(msg.timestamp.is_some());
    }

    #[test]
    fn price_update_requires_price() {
        let json = r#"{"type":"price_update","symbol":"AAPL"}"#;
        assert!(serde_json::from_str::<PriceUpdateMessage>(json).is_err());
    }

    #[test]
    fn naive_timestamp_is_read_as_utc() {
        let ts = parse_timestamp("2024-01-15T14:30:00.123456").unwrap();
        assert_eq!(ts.timestamp(), 1_705_329_000);
    }

    #[test]
    fn offset_timestamp_is_normalized() {
        let ts = parse_timestamp("2024-01-15T09:30:00-05:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 14, 30, 0).unwrap());
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_timestamp("yesterday").is_none());
        let json = r#"{"symbol":"AAPL","price":1,"timestamp":"yesterday"}"#;
        assert!(serde_json::from_str::<PriceUpdateMessage>(json).is_err());
    }

    #[test]
    fn config_frame_wire_format() {
        let json = serde_json::to_value(ConfigFrame::default()).unwrap();
        assert_eq!(json, serde_json::json!({"frequency": 1.0, "volatility": 0.02}));
    }
}
