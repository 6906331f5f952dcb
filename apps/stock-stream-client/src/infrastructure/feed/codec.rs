//! Feed Codec
//!
//! JSON decoding of inbound feed frames and encoding of the outbound
//! configuration frame. Classification reads the `type` discriminator
//! before deserializing the concrete message.

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::infrastructure::feed::messages::{
    ConfigFrame, FeedMessage, PRICE_UPDATE_TYPE, PriceUpdateMessage, STOCK_INFO_TYPE,
    StockInfoMessage,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `type` discriminator is not one we handle.
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// The frame carries no string `type` discriminator.
    #[error("missing message type")]
    MissingType,

    /// A field is present but unusable.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// A numeric price that no decimal price can represent.
    #[error("price out of range: {0}")]
    PriceOutOfRange(f64),
}

impl CodecError {
    /// Discard reason used for logging and metrics.
    #[must_use]
    pub const fn discard_reason(&self) -> &'static str {
        match self {
            Self::Json(_) | Self::InvalidField(_) => "malformed",
            Self::UnknownMessageType(_) | Self::MissingType => "unknown_type",
            Self::PriceOutOfRange(_) => "out_of_range",
        }
    }
}

/// JSON codec for the stock price feed.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not valid JSON, has a missing or
    /// unknown `type`, or carries an unusable field.
    pub fn decode(&self, text: &str) -> Result<FeedMessage, CodecError> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        let message = match value.get("type").and_then(|v| v.as_str()) {
            Some(STOCK_INFO_TYPE) => {
                let m: StockInfoMessage = serde_json::from_value(value)?;
                FeedMessage::StockInfo(m)
            }
            Some(PRICE_UPDATE_TYPE) => {
                check_price_range(&value)?;
                let m: PriceUpdateMessage = serde_json::from_value(value)?;
                FeedMessage::PriceUpdate(m)
            }
            Some(other) => return Err(CodecError::UnknownMessageType(other.to_string())),
            None => return Err(CodecError::MissingType),
        };

        if message.symbol().trim().is_empty() {
            return Err(CodecError::InvalidField("symbol is empty".to_string()));
        }

        Ok(message)
    }

    /// Encode the configuration frame.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode_config(&self, frame: &ConfigFrame) -> Result<String, CodecError> {
        Ok(serde_json::to_string(frame)?)
    }
}

/// Reject numeric prices beyond the decimal range before deserializing,
/// so they are not reported as malformed.
fn check_price_range(value: &serde_json::Value) -> Result<(), CodecError> {
    match value.get("price").and_then(serde_json::Value::as_f64) {
        Some(price) if Decimal::from_f64(price).is_none() => Err(CodecError::PriceOutOfRange(price)),
        _ => Ok(()),
    }
}
