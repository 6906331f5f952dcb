//! Configuration Module
//!
//! Configuration loading and dependency injection for the stream client.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_BASE_URL, FeedConfig, FeedSettings, RetentionSettings, ServerSettings,
};
