//! Stock Feed Adapters
//!
//! Client side of the streaming stock price feed:
//!
//! - **messages**: wire types for inbound updates and the outbound config frame
//! - **codec**: JSON classification by the `type` discriminator
//! - **router**: applies decoded messages to the aggregator
//! - **reconnect**: fixed-delay reconnection policy
//! - **supervisor**: connection state machine
//! - **transport**: tokio-tungstenite WebSocket adapter

pub mod codec;
pub mod messages;
pub mod reconnect;
pub mod router;
pub mod supervisor;
pub mod transport;

pub use codec::{CodecError, JsonCodec};
pub use messages::{ConfigFrame, FeedMessage, PriceUpdateMessage, StockInfoMessage};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use router::{MessageRouter, RouteOutcome};
pub use supervisor::{ConnectionSupervisor, SupervisorConfig, generate_client_id};
pub use transport::{WsSession, WsTransport, WsTransportConfig};
