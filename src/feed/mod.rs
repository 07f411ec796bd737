//! Live feed: real-time channel, wire messages and shared feed state

pub mod connector;
pub mod controller;
pub mod messages;
pub mod store;

#[cfg(feature = "websocket")]
pub use connector::WebSocketConnector;
pub use connector::{Connector, FeedConnection};
pub use controller::{apply_message, FeedPhase, LiveFeedController};
pub use messages::{
    BarMessage, CommandAction, ErrorMessage, EventMessage, ReplayMode, ReplayStatus,
    SnapshotMessage, WsCommand, WsServerMessage,
};
pub use store::{FeedState, FeedStore, StoreUpdate};
