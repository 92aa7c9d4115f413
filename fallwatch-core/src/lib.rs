//! Core of the fallwatch alert client.
//!
//! Host-agnostic pieces shared by the browser and terminal clients: the
//! [`AlertChannel`] state machine, inbound event decoding, endpoint assembly
//! and configuration.

pub mod channel;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod view;

pub use channel::{
    AlertChannel, CloseInfo, ConnectionListeners, ConnectionState, ReconnectTimer, SharedChannel,
    Transport,
};
pub use config::ChannelConfig;
pub use endpoint::{Endpoint, Scheme};
pub use error::{ChannelError, ConfigError, DecodeError};
pub use event::{decode, AlertEvent, FallDetection, Inbound};
pub use view::{AlertPanel, AlertView, DesktopNotification, NotificationPermission};
