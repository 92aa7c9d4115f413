use thiserror::Error;

/// Errors raised while turning an inbound frame into an [`crate::AlertEvent`].
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Payload is not a JSON object")]
    NotAnObject,

    #[error("Payload has no string \"type\" field")]
    MissingType,

    #[error("Malformed {kind} payload: {source}")]
    Malformed {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors surfaced by [`crate::AlertChannel`] operations.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Cannot send message: connection is not open")]
    NotConnected,

    #[error("Failed to serialize outbound message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid endpoint: {0}")]
    Endpoint(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid value for {var}: {value}")]
    InvalidEnv { var: String, value: String },
}

pub type Result<T, E = ChannelError> = std::result::Result<T, E>;
