//! Terminal client for fall-detection alerts, built on the same alert channel
//! as the browser client.

pub mod app;
pub mod cli;
pub mod terminal;
pub mod timer;
pub mod transport;

pub use app::{watch, WatchOptions};
pub use cli::Cli;
pub use terminal::TerminalView;
pub use timer::TokioTimer;
pub use transport::TungsteniteTransport;
