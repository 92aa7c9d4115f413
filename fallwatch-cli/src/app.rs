use anyhow::Result;
use fallwatch_core::{AlertChannel, ChannelConfig, ConnectionState, Endpoint};
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::LocalSet;
use tracing::{error, info, warn};

use crate::terminal::TerminalView;
use crate::timer::TokioTimer;
use crate::transport::TungsteniteTransport;

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub endpoint: Endpoint,
    pub user_id: String,
    pub config: ChannelConfig,
    pub bell: bool,
    pub send: Option<serde_json::Value>,
}

/// Watch alerts until Ctrl-C or until the reconnect budget runs out.
pub async fn watch(options: WatchOptions) -> Result<()> {
    LocalSet::new().run_until(run(options)).await
}

async fn run(options: WatchOptions) -> Result<()> {
    let WatchOptions {
        endpoint,
        user_id,
        config,
        bell,
        mut send,
    } = options;
    let max_attempts = config.max_reconnect_attempts;

    let channel = AlertChannel::new(
        user_id,
        endpoint,
        config,
        TungsteniteTransport::new(),
        TokioTimer::default(),
        TerminalView::new(std::io::stdout(), bell),
    );

    let (state_tx, mut state_rx) = mpsc::unbounded_channel();
    channel.borrow_mut().set_state_observer(move |state| {
        let _ = state_tx.send(state);
    });

    info!("Watching fall alerts for user {}", channel.borrow().user_id());
    if let Err(e) = channel.borrow_mut().connect() {
        warn!("Initial connection failed: {}", e);
    }

    loop {
        select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing connection");
                channel.borrow_mut().close();
                return Ok(());
            }
            state = state_rx.recv() => match state {
                Some(ConnectionState::Open) => {
                    if let Some(message) = send.take() {
                        if let Err(e) = channel.borrow_mut().send_message(&message) {
                            error!("Failed to send message: {}", e);
                        }
                    }
                }
                Some(ConnectionState::Abandoned) => {
                    anyhow::bail!("Gave up after {} reconnect attempts", max_attempts);
                }
                Some(_) => {}
                None => return Ok(()),
            },
        }
    }
}
