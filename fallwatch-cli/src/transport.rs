use fallwatch_core::{ChannelError, CloseInfo, ConnectionListeners, Transport};
use futures_util::{SinkExt as _, StreamExt as _};
use tokio::select;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

const ABNORMAL_CLOSURE: u16 = 1006;
const NO_STATUS: u16 = 1005;

/// `tokio-tungstenite` client behind the channel's [`Transport`] seam.
///
/// Each connection runs as a task on the current `LocalSet`; `open` must be
/// called from inside one.
#[derive(Default)]
pub struct TungsteniteTransport {
    outbound: Option<mpsc::UnboundedSender<Message>>,
}

impl TungsteniteTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transport for TungsteniteTransport {
    fn open(&mut self, url: &str, listeners: ConnectionListeners) -> Result<(), ChannelError> {
        self.close();

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::task::spawn_local(run_connection(url.to_string(), listeners, rx));
        self.outbound = Some(tx);

        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        let outbound = self.outbound.as_ref().ok_or(ChannelError::NotConnected)?;
        outbound
            .send(Message::text(text.to_owned()))
            .map_err(|e| ChannelError::Transport(format!("Failed to send: {}", e)))
    }

    /// Dropping the sender tells the connection task to send a close frame and exit
    /// without reporting back.
    fn close(&mut self) {
        self.outbound = None;
    }
}

async fn run_connection(
    url: String,
    mut listeners: ConnectionListeners,
    mut outbound: mpsc::UnboundedReceiver<Message>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            listeners.emit_error(e.to_string());
            listeners.emit_close(CloseInfo {
                code: ABNORMAL_CLOSURE,
                reason: e.to_string(),
                was_clean: false,
            });
            return;
        }
    };

    listeners.emit_open();
    let (mut write, mut read) = stream.split();

    let close = loop {
        select! {
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => listeners.emit_message(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => CloseInfo {
                            code: u16::from(frame.code),
                            reason: frame.reason.to_string(),
                            was_clean: true,
                        },
                        None => CloseInfo {
                            code: NO_STATUS,
                            reason: String::new(),
                            was_clean: true,
                        },
                    };
                }
                Some(Ok(Message::Binary(_))) => warn!("Ignoring binary frame"),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    listeners.emit_error(e.to_string());
                    break CloseInfo {
                        code: ABNORMAL_CLOSURE,
                        reason: e.to_string(),
                        was_clean: false,
                    };
                }
                None => {
                    break CloseInfo {
                        code: ABNORMAL_CLOSURE,
                        reason: "stream ended".to_string(),
                        was_clean: false,
                    };
                }
            },
            message = outbound.recv() => match message {
                Some(message) => {
                    if let Err(e) = write.send(message).await {
                        listeners.emit_error(e.to_string());
                        break CloseInfo {
                            code: ABNORMAL_CLOSURE,
                            reason: e.to_string(),
                            was_clean: false,
                        };
                    }
                }
                None => {
                    debug!("Connection to {} closed locally", url);
                    if let Err(e) = write.send(Message::Close(None)).await {
                        debug!("Close frame not delivered: {}", e);
                    }
                    return;
                }
            },
        }
    };

    listeners.emit_close(close);
}
