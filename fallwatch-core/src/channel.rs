//! The alert channel: one realtime connection per user session.
//!
//! [`AlertChannel`] owns the connection state, the reconnect budget and the
//! side effects of an alert. The host supplies three seams:
//!
//! * a [`Transport`] that opens the socket and reports events through
//!   [`ConnectionListeners`],
//! * a [`ReconnectTimer`] that runs one deferred callback,
//! * an [`AlertView`] that renders alerts.
//!
//! The channel lives in an `Rc<RefCell<_>>` and is driven by a single-threaded
//! event loop. Transports and timers must deliver their callbacks later, never
//! from inside the call that registered them.

use serde::Serialize;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ChannelConfig;
use crate::endpoint::Endpoint;
use crate::error::{ChannelError, Result};
use crate::event::{decode, AlertEvent, FallDetection, Inbound};
use crate::view::{AlertPanel, AlertView, DesktopNotification, NotificationPermission};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    /// Reconnect budget exhausted; nothing further happens until a manual `connect()`.
    Abandoned,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
    pub was_clean: bool,
}

/// Handlers a [`Transport`] invokes for one connection.
pub struct ConnectionListeners {
    on_open: Box<dyn FnMut()>,
    on_message: Box<dyn FnMut(String)>,
    on_close: Box<dyn FnMut(CloseInfo)>,
    on_error: Box<dyn FnMut(String)>,
}

impl Default for ConnectionListeners {
    fn default() -> Self {
        Self {
            on_open: Box::new(|| {}),
            on_message: Box::new(|_| {}),
            on_close: Box::new(|_| {}),
            on_error: Box::new(|_| {}),
        }
    }
}

impl fmt::Debug for ConnectionListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ConnectionListeners}}")
    }
}

impl ConnectionListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(mut self, handler: impl FnMut() + 'static) -> Self {
        self.on_open = Box::new(handler);
        self
    }

    pub fn on_message(mut self, handler: impl FnMut(String) + 'static) -> Self {
        self.on_message = Box::new(handler);
        self
    }

    pub fn on_close(mut self, handler: impl FnMut(CloseInfo) + 'static) -> Self {
        self.on_close = Box::new(handler);
        self
    }

    pub fn on_error(mut self, handler: impl FnMut(String) + 'static) -> Self {
        self.on_error = Box::new(handler);
        self
    }

    pub fn emit_open(&mut self) {
        (self.on_open)()
    }

    pub fn emit_message(&mut self, text: String) {
        (self.on_message)(text)
    }

    pub fn emit_close(&mut self, info: CloseInfo) {
        (self.on_close)(info)
    }

    pub fn emit_error(&mut self, description: String) {
        (self.on_error)(description)
    }
}

/// A duplex text connection the channel can open, write to and close.
pub trait Transport {
    /// Start opening a connection to `url`. Events arrive later through `listeners`.
    ///
    /// # Errors
    ///
    /// * Returns [`ChannelError::Transport`] if the connection cannot even be attempted
    fn open(&mut self, url: &str, listeners: ConnectionListeners) -> Result<()>;

    /// # Errors
    ///
    /// * Returns [`ChannelError::Transport`] if the frame could not be handed to the socket
    fn send_text(&mut self, text: &str) -> Result<()>;

    /// Close the current connection, if any. Must be idempotent.
    fn close(&mut self);
}

/// One-shot deferred callback used for the reconnect delay.
pub trait ReconnectTimer {
    /// Run `callback` once after `delay`, replacing any pending callback.
    fn schedule(&mut self, delay: Duration, callback: Box<dyn FnOnce()>);

    /// Drop the pending callback, if any.
    fn cancel(&mut self);
}

pub type SharedChannel<T, R, V> = Rc<RefCell<AlertChannel<T, R, V>>>;

pub struct AlertChannel<T: Transport, R: ReconnectTimer, V: AlertView> {
    user_id: String,
    endpoint: Endpoint,
    config: ChannelConfig,
    transport: T,
    timer: R,
    view: V,
    state: ConnectionState,
    reconnect_attempts: u32,
    // Bumped whenever a connection is superseded or closed by us; events and
    // timer callbacks carrying an older value are dropped.
    generation: u64,
    state_observer: Option<Box<dyn FnMut(ConnectionState)>>,
    this: Weak<RefCell<Self>>,
}

impl<T: Transport, R: ReconnectTimer, V: AlertView> AlertChannel<T, R, V> {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Open
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register a callback run on every state transition.
    ///
    /// The callback runs while the channel is borrowed and must not touch it.
    pub fn set_state_observer(&mut self, observer: impl FnMut(ConnectionState) + 'static) {
        self.state_observer = Some(Box::new(observer));
    }

    /// Close the connection and cancel any pending reconnect. Idempotent.
    pub fn close(&mut self) {
        self.timer.cancel();
        self.generation += 1;

        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            info!("Closing connection for user {}", self.user_id);
            self.transport.close();
            self.set_state(ConnectionState::Closed);
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.state == state {
            return;
        }
        debug!("Connection state {} -> {}", self.state, state);
        self.state = state;
        if let Some(observer) = self.state_observer.as_mut() {
            observer(state);
        }
    }
}

impl<T, R, V> AlertChannel<T, R, V>
where
    T: Transport + 'static,
    R: ReconnectTimer + 'static,
    V: AlertView + 'static,
{
    pub fn new(
        user_id: impl Into<String>,
        endpoint: Endpoint,
        config: ChannelConfig,
        transport: T,
        timer: R,
        view: V,
    ) -> SharedChannel<T, R, V> {
        let endpoint = endpoint.with_path_prefix(config.path_prefix.clone());
        let user_id = user_id.into();

        Rc::new_cyclic(|this| {
            RefCell::new(Self {
                user_id,
                endpoint,
                config,
                transport,
                timer,
                view,
                state: ConnectionState::Idle,
                reconnect_attempts: 0,
                generation: 0,
                state_observer: None,
                this: this.clone(),
            })
        })
    }

    /// Open a new connection, superseding any live one.
    ///
    /// A transport that refuses to open counts as a closed connection and
    /// consumes one reconnect attempt.
    pub fn connect(&mut self) -> Result<()> {
        self.timer.cancel();
        self.generation += 1;
        let generation = self.generation;

        if matches!(self.state, ConnectionState::Connecting | ConnectionState::Open) {
            debug!("Superseding live connection for user {}", self.user_id);
            self.transport.close();
        }

        let url = match self.endpoint.url_for(&self.user_id) {
            Ok(url) => url,
            Err(e) => {
                error!("Cannot build connection URL: {}", e);
                self.set_state(ConnectionState::Closed);
                return Err(e);
            }
        };

        info!("Connecting to {}", url);
        self.set_state(ConnectionState::Connecting);

        let listeners = self.listeners(generation);
        if let Err(e) = self.transport.open(&url, listeners) {
            error!("Failed to open connection to {}: {}", url, e);
            self.set_state(ConnectionState::Closed);
            self.attempt_reconnect();
            return Err(e);
        }

        Ok(())
    }

    pub fn handle_open(&mut self) {
        info!("Connection established for user {}", self.user_id);
        self.reconnect_attempts = 0;
        self.set_state(ConnectionState::Open);
    }

    /// Decode one inbound text frame and dispatch it.
    pub fn handle_text(&mut self, text: &str) {
        match decode(text) {
            Ok(Inbound::Alert(event)) => self.handle_message(&event),
            Ok(Inbound::Ignored { kind }) => debug!("Ignoring message of type '{}'", kind),
            Err(e) => warn!("Dropping malformed message: {}", e),
        }
    }

    pub fn handle_message(&mut self, event: &AlertEvent) {
        match event {
            AlertEvent::FallDetection(fall) => self.present_fall(fall),
        }
    }

    pub fn handle_close(&mut self, info: CloseInfo) {
        info!(
            "Connection closed (code {}, reason '{}', clean: {})",
            info.code, info.reason, info.was_clean
        );
        self.set_state(ConnectionState::Closed);
        self.attempt_reconnect();
    }

    /// Transport errors are only logged; the close event that follows drives recovery.
    pub fn handle_error(&mut self, description: &str) {
        error!("Connection error: {}", description);
    }

    /// Schedule one reconnect if the budget allows. Returns whether one was scheduled.
    pub fn attempt_reconnect(&mut self) -> bool {
        let max = self.config.max_reconnect_attempts;
        if self.reconnect_attempts >= max {
            error!("Maximum reconnection attempts reached. Please refresh the page.");
            self.set_state(ConnectionState::Abandoned);
            return false;
        }

        self.reconnect_attempts += 1;
        info!(
            "Attempting to reconnect ({}/{})...",
            self.reconnect_attempts, max
        );

        let this = self.this.clone();
        let generation = self.generation;
        self.timer.schedule(
            self.config.reconnect_delay(),
            Box::new(move || {
                let Some(channel) = this.upgrade() else {
                    return;
                };
                let mut channel = channel.borrow_mut();
                if channel.generation != generation {
                    debug!("Skipping stale reconnect");
                    return;
                }
                if let Err(e) = channel.connect() {
                    debug!("Reconnect attempt failed: {}", e);
                }
            }),
        );
        true
    }

    /// Serialize `message` as JSON and send it. Dropped when not connected.
    pub fn send_message<M: Serialize + ?Sized>(&mut self, message: &M) -> Result<()> {
        if !self.is_connected() {
            error!("Cannot send message: connection is not open");
            return Err(ChannelError::NotConnected);
        }

        let text = serde_json::to_string(message)?;
        self.transport.send_text(&text).map_err(|e| {
            error!("Failed to send message: {}", e);
            e
        })
    }

    fn listeners(&self, generation: u64) -> ConnectionListeners {
        let (open, message, close, err) = (
            self.this.clone(),
            self.this.clone(),
            self.this.clone(),
            self.this.clone(),
        );

        ConnectionListeners::new()
            .on_open(move || Self::dispatch(&open, generation, |c| c.handle_open()))
            .on_message(move |text| Self::dispatch(&message, generation, |c| c.handle_text(&text)))
            .on_close(move |info| Self::dispatch(&close, generation, |c| c.handle_close(info)))
            .on_error(move |description| {
                Self::dispatch(&err, generation, |c| c.handle_error(&description))
            })
    }

    fn dispatch(this: &Weak<RefCell<Self>>, generation: u64, f: impl FnOnce(&mut Self)) {
        let Some(channel) = this.upgrade() else {
            return;
        };
        let mut channel = channel.borrow_mut();
        if channel.generation != generation {
            debug!("Ignoring event from superseded connection");
            return;
        }
        f(&mut *channel);
    }

    fn present_fall(&mut self, fall: &FallDetection) {
        let detection_time = match fall.parsed_timestamp() {
            Some(timestamp) => self.view.format_timestamp(timestamp),
            None => {
                warn!("Unparseable timestamp '{}', showing it verbatim", fall.timestamp);
                fall.timestamp.clone()
            }
        };

        warn!(
            "Fall detected for user {} at {} (location: {}, id: {:?})",
            self.user_id,
            detection_time,
            fall.location_label(),
            fall.fall_id
        );

        self.view.show_alert(&AlertPanel {
            detection_time: detection_time.clone(),
            location: fall.location_label().to_string(),
            severity: fall.severity.clone(),
        });

        if !self.view.play_alert_sound() {
            debug!("No alert sound available");
        }

        match self.view.notification_permission() {
            NotificationPermission::Granted => {
                let notification =
                    DesktopNotification::fall_detected(&detection_time, &self.config.notification_icon);
                self.view.show_notification(&notification);
            }
            NotificationPermission::Default => self.view.request_notification_permission(),
            NotificationPermission::Denied | NotificationPermission::Unsupported => {
                debug!("Notifications unavailable, skipping")
            }
        }
    }
}

impl<T: Transport, R: ReconnectTimer, V: AlertView> Drop for AlertChannel<T, R, V> {
    fn drop(&mut self) {
        self.close();
    }
}
