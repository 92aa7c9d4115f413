use fallwatch_core::{ChannelError, CloseInfo, ConnectionListeners, Transport};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

/// Browser `WebSocket` behind the channel's [`Transport`] seam.
#[derive(Default)]
pub struct WebSocketTransport {
    socket: Option<WebSocket>,
    // Kept alive for as long as the socket may call them.
    handlers: Option<SocketHandlers>,
}

struct SocketHandlers {
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
}

impl WebSocketTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ready_state(&self) -> Option<u16> {
        self.socket.as_ref().map(|socket| socket.ready_state())
    }
}

impl Transport for WebSocketTransport {
    fn open(&mut self, url: &str, listeners: ConnectionListeners) -> Result<(), ChannelError> {
        self.close();

        let socket = WebSocket::new(url).map_err(|e| ChannelError::Transport(js_error_text(&e)))?;
        let listeners = Rc::new(RefCell::new(listeners));

        let on_open = {
            let listeners = listeners.clone();
            Closure::<dyn FnMut(Event)>::new(move |_: Event| listeners.borrow_mut().emit_open())
        };

        let on_message = {
            let listeners = listeners.clone();
            Closure::<dyn FnMut(MessageEvent)>::new(move |e: MessageEvent| match e.data().as_string() {
                Some(text) => listeners.borrow_mut().emit_message(text),
                None => warn!("Ignoring non-text frame"),
            })
        };

        let on_close = {
            let listeners = listeners.clone();
            Closure::<dyn FnMut(CloseEvent)>::new(move |e: CloseEvent| {
                listeners.borrow_mut().emit_close(CloseInfo {
                    code: e.code(),
                    reason: e.reason(),
                    was_clean: e.was_clean(),
                })
            })
        };

        let on_error = Closure::<dyn FnMut(Event)>::new(move |e: Event| {
            listeners
                .borrow_mut()
                .emit_error(format!("{} event on socket", e.type_()))
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.socket = Some(socket);
        self.handlers = Some(SocketHandlers {
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
            _on_error: on_error,
        });

        Ok(())
    }

    fn send_text(&mut self, text: &str) -> Result<(), ChannelError> {
        match &self.socket {
            Some(socket) => socket
                .send_with_str(text)
                .map_err(|e| ChannelError::Transport(js_error_text(&e))),
            None => Err(ChannelError::NotConnected),
        }
    }

    fn close(&mut self) {
        if let Some(socket) = self.socket.take() {
            // Detach first so no handler fires after its closure is dropped.
            socket.set_onopen(None);
            socket.set_onmessage(None);
            socket.set_onclose(None);
            socket.set_onerror(None);
            if let Err(e) = socket.close() {
                warn!("Failed to close socket: {}", js_error_text(&e));
            }
        }
        self.handlers = None;
    }
}

pub(crate) fn js_error_text(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
        .unwrap_or_else(|| format!("{:?}", value))
}
