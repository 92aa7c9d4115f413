//! Browser client for fall-detection alerts.
//!
//! The page owns the [`FallAlertClient`] it gets back from `mount()`; there is
//! no global handle. Closing happens on `beforeunload` and when the client is
//! freed.

use fallwatch_core::{AlertChannel, ChannelConfig, ConnectionState, Endpoint, SharedChannel};
use std::rc::Rc;
use tracing::{info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlInputElement, Window};

pub mod dom;
pub mod timer;
pub mod transport;

use dom::{DomView, USER_ID_ELEMENT};
use timer::TimeoutTimer;
use transport::{js_error_text, WebSocketTransport};

// Use `wee_alloc` as the global allocator for smaller WASM binary size
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

type BrowserChannel = SharedChannel<WebSocketTransport, TimeoutTimer, DomView>;

#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    // tracing events reach the console through its `log` bridge
    wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
}

#[wasm_bindgen]
pub struct FallAlertClient {
    channel: BrowserChannel,
    window: Window,
    on_unload: Closure<dyn FnMut(Event)>,
}

#[wasm_bindgen]
impl FallAlertClient {
    /// Start alerts for the user named by the page's `user-id` input.
    ///
    /// Returns `undefined` when the page carries no user id.
    pub fn mount() -> Result<Option<FallAlertClient>, JsValue> {
        let window = browser_window()?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let user_id = document
            .get_element_by_id(USER_ID_ELEMENT)
            .and_then(|e| e.dyn_into::<HtmlInputElement>().ok())
            .map(|input| input.value())
            .filter(|value| !value.trim().is_empty());

        match user_id {
            Some(user_id) => Self::start(window, &user_id, ChannelConfig::default()).map(Some),
            None => {
                info!("No user id on the page, fall alerts disabled");
                Ok(None)
            }
        }
    }

    #[wasm_bindgen(constructor)]
    pub fn new(user_id: &str) -> Result<FallAlertClient, JsValue> {
        Self::start(browser_window()?, user_id, ChannelConfig::default())
    }

    /// Like the constructor, with a partial config object such as
    /// `{ max_reconnect_attempts: 10, reconnect_delay_ms: 1000 }`.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(user_id: &str, config: JsValue) -> Result<FallAlertClient, JsValue> {
        let config: ChannelConfig = serde_wasm_bindgen::from_value(config)?;
        Self::start(browser_window()?, user_id, config)
    }

    /// Send a JSON-serializable value. Throws when the connection is not open.
    #[wasm_bindgen(js_name = sendMessage)]
    pub fn send_message(&self, message: JsValue) -> Result<(), JsValue> {
        let message: serde_json::Value = serde_wasm_bindgen::from_value(message)?;
        self.channel
            .borrow_mut()
            .send_message(&message)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    pub fn close(&self) {
        self.channel.borrow_mut().close();
    }

    #[wasm_bindgen(getter)]
    pub fn connected(&self) -> bool {
        self.channel.borrow().is_connected()
    }

    #[wasm_bindgen(getter, js_name = reconnectAttempts)]
    pub fn reconnect_attempts(&self) -> u32 {
        self.channel.borrow().reconnect_attempts()
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.channel.borrow().state().to_string()
    }
}

impl FallAlertClient {
    fn start(window: Window, user_id: &str, config: ChannelConfig) -> Result<FallAlertClient, JsValue> {
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let location = window.location();
        let endpoint = Endpoint::from_page(&location.protocol()?, &location.host()?);

        let channel = AlertChannel::new(
            user_id,
            endpoint,
            config,
            WebSocketTransport::new(),
            TimeoutTimer::default(),
            DomView::new(&window, document),
        );
        channel.borrow_mut().set_state_observer(|state| {
            if state == ConnectionState::Abandoned {
                warn!("Fall alerts stopped; reload the page to reconnect");
            }
        });

        // A refused first attempt is already queued for retry.
        if let Err(e) = channel.borrow_mut().connect() {
            warn!("Initial connection failed: {}", e);
        }

        let on_unload = {
            let channel = Rc::downgrade(&channel);
            Closure::<dyn FnMut(Event)>::new(move |_: Event| {
                if let Some(channel) = channel.upgrade() {
                    channel.borrow_mut().close();
                }
            })
        };
        window.add_event_listener_with_callback("beforeunload", on_unload.as_ref().unchecked_ref())?;

        Ok(FallAlertClient {
            channel,
            window,
            on_unload,
        })
    }
}

impl Drop for FallAlertClient {
    fn drop(&mut self) {
        if let Err(e) = self
            .window
            .remove_event_listener_with_callback("beforeunload", self.on_unload.as_ref().unchecked_ref())
        {
            warn!("Failed to detach unload handler: {}", js_error_text(&e));
        }
        self.channel.borrow_mut().close();
    }
}

fn browser_window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("no window"))
}
