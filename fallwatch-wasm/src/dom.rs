// Page elements the alert is projected onto

use chrono::{DateTime, Utc};
use fallwatch_core::{AlertPanel, AlertView, DesktopNotification, NotificationPermission};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Document, Element, HtmlElement, HtmlMediaElement, Notification, NotificationOptions, Window};

use crate::transport::js_error_text;

pub const STATUS_ELEMENT: &str = "detection-status";
pub const ALERT_ELEMENT: &str = "alert-info";
pub const TIME_ELEMENT: &str = "detection-time";
pub const LOCATION_ELEMENT: &str = "detection-location";
pub const SEVERITY_ELEMENT: &str = "detection-severity";
pub const SOUND_ELEMENT: &str = "alert-sound";
pub const USER_ID_ELEMENT: &str = "user-id";

pub struct DomView {
    document: Document,
    notifications_supported: bool,
}

impl DomView {
    pub fn new(window: &Window, document: Document) -> Self {
        let notifications_supported =
            js_sys::Reflect::has(window, &JsValue::from_str("Notification")).unwrap_or(false);

        Self {
            document,
            notifications_supported,
        }
    }

    fn element(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn set_display(&self, id: &str, display: &str) {
        match self.element(id).and_then(|e| e.dyn_into::<HtmlElement>().ok()) {
            Some(element) => {
                if let Err(e) = element.style().set_property("display", display) {
                    warn!("Failed to set display on #{}: {}", id, js_error_text(&e));
                }
            }
            None => warn!("Element #{} not found", id),
        }
    }

    fn set_text(&self, id: &str, text: &str) {
        match self.element(id) {
            Some(element) => element.set_text_content(Some(text)),
            None => warn!("Element #{} not found", id),
        }
    }
}

impl AlertView for DomView {
    fn show_alert(&mut self, panel: &AlertPanel) {
        self.set_display(STATUS_ELEMENT, "none");
        self.set_display(ALERT_ELEMENT, "block");
        self.set_text(TIME_ELEMENT, &panel.detection_time);
        self.set_text(LOCATION_ELEMENT, &panel.location);

        // Optional on the page.
        if let (Some(severity), Some(element)) = (&panel.severity, self.element(SEVERITY_ELEMENT)) {
            element.set_text_content(Some(severity));
        }
    }

    fn play_alert_sound(&mut self) -> bool {
        let Some(audio) = self
            .element(SOUND_ELEMENT)
            .and_then(|e| e.dyn_into::<HtmlMediaElement>().ok())
        else {
            return false;
        };

        match audio.play() {
            Ok(promise) => {
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = JsFuture::from(promise).await {
                        warn!("Alert sound was blocked: {}", js_error_text(&e));
                    }
                });
                true
            }
            Err(e) => {
                warn!("Failed to play alert sound: {}", js_error_text(&e));
                false
            }
        }
    }

    fn notification_permission(&self) -> NotificationPermission {
        if !self.notifications_supported {
            return NotificationPermission::Unsupported;
        }
        permission_from_web(Notification::permission())
    }

    fn show_notification(&mut self, notification: &DesktopNotification) {
        let options = NotificationOptions::new();
        options.set_body(&notification.body);
        options.set_icon(&notification.icon);

        if let Err(e) = Notification::new_with_options(&notification.title, &options) {
            warn!("Failed to show notification: {}", js_error_text(&e));
        }
    }

    fn request_notification_permission(&mut self) {
        match Notification::request_permission() {
            Ok(_) => debug!("Requested notification permission"),
            Err(e) => warn!("Failed to request notification permission: {}", js_error_text(&e)),
        }
    }

    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        let date = js_sys::Date::new(&JsValue::from_f64(timestamp.timestamp_millis() as f64));
        String::from(date.to_locale_string("default", &JsValue::UNDEFINED))
    }
}

pub fn permission_from_web(permission: web_sys::NotificationPermission) -> NotificationPermission {
    match permission {
        web_sys::NotificationPermission::Granted => NotificationPermission::Granted,
        web_sys::NotificationPermission::Denied => NotificationPermission::Denied,
        web_sys::NotificationPermission::Default => NotificationPermission::Default,
        _ => NotificationPermission::Unsupported,
    }
}
