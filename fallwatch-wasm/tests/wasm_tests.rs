// Browser-host helpers that do not need a live page

use fallwatch_core::{ChannelConfig, NotificationPermission};
use fallwatch_wasm::dom::{
    permission_from_web, ALERT_ELEMENT, LOCATION_ELEMENT, SOUND_ELEMENT, STATUS_ELEMENT,
    TIME_ELEMENT, USER_ID_ELEMENT,
};

#[test]
fn test_permission_mapping() {
    assert_eq!(
        permission_from_web(web_sys::NotificationPermission::Granted),
        NotificationPermission::Granted
    );
    assert_eq!(
        permission_from_web(web_sys::NotificationPermission::Denied),
        NotificationPermission::Denied
    );
    assert_eq!(
        permission_from_web(web_sys::NotificationPermission::Default),
        NotificationPermission::Default
    );
}

#[test]
fn test_page_element_ids() {
    // These ids are the contract with the dashboard template.
    assert_eq!(STATUS_ELEMENT, "detection-status");
    assert_eq!(ALERT_ELEMENT, "alert-info");
    assert_eq!(TIME_ELEMENT, "detection-time");
    assert_eq!(LOCATION_ELEMENT, "detection-location");
    assert_eq!(SOUND_ELEMENT, "alert-sound");
    assert_eq!(USER_ID_ELEMENT, "user-id");
}

#[test]
fn test_partial_page_config() {
    // Shape accepted by `FallAlertClient.withConfig`.
    let config: ChannelConfig =
        serde_json::from_str(r#"{"max_reconnect_attempts": 10, "reconnect_delay_ms": 1000}"#).unwrap();

    assert_eq!(config.max_reconnect_attempts, 10);
    assert_eq!(config.reconnect_delay_ms, 1000);
    assert_eq!(config.notification_icon, "/static/img/alert-icon.png");
}
