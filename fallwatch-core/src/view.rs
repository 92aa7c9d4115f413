// UI side effects driven by the alert channel

use chrono::{DateTime, Local, Utc};

pub const NOTIFICATION_TITLE: &str = "Fall Detected!";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPermission {
    Granted,
    Denied,
    /// The user has not decided yet.
    Default,
    /// The host has no notification facility at all.
    Unsupported,
}

/// Text rendered into the alert panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertPanel {
    pub detection_time: String,
    pub location: String,
    pub severity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesktopNotification {
    pub title: String,
    pub body: String,
    pub icon: String,
}

impl DesktopNotification {
    pub fn fall_detected(detection_time: &str, icon: &str) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: format!("A fall was detected at {}", detection_time),
            icon: icon.to_string(),
        }
    }
}

/// The surface an alert is projected onto: page DOM, terminal, or a test double.
///
/// Implementations must not call back into the channel synchronously.
pub trait AlertView {
    /// Hide the waiting panel, show the alert panel and fill in its text.
    fn show_alert(&mut self, panel: &AlertPanel);

    /// Play the alert cue. Returns `false` when the surface has no sound to play.
    fn play_alert_sound(&mut self) -> bool;

    fn notification_permission(&self) -> NotificationPermission;

    fn show_notification(&mut self, notification: &DesktopNotification);

    /// Ask the user for notification permission. The answer is not awaited.
    fn request_notification_permission(&mut self);

    /// Render a timestamp for display, in the local time zone by default.
    fn format_timestamp(&self, timestamp: DateTime<Utc>) -> String {
        timestamp
            .with_timezone(&Local)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fall_notification_text() {
        let notification = DesktopNotification::fall_detected("1/1/2024, 12:00:00 AM", "/icon.png");
        assert_eq!(notification.title, "Fall Detected!");
        assert_eq!(notification.body, "A fall was detected at 1/1/2024, 12:00:00 AM");
        assert_eq!(notification.icon, "/icon.png");
    }
}
