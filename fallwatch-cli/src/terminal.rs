use fallwatch_core::{AlertPanel, AlertView, DesktopNotification, NotificationPermission};
use std::io::Write;
use tracing::warn;

const BELL: &str = "\x07";

/// Writes alerts to a terminal (or any writer). The bell stands in for the alert sound.
pub struct TerminalView<W: Write> {
    out: W,
    bell: bool,
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, bell: bool) -> Self {
        Self { out, bell }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self.out.write_all(text.as_bytes()).and_then(|_| self.out.flush()) {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> AlertView for TerminalView<W> {
    fn show_alert(&mut self, panel: &AlertPanel) {
        let mut text = format!(
            "🚨 FALL DETECTED\n   time:     {}\n   location: {}\n",
            panel.detection_time, panel.location
        );
        if let Some(severity) = &panel.severity {
            text.push_str(&format!("   severity: {}\n", severity));
        }
        self.write(&text);
    }

    fn play_alert_sound(&mut self) -> bool {
        if self.bell {
            self.write(BELL);
        }
        self.bell
    }

    // A terminal can always show the notification line.
    fn notification_permission(&self) -> NotificationPermission {
        NotificationPermission::Granted
    }

    fn show_notification(&mut self, notification: &DesktopNotification) {
        self.write(&format!("{} {}\n", notification.title, notification.body));
    }

    fn request_notification_permission(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(severity: Option<&str>) -> AlertPanel {
        AlertPanel {
            detection_time: "1/1/2024, 12:00:00 AM".to_string(),
            location: "Kitchen".to_string(),
            severity: severity.map(str::to_string),
        }
    }

    #[test]
    fn test_alert_rendering() {
        let mut view = TerminalView::new(Vec::new(), false);
        view.show_alert(&panel(Some("High")));

        let output = String::from_utf8(view.into_inner()).unwrap();
        assert!(output.starts_with("🚨 FALL DETECTED\n"));
        assert!(output.contains("time:     1/1/2024, 12:00:00 AM"));
        assert!(output.contains("location: Kitchen"));
        assert!(output.contains("severity: High"));
    }

    #[test]
    fn test_severity_line_optional() {
        let mut view = TerminalView::new(Vec::new(), false);
        view.show_alert(&panel(None));

        let output = String::from_utf8(view.into_inner()).unwrap();
        assert!(!output.contains("severity"));
    }

    #[test]
    fn test_bell() {
        let mut quiet = TerminalView::new(Vec::new(), false);
        assert!(!quiet.play_alert_sound());
        assert!(quiet.into_inner().is_empty());

        let mut loud = TerminalView::new(Vec::new(), true);
        assert!(loud.play_alert_sound());
        assert_eq!(loud.into_inner(), b"\x07".to_vec());
    }

    #[test]
    fn test_notification_line() {
        let mut view = TerminalView::new(Vec::new(), false);
        assert_eq!(view.notification_permission(), NotificationPermission::Granted);

        view.show_notification(&DesktopNotification::fall_detected("noon", "/icon.png"));
        let output = String::from_utf8(view.into_inner()).unwrap();
        assert_eq!(output, "Fall Detected! A fall was detected at noon\n");
    }
}
