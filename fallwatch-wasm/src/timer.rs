use fallwatch_core::ReconnectTimer;
use gloo::timers::callback::Timeout;
use std::time::Duration;

/// `setTimeout`-backed reconnect timer. Dropping the pending [`Timeout`] clears it.
#[derive(Default)]
pub struct TimeoutTimer {
    pending: Option<Timeout>,
}

impl ReconnectTimer for TimeoutTimer {
    fn schedule(&mut self, delay: Duration, callback: Box<dyn FnOnce()>) {
        let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
        self.pending = Some(Timeout::new(millis, callback));
    }

    fn cancel(&mut self) {
        self.pending = None;
    }
}
