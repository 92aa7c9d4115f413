use fallwatch_core::ReconnectTimer;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Reconnect timer backed by a sleeping task on the current `LocalSet`.
#[derive(Default)]
pub struct TokioTimer {
    pending: Option<JoinHandle<()>>,
}

impl ReconnectTimer for TokioTimer {
    fn schedule(&mut self, delay: Duration, callback: Box<dyn FnOnce()>) {
        self.cancel();
        self.pending = Some(tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            callback();
        }));
    }

    fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn test_scheduled_callback_runs_once() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let fired = Rc::new(Cell::new(0));
                let mut timer = TokioTimer::default();
                {
                    let fired = fired.clone();
                    timer.schedule(
                        Duration::from_millis(10),
                        Box::new(move || fired.set(fired.get() + 1)),
                    );
                }

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert_eq!(fired.get(), 1);
            })
            .await;
    }

    #[tokio::test]
    async fn test_cancel_prevents_callback() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let fired = Rc::new(Cell::new(false));
                let mut timer = TokioTimer::default();
                {
                    let fired = fired.clone();
                    timer.schedule(Duration::from_millis(20), Box::new(move || fired.set(true)));
                }
                timer.cancel();

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert!(!fired.get());
            })
            .await;
    }

    #[tokio::test]
    async fn test_reschedule_replaces_pending() {
        let local = LocalSet::new();
        local
            .run_until(async {
                let fired = Rc::new(Cell::new(0u32));
                let mut timer = TokioTimer::default();
                for value in [1, 2] {
                    let fired = fired.clone();
                    timer.schedule(Duration::from_millis(20), Box::new(move || fired.set(value)));
                }

                tokio::time::sleep(Duration::from_millis(100)).await;
                assert_eq!(fired.get(), 2);
            })
            .await;
    }
}
