//! Timer-driven refresh.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::Coordinator;

/// Background thread calling [`Coordinator::tick`] every `interval`.
///
/// Stops when dropped.
pub struct Scheduler {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn start(coordinator: Coordinator, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let started = coordinator.tick();
                        log::debug!("Timer refresh started {started} fetch(es)");
                    }
                    // Stop requested or the scheduler was dropped
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        log::debug!("Auto-refresh every {}s", interval.as_secs());
        Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    /// Stop the timer and wait for the thread to exit.
    ///
    /// Fetches already dispatched keep running on the pool.
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("Refresh timer thread panicked");
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{coordinator_with, drive, MockBackend};
    use super::super::Event;
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_scheduler_ticks_until_stopped() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, rx) = coordinator_with(Arc::clone(&backend));
        coordinator.set_drives(vec![drive("gdrive")]);

        let mut scheduler = Scheduler::start(coordinator.clone(), Duration::from_millis(50));

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut published = 0;
        while published < 2 && Instant::now() < deadline {
            if let Ok(Event::StatusPublished { .. }) = rx.recv_timeout(Duration::from_millis(100)) {
                published += 1;
            }
        }
        assert!(published >= 2, "expected repeated timer refreshes");

        scheduler.stop();
        assert!(coordinator.wait_idle(Duration::from_secs(5)));
        let calls = backend.calls("gdrive");

        thread::sleep(Duration::from_millis(200));
        assert_eq!(backend.calls("gdrive"), calls);
    }
}
