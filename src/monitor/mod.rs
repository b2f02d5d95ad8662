//! Fetch coordinator: decides which remotes to fetch and publishes results.
//!
//! One mutex guards both the in-flight map and the published map, so the
//! "already fetching?" test and the dispatch are a single step. Fetches run
//! on a bounded rayon pool; each worker blocks only on its own rclone
//! process and hands its status back through [`Inner::complete`].

mod events;
mod scheduler;

pub use events::{Event, EventSink, channel};
pub use scheduler::Scheduler;

use anyhow::{Context, Result};
use rclonekit::{Client, DriveStatus, RemoteName};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::config::DriveConfig;

/// What started a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Manual,
    Timer,
}

#[derive(Default)]
struct State {
    /// Monitored drives in display order
    drives: Vec<DriveConfig>,
    in_flight: HashMap<RemoteName, Trigger>,
    published: HashMap<RemoteName, DriveStatus>,
}

impl State {
    fn is_monitored(&self, remote: &RemoteName) -> bool {
        self.drives.iter().any(|d| &d.remote == remote)
    }
}

struct Inner {
    client: Client,
    pool: rayon::ThreadPool,
    sink: Arc<dyn EventSink>,
    fetch_timeout: Duration,
    state: Mutex<State>,
    idle: Condvar,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Mark `remote` in flight and queue its fetch. Caller holds the lock.
    fn dispatch(self: &Arc<Self>, state: &mut State, remote: RemoteName, trigger: Trigger) {
        log::debug!("Fetching {remote} ({trigger:?})");
        state.in_flight.insert(remote.clone(), trigger);

        let inner = Arc::clone(self);
        self.pool.spawn(move || {
            let status = inner.client.fetch_status(&remote, inner.fetch_timeout);
            inner.complete(status);
        });
    }

    /// Dispatch every monitored remote not already in flight.
    fn dispatch_all(self: &Arc<Self>, state: &mut State, trigger: Trigger) -> usize {
        let pending: Vec<RemoteName> = state
            .drives
            .iter()
            .map(|d| d.remote.clone())
            .filter(|r| !state.in_flight.contains_key(r))
            .collect();

        let count = pending.len();
        for remote in pending {
            self.dispatch(state, remote, trigger);
        }
        count
    }

    /// Merge a finished fetch and publish it, unless the remote was removed.
    fn complete(&self, status: DriveStatus) {
        let remote = status.remote().clone();
        let mut state = self.lock();
        state.in_flight.remove(&remote);

        if state.is_monitored(&remote) {
            state.published.insert(remote.clone(), status.clone());
            // Emitted under the lock so events for one remote stay in completion order
            self.sink.emit(Event::StatusPublished { remote, status });
        } else {
            log::warn!("Discarding result for {remote}: no longer monitored");
        }

        drop(state);
        self.idle.notify_all();
    }
}

/// Owns the monitored set and the latest status per remote.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    pub fn new(
        client: Client,
        sink: Arc<dyn EventSink>,
        workers: usize,
        fetch_timeout: Duration,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("driveglance-fetch-{i}"))
            .build()
            .context("Failed to create fetch thread pool")?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                pool,
                sink,
                fetch_timeout,
                state: Mutex::new(State::default()),
                idle: Condvar::new(),
            }),
        })
    }

    /// Replace the monitored set. Disabled drives are skipped.
    ///
    /// Statuses of removed remotes are dropped; their in-flight fetches
    /// finish but are never published.
    pub fn set_drives(&self, drives: Vec<DriveConfig>) {
        let drives: Vec<DriveConfig> = drives.into_iter().filter(|d| d.enabled).collect();

        let mut state = self.inner.lock();
        state
            .published
            .retain(|remote, _| drives.iter().any(|d| &d.remote == remote));
        state.drives.clone_from(&drives);
        self.inner.sink.emit(Event::RemoteListChanged(drives));
    }

    /// Fetch every monitored remote. Returns how many fetches were started.
    pub fn refresh_all(&self) -> usize {
        let mut guard = self.inner.lock();
        self.inner.dispatch_all(&mut guard, Trigger::Manual)
    }

    /// Fetch one remote.
    ///
    /// Returns false if it is not monitored or a fetch is already running.
    pub fn refresh_one(&self, remote: &RemoteName) -> bool {
        let mut guard = self.inner.lock();
        let state = &mut *guard;
        if !state.is_monitored(remote) {
            log::debug!("Ignoring refresh for unmonitored remote {remote}");
            return false;
        }
        if state.in_flight.contains_key(remote) {
            log::debug!("Fetch for {remote} already in flight");
            return false;
        }
        self.inner.dispatch(state, remote.clone(), Trigger::Manual);
        true
    }

    /// Timer entry point: refresh everything unless a manual refresh is running.
    pub fn tick(&self) -> usize {
        let mut guard = self.inner.lock();
        if guard.in_flight.values().any(|t| *t == Trigger::Manual) {
            log::debug!("Skipping timer refresh: manual refresh in flight");
            return 0;
        }
        self.inner.dispatch_all(&mut guard, Trigger::Timer)
    }

    /// List remotes known to rclone, reporting failure as an event too.
    pub fn enumerate(&self) -> rclonekit::Result<Vec<RemoteName>> {
        self.inner.client.list_remotes().inspect_err(|e| {
            self.inner.sink.emit(Event::EnumerationFailed(e.to_string()));
        })
    }

    /// Monitored drives in display order
    pub fn drives(&self) -> Vec<DriveConfig> {
        self.inner.lock().drives.clone()
    }

    /// Latest status per monitored remote, in display order
    pub fn published(&self) -> Vec<DriveStatus> {
        let state = self.inner.lock();
        state
            .drives
            .iter()
            .filter_map(|d| state.published.get(&d.remote).cloned())
            .collect()
    }

    /// Remotes with a fetch running, monitored ones first in display order
    pub fn in_flight(&self) -> Vec<RemoteName> {
        let state = self.inner.lock();
        let mut remotes: Vec<RemoteName> = state.in_flight.keys().cloned().collect();
        remotes.sort_by_key(|r| {
            state
                .drives
                .iter()
                .position(|d| &d.remote == r)
                .unwrap_or(usize::MAX)
        });
        remotes
    }

    /// Block until nothing is in flight. Returns false on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        // A bound past what Instant can hold means wait without one
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.inner.lock();
        while !state.in_flight.is_empty() {
            state = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return false;
                    }
                    match self.inner.idle.wait_timeout(state, deadline - now) {
                        Ok((guard, _)) => guard,
                        Err(poisoned) => poisoned.into_inner().0,
                    }
                }
                None => match self.inner.idle.wait(state) {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                },
            };
        }
        true
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{MockBackend, coordinator_with, drive, remote};
    use super::*;
    use rclonekit::FetchError;
    use std::sync::mpsc;

    const WAIT: Duration = Duration::from_secs(5);

    fn drain(rx: &mpsc::Receiver<Event>) -> Vec<Event> {
        rx.try_iter().collect()
    }

    fn published_remotes(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                Event::StatusPublished { remote, .. } => Some(remote.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_one_success_one_timeout() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, rx) = coordinator_with(backend);
        coordinator.set_drives(vec![drive("gdrive"), drive("onedrive")]);

        assert_eq!(coordinator.refresh_all(), 2);
        assert!(coordinator.wait_idle(WAIT));

        let published = coordinator.published();
        assert_eq!(published.len(), 2);

        let gdrive = &published[0];
        assert_eq!(gdrive.remote().as_str(), "gdrive");
        let usage = gdrive.usage().unwrap();
        assert_eq!(usage.total, Some(100_000_000_000));
        assert_eq!(usage.used, Some(40_000_000_000));
        assert_eq!(usage.free, Some(60_000_000_000));

        let onedrive = &published[1];
        assert!(matches!(onedrive.error(), Some(FetchError::Timeout { .. })));

        let events = drain(&rx);
        assert!(matches!(events[0], Event::RemoteListChanged(ref d) if d.len() == 2));
        let mut names = published_remotes(&events);
        names.sort();
        assert_eq!(names, ["gdrive", "onedrive"]);
    }

    #[test]
    fn test_refresh_one_coalesces_while_in_flight() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _rx) = coordinator_with(Arc::clone(&backend));
        coordinator.set_drives(vec![drive("gdrive"), drive("onedrive")]);

        backend.hold("gdrive");
        assert!(coordinator.refresh_one(&remote("gdrive")));
        assert!(!coordinator.refresh_one(&remote("gdrive")));
        // Only onedrive is free to start
        assert_eq!(coordinator.refresh_all(), 1);

        backend.release("gdrive");
        assert!(coordinator.wait_idle(WAIT));
        assert_eq!(backend.calls("gdrive"), 1);
        assert_eq!(backend.calls("onedrive"), 1);
    }

    #[test]
    fn test_refresh_one_ignores_unmonitored() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _rx) = coordinator_with(Arc::clone(&backend));
        let mut disabled = drive("dropbox");
        disabled.enabled = false;
        coordinator.set_drives(vec![drive("gdrive"), disabled]);

        assert!(!coordinator.refresh_one(&remote("dropbox")));
        assert!(!coordinator.refresh_one(&remote("nowhere")));
        assert_eq!(coordinator.drives().len(), 1);
        assert_eq!(backend.calls("dropbox"), 0);
    }

    #[test]
    fn test_removed_while_in_flight_is_never_published() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, rx) = coordinator_with(Arc::clone(&backend));
        coordinator.set_drives(vec![drive("gdrive"), drive("onedrive")]);

        backend.hold("gdrive");
        assert!(coordinator.refresh_one(&remote("gdrive")));
        coordinator.set_drives(vec![drive("onedrive")]);
        backend.release("gdrive");

        assert!(coordinator.wait_idle(WAIT));
        assert!(
            coordinator
                .published()
                .iter()
                .all(|s| s.remote().as_str() != "gdrive")
        );
        assert!(published_remotes(&drain(&rx)).is_empty());
    }

    #[test]
    fn test_set_drives_drops_stale_statuses() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _rx) = coordinator_with(backend);
        coordinator.set_drives(vec![drive("gdrive"), drive("onedrive")]);
        coordinator.refresh_all();
        assert!(coordinator.wait_idle(WAIT));

        coordinator.set_drives(vec![drive("onedrive")]);
        let remaining: Vec<String> = coordinator
            .published()
            .iter()
            .map(|s| s.remote().to_string())
            .collect();
        assert_eq!(remaining, ["onedrive"]);
    }

    #[test]
    fn test_tick_skips_while_manual_refresh_in_flight() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _rx) = coordinator_with(Arc::clone(&backend));
        coordinator.set_drives(vec![drive("gdrive"), drive("onedrive")]);

        backend.hold("gdrive");
        assert!(coordinator.refresh_one(&remote("gdrive")));
        assert_eq!(coordinator.tick(), 0);
        assert_eq!(coordinator.in_flight(), vec![remote("gdrive")]);

        backend.release("gdrive");
        assert!(coordinator.wait_idle(WAIT));
        assert_eq!(coordinator.tick(), 2);
        assert!(coordinator.wait_idle(WAIT));
        assert_eq!(backend.calls("gdrive"), 2);
    }

    #[test]
    fn test_partial_completion_publishes_independently() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, rx) = coordinator_with(Arc::clone(&backend));
        coordinator.set_drives(vec![drive("gdrive"), drive("onedrive")]);

        backend.hold("onedrive");
        assert_eq!(coordinator.refresh_all(), 2);

        let first = loop {
            match rx.recv_timeout(WAIT).unwrap() {
                Event::StatusPublished { remote, .. } => break remote,
                _ => continue,
            }
        };
        assert_eq!(first.as_str(), "gdrive");
        assert_eq!(coordinator.published().len(), 1);
        assert_eq!(coordinator.in_flight(), vec![remote("onedrive")]);
        assert!(!coordinator.wait_idle(Duration::from_millis(50)));

        backend.release("onedrive");
        assert!(coordinator.wait_idle(WAIT));
        assert_eq!(coordinator.published().len(), 2);
    }

    #[test]
    fn test_wait_idle_with_unbounded_timeout() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, _rx) = coordinator_with(backend);
        coordinator.set_drives(vec![drive("gdrive")]);

        // Nothing in flight returns at once
        assert!(coordinator.wait_idle(Duration::MAX));

        coordinator.refresh_all();
        assert!(coordinator.wait_idle(Duration::from_secs(i64::MAX as u64)));
        assert_eq!(coordinator.published().len(), 1);
    }

    #[test]
    fn test_enumerate_failure_emits_event() {
        let backend = Arc::new(MockBackend::failing_listing());
        let (coordinator, rx) = coordinator_with(backend);

        assert!(coordinator.enumerate().is_err());
        match rx.try_recv().unwrap() {
            Event::EnumerationFailed(message) => assert!(message.contains("config file is corrupt")),
            other => panic!("expected EnumerationFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_enumerate_success_emits_nothing() {
        let backend = Arc::new(MockBackend::default());
        let (coordinator, rx) = coordinator_with(backend);

        assert_eq!(
            coordinator.enumerate().unwrap(),
            vec![remote("gdrive"), remote("onedrive")]
        );
        assert!(rx.try_recv().is_err());
    }
}
