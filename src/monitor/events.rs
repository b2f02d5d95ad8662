//! Events published by the coordinator.
//!
//! The presentation side owns the receiving end and never touches
//! coordinator state directly; everything it draws arrives here.

use rclonekit::{DriveStatus, RemoteName};
use std::sync::mpsc;

use crate::config::DriveConfig;

#[derive(Debug, Clone)]
pub enum Event {
    /// A fetch finished for a monitored remote
    StatusPublished {
        remote: RemoteName,
        status: DriveStatus,
    },
    /// The monitored set changed; drives are in display order
    RemoteListChanged(Vec<DriveConfig>),
    /// Listing remotes failed; carries the tool's diagnostic
    EnumerationFailed(String),
}

/// Where the coordinator sends events. Called from worker threads.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: Event);
}

/// Sink backed by an mpsc channel
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink for ChannelSink {
    fn emit(&self, event: Event) {
        if self.tx.send(event).is_err() {
            log::trace!("Event receiver dropped, discarding event");
        }
    }
}

/// Create a channel sink and the receiver the presentation thread reads.
pub fn channel() -> (ChannelSink, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel();
    (ChannelSink { tx }, rx)
}
