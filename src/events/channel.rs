//! Event channel implementation using crossbeam-channel.
//!
//! Carries diagnostic events from the cache to whoever is listening
//! (a CLI, a UI, a test).

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{CacheEvent, Event};

/// Sends events from the cache.
///
/// Thin wrapper around crossbeam's Sender; cheap to clone and safe to
/// move into blocking tasks.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event. Non-blocking if the channel isn't full.
    ///
    /// If the receiver is dropped, the event is silently discarded.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }

    /// Shorthand for sending a cache event
    pub fn cache(&self, event: CacheEvent) {
        self.send(Event::Cache(event));
    }
}

/// Receives events from the cache.
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event is received
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&self) -> Option<Event> {
        self.inner.try_recv().ok()
    }

    /// Drain every event currently queued without blocking
    pub fn drain(&self) -> Vec<Event> {
        self.inner.try_iter().collect()
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create a new unbounded event channel.
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A no-op event sender for when nobody is listening.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}
