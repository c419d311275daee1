//! Window abstraction for the host side of the message channel.
//!
//! `MessageChannel` is where the controller binds its listener, and
//! `MessageTarget` is anything a reply can be posted to. `LocalWindow`
//! implements both in-process: embedders bridging a real browser feed it
//! inbound events with `deliver`, and tests read what was posted to it.

use dashmap::DashMap;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

/// A window that accepts posted messages.
pub trait MessageTarget: Send + Sync {
    /// Fire-and-forget delivery. `target_origin` is either `"*"` or the exact
    /// origin the receiving window must have.
    fn post_message(&self, data: Value, target_origin: &str);
}

/// Shared handle to a window.
pub type WindowRef = Arc<dyn MessageTarget>;

/// An event arriving on the host window's message channel.
#[derive(Clone)]
pub struct InboundMessage {
    pub data: Value,
    /// Origin of the sending document.
    pub origin: String,
    /// The sending window, if it still exists.
    pub source: Option<WindowRef>,
}

impl InboundMessage {
    pub fn new(data: Value, origin: impl Into<String>, source: Option<WindowRef>) -> Self {
        Self {
            data,
            origin: origin.into(),
            source,
        }
    }
}

impl fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundMessage")
            .field("data", &self.data)
            .field("origin", &self.origin)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

/// Callback bound to a message channel.
pub type Listener = Arc<dyn Fn(&InboundMessage) + Send + Sync>;

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// The inbound side of a window.
pub trait MessageChannel: Send + Sync {
    fn add_listener(&self, listener: Listener) -> ListenerId;

    /// Returns `false` when the id was not bound.
    fn remove_listener(&self, id: ListenerId) -> bool;
}

/// A message posted to a `LocalWindow`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub data: Value,
    pub target_origin: String,
}

struct LocalInner {
    origin: String,
    listeners: DashMap<ListenerId, Listener>,
    next_id: AtomicU64,
    inbox_tx: mpsc::UnboundedSender<PostedMessage>,
    inbox_rx: Mutex<mpsc::UnboundedReceiver<PostedMessage>>,
}

/// In-process window.
#[derive(Clone)]
pub struct LocalWindow {
    inner: Arc<LocalInner>,
}

impl LocalWindow {
    pub fn new() -> Self {
        Self::with_origin("null")
    }

    /// A window whose document has `origin`. Posts naming another target
    /// origin are dropped, as a browser would.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(LocalInner {
                origin: origin.into(),
                listeners: DashMap::new(),
                next_id: AtomicU64::new(1),
                inbox_tx,
                inbox_rx: Mutex::new(inbox_rx),
            }),
        }
    }

    pub fn origin(&self) -> &str {
        &self.inner.origin
    }

    /// This window as a reply target.
    pub fn handle(&self) -> WindowRef {
        Arc::new(self.clone())
    }

    /// Dispatch an inbound event to every bound listener, in binding order.
    /// Returns how many listeners ran.
    pub fn deliver(&self, message: InboundMessage) -> usize {
        // Snapshot so listeners may add or remove bindings while running.
        let mut listeners: Vec<(ListenerId, Listener)> = self
            .inner
            .listeners
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        listeners.sort_by_key(|(id, _)| *id);

        for (_, listener) in &listeners {
            listener(&message);
        }
        listeners.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Wait for the next message posted to this window.
    pub async fn recv(&self) -> Option<PostedMessage> {
        self.inner.inbox_rx.lock().await.recv().await
    }

    pub async fn recv_timeout(&self, timeout: Duration) -> Option<PostedMessage> {
        tokio::time::timeout(timeout, self.recv()).await.ok().flatten()
    }

    /// Everything posted so far that nobody has received yet.
    pub fn try_drain(&self) -> Vec<PostedMessage> {
        let mut drained = Vec::new();
        if let Ok(mut rx) = self.inner.inbox_rx.try_lock() {
            while let Ok(message) = rx.try_recv() {
                drained.push(message);
            }
        }
        drained
    }
}

impl Default for LocalWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LocalWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalWindow")
            .field("origin", &self.inner.origin)
            .field("listeners", &self.inner.listeners.len())
            .finish()
    }
}

impl MessageTarget for LocalWindow {
    fn post_message(&self, data: Value, target_origin: &str) {
        if target_origin != "*" && target_origin != self.inner.origin {
            tracing::warn!(
                target_origin = %target_origin,
                window_origin = %self.inner.origin,
                "Dropping post with mismatched target origin"
            );
            return;
        }
        let _ = self.inner.inbox_tx.send(PostedMessage {
            data,
            target_origin: target_origin.to_string(),
        });
    }
}

impl MessageChannel for LocalWindow {
    fn add_listener(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.insert(id, listener);
        id
    }

    fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.remove(&id).is_some()
    }
}
