//! Shared state between the listener connection, the delivery loop and the
//! HTTP handlers

use crate::error::{Result, ServerError};
use crate::messages::ServerEvent;
use cliptalk_core::{AudioBuffer, DepthObserver, Error as CoreError, ObserverSlot, QueueDepthReport};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

/// Outbound side of one listener connection
pub struct ListenerHandle {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl ListenerHandle {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Arc::new(Self {
            id: Uuid::new_v4(),
            tx,
        });
        (handle, rx)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn send(&self, event: ServerEvent) -> Result<()> {
        self.tx
            .send(event)
            .map_err(|_| ServerError::Listener(format!("listener {} disconnected", self.id)))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the connection stopped consuming events
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

impl DepthObserver for ListenerHandle {
    fn observe(&self, report: &QueueDepthReport) -> cliptalk_core::Result<()> {
        self.tx
            .send(ServerEvent::from(report))
            .map_err(|_| CoreError::Observer(format!("listener {} disconnected", self.id)))
    }
}

struct ActiveListener {
    handle: Arc<ListenerHandle>,
    kick: oneshot::Sender<()>,
}

/// Process-wide pipeline session.
///
/// Holds at most one listener, the buffer whose audio `GET /audio` serves,
/// the advance signal and the monitoring flag.
pub struct Session {
    observers: Arc<ObserverSlot>,
    current_buffer: Mutex<Option<AudioBuffer>>,
    listener: Mutex<Option<ActiveListener>>,
    advance: watch::Sender<u64>,
    monitoring: watch::Sender<bool>,
    delivery: tokio::sync::Mutex<()>,
}

impl Session {
    pub fn new(observers: Arc<ObserverSlot>) -> Self {
        let (advance, _) = watch::channel(0);
        let (monitoring, _) = watch::channel(true);
        Self {
            observers,
            current_buffer: Mutex::new(None),
            listener: Mutex::new(None),
            advance,
            monitoring,
            delivery: tokio::sync::Mutex::new(()),
        }
    }

    pub fn observers(&self) -> &Arc<ObserverSlot> {
        &self.observers
    }

    /// Make `handle` the listener, disconnecting any previous one.
    ///
    /// The returned receiver fires when a later listener replaces this one.
    pub fn attach(&self, handle: Arc<ListenerHandle>) -> oneshot::Receiver<()> {
        let (kick, kicked) = oneshot::channel();
        let previous = self.listener.lock().replace(ActiveListener {
            handle: handle.clone(),
            kick,
        });

        if let Some(previous) = previous {
            info!(
                "Listener {} replaces {}; disconnecting the old one",
                handle.id(),
                previous.handle.id()
            );
            let _ = previous.kick.send(());
        }

        self.observers.replace(handle);
        kicked
    }

    /// Forget `handle` if it is still the listener
    pub fn detach(&self, handle: &Arc<ListenerHandle>) {
        {
            let mut listener = self.listener.lock();
            if listener.as_ref().map(|l| l.handle.id()) == Some(handle.id()) {
                *listener = None;
            }
        }

        let observer: Arc<dyn DepthObserver> = handle.clone();
        if self.observers.clear_if_current(&observer) {
            debug!("Depth reports stopped for listener {}", handle.id());
        }
    }

    pub fn listener_connected(&self) -> bool {
        self.listener.lock().is_some()
    }

    pub fn listener(&self) -> Option<Arc<ListenerHandle>> {
        self.listener.lock().as_ref().map(|l| l.handle.clone())
    }

    /// Only one delivery loop may consume the output queue at a time
    pub async fn delivery_turn(&self) -> MutexGuard<'_, ()> {
        self.delivery.lock().await
    }

    pub fn subscribe_advance(&self) -> watch::Receiver<u64> {
        self.advance.subscribe()
    }

    /// Make `buffer` the one served by `GET /audio`.
    ///
    /// Advance signals seen by `advance` before this point are discarded.
    pub fn select_buffer(&self, buffer: AudioBuffer, advance: &mut watch::Receiver<u64>) {
        let mut current = self.current_buffer.lock();
        *current = Some(buffer);
        advance.borrow_and_update();
    }

    pub fn current_buffer(&self) -> Option<AudioBuffer> {
        self.current_buffer.lock().clone()
    }

    /// Cancel the current utterance and release the delivery loop
    pub fn advance(&self) {
        let current = self.current_buffer.lock();
        if let Some(buffer) = current.as_ref() {
            buffer.shutdown(true);
        }
        self.advance.send_modify(|n| *n = n.wrapping_add(1));
        debug!("Advance requested");
    }

    pub fn monitoring(&self) -> bool {
        *self.monitoring.borrow()
    }

    pub fn subscribe_monitoring(&self) -> watch::Receiver<bool> {
        self.monitoring.subscribe()
    }

    /// Pause or resume text intake and tell the listener
    pub fn set_monitoring(&self, state: bool) {
        let previous = self.monitoring.send_replace(state);
        if previous != state {
            info!("Monitoring {}", if state { "resumed" } else { "paused" });
        }

        if let Some(listener) = self.listener() {
            if let Err(e) = listener.send(ServerEvent::ToggleMonitoring { state }) {
                debug!("{}", e);
            }
        }
    }
}
