//! Single swappable receiver of queue depth reports

use crate::error::Result;
use crate::types::QueueDepthReport;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::warn;

/// Something that wants to hear about queue occupancy (usually the connected listener)
pub trait DepthObserver: Send + Sync {
    fn observe(&self, report: &QueueDepthReport) -> Result<()>;
}

/// Holds at most one observer at a time.
///
/// Both pipeline queues share one slot; whoever owns the listener connection
/// swaps it. Reporting snapshots the current observer once and never fails.
#[derive(Default)]
pub struct ObserverSlot {
    current: RwLock<Option<Arc<dyn DepthObserver>>>,
}

impl ObserverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `observer`, returning the one it displaced
    pub fn replace(&self, observer: Arc<dyn DepthObserver>) -> Option<Arc<dyn DepthObserver>> {
        self.current.write().replace(observer)
    }

    pub fn clear(&self) -> Option<Arc<dyn DepthObserver>> {
        self.current.write().take()
    }

    /// Clear the slot only if it still holds `observer`
    pub fn clear_if_current(&self, observer: &Arc<dyn DepthObserver>) -> bool {
        let mut current = self.current.write();
        let is_current = current
            .as_ref()
            .map(|installed| same_observer(installed, observer))
            .unwrap_or(false);
        if is_current {
            *current = None;
        }
        is_current
    }

    pub fn current(&self) -> Option<Arc<dyn DepthObserver>> {
        self.current.read().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_none()
    }

    /// Deliver a report to the current observer, logging delivery failures
    pub fn notify(&self, report: &QueueDepthReport) {
        let Some(observer) = self.current() else {
            return;
        };
        if let Err(e) = observer.observe(report) {
            warn!("Could not report {} to observer: {}", report, e);
        }
    }
}

fn same_observer(a: &Arc<dyn DepthObserver>, b: &Arc<dyn DepthObserver>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
