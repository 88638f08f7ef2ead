//! # Network Monitor
//!
//! Passive observer of the platform network stack. The platform probe
//! reports samples via [`NetworkMonitor::report`]; the monitor keeps the
//! process-wide connectivity state readable at any time and fires an
//! edge-triggered event only on the `Disconnected -> Connected`
//! transition, never on repeats or the reverse edge.
//!
//! The state starts out optimistic (`Connected`) until the first real
//! sample arrives, so the first write intent is never spuriously queued.

use tokio::sync::{broadcast, watch};

/// Process-wide connectivity state, single writer, many readers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Connected,
    Disconnected,
}

/// Edge-triggered connectivity event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// The `Disconnected -> Connected` edge: the only trigger for
    /// reconciliation
    BecameConnected,
}

/// Connectivity monitor fed by a platform path probe
#[derive(Debug)]
pub struct NetworkMonitor {
    state: watch::Sender<ConnectivityState>,
    events: broadcast::Sender<ConnectivityEvent>,
}

impl NetworkMonitor {
    /// Create a monitor, optimistic until the first sample
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectivityState::Connected);
        let (events, _) = broadcast::channel(16);
        Self { state, events }
    }

    /// Current connectivity state
    pub fn state(&self) -> ConnectivityState {
        *self.state.borrow()
    }

    /// Whether the last sample reported connectivity
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectivityState::Connected
    }

    /// Apply a sample from the platform probe.
    ///
    /// Publishes the new state synchronously from a reader's perspective,
    /// then fires `BecameConnected` if this was the reconnect edge.
    pub fn report(&self, sample: ConnectivityState) {
        let previous = *self.state.borrow();
        self.state.send_replace(sample);

        if previous != sample {
            tracing::info!(?previous, current = ?sample, "connectivity changed");
        }
        if previous == ConnectivityState::Disconnected && sample == ConnectivityState::Connected {
            // No subscribers yet is fine; the edge is simply unobserved.
            let _ = self.events.send(ConnectivityEvent::BecameConnected);
        }
    }

    /// Subscribe to reconnect edges
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectivityEvent> {
        self.events.subscribe()
    }

    /// Watch the raw state, e.g. for UI indicators
    pub fn watch(&self) -> watch::Receiver<ConnectivityState> {
        self.state.subscribe()
    }
}

impl Default for NetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}
