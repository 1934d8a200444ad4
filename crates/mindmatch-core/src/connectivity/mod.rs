//! Online/offline connectivity tracking.

use tokio::sync::watch;

/// A change of connectivity state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    WentOnline,
    WentOffline,
}

impl Transition {
    const fn from_online(online: bool) -> Self {
        if online {
            Self::WentOnline
        } else {
            Self::WentOffline
        }
    }
}

/// Holds the current online flag and broadcasts transitions.
///
/// The flag is seeded from the platform signal at startup. Setting the same
/// value again is a no-op and does not wake subscribers.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _receiver) = watch::channel(initially_online);
        Self { sender }
    }

    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Record a platform connectivity signal.
    ///
    /// Returns the transition when the state actually changed.
    pub fn set_online(&self, online: bool) -> Option<Transition> {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if !changed {
            return None;
        }

        let transition = Transition::from_online(online);
        if online {
            tracing::info!("Network: online");
        } else {
            tracing::warn!("Network: offline");
        }
        Some(transition)
    }

    /// Listen for future transitions. The current state is not replayed.
    pub fn subscribe(&self) -> TransitionListener {
        TransitionListener {
            receiver: self.sender.subscribe(),
        }
    }
}

/// Receives connectivity transitions from a [`ConnectivityMonitor`].
#[derive(Debug)]
pub struct TransitionListener {
    receiver: watch::Receiver<bool>,
}

impl TransitionListener {
    /// Wait for the next transition.
    ///
    /// Returns `None` once the monitor is dropped. Rapid flaps are coalesced
    /// into the latest state.
    pub async fn next(&mut self) -> Option<Transition> {
        self.receiver.changed().await.ok()?;
        let online = *self.receiver.borrow_and_update();
        Some(Transition::from_online(online))
    }
}
