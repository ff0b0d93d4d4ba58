// src/subscriber/lifecycle.rs

//! Attach/detach of event subscriptions.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::{RegistryHandle, RegistryMessage};
use crate::errors::{Result, SyncError};
use crate::events::EventChannel;
use crate::gateway::CommandGateway;
use crate::subscriber::dispatch::EventDispatcher;
use crate::subscriber::source::{EventSource, ListenerId};

/// Outcome of [`SubscriptionManager::attach`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachReport {
    /// Channels whose handler is now registered.
    pub registered: Vec<EventChannel>,
    /// Channels whose registration failed; already reported as a top-level
    /// error.
    pub failed: Vec<EventChannel>,
    /// Whether the initial snapshot poll succeeded.
    pub seeded: bool,
    /// `true` if the manager was already attached and nothing was done.
    pub already_attached: bool,
}

/// State of one attach cycle.
struct Session {
    attached: Arc<AtomicBool>,
    listeners: Vec<(EventChannel, ListenerId)>,
    /// Stops the periodic reconciliation task, if one is running.
    poll_cancel: Option<oneshot::Sender<()>>,
}

/// Registers event handlers exactly once per attach and removes them exactly
/// once per detach.
///
/// Each attach cycle gets a fresh `attached` flag shared with its handlers.
/// Detach clears it before unregistering, so an event racing the teardown
/// is discarded rather than applied.
pub struct SubscriptionManager {
    source: Arc<dyn EventSource>,
    gateway: CommandGateway,
    registry: RegistryHandle,
    poll_interval: Option<Duration>,
    session: Option<Session>,
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("attached", &self.is_attached())
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl SubscriptionManager {
    pub fn new(
        source: Arc<dyn EventSource>,
        gateway: CommandGateway,
        registry: RegistryHandle,
        poll_interval: Option<Duration>,
    ) -> Self {
        Self {
            source,
            gateway,
            registry,
            poll_interval,
            session: None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.session.is_some()
    }

    /// Register every channel handler, then seed state from one snapshot
    /// poll, then start periodic reconciliation if configured.
    ///
    /// A channel that fails to register is reported and skipped; the others
    /// keep working. A failed seed poll is reported but does not undo the
    /// subscriptions.
    pub async fn attach(&mut self) -> Result<AttachReport> {
        if self.session.is_some() {
            debug!("already attached; ignoring attach");
            return Ok(AttachReport {
                already_attached: true,
                ..AttachReport::default()
            });
        }

        let attached = Arc::new(AtomicBool::new(true));
        let dispatcher = EventDispatcher::new(self.registry.clone(), attached.clone());
        let mut report = AttachReport::default();
        let mut listeners = Vec::with_capacity(EventChannel::ALL.len());

        for channel in EventChannel::ALL {
            match self.source.listen(channel, dispatcher.handler_for(channel)) {
                Ok(listener) => {
                    listeners.push((channel, listener));
                    report.registered.push(channel);
                }
                Err(err) => {
                    let err = SyncError::Subscription {
                        channel,
                        message: err.to_string(),
                    };
                    warn!(%channel, error = %err, "failed to subscribe to event channel");
                    self.registry.send(RegistryMessage::ReportError {
                        message: err.to_string(),
                    })?;
                    report.failed.push(channel);
                }
            }
        }

        self.session = Some(Session {
            attached,
            listeners,
            poll_cancel: None,
        });

        // Covers processes that were already running before this attach.
        report.seeded = self.gateway.reconcile_snapshot().await.is_ok();

        if let Some(interval) = self.poll_interval {
            let cancel = spawn_poll_loop(self.gateway.clone(), interval);
            if let Some(session) = self.session.as_mut() {
                session.poll_cancel = Some(cancel);
            }
        }

        info!(
            registered = report.registered.len(),
            failed = report.failed.len(),
            seeded = report.seeded,
            "event subscriptions attached"
        );
        Ok(report)
    }

    /// Unregister every handler and stop periodic reconciliation. Calling it
    /// while detached does nothing.
    pub fn detach(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.attached.store(false, Ordering::Release);

        for (channel, listener) in &session.listeners {
            self.source.unlisten(*channel, *listener);
        }

        if let Some(cancel) = session.poll_cancel {
            let _ = cancel.send(());
        }

        info!(
            unregistered = session.listeners.len(),
            "event subscriptions detached"
        );
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Spawn the periodic snapshot poll. Dropping or firing the returned sender
/// stops it.
fn spawn_poll_loop(gateway: CommandGateway, period: Duration) -> oneshot::Sender<()> {
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; attach has just seeded.
        ticker.tick().await;

        debug!(?period, "periodic reconciliation started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = gateway.reconcile_snapshot().await {
                        debug!(error = %err, "periodic reconciliation poll failed");
                    }
                }
                _ = &mut cancel_rx => {
                    break;
                }
            }
        }
        debug!("periodic reconciliation stopped");
    });

    cancel_tx
}
