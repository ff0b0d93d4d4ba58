// src/engine/actor.rs

use std::fmt;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, trace};

use crate::errors::{Result, SyncError};

use super::core::CoreRegistry;
use super::{RegistryMessage, RegistryView};

/// What travels through the actor's mailbox.
#[derive(Debug)]
enum Mail {
    Apply(RegistryMessage),
    /// Answered once every message sent before it has been applied.
    Flush(oneshot::Sender<()>),
}

/// Single writer of the process registry.
///
/// Every mutation, whatever its source (gateway continuation, event
/// handler, snapshot poll), is a message in one mailbox, applied in order
/// by this one task. That serialization is what makes the registry safe to
/// feed from many threads without a lock.
///
/// This is a pure IO shell around [`CoreRegistry`]: it reads the mailbox,
/// steps the core, and publishes the resulting view on a `watch` channel.
pub struct RegistryActor {
    core: CoreRegistry,
    mailbox: mpsc::UnboundedReceiver<Mail>,
    view_tx: watch::Sender<RegistryView>,
}

impl fmt::Debug for RegistryActor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryActor")
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

impl RegistryActor {
    pub fn new(core: CoreRegistry) -> (Self, RegistryHandle) {
        let (tx, mailbox) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(core.view().clone());

        let actor = Self {
            core,
            mailbox,
            view_tx,
        };
        let handle = RegistryHandle { tx, view_rx };
        (actor, handle)
    }

    /// Spawn the actor on the current Tokio runtime and return its handle.
    pub fn spawn(core: CoreRegistry) -> RegistryHandle {
        let (actor, handle) = Self::new(core);
        tokio::spawn(actor.run());
        handle
    }

    /// Main loop. Runs until every [`RegistryHandle`] has been dropped.
    pub async fn run(mut self) {
        info!("process registry started");

        while let Some(mail) = self.mailbox.recv().await {
            match mail {
                Mail::Apply(message) => {
                    trace!(?message, "registry received message");
                    if self.core.step(message) {
                        self.view_tx.send_replace(self.core.view().clone());
                    }
                }
                Mail::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }

        debug!("registry mailbox closed");
        info!("process registry exiting");
    }
}

/// Cheap, clonable access to the registry actor.
///
/// Writes go through [`RegistryHandle::send`]; reads are snapshots of the
/// last published [`RegistryView`].
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::UnboundedSender<Mail>,
    view_rx: watch::Receiver<RegistryView>,
}

impl RegistryHandle {
    /// Queue a message. Never blocks.
    pub fn send(&self, message: RegistryMessage) -> Result<()> {
        self.tx
            .send(Mail::Apply(message))
            .map_err(|_| SyncError::RegistryClosed)
    }

    /// Wait until every message sent before this call has been applied.
    pub async fn flush(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Mail::Flush(ack_tx))
            .map_err(|_| SyncError::RegistryClosed)?;
        ack_rx.await.map_err(|_| SyncError::RegistryClosed)
    }

    /// Receiver that is notified after every change.
    pub fn subscribe(&self) -> watch::Receiver<RegistryView> {
        self.view_rx.clone()
    }

    /// Copy of the current view.
    pub fn snapshot(&self) -> RegistryView {
        self.view_rx.borrow().clone()
    }
}
