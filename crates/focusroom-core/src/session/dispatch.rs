//! Fire-and-forget delivery of collaborator side effects.
//!
//! The state machine never waits on a collaborator. Jobs either run inline
//! (deterministic hosts and tests) or are queued to a single tokio worker that
//! runs them one at a time, in submission order.

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::error::{CoreError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Clone)]
pub enum Dispatcher {
    Inline,
    Serial(mpsc::UnboundedSender<Job>),
}

impl Dispatcher {
    pub fn inline() -> Self {
        Dispatcher::Inline
    }

    /// Start a serial worker on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Runtime`] when called outside a runtime.
    pub fn spawn_serial() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        Ok(Self::spawn_serial_on(&handle))
    }

    pub fn spawn_serial_on(handle: &Handle) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        handle.spawn(async move {
            while let Some(job) = rx.recv().await {
                // Collaborators may call into platform APIs; keep them off the
                // async workers but still strictly one after another.
                if let Err(e) = tokio::task::spawn_blocking(job).await {
                    warn!("side-effect job panicked: {e}");
                }
            }
        });
        Dispatcher::Serial(tx)
    }

    pub fn dispatch<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match self {
            Dispatcher::Inline => job(),
            Dispatcher::Serial(tx) => {
                if tx.send(Box::new(job)).is_err() {
                    warn!("side-effect worker has shut down; dropping job");
                }
            }
        }
    }

    /// Wait until every job submitted so far has run.
    pub async fn settle(&self) {
        if let Dispatcher::Serial(tx) = self {
            let (done_tx, done_rx) = oneshot::channel();
            let marker: Job = Box::new(move || {
                let _ = done_tx.send(());
            });
            if tx.send(marker).is_ok() {
                let _ = done_rx.await;
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatcher::Inline => f.write_str("Dispatcher::Inline"),
            Dispatcher::Serial(_) => f.write_str("Dispatcher::Serial"),
        }
    }
}
