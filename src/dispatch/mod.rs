// src/dispatch/mod.rs

//! Job dispatcher: runs each fire's step chain under a global limit on the
//! number of fires in flight.
//!
//! The pure per-fire state machine lives in [`chain`]; the async shell that
//! acquires slots, consults the oracle, launches steps and classifies
//! failures is [`dispatcher::Dispatcher`].

use tokio::sync::watch;

pub mod chain;
pub mod dispatcher;
pub mod launcher;
pub mod summary;

pub use chain::{ChainCommand, ChainEvent, FireChain, FireState, InvalidTransition};
pub use dispatcher::Dispatcher;
pub use launcher::{ProcessLauncher, StepLauncher, StepOutcome};
pub use summary::{DispatchSummary, FireReport, StepReport, StepResult};

/// Receiving side of the operator-interrupt signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// A sender/token pair; `send(true)` on the sender cancels every clone
    /// of the token.
    pub fn channel() -> (watch::Sender<bool>, Self) {
        let (tx, rx) = watch::channel(false);
        (tx, Self { rx })
    }

    /// A token that is never cancelled.
    pub fn never() -> Self {
        Self::channel().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. Never resolves if the sender
    /// is gone without having cancelled.
    pub async fn cancelled(&mut self) {
        let result = self.rx.wait_for(|cancelled| *cancelled).await.map(|_| ());
        if result.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
