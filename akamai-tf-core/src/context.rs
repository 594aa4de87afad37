//! Operation context carrying a deadline and a cancellation signal
//!
//! Every resource operation receives a context. Waiting is only ever done
//! through [`OperationContext::sleep`] or [`OperationContext::run`], both of
//! which race the deadline and the cancellation signal.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep_until};

/// Why a wait ended early
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Interrupted {
    #[error("deadline exceeded")]
    Timeout,
    #[error("operation canceled")]
    Canceled,
}

/// Deadline and cancellation scope for a single operation
#[derive(Debug, Clone)]
pub struct OperationContext {
    deadline: Option<Instant>,
    cancel: watch::Receiver<bool>,
}

/// Handle used to cancel every context derived from it
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // send_replace never fails, even when every receiver is gone
        self.tx.send_replace(true);
    }
}

impl OperationContext {
    /// A context with no deadline that is never canceled
    pub fn background() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self {
            deadline: None,
            cancel: rx,
        }
    }

    /// A context that can be canceled through the returned handle
    pub fn cancellable() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        (
            Self {
                deadline: None,
                cancel: rx,
            },
            CancelHandle { tx },
        )
    }

    /// Derive a context whose deadline is at most `timeout` from now
    ///
    /// A timeout too large to represent leaves the current deadline (if any)
    /// in place.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let deadline = match (self.deadline, Instant::now().checked_add(timeout)) {
            (Some(existing), Some(candidate)) => Some(existing.min(candidate)),
            (existing, None) => existing,
            (None, candidate) => candidate,
        };
        Self {
            deadline,
            cancel: self.cancel.clone(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Fail fast when the context is already done
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            Err(Interrupted::Canceled)
        } else if self.is_expired() {
            Err(Interrupted::Timeout)
        } else {
            Ok(())
        }
    }

    /// Resolves once the context is canceled; never resolves otherwise
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                if *rx.borrow() {
                    return;
                }
                std::future::pending::<()>().await;
            }
        }
    }

    /// Resolves once the deadline elapses; never resolves without a deadline
    pub async fn deadline_reached(&self) {
        match self.deadline {
            Some(deadline) => sleep_until(deadline).await,
            None => std::future::pending::<()>().await,
        }
    }

    /// Sleep for `duration`, or less if the context ends first
    ///
    /// A sleep that would end at or after the deadline returns
    /// [`Interrupted::Timeout`] when the deadline is reached.
    pub async fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.check()?;
        let wake = Instant::now() + duration;
        match self.deadline {
            Some(deadline) if deadline <= wake => {
                tokio::select! {
                    biased;
                    _ = self.cancelled() => Err(Interrupted::Canceled),
                    _ = sleep_until(deadline) => Err(Interrupted::Timeout),
                }
            }
            _ => {
                tokio::select! {
                    biased;
                    _ = self.cancelled() => Err(Interrupted::Canceled),
                    _ = sleep_until(wake) => Ok(()),
                }
            }
        }
    }

    /// Drive `fut` to completion unless the context ends first
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Interrupted::Canceled),
            _ = self.deadline_reached() => Err(Interrupted::Timeout),
            out = fut => Ok(out),
        }
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::background()
    }
}
