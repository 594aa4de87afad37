//! Poll - Wait for an asynchronous remote operation to reach a terminal state
//!
//! The loop fetches the current status, classifies it, and either returns,
//! fails, or sleeps. A fetch that finds nothing yet (propagation lag right
//! after a submit) is retried on the shorter `not_found_interval`. Every
//! fetch and every sleep is bounded by the operation context, so the loop
//! never polls past the deadline.

use std::future::Future;
use std::time::Duration;

use log::debug;

use crate::context::{Interrupted, OperationContext};
use crate::provider::{ErrorKind, ProviderError, ProviderResult};

/// Classification of an observed status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Still in progress; poll again
    Pending,
    /// Reached the desired terminal state
    Done,
    /// Reached a terminal failure state
    Failed(String),
    /// The pending request was aborted remotely
    Aborted,
}

/// Poll timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Wait between status checks while the operation is pending
    pub interval: Duration,
    /// Wait between retries while the entity is not visible yet
    pub not_found_interval: Duration,
}

impl PollOptions {
    pub fn new(interval: Duration, not_found_interval: Duration) -> Self {
        Self {
            interval,
            not_found_interval,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("{operation} failed: {reason}")]
    Failed { operation: String, reason: String },

    #[error("{operation}: pending request aborted")]
    Aborted { operation: String },

    #[error(
        "timed out waiting for {operation}; the change may still complete remotely, re-run apply to resume"
    )]
    Timeout { operation: String },

    #[error("{operation} was canceled")]
    Canceled { operation: String },

    #[error("{operation}: status lookup failed: {source}")]
    Fetch {
        operation: String,
        #[source]
        source: ProviderError,
    },
}

impl PollError {
    fn interrupted(operation: &str, interrupted: Interrupted) -> Self {
        match interrupted {
            Interrupted::Timeout => Self::Timeout {
                operation: operation.to_string(),
            },
            Interrupted::Canceled => Self::Canceled {
                operation: operation.to_string(),
            },
        }
    }
}

impl From<PollError> for ProviderError {
    fn from(err: PollError) -> Self {
        let kind = match &err {
            PollError::Failed { .. } | PollError::Aborted { .. } => ErrorKind::RemoteFailure,
            PollError::Timeout { .. } => ErrorKind::Timeout,
            PollError::Canceled { .. } => ErrorKind::Canceled,
            PollError::Fetch { source, .. } => source.kind,
        };
        ProviderError::new(err.to_string()).with_kind(kind)
    }
}

/// Poll `fetch` until `classify` reports a terminal phase
///
/// `fetch` returns `Ok(None)` while the entity is not visible yet.
pub async fn poll_until<T, F, Fut, C>(
    ctx: &OperationContext,
    options: PollOptions,
    operation: &str,
    mut fetch: F,
    classify: C,
) -> Result<T, PollError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<Option<T>>>,
    C: Fn(&T) -> Phase,
{
    let mut attempts: u32 = 0;
    loop {
        attempts += 1;
        let observed = ctx
            .run(fetch())
            .await
            .map_err(|i| PollError::interrupted(operation, i))?
            .map_err(|source| PollError::Fetch {
                operation: operation.to_string(),
                source,
            })?;

        let wait = match observed {
            None => {
                debug!(
                    "{}: not visible yet (attempt {}), retrying in {:?}",
                    operation, attempts, options.not_found_interval
                );
                options.not_found_interval
            }
            Some(value) => match classify(&value) {
                Phase::Done => return Ok(value),
                Phase::Failed(reason) => {
                    return Err(PollError::Failed {
                        operation: operation.to_string(),
                        reason,
                    });
                }
                Phase::Aborted => {
                    return Err(PollError::Aborted {
                        operation: operation.to_string(),
                    });
                }
                Phase::Pending => {
                    debug!(
                        "{}: still pending (attempt {}), retrying in {:?}",
                        operation, attempts, options.interval
                    );
                    options.interval
                }
            },
        };

        ctx.sleep(wait)
            .await
            .map_err(|i| PollError::interrupted(operation, i))?;
    }
}
