//! Two-step cancellation for screening batches.
//!
//! The first request is a soft cancel: no new records are started, in-flight
//! records finish. A second request escalates to a hard cancel: in-flight work
//! is aborted. Requests after that are no-ops.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelState {
    Running,
    SoftCancelRequested,
    HardCancelRequested,
}

impl CancelState {
    #[must_use]
    pub const fn escalate(self) -> Self {
        match self {
            Self::Running => Self::SoftCancelRequested,
            Self::SoftCancelRequested | Self::HardCancelRequested => Self::HardCancelRequested,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::SoftCancelRequested => "soft_cancel_requested",
            Self::HardCancelRequested => "hard_cancel_requested",
        }
    }
}

impl fmt::Display for CancelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, cloneable cancellation handle.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<watch::Sender<CancelState>>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CancelState::Running);
        Self { state: Arc::new(tx) }
    }

    #[must_use]
    pub fn state(&self) -> CancelState {
        *self.state.borrow()
    }

    /// Escalate one step and return the new state.
    pub fn request(&self) -> CancelState {
        let mut next = CancelState::Running;
        self.state.send_modify(|state| {
            *state = state.escalate();
            next = *state;
        });
        next
    }

    pub fn request_soft(&self) {
        self.state.send_if_modified(|state| {
            if *state == CancelState::Running {
                *state = CancelState::SoftCancelRequested;
                true
            } else {
                false
            }
        });
    }

    pub fn request_hard(&self) {
        self.state.send_replace(CancelState::HardCancelRequested);
    }

    /// Any cancellation requested. New work must not start.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.state() != CancelState::Running
    }

    #[must_use]
    pub fn is_hard_cancelled(&self) -> bool {
        self.state() == CancelState::HardCancelRequested
    }

    /// Resolves once a hard cancel has been requested.
    pub async fn hard_cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|s| *s == CancelState::HardCancelRequested).await;
    }

    /// Escalate on every Ctrl-C until a hard cancel has been requested.
    #[must_use]
    pub fn listen_for_interrupts(&self) -> JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(%e, "cancel: could not listen for interrupts");
                    return;
                }
                match token.request() {
                    CancelState::HardCancelRequested => {
                        tracing::warn!("cancel: hard cancel requested, aborting in-flight records");
                        return;
                    }
                    state => {
                        tracing::warn!(
                            %state,
                            "cancel: finishing in-flight records; interrupt again to abort",
                        );
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn requests_escalate_and_saturate() {
        let token = CancellationToken::new();
        assert_eq!(token.state(), CancelState::Running);
        assert_eq!(token.request(), CancelState::SoftCancelRequested);
        assert!(token.is_cancelled());
        assert!(!token.is_hard_cancelled());
        assert_eq!(token.request(), CancelState::HardCancelRequested);
        assert_eq!(token.request(), CancelState::HardCancelRequested);
    }

    #[test]
    fn soft_request_never_downgrades() {
        let token = CancellationToken::new();
        token.request_hard();
        token.request_soft();
        assert_eq!(token.state(), CancelState::HardCancelRequested);
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        other.request();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn hard_cancelled_wakes_waiters() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.hard_cancelled().await })
        };
        token.request();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        token.request();
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }
}
