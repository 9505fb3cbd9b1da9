//! Write-once slot for the first address a resolver produces.
//!
//! # State Transitions
//! ```text
//! Pending → Resolved: first non-empty Success
//! Pending → Failed:   Failure
//! Failed  → Failed:   Failure (latest failure kept)
//! Failed  → Resolved: first non-empty Success
//! Resolved: terminal, every later result is ignored
//! ```
//!
//! A `Failed` state only ends waits that were already in progress when it
//! was published. Waits that start afterwards keep waiting for a success.

use std::time::Duration;

use tokio::sync::watch;

use crate::resolver::{ResolvedAddress, Status};

/// Current state of an [`AddressCell`].
#[derive(Debug, Clone)]
pub enum CellState {
    Pending,
    Failed(Status),
    Resolved(ResolvedAddress),
}

/// Why a wait on an [`AddressCell`] ended without an address.
#[derive(Debug, Clone)]
pub enum WaitError {
    Failed(Status),
    TimedOut,
}

/// Single-assignment address slot, safe to write from any thread.
#[derive(Debug)]
pub struct AddressCell {
    tx: watch::Sender<CellState>,
}

impl AddressCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CellState::Pending);
        Self { tx }
    }

    /// Store `address` unless one is already set. Returns true if it was stored.
    pub fn set_address(&self, address: ResolvedAddress) -> bool {
        self.tx.send_if_modified(|state| {
            if matches!(state, CellState::Resolved(_)) {
                return false;
            }
            *state = CellState::Resolved(address);
            true
        })
    }

    /// Record a failure unless an address is already set.
    pub fn set_failure(&self, status: Status) -> bool {
        self.tx.send_if_modified(|state| {
            if matches!(state, CellState::Resolved(_)) {
                return false;
            }
            *state = CellState::Failed(status);
            true
        })
    }

    pub fn state(&self) -> CellState {
        self.tx.borrow().clone()
    }

    /// Wait for an address, at most `timeout`.
    ///
    /// Returns at once if the cell is already resolved. Otherwise a failure
    /// published after the wait began ends it with [`WaitError::Failed`]; a
    /// failure recorded before the wait began does not, so new callers keep
    /// their full budget while the resolver retries.
    pub async fn wait(&self, timeout: Duration) -> Result<ResolvedAddress, WaitError> {
        let mut rx = self.tx.subscribe();
        if let CellState::Resolved(a) = &*rx.borrow_and_update() {
            return Ok(a.clone());
        }

        let next = async {
            loop {
                // The sender lives as long as `self`, so the channel cannot close here.
                if rx.changed().await.is_err() {
                    return Err(WaitError::TimedOut);
                }
                match &*rx.borrow_and_update() {
                    CellState::Resolved(a) => return Ok(a.clone()),
                    CellState::Failed(s) => return Err(WaitError::Failed(s.clone())),
                    CellState::Pending => continue,
                }
            }
        };

        tokio::time::timeout(timeout, next)
            .await
            .unwrap_or(Err(WaitError::TimedOut))
    }
}

impl Default for AddressCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::StatusCode;
    use std::sync::Arc;

    #[test]
    fn test_first_address_wins() {
        let cell = AddressCell::new();
        assert!(cell.set_address(ResolvedAddress::new("a", 1)));
        assert!(!cell.set_address(ResolvedAddress::new("b", 2)));
        assert!(!cell.set_failure(Status::new(StatusCode::Unavailable, "late")));

        match cell.state() {
            CellState::Resolved(a) => assert_eq!(a.endpoint.host, "a"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_success_replaces_failure() {
        let cell = AddressCell::new();
        assert!(cell.set_failure(Status::new(StatusCode::Unavailable, "down")));
        assert!(cell.set_address(ResolvedAddress::new("a", 1)));
        assert!(matches!(cell.state(), CellState::Resolved(_)));
    }

    #[tokio::test]
    async fn test_wait_resolves_from_other_task() {
        let cell = Arc::new(AddressCell::new());
        let writer = cell.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set_address(ResolvedAddress::new("backend", 8080));
        });

        let addr = cell.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(addr.endpoint.port, 8080);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let cell = AddressCell::new();
        let err = cell.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, WaitError::TimedOut));
    }

    #[tokio::test]
    async fn test_wait_fails_on_failure() {
        let cell = Arc::new(AddressCell::new());
        let writer = cell.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set_failure(Status::new(StatusCode::NotFound, "no such key"));
        });

        match cell.wait(Duration::from_secs(5)).await {
            Err(WaitError::Failed(s)) => assert_eq!(s.message, "no such key"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_earlier_failure_does_not_fail_new_wait() {
        let cell = Arc::new(AddressCell::new());
        cell.set_failure(Status::new(StatusCode::Unavailable, "lookup failed"));

        let writer = cell.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            writer.set_address(ResolvedAddress::new("backend", 8080));
        });

        let addr = cell.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(addr.endpoint.host, "backend");
    }

    #[tokio::test]
    async fn test_earlier_failure_then_timeout() {
        let cell = AddressCell::new();
        cell.set_failure(Status::new(StatusCode::Unavailable, "lookup failed"));
        let err = cell.wait(Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, WaitError::TimedOut));
        assert!(matches!(cell.state(), CellState::Failed(_)));
    }

    #[tokio::test]
    async fn test_wait_on_resolved_cell_returns_at_once() {
        let cell = AddressCell::new();
        cell.set_address(ResolvedAddress::new("a", 1));
        let addr = cell.wait(Duration::from_millis(1)).await.unwrap();
        assert_eq!(addr.endpoint.host, "a");
    }
}
