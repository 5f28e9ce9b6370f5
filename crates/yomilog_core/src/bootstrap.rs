//! Race-safe lazy initialization.
//!
//! The engine loads its collections from the durable medium on first
//! use, not at construction. Many consumers may issue their first
//! operation concurrently, so the bootstrap is an explicit three-state
//! machine:
//!
//! ```text
//! Uninitialized -> Initializing -> Ready
//! ```
//!
//! The first caller runs the initialization future; every caller that
//! arrives while it is in flight awaits the same shared completion
//! signal. Initialization therefore runs exactly once no matter how the
//! first operations interleave.

use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use tokio::sync::watch;

#[derive(Debug)]
enum Phase {
    Uninitialized,
    Initializing(watch::Receiver<bool>),
    Ready,
}

/// What a caller of [`Bootstrap::ensure`] has to do.
enum Role {
    Run(watch::Sender<bool>),
    Wait(watch::Receiver<bool>),
    Done,
}

/// The three-state bootstrap guard.
pub(crate) struct Bootstrap {
    phase: Mutex<Phase>,
}

impl Bootstrap {
    /// Creates a guard in the uninitialized state.
    pub fn new() -> Self {
        Self {
            phase: Mutex::new(Phase::Uninitialized),
        }
    }

    /// Returns true once initialization has completed.
    pub fn is_ready(&self) -> bool {
        matches!(*self.phase.lock(), Phase::Ready)
    }

    /// Runs `init` exactly once, no matter how many callers race here.
    ///
    /// The first caller executes the future; concurrent callers await
    /// its completion; later callers return immediately.
    pub async fn ensure<F, Fut>(&self, init: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ()>,
    {
        let role = {
            let mut phase = self.phase.lock();
            match &*phase {
                Phase::Ready => Role::Done,
                Phase::Initializing(rx) => Role::Wait(rx.clone()),
                Phase::Uninitialized => {
                    let (tx, rx) = watch::channel(false);
                    *phase = Phase::Initializing(rx);
                    Role::Run(tx)
                }
            }
        };

        match role {
            Role::Done => {}
            Role::Wait(mut rx) => {
                // If the sender is gone the initializing task died; fall
                // through rather than leaving every caller stuck.
                let _ = rx.wait_for(|done| *done).await;
            }
            Role::Run(tx) => {
                init().await;
                *self.phase.lock() = Phase::Ready;
                let _ = tx.send(true);
            }
        }
    }
}

impl fmt::Debug for Bootstrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match &*self.phase.lock() {
            Phase::Uninitialized => "Uninitialized",
            Phase::Initializing(_) => "Initializing",
            Phase::Ready => "Ready",
        };
        f.debug_struct("Bootstrap").field("phase", &phase).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn runs_init_exactly_once() {
        let bootstrap = Bootstrap::new();
        let runs = AtomicUsize::new(0);

        for _ in 0..3 {
            bootstrap
                .ensure(|| async {
                    runs.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        }

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(bootstrap.is_ready());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_initialization() {
        let bootstrap = Arc::new(Bootstrap::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let task = |bootstrap: Arc<Bootstrap>, runs: Arc<AtomicUsize>| async move {
            bootstrap
                .ensure(|| async {
                    // Suspend mid-initialization so the other callers
                    // arrive while the state machine is in flight.
                    tokio::task::yield_now().await;
                    tokio::task::yield_now().await;
                    runs.fetch_add(1, Ordering::SeqCst);
                })
                .await;
        };

        tokio::join!(
            task(Arc::clone(&bootstrap), Arc::clone(&runs)),
            task(Arc::clone(&bootstrap), Arc::clone(&runs)),
            task(Arc::clone(&bootstrap), Arc::clone(&runs)),
        );

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(bootstrap.is_ready());
    }

    #[tokio::test]
    async fn waiters_resume_after_completion() {
        let bootstrap = Arc::new(Bootstrap::new());
        let b = Arc::clone(&bootstrap);

        let waiter = tokio::spawn(async move {
            b.ensure(|| async { panic!("second caller must never run init") })
                .await;
        });

        // This task claims the runner role before yielding; the spawned
        // waiter then observes the in-flight phase and awaits it.
        bootstrap
            .ensure(|| async {
                tokio::task::yield_now().await;
            })
            .await;
        waiter.await.unwrap();
        assert!(bootstrap.is_ready());
    }

    #[test]
    fn starts_uninitialized() {
        let bootstrap = Bootstrap::new();
        assert!(!bootstrap.is_ready());
    }
}
