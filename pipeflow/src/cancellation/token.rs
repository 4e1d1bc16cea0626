//! Cancellation token for cooperative cancellation.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::warn;

/// A callback type for cancellation notifications.
pub type CancelCallback = Box<dyn Fn() + Send + Sync>;

/// A token for cooperative cancellation.
///
/// The flag is monotonic: once cancelled, a token never becomes live again.
/// Cancellation is idempotent and only the first reason is kept. Tokens are
/// shared through `Arc` and checked by every hop at each suspension point.
pub struct CancellationToken {
    /// Whether cancellation has been requested.
    cancelled: AtomicBool,
    /// The reason for cancellation (first one wins).
    reason: RwLock<Option<String>>,
    /// Callbacks to invoke on cancellation.
    callbacks: RwLock<Vec<CancelCallback>>,
    /// Wakes tasks awaiting [`CancellationToken::cancelled`].
    signal: watch::Sender<bool>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            cancelled: AtomicBool::new(false),
            reason: RwLock::new(None),
            callbacks: RwLock::new(Vec::new()),
            signal,
        }
    }
}

impl CancellationToken {
    /// Creates a new cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept.
    /// Callbacks are invoked immediately. Panics in callbacks are logged and suppressed.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.reason.write() = Some(reason.into());
            self.signal.send_replace(true);

            let callbacks = self.callbacks.read();
            for callback in callbacks.iter() {
                if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    callback();
                })) {
                    warn!("Cancellation callback panicked: {:?}", e);
                }
            }
        }
    }

    /// Registers a callback to be invoked on cancellation.
    ///
    /// If already cancelled, the callback is invoked immediately.
    pub fn on_cancel<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        if self.is_cancelled() {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback();
            })) {
                warn!("Cancellation callback panicked: {:?}", e);
            }
        } else {
            self.callbacks.write().push(Box::new(callback));
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }

    /// Resolves once the token is cancelled.
    ///
    /// Resolves immediately when cancellation already happened, so it is
    /// safe to use as a branch of `tokio::select!` at every suspension point.
    pub async fn cancelled(&self) {
        let mut rx = self.signal.subscribe();
        while !*rx.borrow_and_update() {
            // The sender lives as long as `self`.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
