//! Structured task group for tracking the tasks a combinator spawns.

use super::CancellationToken;
use crate::errors::PipeflowError;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A group of related tasks with structured cancellation.
///
/// Every spawned task is tracked and joined by [`StructuredTaskGroup::wait`].
/// If any task errors or panics, the group's token is cancelled so the
/// remaining tasks can unwind.
pub struct StructuredTaskGroup {
    /// The group's name, used in logs.
    name: String,
    /// The cancellation token for this group.
    cancel_token: Arc<CancellationToken>,
    /// Handles to spawned tasks.
    handles: RwLock<Vec<(String, JoinHandle<Result<(), PipeflowError>>)>>,
}

impl StructuredTaskGroup {
    /// Creates a new task group.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_token(name, Arc::new(CancellationToken::new()))
    }

    /// Creates a task group sharing an existing token.
    #[must_use]
    pub fn with_token(name: impl Into<String>, cancel_token: Arc<CancellationToken>) -> Self {
        Self {
            name: name.into(),
            cancel_token,
            handles: RwLock::new(Vec::new()),
        }
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel_token
    }

    /// Spawns a task in the group.
    pub fn spawn<F, Fut>(&self, name: impl Into<String>, task: F)
    where
        F: FnOnce(Arc<CancellationToken>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), PipeflowError>> + Send + 'static,
    {
        let token = self.cancel_token.clone();
        let handle = tokio::spawn(async move { task(token).await });
        self.handles.write().push((name.into(), handle));
    }

    /// Waits for all tasks to complete.
    ///
    /// Returns the first error if any occurred.
    pub async fn wait(&self) -> Result<(), PipeflowError> {
        let handles = std::mem::take(&mut *self.handles.write());
        let mut first_error = None;

        for (task, handle) in handles {
            let failure = match handle.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(join_error) => Some(PipeflowError::task_failed(&task, join_error.to_string())),
            };

            if let Some(err) = failure {
                warn!(group = %self.name, task = %task, error = %err, "Task failed");
                if first_error.is_none() {
                    self.cancel_token.cancel(err.to_string());
                    first_error = Some(err);
                }
            }
        }

        debug!(group = %self.name, "Task group drained");
        first_error.map_or(Ok(()), Err)
    }

    /// Returns the number of pending tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.handles.read().len()
    }
}

impl std::fmt::Debug for StructuredTaskGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructuredTaskGroup")
            .field("name", &self.name)
            .field("task_count", &self.task_count())
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_task_group_success() {
        let group = StructuredTaskGroup::new("test");

        group.spawn("task1", |_token| async { Ok(()) });
        group.spawn("task2", |_token| async { Ok(()) });
        assert_eq!(group.task_count(), 2);

        assert!(group.wait().await.is_ok());
        assert_eq!(group.task_count(), 0);
    }

    #[tokio::test]
    async fn test_task_group_with_error() {
        let group = StructuredTaskGroup::new("test");

        group.spawn("success", |_token| async { Ok(()) });
        group.spawn("failure", |_token| async {
            Err(PipeflowError::task_failed("failure", "boom"))
        });

        let result = group.wait().await;
        assert!(result.is_err());
        assert!(group.cancel_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_task_group_panic_is_reported() {
        let group = StructuredTaskGroup::new("test");
        group.spawn("panics", |_token| async {
            if true {
                panic!("Intentional");
            }
            Ok(())
        });

        let err = group.wait().await.unwrap_err();
        assert!(matches!(err, PipeflowError::TaskFailed { ref name, .. } if name == "panics"));
    }

    #[tokio::test]
    async fn test_task_respects_cancellation() {
        let group = StructuredTaskGroup::new("test");
        let counter = Arc::new(AtomicUsize::new(0));

        let counter_clone = counter.clone();
        group.spawn("long_task", move |token| async move {
            for _ in 0..10 {
                if token.is_cancelled() {
                    return Ok(());
                }
                counter_clone.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        group.cancel_token().cancel("Manual cancel");

        let _ = group.wait().await;
        assert!(counter.load(Ordering::SeqCst) < 10);
    }
}
