//! Stages that pass or discard elements by position.

use crate::core::{spawn_stage, Inlet, Outlet, Pipe};

/// Forwards at most the first `count` elements.
///
/// Input beyond `count` is still drained (and discarded) so the upstream
/// producer is never left blocked on a queue nobody reads.
#[must_use]
pub fn take<T: Send + 'static>(count: usize) -> Pipe<T, T> {
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        let mut remaining = count;
        while let Some(item) = input.recv().await {
            if remaining == 0 {
                continue;
            }
            if output.send(item).await.is_err() {
                return;
            }
            remaining -= 1;
        }
    })
}

/// Discards the first `count` elements and forwards the rest.
#[must_use]
pub fn skip<T: Send + 'static>(count: usize) -> Pipe<T, T> {
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<T>| async move {
        let mut dropped = 0;
        while let Some(item) = input.recv().await {
            if dropped < count {
                dropped += 1;
                continue;
            }
            if output.send(item).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::from_iter;

    #[tokio::test]
    async fn test_take() {
        let got = from_iter(1..=10).thru(take(3)).collect().await;
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_take_more_than_available() {
        let got = from_iter(1..=2).thru(take(5)).collect().await;
        assert_eq!(got, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_take_zero_still_drains() {
        let got: Vec<i32> = from_iter(1..=100).thru(take(0)).collect().await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_skip() {
        let got = from_iter(1..=5).thru(skip(2)).collect().await;
        assert_eq!(got, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn test_skip_everything() {
        let got: Vec<i32> = from_iter(1..=3).thru(skip(10)).collect().await;
        assert!(got.is_empty());
    }
}
