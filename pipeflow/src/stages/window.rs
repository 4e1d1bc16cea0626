//! Batching and sliding windows.
//!
//! Both stages buffer elements and emit groups downstream, triggered either
//! by size or by a timer. The timer is measured from the last emission.

use crate::core::{spawn_stage, Inlet, Outlet, Pipe};
use crate::errors::ConfigError;
use crate::pipeline::join;
use crate::stages::flatten;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Configuration for [`batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchOptions {
    /// Emit once the batch holds this many elements. Zero means unbounded.
    pub max_size: usize,
    /// Emit when this many milliseconds pass without an emission. Zero
    /// disables the timer.
    pub interval_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_size: 1,
            interval_ms: 0,
        }
    }
}

impl BatchOptions {
    /// Creates the default options (batches of one, no timer).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the size trigger. Zero disables it.
    #[must_use]
    pub const fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the time trigger. A zero duration disables it.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The time trigger as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    fn is_full(&self, len: usize) -> bool {
        self.max_size >= 1 && len >= self.max_size
    }

    fn new_buffer<T>(&self) -> Vec<T> {
        if self.max_size == 0 {
            Vec::new()
        } else {
            Vec::with_capacity(self.max_size)
        }
    }
}

/// Groups elements into batches.
///
/// A batch is emitted when it reaches `max_size` or when the interval
/// elapses since the last emission, whichever comes first. A partial batch
/// is flushed when input closes; an empty batch is never emitted.
#[must_use]
pub fn batch<T: Send + 'static>(options: BatchOptions) -> Pipe<T, Vec<T>> {
    spawn_stage(move |mut input: Outlet<T>, output: Inlet<Vec<T>>| async move {
        let mut buffer = options.new_buffer();
        let interval = options.interval();

        if interval.is_zero() {
            while let Some(item) = input.recv().await {
                buffer.push(item);
                if options.is_full(buffer.len()) {
                    let full = std::mem::replace(&mut buffer, options.new_buffer());
                    if output.send(full).await.is_err() {
                        return;
                    }
                }
            }
        } else {
            let timer = sleep(interval);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    item = input.recv() => {
                        let Some(item) = item else { break };
                        buffer.push(item);
                        if options.is_full(buffer.len()) {
                            let full = std::mem::replace(&mut buffer, options.new_buffer());
                            if output.send(full).await.is_err() {
                                return;
                            }
                            timer.as_mut().reset(Instant::now() + interval);
                        }
                    }
                    () = &mut timer => {
                        if !buffer.is_empty() {
                            let due = std::mem::replace(&mut buffer, options.new_buffer());
                            if output.send(due).await.is_err() {
                                return;
                            }
                        }
                        timer.as_mut().reset(Instant::now() + interval);
                    }
                }
            }
        }

        if !buffer.is_empty() {
            let _ = output.send(buffer).await;
        }
    })
}

/// Batches of exactly `size` elements (the last one may be shorter).
#[must_use]
pub fn batch_n<T: Send + 'static>(size: usize) -> Pipe<T, Vec<T>> {
    batch(BatchOptions::new().with_max_size(size))
}

/// Batches of whatever arrived during each `interval`, unbounded by size.
#[must_use]
pub fn batch_every<T: Send + 'static>(interval: Duration) -> Pipe<T, Vec<T>> {
    batch(BatchOptions::new().with_max_size(0).with_interval(interval))
}

/// Re-chunks incoming batches into groups of `size`.
///
/// Equivalent to joining [`flatten`] with [`batch_n`].
pub fn chunk<T: Send + 'static>(size: usize) -> Result<Pipe<Vec<T>, Vec<T>>, ConfigError> {
    if size < 1 {
        return Err(ConfigError::chunk_size(size));
    }
    Ok(join(flatten(), batch_n(size)))
}

/// Configuration for [`sliding_window`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlidingWindowOptions {
    /// Number of elements in every emitted window.
    pub window_size: usize,
    /// Number of elements the window moves forward after each emission.
    pub step_size: usize,
    /// Interval in milliseconds at which a full buffer is checked. Zero
    /// disables the timer.
    pub interval_ms: u64,
}

impl Default for SlidingWindowOptions {
    fn default() -> Self {
        Self {
            window_size: 2,
            step_size: 1,
            interval_ms: 0,
        }
    }
}

impl SlidingWindowOptions {
    /// Creates options for the given window and step sizes.
    #[must_use]
    pub fn new(window_size: usize, step_size: usize) -> Self {
        Self {
            window_size,
            step_size,
            ..Self::default()
        }
    }

    /// Sets the timer interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The timer interval as a duration.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Coerces the sizes so every window makes progress: the step is at
    /// least one and the window at least one step.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.step_size = self.step_size.max(1);
        self.window_size = self.window_size.max(self.step_size);
        self
    }
}

struct Window<T> {
    buffer: Vec<T>,
    size: usize,
    step: usize,
}

impl<T: Clone> Window<T> {
    /// Snapshot of the current window, sliding the buffer forward.
    fn next_window(&mut self) -> Option<Vec<T>> {
        if self.buffer.len() < self.size {
            return None;
        }
        let window = self.buffer[..self.size].to_vec();
        let step = self.step.min(self.buffer.len());
        self.buffer.drain(..step);
        Some(window)
    }
}

/// Emits overlapping windows of `window_size` elements, sliding by
/// `step_size` after each one.
///
/// When input closes the remaining complete windows are emitted; a
/// remainder shorter than a window is dropped.
#[must_use]
pub fn sliding_window<T: Clone + Send + 'static>(options: SlidingWindowOptions) -> Pipe<T, Vec<T>> {
    let options = options.normalized();

    spawn_stage(move |mut input: Outlet<T>, output: Inlet<Vec<T>>| async move {
        let mut window = Window {
            buffer: Vec::with_capacity(options.window_size),
            size: options.window_size,
            step: options.step_size,
        };
        let interval = options.interval();

        if interval.is_zero() {
            while let Some(item) = input.recv().await {
                window.buffer.push(item);
                if let Some(full) = window.next_window() {
                    if output.send(full).await.is_err() {
                        return;
                    }
                }
            }
        } else {
            let timer = sleep(interval);
            tokio::pin!(timer);

            loop {
                tokio::select! {
                    item = input.recv() => {
                        let Some(item) = item else { break };
                        window.buffer.push(item);
                        if let Some(full) = window.next_window() {
                            if output.send(full).await.is_err() {
                                return;
                            }
                            timer.as_mut().reset(Instant::now() + interval);
                        }
                    }
                    () = &mut timer => {
                        if let Some(full) = window.next_window() {
                            if output.send(full).await.is_err() {
                                return;
                            }
                        }
                        timer.as_mut().reset(Instant::now() + interval);
                    }
                }
            }
        }

        while let Some(full) = window.next_window() {
            if output.send(full).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handoff;
    use crate::endpoints::{from_channel, from_iter};
    use crate::pipeline::Flow;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_batch_n_even_split() {
        let got = from_iter([1, 2, 3, 4]).thru(batch_n(2)).collect().await;
        assert_eq!(got, vec![vec![1, 2], vec![3, 4]]);
    }

    #[tokio::test]
    async fn test_batch_n_flushes_partial_on_close() {
        let got = from_iter([1, 2, 3]).thru(batch_n(2)).collect().await;
        assert_eq!(got, vec![vec![1, 2], vec![3]]);
    }

    #[tokio::test]
    async fn test_batch_empty_input_emits_nothing() {
        let got: Vec<Vec<i32>> = from_iter(Vec::<i32>::new()).thru(batch_n(2)).collect().await;
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn test_batch_unbounded_emits_once_at_close() {
        let options = BatchOptions::new().with_max_size(0);
        let got = from_iter(1..=5).thru(batch(options)).collect().await;
        assert_eq!(got, vec![vec![1, 2, 3, 4, 5]]);
    }

    #[tokio::test]
    async fn test_batch_default_is_singletons() {
        let got = from_iter([7, 8]).thru(batch(BatchOptions::default())).collect().await;
        assert_eq!(got, vec![vec![7], vec![8]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_every_flushes_each_interval() {
        let (tx, rx) = mpsc::channel(1);
        tokio::spawn(async move {
            tx.send(1).await.unwrap();
            tx.send(2).await.unwrap();
            tokio::time::sleep(Duration::from_millis(15)).await;
            tx.send(3).await.unwrap();
            tx.send(4).await.unwrap();
        });

        let got = from_channel(rx)
            .thru(batch_every(Duration::from_millis(10)))
            .collect()
            .await;
        assert_eq!(got, vec![vec![1, 2], vec![3, 4]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_every_flushes_when_input_closes() {
        let got = from_iter([1, 2, 3, 4])
            .thru(batch_every(Duration::from_secs(3600)))
            .collect()
            .await;
        assert_eq!(got, vec![vec![1, 2, 3, 4]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_size_wins_over_interval() {
        let options = BatchOptions::new()
            .with_max_size(3)
            .with_interval(Duration::from_millis(50));
        let got = from_iter(1..=5).thru(batch(options)).collect().await;
        assert_eq!(got, vec![vec![1, 2, 3], vec![4, 5]]);
    }

    #[test]
    fn test_batch_options_from_json() {
        let options: BatchOptions = serde_json::from_str(r#"{"interval_ms": 250}"#).unwrap();
        assert_eq!(options.max_size, 1);
        assert_eq!(options.interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_chunk() {
        let got = from_iter([vec![1, 2, 3, 4, 5], vec![6, 7, 8]])
            .thru(chunk(3).unwrap())
            .collect()
            .await;
        assert_eq!(got, vec![vec![1, 2, 3], vec![4, 5, 6], vec![7, 8]]);
    }

    #[tokio::test]
    async fn test_chunk_rejects_zero() {
        let err = chunk::<i32>(0).unwrap_err();
        assert_eq!(err.code, crate::errors::codes::CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_sliding_window_step_one() {
        let (inlet, outlet) = sliding_window(SlidingWindowOptions::new(3, 1)).split();
        tokio::spawn(async move {
            for i in 1..=5 {
                inlet.send(i).await.unwrap();
            }
        });

        let got = outlet.collect().await;
        assert_eq!(got, vec![vec![1, 2, 3], vec![2, 3, 4], vec![3, 4, 5]]);
    }

    #[tokio::test]
    async fn test_sliding_window_with_step() {
        let got = from_iter(1..=5)
            .thru(sliding_window(SlidingWindowOptions::new(3, 2)))
            .collect()
            .await;
        assert_eq!(got, vec![vec![1, 2, 3], vec![3, 4, 5]]);
    }

    #[tokio::test]
    async fn test_sliding_window_drops_short_remainder() {
        let got = from_iter(1..=4)
            .thru(sliding_window(SlidingWindowOptions::new(3, 3)))
            .collect()
            .await;
        assert_eq!(got, vec![vec![1, 2, 3]]);
    }

    #[tokio::test]
    async fn test_sliding_window_shorter_than_window_emits_nothing() {
        let got: Vec<Vec<i32>> = from_iter([1, 2])
            .thru(sliding_window(SlidingWindowOptions::new(3, 1)))
            .collect()
            .await;
        assert!(got.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sliding_window_with_interval() {
        let options = SlidingWindowOptions::new(3, 1).with_interval(Duration::from_millis(20));
        let (inlet, outlet) = handoff();
        tokio::spawn(async move {
            for i in 1..=5 {
                inlet.send(i).await.unwrap();
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
        });

        let got = Flow::from_source(outlet)
            .thru(sliding_window(options))
            .collect()
            .await;
        assert_eq!(got, vec![vec![1, 2, 3], vec![2, 3, 4], vec![3, 4, 5]]);
    }

    #[test]
    fn test_window_options_are_normalized() {
        let options = SlidingWindowOptions::new(1, 0).normalized();
        assert_eq!(options.step_size, 1);
        assert_eq!(options.window_size, 1);

        let options = SlidingWindowOptions::new(2, 5).normalized();
        assert_eq!(options.window_size, 5);
    }
}
