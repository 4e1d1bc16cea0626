//! Rate limiters that gate element admission.

// Token accounting uses f64 for fractional refills; the precision loss on
// usize conversions is irrelevant at realistic burst sizes.
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Decides when the next element may pass.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Waits until one permit is available and consumes it.
    async fn acquire(&self);

    /// Consumes a permit if one is available right now.
    fn try_acquire(&self) -> bool;

    /// Permits available right now (approximate).
    fn available(&self) -> usize;
}

#[async_trait]
impl<L: RateLimiter + ?Sized> RateLimiter for Arc<L> {
    async fn acquire(&self) {
        (**self).acquire().await;
    }

    fn try_acquire(&self) -> bool {
        (**self).try_acquire()
    }

    fn available(&self) -> usize {
        (**self).available()
    }
}

/// Token bucket rate limiter.
///
/// Tokens accumulate at `rate` per second up to `burst` and start full.
/// A zero rate never refills: once the initial burst is spent, `acquire`
/// never returns. Clones share one bucket.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    /// Tokens added per second.
    rate: f64,
    /// Maximum tokens that can accumulate.
    burst: usize,
    state: Arc<Mutex<BucketState>>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Creates a bucket refilling `rate` tokens per second, holding at most
    /// `burst`. Negative rates are treated as zero.
    #[must_use]
    pub fn new(rate: f64, burst: usize) -> Self {
        Self {
            rate: rate.max(0.0),
            burst,
            state: Arc::new(Mutex::new(BucketState {
                tokens: burst as f64,
                last_update: Instant::now(),
            })),
        }
    }

    /// Creates a bucket adding one token every `period`.
    ///
    /// A zero period means no refill at all.
    #[must_use]
    pub fn every(period: Duration, burst: usize) -> Self {
        let rate = if period.is_zero() {
            0.0
        } else {
            1.0 / period.as_secs_f64()
        };
        Self::new(rate, burst)
    }

    /// Tokens added per second.
    #[must_use]
    pub const fn rate(&self) -> f64 {
        self.rate
    }

    /// Maximum tokens held.
    #[must_use]
    pub const fn burst(&self) -> usize {
        self.burst
    }

    fn refill(&self, state: &mut BucketState) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_update).as_secs_f64();
        state.tokens = elapsed.mul_add(self.rate, state.tokens).min(self.burst as f64);
        state.last_update = now;
    }

    /// Takes a token, or reports how long until one accumulates.
    ///
    /// `Err(None)` means no token will arrive in any representable time.
    fn take_or_wait(&self) -> Result<(), Option<Duration>> {
        let mut state = self.state.lock();
        self.refill(&mut state);

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }
        if self.rate <= 0.0 || self.burst == 0 {
            return Err(None);
        }
        Err(Duration::try_from_secs_f64((1.0 - state.tokens) / self.rate).ok())
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        loop {
            match self.take_or_wait() {
                Ok(()) => return,
                Err(Some(wait)) => tokio::time::sleep(wait).await,
                Err(None) => std::future::pending::<()>().await,
            }
        }
    }

    fn try_acquire(&self) -> bool {
        self.take_or_wait().is_ok()
    }

    fn available(&self) -> usize {
        let mut state = self.state.lock();
        self.refill(&mut state);
        state.tokens as usize
    }
}
