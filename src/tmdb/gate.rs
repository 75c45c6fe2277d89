//! Process-wide request gate: a token bucket (permits per second, burst
//! equal to the rate) joined with an in-flight semaphore. Every outbound
//! request acquires both before the socket is touched.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Acquisition was interrupted by job cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

pub struct RequestGate {
    limiter: DirectLimiter,
    inflight: Semaphore,
}

/// Held for the duration of one in-flight request.
pub struct RequestPermit<'a> {
    _inflight: SemaphorePermit<'a>,
}

impl RequestGate {
    pub fn new(rate_per_sec: u32, max_connections: u32) -> Self {
        let rate = NonZeroU32::new(rate_per_sec).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(rate)),
            inflight: Semaphore::new(max_connections.max(1) as usize),
        }
    }

    /// Wait for an in-flight slot, then a rate token. Returns promptly with
    /// `Cancelled` once the token is tripped.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<RequestPermit<'_>, Cancelled> {
        let permit = tokio::select! {
            _ = cancel.cancelled() => return Err(Cancelled),
            permit = self.inflight.acquire() => permit.expect("request gate semaphore closed"),
        };
        tokio::select! {
            _ = cancel.cancelled() => Err(Cancelled),
            _ = self.limiter.until_ready() => Ok(RequestPermit { _inflight: permit }),
        }
    }

    /// Slots currently free; used only in logs and tests.
    pub fn available_connections(&self) -> usize {
        self.inflight.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn inflight_slots_are_bounded() {
        let gate = RequestGate::new(1000, 2);
        let cancel = CancellationToken::new();

        let first = gate.acquire(&cancel).await.unwrap();
        let _second = gate.acquire(&cancel).await.unwrap();
        assert_eq!(gate.available_connections(), 0);

        drop(first);
        assert_eq!(gate.available_connections(), 1);
    }

    #[tokio::test]
    async fn cancellation_aborts_a_blocked_acquire() {
        let gate = RequestGate::new(1000, 1);
        let cancel = CancellationToken::new();
        let _held = gate.acquire(&cancel).await.unwrap();

        cancel.cancel();
        let blocked = tokio::time::timeout(Duration::from_secs(1), gate.acquire(&cancel)).await;
        assert!(blocked.expect("acquire should return, not hang").is_err());
    }
}
