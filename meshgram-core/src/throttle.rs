//! Minimum spacing between radio transmissions

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error};

/// Enforces `min_interval` between the end of one transmission and the
/// start of the next.
///
/// `schedule_send` takes `&mut self`, so only one send can be in flight per
/// throttle; the owner decides which execution context that is.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last_send: Option<Instant>,
}

impl Throttle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_send: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Completion time of the last attempted transmission
    pub fn last_send(&self) -> Option<Instant> {
        self.last_send
    }

    /// Earliest instant the next transmission may start
    pub fn ready_at(&self) -> Instant {
        match self.last_send {
            Some(last) => last + self.min_interval,
            None => Instant::now(),
        }
    }

    /// Time left before the next transmission may start
    pub fn remaining(&self) -> Duration {
        match self.last_send {
            Some(last) => self.min_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }

    /// Wait out the interval, run `send_fn`, then record the completion time.
    ///
    /// A failed send still occupies its slot. Errors are logged here and
    /// reported to the caller only as `false`.
    pub async fn schedule_send<F, Fut, E>(&mut self, send_fn: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: Display,
    {
        let wait = self.remaining();
        if !wait.is_zero() {
            debug!("Throttling radio send for {wait:?}");
            tokio::time::sleep(wait).await;
        }

        let outcome = send_fn().await;
        self.last_send = Some(Instant::now());

        match outcome {
            Ok(()) => true,
            Err(e) => {
                error!("Mesh send failed: {e}");
                false
            }
        }
    }
}
