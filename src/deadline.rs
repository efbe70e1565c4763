//! Cancellation primitive for `spec.md` §5's "every `execute` is
//! parameterized by a deadline/cancellation signal... the interpreter must
//! abort at the next suspension point (open, spawn, read, write)".
//!
//! A [`Deadline`] is checked synchronously between commands (the
//! open/read/write suspension points, which in this interpreter are plain
//! blocking calls rather than long-lived awaits) and raced against the one
//! genuinely long-lived await, a spawned child or worker round-trip, via
//! [`Deadline::race`].

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// `None` means no deadline was set — every check and race is then a no-op.
#[derive(Clone, Copy, Debug, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(duration: Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    /// Cheap and synchronous — safe to call between every command, even
    /// outside a tokio runtime (validation has no executor of its own).
    pub fn expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Race a suspension point against the deadline. `None` means the
    /// deadline fired first and `fut` was dropped without completing — for a
    /// spawned child with `kill_on_drop(true)` this also terminates it.
    pub async fn race<F: Future>(&self, fut: F) -> Option<F::Output> {
        match self.0 {
            None => Some(fut.await),
            Some(at) => {
                tokio::select! {
                    value = fut => Some(value),
                    () = tokio::time::sleep_until(at) => None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
