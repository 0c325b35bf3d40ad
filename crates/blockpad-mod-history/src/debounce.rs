//! Debounced, serialized capture scheduling.
//!
//! Every request re-arms a single timer; only a timer that runs out
//! uninterrupted starts a capture. At most one capture runs at a time.
//! A timer firing while a capture is in flight sets a pending flag, and
//! the in-flight owner runs exactly one more capture before settling, so
//! the latest content is always read.
//!
//! A request resolves once a capture attempt covering it has finished,
//! including any chained pending attempt.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

type Outcome = std::result::Result<(), String>;

/// Coalesces capture requests into debounced, non-overlapping attempts.
pub struct Coalescer {
    delay: Duration,
    state: Mutex<CoalescerState>,
}

#[derive(Default)]
struct CoalescerState {
    /// Generation handed to the next request.
    next_generation: u64,
    /// Timer armed by the most recent request, if it has not fired yet.
    armed: Option<ArmedTimer>,
    /// Most recent generation whose timer fired.
    latest_fired: u64,
    in_flight: bool,
    pending: bool,
    /// Requests waiting for a covering attempt, by generation.
    waiters: Vec<(u64, oneshot::Sender<Outcome>)>,
}

struct ArmedTimer {
    generation: u64,
    handle: AbortHandle,
}

impl std::fmt::Debug for Coalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Coalescer")
            .field("delay", &self.delay)
            .field("armed", &state.armed.as_ref().map(|t| t.generation))
            .field("in_flight", &state.in_flight)
            .field("pending", &state.pending)
            .field("waiters", &state.waiters.len())
            .finish()
    }
}

impl Coalescer {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            state: Mutex::new(CoalescerState::default()),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether a capture attempt is currently executing.
    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Re-arms the timer and waits until a capture covering this request
    /// has settled.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns the failure of the covering capture attempt.
    pub async fn request<F, Fut>(self: &Arc<Self>, capture: F) -> Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let rx = {
            let mut state = self.state.lock();
            state.next_generation += 1;
            let generation = state.next_generation;

            let (tx, rx) = oneshot::channel();
            state.waiters.push((generation, tx));

            if let Some(previous) = state.armed.take() {
                previous.handle.abort();
            }
            let task = tokio::spawn(Arc::clone(self).fire(generation, capture));
            state.armed = Some(ArmedTimer {
                generation,
                handle: task.abort_handle(),
            });
            rx
        };

        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(failure)) => Err(anyhow!(failure)),
            Err(_) => Err(anyhow!("Capture task ended before settling")),
        }
    }

    async fn fire<F, Fut>(self: Arc<Self>, generation: u64, capture: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        tokio::time::sleep(self.delay).await;

        {
            let mut state = self.state.lock();
            // Re-armed by a newer request.
            if state.armed.as_ref().map(|t| t.generation) != Some(generation) {
                return;
            }
            state.armed = None;
            state.latest_fired = generation;
            if state.in_flight {
                tracing::debug!(generation, "Capture in flight, deferring");
                state.pending = true;
                return;
            }
            state.in_flight = true;
        }

        let mut guard = InFlightGuard {
            coalescer: &self,
            settled: false,
        };
        let mut attempts: Vec<(u64, Option<String>)> = Vec::new();
        loop {
            let covered = self.state.lock().latest_fired;
            let failure = capture().await.err().map(|e| {
                tracing::warn!("Capture failed: {e:#}");
                format!("{e:#}")
            });
            attempts.push((covered, failure));

            let mut state = self.state.lock();
            if state.pending {
                state.pending = false;
                continue;
            }
            state.in_flight = false;
            settle(&mut state.waiters, &attempts);
            break;
        }
        guard.settled = true;
    }
}

/// Resolves every waiter covered by an attempt with the outcome of the
/// first attempt that covered it.
fn settle(
    waiters: &mut Vec<(u64, oneshot::Sender<Outcome>)>,
    attempts: &[(u64, Option<String>)],
) {
    let mut remaining = Vec::with_capacity(waiters.len());
    for (generation, tx) in waiters.drain(..) {
        match attempts.iter().find(|(covered, _)| *covered >= generation) {
            Some((_, failure)) => {
                let outcome = match failure {
                    Some(message) => Err(message.clone()),
                    None => Ok(()),
                };
                // The requester may have stopped waiting.
                let _ = tx.send(outcome);
            }
            None => remaining.push((generation, tx)),
        }
    }
    *waiters = remaining;
}

/// Clears the in-flight state if a capture task is dropped mid-attempt,
/// so later captures are not blocked. Covered waiters observe the drop.
struct InFlightGuard<'a> {
    coalescer: &'a Coalescer,
    settled: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.coalescer.state.lock();
        state.in_flight = false;
        state.pending = false;
        let fired = state.latest_fired;
        state.waiters.retain(|(generation, _)| *generation > fired);
    }
}
