use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use strum::Display;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{TypingConfig, TypingUnit};
use crate::session::StreamObserver;

/// Whether a drain loop currently owns the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum DrainPhase {
    Idle,
    Draining,
}

/// Replays queued text one character at a time with a variable pause
/// between characters.
///
/// At most one drain loop runs per scheduler. [`enqueue`] never blocks: the
/// first fragment queued while idle spawns the drain on the current tokio
/// runtime, and fragments queued while it runs are picked up by that same
/// loop in arrival order.
///
/// Characters are handed to the observer while the scheduler lock is held,
/// so once [`halt`] returns or the request token is cancelled no further
/// character can be emitted. The observer must not call back into the
/// scheduler.
///
/// [`enqueue`]: TypingScheduler::enqueue
/// [`halt`]: TypingScheduler::halt
pub struct TypingScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    config: TypingConfig,
    observer: Arc<dyn StreamObserver>,
    /// Child of the request token; also cancelled by `halt`.
    stop: CancellationToken,
    state: Mutex<SchedulerState>,
    phase_tx: watch::Sender<DrainPhase>,
}

struct SchedulerState {
    queue: VecDeque<TypingUnit>,
    phase: DrainPhase,
    emitted: usize,
}

impl TypingScheduler {
    pub fn new(
        config: TypingConfig,
        observer: Arc<dyn StreamObserver>,
        token: &CancellationToken,
    ) -> Self {
        let (phase_tx, _) = watch::channel(DrainPhase::Idle);
        Self {
            inner: Arc::new(Inner {
                config,
                observer,
                stop: token.child_token(),
                state: Mutex::new(SchedulerState {
                    queue: VecDeque::new(),
                    phase: DrainPhase::Idle,
                    emitted: 0,
                }),
                phase_tx,
            }),
        }
    }

    /// Appends `fragment` to the queue and starts a drain if none is running.
    /// Dropped silently once the scheduler is halted or cancelled.
    pub fn enqueue(&self, fragment: &str) {
        let mut state = self.inner.lock();
        if self.inner.stop.is_cancelled() {
            trace!(target: "trickle::typing", "Ignoring fragment for stopped scheduler");
            return;
        }

        state.queue.extend(fragment.chars().map(TypingUnit::new));
        if !self.inner.begin_drain(&mut state) {
            return;
        }
        drop(state);

        let inner = Arc::clone(&self.inner);
        tokio::spawn(inner.drain());
    }

    /// Runs a drain on the caller's task if none is active. A no-op while
    /// another drain owns the queue.
    pub async fn drain(&self) {
        let started = {
            let mut state = self.inner.lock();
            !state.queue.is_empty() && self.inner.begin_drain(&mut state)
        };
        if started {
            Arc::clone(&self.inner).drain().await;
        }
    }

    /// Waits until every queued character has been emitted on the usual
    /// schedule. Returns early, with the queue discarded, if the scheduler
    /// is halted or cancelled meanwhile.
    pub async fn flush(&self) {
        let mut phase_rx = self.inner.phase_tx.subscribe();
        loop {
            if phase_rx
                .wait_for(|phase| *phase == DrainPhase::Idle)
                .await
                .is_err()
            {
                return;
            }

            let started = {
                let mut state = self.inner.lock();
                if state.queue.is_empty() || self.inner.stop.is_cancelled() {
                    return;
                }
                self.inner.begin_drain(&mut state)
            };
            if started {
                Arc::clone(&self.inner).drain().await;
            }
        }
    }

    /// Drops every queued character and stops any further emission.
    pub fn halt(&self) {
        let discarded = {
            let mut state = self.inner.lock();
            self.inner.stop.cancel();
            let discarded = state.queue.len();
            state.queue.clear();
            discarded
        };
        if discarded > 0 {
            debug!(target: "trickle::typing", discarded, "Halted with characters still queued");
        }
    }

    pub fn phase(&self) -> DrainPhase {
        self.inner.lock().phase
    }

    /// Characters queued but not yet emitted.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Characters emitted so far.
    pub fn emitted(&self) -> usize {
        self.inner.lock().emitted
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stop.is_cancelled()
    }
}

impl Drop for TypingScheduler {
    fn drop(&mut self) {
        // A detached drain must not outlive the request that owns it.
        self.inner.stop.cancel();
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims the queue for a new drain. False if one is already running.
    fn begin_drain(&self, state: &mut SchedulerState) -> bool {
        if state.phase == DrainPhase::Draining {
            return false;
        }
        state.phase = DrainPhase::Draining;
        self.phase_tx.send_replace(DrainPhase::Draining);
        true
    }

    fn end_drain(&self, state: &mut SchedulerState) {
        state.phase = DrainPhase::Idle;
        self.phase_tx.send_replace(DrainPhase::Idle);
    }

    async fn drain(self: Arc<Self>) {
        let mut rng = StdRng::from_entropy();
        trace!(target: "trickle::typing", "Drain started");

        loop {
            let class = {
                let mut state = self.lock();

                if self.stop.is_cancelled() {
                    let discarded = state.queue.len();
                    state.queue.clear();
                    self.end_drain(&mut state);
                    debug!(target: "trickle::typing", discarded, "Drain stopped");
                    return;
                }

                let Some(unit) = state.queue.pop_front() else {
                    self.end_drain(&mut state);
                    trace!(target: "trickle::typing", emitted = state.emitted, "Drain finished");
                    return;
                };

                self.observer.on_character(unit.ch);
                state.emitted += 1;
                unit.class
            };

            let delay = self.config.delay_for(class, &mut rng);
            tokio::select! {
                biased;
                () = self.stop.cancelled() => {}
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::RecordingObserver;
    use std::time::Duration;
    use tokio::time::{Instant, sleep};

    fn scheduler(base_delay_ms: u64) -> (TypingScheduler, Arc<RecordingObserver>, CancellationToken) {
        let observer = Arc::new(RecordingObserver::new());
        let token = CancellationToken::new();
        let config = TypingConfig {
            base_delay_ms,
            jitter_ratio: 0.0,
        };
        let scheduler = TypingScheduler::new(config, observer.clone(), &token);
        (scheduler, observer, token)
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_and_flush_emits_in_order() {
        let (scheduler, observer, _token) = scheduler(30);

        assert_eq!(scheduler.phase(), DrainPhase::Idle);
        scheduler.enqueue("Hi");
        assert_eq!(scheduler.phase(), DrainPhase::Draining);
        scheduler.enqueue(", you");

        scheduler.flush().await;

        assert_eq!(observer.characters(), "Hi, you");
        assert_eq!(scheduler.phase(), DrainPhase::Idle);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(scheduler.emitted(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_follows_delay_schedule() {
        let (scheduler, observer, _token) = scheduler(30);
        let start = Instant::now();

        // a: 30, space: 15, .: 60, newline: 90
        scheduler.enqueue("a .\n");
        scheduler.flush().await;

        assert_eq!(observer.characters(), "a .\n");
        assert_eq!(start.elapsed(), Duration::from_millis(30 + 15 + 60 + 90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_characters_are_paced() {
        let (scheduler, observer, _token) = scheduler(100);

        scheduler.enqueue("abc");
        sleep(Duration::from_millis(1)).await;
        assert_eq!(observer.characters(), "a");

        sleep(Duration::from_millis(100)).await;
        assert_eq!(observer.characters(), "ab");

        sleep(Duration::from_millis(100)).await;
        assert_eq!(observer.characters(), "abc");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reentrant_drain_is_noop() {
        let (scheduler, observer, _token) = scheduler(50);

        scheduler.enqueue("xyz");
        // A second drain while one is active returns immediately.
        let start = Instant::now();
        scheduler.drain().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(scheduler.phase(), DrainPhase::Draining);

        scheduler.flush().await;
        assert_eq!(observer.characters(), "xyz");
    }

    #[tokio::test(start_paused = true)]
    async fn test_enqueue_while_draining_keeps_single_loop() {
        let (scheduler, observer, _token) = scheduler(20);

        scheduler.enqueue("ab");
        sleep(Duration::from_millis(5)).await;
        scheduler.enqueue("cd");
        sleep(Duration::from_millis(5)).await;
        scheduler.enqueue("ef");
        scheduler.flush().await;

        assert_eq!(observer.characters(), "abcdef");
        // One loop: six characters at 20ms each, not interleaved loops.
        assert_eq!(scheduler.emitted(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_suspension_discards_queue() {
        let (scheduler, observer, token) = scheduler(100);

        scheduler.enqueue("abcdef");
        sleep(Duration::from_millis(150)).await;
        assert_eq!(observer.characters(), "ab");

        token.cancel();
        sleep(Duration::from_millis(1)).await;

        assert_eq!(scheduler.phase(), DrainPhase::Idle);
        assert_eq!(scheduler.pending(), 0);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(observer.characters(), "ab");

        scheduler.enqueue("more");
        sleep(Duration::from_secs(1)).await;
        assert_eq!(observer.characters(), "ab");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_returns_promptly_on_cancel() {
        let (scheduler, observer, token) = scheduler(1_000);
        scheduler.enqueue("slow text");

        let canceller = token.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(1_500)).await;
            canceller.cancel();
        });

        let start = Instant::now();
        scheduler.flush().await;

        assert!(start.elapsed() < Duration::from_millis(1_600));
        assert_eq!(observer.characters(), "sl");
    }

    #[tokio::test(start_paused = true)]
    async fn test_halt_stops_emission_without_cancelling_request() {
        let (scheduler, observer, token) = scheduler(100);

        scheduler.enqueue("partial");
        sleep(Duration::from_millis(50)).await;
        scheduler.halt();
        assert!(scheduler.is_stopped());
        assert!(!token.is_cancelled());

        sleep(Duration::from_secs(2)).await;
        assert_eq!(observer.characters(), "p");
        assert_eq!(scheduler.phase(), DrainPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_detached_drain() {
        let (scheduler, observer, _token) = scheduler(100);

        scheduler.enqueue("abcdef");
        sleep(Duration::from_millis(50)).await;
        drop(scheduler);

        sleep(Duration::from_secs(2)).await;
        assert_eq!(observer.characters(), "a");
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_on_idle_scheduler_returns_immediately() {
        let (scheduler, observer, _token) = scheduler(30);
        let start = Instant::now();
        scheduler.flush().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(observer.events().is_empty());
    }
}
