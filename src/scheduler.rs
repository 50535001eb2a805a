//! Frame-synchronized action queue and scheduler.
//!
//! Queued actions are not timed against the wall clock. Each action carries a
//! countdown measured in frame edges; [`ActionQueue::advance`] is called once
//! per detected edge and runs at most one action, unless the executed action
//! is chained, in which case the run continues draining the head of the queue
//! within the same edge. This makes injected input track the target's actual
//! rendering cadence, frame-accurately, regardless of frame duration.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info};

use crate::frame_clock::{FrameClock, FrameEdgeDetector};

/// Work executed by a due action. Runs at most once.
pub type ActionFn = Box<dyn FnOnce() + Send + 'static>;

/// One scheduled, delay-gated unit of work.
pub struct Action {
    /// Frame edges remaining before the action is eligible to run.
    /// Decremented by `advance`, never compared against time.
    delay: i32,
    /// Absent = pure delay placeholder that consumes one edge.
    op: Option<ActionFn>,
    /// Chained actions let the next queued action run within the same edge.
    chain: bool,
}

/// FIFO of delayed actions, advanced once per frame edge.
///
/// The internal mutex guards structural mutation only; it is never held
/// while an action's operation executes, so operations are free to enqueue
/// further actions.
#[derive(Default)]
pub struct ActionQueue {
    inner: Mutex<VecDeque<Action>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action to the tail. Safe to call concurrently with
    /// [`advance`](Self::advance), including from inside a running action.
    pub fn enqueue(&self, delay: i32, op: Option<ActionFn>, chain: bool) {
        let mut queue = self.inner.lock().expect("action queue mutex poisoned");
        queue.push_back(Action { delay, op, chain });
    }

    /// Advances the queue by one frame edge.
    ///
    /// Decrements the head's delay; when it goes negative the head is popped
    /// and its operation runs outside the lock. A non-chained action ends
    /// the call; a chained one loops back to the new head immediately, so a
    /// consecutive run of chained actions drains within a single edge.
    pub fn advance(&self) {
        loop {
            let due = {
                let mut queue = self.inner.lock().expect("action queue mutex poisoned");
                match queue.front_mut() {
                    None => None,
                    Some(head) => {
                        head.delay -= 1;
                        if head.delay < 0 {
                            queue.pop_front()
                        } else {
                            None
                        }
                    }
                }
            };

            let Some(action) = due else { break };
            if let Some(op) = action.op {
                op();
            }
            if !action.chain {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("action queue mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Test-only view of the queue as `(delay, has_op, chain)` triples.
    #[cfg(test)]
    pub(crate) fn snapshot(&self) -> Vec<(i32, bool, bool)> {
        self.inner
            .lock()
            .expect("action queue mutex poisoned")
            .iter()
            .map(|a| (a.delay, a.op.is_some(), a.chain))
            .collect()
    }
}

/// Default fixed polling interval for the frame-clock sampling loop.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Samples a [`FrameClock`] at a fixed interval and advances the queue on
/// every detected edge.
///
/// Scheduling policy: a cooperative fixed-interval poll. While actions are
/// queued the loop spins without sleeping so no edge is missed; with an
/// empty queue it sleeps one interval per iteration. A stalled clock (the
/// target not producing frames) stalls the queue indefinitely, which is the
/// intended tracking behavior.
pub struct Scheduler {
    queue: Arc<ActionQueue>,
    clock: Box<dyn FrameClock>,
    edges: FrameEdgeDetector,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(queue: Arc<ActionQueue>, clock: Box<dyn FrameClock>) -> Self {
        Self {
            queue,
            clock,
            edges: FrameEdgeDetector::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// One poll iteration: sample, detect, advance. Returns whether an edge
    /// was observed.
    pub fn poll_once(&mut self) -> bool {
        let edge = self.edges.observe(self.clock.sample());
        if edge {
            self.queue.advance();
        }
        edge
    }

    /// Runs the polling loop until `shutdown` is set.
    pub fn run(mut self, shutdown: Arc<AtomicBool>) {
        raise_timer_resolution();
        info!(interval_ms = self.poll_interval.as_millis() as u64, "scheduler poll loop started");
        while !shutdown.load(Ordering::Relaxed) {
            self.poll_once();
            if self.queue.is_empty() {
                std::thread::sleep(self.poll_interval);
            }
        }
        debug!("scheduler poll loop stopped");
    }
}

/// Requests 1 ms timer resolution so the poll sleep is actually short.
#[cfg(windows)]
fn raise_timer_resolution() {
    // SAFETY: timeBeginPeriod has no preconditions; the process never calls
    // timeEndPeriod because the raised resolution is wanted for its lifetime.
    unsafe {
        winapi::um::timeapi::timeBeginPeriod(1);
    }
}

#[cfg(not(windows))]
fn raise_timer_resolution() {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_op(counter: &Arc<AtomicUsize>) -> Option<ActionFn> {
        let counter = Arc::clone(counter);
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    #[test]
    fn test_unchained_actions_run_one_per_advance() {
        let queue = ActionQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            queue.enqueue(0, counter_op(&ran), false);
        }

        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 2);
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_chained_run_drains_through_first_unchained() {
        let queue = ActionQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        queue.enqueue(0, counter_op(&ran), true);
        queue.enqueue(0, counter_op(&ran), true);
        queue.enqueue(0, counter_op(&ran), false);
        queue.enqueue(0, counter_op(&ran), false);

        // First edge drains the chained run plus the unchained action that
        // terminates it; the final action waits for its own edge.
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 3);
        assert_eq!(queue.len(), 1);

        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_delay_counts_edges_not_time() {
        let queue = ActionQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        queue.enqueue(2, counter_op(&ran), false);

        queue.advance();
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        // Third call: delay goes negative, action runs.
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sleep_placeholder_consumes_one_edge() {
        let queue = ActionQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        queue.enqueue(0, None, false);
        queue.enqueue(0, counter_op(&ran), false);

        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert_eq!(queue.len(), 1);
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_chained_sleep_lets_next_action_run_same_edge() {
        let queue = ActionQueue::new();
        let ran = Arc::new(AtomicUsize::new(0));
        queue.enqueue(0, None, true);
        queue.enqueue(0, counter_op(&ran), false);

        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_operation_may_enqueue_without_deadlock() {
        let queue = Arc::new(ActionQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));

        let inner_counter = Arc::clone(&ran);
        let queue_handle = Arc::clone(&queue);
        queue.enqueue(
            0,
            Some(Box::new(move || {
                let counter = Arc::clone(&inner_counter);
                queue_handle.enqueue(
                    0,
                    Some(Box::new(move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                    })),
                    false,
                );
            })),
            false,
        );

        queue.advance();
        assert_eq!(queue.len(), 1);
        queue.advance();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_queue_advance_is_a_noop() {
        let queue = ActionQueue::new();
        queue.advance();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_scheduler_advances_only_on_edges() {
        use crate::frame_clock::MockFrameClock;

        let queue = Arc::new(ActionQueue::new());
        let ran = Arc::new(AtomicUsize::new(0));
        queue.enqueue(0, counter_op(&ran), false);
        queue.enqueue(0, counter_op(&ran), false);

        let clock = MockFrameClock::new();
        clock.push_sample(Some(16.0));
        clock.push_sample(Some(16.0)); // no change, no edge
        clock.push_sample(Some(17.0));

        let mut scheduler = Scheduler::new(Arc::clone(&queue), Box::new(clock));
        assert!(scheduler.poll_once());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(!scheduler.poll_once());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(scheduler.poll_once());
        assert_eq!(ran.load(Ordering::SeqCst), 2);
    }
}
