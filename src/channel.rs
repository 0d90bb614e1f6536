//! Bounded, blocking, multi-producer / multi-consumer FIFO channel.
//!
//! One channel backs every edge of a running pipeline. Producers block (or
//! time out, or fail `try_push`) when a bounded channel is full; consumers
//! block when it is empty. [`Channel::shutdown`] flips a sticky flag that
//! wakes every waiter: pushes fail from then on, while pops keep draining
//! the remaining items FIFO before failing.
//!
//! Internally a mutex-protected deque with two condition variables
//! (not-empty, not-full). All methods report full/empty/shutdown through
//! their return value; nothing panics on the hot path.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

struct ChannelState<T> {
    queue: VecDeque<T>,
    shutdown: bool,
}

pub struct Channel<T> {
    state: Mutex<ChannelState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    /// `None` means unbounded.
    capacity: Option<usize>,
}

impl<T> Channel<T> {
    /// A channel that holds at most `capacity` items.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            state: Mutex::new(ChannelState {
                queue: VecDeque::with_capacity(capacity),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: Some(capacity),
        }
    }

    /// A channel with no capacity limit; pushes never block.
    pub fn unbounded() -> Self {
        Self {
            state: Mutex::new(ChannelState {
                queue: VecDeque::new(),
                shutdown: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState<T>> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the queue itself stays structurally valid.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_full(&self, state: &ChannelState<T>) -> bool {
        self.capacity.is_some_and(|cap| state.queue.len() >= cap)
    }

    /// Blocks until capacity is available or the channel shuts down.
    /// Returns `true` iff the item was enqueued.
    pub fn push(&self, item: T) -> bool {
        let mut state = self.lock();
        while !state.shutdown && self.is_full(&state) {
            state = self
                .not_full
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if state.shutdown {
            return false;
        }
        state.queue.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Like [`Channel::push`] but gives up after `timeout`.
    pub fn push_timeout(&self, item: T, timeout: Duration) -> bool {
        let state = self.lock();
        let (mut state, wait) = self
            .not_full
            .wait_timeout_while(state, timeout, |s| !s.shutdown && self.is_full(s))
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() || state.shutdown {
            return false;
        }
        state.queue.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Non-blocking push; fails immediately when full or shut down.
    pub fn try_push(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.shutdown || self.is_full(&state) {
            return false;
        }
        state.queue.push_back(item);
        self.not_empty.notify_one();
        true
    }

    /// Blocks until an item is available or the channel is shut down *and*
    /// drained. Remaining items are still delivered after shutdown.
    pub fn pop(&self) -> Option<T> {
        let mut state = self.lock();
        while !state.shutdown && state.queue.is_empty() {
            state = self
                .not_empty
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        let item = state.queue.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Like [`Channel::pop`] but gives up after `timeout`.
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        let state = self.lock();
        let (mut state, wait) = self
            .not_empty
            .wait_timeout_while(state, timeout, |s| !s.shutdown && s.queue.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        if wait.timed_out() {
            return None;
        }
        let item = state.queue.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Non-blocking pop. Keeps draining after shutdown until empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.lock();
        let item = state.queue.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    /// Sets the sticky shutdown flag and wakes every parked producer and
    /// consumer. All further pushes fail; pops drain the remainder.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        state.shutdown = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_shutdown(&self) -> bool {
        self.lock().shutdown
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}
