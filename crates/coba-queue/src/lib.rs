//! A debouncing work queue.
//!
//! Paths are registered as they change. A path only becomes eligible for
//! [`DebounceQueue::next`] once it has sat idle (unregistered again) for
//! at least `idle_wait`; a fresh registration moves it back to the end
//! of the queue and resets its clock. This coalesces bursts of writes to
//! the same file into a single backup, while keeping unrelated files
//! from blocking on each other.

use std::path::PathBuf;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use indexmap::IndexMap;

struct State {
    entries: IndexMap<PathBuf, Instant>,
    shutdown: bool,
}

pub struct DebounceQueue {
    idle_wait: Duration,
    state: Mutex<State>,
    condvar: Condvar,
}

impl DebounceQueue {
    pub fn new(idle_wait: Duration) -> Self {
        Self {
            idle_wait,
            state: Mutex::new(State {
                entries: IndexMap::new(),
                shutdown: false,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Registers (or re-registers) `path`, resetting its idle clock and
    /// moving it to the back of the queue.
    pub fn register(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        state.entries.shift_remove(&path);
        state.entries.insert(path, Instant::now());
        self.condvar.notify_all();
    }

    /// Blocks until the path at the front of the queue has been idle for
    /// `idle_wait`, then removes and returns it. Returns `None` once the
    /// queue has been shut down and drained.
    pub fn next(&self) -> Option<PathBuf> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some((path, registered_at)) = state.entries.get_index(0).map(|(p, t)| (p.clone(), *t)) {
                let elapsed = registered_at.elapsed();
                if elapsed >= self.idle_wait {
                    state.entries.shift_remove_index(0);
                    return Some(path);
                }
                let remaining = self.idle_wait - elapsed;
                let (guard, _timeout) = self
                    .condvar
                    .wait_timeout(state, remaining)
                    .unwrap();
                state = guard;
                continue;
            }

            if state.shutdown {
                return None;
            }

            state = self.condvar.wait(state).unwrap();
        }
    }

    /// Signals shutdown. Any paths still queued are drained normally
    /// (respecting their remaining idle time) before `next` starts
    /// returning `None`.
    pub fn shutdown(&self) {
        let mut state = self.state.lock().unwrap();
        state.shutdown = true;
        self.condvar.notify_all();
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
