//! Revocable deferred tasks advanced by host frame time.
//!
//! A task is a payload plus a due time. `advance(dt)` moves the queue's clock
//! and hands back every payload that came due, in due order; the owner routes
//! them. A revoked task is simply never returned.

use serde::{Deserialize, Serialize};

/// Handle to a scheduled task, used to revoke it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    due: f64,
    payload: T,
}

#[derive(Debug)]
pub struct DeferredQueue<T> {
    now: f64,
    next: u64,
    pending: Vec<Scheduled<T>>,
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self {
            now: 0.0,
            next: 0,
            pending: Vec::new(),
        }
    }
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue clock in ms since creation.
    #[inline]
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Run `payload` after `delay` ms. Negative or non-finite delays run on
    /// the next advance.
    pub fn schedule(&mut self, delay: f64, payload: T) -> TaskHandle {
        let delay = if delay.is_finite() { delay.max(0.0) } else { 0.0 };
        let handle = TaskHandle(self.next);
        self.next += 1;
        self.pending.push(Scheduled {
            handle,
            due: self.now + delay,
            payload,
        });
        handle
    }

    /// Drop a pending task. Returns `false` if it already ran or was revoked.
    pub fn revoke(&mut self, handle: TaskHandle) -> bool {
        let before = self.pending.len();
        self.pending.retain(|s| s.handle != handle);
        before != self.pending.len()
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.pending.iter().any(|s| s.handle == handle)
    }

    /// Time left until `handle` runs.
    pub fn remaining(&self, handle: TaskHandle) -> Option<f64> {
        self.pending
            .iter()
            .find(|s| s.handle == handle)
            .map(|s| (s.due - self.now).max(0.0))
    }

    /// Advance the clock and return every payload now due, earliest first.
    pub fn advance(&mut self, dt: f64) -> Vec<T> {
        if dt.is_finite() && dt > 0.0 {
            self.now += dt;
        }
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|s| s.due <= now);
        self.pending = pending;
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.handle.cmp(&b.handle)));
        due.into_iter().map(|s| s.payload).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_due_order() {
        let mut q = DeferredQueue::new();
        q.schedule(30.0, "c");
        q.schedule(10.0, "a");
        q.schedule(10.0, "b");
        assert!(q.advance(5.0).is_empty());
        assert_eq!(q.advance(5.0), vec!["a", "b"]);
        assert_eq!(q.advance(100.0), vec!["c"]);
        assert!(q.is_empty());
    }

    #[test]
    fn revoked_tasks_never_fire() {
        let mut q = DeferredQueue::new();
        let h = q.schedule(10.0, 1);
        assert!(q.is_pending(h));
        assert_eq!(q.remaining(h), Some(10.0));
        assert!(q.revoke(h));
        assert!(!q.revoke(h));
        assert!(q.advance(50.0).is_empty());
    }

    #[test]
    fn zero_delay_runs_on_next_advance() {
        let mut q = DeferredQueue::new();
        q.schedule(-4.0, ());
        assert_eq!(q.advance(0.0).len(), 1);
    }
}
