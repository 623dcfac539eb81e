//! Single-threaded scheduling primitives: a readiness observer that replaces
//! polling for asynchronously inserted containers, and a one-shot timer queue
//! driven by a virtual clock.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::engine::Trigger;

type Callback = Box<dyn FnOnce()>;

struct Waiter {
    id: u64,
    target: String,
    callback: Callback,
}

#[derive(Default)]
struct GateState {
    present: HashSet<String>,
    waiters: Vec<Waiter>,
    next_id: u64,
}

/// Notifies observers once a named container has been inserted by the host.
#[derive(Clone, Default)]
pub struct ReadinessGate {
    inner: Rc<RefCell<GateState>>,
}

/// Cancel handle for a pending [`ReadinessGate::when_ready`] registration.
pub struct ReadyHandle {
    id: u64,
    gate: Weak<RefCell<GateState>>,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_present(&self, target: &str) -> bool {
        self.inner.borrow().present.contains(target)
    }

    /// Run `callback` once `target` exists. If it already does, the callback
    /// runs before this returns and the handle is no longer pending.
    pub fn when_ready<F>(&self, target: &str, callback: F) -> ReadyHandle
    where
        F: FnOnce() + 'static,
    {
        let id = {
            let mut state = self.inner.borrow_mut();
            let id = state.next_id;
            state.next_id += 1;
            if !state.present.contains(target) {
                state.waiters.push(Waiter { id, target: target.to_string(), callback: Box::new(callback) });
                return ReadyHandle { id, gate: Rc::downgrade(&self.inner) };
            }
            id
        };
        debug!(container = target, "container already present");
        callback();
        ReadyHandle { id, gate: Weak::new() }
    }

    /// Called by the host when `target` has been inserted.
    pub fn notify_inserted(&self, target: &str) {
        let ready: Vec<Waiter> = {
            let mut state = self.inner.borrow_mut();
            state.present.insert(target.to_string());
            let (ready, waiting): (Vec<Waiter>, Vec<Waiter>) = std::mem::take(&mut state.waiters)
                .into_iter()
                .partition(|w| w.target == target);
            state.waiters = waiting;
            ready
        };
        debug!(container = target, observers = ready.len(), "container inserted");
        // The borrow is released so callbacks may register further observers.
        for waiter in ready {
            (waiter.callback)();
        }
    }

    /// Called by the host when `target` is torn down.
    pub fn notify_removed(&self, target: &str) {
        self.inner.borrow_mut().present.remove(target);
    }
}

impl ReadyHandle {
    pub fn is_pending(&self) -> bool {
        self.gate
            .upgrade()
            .is_some_and(|gate| gate.borrow().waiters.iter().any(|w| w.id == self.id))
    }

    /// Drop the registration. No-op if it already fired.
    pub fn cancel(self) {
        if let Some(gate) = self.gate.upgrade() {
            gate.borrow_mut().waiters.retain(|w| w.id != self.id);
        }
    }
}

#[derive(Debug)]
struct Pending {
    due: Duration,
    seq: u64,
    trigger: Trigger,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap on (due, seq)
        other.due.cmp(&self.due).then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One-shot delayed triggers on a virtual clock.
#[derive(Debug, Default)]
pub struct RecheckTimers {
    now: Duration,
    queue: BinaryHeap<Pending>,
    next_seq: u64,
}

impl RecheckTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn schedule(&mut self, delay: Duration, trigger: Trigger) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Pending { due: self.now + delay, seq, trigger });
    }

    /// Move the clock forward and return every trigger that came due, in order.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Trigger> {
        self.now += elapsed;
        let mut fired = Vec::new();
        while self.queue.peek().is_some_and(|p| p.due <= self.now) {
            if let Some(p) = self.queue.pop() {
                fired.push(p.trigger);
            }
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    #[test]
    fn fires_on_insertion() {
        let gate = ReadinessGate::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = gate.when_ready("widget", move || h.set(h.get() + 1));
        assert!(handle.is_pending());
        gate.notify_inserted("other");
        assert_eq!(hits.get(), 0);
        gate.notify_inserted("widget");
        assert_eq!(hits.get(), 1);
        assert!(!handle.is_pending());
        gate.notify_inserted("widget");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn fires_immediately_when_present() {
        let gate = ReadinessGate::new();
        gate.notify_inserted("widget");
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        let handle = gate.when_ready("widget", move || h.set(h.get() + 1));
        assert_eq!(hits.get(), 1);
        assert!(!handle.is_pending());
    }

    #[test]
    fn cancelled_observers_never_fire() {
        let gate = ReadinessGate::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        gate.when_ready("widget", move || h.set(h.get() + 1)).cancel();
        gate.notify_inserted("widget");
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn timers_fire_in_due_order() {
        let mut t = RecheckTimers::new();
        t.schedule(Duration::from_millis(600), Trigger::Recheck);
        t.schedule(Duration::from_millis(100), Trigger::Ready);
        assert!(t.advance(Duration::from_millis(50)).is_empty());
        assert_eq!(t.advance(Duration::from_millis(50)), vec![Trigger::Ready]);
        assert_eq!(t.pending(), 1);
        assert_eq!(t.advance(Duration::from_millis(500)), vec![Trigger::Recheck]);
        assert_eq!(t.now(), Duration::from_millis(600));
        assert_eq!(t.pending(), 0);
    }

    #[test]
    fn equal_deadlines_keep_schedule_order() {
        let mut t = RecheckTimers::new();
        t.schedule(Duration::from_millis(10), Trigger::Changed { key: "a".into() });
        t.schedule(Duration::from_millis(10), Trigger::Changed { key: "b".into() });
        assert_eq!(
            t.advance(Duration::from_millis(10)),
            vec![Trigger::Changed { key: "a".into() }, Trigger::Changed { key: "b".into() }]
        );
    }
}
