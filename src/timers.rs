//! Timers for the single-threaded event loop.
//!
//! The queue never runs callbacks itself: the event loop asks for the due
//! entries and dispatches them, one at a time, through the session.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::events::TimerKind;

/// Opaque handle returned by [`TimerQueue::schedule_after`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Pending {
    deadline: Instant,
    kind: TimerKind,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    pending: BTreeMap<TimerHandle, Pending>,
}

impl TimerQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule_after(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        self.schedule_at(Instant::now() + delay, kind)
    }

    pub fn schedule_at(&mut self, deadline: Instant, kind: TimerKind) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.pending.insert(handle, Pending { deadline, kind });
        handle
    }

    /// Cancel a pending timer. Unknown or already-fired handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle);
    }

    #[must_use]
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Number of pending timers of `kind`.
    #[must_use]
    pub fn count(&self, kind: TimerKind) -> usize {
        self.pending.values().filter(|p| p.kind == kind).count()
    }

    #[must_use]
    pub fn deadline(&self, handle: TimerHandle) -> Option<Instant> {
        self.pending.get(&handle).map(|p| p.deadline)
    }

    /// Earliest pending deadline, used to park the event loop.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every timer due at `now`, earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TimerHandle, TimerKind)> {
        let mut due: Vec<(Instant, TimerHandle, TimerKind)> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(h, p)| (p.deadline, *h, p.kind))
            .collect();
        due.sort();
        for (_, handle, _) in &due {
            self.pending.remove(handle);
        }
        due.into_iter().map(|(_, h, k)| (h, k)).collect()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// A slot holding at most one pending timer of a given kind.
///
/// Arming always cancels whatever the slot held first, so two callbacks of
/// the same kind can never be pending at once.
#[derive(Debug)]
pub struct TimerSlot {
    kind: TimerKind,
    handle: Option<TimerHandle>,
}

impl TimerSlot {
    #[must_use]
    pub const fn new(kind: TimerKind) -> Self {
        Self { kind, handle: None }
    }

    pub fn arm(&mut self, timers: &mut TimerQueue, delay: Duration) -> TimerHandle {
        self.cancel(timers);
        let handle = timers.schedule_after(delay, self.kind);
        self.handle = Some(handle);
        handle
    }

    pub fn cancel(&mut self, timers: &mut TimerQueue) {
        if let Some(handle) = self.handle.take() {
            timers.cancel(handle);
        }
    }

    /// Claim a fired handle. Returns `false` for handles this slot no
    /// longer owns, which the caller must then ignore.
    pub fn fired(&mut self, handle: TimerHandle) -> bool {
        if self.handle == Some(handle) {
            self.handle = None;
            true
        } else {
            false
        }
    }

    #[must_use]
    pub const fn handle(&self) -> Option<TimerHandle> {
        self.handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let mut q = TimerQueue::new();
        let h = q.schedule_after(Duration::from_secs(1), TimerKind::Advance);
        q.cancel(h);
        q.cancel(h);
        assert!(!q.is_pending(h));
        assert!(q.next_deadline().is_none());
    }

    #[test]
    fn take_due_returns_in_deadline_order() {
        let mut q = TimerQueue::new();
        let t0 = Instant::now();
        let late = q.schedule_at(t0 + Duration::from_millis(20), TimerKind::Advance);
        let early = q.schedule_at(t0 + Duration::from_millis(10), TimerKind::Frame);
        let future = q.schedule_at(t0 + Duration::from_secs(60), TimerKind::Resize);

        let due = q.take_due(t0 + Duration::from_millis(30));
        assert_eq!(
            due,
            vec![(early, TimerKind::Frame), (late, TimerKind::Advance)]
        );
        assert!(q.is_pending(future));
        assert!(q.take_due(t0 + Duration::from_millis(30)).is_empty());
    }

    #[test]
    fn slot_rearm_keeps_a_single_pending_timer() {
        let mut q = TimerQueue::new();
        let mut slot = TimerSlot::new(TimerKind::Advance);
        let first = slot.arm(&mut q, Duration::from_secs(5));
        let second = slot.arm(&mut q, Duration::from_secs(5));
        assert_ne!(first, second);
        assert_eq!(q.count(TimerKind::Advance), 1);
        assert!(!slot.fired(first), "stale handle must be ignored");
        assert!(slot.fired(second));
        assert!(slot.handle().is_none());
    }
}
