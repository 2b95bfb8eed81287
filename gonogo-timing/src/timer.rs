use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

/// Identifies one armed one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, PartialEq, Eq)]
struct Deadline {
    at_ns: u64,
    seq: u64,
    id: u64,
}

impl Ord for Deadline {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Deadline order, then arming order for equal deadlines.
        (self.at_ns, self.seq).cmp(&(other.at_ns, other.seq))
    }
}

impl PartialOrd for Deadline {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// One-shot timer scheduler. Holds deadlines only; the driver loop supplies
/// the current time and collects due handles, so no background thread or
/// blocking wait is involved and tests can run it against a manual clock.
#[derive(Debug, Default)]
pub struct TimerService {
    queue: BinaryHeap<Reverse<Deadline>>,
    cancelled: HashSet<u64>,
    next_id: u64,
}

impl TimerService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer due `delay` after `now_ns`. The handle is delivered by
    /// `poll` exactly once, unless cancelled first.
    pub fn after(&mut self, now_ns: u64, delay: Duration) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.queue.push(Reverse(Deadline {
            at_ns: now_ns + delay.as_nanos() as u64,
            seq: id,
            id,
        }));
        TimerHandle(id)
    }

    /// Guarantees the handle will never be delivered. Cancelling an already
    /// delivered or unknown handle is a no-op.
    pub fn cancel(&mut self, handle: TimerHandle) {
        self.cancelled.insert(handle.0);
    }

    /// Earliest pending deadline, skipping cancelled entries.
    pub fn next_deadline_ns(&mut self) -> Option<u64> {
        while let Some(Reverse(head)) = self.queue.peek() {
            if self.cancelled.contains(&head.id) {
                let Reverse(dead) = self.queue.pop().expect("peeked entry");
                self.cancelled.remove(&dead.id);
                continue;
            }
            return Some(head.at_ns);
        }
        None
    }

    /// Removes and returns every due, uncancelled handle, in deadline order
    /// with ties broken by arming order.
    pub fn poll(&mut self, now_ns: u64) -> Vec<TimerHandle> {
        let mut due = Vec::new();
        while let Some(Reverse(head)) = self.queue.peek() {
            if head.at_ns > now_ns {
                break;
            }
            let Reverse(dead) = self.queue.pop().expect("peeked entry");
            if !self.cancelled.remove(&dead.id) {
                due.push(TimerHandle(dead.id));
            }
        }
        due
    }

    pub fn is_idle(&mut self) -> bool {
        self.next_deadline_ns().is_none()
    }
}
