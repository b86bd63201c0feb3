//! Virtual-clock timer queue.
//!
//! Every time-based event in the simulation (decay ticks, reward ticks, the
//! evolution hold, the secret-sequence window, and the transient UI clears)
//! is an entry in one `Scheduler`. Nothing fires on its own: the owner calls
//! `pop_due(until)` in a loop and dispatches each `Fired` before asking for the
//! next one, so callbacks never interleave.
//!
//! Entries are ordered by `(due, seq)`. Two timers falling due at the same
//! instant fire in the order they were (re)armed.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Milliseconds since the scheduler was created.
pub type SimTime = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Decay,
    Reward,
    Evolution,
    SecretWindow,
    AnimationClear,
    ToastClear,
    CelebrationClear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fired {
    pub id: TimerId,
    pub kind: TimerKind,
    pub at: SimTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    due: SimTime,
    seq: u64,
    id: TimerId,
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Clone, Copy, Debug)]
struct Timer {
    kind: TimerKind,
    period: Option<u64>,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now: SimTime,
    next_id: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Entry>>,
    live: HashMap<TimerId, Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    /// One-shot timer firing `delay` ms from now.
    pub fn after(&mut self, kind: TimerKind, delay: u64) -> TimerId {
        self.arm(kind, delay, None)
    }

    /// Recurring timer, first firing one `period` from now.
    pub fn every(&mut self, kind: TimerKind, period: u64) -> TimerId {
        let period = period.max(1);
        self.arm(kind, period, Some(period))
    }

    /// Returns false if the timer already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        // Heap entries of cancelled timers are skipped lazily in `pop_due`.
        self.live.remove(&id).is_some()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.live.contains_key(&id)
    }

    pub fn active_count(&self) -> usize {
        self.live.len()
    }

    pub fn is_active_kind(&self, kind: TimerKind) -> bool {
        self.live.values().any(|t| t.kind == kind)
    }

    /// Pops the earliest live timer due at or before `until`, moving the
    /// clock to its due time. Periodic timers are re-armed before returning.
    pub fn pop_due(&mut self, until: SimTime) -> Option<Fired> {
        loop {
            let Reverse(head) = *self.queue.peek()?;
            if head.due > until {
                return None;
            }
            self.queue.pop();

            let Some(timer) = self.live.get(&head.id).copied() else {
                continue;
            };

            self.now = self.now.max(head.due);
            match timer.period {
                Some(period) => self.push(head.id, head.due + period),
                None => {
                    self.live.remove(&head.id);
                }
            }
            return Some(Fired {
                id: head.id,
                kind: timer.kind,
                at: head.due,
            });
        }
    }

    /// Moves the clock forward once every due timer has been popped.
    pub fn settle(&mut self, until: SimTime) {
        self.now = self.now.max(until);
    }

    fn arm(&mut self, kind: TimerKind, delay: u64, period: Option<u64>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.live.insert(id, Timer { kind, period });
        self.push(id, self.now + delay);
        id
    }

    fn push(&mut self, id: TimerId, due: SimTime) {
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Entry { due, seq, id }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(s: &mut Scheduler, until: SimTime) -> Vec<(TimerKind, SimTime)> {
        let mut out = Vec::new();
        while let Some(f) = s.pop_due(until) {
            out.push((f.kind, f.at));
        }
        s.settle(until);
        out
    }

    #[test]
    fn periodic_timer_fires_on_each_period() {
        let mut s = Scheduler::new();
        s.every(TimerKind::Decay, 10);
        assert_eq!(
            drain(&mut s, 35),
            vec![
                (TimerKind::Decay, 10),
                (TimerKind::Decay, 20),
                (TimerKind::Decay, 30)
            ]
        );
        assert_eq!(s.now(), 35);
        assert_eq!(drain(&mut s, 40), vec![(TimerKind::Decay, 40)]);
    }

    #[test]
    fn one_shot_fires_once_then_goes_inactive() {
        let mut s = Scheduler::new();
        let id = s.after(TimerKind::Evolution, 60);
        assert!(drain(&mut s, 59).is_empty());
        assert!(s.is_active(id));
        assert_eq!(drain(&mut s, 1000), vec![(TimerKind::Evolution, 60)]);
        assert!(!s.is_active(id));
        assert!(!s.cancel(id));
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut s = Scheduler::new();
        let a = s.after(TimerKind::ToastClear, 5);
        let p = s.every(TimerKind::Reward, 5);
        assert!(s.cancel(a));
        assert!(s.cancel(p));
        assert!(drain(&mut s, 100).is_empty());
        assert_eq!(s.active_count(), 0);
    }

    #[test]
    fn same_instant_fires_in_arming_order() {
        let mut s = Scheduler::new();
        s.every(TimerKind::Decay, 30);
        s.every(TimerKind::Reward, 30);
        assert_eq!(
            drain(&mut s, 30),
            vec![(TimerKind::Decay, 30), (TimerKind::Reward, 30)]
        );
    }

    #[test]
    fn timers_armed_later_start_from_current_time() {
        let mut s = Scheduler::new();
        s.settle(100);
        s.after(TimerKind::SecretWindow, 60);
        assert!(drain(&mut s, 159).is_empty());
        assert_eq!(drain(&mut s, 160), vec![(TimerKind::SecretWindow, 160)]);
    }
}
