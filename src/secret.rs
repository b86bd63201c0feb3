use crate::clock::{Scheduler, SimTime, TimerId, TimerKind};
use crate::model::{ActionEvent, ActionKind};
use std::collections::VecDeque;
use tracing::{debug, info};

pub const SECRET_PATTERN: [ActionKind; 5] = [
    ActionKind::Feed,
    ActionKind::Feed,
    ActionKind::Feed,
    ActionKind::Play,
    ActionKind::Sleep,
];

#[derive(Clone, Copy, Debug)]
struct Window {
    opened_at: SimTime,
    timer: TimerId,
}

/// Sliding-window matcher for the hidden ritual.
///
/// The window opens with the first action after a quiet period and lasts a
/// fixed time from that action, match or no match. Only the most recent
/// `SECRET_PATTERN.len()` actions are kept since a match is a suffix test.
#[derive(Debug, Default)]
pub struct SecretDetector {
    log: VecDeque<ActionEvent>,
    window: Option<Window>,
}

impl SecretDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action. Returns true when it completes the pattern, in which
    /// case the window is closed and the log emptied.
    pub fn record(&mut self, kind: ActionKind, window_ms: u64, sched: &mut Scheduler) -> bool {
        let now = sched.now();

        if let Some(w) = self.window {
            if now.saturating_sub(w.opened_at) >= window_ms {
                // Expiry timer is due but not yet dispatched.
                self.close(sched);
            }
        }
        if self.window.is_none() {
            self.log.clear();
            let timer = sched.after(TimerKind::SecretWindow, window_ms);
            self.window = Some(Window {
                opened_at: now,
                timer,
            });
            debug!(opened_at = now, "secret window opened");
        }

        self.log.push_back(ActionEvent { kind, at: now });
        while self.log.len() > SECRET_PATTERN.len() {
            self.log.pop_front();
        }

        if self.matches() {
            info!(at = now, "secret sequence completed");
            self.close(sched);
            return true;
        }
        false
    }

    /// Called when a `SecretWindow` timer fires.
    pub fn on_window_expired(&mut self, id: TimerId) -> bool {
        match self.window {
            Some(w) if w.timer == id => {
                debug!(opened_at = w.opened_at, dropped = self.log.len(), "secret window expired");
                self.window = None;
                self.log.clear();
                true
            }
            _ => false,
        }
    }

    pub fn reset(&mut self, sched: &mut Scheduler) {
        self.close(sched);
    }

    pub fn is_open(&self) -> bool {
        self.window.is_some()
    }

    pub fn recent(&self) -> impl Iterator<Item = &ActionEvent> {
        self.log.iter()
    }

    fn matches(&self) -> bool {
        self.log.len() >= SECRET_PATTERN.len()
            && self
                .log
                .iter()
                .rev()
                .zip(SECRET_PATTERN.iter().rev())
                .all(|(ev, want)| ev.kind == *want)
    }

    fn close(&mut self, sched: &mut Scheduler) {
        if let Some(w) = self.window.take() {
            sched.cancel(w.timer);
        }
        self.log.clear();
    }
}
