use crate::clock::{Scheduler, TimerId, TimerKind};
use crate::model::{Rules, Stat, StatDraft};
use rand::Rng;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardEvent {
    pub message: &'static str,
    pub stat: Stat,
    pub delta: i32,
}

pub const REWARD_TABLE: [RewardEvent; 5] = [
    RewardEvent {
        message: "Your pet found a toy!",
        stat: Stat::Happiness,
        delta: 5,
    },
    RewardEvent {
        message: "Your pet fell asleep for a bit.",
        stat: Stat::Energy,
        delta: 5,
    },
    RewardEvent {
        message: "Your pet is looking for attention.",
        stat: Stat::Happiness,
        delta: 5,
    },
    RewardEvent {
        message: "Your pet found a snack!",
        stat: Stat::Hunger,
        delta: 5,
    },
    RewardEvent {
        message: "Your pet took a quick nap.",
        stat: Stat::Energy,
        delta: 3,
    },
];

pub fn decay(d: StatDraft, amount: i32) -> StatDraft {
    d.adjust_all(-amount)
}

pub fn pick_reward<R: Rng + ?Sized>(rng: &mut R) -> &'static RewardEvent {
    &REWARD_TABLE[rng.gen_range(0..REWARD_TABLE.len())]
}

pub fn apply_reward(d: StatDraft, ev: &RewardEvent) -> StatDraft {
    d.adjust(ev.stat, ev.delta)
}

/// The two recurring simulation timers. Both run only while onboarding is
/// complete.
#[derive(Debug, Default)]
pub struct Schedules {
    decay: Option<TimerId>,
    reward: Option<TimerId>,
}

impl Schedules {
    pub fn start(&mut self, sched: &mut Scheduler, rules: &Rules) {
        if self.decay.is_none() {
            self.decay = Some(sched.every(TimerKind::Decay, rules.decay_interval_ms));
        }
        if self.reward.is_none() {
            self.reward = Some(sched.every(TimerKind::Reward, rules.reward_interval_ms));
        }
        debug!(now = sched.now(), "decay and reward schedules running");
    }

    pub fn stop(&mut self, sched: &mut Scheduler) {
        for id in [self.decay.take(), self.reward.take()].into_iter().flatten() {
            sched.cancel(id);
        }
        debug!(now = sched.now(), "decay and reward schedules stopped");
    }

    pub fn is_running(&self) -> bool {
        self.decay.is_some() && self.reward.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PetStats;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reward_deltas_are_positive_and_small() {
        for ev in REWARD_TABLE.iter() {
            assert!((3..=5).contains(&ev.delta), "{}", ev.message);
        }
    }

    #[test]
    fn pick_reward_is_reproducible_from_seed() {
        let mut a = StdRng::seed_from_u64(7);
        let mut b = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(pick_reward(&mut a), pick_reward(&mut b));
        }
    }

    #[test]
    fn schedules_start_once_and_stop_cleanly() {
        let mut sched = Scheduler::new();
        let mut s = Schedules::default();
        let rules = Rules::default();
        s.start(&mut sched, &rules);
        s.start(&mut sched, &rules);
        assert_eq!(sched.active_count(), 2);
        assert!(s.is_running());
        s.stop(&mut sched);
        assert_eq!(sched.active_count(), 0);
        assert!(!s.is_running());
    }

    proptest! {
        #[test]
        fn n_decay_ticks_floor_at_zero(n in 0_u32..60) {
            let mut st = PetStats::default();
            for _ in 0..n {
                st = decay(st.draft(), 4).clamped();
            }
            let want = (100 - 4 * n as i32).max(0) as u8;
            prop_assert_eq!(st.hunger, want);
            prop_assert_eq!(st.energy, want);
            prop_assert_eq!(st.happiness, want);
        }

        #[test]
        fn rewards_never_exceed_cap(seed in any::<u64>(), n in 0_usize..80) {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut st = PetStats { hunger: 90, energy: 90, happiness: 90, ..PetStats::default() };
            for _ in 0..n {
                st = apply_reward(st.draft(), pick_reward(&mut rng)).clamped();
            }
            prop_assert!(st.hunger <= 100 && st.energy <= 100 && st.happiness <= 100);
        }
    }
}
