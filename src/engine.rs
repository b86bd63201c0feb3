//! The pet simulation behind one owned value.
//!
//! `PetEngine` is the whole boundary the presentation layer sees: a read-only
//! `Snapshot`, a stats subscription hook, the user intents (feed, sleep, play,
//! onboarding, avatar selection) and a queue of one-shot `Notice`s. Time only
//! moves when the host calls `advance`, which dispatches due timers one at a
//! time against `&mut self`, so no two mutations can interleave.

use crate::clock::{Fired, Scheduler, SimTime, TimerId, TimerKind};
use crate::evolution::{EvolutionState, EvolutionTracker};
use crate::model::{
    derive_mood, normalize_name, ActionKind, AnimationCue, AvatarId, Mood, Notice, PetProfile,
    PetStats, Rules, StatDraft, STAT_MAX,
};
use crate::secret::SecretDetector;
use crate::sim::{apply_reward, decay, pick_reward, Schedules};
use crate::storage::PetStorage;
use crate::store::{StatStore, Subscriber, SubscriptionId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct Snapshot {
    pub now: SimTime,
    pub stats: PetStats,
    pub profile: Option<PetProfile>,
    /// Avatar currently highlighted in the picker; persisted on its own.
    pub selected_avatar: AvatarId,
    pub onboarding: bool,
    pub evolution: EvolutionState,
    pub mood: Mood,
    pub animation: Option<AnimationCue>,
    pub toast: Option<String>,
    pub celebrating: bool,
}

pub struct PetEngine {
    rules: Rules,
    sched: Scheduler,
    store: StatStore,
    storage: PetStorage,
    evolution: EvolutionTracker,
    secret: SecretDetector,
    schedules: Schedules,
    rng: StdRng,
    onboarding: bool,
    animation: Option<(AnimationCue, TimerId)>,
    toast: Option<(String, TimerId)>,
    celebration: Option<TimerId>,
    notices: VecDeque<Notice>,
}

impl PetEngine {
    /// Reads the three persisted values and starts the simulation unless the
    /// pet still needs a name.
    pub fn load(storage: PetStorage, rules: Rules, seed: u64) -> Self {
        let name = storage.load_name();
        let stats = storage.load_stats();
        let avatar = storage.load_avatar();
        let onboarding = name.is_none();
        info!(
            named = !onboarding,
            evolved = stats.evolved,
            avatar = avatar.as_str(),
            "pet loaded"
        );

        let mut engine = Self {
            evolution: EvolutionTracker::new(stats.evolved),
            store: StatStore::new(stats, name, avatar),
            rules,
            sched: Scheduler::new(),
            storage,
            secret: SecretDetector::new(),
            schedules: Schedules::default(),
            rng: StdRng::seed_from_u64(seed),
            onboarding,
            animation: None,
            toast: None,
            celebration: None,
            notices: VecDeque::new(),
        };
        if !engine.onboarding {
            engine.resume();
        }
        engine
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn now(&self) -> SimTime {
        self.sched.now()
    }

    pub fn stats(&self) -> PetStats {
        self.store.get()
    }

    pub fn needs_onboarding(&self) -> bool {
        self.onboarding
    }

    pub fn storage(&self) -> &PetStorage {
        &self.storage
    }

    pub fn simulation_running(&self) -> bool {
        self.schedules.is_running()
    }

    pub fn snapshot(&self) -> Snapshot {
        let stats = self.store.get();
        Snapshot {
            now: self.sched.now(),
            stats,
            profile: self.store.name().map(|name| PetProfile {
                name: name.to_string(),
                avatar_id: stats.avatar_id,
            }),
            selected_avatar: self.store.avatar(),
            onboarding: self.onboarding,
            evolution: self.evolution.state(),
            mood: derive_mood(&stats, self.rules.evolution_threshold),
            animation: self.animation.map(|(cue, _)| cue),
            toast: self.toast.as_ref().map(|(msg, _)| msg.clone()),
            celebrating: self.celebration.is_some(),
        }
    }

    pub fn subscribe(&mut self, f: Subscriber) -> SubscriptionId {
        self.store.subscribe(f)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn feed(&mut self) -> bool {
        self.interact(ActionKind::Feed)
    }

    pub fn sleep(&mut self) -> bool {
        self.interact(ActionKind::Sleep)
    }

    pub fn play(&mut self) -> bool {
        self.interact(ActionKind::Play)
    }

    /// Ignored while onboarding or when the target meter is already full.
    pub fn interact(&mut self, kind: ActionKind) -> bool {
        let stat = kind.stat();
        if self.onboarding || i32::from(self.store.get().get(stat)) >= STAT_MAX {
            return false;
        }
        debug!(action = ?kind, now = self.sched.now(), "interaction");

        let boost = self.rules.interaction_boost;
        self.commit(|d| d.adjust(stat, boost));
        self.show_animation(kind.cue());
        self.show_toast(kind.toast().to_string());

        if self
            .secret
            .record(kind, self.rules.secret_window_ms, &mut self.sched)
        {
            let bonus = self.rules.secret_bonus;
            self.commit(|d| d.adjust_all(bonus));
            self.notices.push_back(Notice::SecretFound);
            self.start_celebration();
        }
        true
    }

    /// Names the pet and starts (or resumes) the simulation. A blank name is
    /// ignored and onboarding stays open.
    pub fn complete_onboarding(&mut self, name: &str, avatar: AvatarId) -> bool {
        let Some(name) = normalize_name(name) else {
            return false;
        };
        info!(name = %name, avatar = avatar.as_str(), "onboarding complete");

        if let Err(err) = self.storage.save_name(&name) {
            warn!(error = %err, "failed to persist pet name");
        }
        self.store.set_name(Some(name));
        self.select_avatar(avatar);

        self.onboarding = false;
        self.commit(|d| StatDraft {
            avatar_id: avatar,
            ..d
        });
        self.resume();
        true
    }

    pub fn select_avatar(&mut self, avatar: AvatarId) {
        self.store.set_avatar(avatar);
        if let Err(err) = self.storage.save_avatar(avatar) {
            warn!(error = %err, "failed to persist avatar");
        }
    }

    /// Reopens onboarding (the settings flow). Timers stop; stats are kept.
    pub fn open_onboarding(&mut self) {
        if self.onboarding {
            return;
        }
        info!("onboarding reopened");
        self.onboarding = true;
        self.schedules.stop(&mut self.sched);
        self.evolution.suspend(&mut self.sched);
    }

    /// Deliberate wipe back to a fresh, unnamed pet.
    pub fn reset(&mut self) {
        info!("pet reset");
        self.onboarding = true;
        self.schedules.stop(&mut self.sched);
        self.evolution.reset(&mut self.sched);
        self.secret.reset(&mut self.sched);
        for id in [
            self.animation.take().map(|(_, id)| id),
            self.toast.take().map(|(_, id)| id),
            self.celebration.take(),
        ]
        .into_iter()
        .flatten()
        {
            self.sched.cancel(id);
        }

        self.store.set_name(None);
        if let Err(err) = self.storage.clear_name() {
            warn!(error = %err, "failed to clear pet name");
        }
        self.select_avatar(AvatarId::default());
        self.store.replace(PetStats::default());
        self.persist_stats();
    }

    pub fn advance(&mut self, dt: Duration) {
        let ms = u64::try_from(dt.as_millis()).unwrap_or(u64::MAX);
        self.advance_to(self.sched.now().saturating_add(ms));
    }

    pub fn advance_to(&mut self, until: SimTime) {
        while let Some(fired) = self.sched.pop_due(until) {
            self.dispatch(fired);
        }
        self.sched.settle(until);
    }

    fn dispatch(&mut self, fired: Fired) {
        match fired.kind {
            TimerKind::Decay => {
                let amount = self.rules.decay_amount;
                debug!(at = fired.at, "decay tick");
                self.commit(|d| decay(d, amount));
            }
            TimerKind::Reward => {
                let ev = pick_reward(&mut self.rng);
                debug!(at = fired.at, stat = ?ev.stat, delta = ev.delta, "reward event");
                self.commit(|d| apply_reward(d, ev));
                self.show_toast(ev.message.to_string());
            }
            TimerKind::Evolution => {
                if self.evolution.on_timer(fired.id) {
                    self.commit(|d| StatDraft { evolved: true, ..d });
                    self.notices.push_back(Notice::Evolved);
                }
            }
            TimerKind::SecretWindow => {
                self.secret.on_window_expired(fired.id);
            }
            TimerKind::AnimationClear => {
                if matches!(self.animation, Some((_, id)) if id == fired.id) {
                    self.animation = None;
                    self.notices.push_back(Notice::AnimationCleared);
                }
            }
            TimerKind::ToastClear => {
                if matches!(self.toast, Some((_, id)) if id == fired.id) {
                    self.toast = None;
                    self.notices.push_back(Notice::ToastCleared);
                }
            }
            TimerKind::CelebrationClear => {
                if self.celebration == Some(fired.id) {
                    self.celebration = None;
                    self.notices.push_back(Notice::CelebrationEnded);
                }
            }
        }
    }

    /// Every stat mutation: clamp in the store, persist, re-check evolution.
    fn commit<F>(&mut self, f: F)
    where
        F: FnOnce(StatDraft) -> StatDraft,
    {
        if self.store.update(f) {
            self.persist_stats();
        }
        if !self.onboarding {
            let stats = self.store.get();
            self.evolution.evaluate(&stats, &self.rules, &mut self.sched);
        }
    }

    fn persist_stats(&mut self) {
        let stats = self.store.get();
        if let Err(err) = self.storage.save_stats(&stats) {
            warn!(error = %err, "failed to persist stats");
        }
    }

    fn resume(&mut self) {
        self.schedules.start(&mut self.sched, &self.rules);
        let stats = self.store.get();
        self.evolution.evaluate(&stats, &self.rules, &mut self.sched);
    }

    fn show_toast(&mut self, msg: String) {
        if let Some((_, old)) = self.toast.take() {
            self.sched.cancel(old);
        }
        let id = self.sched.after(TimerKind::ToastClear, self.rules.toast_ms);
        self.notices.push_back(Notice::Toast(msg.clone()));
        self.toast = Some((msg, id));
    }

    fn show_animation(&mut self, cue: AnimationCue) {
        if let Some((_, old)) = self.animation.take() {
            self.sched.cancel(old);
        }
        let id = self
            .sched
            .after(TimerKind::AnimationClear, self.rules.animation_ms);
        self.notices.push_back(Notice::Animation(cue));
        self.animation = Some((cue, id));
    }

    fn start_celebration(&mut self) {
        if let Some(old) = self.celebration.take() {
            self.sched.cancel(old);
        }
        let id = self
            .sched
            .after(TimerKind::CelebrationClear, self.rules.celebration_ms);
        self.notices.push_back(Notice::CelebrationStarted);
        self.celebration = Some(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore, AVATAR_KEY, NAME_KEY, STATS_KEY};

    /// Named pet with the reward timer pushed out of the way.
    fn named() -> PetEngine {
        let mem = MemoryStore::new().with(NAME_KEY, "Mochi");
        let rules = Rules {
            reward_interval_ms: 1_000_000_000,
            ..Rules::default()
        };
        PetEngine::load(PetStorage::new(Box::new(mem)), rules, 1)
    }

    #[test]
    fn interaction_at_cap_is_silent() {
        let mut e = named();
        e.drain_notices();
        let before = e.snapshot();
        assert!(!e.feed());
        assert_eq!(e.snapshot(), before);
        assert!(e.drain_notices().is_empty());
    }

    #[test]
    fn feed_boosts_animates_and_toasts() {
        let mut e = named();
        e.advance(Duration::from_secs(50)); // five decay ticks: 80
        e.drain_notices();

        assert!(e.feed());
        assert_eq!(e.stats().hunger, 98);
        let snap = e.snapshot();
        assert_eq!(snap.animation, Some(AnimationCue::Bounce));
        assert_eq!(snap.toast.as_deref(), Some("Your pet loved the food!"));
        assert_eq!(
            e.drain_notices(),
            vec![
                Notice::Animation(AnimationCue::Bounce),
                Notice::Toast("Your pet loved the food!".to_string())
            ]
        );

        e.advance(Duration::from_millis(700));
        assert_eq!(e.snapshot().animation, None);
        assert!(e.snapshot().toast.is_some());
        e.advance(Duration::from_millis(1100));
        assert_eq!(e.snapshot().toast, None);
        assert_eq!(
            e.drain_notices(),
            vec![Notice::AnimationCleared, Notice::ToastCleared]
        );
    }

    #[test]
    fn newer_toast_keeps_its_full_lifetime() {
        let mut e = named();
        e.advance(Duration::from_secs(20));
        e.feed();
        e.advance(Duration::from_millis(1000));
        e.sleep();
        e.advance(Duration::from_millis(1000));
        assert_eq!(e.snapshot().toast.as_deref(), Some("Your pet had a nice nap!"));
    }

    #[test]
    fn stats_are_persisted_on_change() {
        let mut e = named();
        e.advance(Duration::from_secs(10));
        let raw = e.storage().backend().get(STATS_KEY).unwrap();
        assert!(raw.contains(r#""hunger":96"#));
    }

    #[test]
    fn reopening_onboarding_pauses_timers() {
        let mut e = named();
        e.open_onboarding();
        assert!(!e.simulation_running());
        e.advance(Duration::from_secs(120));
        assert_eq!(e.stats().hunger, 100);

        assert!(e.complete_onboarding("Mochi", AvatarId::Bird));
        assert!(e.simulation_running());
        assert_eq!(e.stats().avatar_id, AvatarId::Bird);
        e.advance(Duration::from_secs(10));
        assert_eq!(e.stats().hunger, 96);
    }

    #[test]
    fn blank_name_keeps_onboarding_open() {
        let mem = MemoryStore::new();
        let mut e = PetEngine::load(PetStorage::new(Box::new(mem)), Rules::default(), 1);
        assert!(!e.complete_onboarding("   ", AvatarId::Cat));
        assert!(e.needs_onboarding());
        assert!(!e.simulation_running());
        assert_eq!(e.storage().backend().get(NAME_KEY), None);
    }

    #[test]
    fn reset_wipes_back_to_defaults() {
        let mut e = named();
        e.complete_onboarding("Rex", AvatarId::Cat);
        e.advance(Duration::from_secs(30));
        e.reset();

        let snap = e.snapshot();
        assert!(snap.onboarding);
        assert_eq!(snap.profile, None);
        assert_eq!(snap.stats, PetStats::default());
        assert_eq!(e.storage().backend().get(NAME_KEY), None);
        assert_eq!(e.storage().backend().get(AVATAR_KEY).as_deref(), Some("dog"));
        assert!(!e.simulation_running());
    }
}
