use crate::clock::SimTime;
use serde::{Deserialize, Serialize};

pub const STAT_MIN: i32 = 0;
pub const STAT_MAX: i32 = 100;
pub const NAME_MAX_CHARS: usize = 16;

pub fn clamp_stat(v: i32) -> u8 {
    v.clamp(STAT_MIN, STAT_MAX) as u8
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarId {
    #[default]
    Dog,
    Cat,
    Bird,
    Turtle,
}

impl AvatarId {
    pub const ALL: [AvatarId; 4] = [
        AvatarId::Dog,
        AvatarId::Cat,
        AvatarId::Bird,
        AvatarId::Turtle,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AvatarId::Dog => "dog",
            AvatarId::Cat => "cat",
            AvatarId::Bird => "bird",
            AvatarId::Turtle => "turtle",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dog" => Some(AvatarId::Dog),
            "cat" => Some(AvatarId::Cat),
            "bird" => Some(AvatarId::Bird),
            "turtle" => Some(AvatarId::Turtle),
            _ => None,
        }
    }

    pub fn glyph(self, evolved: bool) -> &'static str {
        match (self, evolved) {
            (AvatarId::Dog, false) => "🐶",
            (AvatarId::Cat, false) => "🐱",
            (AvatarId::Bird, false) => "🐦",
            (AvatarId::Turtle, false) => "🐢",
            (AvatarId::Dog, true) => "🦄",
            (AvatarId::Cat, true) => "🦁",
            (AvatarId::Bird, true) => "🦜",
            (AvatarId::Turtle, true) => "🐉",
        }
    }

    /// Cycles through `ALL`, wrapping at both ends.
    pub fn step(self, delta: i32) -> Self {
        let len = Self::ALL.len() as i32;
        let i = Self::ALL.iter().position(|a| *a == self).unwrap_or(0) as i32;
        Self::ALL[(i + delta).rem_euclid(len) as usize]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Hunger,
    Energy,
    Happiness,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetStats {
    pub hunger: u8,
    pub energy: u8,
    pub happiness: u8,
    pub evolved: bool,
    #[serde(alias = "avatar")]
    pub avatar_id: AvatarId,
}

impl Default for PetStats {
    fn default() -> Self {
        Self {
            hunger: 100,
            energy: 100,
            happiness: 100,
            evolved: false,
            avatar_id: AvatarId::Dog,
        }
    }
}

impl PetStats {
    pub fn get(&self, stat: Stat) -> u8 {
        match stat {
            Stat::Hunger => self.hunger,
            Stat::Energy => self.energy,
            Stat::Happiness => self.happiness,
        }
    }

    pub fn all_above(&self, threshold: u8) -> bool {
        self.hunger > threshold && self.energy > threshold && self.happiness > threshold
    }

    pub fn draft(&self) -> StatDraft {
        StatDraft {
            hunger: self.hunger as i32,
            energy: self.energy as i32,
            happiness: self.happiness as i32,
            evolved: self.evolved,
            avatar_id: self.avatar_id,
        }
    }
}

/// Unclamped working copy handed to store transforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatDraft {
    pub hunger: i32,
    pub energy: i32,
    pub happiness: i32,
    pub evolved: bool,
    pub avatar_id: AvatarId,
}

impl StatDraft {
    pub fn adjust(mut self, stat: Stat, delta: i32) -> Self {
        let slot = match stat {
            Stat::Hunger => &mut self.hunger,
            Stat::Energy => &mut self.energy,
            Stat::Happiness => &mut self.happiness,
        };
        *slot = slot.saturating_add(delta);
        self
    }

    pub fn adjust_all(self, delta: i32) -> Self {
        self.adjust(Stat::Hunger, delta)
            .adjust(Stat::Energy, delta)
            .adjust(Stat::Happiness, delta)
    }

    pub fn clamped(self) -> PetStats {
        PetStats {
            hunger: clamp_stat(self.hunger),
            energy: clamp_stat(self.energy),
            happiness: clamp_stat(self.happiness),
            evolved: self.evolved,
            avatar_id: self.avatar_id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetProfile {
    pub name: String,
    pub avatar_id: AvatarId,
}

/// Trims and truncates a user-entered name. Blank input yields `None`.
pub fn normalize_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let name: String = trimmed.chars().take(NAME_MAX_CHARS).collect();
    Some(name.trim_end().to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Feed,
    Sleep,
    Play,
}

impl ActionKind {
    pub fn stat(self) -> Stat {
        match self {
            ActionKind::Feed => Stat::Hunger,
            ActionKind::Sleep => Stat::Energy,
            ActionKind::Play => Stat::Happiness,
        }
    }

    pub fn cue(self) -> AnimationCue {
        match self {
            ActionKind::Feed => AnimationCue::Bounce,
            ActionKind::Sleep => AnimationCue::Doze,
            ActionKind::Play => AnimationCue::Wiggle,
        }
    }

    pub fn toast(self) -> &'static str {
        match self {
            ActionKind::Feed => "Your pet loved the food!",
            ActionKind::Sleep => "Your pet had a nice nap!",
            ActionKind::Play => "Your pet had fun playing!",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionEvent {
    pub kind: ActionKind,
    pub at: SimTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimationCue {
    Bounce,
    Doze,
    Wiggle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mood {
    Sad,
    Content,
    Glowing,
}

pub fn derive_mood(s: &PetStats, glow_threshold: u8) -> Mood {
    if s.hunger == 0 || s.energy == 0 || s.happiness == 0 {
        return Mood::Sad;
    }
    if s.all_above(glow_threshold) {
        return Mood::Glowing;
    }
    Mood::Content
}

/// One-shot events for the presentation layer. Drained, rendered, discarded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Toast(String),
    ToastCleared,
    Animation(AnimationCue),
    AnimationCleared,
    Evolved,
    SecretFound,
    CelebrationStarted,
    CelebrationEnded,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rules {
    pub decay_interval_ms: u64,
    pub decay_amount: i32,
    pub reward_interval_ms: u64,
    pub evolution_threshold: u8,
    pub evolution_hold_ms: u64,
    pub secret_window_ms: u64,
    pub secret_bonus: i32,
    pub interaction_boost: i32,
    pub animation_ms: u64,
    pub toast_ms: u64,
    pub celebration_ms: u64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            decay_interval_ms: 10_000,
            decay_amount: 4,
            reward_interval_ms: 30_000,
            evolution_threshold: 80,
            evolution_hold_ms: 60_000,
            secret_window_ms: 60_000,
            secret_bonus: 10,
            interaction_boost: 18,
            animation_ms: 700,
            toast_ms: 1800,
            celebration_ms: 3500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn stats_json_uses_avatar_id_key() {
        let json = serde_json::to_value(PetStats::default()).unwrap();
        assert_eq!(json["avatarId"], "dog");
        assert_eq!(json["hunger"], 100);
        assert_eq!(json["evolved"], false);
    }

    #[test]
    fn stats_json_accepts_legacy_avatar_key() {
        let s: PetStats = serde_json::from_str(
            r#"{"hunger":50,"energy":60,"happiness":70,"evolved":true,"avatar":"bird"}"#,
        )
        .unwrap();
        assert_eq!(s.avatar_id, AvatarId::Bird);
        assert!(s.evolved);
    }

    #[test]
    fn names_are_trimmed_and_capped() {
        assert_eq!(normalize_name("  Rex "), Some("Rex".to_string()));
        assert_eq!(normalize_name("   "), None);
        let long = normalize_name("abcdefghijklmnopqrstuvwxyz").unwrap();
        assert_eq!(long.chars().count(), NAME_MAX_CHARS);
    }

    #[test]
    fn avatar_step_wraps() {
        assert_eq!(AvatarId::Dog.step(-1), AvatarId::Turtle);
        assert_eq!(AvatarId::Turtle.step(1), AvatarId::Dog);
        assert_eq!(AvatarId::parse(" CAT "), Some(AvatarId::Cat));
        assert_eq!(AvatarId::parse("hamster"), None);
    }

    #[test]
    fn mood_follows_extremes() {
        let mut s = PetStats::default();
        assert_eq!(derive_mood(&s, 80), Mood::Glowing);
        s.energy = 50;
        assert_eq!(derive_mood(&s, 80), Mood::Content);
        s.hunger = 0;
        assert_eq!(derive_mood(&s, 80), Mood::Sad);
    }

    proptest! {
        #[test]
        fn clamped_draft_stays_in_bounds(v in 0_u8..=100, d in -1000_i32..1000) {
            let s = PetStats { hunger: v, energy: v, happiness: v, ..PetStats::default() };
            let out = s.draft().adjust_all(d).clamped();
            prop_assert!(out.hunger <= 100);
            prop_assert_eq!(out.hunger as i32, (v as i32 + d).clamp(0, 100));
        }
    }
}
