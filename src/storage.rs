use crate::config::write_atomic;
use crate::model::{clamp_stat, normalize_name, AvatarId, PetStats};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{fs, io, path::PathBuf};

pub const NAME_KEY: &str = "petName";
pub const STATS_KEY: &str = "petStats";
pub const AVATAR_KEY: &str = "petAvatar";

/// String key/value persistence in the shape of browser local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// One file per key inside a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("could not create store directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        write_atomic(&self.path(key), value.as_bytes())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => {
                Err(e).with_context(|| format!("removing {key}"))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.entries.insert(key.to_string(), value.to_string());
        self
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Lenient on-disk shape of `petStats`. Missing fields default, numbers are
/// rounded and clamped, unknown avatars fall back to the dog.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredStats {
    hunger: Option<f64>,
    energy: Option<f64>,
    happiness: Option<f64>,
    evolved: Option<bool>,
    #[serde(alias = "avatar")]
    avatar_id: Option<String>,
}

impl StoredStats {
    fn into_stats(self) -> PetStats {
        let d = PetStats::default();
        let meter = |v: Option<f64>, fallback: u8| match v {
            Some(x) if x.is_finite() => clamp_stat(x.round() as i32),
            _ => fallback,
        };
        PetStats {
            hunger: meter(self.hunger, d.hunger),
            energy: meter(self.energy, d.energy),
            happiness: meter(self.happiness, d.happiness),
            evolved: self.evolved.unwrap_or(false),
            avatar_id: self
                .avatar_id
                .as_deref()
                .and_then(AvatarId::parse)
                .unwrap_or_default(),
        }
    }
}

/// Typed access to the three persisted values. Each is read and written
/// independently; anything unreadable counts as absent.
pub struct PetStorage {
    backend: Box<dyn KeyValueStore>,
}

impl PetStorage {
    pub fn new(backend: Box<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &dyn KeyValueStore {
        self.backend.as_ref()
    }

    pub fn load_name(&self) -> Option<String> {
        self.backend.get(NAME_KEY).and_then(|s| normalize_name(&s))
    }

    pub fn load_stats(&self) -> PetStats {
        self.backend
            .get(STATS_KEY)
            .and_then(|s| serde_json::from_str::<StoredStats>(&s).ok())
            .map(StoredStats::into_stats)
            .unwrap_or_default()
    }

    pub fn load_avatar(&self) -> AvatarId {
        self.backend
            .get(AVATAR_KEY)
            .and_then(|s| AvatarId::parse(&s))
            .unwrap_or_default()
    }

    pub fn save_name(&mut self, name: &str) -> Result<()> {
        self.backend.set(NAME_KEY, name)
    }

    pub fn clear_name(&mut self) -> Result<()> {
        self.backend.remove(NAME_KEY)
    }

    pub fn save_stats(&mut self, stats: &PetStats) -> Result<()> {
        let json = serde_json::to_string(stats)?;
        self.backend.set(STATS_KEY, &json)
    }

    pub fn save_avatar(&mut self, avatar: AvatarId) -> Result<()> {
        self.backend.set(AVATAR_KEY, avatar.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(mem: MemoryStore) -> PetStorage {
        PetStorage::new(Box::new(mem))
    }

    #[test]
    fn empty_store_yields_defaults() {
        let s = storage(MemoryStore::new());
        assert_eq!(s.load_name(), None);
        assert_eq!(s.load_stats(), PetStats::default());
        assert_eq!(s.load_avatar(), AvatarId::Dog);
    }

    #[test]
    fn values_load_independently() {
        let s = storage(
            MemoryStore::new()
                .with(NAME_KEY, "Rex")
                .with(STATS_KEY, "{broken")
                .with(AVATAR_KEY, "turtle"),
        );
        assert_eq!(s.load_name().as_deref(), Some("Rex"));
        assert_eq!(s.load_stats(), PetStats::default());
        assert_eq!(s.load_avatar(), AvatarId::Turtle);
    }

    #[test]
    fn stored_stats_are_clamped_and_completed() {
        let s = storage(MemoryStore::new().with(
            STATS_KEY,
            r#"{"hunger":150,"energy":-3,"happiness":41.6,"avatar":"cat"}"#,
        ));
        let st = s.load_stats();
        assert_eq!((st.hunger, st.energy, st.happiness), (100, 0, 42));
        assert!(!st.evolved);
        assert_eq!(st.avatar_id, AvatarId::Cat);
    }

    #[test]
    fn unknown_avatar_and_blank_name_count_as_absent() {
        let s = storage(
            MemoryStore::new()
                .with(NAME_KEY, "   ")
                .with(AVATAR_KEY, "dragon"),
        );
        assert_eq!(s.load_name(), None);
        assert_eq!(s.load_avatar(), AvatarId::Dog);
    }

    #[test]
    fn saved_stats_read_back() {
        let mut s = storage(MemoryStore::new());
        let st = PetStats {
            hunger: 12,
            evolved: true,
            avatar_id: AvatarId::Bird,
            ..PetStats::default()
        };
        s.save_stats(&st).unwrap();
        assert_eq!(s.load_stats(), st);
        let raw = s.backend().get(STATS_KEY).unwrap();
        assert!(raw.contains(r#""avatarId":"bird""#));
    }

    #[test]
    fn file_store_persists_and_removes() {
        let dir = std::env::temp_dir().join(format!("pocketpet-store-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        {
            let mut fsx = FileStore::open(&dir).unwrap();
            fsx.set(NAME_KEY, "Mochi").unwrap();
        }
        let mut fsx = FileStore::open(&dir).unwrap();
        assert_eq!(fsx.get(NAME_KEY).as_deref(), Some("Mochi"));
        fsx.remove(NAME_KEY).unwrap();
        fsx.remove(NAME_KEY).unwrap();
        assert_eq!(fsx.get(NAME_KEY), None);
        let _ = fs::remove_dir_all(&dir);
    }
}
