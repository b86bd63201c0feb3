use crate::model::{AvatarId, PetStats, StatDraft};

pub type Subscriber = Box<dyn FnMut(&PetStats)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Sole owner of the pet's stats, name and selected avatar.
///
/// All stat writes go through `update`, which clamps every meter to
/// `[0, 100]` and refuses to clear `evolved` once it is set.
pub struct StatStore {
    stats: PetStats,
    name: Option<String>,
    avatar: AvatarId,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_sub: u64,
}

impl StatStore {
    pub fn new(stats: PetStats, name: Option<String>, avatar: AvatarId) -> Self {
        Self {
            stats,
            name,
            avatar,
            subscribers: Vec::new(),
            next_sub: 0,
        }
    }

    pub fn get(&self) -> PetStats {
        self.stats
    }

    /// Applies `f` to an unclamped draft, then clamps and stores the result.
    /// Returns whether the stored stats changed. Subscribers hear about every
    /// update either way.
    pub fn update<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(StatDraft) -> StatDraft,
    {
        let before = self.stats;
        let mut next = f(before.draft()).clamped();
        next.evolved |= before.evolved;
        self.stats = next;
        self.notify();
        next != before
    }

    /// Wholesale replacement used by reset; bypasses the evolved latch.
    pub(crate) fn replace(&mut self, stats: PetStats) {
        self.stats = stats;
        self.notify();
    }

    pub fn subscribe(&mut self, f: Subscriber) -> SubscriptionId {
        let id = SubscriptionId(self.next_sub);
        self.next_sub += 1;
        self.subscribers.push((id, f));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn avatar(&self) -> AvatarId {
        self.avatar
    }

    pub fn set_avatar(&mut self, avatar: AvatarId) {
        self.avatar = avatar;
    }

    fn notify(&mut self) {
        let stats = self.stats;
        for (_, f) in self.subscribers.iter_mut() {
            f(&stats);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Stat;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store() -> StatStore {
        StatStore::new(PetStats::default(), None, AvatarId::Dog)
    }

    #[test]
    fn update_clamps_both_ends() {
        let mut s = store();
        s.update(|d| d.adjust(Stat::Hunger, 50).adjust(Stat::Energy, -500));
        let st = s.get();
        assert_eq!(st.hunger, 100);
        assert_eq!(st.energy, 0);
        assert_eq!(st.happiness, 100);
    }

    #[test]
    fn evolved_cannot_be_cleared_by_a_transform() {
        let mut s = store();
        s.update(|d| StatDraft { evolved: true, ..d });
        assert!(s.get().evolved);
        s.update(|d| StatDraft { evolved: false, ..d });
        assert!(s.get().evolved);
    }

    #[test]
    fn update_reports_change() {
        let mut s = store();
        assert!(!s.update(|d| d.adjust(Stat::Hunger, 10)));
        assert!(s.update(|d| d.adjust(Stat::Hunger, -10)));
    }

    #[test]
    fn subscribers_see_every_update_until_removed() {
        let mut s = store();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = s.subscribe(Box::new(move |st| sink.borrow_mut().push(st.hunger)));

        s.update(|d| d.adjust(Stat::Hunger, -4));
        s.update(|d| d);
        assert!(s.unsubscribe(id));
        s.update(|d| d.adjust(Stat::Hunger, -4));

        assert_eq!(*seen.borrow(), vec![96, 96]);
        assert!(!s.unsubscribe(id));
    }
}
