use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::hash::Hash;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use glam::{Vec2, Vec3};

use super::{ActorSyncTracker, Direction, SyncConfig};
use crate::codec::Color;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ActorFlags: u8 {
        const SOLID = 1 << 0;
        const EXCLUDED = 1 << 1;
        const DISCONNECTING = 1 << 2;
        const KEYFRAMES_ACTIVE = 1 << 3;
    }
}

/// Animation the host is playing for an actor and will report back on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WarpKind {
    In,
    Out,
    Teleport { to: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingWarp {
    pub kind: WarpKind,
    pub started: Instant,
}

#[derive(Debug, Clone)]
pub struct RemoteActor {
    pub ticket: String,
    pub name: String,
    pub texture_path: String,
    pub animation_path: String,
    pub animation: Option<String>,
    pub scale: Vec2,
    pub rotation: f32,
    pub minimap_color: Color,
    pub flags: ActorFlags,
    pub tracker: ActorSyncTracker,
    pub warp: Option<PendingWarp>,
}

impl RemoteActor {
    pub fn new(
        ticket: String,
        position: Vec3,
        heading: Direction,
        now: Instant,
        config: &SyncConfig,
    ) -> Self {
        Self {
            ticket,
            name: String::new(),
            texture_path: String::new(),
            animation_path: String::new(),
            animation: None,
            scale: Vec2::ONE,
            rotation: 0.0,
            minimap_color: Color::WHITE,
            flags: ActorFlags::empty(),
            tracker: ActorSyncTracker::new(position, heading, now, config),
            warp: None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        self.flags.contains(ActorFlags::EXCLUDED)
    }

    pub fn is_disconnecting(&self) -> bool {
        self.flags.contains(ActorFlags::DISCONNECTING)
    }
}

/// Reference-counted hiding. An id stays hidden until every exclude has been
/// matched by an include.
#[derive(Debug, Clone)]
pub struct ExclusionCounter<K> {
    counts: HashMap<K, u32>,
}

impl<K> Default for ExclusionCounter<K> {
    fn default() -> Self {
        Self {
            counts: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash> ExclusionCounter<K> {
    /// Returns true when `id` became hidden.
    pub fn exclude(&mut self, id: K) -> bool {
        let count = self.counts.entry(id).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Returns true when `id` became visible again.
    pub fn include(&mut self, id: K) -> bool {
        match self.counts.entry(id) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() -= 1;
                if *entry.get() == 0 {
                    entry.remove();
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(_) => false,
        }
    }

    pub fn is_excluded(&self, id: &K) -> bool {
        self.counts.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disconnect {
    Unknown,
    Removed,
    /// Kept until its warp-out or teleport finishes.
    Deferred,
}

/// Remote actors keyed by ticket.
#[derive(Debug, Default)]
pub struct ActorTable {
    actors: HashMap<String, RemoteActor>,
    exclusions: ExclusionCounter<String>,
}

impl ActorTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn get(&self, ticket: &str) -> Option<&RemoteActor> {
        self.actors.get(ticket)
    }

    pub fn get_mut(&mut self, ticket: &str) -> Option<&mut RemoteActor> {
        self.actors.get_mut(ticket)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteActor> {
        self.actors.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut RemoteActor> {
        self.actors.values_mut()
    }

    /// Adds or replaces an actor, applying any exclusion recorded for its
    /// ticket beforehand.
    pub fn insert(&mut self, mut actor: RemoteActor) -> Option<RemoteActor> {
        actor
            .flags
            .set(ActorFlags::EXCLUDED, self.exclusions.is_excluded(&actor.ticket));
        self.actors.insert(actor.ticket.clone(), actor)
    }

    pub fn is_excluded(&self, ticket: &str) -> bool {
        self.exclusions.is_excluded(&ticket.to_string())
    }

    pub fn exclude(&mut self, ticket: &str) -> bool {
        let hidden = self.exclusions.exclude(ticket.to_string());
        if let Some(actor) = self.actors.get_mut(ticket) {
            actor.flags.insert(ActorFlags::EXCLUDED);
        }
        hidden
    }

    pub fn include(&mut self, ticket: &str) -> bool {
        let visible = self.exclusions.include(ticket.to_string());
        if visible && let Some(actor) = self.actors.get_mut(ticket) {
            actor.flags.remove(ActorFlags::EXCLUDED);
        }
        visible
    }

    pub fn start_warp(&mut self, ticket: &str, kind: WarpKind, now: Instant) {
        if let Some(actor) = self.actors.get_mut(ticket) {
            actor.warp = Some(PendingWarp { kind, started: now });
        }
    }

    /// Removes the actor unless an animation is still playing for it, in which
    /// case removal happens when that animation finishes.
    pub fn disconnect(&mut self, ticket: &str, warp_out: bool, now: Instant) -> Disconnect {
        let Some(actor) = self.actors.get_mut(ticket) else {
            return Disconnect::Unknown;
        };

        actor.flags.insert(ActorFlags::DISCONNECTING);

        if warp_out && !actor.is_excluded() && actor.warp.is_none() {
            actor.warp = Some(PendingWarp {
                kind: WarpKind::Out,
                started: now,
            });
        }

        if actor.warp.is_some() {
            return Disconnect::Deferred;
        }

        self.actors.remove(ticket);
        Disconnect::Removed
    }

    /// Drops the entry at once, pending warp or not.
    pub fn remove(&mut self, ticket: &str) -> Option<RemoteActor> {
        self.actors.remove(ticket)
    }

    /// Completes the actor's pending animation. Returns the warp that ended and
    /// whether the actor was removed as a result.
    pub fn finish_warp(
        &mut self,
        ticket: &str,
        now: Instant,
        config: &SyncConfig,
    ) -> Option<(WarpKind, bool)> {
        let actor = self.actors.get_mut(ticket)?;
        let warp = actor.warp.take()?;

        if let WarpKind::Teleport { to } = warp.kind {
            let target = actor.tracker.pending_teleport().unwrap_or(to);
            actor.tracker.force_position(target, now, config);
        }

        let removed = actor.is_disconnecting();
        if removed {
            self.actors.remove(ticket);
        }
        Some((warp.kind, removed))
    }

    /// Tickets whose animation has outlived `timeout`.
    pub fn expired_warps(&self, now: Instant, timeout: Duration) -> Vec<String> {
        self.actors
            .values()
            .filter(|actor| {
                actor
                    .warp
                    .is_some_and(|warp| now.saturating_duration_since(warp.started) >= timeout)
            })
            .map(|actor| actor.ticket.clone())
            .collect()
    }

    /// Drops every actor and exclusion.
    pub fn clear(&mut self) {
        self.actors.clear();
        self.exclusions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(ticket: &str, now: Instant) -> RemoteActor {
        RemoteActor::new(
            ticket.to_string(),
            Vec3::ZERO,
            Direction::Down,
            now,
            &SyncConfig::default(),
        )
    }

    #[test]
    fn test_exclusion_is_reference_counted() {
        let mut counter = ExclusionCounter::default();

        assert!(counter.exclude(4u32));
        assert!(!counter.exclude(4));
        assert!(!counter.include(4));
        assert!(counter.is_excluded(&4));
        assert!(counter.include(4));
        assert!(!counter.is_excluded(&4));
        assert!(!counter.include(4));
    }

    #[test]
    fn test_exclusion_survives_connect() {
        let now = Instant::now();
        let mut table = ActorTable::new();

        table.exclude("abc");
        table.insert(actor("abc", now));
        assert!(table.get("abc").unwrap().is_excluded());

        table.include("abc");
        assert!(!table.get("abc").unwrap().is_excluded());
    }

    #[test]
    fn test_disconnect_waits_for_warp_out() {
        let now = Instant::now();
        let config = SyncConfig::default();
        let mut table = ActorTable::new();
        table.insert(actor("abc", now));

        assert_eq!(table.disconnect("abc", true, now), Disconnect::Deferred);
        assert!(table.get("abc").is_some());

        assert_eq!(
            table.finish_warp("abc", now, &config),
            Some((WarpKind::Out, true))
        );
        assert!(table.get("abc").is_none());
    }

    #[test]
    fn test_disconnect_during_teleport() {
        let now = Instant::now();
        let config = SyncConfig::default();
        let mut table = ActorTable::new();
        table.insert(actor("abc", now));
        table.start_warp("abc", WarpKind::Teleport { to: Vec3::X }, now);

        assert_eq!(table.disconnect("abc", false, now), Disconnect::Deferred);
        assert!(matches!(
            table.finish_warp("abc", now, &config),
            Some((WarpKind::Teleport { .. }, true))
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_remove_ignores_pending_warp() {
        let now = Instant::now();
        let mut table = ActorTable::new();
        table.insert(actor("abc", now));
        table.start_warp("abc", WarpKind::In, now);

        assert!(table.remove("abc").is_some());
        assert!(table.get("abc").is_none());
        assert!(
            table
                .expired_warps(now + Duration::from_secs(10), Duration::from_secs(3))
                .is_empty()
        );
        assert!(table.remove("abc").is_none());
    }

    #[test]
    fn test_excluded_actor_removed_immediately() {
        let now = Instant::now();
        let mut table = ActorTable::new();
        table.exclude("abc");
        table.insert(actor("abc", now));

        assert_eq!(table.disconnect("abc", true, now), Disconnect::Removed);
        assert_eq!(table.disconnect("abc", true, now), Disconnect::Unknown);
    }

    #[test]
    fn test_expired_warps() {
        let now = Instant::now();
        let mut table = ActorTable::new();
        table.insert(actor("a", now));
        table.insert(actor("b", now));
        table.start_warp("a", WarpKind::In, now);

        assert!(table.expired_warps(now, Duration::from_secs(3)).is_empty());
        assert_eq!(
            table.expired_warps(now + Duration::from_secs(3), Duration::from_secs(3)),
            vec!["a".to_string()]
        );
    }
}
