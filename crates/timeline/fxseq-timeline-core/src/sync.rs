//! Synchronization groups: effects that share one logical creation instant.
//!
//! The first effect to join a `(scene, group)` key fixes the group's
//! creation time and origin; later joiners adopt them. The group is retired
//! when its last member leaves, so a later joiner under the same key starts a
//! fresh group.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use fxseq_animation_core::OriginId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncGroupKey {
    pub scene: String,
    pub group: String,
}

impl SyncGroupKey {
    pub fn new(scene: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            group: group.into(),
        }
    }
}

/// What a member receives on joining.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncMembership {
    pub logical_creation_time: f64,
    /// Effect that established the group.
    pub origin: OriginId,
}

#[derive(Debug)]
struct SyncGroup {
    membership: SyncMembership,
    members: HashSet<OriginId>,
}

#[derive(Debug, Default)]
pub struct SyncGroupRegistry {
    groups: HashMap<SyncGroupKey, SyncGroup>,
}

impl SyncGroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `effect` under `key`. `own_time` is used only when the group
    /// does not exist yet.
    pub fn join(&mut self, key: SyncGroupKey, effect: OriginId, own_time: f64) -> SyncMembership {
        let group = self.groups.entry(key).or_insert_with_key(|key| {
            log::debug!(
                "sync: group {}/{} established by {} at {}",
                key.scene,
                key.group,
                effect,
                own_time
            );
            SyncGroup {
                membership: SyncMembership {
                    logical_creation_time: own_time,
                    origin: effect,
                },
                members: HashSet::new(),
            }
        });
        group.members.insert(effect);
        group.membership
    }

    /// Remove `effect` from `key`. Returns `true` if this retired the group.
    pub fn leave(&mut self, key: &SyncGroupKey, effect: OriginId) -> bool {
        let Some(group) = self.groups.get_mut(key) else {
            return false;
        };
        group.members.remove(&effect);
        if group.members.is_empty() {
            self.groups.remove(key);
            log::debug!("sync: group {}/{} retired", key.scene, key.group);
            true
        } else {
            false
        }
    }

    pub fn get(&self, key: &SyncGroupKey) -> Option<SyncMembership> {
        self.groups.get(key).map(|g| g.membership)
    }

    pub fn members(&self, key: &SyncGroupKey) -> usize {
        self.groups.get(key).map_or(0, |g| g.members.len())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_joiner_fixes_time() {
        let mut reg = SyncGroupRegistry::new();
        let key = SyncGroupKey::new("stage", "drums");
        let a = OriginId::new_v4();
        let b = OriginId::new_v4();
        let first = reg.join(key.clone(), a, 100.0);
        let second = reg.join(key.clone(), b, 130.0);
        assert_eq!(first, second);
        assert_eq!(second.logical_creation_time, 100.0);
        assert_eq!(second.origin, a);
        assert_eq!(reg.members(&key), 2);
    }

    #[test]
    fn scenes_are_separate() {
        let mut reg = SyncGroupRegistry::new();
        let a = reg.join(SyncGroupKey::new("one", "g"), OriginId::new_v4(), 1.0);
        let b = reg.join(SyncGroupKey::new("two", "g"), OriginId::new_v4(), 2.0);
        assert_ne!(a.logical_creation_time, b.logical_creation_time);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn retires_with_last_member() {
        let mut reg = SyncGroupRegistry::new();
        let key = SyncGroupKey::new("stage", "lights");
        let a = OriginId::new_v4();
        let b = OriginId::new_v4();
        reg.join(key.clone(), a, 5.0);
        reg.join(key.clone(), b, 6.0);
        assert!(!reg.leave(&key, a));
        assert!(reg.leave(&key, b));
        assert!(reg.get(&key).is_none());
        let fresh = reg.join(key.clone(), a, 50.0);
        assert_eq!(fresh.logical_creation_time, 50.0);
    }

    #[test]
    fn key_serializes() {
        let json = serde_json::to_string(&SyncGroupKey::new("s", "g")).unwrap();
        assert_eq!(json, r#"{"scene":"s","group":"g"}"#);
    }
}
