//! Property paths and the target access traits.
//!
//! Targets are addressed by [`TargetId`] arena handles and their numeric
//! properties by a parsed [`PropertyPath`]. Adapters (rendering layer, tests)
//! implement [`AnimatableTarget`] per concrete target kind and hand the
//! scheduler a [`TargetStore`] each tick.

use std::fmt;
use std::str::FromStr;

use hashbrown::HashMap;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{StaleTarget, ValidationError};
use crate::ids::{IdAllocator, TargetId};

/// Dotted path to a numeric property, e.g. `"alpha"` or `"scale.x"`.
///
/// Parsed once when an animation is constructed; segments are never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyPath {
    raw: String,
}

impl PropertyPath {
    /// Parse and validate a dotted property path.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() || s.split('.').any(|seg| seg.trim().is_empty()) {
            return Err(ValidationError::InvalidPath {
                path: s.to_string(),
            });
        }
        Ok(Self { raw: s.to_string() })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Individual dot-separated segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }
}

impl FromStr for PropertyPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for PropertyPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for PropertyPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PropertyPath::parse(&s).map_err(de::Error::custom)
    }
}

/// Anything that owns numeric properties addressable by path.
pub trait AnimatableTarget {
    /// Current value of `path`, or `None` if it does not resolve.
    fn get(&self, path: &PropertyPath) -> Option<f64>;

    /// Overwrite `path`. Fails when the property no longer resolves.
    fn set(&mut self, path: &PropertyPath, value: f64) -> Result<(), StaleTarget>;
}

/// Resolves arena handles to live targets for the duration of one tick.
pub trait TargetStore {
    fn target_mut(&mut self, id: TargetId) -> Option<&mut dyn AnimatableTarget>;
}

/// Flat map of property path to value. Setting a path that was never
/// inserted fails, mirroring a host object that lacks the property.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyBag {
    values: HashMap<String, f64>,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, path: &str, value: f64) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: &str, value: f64) -> Option<f64> {
        self.values.insert(path.to_string(), value)
    }

    pub fn remove(&mut self, path: &str) -> Option<f64> {
        self.values.remove(path)
    }

    pub fn value(&self, path: &str) -> Option<f64> {
        self.values.get(path).copied()
    }
}

impl AnimatableTarget for PropertyBag {
    fn get(&self, path: &PropertyPath) -> Option<f64> {
        self.values.get(path.as_str()).copied()
    }

    fn set(&mut self, path: &PropertyPath, value: f64) -> Result<(), StaleTarget> {
        match self.values.get_mut(path.as_str()) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StaleTarget::new(path.as_str())),
        }
    }
}

/// Owns boxed targets keyed by arena handle. Removing a target leaves its
/// handle dangling on purpose: animations still referencing it go stale.
#[derive(Default)]
pub struct TargetArena {
    ids: IdAllocator,
    targets: HashMap<TargetId, Box<dyn AnimatableTarget>>,
}

impl TargetArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: impl AnimatableTarget + 'static) -> TargetId {
        let id = self.ids.alloc_target();
        self.targets.insert(id, Box::new(target));
        id
    }

    pub fn remove(&mut self, id: TargetId) -> bool {
        self.targets.remove(&id).is_some()
    }

    pub fn get(&self, id: TargetId) -> Option<&dyn AnimatableTarget> {
        self.targets.get(&id).map(|t| t.as_ref())
    }

    /// Convenience read of one property.
    pub fn value(&self, id: TargetId, path: &str) -> Option<f64> {
        let path = PropertyPath::parse(path).ok()?;
        self.get(id)?.get(&path)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl fmt::Debug for TargetArena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetArena")
            .field("targets", &self.targets.len())
            .finish()
    }
}

impl TargetStore for TargetArena {
    fn target_mut(&mut self, id: TargetId) -> Option<&mut dyn AnimatableTarget> {
        match self.targets.get_mut(&id) {
            Some(target) => Some(target.as_mut()),
            None => None,
        }
    }
}
