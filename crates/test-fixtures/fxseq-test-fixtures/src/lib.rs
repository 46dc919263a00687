use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use fxseq_animation_core::{AnimatableTarget, PropertyBag, PropertyPath, StaleTarget};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    effects: HashMap<String, EffectEntry>,
    scenes: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EffectEntry {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        total_ms: Option<f64>,
    },
}

impl EffectEntry {
    fn as_path(&self) -> &str {
        match self {
            EffectEntry::Path(path) => path,
            EffectEntry::Detailed { path, .. } => path,
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Effect declarations.
pub mod effects {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.effects.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.effects, "effect", name)?;
        read_to_string(entry.as_path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.effects, "effect", name)?;
        super::load_json(entry.as_path())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.effects, "effect", name)?;
        Ok(resolve_path(entry.as_path()))
    }

    /// Expected total duration in ms, when the manifest records one.
    /// `None` also covers endless effects.
    pub fn expected_total(name: &str) -> Result<Option<f64>> {
        let entry = lookup(&MANIFEST.effects, "effect", name)?;
        Ok(match entry {
            EffectEntry::Path(_) => None,
            EffectEntry::Detailed { total_ms, .. } => *total_ms,
        })
    }
}

/// Named sprites with their starting property values.
pub mod scenes {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.scenes.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn load(name: &str) -> Result<HashMap<String, PropertyBag>> {
        let rel = lookup(&MANIFEST.scenes, "scene", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.scenes, "scene", name)?;
        Ok(resolve_path(rel))
    }
}

/// Property bag that counts writes per path.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    pub bag: PropertyBag,
    pub writes: HashMap<String, usize>,
}

impl RecordingTarget {
    pub fn new(bag: PropertyBag) -> Self {
        Self {
            bag,
            writes: HashMap::new(),
        }
    }

    pub fn writes_to(&self, path: &str) -> usize {
        self.writes.get(path).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> usize {
        self.writes.values().sum()
    }
}

impl AnimatableTarget for RecordingTarget {
    fn get(&self, path: &PropertyPath) -> Option<f64> {
        self.bag.get(path)
    }

    fn set(&mut self, path: &PropertyPath, value: f64) -> Result<(), StaleTarget> {
        self.bag.set(path, value)?;
        *self.writes.entry(path.as_str().to_string()).or_default() += 1;
        Ok(())
    }
}
