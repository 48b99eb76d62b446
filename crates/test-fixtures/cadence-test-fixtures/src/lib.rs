//! Shared JSON fixtures for tests and benches, located through `fixtures/manifest.json`.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "state-machines")]
    state_machines: HashMap<String, MachineEntry>,
    #[serde(rename = "sprite-animations")]
    sprite_animations: HashMap<String, String>,
}

/// A machine either stands alone or names the sprite library it plays against.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MachineEntry {
    Path(String),
    Paired { machine: String, sprites: String },
}

impl MachineEntry {
    fn machine(&self) -> &str {
        match self {
            MachineEntry::Path(path) => path,
            MachineEntry::Paired { machine, .. } => machine,
        }
    }

    fn sprites(&self) -> Option<&str> {
        match self {
            MachineEntry::Path(_) => None,
            MachineEntry::Paired { sprites, .. } => Some(sprites),
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

pub mod state_machines {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.state_machines.keys().cloned().collect()
    }

    /// Descriptor JSON of the named machine.
    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.state_machines, "state machine", name)?;
        read_to_string(entry.machine())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.state_machines, "state machine", name)?;
        super::load_json(entry.machine())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.state_machines, "state machine", name)?;
        Ok(resolve_path(entry.machine()))
    }

    /// Sprite library JSON paired with the named machine, if any.
    pub fn sprites_json(name: &str) -> Result<Option<String>> {
        let entry = lookup(&MANIFEST.state_machines, "state machine", name)?;
        entry.sprites().map(read_to_string).transpose()
    }
}

pub mod sprite_animations {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.sprite_animations.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.sprite_animations, "sprite animation", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.sprite_animations, "sprite animation", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.sprite_animations, "sprite animation", name)?;
        Ok(resolve_path(rel))
    }
}
