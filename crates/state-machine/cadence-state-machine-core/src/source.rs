//! Sprite animation data the runtime resolves animation names against.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::ids::StringId64;

/// Frame list played over `total_time` seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpriteAnimation {
    pub frames: Vec<u32>,
    pub total_time: f32,
}

impl SpriteAnimation {
    pub fn new(frames: Vec<u32>, total_time: f32) -> Self {
        Self { frames, total_time }
    }

    /// Playable animations have frames and a positive duration.
    pub fn is_playable(&self) -> bool {
        !self.frames.is_empty() && self.total_time.is_finite() && self.total_time > 0.0
    }

    /// Frame shown at `time`. Times outside `[0, total_time]` clamp to the ends.
    pub fn frame_at(&self, time: f32) -> Option<u32> {
        let last = self.frames.len().checked_sub(1)?;
        let ratio = (time / self.total_time).clamp(0.0, 1.0);
        let index = ((ratio * self.frames.len() as f32) as usize).min(last);
        self.frames.get(index).copied()
    }

    /// Frame shown at `time` when the animation repeats: `floor(n * t / T) mod n`.
    pub fn looping_frame_at(&self, time: f32) -> Option<u32> {
        let count = self.frames.len();
        if count == 0 {
            return None;
        }
        let step = (count as f32 * time / self.total_time).floor();
        if !step.is_finite() {
            return self.frames.first().copied();
        }
        let index = (step as i64).rem_euclid(count as i64) as usize;
        self.frames.get(index).copied()
    }
}

/// Host-provided lookup of sprite animations by name hash.
pub trait AnimationSource {
    fn animation(&self, name: StringId64) -> Option<&SpriteAnimation>;
}

#[derive(Clone, Debug, Default)]
pub struct SpriteLibrary {
    animations: HashMap<StringId64, SpriteAnimation>,
}

#[derive(Deserialize)]
struct LibraryFile {
    animations: Vec<NamedAnimation>,
}

#[derive(Deserialize)]
struct NamedAnimation {
    name: String,
    #[serde(flatten)]
    animation: SpriteAnimation,
}

impl SpriteLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `{ "animations": [{ "name", "frames", "total_time" }] }`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: LibraryFile = serde_json::from_str(json)?;
        let mut library = Self::new();
        for entry in file.animations {
            library.insert(&entry.name, entry.animation);
        }
        Ok(library)
    }

    pub fn insert(&mut self, name: &str, animation: SpriteAnimation) -> Option<SpriteAnimation> {
        self.animations.insert(StringId64::new(name), animation)
    }

    /// Add every animation of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: SpriteLibrary) {
        self.animations.extend(other.animations);
    }

    pub fn remove(&mut self, name: &str) -> Option<SpriteAnimation> {
        self.animations.remove(&StringId64::new(name))
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }
}

impl AnimationSource for SpriteLibrary {
    fn animation(&self, name: StringId64) -> Option<&SpriteAnimation> {
        self.animations.get(&name)
    }
}
