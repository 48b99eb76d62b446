use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, StateId};

/// Sprite frame an entity should display after this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameChange {
    pub entity: EntityId,
    pub frame: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MachineEvent {
    StateChanged {
        entity: EntityId,
        from: StateId,
        to: StateId,
    },
    /// An expression or animation lookup failed; the record degraded instead of stopping.
    EvaluationFailed { entity: EntityId, reason: String },
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    pub frames: Vec<FrameChange>,
    pub events: Vec<MachineEvent>,
}

impl Outputs {
    pub fn clear(&mut self) {
        self.frames.clear();
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty() && self.events.is_empty()
    }

    /// Latest frame reported for `entity` this tick.
    pub fn frame_of(&self, entity: EntityId) -> Option<u32> {
        self.frames
            .iter()
            .rev()
            .find(|change| change.entity == entity)
            .map(|change| change.frame)
    }
}
