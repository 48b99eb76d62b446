//! Human-authored state machine description, the input of the offline compiler.
//!
//! ```json
//! {
//!   "initial_state": "idle",
//!   "variables": [{ "name": "speed", "value": 0 }],
//!   "states": [
//!     {
//!       "id": "idle",
//!       "loop": true,
//!       "animations": [{ "name": "hero/idle", "weight": "1" }],
//!       "transitions": [{ "event": "jump", "to": "jump", "mode": "immediate" }]
//!     }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::BuildError;
use crate::resource::TransitionMode;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateMachineDescriptor {
    pub initial_state: String,
    #[serde(default)]
    pub variables: Vec<VariableDescriptor>,
    pub states: Vec<StateDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
    pub name: String,
    #[serde(default)]
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDescriptor {
    /// Key referenced by `initial_state` and transition targets.
    pub id: String,
    /// Display name for tooling; not compiled.
    #[serde(default)]
    pub name: String,
    /// Playback speed expression.
    #[serde(default = "unit_expression")]
    pub speed: String,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub animations: Vec<AnimationDescriptor>,
    #[serde(default)]
    pub transitions: Vec<TransitionDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationDescriptor {
    /// Sprite animation resource name.
    pub name: String,
    /// Blend weight expression.
    #[serde(default = "unit_expression")]
    pub weight: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionDescriptor {
    pub event: String,
    pub to: String,
    #[serde(default)]
    pub mode: TransitionMode,
}

fn unit_expression() -> String {
    "1".to_string()
}

impl StateMachineDescriptor {
    pub fn from_json(json: &str) -> Result<Self, BuildError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, BuildError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
