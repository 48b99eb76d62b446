use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, StringId32, VariableIndex};

/// Per-tick commands applied at the start of [`Engine::update`](crate::engine::Engine::update),
/// in field order: destroy notices, then variable writes, then triggers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Inputs {
    #[serde(default)]
    pub destroyed: Vec<EntityId>,
    #[serde(default)]
    pub variables: Vec<VariableWrite>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableWrite {
    pub entity: EntityId,
    pub index: VariableIndex,
    pub value: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub entity: EntityId,
    pub event: StringId32,
}

impl Inputs {
    pub fn destroy(mut self, entity: EntityId) -> Self {
        self.destroyed.push(entity);
        self
    }

    pub fn set_variable(mut self, entity: EntityId, index: VariableIndex, value: f32) -> Self {
        self.variables.push(VariableWrite {
            entity,
            index,
            value,
        });
        self
    }

    pub fn trigger(mut self, entity: EntityId, event: impl Into<StringId32>) -> Self {
        self.triggers.push(Trigger {
            entity,
            event: event.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.destroyed.is_empty() && self.variables.is_empty() && self.triggers.is_empty()
    }
}
