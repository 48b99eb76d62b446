//! Cadence state machine core (engine-agnostic).
//!
//! Two halves share the binary resource format in [`layout`]:
//! - the offline [`compiler`] turns a JSON [`descriptor`] into a compact blob
//!   whose weight and speed expressions are pre-compiled byte code;
//! - the runtime [`engine`] loads that blob as a [`StateMachineResource`] and,
//!   once per tick, picks each entity's animation, advances its time and
//!   reports the sprite frame to display.
//!
//! ```
//! use std::sync::Arc;
//! use cadence_state_machine_core::*;
//!
//! let json = r#"{
//!     "initial_state": "idle",
//!     "states": [{ "id": "idle", "loop": true,
//!                  "animations": [{ "name": "hero/idle", "weight": "1" }] }]
//! }"#;
//! let bytes = compile_state_machine_json(json, &CompilerConfig::default()).unwrap();
//! let resource = Arc::new(StateMachineResource::from_bytes(bytes).unwrap());
//!
//! let mut sprites = SpriteLibrary::new();
//! sprites.insert("hero/idle", SpriteAnimation::new(vec![0, 1, 2, 3], 1.0));
//!
//! let mut engine = Engine::default();
//! engine.create(EntityId(1), resource);
//! let out = engine.update(0.5, Inputs::default(), &sprites);
//! assert_eq!(out.frame_of(EntityId(1)), Some(2));
//! ```

pub mod compiler;
pub mod config;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod ids;
pub mod inputs;
pub mod layout;
pub mod outputs;
pub mod resource;
pub mod source;

pub use compiler::{compile_state_machine, compile_state_machine_json};
pub use config::{CompilerConfig, Config};
pub use descriptor::{
    AnimationDescriptor, StateDescriptor, StateMachineDescriptor, TransitionDescriptor,
    VariableDescriptor,
};
pub use engine::{Engine, TriggerOutcome};
pub use error::{BuildError, ResourceError, RuntimeError};
pub use ids::{EntityId, StateId, StringId32, StringId64, VariableIndex, ANIMATION_END};
pub use inputs::{Inputs, Trigger, VariableWrite};
pub use outputs::{FrameChange, MachineEvent, Outputs};
pub use resource::{AnimationEntry, ProgramOffset, State, StateMachineResource, Transition, TransitionMode};
pub use source::{AnimationSource, SpriteAnimation, SpriteLibrary};
