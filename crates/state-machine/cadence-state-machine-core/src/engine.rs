//! Engine: per-entity state machine records and the per-tick update.
//!
//! Methods:
//! - create / destroy records, trigger events, read and write variables
//! - update: apply inputs, then for every record pick the heaviest animation,
//!   advance time by `dt * speed`, emit the frame and handle the animation end

use std::sync::Arc;

use cadence_expr_core::{vm, Stack};
use hashbrown::HashMap;
use log::{debug, warn};

use crate::config::Config;
use crate::error::RuntimeError;
use crate::ids::{EntityId, StateId, StringId32, StringId64, VariableIndex, ANIMATION_END};
use crate::inputs::Inputs;
use crate::outputs::{FrameChange, MachineEvent, Outputs};
use crate::resource::{StateMachineResource, TransitionMode};
use crate::source::{AnimationSource, SpriteAnimation};

/// Result of delivering an event to a record.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The current state has no transition for the event.
    Ignored,
    /// Immediate transition taken.
    Switched(StateId),
    /// Wait-until-end transition recorded; the switch happens when the animation ends.
    Deferred(StateId),
}

#[derive(Debug)]
struct Record {
    entity: EntityId,
    resource: Arc<StateMachineResource>,
    state: StateId,
    pending: Option<StateId>,
    time: f32,
    active: Option<StringId64>,
    animation: SpriteAnimation,
    variables: Vec<f32>,
}

impl Record {
    fn new(entity: EntityId, resource: Arc<StateMachineResource>) -> Self {
        Self {
            entity,
            state: resource.initial_state(),
            variables: resource.default_values().to_vec(),
            resource,
            pending: None,
            time: 0.0,
            active: None,
            animation: SpriteAnimation::new(Vec::new(), 0.0),
        }
    }

    fn switch_to(&mut self, to: StateId, events: &mut Vec<MachineEvent>) {
        debug!("entity {:?}: state {:?} -> {:?}", self.entity, self.state, to);
        events.push(MachineEvent::StateChanged {
            entity: self.entity,
            from: self.state,
            to,
        });
        self.state = to;
    }

    fn fail(&self, events: &mut Vec<MachineEvent>, reason: String) {
        warn!("entity {:?}: {}", self.entity, reason);
        events.push(MachineEvent::EvaluationFailed {
            entity: self.entity,
            reason,
        });
    }

    fn fire(&mut self, event: StringId32, events: &mut Vec<MachineEvent>) -> TriggerOutcome {
        let Some(transition) = self
            .resource
            .state(self.state)
            .and_then(|state| state.transition(event).copied())
        else {
            return TriggerOutcome::Ignored;
        };
        match transition.mode {
            TransitionMode::Immediate => {
                self.pending = None;
                self.switch_to(transition.target, events);
                TriggerOutcome::Switched(transition.target)
            }
            TransitionMode::WaitUntilEnd => {
                self.pending = Some(transition.target);
                TriggerOutcome::Deferred(transition.target)
            }
        }
    }

    /// One tick. Returns the frame to display, if any.
    fn step(
        &mut self,
        dt: f32,
        stack: &mut Stack,
        source: &dyn AnimationSource,
        events: &mut Vec<MachineEvent>,
    ) -> Option<u32> {
        let resource = Arc::clone(&self.resource);
        let state = resource.state(self.state)?;

        // Heaviest animation wins; ties keep the first listed.
        let mut best: Option<(f32, StringId64)> = None;
        for entry in state.animations {
            match vm::eval(resource.program(entry.weight), &self.variables, stack) {
                Ok(weight) if weight.is_finite() => {
                    if best.map_or(true, |(top, _)| weight > top) {
                        best = Some((weight, entry.name));
                    }
                }
                Ok(weight) => self.fail(
                    events,
                    format!("weight of animation {:?} evaluated to {weight}", entry.name),
                ),
                Err(err) => {
                    self.fail(events, format!("weight of animation {:?}: {err}", entry.name))
                }
            }
        }
        let (_, name) = best?;

        if self.active != Some(name) {
            match source.animation(name).filter(|a| a.is_playable()) {
                Some(animation) => {
                    self.animation.clone_from(animation);
                    self.active = Some(name);
                    self.time = 0.0;
                }
                None => {
                    self.fail(events, format!("animation {name:?} is missing or empty"));
                    return None;
                }
            }
        }

        let speed = match vm::eval(resource.program(state.speed), &self.variables, stack) {
            Ok(speed) if speed.is_finite() => speed,
            Ok(speed) => {
                self.fail(events, format!("speed evaluated to {speed}"));
                0.0
            }
            Err(err) => {
                self.fail(events, format!("speed: {err}"));
                0.0
            }
        };
        self.time += dt * speed;

        let frame = if state.looping {
            self.animation.looping_frame_at(self.time)
        } else {
            self.animation.frame_at(self.time)
        };

        let total = self.animation.total_time;
        if self.time > total {
            if let Some(next) = self.pending.take() {
                self.switch_to(next, events);
                self.time = 0.0;
            } else if state.looping {
                self.time -= total;
                if self.time > total {
                    self.time %= total;
                }
            } else {
                match self.fire(ANIMATION_END, events) {
                    TriggerOutcome::Switched(_) => self.time = 0.0,
                    TriggerOutcome::Deferred(_) | TriggerOutcome::Ignored => self.time = total,
                }
            }
        }
        frame
    }
}

#[derive(Debug)]
pub struct Engine {
    cfg: Config,
    records: Vec<Record>,
    index: HashMap<EntityId, usize>,
    stack: Stack,
    outputs: Outputs,
    /// Events raised by API calls between ticks; published by the next update.
    backlog: Vec<MachineEvent>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Engine {
    pub fn new(cfg: Config) -> Self {
        Self {
            records: Vec::with_capacity(cfg.initial_capacity),
            index: HashMap::with_capacity(cfg.initial_capacity),
            stack: Stack::with_capacity(cfg.stack_capacity),
            outputs: Outputs::default(),
            backlog: Vec::new(),
            cfg,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Attach a state machine to `entity`, starting in the resource's initial state.
    /// An existing record for the entity is replaced.
    pub fn create(&mut self, entity: EntityId, resource: Arc<StateMachineResource>) {
        let record = Record::new(entity, resource);
        if let Some(&slot) = self.index.get(&entity) {
            warn!("entity {entity:?} already has a state machine; replacing it");
            self.records[slot] = record;
            return;
        }
        self.index.insert(entity, self.records.len());
        self.records.push(record);
        debug!("entity {entity:?}: state machine created");
    }

    /// Remove the record for `entity`. Returns false if there was none.
    pub fn destroy(&mut self, entity: EntityId) -> bool {
        let Some(slot) = self.index.remove(&entity) else {
            return false;
        };
        self.records.swap_remove(slot);
        if let Some(moved) = self.records.get(slot) {
            self.index.insert(moved.entity, slot);
        }
        debug!("entity {entity:?}: state machine destroyed");
        true
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.index.contains_key(&entity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record(&self, entity: EntityId) -> Result<&Record, RuntimeError> {
        self.index
            .get(&entity)
            .map(|&slot| &self.records[slot])
            .ok_or(RuntimeError::UnknownEntity(entity))
    }

    fn record_mut(&mut self, entity: EntityId) -> Result<&mut Record, RuntimeError> {
        let slot = *self
            .index
            .get(&entity)
            .ok_or(RuntimeError::UnknownEntity(entity))?;
        Ok(&mut self.records[slot])
    }

    /// Deliver `event` to the entity's current state.
    pub fn trigger(
        &mut self,
        entity: EntityId,
        event: impl Into<StringId32>,
    ) -> Result<TriggerOutcome, RuntimeError> {
        let event = event.into();
        let slot = *self
            .index
            .get(&entity)
            .ok_or(RuntimeError::UnknownEntity(entity))?;
        Ok(self.records[slot].fire(event, &mut self.backlog))
    }

    pub fn variable_index(&self, entity: EntityId, name: &str) -> Result<VariableIndex, RuntimeError> {
        self.record(entity)?
            .resource
            .variable_index(StringId32::new(name))
            .ok_or_else(|| RuntimeError::UnknownVariable(name.to_string()))
    }

    pub fn variable(&self, entity: EntityId, index: VariableIndex) -> Result<f32, RuntimeError> {
        let record = self.record(entity)?;
        record
            .variables
            .get(index.0 as usize)
            .copied()
            .ok_or(RuntimeError::VariableOutOfRange {
                index: index.0,
                count: record.variables.len(),
            })
    }

    pub fn set_variable(
        &mut self,
        entity: EntityId,
        index: VariableIndex,
        value: f32,
    ) -> Result<(), RuntimeError> {
        let record = self.record_mut(entity)?;
        let count = record.variables.len();
        let slot = record
            .variables
            .get_mut(index.0 as usize)
            .ok_or(RuntimeError::VariableOutOfRange {
                index: index.0,
                count,
            })?;
        *slot = value;
        Ok(())
    }

    pub fn current_state(&self, entity: EntityId) -> Option<StateId> {
        self.record(entity).ok().map(|r| r.state)
    }

    /// Target of a wait-until-end transition not yet taken.
    pub fn pending_state(&self, entity: EntityId) -> Option<StateId> {
        self.record(entity).ok().and_then(|r| r.pending)
    }

    /// Seconds into the active animation.
    pub fn elapsed(&self, entity: EntityId) -> Option<f32> {
        self.record(entity).ok().map(|r| r.time)
    }

    /// Name of the animation currently shown.
    pub fn active_animation(&self, entity: EntityId) -> Option<StringId64> {
        self.record(entity).ok().and_then(|r| r.active)
    }

    /// Apply `inputs`, then advance every record by `dt` seconds.
    ///
    /// Outputs are cleared at the start of each call.
    pub fn update(&mut self, dt: f32, inputs: Inputs, source: &dyn AnimationSource) -> &Outputs {
        self.outputs.clear();
        self.apply_inputs(inputs);
        self.outputs.events.append(&mut self.backlog);

        let Engine {
            cfg,
            records,
            stack,
            outputs,
            ..
        } = self;
        let mut dropped = 0usize;
        for record in records.iter_mut() {
            let Some(frame) = record.step(dt, stack, source, &mut outputs.events) else {
                continue;
            };
            if outputs.frames.len() < cfg.max_events_per_tick {
                outputs.frames.push(FrameChange {
                    entity: record.entity,
                    frame,
                });
            } else {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                "frame change limit {} reached; dropped {dropped} changes",
                cfg.max_events_per_tick
            );
        }
        &self.outputs
    }

    fn apply_inputs(&mut self, inputs: Inputs) {
        for entity in inputs.destroyed {
            if !self.destroy(entity) {
                debug!("destroy notice for {entity:?} without a state machine");
            }
        }
        for write in inputs.variables {
            if let Err(err) = self.set_variable(write.entity, write.index, write.value) {
                warn!("variable write skipped: {err}");
            }
        }
        for trigger in inputs.triggers {
            if let Err(err) = self.trigger(trigger.entity, trigger.event) {
                warn!("trigger {:?} skipped: {err}", trigger.event);
            }
        }
    }

    pub fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    /// Take this tick's frame changes, leaving the events in place.
    pub fn drain_frames(&mut self) -> std::vec::Drain<'_, FrameChange> {
        self.outputs.frames.drain(..)
    }
}
