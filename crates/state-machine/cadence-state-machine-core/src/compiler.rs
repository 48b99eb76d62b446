//! Offline compiler: descriptor in, binary resource out.

use cadence_expr_core::bytecode::MAX_VARIABLE_INDEX;
use cadence_expr_core::{compile, Environment, Word};
use hashbrown::{HashMap, HashSet};
use log::{debug, warn};

use crate::config::CompilerConfig;
use crate::descriptor::{StateDescriptor, StateMachineDescriptor};
use crate::error::BuildError;
use crate::ids::{StringId32, StringId64};
use crate::layout::{state_size, ByteWriter, Header, HEADER_SIZE, RESOURCE_VERSION};
use crate::resource::TransitionMode;

/// Parse `json` as a [`StateMachineDescriptor`] and compile it.
pub fn compile_state_machine_json(json: &str, cfg: &CompilerConfig) -> Result<Vec<u8>, BuildError> {
    let descriptor = StateMachineDescriptor::from_json(json)?;
    compile_state_machine(&descriptor, cfg)
}

struct CompiledTransition {
    event: StringId32,
    target: usize,
    mode: TransitionMode,
}

struct CompiledState {
    speed: u32,
    looping: bool,
    transitions: Vec<CompiledTransition>,
    animations: Vec<(StringId64, u32)>,
}

/// Byte-code blob shared by every program of one machine.
struct CodeBuffer<'a> {
    words: Vec<Word>,
    limit: usize,
    env: &'a Environment,
}

impl CodeBuffer<'_> {
    /// Compile `text` and append it, returning its word offset.
    fn push(&mut self, text: &str, context: impl FnOnce() -> String) -> Result<u32, BuildError> {
        let program = compile(text, self.env).map_err(|source| BuildError::Expression {
            context: context(),
            text: text.to_string(),
            source,
        })?;
        let offset = self.words.len();
        let needed = offset + program.len();
        if needed > self.limit {
            return Err(BuildError::ByteCodeCapacityExceeded {
                needed,
                limit: self.limit,
            });
        }
        self.words.extend_from_slice(program.words());
        Ok(offset as u32)
    }
}

/// Validate `descriptor` and lay it out as a version-1 resource.
pub fn compile_state_machine(
    descriptor: &StateMachineDescriptor,
    cfg: &CompilerConfig,
) -> Result<Vec<u8>, BuildError> {
    let state_index = validate(descriptor)?;
    let env = cfg.environment(descriptor.variables.iter().map(|v| v.name.as_str()));
    let mut code = CodeBuffer {
        words: Vec::new(),
        limit: cfg.max_byte_code_words,
        env: &env,
    };

    let mut states = Vec::with_capacity(descriptor.states.len());
    for state in &descriptor.states {
        states.push(compile_state(state, &state_index, &mut code)?);
    }

    let mut state_offsets = Vec::with_capacity(states.len());
    let mut cursor = HEADER_SIZE;
    for state in &states {
        state_offsets.push(cursor);
        cursor += state_size(state.transitions.len(), state.animations.len());
    }
    let variable_list_offset = cursor;
    let byte_code_offset = variable_list_offset + descriptor.variables.len() * 8;
    let total = byte_code_offset + code.words.len() * 4;
    if u32::try_from(total).is_err() {
        return Err(BuildError::ResourceTooLarge { size: total });
    }

    let mut out = ByteWriter::with_capacity(total);
    Header {
        version: RESOURCE_VERSION,
        initial_state_offset: state_offsets[state_index[descriptor.initial_state.as_str()]] as u32,
        variable_count: descriptor.variables.len() as u32,
        variable_list_offset: variable_list_offset as u32,
        byte_code_size: code.words.len() as u32,
        byte_code_offset: byte_code_offset as u32,
    }
    .write(&mut out);

    for state in &states {
        out.u32(state.speed);
        out.u32(state.looping as u32);
        out.u32(state.transitions.len() as u32);
        for transition in &state.transitions {
            out.u32(transition.event.0);
            out.u32(state_offsets[transition.target] as u32);
            out.u32(transition.mode.to_wire());
        }
        out.u32(state.animations.len() as u32);
        for (name, weight) in &state.animations {
            out.u64(name.0);
            out.u32(*weight);
            out.u32(0);
        }
    }
    for variable in &descriptor.variables {
        out.u32(StringId32::new(&variable.name).0);
    }
    for variable in &descriptor.variables {
        out.f32(variable.value);
    }
    for word in &code.words {
        out.u32(word.encode());
    }

    debug!(
        "compiled state machine: {} states, {} variables, {} byte-code words, {} bytes",
        states.len(),
        descriptor.variables.len(),
        code.words.len(),
        out.len()
    );
    Ok(out.into_inner())
}

fn compile_state(
    state: &StateDescriptor,
    state_index: &HashMap<&str, usize>,
    code: &mut CodeBuffer<'_>,
) -> Result<CompiledState, BuildError> {
    let speed = code.push(&state.speed, || format!("state `{}` speed", state.id))?;

    let transitions = state
        .transitions
        .iter()
        .map(|t| CompiledTransition {
            event: StringId32::new(&t.event),
            target: state_index[t.to.as_str()],
            mode: t.mode,
        })
        .collect();

    let mut animations = Vec::with_capacity(state.animations.len());
    for animation in &state.animations {
        let weight = code.push(&animation.weight, || {
            format!("state `{}` animation `{}` weight", state.id, animation.name)
        })?;
        animations.push((StringId64::new(&animation.name), weight));
    }

    Ok(CompiledState {
        speed,
        looping: state.looping,
        transitions,
        animations,
    })
}

/// Structural checks. Returns the index of every state id.
fn validate(descriptor: &StateMachineDescriptor) -> Result<HashMap<&str, usize>, BuildError> {
    if descriptor.states.is_empty() {
        return Err(BuildError::NoStates);
    }
    if descriptor.variables.len() > MAX_VARIABLE_INDEX as usize + 1 {
        return Err(BuildError::TooManyVariables {
            count: descriptor.variables.len(),
            max: MAX_VARIABLE_INDEX as usize + 1,
        });
    }

    let mut seen = HashSet::new();
    for variable in &descriptor.variables {
        if !seen.insert(variable.name.as_str()) {
            return Err(BuildError::DuplicateVariable(variable.name.clone()));
        }
    }

    let mut state_index = HashMap::with_capacity(descriptor.states.len());
    for (i, state) in descriptor.states.iter().enumerate() {
        if state_index.insert(state.id.as_str(), i).is_some() {
            return Err(BuildError::DuplicateState(state.id.clone()));
        }
    }
    if !state_index.contains_key(descriptor.initial_state.as_str()) {
        return Err(BuildError::UnknownInitialState(
            descriptor.initial_state.clone(),
        ));
    }

    for state in &descriptor.states {
        if state.animations.is_empty() {
            return Err(BuildError::NoAnimations(state.id.clone()));
        }
        let mut events = HashSet::new();
        for transition in &state.transitions {
            if !state_index.contains_key(transition.to.as_str()) {
                return Err(BuildError::UnknownTransitionTarget {
                    state: state.id.clone(),
                    event: transition.event.clone(),
                    target: transition.to.clone(),
                });
            }
            if !events.insert(transition.event.as_str()) {
                warn!(
                    "state `{}`: transition on `{}` shadowed by an earlier one",
                    state.id, transition.event
                );
            }
        }
    }
    Ok(state_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ByteReader;

    fn build(json: &str) -> Result<Vec<u8>, BuildError> {
        compile_state_machine_json(json, &CompilerConfig::default())
    }

    #[test]
    fn single_state_layout() {
        let bytes = build(
            r#"{ "initial_state": "a",
                 "states": [{ "id": "a", "animations": [{ "name": "clip", "weight": "1 + 1" }] }] }"#,
        )
        .unwrap();
        let mut reader = ByteReader::new(&bytes);
        let header = Header::read(&mut reader).unwrap();
        assert_eq!(header.version, RESOURCE_VERSION);
        assert_eq!(header.initial_state_offset, HEADER_SIZE as u32);
        assert_eq!(header.variable_count, 0);
        assert_eq!(header.variable_list_offset, (HEADER_SIZE + state_size(0, 1)) as u32);
        // "1" and "1 + 1" fold to one literal each
        assert_eq!(header.byte_code_size, 4);
        assert_eq!(bytes.len(), header.byte_code_offset as usize + 16);

        assert_eq!(reader.u32(), Ok(0)); // speed program
        assert_eq!(reader.u32(), Ok(0)); // not looping
        assert_eq!(reader.u32(), Ok(0)); // no transitions
        assert_eq!(reader.u32(), Ok(1));
        assert_eq!(reader.u64(), Ok(StringId64::new("clip").0));
        assert_eq!(reader.u32(), Ok(2)); // weight program
    }

    #[test]
    fn expression_errors_carry_context() {
        let err = build(
            r#"{ "initial_state": "a",
                 "states": [{ "id": "a", "animations": [{ "name": "walk", "weight": "spede * 2" }] }] }"#,
        )
        .unwrap_err();
        assert!(matches!(&err, BuildError::Expression { context, .. }
            if context == "state `a` animation `walk` weight"));
        let report = err.render();
        assert!(report.starts_with("Error: unknown identifier `spede`"));
        assert!(report.contains("state `a` animation `walk` weight:1:1"));
        assert!(report.contains("spede * 2"));
    }

    #[test]
    fn structural_errors() {
        assert!(matches!(
            build(r#"{ "initial_state": "a", "states": [] }"#),
            Err(BuildError::NoStates)
        ));
        assert!(matches!(
            build(r#"{ "initial_state": "x", "states": [{ "id": "a", "animations": [{ "name": "c" }] }] }"#),
            Err(BuildError::UnknownInitialState(id)) if id == "x"
        ));
        assert!(matches!(
            build(r#"{ "initial_state": "a", "states": [{ "id": "a" }] }"#),
            Err(BuildError::NoAnimations(id)) if id == "a"
        ));
        assert!(matches!(
            build(r#"{ "initial_state": "a", "states": [
                { "id": "a", "animations": [{ "name": "c" }] },
                { "id": "a", "animations": [{ "name": "c" }] }] }"#),
            Err(BuildError::DuplicateState(id)) if id == "a"
        ));
        assert!(matches!(
            build(r#"{ "initial_state": "a",
                       "variables": [{ "name": "v" }, { "name": "v" }],
                       "states": [{ "id": "a", "animations": [{ "name": "c" }] }] }"#),
            Err(BuildError::DuplicateVariable(name)) if name == "v"
        ));
        assert!(matches!(
            build(r#"{ "initial_state": "a", "states": [
                { "id": "a", "animations": [{ "name": "c" }],
                  "transitions": [{ "event": "go", "to": "nowhere" }] }] }"#),
            Err(BuildError::UnknownTransitionTarget { target, .. }) if target == "nowhere"
        ));
    }

    #[test]
    fn byte_code_budget_is_enforced() {
        let cfg = CompilerConfig {
            max_byte_code_words: 5,
            ..CompilerConfig::default()
        };
        let json = r#"{ "initial_state": "a",
            "variables": [{ "name": "v" }],
            "states": [{ "id": "a", "speed": "v * 2",
                         "animations": [{ "name": "c", "weight": "v + 1" }] }] }"#;
        // "v * 2" takes four words, "v + 1" four more
        assert!(matches!(
            compile_state_machine_json(json, &cfg),
            Err(BuildError::ByteCodeCapacityExceeded { needed: 8, limit: 5 })
        ));
    }
}
