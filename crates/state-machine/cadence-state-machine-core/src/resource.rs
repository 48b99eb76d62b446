//! Loaded, validated state machine resource.
//!
//! [`StateMachineResource::from_bytes`] checks every offset, count and program
//! in the blob once. Afterwards the runtime navigates through index handles
//! and never touches raw offsets again.

use std::ops::Range;

use cadence_expr_core::{decode_words, Word};
use hashbrown::HashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ResourceError;
use crate::ids::{StateId, StringId32, StringId64, VariableIndex};
use crate::layout::{ByteReader, Header, HEADER_SIZE, RESOURCE_VERSION};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionMode {
    /// Switch as soon as the event fires.
    #[default]
    Immediate,
    /// Remember the target and switch when the current animation ends.
    WaitUntilEnd,
}

impl TransitionMode {
    pub fn to_wire(self) -> u32 {
        match self {
            TransitionMode::Immediate => 0,
            TransitionMode::WaitUntilEnd => 1,
        }
    }

    pub fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(TransitionMode::Immediate),
            1 => Some(TransitionMode::WaitUntilEnd),
            _ => None,
        }
    }
}

/// Word offset of a program inside the byte-code region.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProgramOffset(pub u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub event: StringId32,
    pub target: StateId,
    pub mode: TransitionMode,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnimationEntry {
    pub name: StringId64,
    pub weight: ProgramOffset,
}

/// Borrowed view of one state.
#[derive(Copy, Clone, Debug)]
pub struct State<'a> {
    pub id: StateId,
    pub speed: ProgramOffset,
    pub looping: bool,
    pub transitions: &'a [Transition],
    pub animations: &'a [AnimationEntry],
}

impl State<'_> {
    /// First transition listening for `event`.
    pub fn transition(&self, event: StringId32) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.event == event)
    }
}

#[derive(Clone, Debug)]
struct StateRecord {
    offset: u32,
    speed: ProgramOffset,
    looping: bool,
    transitions: Range<usize>,
    animations: Range<usize>,
}

#[derive(Clone, Debug)]
pub struct StateMachineResource {
    bytes: Vec<u8>,
    header: Header,
    initial: StateId,
    states: Vec<StateRecord>,
    transitions: Vec<Transition>,
    animations: Vec<AnimationEntry>,
    variable_names: Vec<StringId32>,
    default_values: Vec<f32>,
    byte_code: Vec<Word>,
}

struct RawTransition {
    event: StringId32,
    target_offset: u32,
    mode: TransitionMode,
}

impl StateMachineResource {
    /// Validate and index a compiled resource.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ResourceError> {
        let header = Header::read(&mut ByteReader::new(&bytes))?;
        if header.version != RESOURCE_VERSION {
            return Err(ResourceError::UnsupportedVersion {
                found: header.version,
                expected: RESOURCE_VERSION,
            });
        }

        let variable_count = header.variable_count as usize;
        let variable_start = header.variable_list_offset as usize;
        let variable_end = region_end(&bytes, "variable list", variable_start, variable_count, 8)?;
        let code_start = header.byte_code_offset as usize;
        let code_size = header.byte_code_size as usize;
        region_end(&bytes, "byte code", code_start, code_size, 4)?;
        if variable_start < HEADER_SIZE {
            return Err(ResourceError::OutOfBounds {
                what: "variable list",
                offset: variable_start,
            });
        }
        if code_start < variable_end {
            return Err(ResourceError::OutOfBounds {
                what: "byte code",
                offset: code_start,
            });
        }

        // States occupy [HEADER_SIZE, variable_list_offset).
        let state_region = &bytes[..variable_start];
        let mut reader = ByteReader::at(state_region, HEADER_SIZE);
        let mut states = Vec::new();
        let mut raw_transitions = Vec::new();
        let mut animations = Vec::new();
        let mut by_offset: HashMap<u32, StateId> = HashMap::new();

        while reader.remaining() > 0 {
            let offset = reader.pos() as u32;
            let speed = ProgramOffset(reader.u32()?);
            let looping = reader.u32()? != 0;

            let transition_count = reader.u32()? as usize;
            let first_transition = raw_transitions.len();
            for _ in 0..transition_count {
                let event = StringId32(reader.u32()?);
                let target_offset = reader.u32()?;
                let raw_mode = reader.u32()?;
                let mode = TransitionMode::from_wire(raw_mode).ok_or(
                    ResourceError::UnknownTransitionMode {
                        mode: raw_mode,
                        state_offset: offset,
                    },
                )?;
                raw_transitions.push(RawTransition {
                    event,
                    target_offset,
                    mode,
                });
            }

            let animation_count = reader.u32()? as usize;
            if animation_count == 0 {
                return Err(ResourceError::EmptyState {
                    state_offset: offset,
                });
            }
            let first_animation = animations.len();
            for _ in 0..animation_count {
                let name = StringId64(reader.u64()?);
                let weight = ProgramOffset(reader.u32()?);
                let _pad = reader.u32()?;
                animations.push(AnimationEntry { name, weight });
            }

            by_offset.insert(offset, StateId(states.len() as u32));
            states.push(StateRecord {
                offset,
                speed,
                looping,
                transitions: first_transition..raw_transitions.len(),
                animations: first_animation..animations.len(),
            });
        }
        if states.is_empty() {
            return Err(ResourceError::NoStates);
        }

        let resolve = |referrer: &'static str, offset: u32| {
            by_offset
                .get(&offset)
                .copied()
                .ok_or(ResourceError::NotAState { referrer, offset })
        };
        let initial = resolve("initial state", header.initial_state_offset)?;
        let transitions = raw_transitions
            .iter()
            .map(|raw| {
                Ok(Transition {
                    event: raw.event,
                    target: resolve("transition", raw.target_offset)?,
                    mode: raw.mode,
                })
            })
            .collect::<Result<Vec<_>, ResourceError>>()?;

        let mut reader = ByteReader::at(&bytes, variable_start);
        let variable_names = (0..variable_count)
            .map(|_| reader.u32().map(StringId32))
            .collect::<Result<Vec<_>, _>>()?;
        let default_values = (0..variable_count)
            .map(|_| reader.f32())
            .collect::<Result<Vec<_>, _>>()?;

        let mut reader = ByteReader::at(&bytes, code_start);
        let raw_code = (0..code_size)
            .map(|_| reader.u32())
            .collect::<Result<Vec<_>, _>>()?;
        let byte_code = decode_words(&raw_code)
            .map_err(|(index, source)| ResourceError::ByteCode { index, source })?;

        let resource = StateMachineResource {
            bytes,
            header,
            initial,
            states,
            transitions,
            animations,
            variable_names,
            default_values,
            byte_code,
        };
        for state in &resource.states {
            resource.check_program(state.speed)?;
        }
        for animation in &resource.animations {
            resource.check_program(animation.weight)?;
        }
        debug!(
            "loaded state machine: {} states, {} variables, {} byte-code words",
            resource.states.len(),
            resource.variable_names.len(),
            resource.byte_code.len()
        );
        Ok(resource)
    }

    /// Every program must end, read only declared variables and leave one value.
    fn check_program(&self, offset: ProgramOffset) -> Result<(), ResourceError> {
        let start = offset.0 as usize;
        let code = self
            .byte_code
            .get(start..)
            .filter(|code| !code.is_empty())
            .ok_or(ResourceError::ProgramOutOfBounds {
                offset: offset.0,
                size: self.byte_code.len(),
            })?;
        let mut depth: usize = 0;
        for word in code {
            match *word {
                Word::Literal(_) => depth += 1,
                Word::PushVariable(index) => {
                    if index as usize >= self.variable_names.len() {
                        return Err(ResourceError::VariableOutOfRange {
                            offset: offset.0,
                            index,
                            count: self.variable_names.len(),
                        });
                    }
                    depth += 1;
                }
                Word::Call(op) => {
                    depth = depth
                        .checked_sub(op.arity())
                        .ok_or(ResourceError::MalformedProgram { offset: offset.0 })?;
                    if op.produces_value() {
                        depth += 1;
                    }
                }
                Word::End => {
                    return if depth == 1 {
                        Ok(())
                    } else {
                        Err(ResourceError::MalformedProgram { offset: offset.0 })
                    };
                }
            }
        }
        Err(ResourceError::UnterminatedProgram { offset: offset.0 })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn initial_state(&self) -> StateId {
        self.initial
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> Option<State<'_>> {
        let record = self.states.get(id.0 as usize)?;
        Some(State {
            id,
            speed: record.speed,
            looping: record.looping,
            transitions: &self.transitions[record.transitions.clone()],
            animations: &self.animations[record.animations.clone()],
        })
    }

    /// Byte offset of a state's record inside the blob.
    pub fn state_offset(&self, id: StateId) -> Option<u32> {
        self.states.get(id.0 as usize).map(|record| record.offset)
    }

    pub fn states(&self) -> impl Iterator<Item = State<'_>> + '_ {
        (0..self.states.len() as u32).filter_map(move |i| self.state(StateId(i)))
    }

    /// Program starting at `offset`; runs up to its `End` word.
    pub fn program(&self, offset: ProgramOffset) -> &[Word] {
        self.byte_code.get(offset.0 as usize..).unwrap_or(&[])
    }

    pub fn byte_code(&self) -> &[Word] {
        &self.byte_code
    }

    pub fn variable_count(&self) -> usize {
        self.variable_names.len()
    }

    pub fn variable_names(&self) -> &[StringId32] {
        &self.variable_names
    }

    pub fn default_values(&self) -> &[f32] {
        &self.default_values
    }

    pub fn variable_index(&self, name: StringId32) -> Option<VariableIndex> {
        self.variable_names
            .iter()
            .position(|candidate| *candidate == name)
            .map(|i| VariableIndex(i as u32))
    }
}

fn region_end(
    bytes: &[u8],
    what: &'static str,
    start: usize,
    count: usize,
    stride: usize,
) -> Result<usize, ResourceError> {
    count
        .checked_mul(stride)
        .and_then(|len| start.checked_add(len))
        .filter(|end| *end <= bytes.len())
        .ok_or(ResourceError::OutOfBounds {
            what,
            offset: start,
        })
}
