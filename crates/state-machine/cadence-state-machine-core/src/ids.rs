//! Identifiers and stable name hashes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque entity handle supplied by the host's entity system.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Index of a state inside one loaded [`StateMachineResource`](crate::resource::StateMachineResource).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StateId(pub u32);

/// Position of a variable in a state machine's variable list.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct VariableIndex(pub u32);

/// 32-bit FNV-1a hash of a name. Used for events and variable names.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StringId32(pub u32);

/// 64-bit FNV-1a hash of a name. Used for animation resource names.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct StringId64(pub u64);

impl StringId32 {
    pub const fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u32 = 0x811c_9dc5;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(0x0100_0193);
            i += 1;
        }
        Self(hash)
    }
}

impl StringId64 {
    pub const fn new(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
            i += 1;
        }
        Self(hash)
    }
}

impl From<&str> for StringId32 {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<&str> for StringId64 {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for StringId32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:08x}", self.0)
    }
}

impl fmt::Debug for StringId64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}

/// Event fired implicitly when a non-looping state's animation runs out.
pub const ANIMATION_END: StringId32 = StringId32::new("animation_end");
