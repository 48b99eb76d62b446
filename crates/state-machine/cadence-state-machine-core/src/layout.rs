//! Binary layout of a compiled state machine.
//!
//! All fields are little-endian 32-bit words except animation names (64-bit).
//!
//! ```text
//! header      version, initial_state_offset, variable_count,
//!             variable_list_offset, byte_code_size, byte_code_offset
//! states      speed, loop, transition_count, transitions[event, target_offset, mode],
//!             animation_count, animations[name:u64, weight, pad]
//! variables   name hashes[variable_count], default values[variable_count]
//! byte code   words[byte_code_size]
//! ```
//!
//! State and variable offsets are byte offsets from the start of the resource.
//! `speed` and `weight` are word offsets into the byte-code region.

use crate::error::ResourceError;

pub const RESOURCE_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 24;
pub const TRANSITION_SIZE: usize = 12;
pub const ANIMATION_SIZE: usize = 16;
/// speed, loop, transition_count and animation_count.
pub const STATE_FIXED_SIZE: usize = 16;

pub fn state_size(transitions: usize, animations: usize) -> usize {
    STATE_FIXED_SIZE + transitions * TRANSITION_SIZE + animations * ANIMATION_SIZE
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub initial_state_offset: u32,
    pub variable_count: u32,
    pub variable_list_offset: u32,
    pub byte_code_size: u32,
    pub byte_code_offset: u32,
}

impl Header {
    pub fn write(&self, out: &mut ByteWriter) {
        out.u32(self.version);
        out.u32(self.initial_state_offset);
        out.u32(self.variable_count);
        out.u32(self.variable_list_offset);
        out.u32(self.byte_code_size);
        out.u32(self.byte_code_offset);
    }

    pub fn read(reader: &mut ByteReader<'_>) -> Result<Header, ResourceError> {
        Ok(Header {
            version: reader.u32()?,
            initial_state_offset: reader.u32()?,
            variable_count: reader.u32()?,
            variable_list_offset: reader.u32()?,
            byte_code_size: reader.u32()?,
            byte_code_offset: reader.u32()?,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor. Reads past the end report [`ResourceError::Truncated`].
#[derive(Clone, Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn at(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], ResourceError> {
        let truncated = ResourceError::Truncated {
            offset: self.pos,
            needed: N,
        };
        let end = self.pos.checked_add(N).ok_or(truncated.clone())?;
        let chunk = self.bytes.get(self.pos..end).ok_or(truncated.clone())?;
        let array: [u8; N] = chunk.try_into().map_err(|_| truncated)?;
        self.pos = end;
        Ok(array)
    }

    pub fn u32(&mut self) -> Result<u32, ResourceError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    pub fn u64(&mut self) -> Result<u64, ResourceError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    pub fn f32(&mut self) -> Result<f32, ResourceError> {
        self.take::<4>().map(f32::from_le_bytes)
    }
}
