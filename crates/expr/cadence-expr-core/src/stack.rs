//! Fixed-capacity operand stack.
//!
//! The same stack type backs constant folding in the compiler and evaluation in
//! the VM. Capacity is a hard limit: pushing past it or popping an empty stack
//! returns a [`StackError`] instead of growing or panicking.

use crate::error::StackError;

/// Capacity used by callers that have no better estimate.
pub const DEFAULT_STACK_CAPACITY: usize = 32;

#[derive(Clone, Debug)]
pub struct Stack {
    items: Vec<f32>,
    capacity: usize,
}

impl Stack {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[inline]
    pub fn push(&mut self, value: f32) -> Result<(), StackError> {
        if self.items.len() >= self.capacity {
            return Err(StackError::Overflow {
                capacity: self.capacity,
            });
        }
        self.items.push(value);
        Ok(())
    }

    #[inline]
    pub fn pop(&mut self) -> Result<f32, StackError> {
        self.items.pop().ok_or(StackError::Underflow)
    }

    #[inline]
    pub fn top(&self) -> Option<f32> {
        self.items.last().copied()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.items.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.items
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_STACK_CAPACITY)
    }
}
