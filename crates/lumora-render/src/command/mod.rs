//! Deferred command recording.
//!
//! Each state category keeps a current value, a history of committed values
//! and a dirty bit. Pushing a value only marks the category dirty; `flush`
//! commits every dirty category as one [`Command`] whose `index` points into
//! that category's history. Draws are recorded after the state they depend
//! on, so replay can walk the list front to back.

mod history;
pub mod renderer2d;
pub mod renderer3d;

pub use history::StateHistory;
pub use renderer2d::{Command2DKind, CommandManager2D, ConstantBufferCommand, DrawCommand2D};
pub use renderer3d::{Command3DKind, CommandManager3D, DrawCommand3D, InputLayout3D, PhongMaterial};

use std::fmt::Debug;
use std::marker::PhantomData;

/// A command category, mapped to a unique bit.
pub trait CommandKind: Copy + Eq + Debug {
    /// Number of distinct bits used by this kind.
    const COUNT: u32;

    fn bit(self) -> u32;
}

/// One recorded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<K> {
    pub kind: K,
    pub index: u32,
}

impl<K> Command<K> {
    pub const fn new(kind: K, index: u32) -> Self {
        Self { kind, index }
    }
}

/// Dirty bits for up to 64 command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChanges<K> {
    bits: u64,
    _kind: PhantomData<K>,
}

impl<K: CommandKind> StateChanges<K> {
    pub const CAPACITY: u32 = u64::BITS;

    pub const fn new() -> Self {
        Self {
            bits: 0,
            _kind: PhantomData,
        }
    }

    pub fn has(&self, kind: K) -> bool {
        self.bits & (1 << kind.bit()) != 0
    }

    pub fn set(&mut self, kind: K) {
        self.bits |= 1 << kind.bit();
    }

    pub fn clear(&mut self, kind: K) {
        self.bits &= !(1 << kind.bit());
    }

    pub fn clear_all(&mut self) {
        self.bits = 0;
    }

    /// True if any category is pending.
    pub fn has_state_change(&self) -> bool {
        self.bits != 0
    }
}

impl<K: CommandKind> Default for StateChanges<K> {
    fn default() -> Self {
        Self::new()
    }
}
