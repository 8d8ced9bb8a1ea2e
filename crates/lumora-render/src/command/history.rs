use super::{Command, CommandKind, StateChanges};

/// Current value and committed history of one state category.
///
/// The history is never empty: index 0 holds the value the frame started
/// with, and after every flush the last entry equals `current`.
#[derive(Debug, Clone)]
pub struct StateHistory<T> {
    values: Vec<T>,
    current: T,
}

impl<T: Clone + PartialEq> StateHistory<T> {
    pub fn new(initial: T) -> Self {
        Self {
            values: vec![initial.clone()],
            current: initial,
        }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    /// Most recently committed value.
    pub fn last(&self) -> &T {
        // `values` always holds at least the frame's starting value.
        &self.values[self.values.len() - 1]
    }

    pub fn get(&self, index: u32) -> Option<&T> {
        self.values.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Coalescing push.
    ///
    /// Returns `true` if `value` is now pending as a change, which is when the
    /// caller must pin any resource it refers to.
    pub fn push<K: CommandKind>(&mut self, value: T, kind: K, changes: &mut StateChanges<K>) -> bool {
        if !changes.has(kind) {
            if value != self.current {
                self.current = value;
                changes.set(kind);
                return true;
            }
            false
        } else if value == *self.last() {
            self.current = value;
            changes.clear(kind);
            false
        } else {
            self.current = value;
            true
        }
    }

    /// Append `current` and return its index.
    pub fn commit(&mut self) -> u32 {
        self.values.push(self.current.clone());
        (self.values.len() - 1) as u32
    }

    /// If `kind` is dirty, commit and record a command pointing at the new entry.
    pub fn commit_into<K: CommandKind>(
        &mut self,
        kind: K,
        changes: &StateChanges<K>,
        commands: &mut Vec<Command<K>>,
    ) {
        if changes.has(kind) {
            let index = self.commit();
            commands.push(Command::new(kind, index));
        }
    }

    /// Start a new frame from the current value.
    pub fn reset(&mut self) {
        self.values.clear();
        self.values.push(self.current.clone());
    }

    /// Start a new frame from `value`.
    pub fn reset_to(&mut self, value: T) {
        self.values.clear();
        self.values.push(value.clone());
        self.current = value;
    }
}
