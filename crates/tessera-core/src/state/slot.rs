//! Per-attribute load state

use crate::model::Value;

/// Observable state of one attribute slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never loaded nor assigned
    Unavailable,
    /// Holds the last value read from storage
    Loaded,
    /// Holds a local assignment not yet persisted
    Dirty,
}

/// Storage of a regular (non-counter) attribute
///
/// A dirty slot always shadows storage: merges never overwrite it, and it
/// only returns to `Loaded` when the exact value it holds was persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AttributeSlot {
    #[default]
    Unavailable,
    Loaded(Value),
    Dirty(Value),
}

impl AttributeSlot {
    pub fn state(&self) -> SlotState {
        match self {
            AttributeSlot::Unavailable => SlotState::Unavailable,
            AttributeSlot::Loaded(_) => SlotState::Loaded,
            AttributeSlot::Dirty(_) => SlotState::Dirty,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            AttributeSlot::Unavailable => None,
            AttributeSlot::Loaded(v) | AttributeSlot::Dirty(v) => Some(v),
        }
    }

    pub fn assign(&mut self, value: Value) {
        *self = AttributeSlot::Dirty(value);
    }

    /// Take a storage value unless a local assignment is pending
    pub fn merge_loaded(&mut self, value: Value) {
        if !matches!(self, AttributeSlot::Dirty(_)) {
            *self = AttributeSlot::Loaded(value);
        }
    }

    /// Mark `written` as persisted; a slot reassigned since keeps its dirt
    pub fn commit_if(&mut self, written: &Value) {
        if let AttributeSlot::Dirty(current) = self {
            if current == written {
                *self = AttributeSlot::Loaded(written.clone());
            }
        }
    }
}

/// Storage of an increment-only counter
///
/// The read value is the last loaded base plus the locally pending delta.
/// Loads refresh the base without touching the delta.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterSlot {
    base: Option<i64>,
    pending: i64,
}

impl CounterSlot {
    pub fn state(&self) -> SlotState {
        if self.pending != 0 {
            SlotState::Dirty
        } else if self.base.is_some() {
            SlotState::Loaded
        } else {
            SlotState::Unavailable
        }
    }

    /// Whether the stored base has been loaded
    pub fn is_known(&self) -> bool {
        self.base.is_some()
    }

    /// Current value; `None` while the base is unknown or when base plus
    /// pending does not fit in an `i64`
    pub fn value(&self) -> Option<i64> {
        self.base.and_then(|base| base.checked_add(self.pending))
    }

    pub fn pending(&self) -> i64 {
        self.pending
    }

    /// Add to the pending delta, returning the new delta
    ///
    /// `None` on overflow, with the slot left unchanged.
    pub fn increment(&mut self, by: i64) -> Option<i64> {
        self.pending = self.pending.checked_add(by)?;
        Some(self.pending)
    }

    /// Null in storage means the counter was never incremented
    pub fn merge_loaded(&mut self, value: &Value) {
        self.base = Some(value.as_int().unwrap_or(0));
    }

    /// Fold `delta` of the pending amount into the base after it was persisted
    ///
    /// A base that would overflow is dropped and reads as unknown until the
    /// next load.
    pub fn commit(&mut self, delta: i64) {
        self.base = self.base.and_then(|base| base.checked_add(delta));
        self.pending = self.pending.saturating_sub(delta);
    }
}

/// One attribute position of an instance
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    Value(AttributeSlot),
    Counter(CounterSlot),
}

impl Slot {
    pub fn state(&self) -> SlotState {
        match self {
            Slot::Value(slot) => slot.state(),
            Slot::Counter(slot) => slot.state(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.state() == SlotState::Dirty
    }

    pub fn merge_loaded(&mut self, value: Value) {
        match self {
            Slot::Value(slot) => slot.merge_loaded(value),
            Slot::Counter(slot) => slot.merge_loaded(&value),
        }
    }
}
