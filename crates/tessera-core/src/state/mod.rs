//! Instance state: attribute slots, instances and record handles

pub mod instance;
pub mod slot;

pub use instance::{Instance, PendingWrite, Record};
pub use slot::{AttributeSlot, CounterSlot, Slot, SlotState};
