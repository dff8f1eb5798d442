pub mod coordinator;
pub mod slot;

pub use coordinator::{WriteCoordinator, WriteOutcome};
pub use slot::{ReadingSlot, SlotPair};
