pub mod closure;
pub mod group;
pub mod manager;
pub mod storage;

pub use closure::{evaluate, ClosureReason, ClosureStatus};
pub use group::{GroupSession, Participant, Slot};
pub use manager::{ClaimOutcome, CreateGroup, GroupManager};
pub use storage::{GroupStorage, MemoryGroupStorage};
