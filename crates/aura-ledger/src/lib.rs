pub mod ledger;
pub mod storage;

pub use ledger::{LedgerManager, LedgerStats, TargetResolver};
pub use storage::{LedgerStorage, MemoryLedgerStorage};
