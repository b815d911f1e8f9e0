pub mod counter;
pub mod storage;

pub use counter::{Adjustment, ContentItem, CounterManager, COUNTER_MAX, COUNTER_MIN, COUNTER_STEP};
pub use storage::{CounterRecord, CounterStorage, MemoryCounterStorage};
