pub mod identity;
pub mod storage;

pub use identity::{Identity, IdentityManager, Visibility, VisibilityPrefs};
pub use storage::{IdentityStorage, MemoryIdentityStorage};
