use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuraError {
    #[error("Target not found in scope: {0}")]
    TargetNotFound(String),

    #[error("A rater may not target themselves")]
    SelfTarget,

    #[error("Points out of bounds: {0}")]
    OutOfBounds(String),

    #[error("Rating already recorded for this target in this scope")]
    DuplicateEdge,

    #[error("Lifetime budget exceeded: spent {spent}, requested {requested}")]
    BudgetExceeded { spent: i64, requested: i64 },

    #[error("Not a member of group {0}")]
    NotAMember(String),

    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Slot {0} is already claimed")]
    SlotTaken(usize),

    #[error("Slot index {0} is out of range")]
    OutOfRange(usize),

    #[error("Group is at capacity")]
    GroupFull,

    #[error("Already a member of this group")]
    AlreadyMember,

    #[error("Group is inactive")]
    GroupInactive,

    #[error("Content not found: {0}")]
    ContentNotFound(String),

    #[error("Identity not found: {0}")]
    IdentityNotFound(String),

    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AuraError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl AuraError {
    /// Stable machine-readable kind, used by the API layer and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TargetNotFound(_) => "target_not_found",
            Self::SelfTarget => "self_target",
            Self::OutOfBounds(_) => "out_of_bounds",
            Self::DuplicateEdge => "duplicate_edge",
            Self::BudgetExceeded { .. } => "budget_exceeded",
            Self::NotAMember(_) => "not_a_member",
            Self::GroupNotFound(_) => "group_not_found",
            Self::SlotTaken(_) => "slot_taken",
            Self::OutOfRange(_) => "out_of_range",
            Self::GroupFull => "group_full",
            Self::AlreadyMember => "already_member",
            Self::GroupInactive => "group_inactive",
            Self::ContentNotFound(_) => "content_not_found",
            Self::IdentityNotFound(_) => "identity_not_found",
            Self::InvalidScope(_) => "invalid_scope",
            Self::NotPermitted(_) => "not_permitted",
            Self::Storage(_) => "storage",
            Self::Serialization(_) => "serialization",
        }
    }
}

pub type Result<T> = std::result::Result<T, AuraError>;
