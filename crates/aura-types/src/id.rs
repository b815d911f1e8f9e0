use blake3::Hasher;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Durable external identity id, assigned by the auth collaborator.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

/// The namespace a rating belongs to: a specific group, or the sentinel
/// direct/peer scope outside any group.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Direct,
    Group { group_id: GroupId },
}

impl Scope {
    pub fn group(group_id: GroupId) -> Self {
        Self::Group { group_id }
    }

    pub fn group_id(&self) -> Option<&GroupId> {
        match self {
            Self::Direct => None,
            Self::Group { group_id } => Some(group_id),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Group { group_id } => write!(f, "group:{}", group_id),
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self)
    }
}

/// What a rating points at: a real identity, or a synthetic placeholder for
/// an unclaimed slot. The slot variant is deterministic, derived from the
/// scope plus slot index, so ledger entries written before a claim can be
/// found and rewritten afterwards without a lookup table.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetRef {
    User { user_id: UserId },
    Slot { scope: Scope, index: usize },
}

impl TargetRef {
    pub fn user(user_id: UserId) -> Self {
        Self::User { user_id }
    }

    pub fn slot(scope: Scope, index: usize) -> Self {
        Self::Slot { scope, index }
    }

    pub fn as_user(&self) -> Option<&UserId> {
        match self {
            Self::User { user_id } => Some(user_id),
            Self::Slot { .. } => None,
        }
    }

    pub fn is_slot(&self) -> bool {
        matches!(self, Self::Slot { .. })
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { user_id } => write!(f, "user:{}", user_id),
            Self::Slot { scope, index } => write!(f, "slot:{}:{}", scope, index),
        }
    }
}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetRef({})", self)
    }
}

/// Identifies the edge `(scope, from, target)` of the reputation graph.
///
/// Derived content-addressably, so the at-most-one-edge-per-pair rule is an
/// equality check on ids and a migrated entry's id can be re-derived from
/// its rewritten target.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatingId([u8; 32]);

impl RatingId {
    pub fn derive(scope: &Scope, from: &UserId, target: &TargetRef) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(scope.to_string().as_bytes());
        hasher.update(b"\x00");
        hasher.update(from.as_str().as_bytes());
        hasher.update(b"\x00");
        hasher.update(target.to_string().as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for RatingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RatingId({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for RatingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
