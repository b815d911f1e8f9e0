pub mod dimension;
pub mod error;
pub mod id;
pub mod rating;

pub use dimension::{Dimension, DimensionScores};
pub use error::{AuraError, Result};
pub use id::{ContentId, GroupId, RatingId, Scope, TargetRef, UserId};
pub use rating::{RatingEntry, BASE_AURA, LIFETIME_BUDGET, MAX_ABS_POINTS};
