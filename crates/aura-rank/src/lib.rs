pub mod cache;
pub mod engine;
pub mod reduce;

pub use cache::{LeaderboardCache, LEADERBOARD_TTL_SECS};
pub use engine::{GlobalBoard, GlobalStats, GroupResults, LeaderboardRow, LeaderboardView, RankEngine};
pub use reduce::{assign_ranks, by_dimension, reduce, Standing, Totals};
