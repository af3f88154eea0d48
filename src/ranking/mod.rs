//! Document ranking and report rendering.

mod report;

pub use report::{DocScore, RankingManager};
