mod aisov;
pub mod scorer;

pub use aisov::{compute_score, round4, ScoreGroup};
pub use scorer::{compute_all_scores, ScorePeriod};
