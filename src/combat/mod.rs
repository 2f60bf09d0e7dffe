pub mod hit_detection;
pub mod hitscan;
pub mod melee;
pub mod position_history;
