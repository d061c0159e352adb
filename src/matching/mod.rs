//! Matching module containing the scoring engine and confirmation flow

pub mod engine;
pub mod score;

pub use engine::*;
pub use score::*;
