//! # Encore Ranking Engine (encore-rank)
//!
//! Interactive pairwise-comparison ranking for concert reviews.
//!
//! **Purpose:** Maintain a user's personally ordered review list inside
//! three qualitative buckets (good/okay/bad), asking the user to pick
//! between two shows only when an ordering decision is actually needed,
//! and converging with the minimum number of such prompts.
//!
//! **Architecture:** One in-memory engine per user session. Ordering
//! decisions flow through an injected async comparison oracle — a modal
//! prompt in production, a channel-backed answerer for UIs, a scripted
//! fixture in tests. The engine never derives order from a stored score.

pub mod engine;
pub mod oracle;
pub mod sessions;

pub use engine::{MoveDirection, RankingEngine, Rankings};
pub use oracle::{
    ChannelOracle, Comparison, ComparisonOracle, ComparisonRequest, ScriptedOracle,
};
pub use sessions::SessionRegistry;
