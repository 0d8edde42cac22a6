//! Common error types for Encore

use thiserror::Error;

/// Common result type for Encore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Encore ranking subsystem
#[derive(Error, Debug)]
pub enum Error {
    /// Rating string outside the three known buckets
    #[error("Unknown rating: {0}")]
    UnknownRating(String),

    /// Review id not present in any bucket
    #[error("Review not found: {0}")]
    ReviewNotFound(String),

    /// Review id already ranked in a bucket
    #[error("Review already ranked: {0}")]
    DuplicateReview(String),

    /// Comparison oracle failed or the prompt was dismissed
    #[error("Comparison failed: {0}")]
    Oracle(String),

    /// Oracle named a winner outside the compared pair
    #[error("Invalid comparison winner {winner_id} (compared {left_id} and {right_id})")]
    OracleResponse {
        /// Id the oracle claimed won
        winner_id: String,
        /// First compared review
        left_id: String,
        /// Second compared review
        right_id: String,
    },

    /// Manual order is not a permutation of the bucket contents
    #[error("Order mismatch: {0}")]
    OrderMismatch(String),
}
