//! # Encore Common Library
//!
//! Shared code for the Encore ranking subsystem including:
//! - Review and rating types
//! - Event types (RankEvent enum) and EventBus
//! - Common error types

pub mod error;
pub mod events;
pub mod review;

pub use error::{Error, Result};
pub use events::{EventBus, RankEvent};
pub use review::{Rating, ReviewItem};
