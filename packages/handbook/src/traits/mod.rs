//! Core trait abstractions.
//!
//! Applications implement these to provide storage, models, fetching,
//! conversation history and time.

pub mod ai;
pub mod clock;
pub mod fetcher;
pub mod history;
pub mod search;
pub mod store;
