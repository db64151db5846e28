//! Domain types shared across the crate.

pub mod config;
pub mod conversation;
pub mod document;
pub mod question;
