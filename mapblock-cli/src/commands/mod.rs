//! Command implementations.

pub mod analyze;
pub mod common;
pub mod config;
pub mod edit;
pub mod inspect;
pub mod render;
