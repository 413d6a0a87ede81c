//! Overwrite engine
//!
//! - [`strategy`]: which bytes each pass writes
//! - [`wiper`]: applying a pass plan to a single file

pub mod strategy;
pub mod wiper;

pub use strategy::{
    OsRandom, PassPattern, PassPlan, RandomSource, WipeMethod, CHUNK_SIZE, SECURE_PASSES,
};
pub use wiper::{FileWiper, WipeFailure, WipeStats, WipeTarget};
