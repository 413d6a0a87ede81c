//! Parallel wipe scheduler
//!
//! A single traversal thread walks the roots and feeds a bounded path queue;
//! a fixed pool of workers drains it, wiping and removing one file at a time.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │     WipeCoordinator     │
//!                     │  - walkdir traversal    │
//!                     │  - regular files only   │
//!                     └───────────┬─────────────┘
//!                                 │ PathQueue (bounded)
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │  passes   │             │  passes   │             │  passes   │
//! │  unlink   │             │  unlink   │             │  unlink   │
//! └─────┬─────┘             └─────┬─────┘             └─────┬─────┘
//!       └─────────────────────────┼─────────────────────────┘
//!                                 │ one outcome per file
//!                          ┌──────▼──────┐
//!                          │ EraseReport │
//!                          └─────────────┘
//! ```
//!
//! The roots are removed only after every worker has been joined.

pub mod coordinator;
pub mod queue;
pub mod worker;

pub use coordinator::{WipeCoordinator, WipeProgress, WipeResult};
pub use queue::{PathQueue, WipeTask};
