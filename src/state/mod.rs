//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `SeedTask`: the mutable state of one seed's pagination chain
//! - `SeedStatus`: how a seed's crawl ended

mod seed_status;
mod seed_task;

// Re-export main types
pub use seed_status::SeedStatus;
pub use seed_task::SeedTask;
