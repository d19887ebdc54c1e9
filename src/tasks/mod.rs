//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a cache.
//!
//! # Tasks
//! - Reclaimer: Removes expired cache entries at a configured interval

mod reclaimer;

pub use reclaimer::{Reclaimer, ReclaimerStats};
