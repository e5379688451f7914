//! Background Tasks Module
//!
//! Optional tasks that run next to a shared store.
//!
//! # Tasks
//! - Expiry sweep: removes expired entries at a fixed interval

mod sweep;

pub use sweep::spawn_sweep_task;
