//! Background Tasks Module
//!
//! Contains background tasks that run alongside the cache engine.
//!
//! # Tasks
//! - Expiry timers: remove entries the moment they outlive the max age

mod expiry;

pub use expiry::ExpiryTimers;
