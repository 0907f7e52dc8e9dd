//! One adapter per upstream. Each adapter borrows the shared [`FetchPool`]
//! so every request counts against the same concurrency cap.
//!
//! [`FetchPool`]: crate::FetchPool

pub mod affiliate;
pub mod revzilla;
pub mod sharp;
pub mod snell;
