// src/reload/mod.rs

//! Turning raw change events into reload triggers.
//!
//! - `updates.rs`: [`PathUpdates`], the net effect of a burst of changes.
//! - `debounce.rs`: [`Debouncer`], which waits for a quiet period before
//!   handing a burst to its callback.
//! - `filter.rs`: [`ReloadFilter`], include globs and skip-deleted.

pub mod debounce;
pub mod filter;
pub mod updates;

pub use debounce::{Debouncer, DEFAULT_DEBOUNCE};
pub use filter::ReloadFilter;
pub use updates::PathUpdates;
