//! # Keepsake Core Library
//!
//! Progressive content disclosure: a fixed, ordered schedule of messages,
//! each with a release date, unlocked for a single user over calendar time.
//! Once an item is unlocked it stays unlocked. The CLI binary is a thin
//! presentation layer over this library.
//!
//! ## Architecture
//!
//! - **Schedule**: the validated, ordered list of content items
//! - **Reconciler**: merges persisted unlocks, today's due items and the
//!   always-unlocked first item, then writes the result back
//! - **Store**: capability trait for the persistent key-value store, with
//!   file, in-memory and null implementations
//! - **Storage**: data directory and TOML configuration
//!
//! ## Key Components
//!
//! - [`Reconciler`]: the unlock engine
//! - [`UnlockState`]: unlocked ids plus derived queries
//! - [`Schedule`]: release schedule
//! - [`UnlockStore`]: persistence seam

pub mod clock;
pub mod error;
pub mod label;
pub mod schedule;
pub mod storage;
pub mod store;
pub mod unlock;

pub use clock::{Clock, FixedClock, LocalClock};
pub use error::{ConfigError, CoreError, ScheduleError, StoreError};
pub use label::{display_label, unlock_label, FIRST_LABEL, LOCK_MARKERS};
pub use schedule::{ContentItem, ItemId, Schedule};
pub use storage::{data_dir, Config};
pub use store::{FileStore, MemoryStore, NullStore, UnlockStore};
pub use unlock::{
    Click, PriorState, Reconciler, Reconciliation, UnlockState, DEFAULT_STORAGE_KEY,
};
