//! In-memory debounce cache for duplicate scans.

mod debounce;

pub use debounce::DebounceCache;
