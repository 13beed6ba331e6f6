//! Progress notification and cooperative cancellation.
//!
//! Long file operations (copy, move, folder scans, transaction commits)
//! take an optional `&dyn ProgressNotify`. Implementations must poll
//! `is_canceled` at each natural step (one file copied, one entry
//! visited) and abort promptly.

use std::sync::atomic::{AtomicBool, Ordering};

/// Poll-based progress sink.
pub trait ProgressNotify {
    fn begin_progress(&self) {}

    /// `fraction` is in `0.0..=1.0`.
    fn update_progress(&self, _fraction: f64) {}

    fn end_progress(&self) {}

    fn is_canceled(&self) -> bool {
        false
    }
}

/// No-op sink for call sites that need a `&dyn ProgressNotify`.
pub struct NullProgress;

impl ProgressNotify for NullProgress {}

/// Thread-safe cancellation flag with optional progress capture, mainly
/// for tests and simple callers.
#[derive(Default)]
pub struct CancelFlag {
    canceled: AtomicBool,
}

impl CancelFlag {
    pub fn new() -> CancelFlag {
        CancelFlag::default()
    }

    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Relaxed);
    }
}

impl ProgressNotify for CancelFlag {
    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Relaxed)
    }
}
