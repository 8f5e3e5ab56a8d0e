//! # Cooperative Cancellation
//!
//! File: cli/src/core/cancel.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! A `CancelToken` is a cloneable flag shared between whoever wants an archive
//! operation to stop (the Ctrl-C watcher in `main.rs`) and the operation itself.
//! The archive engine checks it between entries, so an entry that has started
//! is always written or restored completely before the operation stops.
//!
use crate::core::error::{ArchiveError, ArchiveResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once cancellation has been requested.
    pub fn check(&self) -> ArchiveResult<()> {
        if self.is_cancelled() {
            Err(ArchiveError::cancelled())
        } else {
            Ok(())
        }
    }
}
