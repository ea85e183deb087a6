// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shutdown signal shared by the clock, engine, and transmitter threads.
///
/// Cancellation is one-way and idempotent. The real-time threads never block
/// indefinitely (they wait on channels with timeouts), so a flag they poll at
/// their suspension points is all that is needed; it is each thread's
/// responsibility to observe the flag and stop.
#[derive(Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Creates a new, uncancelled handle.
    pub fn new() -> CancelHandle {
        CancelHandle::default()
    }

    /// True once shutdown has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Requests shutdown of every thread holding a clone of this handle.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
