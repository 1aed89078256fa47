// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Gate around the pre-TBTT (beacon timing) task.
//!
//! The task is kicked from interrupt context ahead of every target beacon transmission time.
//! Scans and beacon reconfiguration suspend it; suspensions nest.

use {
    log::{trace, warn},
    parking_lot::Mutex,
    std::sync::atomic::{AtomicU32, Ordering},
};

#[derive(Debug, Default)]
pub struct PreTbttTask {
    disable_count: AtomicU32,
    running: Mutex<()>,
}

impl PreTbttTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suspends the task and waits for an in-flight run to finish.
    pub fn disable(&self) {
        self.disable_count.fetch_add(1, Ordering::SeqCst);
        self.wait_idle();
    }

    /// Returns once no run is in flight. Runs started afterwards observe every write made before
    /// the call.
    pub fn wait_idle(&self) {
        drop(self.running.lock());
    }

    pub fn enable(&self) {
        let prev = self
            .disable_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| count.checked_sub(1));
        if prev.is_err() {
            warn!("pre-TBTT task enabled while not disabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.disable_count.load(Ordering::SeqCst) == 0
    }

    /// Suspends the task until the returned guard is dropped.
    pub fn suspend(&self) -> SuspendGuard<'_> {
        self.disable();
        SuspendGuard(self)
    }

    /// Runs `f` unless the task is suspended. Returns `None` when it did not run.
    pub fn run<R, F: FnOnce() -> R>(&self, f: F) -> Option<R> {
        let _running = self.running.lock();
        if !self.is_enabled() {
            trace!("pre-TBTT task suspended");
            return None;
        }
        Some(f())
    }
}

pub struct SuspendGuard<'a>(&'a PreTbttTask);

impl Drop for SuspendGuard<'_> {
    fn drop(&mut self) {
        self.0.enable();
    }
}
