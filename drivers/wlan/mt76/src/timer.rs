// Copyright 2021 The Fuchsia Authors. All rights reserved.
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::{collections::HashMap, time::Duration};

#[cfg(test)]
pub use test_utils::*;

#[derive(PartialEq, Eq, Hash, Debug, Copy, Clone)]
pub struct EventId(pub u64);

/// Source of one-shot timeouts. The owner is told about expiry through `Device::handle_timeout`.
pub trait Scheduler: Send {
    /// Requests a timeout `delay` from now. Returns a unique ID used to cancel the scheduled
    /// event.
    fn schedule(&mut self, delay: Duration) -> EventId;
    /// Cancels a previously scheduled event.
    fn cancel(&mut self, id: EventId);
}

/// Maps outstanding timeouts to the event each one carries.
pub struct Timer<E> {
    events: HashMap<EventId, E>,
    scheduler: Box<dyn Scheduler>,
}

impl<E> Timer<E> {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self { events: HashMap::new(), scheduler }
    }

    /// Takes the event of an expired timeout. Canceled or already handled ids yield `None`.
    pub fn triggered(&mut self, id: &EventId) -> Option<E> {
        self.events.remove(id)
    }

    pub fn schedule_after(&mut self, delay: Duration, event: E) -> EventId {
        let id = self.scheduler.schedule(delay);
        self.events.insert(id, event);
        id
    }

    pub fn cancel_event(&mut self, id: EventId) {
        if self.events.remove(&id).is_some() {
            self.scheduler.cancel(id);
        }
    }

    pub fn cancel_all(&mut self) {
        for (id, _) in self.events.drain() {
            self.scheduler.cancel(id);
        }
    }

    pub fn pending(&self) -> usize {
        self.events.len()
    }
}
