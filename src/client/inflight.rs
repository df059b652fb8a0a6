// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::atomic::{AtomicI64, Ordering};

use tokio::sync::Notify;

/// Tracks the number of outstanding caller operations (the async analogue
/// of a `sync.WaitGroup`). `Client::close` increments-then-checks the state
/// the same tick a write is set up, so `wait_zero` is guaranteed not to
/// observe a drain race against a call that is still being admitted.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    count: AtomicI64,
    notify: Notify,
}

impl InFlight {
    pub fn inc(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub fn dec(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }

    /// Wait until the counter reaches zero. Builds the `Notified` future
    /// before checking the counter so a concurrent `dec()` that fires
    /// between the check and the wait can't be missed.
    pub async fn wait_zero(&self) {
        loop {
            let notified = self.notify.notified();
            if self.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}
