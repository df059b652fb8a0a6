// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, Weak};

use tokio::sync::Mutex;

use crate::{client::ClientInner, waiter::waiter::Waiter};

/// Per-client free list of pre-allocated waiters.
///
/// The distilled spec describes a single process-wide pool keyed by the
/// owning client; this implementation keeps a pool per client instead (the
/// spec's design notes call this out as an equivalent, contention-avoiding
/// choice) so that busy clients never wait on another client's free list
/// lock. The free list's bound is the client's configured high-water mark
/// rather than a crate-wide constant, so callers can size it (and the
/// writer's mpsc queue, which shares the same bound) per deployment.
#[derive(Debug)]
pub struct WaiterPool {
    free: Mutex<Vec<Arc<Waiter>>>,
    parent: Weak<ClientInner>,
    high_water_mark: usize,
}

impl WaiterPool {
    pub fn new(parent: Weak<ClientInner>, high_water_mark: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(high_water_mark)),
            parent,
            high_water_mark,
        }
    }

    /// Return a cleared waiter, either recycled from the free list or
    /// freshly allocated when the pool is momentarily exhausted. Freshly
    /// allocated waiters beyond the free list are marked non-static and are
    /// dropped (not pooled) on `push`.
    pub async fn pop(&self) -> Arc<Waiter> {
        if let Some(w) = self.free.lock().await.pop() {
            return w;
        }
        Waiter::new(false, self.parent.clone())
    }

    /// Return a waiter to the pool. Static waiters (allocated while the
    /// pool had room) go back on the free list up to the high-water mark;
    /// everything else, including static waiters found once the list is
    /// already full, is simply dropped.
    pub async fn push(&self, waiter: Arc<Waiter>) {
        if !waiter.is_static {
            return;
        }
        let mut free = self.free.lock().await;
        if free.len() < self.high_water_mark {
            free.push(waiter);
        }
    }

    /// Pre-populate the free list with `high_water_mark` static waiters so
    /// the hot path starts allocation-free.
    pub async fn prime(&self) {
        let mut free = self.free.lock().await;
        while free.len() < self.high_water_mark {
            free.push(Waiter::new(true, self.parent.clone()));
        }
    }
}
