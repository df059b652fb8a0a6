// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{Arc, atomic::Ordering};

use dashmap::DashMap;

use crate::{
    error::{ClientError, Result},
    waiter::Waiter,
};

/// Mapping seq -> waiter used to demultiplex responses onto the caller that
/// is waiting for them.
///
/// Implemented over [`dashmap::DashMap`], the same sharded-lock structure
/// the teacher uses for its ITT-keyed `sending`/`reciver` maps, which gives
/// `insert`/`remove` safe concurrent access from caller tasks, the reader,
/// the scavenger, and shutdown without a single global lock.
#[derive(Debug, Default)]
pub struct PendingMap {
    inner: DashMap<u64, Arc<Waiter>>,
}

impl PendingMap {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
        }
    }

    /// Register `waiter` under its own `seq`. A collision (an existing
    /// entry at the same sequence number) is a protocol bug: sequence
    /// numbers are unique per client for the client's lifetime.
    pub fn insert(&self, waiter: Arc<Waiter>) {
        let seq = waiter.seq.get();
        let prior = self.inner.insert(seq, waiter);
        debug_assert!(prior.is_none(), "duplicate sequence number {seq}");
    }

    /// Atomic lookup-and-delete. Returns the waiter if one was registered
    /// under `seq`, or `None` if the reply arrived after the waiter was
    /// already reaped, flushed, or never existed (unknown seq).
    pub fn remove(&self, seq: u64) -> Option<Arc<Waiter>> {
        self.inner.remove(&seq).map(|(_, w)| w)
    }

    /// Two-pass scavenger invoked on every scavenger tick.
    ///
    /// Any entry already marked `reap=true` (i.e. survived one full tick
    /// unanswered) is removed, signalled with [`ClientError::Timeout`], and
    /// dropped from the map. Every surviving entry is marked `reap=true`
    /// for the next pass. This bounds the worst-case wait to roughly twice
    /// the scavenger period.
    pub async fn reap(&self) {
        let mut expired = Vec::new();
        self.inner.retain(|_, w| {
            if w.reap.load(Ordering::SeqCst) {
                expired.push(Arc::clone(w));
                false
            } else {
                w.reap.store(true, Ordering::SeqCst);
                true
            }
        });
        for w in expired {
            w.signal(Err(ClientError::Timeout)).await;
        }
    }

    /// Remove and signal every pending entry with `err`. Invoked once, from
    /// `close_error`, when the transport has failed fatally.
    pub async fn flush(&self, err: ClientError) {
        let drained: Vec<Arc<Waiter>> =
            self.inner.iter().map(|e| Arc::clone(e.value())).collect();
        self.inner.clear();
        for w in drained {
            w.signal(Err(err.clone())).await;
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
