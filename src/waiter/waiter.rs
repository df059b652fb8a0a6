// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, Ordering},
};

use bytes::BytesMut;
use tokio::sync::{Mutex, oneshot};

use crate::{client::ClientInner, error::Result};

/// Heap-allocated carrier for one in-flight call.
///
/// A waiter is either (a) idle in the free list, (b) registered in exactly
/// one [`crate::pending::PendingMap`] with its completion signal
/// unsignalled, or (c) held by its caller after being signalled and removed
/// from the map. Transitions (a->b) and (b->c) are atomic from other
/// observers' perspective: (a->b) happens under the pool's lock, (b->c)
/// happens via [`PendingMap::remove`]/[`PendingMap::reap`]/`flush`'s
/// lookup-and-delete, of which exactly one wins per waiter.
#[derive(Debug)]
pub struct Waiter {
    /// Assigned sequence number, unique per client for the waiter's
    /// lifetime. `0` for an idle, not-yet-assigned waiter.
    pub seq: AtomicU64Cell,
    /// Single reusable byte buffer: first the outbound frame+body (filled
    /// by the caller before send), then overwritten with the inbound body
    /// (filled by the reader).
    pub buf: Mutex<BytesMut>,
    /// Single-use completion signal. `None` once consumed or before the
    /// waiter is registered.
    done: Mutex<Option<oneshot::Sender<Result<()>>>>,
    /// Mark bit consumed by the timeout scavenger (two-pass reap).
    pub reap: AtomicBool,
    /// Whether this waiter belongs to the client's statically sized free
    /// list; waiters beyond the free list are freshly allocated and
    /// dropped after use instead of being returned to the pool.
    pub is_static: bool,
    /// Weak back-reference to the owning client. A relation, never
    /// ownership: the client outlives every waiter it accepts, but a
    /// waiter never keeps the client alive.
    pub parent: Weak<ClientInner>,
}

/// Plain `AtomicU64` wrapper kept distinct so the field's intent (a
/// reassignable sequence number, not a counter) reads clearly at call
/// sites.
#[derive(Debug, Default)]
pub struct AtomicU64Cell(std::sync::atomic::AtomicU64);

impl AtomicU64Cell {
    pub fn new(v: u64) -> Self {
        Self(std::sync::atomic::AtomicU64::new(v))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, v: u64) {
        self.0.store(v, Ordering::SeqCst);
    }
}

impl Waiter {
    pub(crate) fn new(is_static: bool, parent: Weak<ClientInner>) -> Arc<Self> {
        Arc::new(Self {
            seq: AtomicU64Cell::new(0),
            buf: Mutex::new(BytesMut::new()),
            done: Mutex::new(None),
            reap: AtomicBool::new(false),
            is_static,
            parent,
        })
    }

    /// Arm the waiter for a fresh call: assign its sequence number, clear
    /// reuse state, and install a new completion channel. Returns the
    /// receiver half; the sender half is retained so the reader/scavenger/
    /// flush path can signal it later.
    pub(crate) async fn arm(self: &Arc<Self>, seq: u64) -> oneshot::Receiver<Result<()>> {
        self.seq.set(seq);
        self.reap.store(false, Ordering::SeqCst);
        self.buf.lock().await.clear();
        let (tx, rx) = oneshot::channel();
        *self.done.lock().await = Some(tx);
        rx
    }

    /// Signal completion with `result`. Idempotent: a waiter can only be
    /// signalled once since the sender is consumed on first use; later
    /// callers of `signal` are no-ops, which is what lets `remove` and
    /// `reap` race safely (whichever observes the waiter first wins, the
    /// other's `signal` lands on an already-empty slot).
    pub(crate) async fn signal(&self, result: Result<()>) {
        if let Some(tx) = self.done.lock().await.take() {
            let _ = tx.send(result);
        }
    }
}
