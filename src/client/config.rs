// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

/// Default size of the waiter free list and the writer's mpsc queue when a
/// [`ClientConfig`] doesn't override it.
pub const DEFAULT_HIGH_WATER_MARK: usize = 32;

/// Connection-level tunables for a single [`crate::client::Client`].
///
/// Distinct from the file-loaded [`crate::cfg::config::Config`], which
/// additionally carries the cluster's remote list, TLS stanza, and logger
/// settings; `Config::client_config` derives one of these per connection.
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    /// Bound on how long `Client::connect`'s handshake ping may take
    /// before the dial is considered a failure.
    pub dial_timeout: Duration,
    /// Both the scavenger's reap period and the window after which a call
    /// with no response is considered timed out. The worst case wait for a
    /// caller is approximately `2 * call_timeout`.
    pub call_timeout: Duration,
    /// Per-read/write deadline on the underlying socket, so a half-dead
    /// peer cannot wedge the reader or writer task indefinitely.
    pub io_timeout: Duration,
    /// Bound shared by the waiter free list and the writer's mpsc queue.
    pub high_water_mark: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dial_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(30),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }
}
