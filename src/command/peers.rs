// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use dashmap::DashSet;
use once_cell::sync::Lazy;

/// Process-wide directory of known peer addresses, synchronised by the
/// `list-links` command every client runs once after a successful
/// handshake ping.
static PEER_DIRECTORY: Lazy<DashSet<String>> = Lazy::new(DashSet::new);

/// Snapshot of every peer address this process currently knows about.
pub fn known_peers() -> Vec<String> {
    PEER_DIRECTORY.iter().map(|e| e.clone()).collect()
}

/// Extend the local directory with `peers` learned from a `list-links`
/// response.
pub fn merge_peers(peers: impl IntoIterator<Item = String>) {
    for p in peers {
        PEER_DIRECTORY.insert(p);
    }
}
