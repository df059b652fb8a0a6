// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Snapshot of a [`super::Cluster`]'s remotes, partitioned by whether a live
/// client currently exists for each one. `connected.len() +
/// disconnected.len() == ` the cluster's total remote count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterStatus {
    pub connected: Vec<String>,
    pub disconnected: Vec<String>,
}
