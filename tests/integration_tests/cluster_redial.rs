// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use serde::{Deserialize, Serialize};

use muxrpc_client_rs::cluster::Cluster;

use super::common::{free_addr, short_client_config, spawn_echo_server, try_spawn_echo_server, EchoServer};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Echo {
    seq: u64,
}

const METHOD_ECHO: u32 = 7;

/// Rebind `addr` after the previous listener at that address was torn
/// down. The port can briefly stay unavailable (TIME_WAIT); retry with a
/// short backoff instead of failing immediately.
async fn rebind_with_retry(addr: &str) -> EchoServer {
    for attempt in 0..40 {
        match try_spawn_echo_server(addr).await {
            Ok(server) => return server,
            Err(_) if attempt < 39 => tokio::time::sleep(Duration::from_millis(50)).await,
            Err(e) => panic!("could not rebind {addr} after {attempt} attempts: {e}"),
        }
    }
    unreachable!("loop always returns or panics")
}

/// Scenario: kill one of a two-node cluster's backing servers, observe the
/// next call routed to it fail and trigger a re-dial; once that server
/// comes back on the same address, calls succeed against both nodes again.
#[tokio::test]
async fn dead_node_is_redialed_once_it_comes_back() {
    let addr_a = free_addr();
    let addr_b = free_addr();
    let server_a = spawn_echo_server(&addr_a).await;
    let server_b = spawn_echo_server(&addr_b).await;

    let cluster = Cluster::dial([addr_a.clone(), addr_b.clone()], short_client_config())
        .await
        .expect("dial should succeed when both nodes are up");

    let status = cluster.status().await;
    assert_eq!(status.connected.len(), 2, "both nodes should be connected initially");
    assert!(status.disconnected.is_empty());

    // Warm up: a handful of calls should round-trip against whichever node
    // round-robin currently picks.
    for i in 0..4u64 {
        let resp: Echo = cluster
            .call(METHOD_ECHO, &Echo { seq: i })
            .await
            .expect("call should succeed while both nodes are healthy");
        assert_eq!(resp, Echo { seq: i });
    }

    server_a.stop().await;

    // Bring A back on the same address right away: the cluster has no
    // background re-dial timer of its own, `redial` only runs inline as
    // part of the next call that observably fails against the dead node,
    // so A needs to already be listening again by the time that happens.
    let server_a = rebind_with_retry(&addr_a).await;

    // Drive calls until the cluster routes one to the stale client for A
    // (which fails, since that `Client` is still bound to the old, closed
    // socket), triggering an inline re-dial against the now-live address.
    let mut recovered = false;
    for i in 10..200u64 {
        let _ = cluster.call(METHOD_ECHO, &Echo { seq: i }).await;
        let status = cluster.status().await;
        if status.connected.len() == 2 {
            recovered = true;
            break;
        }
    }
    assert!(recovered, "cluster should reconnect to the restarted node eventually");

    // With both nodes healthy again, round-robin should route to each in
    // turn without errors.
    for i in 0..6u64 {
        let resp: Echo = cluster
            .call(METHOD_ECHO, &Echo { seq: i })
            .await
            .expect("call should succeed once both nodes are healthy again");
        assert_eq!(resp, Echo { seq: i });
    }

    cluster.close().await.expect("close");
    server_a.stop().await;
    server_b.stop().await;
}
