// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use serde::{Deserialize, Serialize};

use muxrpc_client_rs::{client::Client, error::ClientError};

use super::common::{METHOD_SWALLOW, free_addr, short_client_config, spawn_echo_server};

#[derive(Debug, Serialize, Deserialize)]
struct Ping {
    seq: u64,
}

/// Scenario: the server accepts the frame but never replies (it's wired to
/// swallow `METHOD_SWALLOW`). A call with a 50ms `call_timeout` must come
/// back `Timeout` within roughly 1-2x that window, and the pending map must
/// be empty afterward.
#[tokio::test]
async fn unanswered_call_times_out_and_drains_the_pending_map() {
    let addr = free_addr();
    let server = spawn_echo_server(&addr).await;
    let client = Client::connect(server.addr(), short_client_config())
        .await
        .expect("connect");

    let start = std::time::Instant::now();
    let result: Result<Ping, _> = client.call(METHOD_SWALLOW, &Ping { seq: 1 }).await;
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(ClientError::Timeout)), "expected Timeout, got {result:?}");
    assert!(
        elapsed >= Duration::from_millis(40),
        "timeout fired suspiciously early (before even one call_timeout window): {elapsed:?}"
    );
    assert!(
        elapsed <= Duration::from_millis(500),
        "timeout should fire within roughly 2x call_timeout (50ms), took {elapsed:?}"
    );
    assert_eq!(client.pending_len(), 0, "the reaped waiter must be removed from the pending map");

    client.close().await.expect("close");
    server.stop().await;
}
