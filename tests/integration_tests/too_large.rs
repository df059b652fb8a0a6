// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use muxrpc_client_rs::{client::Client, error::ClientError};

use super::common::{free_addr, short_client_config, spawn_echo_server};

#[derive(Debug, Serialize)]
struct Big {
    blob: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Echo {
    seq: u64,
}

/// Scenario: a 65,536+ byte encoded body is rejected synchronously with
/// `TooLarge`, before anything is written to the transport; the connection
/// itself stays healthy for subsequent calls.
#[tokio::test]
async fn oversized_payload_is_rejected_without_touching_the_transport() {
    let addr = free_addr();
    let server = spawn_echo_server(&addr).await;
    let client = Client::connect(server.addr(), short_client_config())
        .await
        .expect("connect");

    // JSON-encoded, this comfortably exceeds the 65,535-byte frame body
    // limit once the 4-byte method prefix is accounted for.
    let oversized = Big { blob: "a".repeat(70_000) };
    let result: Result<Echo, _> = client.call(1, &oversized).await;
    assert!(
        matches!(result, Err(ClientError::TooLarge)),
        "expected TooLarge, got {result:?}"
    );
    assert_eq!(client.pending_len(), 0, "a rejected call must never be registered in the pending map");

    // No bytes should have reached the peer: an ordinary call right after
    // still round-trips cleanly on the same connection.
    let ok: Echo = client
        .call(2, &Echo { seq: 99 })
        .await
        .expect("connection must still be usable after a synchronous rejection");
    assert_eq!(ok, Echo { seq: 99 });

    client.close().await.expect("close");
    server.stop().await;
}
