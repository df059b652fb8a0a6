// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use muxrpc_client_rs::client::Client;

use super::common::{
    free_addr, short_client_config, spawn_echo_server, spawn_mismatched_ping_server,
    spawn_silent_server,
};

#[tokio::test]
async fn handshake_succeeds_against_a_responsive_server() {
    let addr = free_addr();
    let server = spawn_echo_server(&addr).await;

    let client = Client::connect(server.addr(), short_client_config())
        .await
        .expect("handshake should succeed against a server that answers ping");

    assert_eq!(client.pending_len(), 0, "no call should be left pending after handshake");

    client.close().await.expect("first close should succeed");
    let second = client.close().await;
    assert!(second.is_err(), "a second close must report the client as already closed");

    server.stop().await;
}

#[tokio::test]
async fn handshake_fails_within_the_dial_timeout_against_a_silent_server() {
    let addr = free_addr();
    let server = spawn_silent_server(&addr).await;

    let start = std::time::Instant::now();
    let result = Client::connect(server.addr(), short_client_config()).await;
    let elapsed = start.elapsed();

    assert!(result.is_err(), "connect must fail when the peer never answers the handshake ping");
    assert!(
        elapsed < Duration::from_secs(1),
        "handshake failure should be bounded by dial_timeout (300ms), took {elapsed:?}"
    );

    server.stop().await;
}

/// Scenario: the peer echoes back a command code this client's directory
/// recognises (`list-links`) but that doesn't match the `ping` it was sent
/// in reply to. This must surface as a handshake failure rather than be
/// silently accepted as a successful ping.
#[tokio::test]
async fn handshake_fails_when_ping_response_echoes_the_wrong_command_code() {
    let addr = free_addr();
    let server = spawn_mismatched_ping_server(&addr).await;

    let result = Client::connect(server.addr(), short_client_config()).await;
    assert!(
        result.is_err(),
        "connect must fail when the ping reply echoes a mismatched command code"
    );

    server.stop().await;
}
