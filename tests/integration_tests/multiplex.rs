// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use serde::{Deserialize, Serialize};

use muxrpc_client_rs::client::Client;

use super::common::{free_addr, short_client_config, spawn_echo_server};

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct Blob {
    seq: u64,
}

const METHOD_ECHO: u32 = 42;
const CALLERS: usize = 50;
const CALLS_PER_CALLER: usize = 20;

/// Scenario: 50 concurrent callers issue 1,000 calls in total against one
/// multiplexed connection; every caller must observe its own sequence
/// echoed back, never another caller's.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn thousand_concurrent_calls_each_see_their_own_payload() {
    let addr = free_addr();
    let server = spawn_echo_server(&addr).await;
    let client = Client::connect(server.addr(), short_client_config())
        .await
        .expect("connect");

    let mut handles = Vec::with_capacity(CALLERS);
    for caller in 0..CALLERS {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..CALLS_PER_CALLER {
                let seq = (caller * CALLS_PER_CALLER + i) as u64;
                let resp: Blob = client
                    .call(METHOD_ECHO, &Blob { seq })
                    .await
                    .unwrap_or_else(|e| panic!("call seq={seq} failed: {e}"));
                assert_eq!(resp, Blob { seq }, "caller {caller} received a different caller's response");
            }
        }));
    }

    for h in handles {
        h.await.expect("caller task panicked");
    }

    assert_eq!(client.pending_len(), 0, "every call must have been removed from the pending map");

    client.close().await.expect("close");
    server.stop().await;
}
