// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc,
    atomic::{AtomicU8, AtomicUsize, Ordering},
};

use serde::{Serialize, de::DeserializeOwned};
use tokio::{
    sync::RwLock,
    task::{JoinHandle, JoinSet},
};
use tracing::warn;

use crate::{
    client::{Client, ClientConfig},
    cluster::status::ClusterStatus,
    error::{ClientError, Result},
};

const OPEN: u8 = 0;
const CLOSED: u8 = 1;

/// Pool of per-connection [`Client`]s dialed against a fixed set of remote
/// addresses, dispatching calls round-robin and re-dialing on failure.
///
/// Lock order is fixed: whenever both are needed, `clients` (outer) is
/// acquired before `remotes` (inner). No code path may reverse it.
#[derive(Debug)]
pub struct Cluster {
    clients: RwLock<Vec<Client>>,
    remotes: RwLock<Vec<String>>,
    next: AtomicUsize,
    cfg: ClientConfig,
    state: AtomicU8,
}

impl Cluster {
    /// Dial every address in `addrs` in parallel. Succeeds if at least one
    /// connection is established; if all fail, the first recorded dial
    /// error is returned.
    pub async fn dial<I, S>(addrs: I, cfg: ClientConfig) -> anyhow::Result<Arc<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let remotes: Vec<String> = addrs.into_iter().map(Into::into).collect();
        anyhow::ensure!(
            !remotes.is_empty(),
            "cluster requires at least one remote address"
        );

        let cluster = Arc::new(Self {
            clients: RwLock::new(Vec::with_capacity(remotes.len())),
            remotes: RwLock::new(remotes),
            next: AtomicUsize::new(0),
            cfg,
            state: AtomicU8::new(OPEN),
        });
        cluster.dial_all().await?;
        Ok(cluster)
    }

    /// Dial every known remote that doesn't already have a live client.
    /// Re-checks emptiness after acquiring the client-list lock so
    /// concurrent triggers (e.g. two calls racing to refill an empty pool)
    /// collapse into one dial round.
    async fn dial_all(self: &Arc<Self>) -> anyhow::Result<()> {
        let mut clients = self.clients.write().await;
        if !clients.is_empty() {
            return Ok(());
        }

        let targets = self.remotes.read().await.clone();
        let mut set = JoinSet::new();
        for addr in targets {
            let cfg = self.cfg;
            set.spawn(async move {
                let result = Client::connect(&addr, cfg).await;
                (addr, result)
            });
        }

        let mut errors = Vec::new();
        let mut resolved = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (addr, result) = joined.expect("dial task does not panic");
            match result {
                Ok(client) => {
                    resolved.push((addr, client.remote().to_string()));
                    clients.push(client);
                }
                Err(e) => errors.push((addr, e)),
            }
        }

        if clients.is_empty() {
            let (addr, err) = errors
                .into_iter()
                .next()
                .expect("dial_all records one error per failed address");
            return Err(err.context(format!("all cluster dials failed, first: {addr}")));
        }

        // Rewrite resolved remotes so `status` comparisons are stable;
        // addresses whose dial failed are left as originally given.
        let mut remotes = self.remotes.write().await;
        for (original, resolved_addr) in resolved {
            if let Some(slot) = remotes.iter_mut().find(|r| **r == original) {
                *slot = resolved_addr;
            }
        }
        Ok(())
    }

    /// Dial and append one client, adding `addr` to the remote list if it
    /// isn't already known.
    pub async fn add(self: &Arc<Self>, addr: impl Into<String>) -> anyhow::Result<()> {
        if self.state.load(Ordering::SeqCst) == CLOSED {
            anyhow::bail!("cluster is closed");
        }
        let addr = addr.into();
        let client = Client::connect(&addr, self.cfg).await?;
        let mut clients = self.clients.write().await;
        let mut remotes = self.remotes.write().await;
        if !remotes.iter().any(|r| r == client.remote()) {
            remotes.push(client.remote().to_string());
        }
        clients.push(client);
        Ok(())
    }

    /// Issue one call against the next client in round-robin order. If the
    /// pool is currently empty, a dial round is attempted first; a call
    /// failure that looks like a dead connection schedules a re-dial.
    pub async fn call<Req, Resp>(self: &Arc<Self>, method: u32, req: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        if self.state.load(Ordering::SeqCst) == CLOSED {
            return Err(ClientError::Closed);
        }
        let client = self.next_client().await?;
        match client.call(method, req).await {
            Ok(resp) => Ok(resp),
            Err(e) => {
                if matches!(e, ClientError::TransportFatal(_) | ClientError::Closed) {
                    self.redial(&client).await;
                }
                Err(e)
            }
        }
    }

    /// Fire-and-forget variant of [`Cluster::call`]: the round-robin pick,
    /// send, and response decode all run on a spawned task instead of the
    /// caller's own stack frame, so the caller can go on to submit more
    /// work without waiting on this one. There is no cancellation: dropping
    /// the returned handle lets the call run to completion, it just stops
    /// being observable.
    pub fn call_async<Req, Resp>(
        self: &Arc<Self>,
        method: u32,
        req: Req,
    ) -> JoinHandle<Result<Resp>>
    where
        Req: Serialize + Send + 'static,
        Resp: DeserializeOwned + Send + 'static,
    {
        let cluster = Arc::clone(self);
        tokio::spawn(async move { cluster.call(method, &req).await })
    }

    async fn next_client(self: &Arc<Self>) -> Result<Client> {
        let snapshot = self.clients.read().await.clone();
        if !snapshot.is_empty() {
            return Ok(self.pick(&snapshot));
        }
        if self.dial_all().await.is_err() {
            return Err(ClientError::NoClients);
        }
        let refilled = self.clients.read().await.clone();
        if refilled.is_empty() {
            return Err(ClientError::NoClients);
        }
        Ok(self.pick(&refilled))
    }

    fn pick(&self, clients: &[Client]) -> Client {
        let idx = self.next.fetch_add(1, Ordering::SeqCst) % clients.len();
        clients[idx].clone()
    }

    /// Race-safe re-dial: the first caller to observe and remove `client`
    /// from the list wins and dials its replacement; anyone else racing on
    /// the same failure sees it already gone and returns immediately.
    async fn redial(self: &Arc<Self>, client: &Client) {
        let removed = {
            let mut clients = self.clients.write().await;
            match clients.iter().position(|c| c.ptr_eq(client)) {
                Some(pos) => {
                    clients.remove(pos);
                    true
                }
                None => false,
            }
        };
        if !removed {
            return;
        }
        let remote = client.remote().to_string();
        match Client::connect(&remote, self.cfg).await {
            Ok(new_client) => self.clients.write().await.push(new_client),
            Err(e) => warn!(remote, "cluster redial failed: {e}"),
        }
    }

    /// Idempotent: closes every live client concurrently and clears the
    /// client list. Subsequent calls are rejected with `Closed`.
    pub async fn close(self: &Arc<Self>) -> Result<()> {
        if self.state.swap(CLOSED, Ordering::SeqCst) == CLOSED {
            return Err(ClientError::Closed);
        }
        let drained: Vec<Client> = self.clients.write().await.drain(..).collect();
        let mut set = JoinSet::new();
        for client in drained {
            set.spawn(async move {
                let _ = client.close().await;
            });
        }
        while set.join_next().await.is_some() {}
        Ok(())
    }

    /// Snapshot of which known remotes currently have a live client.
    pub async fn status(self: &Arc<Self>) -> ClusterStatus {
        let connected: Vec<String> = self
            .clients
            .read()
            .await
            .iter()
            .map(|c| c.remote().to_string())
            .collect();
        let disconnected = self
            .remotes
            .read()
            .await
            .iter()
            .filter(|r| !connected.contains(r))
            .cloned()
            .collect();
        ClusterStatus {
            connected,
            disconnected,
        }
    }
}
