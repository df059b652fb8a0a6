// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpStream;

use crate::{
    client::{config::ClientConfig, inner::ClientInner},
    codec::{Codec, JsonCodec},
    error::Result,
};

/// A single multiplexed connection to one remote. Cheap to clone: every
/// clone shares the same background reader/writer/scavenger tasks and the
/// same pending map.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Dial `remote`, complete the handshake ping, and return a ready
    /// client. On any failure the partially-built connection is torn down
    /// before the error is returned; callers never get back a `Client` whose
    /// handshake didn't succeed.
    pub async fn connect(remote: &str, cfg: ClientConfig) -> anyhow::Result<Self> {
        let stream = tokio::time::timeout(cfg.dial_timeout, TcpStream::connect(remote))
            .await
            .map_err(|_| {
                anyhow::anyhow!("dial to {remote} timed out after {:?}", cfg.dial_timeout)
            })??;
        let inner = ClientInner::connect(remote.to_string(), stream, cfg).await?;
        Ok(Self { inner })
    }

    /// Issue one request and decode its response. `method` is an
    /// application-defined dispatch key carried in the first four bytes of
    /// the request body; `Req`/`Resp` are marshalled with the client's
    /// codec (JSON by default).
    pub async fn call<Req, Resp>(&self, method: u32, req: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = JsonCodec::marshal(req)?;
        let resp = self.inner.call_raw(method, payload).await?;
        JsonCodec::unmarshal(&resp)
    }

    /// Gracefully shut the client down: wait for in-flight calls to finish,
    /// then stop the reader, writer, and scavenger tasks. Returns
    /// [`crate::error::ClientError::Closed`] if already closed.
    pub async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    /// The server's service name, learned from a non-empty ping response
    /// during the handshake. `None` if the server's ping response was empty.
    pub fn service(&self) -> Option<&str> {
        self.inner.service()
    }

    /// The remote address this client is connected to: the socket's own
    /// resolved peer address when available, otherwise the string it was
    /// dialed with.
    pub fn remote(&self) -> &str {
        self.inner.remote()
    }

    /// Number of calls currently awaiting a response. Exposed for tests and
    /// diagnostics, not part of the call path.
    pub fn pending_len(&self) -> usize {
        self.inner.pending_len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    pub(crate) fn ptr_eq(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}
