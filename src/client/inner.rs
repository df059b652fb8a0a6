// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicU8, Ordering},
    },
    time::Duration,
};

use bytes::{Bytes, BytesMut};
use once_cell::sync::OnceCell;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, BufWriter},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    client::{config::ClientConfig, inflight::InFlight},
    codec::{Codec, JsonCodec},
    command,
    error::{ClientError, Result},
    pending::PendingMap,
    waiter::{Waiter, WaiterPool},
    wire::{FrameKind, LEAD_LEN, MAX_BODY_LEN, STATUS_OK, put_frame, read_frame},
};

const OPEN: u8 = 0;
const CLOSED: u8 = 1;

/// The engine behind a [`crate::client::Client`]: owns the socket halves'
/// background tasks, the sequence counter, the pending map, and the waiter
/// pool. Never constructed or held directly by callers; always reached
/// through the `Arc` that every waiter's `parent` weakly points back to.
#[derive(Debug)]
pub struct ClientInner {
    state: AtomicU8,
    seq_counter: AtomicU64,
    pending: PendingMap,
    pool: WaiterPool,
    write_tx: Mutex<Option<mpsc::Sender<Arc<Waiter>>>>,
    inflight: InFlight,
    cancel: CancellationToken,
    cfg: ClientConfig,
    service: OnceCell<String>,
    remote: String,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ClientInner {
    /// Dial already happened; take ownership of the connected socket, spawn
    /// the reader/writer/scavenger tasks, and run the handshake ping. On any
    /// handshake failure the client is torn down and the error is returned
    /// to the caller of `Client::connect` rather than left half-open.
    pub(crate) async fn connect(
        remote: String,
        stream: TcpStream,
        cfg: ClientConfig,
    ) -> anyhow::Result<Arc<Self>> {
        stream.set_nodelay(true)?;
        // Prefer the socket's own view of who it's connected to (e.g. a
        // resolved IP rather than the DNS name the caller dialed) so the
        // cluster's later address rewrite has something real to rewrite to;
        // fall back to the dialed string if the platform can't report it.
        let remote = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or(remote);
        let (read_half, write_half) = stream.into_split();

        let high_water_mark = cfg.high_water_mark;
        let inner = Arc::new_cyclic(|weak| Self {
            state: AtomicU8::new(OPEN),
            seq_counter: AtomicU64::new(1),
            pending: PendingMap::new(),
            pool: WaiterPool::new(weak.clone(), high_water_mark),
            write_tx: Mutex::new(None),
            inflight: InFlight::default(),
            cancel: CancellationToken::new(),
            cfg,
            service: OnceCell::new(),
            remote,
            tasks: Mutex::new(Vec::with_capacity(3)),
        });
        inner.pool.prime().await;

        let (tx, rx) = mpsc::channel(high_water_mark);
        *inner.write_tx.lock().await = Some(tx);

        let reader = Arc::clone(&inner);
        let reader_handle = tokio::spawn(async move { reader.reader_loop(read_half).await });
        let writer = Arc::clone(&inner);
        let writer_handle = tokio::spawn(async move { writer.writer_loop(write_half, rx).await });
        let scavenger = Arc::clone(&inner);
        let scavenger_handle = tokio::spawn(async move { scavenger.scavenger_loop().await });
        {
            let mut tasks = inner.tasks.lock().await;
            tasks.push(reader_handle);
            tasks.push(writer_handle);
            tasks.push(scavenger_handle);
        }

        match tokio::time::timeout(inner.cfg.dial_timeout, inner.ping()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                inner.close_error(ClientError::TransportFatal(e.to_string())).await;
                inner.join_tasks().await;
                anyhow::bail!("handshake ping failed: {e}");
            }
            Err(_) => {
                inner.close_error(ClientError::Timeout).await;
                inner.join_tasks().await;
                anyhow::bail!(
                    "handshake ping timed out after {:?}",
                    inner.cfg.dial_timeout
                );
            }
        }

        // Peer-directory sync is best-effort; a failure here doesn't undo a
        // successful handshake.
        let syncer = Arc::clone(&inner);
        tokio::spawn(async move {
            if let Err(e) = syncer.list_links().await {
                warn!(remote = %syncer.remote, "list-links sync failed: {e}");
            }
        });

        Ok(inner)
    }

    pub(crate) fn remote(&self) -> &str {
        &self.remote
    }

    pub(crate) fn service(&self) -> Option<&str> {
        self.service.get().map(String::as_str)
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.load(Ordering::SeqCst) == CLOSED
    }

    pub(crate) async fn call_raw(self: &Arc<Self>, method: u32, payload: Bytes) -> Result<Bytes> {
        let mut body = BytesMut::with_capacity(4 + payload.len());
        body.extend_from_slice(&method.to_be_bytes());
        body.extend_from_slice(&payload);
        let resp = self.submit(FrameKind::Req, body.freeze()).await?;
        decode_call_response(resp)
    }

    async fn write_command(self: &Arc<Self>, code: u8, payload: Bytes) -> Result<Bytes> {
        let mut body = BytesMut::with_capacity(1 + payload.len());
        body.extend_from_slice(&[code]);
        body.extend_from_slice(&payload);
        let resp = self.submit(FrameKind::Cmd, body.freeze()).await?;
        let Some(code_echo) = resp.first().copied() else {
            return Err(ClientError::Protocol(
                "command response missing code byte".into(),
            ));
        };
        if command::lookup(code_echo).is_none() {
            return Err(ClientError::UnknownCommand(code_echo));
        }
        // The directory knows the code, but it isn't the one this call sent:
        // the server echoed back some other in-band command instead of a
        // reply to ours, which is a malformed response for this call rather
        // than an altogether unrecognised command.
        if code_echo != code {
            return Err(ClientError::InvalidCommand(code_echo));
        }
        Ok(resp.slice(1..))
    }

    async fn ping(self: &Arc<Self>) -> Result<()> {
        let resp = self.write_command(command::CODE_PING, Bytes::new()).await?;
        if !resp.is_empty() {
            let _ = self.service.set(String::from_utf8_lossy(&resp).into_owned());
        }
        Ok(())
    }

    async fn list_links(self: &Arc<Self>) -> Result<()> {
        let payload = JsonCodec::marshal(&command::known_peers())?;
        let resp = self.write_command(command::CODE_LIST_LINKS, payload).await?;
        let peers: Vec<String> = JsonCodec::unmarshal(&resp)?;
        command::merge_peers(peers);
        Ok(())
    }

    /// Admit, send, and await the response for one REQ or CMD frame.
    ///
    /// `inflight` is incremented before the state check so a concurrent
    /// `close` can never observe zero in-flight calls while this one is
    /// still being admitted; every early return past that point decrements
    /// it again before propagating the error.
    async fn submit(self: &Arc<Self>, kind: FrameKind, body: Bytes) -> Result<Bytes> {
        self.inflight.inc();

        if self.state.load(Ordering::SeqCst) != OPEN {
            self.inflight.dec();
            return Err(ClientError::Closed);
        }
        if body.len() > MAX_BODY_LEN {
            self.inflight.dec();
            return Err(ClientError::TooLarge);
        }

        let seq = self.seq_counter.fetch_add(1, Ordering::SeqCst);
        let waiter = self.pool.pop().await;
        let rx = waiter.arm(seq).await;

        let mut lead = [0u8; LEAD_LEN];
        if let Err(e) = put_frame(&mut lead, seq, kind, body.len()) {
            self.pool.push(waiter).await;
            self.inflight.dec();
            return Err(e);
        }
        {
            let mut buf = waiter.buf.lock().await;
            buf.clear();
            buf.extend_from_slice(&lead);
            buf.extend_from_slice(&body);
        }

        self.pending.insert(Arc::clone(&waiter));

        let sender = self.write_tx.lock().await.clone();
        let admitted = match sender {
            Some(sender) => sender.send(Arc::clone(&waiter)).await.is_ok(),
            None => false,
        };
        if !admitted {
            self.pending.remove(seq);
            self.pool.push(waiter).await;
            self.inflight.dec();
            return Err(ClientError::Closed);
        }

        let outcome = match rx.await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Closed),
        };
        self.inflight.dec();

        match outcome {
            Ok(()) => {
                let body = waiter.buf.lock().await.clone().freeze();
                self.pool.push(waiter).await;
                Ok(body)
            }
            Err(e) => {
                self.pool.push(waiter).await;
                Err(e)
            }
        }
    }

    async fn reader_loop(self: Arc<Self>, mut r: OwnedReadHalf) {
        loop {
            let mut lead = [0u8; LEAD_LEN];
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                res = read_exact_timeout(&mut r, &mut lead, self.cfg.io_timeout) => res,
            };
            if let Err(e) = read {
                self.close_error(ClientError::TransportFatal(format!("read lead: {e}")))
                    .await;
                break;
            }

            let frame = read_frame(&lead);
            let mut body = BytesMut::zeroed(frame.len as usize);
            if frame.len > 0 {
                if let Err(e) = read_exact_timeout(&mut r, &mut body, self.cfg.io_timeout).await {
                    self.close_error(ClientError::TransportFatal(format!("read body: {e}")))
                        .await;
                    break;
                }
            }

            match FrameKind::from_u8(frame.kind) {
                Some(FrameKind::Res) | Some(FrameKind::Cmd) => {
                    if let Some(waiter) = self.pending.remove(frame.seq) {
                        {
                            let mut buf = waiter.buf.lock().await;
                            buf.clear();
                            buf.extend_from_slice(&body);
                        }
                        waiter.signal(Ok(())).await;
                    } else {
                        debug!(seq = frame.seq, "response for unknown or expired sequence");
                    }
                }
                Some(FrameKind::Req) => {
                    warn!(seq = frame.seq, "received a REQ frame on a client socket");
                }
                None => {
                    warn!(kind = frame.kind, seq = frame.seq, "unknown frame kind");
                }
            }
        }
    }

    async fn writer_loop(
        self: Arc<Self>,
        write_half: OwnedWriteHalf,
        mut rx: mpsc::Receiver<Arc<Waiter>>,
    ) {
        let mut w = BufWriter::new(write_half);
        loop {
            let Some(first) = rx.recv().await else {
                break;
            };
            if let Err(e) = write_one(&mut w, &first).await {
                self.close_error(ClientError::TransportFatal(format!("write: {e}")))
                    .await;
                return;
            }
            while let Ok(next) = rx.try_recv() {
                if let Err(e) = write_one(&mut w, &next).await {
                    self.close_error(ClientError::TransportFatal(format!("write: {e}")))
                        .await;
                    return;
                }
            }
            if let Err(e) = w.flush().await {
                self.close_error(ClientError::TransportFatal(format!("flush: {e}")))
                    .await;
                return;
            }
        }
        // Channel closed by a graceful `close`; half-close the socket so the
        // peer observes EOF and the reader unwinds too.
        let _ = w.get_mut().shutdown().await;
    }

    async fn scavenger_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.cfg.call_timeout);
        ticker.tick().await; // first tick fires immediately
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.pending.reap().await,
            }
        }
    }

    /// Fatal, async-origin shutdown: the transport broke under us. Flushes
    /// every pending waiter immediately rather than waiting for callers to
    /// time out individually.
    async fn close_error(self: &Arc<Self>, err: ClientError) {
        if self.state.swap(CLOSED, Ordering::SeqCst) == CLOSED {
            return;
        }
        warn!(remote = %self.remote, "client closing: {err}");
        self.cancel.cancel();
        *self.write_tx.lock().await = None;
        self.pending.flush(err).await;
    }

    /// Graceful, caller-initiated shutdown: wait for in-flight calls to
    /// drain, then stop every background task. Returns `Closed` if already
    /// closed (idempotent but not silently so, matching `ClientError`'s
    /// other "operation on a dead client" cases).
    pub(crate) async fn close(self: &Arc<Self>) -> Result<()> {
        if self.state.swap(CLOSED, Ordering::SeqCst) == CLOSED {
            return Err(ClientError::Closed);
        }
        self.inflight.wait_zero().await;
        self.cancel.cancel();
        *self.write_tx.lock().await = None;
        self.join_tasks().await;
        Ok(())
    }

    async fn join_tasks(self: &Arc<Self>) {
        let handles: Vec<_> = self.tasks.lock().await.drain(..).collect();
        for h in handles {
            let _ = h.await;
        }
    }
}

async fn read_exact_timeout(
    r: &mut OwnedReadHalf,
    buf: &mut [u8],
    dur: Duration,
) -> std::io::Result<()> {
    match tokio::time::timeout(dur, r.read_exact(buf)).await {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            "read timed out",
        )),
    }
}

async fn write_one(
    w: &mut BufWriter<OwnedWriteHalf>,
    waiter: &Arc<Waiter>,
) -> std::io::Result<()> {
    let buf = waiter.buf.lock().await;
    w.write_all(&buf).await
}

fn decode_call_response(body: Bytes) -> Result<Bytes> {
    if body.len() < 4 {
        return Err(ClientError::Protocol(
            "response body shorter than its status word".into(),
        ));
    }
    let status = i32::from_be_bytes(body[0..4].try_into().expect("checked above"));
    let payload = body.slice(4..);
    if status == STATUS_OK {
        Ok(payload)
    } else {
        Err(ClientError::ResponseError {
            code: status,
            explanation: String::from_utf8_lossy(&payload).into_owned(),
        })
    }
}
