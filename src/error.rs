// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Error taxonomy surfaced to callers of [`crate::client::Client::call`] and
/// [`crate::cluster::Cluster`].
///
/// Transport-level and marshaling failures are wrapped with `anyhow` at the
/// call boundary (see the teacher's `Pool`/`ClientConnection` methods); this
/// enum carries only the terminal, protocol-defined outcomes a caller needs
/// to match on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Operation attempted on a closed client or cluster.
    #[error("client is closed")]
    Closed,

    /// No response arrived within (approximately) 1-2x the configured
    /// timeout; the scavenger reaped the waiter.
    #[error("call timed out")]
    Timeout,

    /// Encoded body would exceed the 65,535-byte frame limit.
    #[error("encoded body too large for a single frame")]
    TooLarge,

    /// Cluster has no live clients and could not dial any of its remotes.
    #[error("no live clients in cluster")]
    NoClients,

    /// Server returned a non-OK status for this call.
    #[error("response error {code}: {explanation}")]
    ResponseError { code: i32, explanation: String },

    /// Malformed frame or unknown/invalid command code. Logged by the
    /// reader; only reaches a caller indirectly (e.g. as `InvalidCommand` /
    /// `UnknownCommand` during the handshake).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An in-band command referenced a code with no entry in the command
    /// directory.
    #[error("unknown command code {0}")]
    UnknownCommand(u8),

    /// A command response echoed a code this client recognises, but not the
    /// one the call actually sent — a malformed reply for this call rather
    /// than an altogether unrecognised command.
    #[error("invalid command response, got code {0}")]
    InvalidCommand(u8),

    /// Any transport-level read/write failure. Fatal for the client: it
    /// transitions to CLOSED and every pending waiter is flushed with this
    /// error.
    #[error("transport error: {0}")]
    TransportFatal(String),

    /// Failed to marshal a request payload or unmarshal a response payload.
    #[error("codec error: {0}")]
    Codec(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;
