// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! In-band control messages that share the same multiplex as ordinary
//! calls: `ping` (handshake liveness) and `list-links` (peer-directory
//! synchronisation).
//!
//! A command frame's body is `cmd_code(1 byte) || payload` in both
//! directions; unlike a REQ/RES pair there is no status word, so a failed
//! command is observed only as a timeout or as a command code absent from
//! [`lookup`].

mod directory;
mod peers;

pub use directory::{CODE_LIST_LINKS, CODE_PING, CommandSpec, lookup};
pub use peers::{known_peers, merge_peers};
