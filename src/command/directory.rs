// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// Liveness check performed once during the handshake; carries no payload
/// and the response (if non-empty) is taken as the server's service name.
pub const CODE_PING: u8 = 0;

/// Peer-directory synchronisation: payload carries this process's known
/// peer addresses, response extends the local directory with any new ones.
pub const CODE_LIST_LINKS: u8 = 1;

/// A statically known command code. Used only to validate that a response
/// echoes a code this client recognises; the actual encode/decode logic
/// lives next to each command's call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub code: u8,
    pub name: &'static str,
}

const DIRECTORY: &[CommandSpec] = &[
    CommandSpec {
        code: CODE_PING,
        name: "ping",
    },
    CommandSpec {
        code: CODE_LIST_LINKS,
        name: "list-links",
    },
];

/// Look up a command code in the static directory. `None` means the code is
/// unknown to this client and a response carrying it should be rejected
/// with `UnknownCommand`.
pub fn lookup(code: u8) -> Option<&'static CommandSpec> {
    DIRECTORY.iter().find(|c| c.code == code)
}
