// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The wire frame: a fixed 12-byte lead followed by an opaque body.
//!
//! ```text
//!  0               1               2               3
//!  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7
//! +-------------------------------+-------+-------+-------+-------+
//! |                         seq (u64, BE)                        |
//! +-------+-------+-------+-------+-------+-------+-------+-------+
//! | kind  | rsvd  |      length (u16, BE)        |
//! +-------+-------+-------+-------+
//! ```
//!
//! `seq` correlates a response to the request that caused it. `kind`
//! selects REQ/RES/CMD framing. `length` is the number of body bytes that
//! immediately follow the lead on the wire.

mod codec;

pub use codec::{Frame, FrameKind, LEAD_LEN, MAX_BODY_LEN, put_frame, read_frame};

/// Status word prefixing every RES body: zero means the call succeeded and
/// the remaining bytes are the typed payload; anything else means the
/// remaining bytes are a UTF-8 explanation string.
pub const STATUS_OK: i32 = 0;

