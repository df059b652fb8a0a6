// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{
    BigEndian, FromBytes as ZFromBytes, Immutable, IntoBytes, KnownLayout, U16, U64,
};

use crate::error::{ClientError, Result};

/// Size in bytes of the fixed lead that precedes every frame's body.
pub const LEAD_LEN: usize = 12;

/// Largest body a single frame may carry.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// The three frame kinds the multiplexer understands. Any other raw value
/// read off the wire is a protocol error handled by the reader (body
/// skipped, event logged) rather than by this module.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Client -> server request.
    Req = 0,
    /// Server -> client response.
    Res = 1,
    /// In-band control message, either direction.
    Cmd = 2,
}

impl FrameKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Req,
            1 => Self::Res,
            2 => Self::Cmd,
            _ => return None,
        })
    }
}

/// Raw wire layout of the lead: `seq(8) || kind(1) || reserved(1) ||
/// length(2)`, all multi-byte fields big-endian.
#[repr(C)]
#[derive(Debug, Default, ZFromBytes, IntoBytes, KnownLayout, Immutable)]
struct RawLead {
    seq: U64<BigEndian>,
    kind: u8,
    reserved: u8,
    length: U16<BigEndian>,
}

/// A decoded lead: sequence number, raw frame-kind byte, and body length.
///
/// `kind` is kept raw (not resolved to [`FrameKind`]) because the reader
/// must still be able to parse and skip the body of an unrecognised kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub seq: u64,
    pub kind: u8,
    pub len: u16,
}

/// Encode a lead into `buf`. `len` is validated against [`MAX_BODY_LEN`]
/// before anything is written.
pub fn put_frame(buf: &mut [u8; LEAD_LEN], seq: u64, kind: FrameKind, len: usize) -> Result<()> {
    if len > MAX_BODY_LEN {
        return Err(ClientError::TooLarge);
    }
    let raw = RawLead {
        seq: U64::new(seq),
        kind: kind as u8,
        reserved: 0,
        length: U16::new(len as u16),
    };
    buf.copy_from_slice(raw.as_bytes());
    Ok(())
}

/// Decode a lead. Infallible: every 12-byte slice is a structurally valid
/// lead, even if `kind` turns out not to map onto [`FrameKind`].
pub fn read_frame(lead: &[u8; LEAD_LEN]) -> Frame {
    let raw = RawLead::read_from_bytes(lead)
        .unwrap_or_else(|_| unreachable!("fixed-size slice always matches RawLead layout"));
    Frame {
        seq: raw.seq.get(),
        kind: raw.kind,
        len: raw.length.get(),
    }
}
