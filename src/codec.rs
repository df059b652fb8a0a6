// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The structured-payload codec. The protocol itself only cares about an
//! opaque byte payload; what goes inside is an external collaborator's
//! concern, modelled here as a small trait so the client can be built
//! against it without committing to one serialization format.

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{ClientError, Result};

/// Marshals request/response payloads to and from the wire.
pub trait Codec {
    fn marshal<T: Serialize>(value: &T) -> Result<Bytes>;
    fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T>;
}

/// Default codec: JSON via `serde_json`, matching the rest of this crate's
/// serde-based configuration and command payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal<T: Serialize>(value: &T) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| ClientError::Codec(e.to_string()))
    }

    fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| ClientError::Codec(e.to_string()))
    }
}
