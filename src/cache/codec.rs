//! Persistence Codec Module
//!
//! Turns `(key, value, expiry)` into the self-describing bytes written to a
//! storage file and back. Envelopes are JSON, optionally zlib-compressed.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::{Uuid, Variant, Version};

use crate::config::StoreConfig;
use crate::error::DecodeError;

// == Storage File Naming ==
/// Prefix of every storage file name
pub const FILE_PREFIX: &str = "cache_";

/// Extension of every storage file name
pub const FILE_EXTENSION: &str = ".dat";

/// Mints a fresh storage file name (`cache_<uuid-v4>.dat`).
pub fn storage_file_name() -> String {
    format!("{}{}{}", FILE_PREFIX, Uuid::new_v4(), FILE_EXTENSION)
}

/// True when `name` has the exact shape produced by [`storage_file_name`].
pub fn is_storage_file_name(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
        .filter(|token| token.len() == 36)
        .and_then(|token| Uuid::parse_str(token).ok())
        .is_some_and(|id| {
            id.get_version() == Some(Version::Random) && id.get_variant() == Variant::RFC4122
        })
}

// == Envelope ==
#[derive(Serialize)]
struct EnvelopeRef<'a, V: ?Sized> {
    key: &'a str,
    value: &'a V,
    expires: i64,
}

/// A decoded storage file.
///
/// Fields written by other writers (`size`, `filename`) are ignored; the size
/// of an entry is always the length of its file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    pub key: String,
    #[serde(default)]
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds)
    pub expires: i64,
}

impl Envelope {
    /// Deserializes the carried value into the caller's type.
    pub fn into_value<V: DeserializeOwned>(self) -> Result<V, DecodeError> {
        serde_json::from_value(self.value).map_err(DecodeError::ValueMismatch)
    }
}

// == Codec ==
/// Encoder/decoder whose mode is fixed when the store is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    compress: bool,
    revive_binary_payloads: bool,
}

impl Codec {
    pub fn new(compress: bool, revive_binary_payloads: bool) -> Self {
        Self {
            compress,
            revive_binary_payloads,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.compress, config.revive_binary_payloads)
    }

    // == Encode ==
    /// Produces the exact bytes to write for an entry.
    pub fn encode<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        expires_at: i64,
    ) -> Result<Vec<u8>, serde_json::Error> {
        let json = serde_json::to_vec(&EnvelopeRef {
            key,
            value,
            expires: expires_at,
        })?;

        if !self.compress {
            return Ok(json);
        }

        let mut encoder =
            ZlibEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder.write_all(&json).map_err(serde_json::Error::io)?;
        encoder.finish().map_err(serde_json::Error::io)
    }

    // == Decode ==
    /// Parses file bytes back into an envelope.
    ///
    /// Fails on truncated or foreign content, and on content written under
    /// the other compression mode.
    pub fn decode(&self, bytes: &[u8]) -> Result<Envelope, DecodeError> {
        let mut envelope: Envelope = if self.compress {
            let mut json = Vec::with_capacity(bytes.len() * 2);
            ZlibDecoder::new(bytes)
                .read_to_end(&mut json)
                .map_err(DecodeError::Decompress)?;
            serde_json::from_slice(&json).map_err(DecodeError::Malformed)?
        } else {
            serde_json::from_slice(bytes).map_err(DecodeError::Malformed)?
        };

        if self.revive_binary_payloads {
            revive_buffers(&mut envelope.value);
        }
        Ok(envelope)
    }
}

// == Binary Payloads ==
const BUFFER_TAG: &str = "Buffer";

/// Raw bytes stored in the tagged `{"type":"Buffer","data":[..]}` form.
///
/// Reads back from either the tagged form or a plain byte array, so it
/// loads regardless of whether buffer revival is enabled.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinaryPayload(pub Vec<u8>);

impl From<Vec<u8>> for BinaryPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl Serialize for BinaryPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BinaryPayload", 2)?;
        state.serialize_field("type", BUFFER_TAG)?;
        state.serialize_field("data", &self.0)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for BinaryPayload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Tagged {
                #[serde(rename = "type")]
                kind: String,
                data: Vec<u8>,
            },
            Plain(Vec<u8>),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Tagged { kind, data } if kind == BUFFER_TAG => Ok(Self(data)),
            Repr::Tagged { kind, .. } => Err(de::Error::custom(format!(
                "expected buffer tag {:?}, found {:?}",
                BUFFER_TAG, kind
            ))),
            Repr::Plain(data) => Ok(Self(data)),
        }
    }
}

/// Rewrites every tagged buffer object in the tree into a plain byte array.
pub fn revive_buffers(value: &mut Value) {
    if let Some(bytes) = tagged_buffer(value) {
        *value = Value::Array(bytes);
        return;
    }
    match value {
        Value::Array(items) => items.iter_mut().for_each(revive_buffers),
        Value::Object(map) => map.values_mut().for_each(revive_buffers),
        _ => {}
    }
}

fn tagged_buffer(value: &Value) -> Option<Vec<Value>> {
    let map = value.as_object()?;
    if map.get("type")?.as_str()? != BUFFER_TAG {
        return None;
    }
    let data = map.get("data")?.as_array()?;
    let all_bytes = data
        .iter()
        .all(|v| v.as_u64().is_some_and(|n| n <= u8::MAX as u64));
    all_bytes.then(|| data.clone())
}
