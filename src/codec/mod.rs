//! Codec module - body encoding for handler arguments and replies.
//!
//! Handlers decode the raw body into their argument type with the codec the
//! transport negotiated for the call, and pull handlers encode their reply
//! with the same codec:
//!
//! - [`JsonCodec`] - `serde_json`
//! - [`MsgPackCodec`] - `rmp-serde` (struct-as-map)
//!
//! # Example
//!
//! ```
//! use rpc_router::codec::Codec;
//!
//! let encoded = Codec::MsgPack.encode(&"hello").unwrap();
//! let decoded: String = Codec::MsgPack.decode(&encoded).unwrap();
//! assert_eq!(decoded, "hello");
//! ```

mod json;
mod msgpack;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;

use crate::error::CodecError;

/// Body codec selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    #[default]
    Json,
    MsgPack,
}

impl Codec {
    /// Encode a value with this codec.
    pub fn encode<T: Serialize>(self, value: &T) -> Result<Vec<u8>, CodecError> {
        match self {
            Codec::Json => JsonCodec::encode(value),
            Codec::MsgPack => MsgPackCodec::encode(value),
        }
    }

    /// Decode a value with this codec.
    pub fn decode<T: serde::de::DeserializeOwned>(self, bytes: &[u8]) -> Result<T, CodecError> {
        match self {
            Codec::Json => JsonCodec::decode(bytes),
            Codec::MsgPack => MsgPackCodec::decode(bytes),
        }
    }

    /// Wire name of the codec.
    pub fn name(self) -> &'static str {
        match self {
            Codec::Json => "json",
            Codec::MsgPack => "msgpack",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_json() {
        assert_eq!(Codec::default(), Codec::Json);
        assert_eq!(Codec::default().to_string(), "json");
    }

    #[test]
    fn test_codecs_produce_different_bytes() {
        let json = Codec::Json.encode(&[1, 2, 3]).unwrap();
        let msgpack = Codec::MsgPack.encode(&[1, 2, 3]).unwrap();
        assert_eq!(json, b"[1,2,3]");
        assert_eq!(msgpack, vec![0x93, 0x01, 0x02, 0x03]);
    }

    #[test]
    fn test_codec_deserializes_from_config_name() {
        let codec: Codec = serde_json::from_str(r#""msgpack""#).unwrap();
        assert_eq!(codec, Codec::MsgPack);
    }
}
