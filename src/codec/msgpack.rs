//! MsgPack body codec using `rmp-serde`.
//!
//! Structs are written with `to_vec_named` so peers that decode into
//! dynamic maps see field names instead of positional arrays.

use crate::error::CodecError;

/// MessagePack codec for structured bodies.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct ConnArgs {
        conn_port: u16,
        peer: String,
    }

    #[test]
    fn test_struct_is_written_as_map() {
        let args = ConnArgs {
            conn_port: 9090,
            peer: "client9090".to_string(),
        };

        let encoded = MsgPackCodec::encode(&args).unwrap();
        // 0x82 = fixmap with 2 entries; an array would be 0x92
        assert_eq!(encoded[0], 0x82, "Expected fixmap, got {:02X}", encoded[0]);

        let decoded: ConnArgs = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(decoded, args);
    }

    #[test]
    fn test_struct_decodes_as_dynamic_map() {
        let args = ConnArgs {
            conn_port: 9091,
            peer: "x".to_string(),
        };
        let encoded = MsgPackCodec::encode(&args).unwrap();

        let map: HashMap<String, serde_json::Value> = MsgPackCodec::decode(&encoded).unwrap();
        assert_eq!(map["conn_port"], serde_json::json!(9091));
    }

    #[test]
    fn test_decode_error_on_invalid_data() {
        let result: Result<ConnArgs, CodecError> = MsgPackCodec::decode(b"not valid msgpack");
        assert!(matches!(result, Err(CodecError::MsgPackDecode(_))));
    }
}
