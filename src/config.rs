//! Peer configuration.
//!
//! Every field has a default so a minimal (or empty) TOML document is a
//! valid configuration.
//!
//! # Example
//!
//! ```
//! use rpc_router::codec::Codec;
//! use rpc_router::PeerConfig;
//!
//! let config = PeerConfig::from_toml_str(r#"
//!     root_path = "/api"
//!     default_codec = "msgpack"
//! "#).unwrap();
//!
//! assert_eq!(config.root_path, "/api");
//! assert_eq!(config.default_codec, Codec::MsgPack);
//! ```

use serde::{Deserialize, Serialize};

use crate::codec::Codec;
use crate::error::{Result, RouterError};

/// Configuration of a [`crate::Peer`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    /// Prefix of both root routers.
    pub root_path: String,
    /// Body codec for calls whose transport did not name one.
    pub default_codec: Codec,
}

impl PeerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: PeerConfig =
            toml::from_str(s).map_err(|e| RouterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Semantic checks serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.root_path.contains('?') {
            return Err(RouterError::Config(format!(
                "root_path must not contain a query: {}",
                self.root_path
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PeerConfig::from_toml_str("").unwrap();
        assert_eq!(config, PeerConfig::default());
        assert_eq!(config.default_codec, Codec::Json);
        assert_eq!(config.root_path, "");
    }

    #[test]
    fn test_unknown_codec_rejected() {
        let err = PeerConfig::from_toml_str(r#"default_codec = "xml""#).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }

    #[test]
    fn test_query_in_root_path_rejected() {
        let err = PeerConfig::from_toml_str(r#"root_path = "/api?x=1""#).unwrap_err();
        assert_eq!(
            err.to_string(),
            "config error: root_path must not contain a query: /api?x=1"
        );
    }
}
