//! Error types for rpc-router.
//!
//! Two families live here:
//!
//! - [`RouterError`] - setup-time configuration errors. These are programming
//!   errors, so the non-`try_` router API treats them as fatal.
//! - [`Xerror`] - the structured per-call result error a pull handler returns
//!   and the transport sends back to the remote peer.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::handler::Kind;

/// Setup-time configuration error.
#[derive(Debug, Error)]
pub enum RouterError {
    /// The service type is not a named struct.
    #[error("register {kind} handler: the type is not a struct: {type_name}")]
    NotStruct {
        kind: Kind,
        type_name: &'static str,
    },

    /// A declared method name is empty or not an identifier.
    #[error("register {kind} handler: {type_name}.{method} is not a valid method name")]
    InvalidMethodName {
        kind: Kind,
        type_name: &'static str,
        method: String,
    },

    /// The same method was declared twice on one service.
    #[error("register {kind} handler: {type_name}.{method} is declared more than once")]
    DuplicateMethod {
        kind: Kind,
        type_name: &'static str,
        method: String,
    },

    /// A dispatch name is already taken in the shared table.
    #[error("There is a {kind} handler conflict: {name}")]
    Conflict { kind: Kind, name: String },

    /// Plugin chain composition failed.
    #[error("plugin error: {0}")]
    Plugin(String),

    /// A `post_reg` hook rejected a handler.
    #[error("{plugin} post_reg hook failed for {name}: {source}")]
    Hook {
        plugin: String,
        name: String,
        #[source]
        source: Xerror,
    },

    /// Invalid peer configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Body encode/decode error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),
}

/// Result type alias using RouterError.
pub type Result<T> = std::result::Result<T, RouterError>;

/// Structured result error of a handler call.
///
/// A pull method must return `Result<R, Xerror>`; the type itself is the
/// contract, so no name matching is involved.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct Xerror {
    code: i32,
    message: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    detail: String,
}

impl Xerror {
    /// Unclassified failure.
    pub const CODE_UNKNOWN: i32 = -1;
    /// The body could not be decoded into the argument type.
    pub const CODE_BAD_PACKET: i32 = 400;
    /// Rejected by a plugin.
    pub const CODE_UNAUTHORIZED: i32 = 401;
    /// No handler for the requested name.
    pub const CODE_NOT_FOUND: i32 = 404;
    /// The handler failed or its reply could not be encoded.
    pub const CODE_INTERNAL_SERVER_ERROR: i32 = 500;

    /// Create a new error.
    pub fn new(code: i32, message: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            detail: detail.into(),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub(crate) fn bad_packet(err: CodecError) -> Self {
        Self::new(Self::CODE_BAD_PACKET, "Bad Packet", err.to_string())
    }

    pub(crate) fn internal(err: CodecError) -> Self {
        Self::new(
            Self::CODE_INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            err.to_string(),
        )
    }

    pub(crate) fn not_found(uri: &str) -> Self {
        Self::new(Self::CODE_NOT_FOUND, "Not Found", uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xerror_display_and_accessors() {
        let err = Xerror::new(Xerror::CODE_NOT_FOUND, "Not Found", "group/home/nope");
        assert_eq!(err.to_string(), "404: Not Found");
        assert_eq!(err.code(), 404);
        assert_eq!(err.detail(), "group/home/nope");
    }

    #[test]
    fn test_xerror_serializes_without_empty_detail() {
        let err = Xerror::new(7, "boom", "");
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"code":7,"message":"boom"}"#);

        let back: Xerror = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_conflict_message_names_kind_and_handler() {
        let err = RouterError::Conflict {
            kind: Kind::Pull,
            name: "group/home/test".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "There is a pull handler conflict: group/home/test"
        );
    }
}
