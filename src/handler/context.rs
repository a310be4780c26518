//! Per-call context handed to service instances.
//!
//! The transport builds one [`CallInfo`] per decoded inbound message. The
//! origin factory of the resolved handler wraps it in a [`PullCtx`] or
//! [`PushCtx`] and injects it into a fresh service instance.
//!
//! # Example
//!
//! ```
//! use rpc_router::handler::CallInfo;
//!
//! let call = CallInfo::new("/group/home/test?peer_id=client9090").with_seq(7);
//! assert_eq!(call.path(), "group/home/test");
//! assert_eq!(call.query_param("peer_id"), Some("client9090"));
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::codec::Codec;

/// Connection identity and request parameters of one inbound message.
#[derive(Debug, Clone, Default)]
pub struct CallInfo {
    uri: String,
    path: String,
    query: HashMap<String, String>,
    peer_id: String,
    remote_addr: Option<SocketAddr>,
    seq: u64,
    codec: Option<Codec>,
}

impl CallInfo {
    /// Parse a request URI into its dispatch path and query parameters.
    ///
    /// The leading `/` is trimmed so the path is directly a dispatch name.
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let (raw_path, raw_query) = match uri.split_once('?') {
            Some((p, q)) => (p, q),
            None => (uri.as_str(), ""),
        };
        let path = raw_path.trim_matches('/').to_string();
        let query = url::form_urlencoded::parse(raw_query.as_bytes())
            .into_owned()
            .collect();

        Self {
            path,
            query,
            uri,
            ..Self::default()
        }
    }

    /// Set the remote peer identity.
    pub fn with_peer_id(mut self, peer_id: impl Into<String>) -> Self {
        self.peer_id = peer_id.into();
        self
    }

    /// Set the remote socket address.
    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    /// Set the packet sequence number.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    /// Set the body codec of the message.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub(crate) fn codec_or(mut self, default: Codec) -> Self {
        self.codec.get_or_insert(default);
        self
    }

    /// Original request URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Dispatch path (URI path without leading `/`).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Decoded query parameters.
    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// A single query parameter.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Remote peer identity, falling back to the `peer_id` query parameter.
    pub fn peer_id(&self) -> &str {
        if self.peer_id.is_empty() {
            self.query_param("peer_id").unwrap_or_default()
        } else {
            &self.peer_id
        }
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Body codec of the message; JSON unless the transport said otherwise.
    pub fn codec(&self) -> Codec {
        self.codec.unwrap_or_default()
    }
}

macro_rules! capability_ctx {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            call: Arc<CallInfo>,
        }

        impl $name {
            pub(crate) fn new(call: Arc<CallInfo>) -> Self {
                Self { call }
            }

            /// Full call information.
            pub fn info(&self) -> &CallInfo {
                &self.call
            }

            pub fn uri(&self) -> &str {
                self.call.uri()
            }

            pub fn path(&self) -> &str {
                self.call.path()
            }

            pub fn query(&self) -> &HashMap<String, String> {
                self.call.query()
            }

            pub fn peer_id(&self) -> &str {
                self.call.peer_id()
            }

            pub fn remote_addr(&self) -> Option<SocketAddr> {
                self.call.remote_addr()
            }

            pub fn seq(&self) -> u64 {
                self.call.seq()
            }

            pub fn codec(&self) -> Codec {
                self.call.codec()
            }
        }
    };
}

/// Accessor names of the capability contexts.
///
/// Declared service methods with one of these names are not handlers.
pub(crate) const CTX_METHODS: &[&str] = &[
    "info",
    "uri",
    "path",
    "query",
    "peer_id",
    "remote_addr",
    "seq",
    "codec",
];

capability_ctx!(
    /// Capability context of a pull (request/reply) call.
    PullCtx
);

capability_ctx!(
    /// Capability context of a push (fire-and-forget) call.
    PushCtx
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_info_parses_uri() {
        let call = CallInfo::new("/group/home/test?peer_id=client9090&conn=a%20b");
        assert_eq!(call.uri(), "/group/home/test?peer_id=client9090&conn=a%20b");
        assert_eq!(call.path(), "group/home/test");
        assert_eq!(call.query_param("conn"), Some("a b"));
        assert_eq!(call.peer_id(), "client9090");
    }

    #[test]
    fn test_call_info_without_query() {
        let call = CallInfo::new("home/test/");
        assert_eq!(call.path(), "home/test");
        assert!(call.query().is_empty());
        assert_eq!(call.peer_id(), "");
    }

    #[test]
    fn test_explicit_peer_id_wins_over_query() {
        let call = CallInfo::new("a?peer_id=from_query").with_peer_id("from_session");
        assert_eq!(call.peer_id(), "from_session");
    }

    #[test]
    fn test_codec_defaults() {
        let call = CallInfo::new("a");
        assert_eq!(call.codec(), Codec::Json);

        let call = CallInfo::new("a").codec_or(Codec::MsgPack);
        assert_eq!(call.codec(), Codec::MsgPack);

        let call = CallInfo::new("a").with_codec(Codec::Json).codec_or(Codec::MsgPack);
        assert_eq!(call.codec(), Codec::Json);
    }

    #[test]
    fn test_ctx_exposes_call() {
        let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
        let call = Arc::new(CallInfo::new("/x?y=1").with_remote_addr(addr).with_seq(42));

        let pull = PullCtx::new(call.clone());
        assert_eq!(pull.path(), "x");
        assert_eq!(pull.seq(), 42);
        assert_eq!(pull.remote_addr(), Some(addr));

        let push = PushCtx::new(call);
        assert_eq!(push.query().get("y").map(String::as_str), Some("1"));
        assert_eq!(push.info().seq(), 42);
    }
}
