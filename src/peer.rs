//! Peer - owner of the pull and push routers.
//!
//! The [`PeerBuilder`] provides a fluent API for configuring the root plugin
//! chain and defaults. The [`Peer`] owns one router per calling convention;
//! services are registered on them (or on groups derived from them) during
//! startup, after which the transport hands every decoded inbound message to
//! [`Peer::serve_pull`] or [`Peer::serve_push`].
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use rpc_router::handler::{CallInfo, Methods, Pull, PullCtx, Service};
//! use rpc_router::{Peer, Xerror};
//!
//! struct Home {
//!     ctx: Option<PullCtx>,
//! }
//!
//! impl Home {
//!     async fn test(self, args: String) -> Result<String, Xerror> {
//!         let peer = self.ctx.as_ref().map(|c| c.peer_id().to_string()).unwrap_or_default();
//!         Ok(format!("{} from {}", args, peer))
//!     }
//! }
//!
//! impl Service<Pull> for Home {
//!     fn with_ctx(&self, ctx: PullCtx) -> Self {
//!         Home { ctx: Some(ctx) }
//!     }
//!
//!     fn methods(methods: &mut Methods<Pull, Self>) {
//!         methods.method("Test", Home::test);
//!     }
//! }
//!
//! # tokio_test();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test() {
//! let peer = Peer::builder().build().unwrap();
//! peer.pull_router().group("/group", &[]).reg(Home { ctx: None }, &[]);
//!
//! let call = CallInfo::new("/group/home/test?peer_id=client9090");
//! let reply = peer.serve_pull(call, Bytes::from_static(br#""hi""#)).await.unwrap();
//! assert_eq!(reply, Bytes::from_static(br#""hi from client9090""#));
//! # }
//! ```

use std::sync::Arc;

use bytes::Bytes;

use crate::codec::Codec;
use crate::config::PeerConfig;
use crate::error::{Result, Xerror};
use crate::handler::CallInfo;
use crate::plugin::{Plugin, PluginContainer};
use crate::router::{PullRouter, PushRouter};

/// Builder for configuring and creating a [`Peer`].
pub struct PeerBuilder {
    config: PeerConfig,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl PeerBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: PeerConfig::default(),
            plugins: Vec::new(),
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: PeerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the prefix of both root routers.
    ///
    /// Default: empty
    pub fn root_path(mut self, root_path: &str) -> Self {
        self.config.root_path = root_path.to_string();
        self
    }

    /// Set the body codec used when a call does not name one.
    ///
    /// Default: JSON
    pub fn default_codec(mut self, codec: Codec) -> Self {
        self.config.default_codec = codec;
        self
    }

    /// Add a plugin to the root chain shared by both routers.
    pub fn plugin(mut self, plugin: Arc<dyn Plugin>) -> Self {
        self.plugins.push(plugin);
        self
    }

    /// Validate the configuration, compose the root chain and create the
    /// routers.
    pub fn build(self) -> Result<Peer> {
        self.config.validate()?;
        let plugins = PluginContainer::new().clone_add(&self.plugins)?;

        tracing::debug!(
            "peer built: root_path={:?} default_codec={} plugins={:?}",
            self.config.root_path,
            self.config.default_codec,
            plugins.names()
        );

        Ok(Peer {
            pull_router: PullRouter::new(&self.config.root_path, plugins.clone()),
            push_router: PushRouter::new(&self.config.root_path, plugins.clone()),
            plugins,
            config: self.config,
        })
    }
}

impl Default for PeerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Owner of the routers of one application.
pub struct Peer {
    pull_router: PullRouter,
    push_router: PushRouter,
    plugins: PluginContainer,
    config: PeerConfig,
}

impl Peer {
    /// Create a new peer builder.
    pub fn builder() -> PeerBuilder {
        PeerBuilder::new()
    }

    /// Root router for pull handlers.
    pub fn pull_router(&self) -> &PullRouter {
        &self.pull_router
    }

    /// Root router for push handlers.
    pub fn push_router(&self) -> &PushRouter {
        &self.push_router
    }

    /// Root plugin chain, including peer-level hooks.
    pub fn plugins(&self) -> &PluginContainer {
        &self.plugins
    }

    pub fn config(&self) -> &PeerConfig {
        &self.config
    }

    /// Serve one pull message and return the encoded reply.
    ///
    /// A name without handler or fallback yields a 404 [`Xerror`].
    pub async fn serve_pull(&self, call: CallInfo, body: Bytes) -> std::result::Result<Bytes, Xerror> {
        let call = call.codec_or(self.config.default_codec);
        let Some(handler) = self.pull_router.get(call.path()) else {
            tracing::debug!("pull handler not found: {}", call.uri());
            return Err(Xerror::not_found(call.uri()));
        };

        tracing::debug!("serve pull {} with {}", call.uri(), handler.name());
        let reply = handler.handle(call, body).await?;
        Ok(reply.unwrap_or_default())
    }

    /// Serve one push message.
    ///
    /// Errors are for the transport's logs; push has no reply channel.
    pub async fn serve_push(&self, call: CallInfo, body: Bytes) -> std::result::Result<(), Xerror> {
        let call = call.codec_or(self.config.default_codec);
        let Some(handler) = self.push_router.get(call.path()) else {
            tracing::debug!("push handler not found: {}", call.uri());
            return Err(Xerror::not_found(call.uri()));
        };

        tracing::debug!("serve push {} with {}", call.uri(), handler.name());
        handler.handle(call, body).await?;
        Ok(())
    }
}
