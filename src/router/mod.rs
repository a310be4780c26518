//! Router - registration and lookup of pull or push handlers.
//!
//! A [`Router`] is a view onto a registry shared by its whole group lineage:
//! a path prefix and a plugin chain of its own, plus a handle to the one
//! table every prefix collision-checks against.
//!
//! Registration is a setup-phase activity. Failures are programming errors,
//! so `group`, `reg` and `set_unknown` log and terminate the process; the
//! `try_` variants return the [`RouterError`] instead.
//!
//! # Example
//!
//! ```
//! use rpc_router::handler::{Methods, Pull, PullCtx, Service};
//! use rpc_router::plugin::PluginContainer;
//! use rpc_router::{Router, Xerror};
//!
//! struct Home;
//!
//! impl Home {
//!     async fn test(self, args: String) -> Result<String, Xerror> {
//!         Ok(args)
//!     }
//! }
//!
//! impl Service<Pull> for Home {
//!     fn with_ctx(&self, _ctx: PullCtx) -> Self {
//!         Home
//!     }
//!
//!     fn methods(methods: &mut Methods<Pull, Self>) {
//!         methods.method("Test", Home::test);
//!     }
//! }
//!
//! let router = Router::<Pull>::new("/", PluginContainer::new());
//! router.group("/group", &[]).reg(Home, &[]);
//! assert!(router.get("group/home/test").is_some());
//! ```

mod registry;

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

use crate::error::{Result, RouterError, Xerror};
use crate::handler::{
    encode_reply, join_path, make_handlers, BoxFuture, CallInfo, HandleResult, Handler,
    HandlersMaker, Kind, Pull, PullCtx, Push, PushCtx, Service, TypeInfo,
};
use crate::plugin::{warn_invalid_router_hooks, Plugin, PluginContainer};

use registry::Registry;

/// Name of the synthetic pull fallback handler.
pub const UNKNOWN_PULL_HANDLE: &str = "unknown_pull_handle";
/// Name of the synthetic push fallback handler.
pub const UNKNOWN_PUSH_HANDLE: &str = "unknown_push_handle";

/// Router of pull handlers.
pub type PullRouter = Router<Pull>;
/// Router of push handlers.
pub type PushRouter = Router<Push>;

/// Registry view for handlers of calling convention `M`.
///
/// # Thread Safety
///
/// Lookups never block and may run concurrently with anything. Registration
/// is meant to finish before traffic starts; concurrent registrations are
/// serialized internally, and a name becomes resolvable only once its whole
/// `reg` call, `post_reg` hooks included, has completed.
pub struct Router<M: HandlersMaker> {
    registry: Arc<Registry>,
    path_prefix: String,
    plugins: PluginContainer,
    _maker: PhantomData<fn() -> M>,
}

impl<M: HandlersMaker> Router<M> {
    /// Create the root router of a new lineage.
    pub fn new(root_path: &str, plugins: PluginContainer) -> Self {
        Self {
            registry: Arc::new(Registry::new(M::KIND)),
            path_prefix: join_path(&[root_path]),
            plugins,
            _maker: PhantomData,
        }
    }

    /// Derive a router sharing this one's table and fallback.
    pub fn try_group(&self, path_prefix: &str, plugins: &[Arc<dyn Plugin>]) -> Result<Self> {
        let chain = self.plugins.clone_add(plugins)?;
        warn_invalid_router_hooks(plugins);
        Ok(Self {
            registry: Arc::clone(&self.registry),
            path_prefix: join_path(&[&self.path_prefix, path_prefix]),
            plugins: chain,
            _maker: PhantomData,
        })
    }

    /// Like [`Router::try_group`], terminating the process on failure.
    pub fn group(&self, path_prefix: &str, plugins: &[Arc<dyn Plugin>]) -> Self {
        self.try_group(path_prefix, plugins)
            .unwrap_or_else(|e| fatal(e))
    }

    /// Register the methods of `service`, returning the new dispatch names.
    ///
    /// All-or-nothing: if any candidate is malformed, collides or is
    /// rejected by a `post_reg` hook, nothing from this call is committed.
    pub fn try_reg<S: Service<M>>(&self, service: S, plugins: &[Arc<dyn Plugin>]) -> Result<Vec<String>> {
        let chain = self.plugins.clone_add(plugins)?;
        warn_invalid_router_hooks(plugins);

        let candidates = make_handlers::<M, S>(&self.path_prefix, service, &chain)?;
        let names = self.registry.commit(candidates, &chain)?;
        for name in &names {
            tracing::info!("register {} handler: {}", M::KIND, name);
        }
        Ok(names)
    }

    /// Like [`Router::try_reg`], terminating the process on failure.
    pub fn reg<S: Service<M>>(&self, service: S, plugins: &[Arc<dyn Plugin>]) {
        if let Err(e) = self.try_reg(service, plugins) {
            fatal(e);
        }
    }

    /// Resolve a dispatch name.
    ///
    /// Exact match first, then the unknown fallback if one is installed.
    pub fn get(&self, name: &str) -> Option<Arc<Handler>> {
        self.registry.get(name)
    }

    pub fn kind(&self) -> Kind {
        M::KIND
    }

    pub fn path_prefix(&self) -> &str {
        &self.path_prefix
    }

    pub fn plugins(&self) -> &PluginContainer {
        &self.plugins
    }

    /// Registered dispatch names, sorted. The fallback is not listed.
    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn install_unknown(&self, handler: Handler) {
        let name = handler.name().to_string();
        match self.registry.set_unknown(handler) {
            None => tracing::info!("set {} handler", name),
            Some(_) => tracing::warn!("covered {} handler", name),
        }
    }
}

impl Router<Pull> {
    /// Install the fallback for pull names without an exact match.
    ///
    /// The fallback receives the raw body. It is shared by the whole group
    /// lineage; installing again replaces it.
    pub fn try_set_unknown<F, R, Fut>(&self, unknown: F, plugins: &[Arc<dyn Plugin>]) -> Result<()>
    where
        F: Fn(PullCtx, Bytes) -> Fut + Send + Sync + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = std::result::Result<R, Xerror>> + Send + 'static,
    {
        let chain = self.plugins.clone_add(plugins)?;
        warn_invalid_router_hooks(plugins);

        let invoke = move |call: Arc<CallInfo>, body: Bytes| -> BoxFuture<'static, HandleResult> {
            let codec = call.codec();
            let fut = unknown(PullCtx::new(call), body);
            Box::pin(async move {
                match fut.await {
                    Ok(reply) => encode_reply(codec, &reply),
                    Err(e) => Err(e),
                }
            })
        };
        self.install_unknown(Handler::new(
            UNKNOWN_PULL_HANDLE.to_string(),
            Arc::new(invoke),
            TypeInfo::of::<Bytes>(),
            Some(TypeInfo::of::<R>()),
            chain,
        ));
        Ok(())
    }

    /// Like [`Router::try_set_unknown`], terminating the process on failure.
    pub fn set_unknown<F, R, Fut>(&self, unknown: F, plugins: &[Arc<dyn Plugin>])
    where
        F: Fn(PullCtx, Bytes) -> Fut + Send + Sync + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = std::result::Result<R, Xerror>> + Send + 'static,
    {
        if let Err(e) = self.try_set_unknown(unknown, plugins) {
            fatal(e);
        }
    }
}

impl Router<Push> {
    /// Install the fallback for push names without an exact match.
    ///
    /// The fallback receives the raw body. It is shared by the whole group
    /// lineage; installing again replaces it.
    pub fn try_set_unknown<F, Fut>(&self, unknown: F, plugins: &[Arc<dyn Plugin>]) -> Result<()>
    where
        F: Fn(PushCtx, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let chain = self.plugins.clone_add(plugins)?;
        warn_invalid_router_hooks(plugins);

        let invoke = move |call: Arc<CallInfo>, body: Bytes| -> BoxFuture<'static, HandleResult> {
            let fut = unknown(PushCtx::new(call), body);
            Box::pin(async move {
                fut.await;
                Ok(None)
            })
        };
        self.install_unknown(Handler::new(
            UNKNOWN_PUSH_HANDLE.to_string(),
            Arc::new(invoke),
            TypeInfo::of::<Bytes>(),
            None,
            chain,
        ));
        Ok(())
    }

    /// Like [`Router::try_set_unknown`], terminating the process on failure.
    pub fn set_unknown<F, Fut>(&self, unknown: F, plugins: &[Arc<dyn Plugin>])
    where
        F: Fn(PushCtx, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = self.try_set_unknown(unknown, plugins) {
            fatal(e);
        }
    }
}

impl<M: HandlersMaker> Clone for Router<M> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            path_prefix: self.path_prefix.clone(),
            plugins: self.plugins.clone(),
            _maker: PhantomData,
        }
    }
}

impl<M: HandlersMaker> fmt::Debug for Router<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("kind", &M::KIND)
            .field("path_prefix", &self.path_prefix)
            .field("plugins", &self.plugins)
            .field("handlers", &self.len())
            .finish()
    }
}

/// Log a configuration error and terminate the process.
fn fatal(err: RouterError) -> ! {
    tracing::error!("{}", err);
    std::process::exit(1)
}
