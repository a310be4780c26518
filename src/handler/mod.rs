//! Handler module - validated dispatch targets.
//!
//! Provides:
//! - [`Handler`] - immutable binding of one service method to a dispatch name
//! - [`Service`] / [`Methods`] - how a service declares its handler methods
//! - [`Pull`] / [`Push`] - the two calling conventions ([`HandlersMaker`] strategies)
//! - [`CallInfo`], [`PullCtx`], [`PushCtx`] - per-call context
//!
//! # Example
//!
//! ```
//! use rpc_router::handler::{Methods, Pull, PullCtx, Service};
//! use rpc_router::Xerror;
//!
//! struct Home {
//!     ctx: Option<PullCtx>,
//! }
//!
//! impl Home {
//!     async fn test(self, args: Vec<u32>) -> Result<u32, Xerror> {
//!         Ok(args.iter().sum())
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
//! ```

mod context;
mod maker;

use std::any::TypeId;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;

pub use context::{CallInfo, PullCtx, PushCtx};
pub use maker::{HandlersMaker, Methods, Pull, Push, Service};

pub(crate) use maker::{join_path, make_handlers};

use crate::codec::Codec;
use crate::error::Xerror;
use crate::plugin::PluginContainer;

/// Boxed future for handler results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of one handler call: the encoded reply for pull, `None` for push.
pub type HandleResult = Result<Option<Bytes>, Xerror>;

/// Origin factory and bound method, erased over the service type.
pub(crate) type Invoke = dyn Fn(Arc<CallInfo>, Bytes) -> BoxFuture<'static, HandleResult> + Send + Sync;

/// Calling convention of a handler or router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Request/reply.
    Pull,
    /// Fire-and-forget.
    Push,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Pull => "pull",
            Kind::Push => "push",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime description of an argument or reply type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// A pull or push handler.
///
/// Built once during registration and immutable afterwards. Cloning the
/// `Arc<Handler>` handed out by a router is how the transport holds it.
pub struct Handler {
    name: String,
    invoke: Arc<Invoke>,
    arg_elem: TypeInfo,
    /// Only set for pull handlers.
    reply: Option<TypeInfo>,
    plugins: PluginContainer,
}

impl Handler {
    pub(crate) fn new(
        name: String,
        invoke: Arc<Invoke>,
        arg_elem: TypeInfo,
        reply: Option<TypeInfo>,
        plugins: PluginContainer,
    ) -> Self {
        Self {
            name,
            invoke,
            arg_elem,
            reply,
            plugins,
        }
    }

    /// Dispatch name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type the body is decoded into before the method is called.
    pub fn arg_elem_type(&self) -> TypeInfo {
        self.arg_elem
    }

    /// Reply type; `Some` exactly for pull handlers.
    pub fn reply_type(&self) -> Option<TypeInfo> {
        self.reply
    }

    pub fn is_push(&self) -> bool {
        self.reply.is_none()
    }

    pub fn is_pull(&self) -> bool {
        !self.is_push()
    }

    pub fn kind(&self) -> Kind {
        if self.is_pull() {
            Kind::Pull
        } else {
            Kind::Push
        }
    }

    /// Plugin chain captured at registration.
    pub fn plugins(&self) -> &PluginContainer {
        &self.plugins
    }

    /// Invoke the handler for one call.
    ///
    /// Runs the `pre_handle` hooks, builds a fresh service instance through
    /// the origin factory, decodes `body` with the call's codec and awaits
    /// the method. Pull replies are encoded with the same codec.
    pub fn handle(&self, call: CallInfo, body: Bytes) -> BoxFuture<'static, HandleResult> {
        if let Err(e) = self.plugins.pre_handle(&call, self) {
            tracing::debug!("{} handler {} rejected by plugin: {}", self.kind(), self.name, e);
            return Box::pin(std::future::ready(Err(e)));
        }
        (self.invoke)(Arc::new(call), body)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("arg_elem", &self.arg_elem.name())
            .field("reply", &self.reply.map(|r| r.name()))
            .field("plugins", &self.plugins)
            .finish()
    }
}

pub(crate) fn encode_reply<R: Serialize>(codec: Codec, reply: &R) -> HandleResult {
    codec
        .encode(reply)
        .map(|bytes| Some(Bytes::from(bytes)))
        .map_err(Xerror::internal)
}

pub(crate) fn decode_failed(err: crate::error::CodecError) -> BoxFuture<'static, HandleResult> {
    Box::pin(std::future::ready(Err(Xerror::bad_packet(err))))
}
