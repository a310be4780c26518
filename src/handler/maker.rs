//! Handler makers: the pull and push strategies.
//!
//! A service declares its handler methods through [`Service::methods`]. The
//! shape rules of each calling convention are carried by the bounds of
//! [`Methods::method`]:
//!
//! - exactly one owned, decodable argument besides the instance
//! - pull: `Result<R, Xerror>` with a serializable `R`
//! - push: `()`
//!
//! What cannot be expressed in types is checked when the router builds the
//! handlers: the service must be a named struct, method names must be
//! identifiers, and a method may only be declared once.
//!
//! A pull method whose error is not [`Xerror`] does not compile:
//!
//! ```compile_fail
//! use rpc_router::handler::{Methods, Pull, PullCtx, Service};
//!
//! struct Home;
//!
//! impl Home {
//!     async fn test(self, args: u32) -> Result<u32, String> {
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
//!         methods.method("test", Home::test);
//!     }
//! }
//! ```
//!
//! Neither does a push method with a reply:
//!
//! ```compile_fail
//! use rpc_router::handler::{Methods, Push, PushCtx, Service};
//!
//! struct Notify;
//!
//! impl Notify {
//!     async fn ping(self, args: u32) -> u32 {
//!         args
//!     }
//! }
//!
//! impl Service<Push> for Notify {
//!     fn with_ctx(&self, _ctx: PushCtx) -> Self {
//!         Notify
//!     }
//!
//!     fn methods(methods: &mut Methods<Push, Self>) {
//!         methods.method("ping", Notify::ping);
//!     }
//! }
//! ```
//!
//! A pull reply must be serializable:
//!
//! ```compile_fail
//! use rpc_router::handler::{Methods, Pull, PullCtx, Service};
//! use rpc_router::Xerror;
//!
//! struct Opaque;
//!
//! struct Home;
//!
//! impl Home {
//!     async fn test(self, _args: u32) -> Result<Opaque, Xerror> {
//!         Ok(Opaque)
//!     }
//! }
//!
//! impl Service<Pull> for Home {
//!     fn with_ctx(&self, _ctx: PullCtx) -> Self {
//!         Home
//!     }
//!
//!     fn methods(methods: &mut Methods<Pull, Self>) {
//!         methods.method("test", Home::test);
//!     }
//! }
//! ```
//!
//! The argument must be an owned, decodable type. A borrowed one is rejected:
//!
//! ```compile_fail
//! use rpc_router::handler::{Methods, Pull, PullCtx, Service};
//! use rpc_router::Xerror;
//!
//! struct Home;
//!
//! async fn test(_home: Home, args: &'static str) -> Result<u32, Xerror> {
//!     Ok(args.len() as u32)
//! }
//!
//! impl Service<Pull> for Home {
//!     fn with_ctx(&self, _ctx: PullCtx) -> Self {
//!         Home
//!     }
//!
//!     fn methods(methods: &mut Methods<Pull, Self>) {
//!         methods.method("test", test);
//!     }
//! }
//! ```
//!
//! So is a type without `Deserialize`:
//!
//! ```compile_fail
//! use rpc_router::handler::{Methods, Push, PushCtx, Service};
//!
//! struct Opaque;
//!
//! struct Notify;
//!
//! impl Notify {
//!     async fn ping(self, _args: Opaque) {}
//! }
//!
//! impl Service<Push> for Notify {
//!     fn with_ctx(&self, _ctx: PushCtx) -> Self {
//!         Notify
//!     }
//!
//!     fn methods(methods: &mut Methods<Push, Self>) {
//!         methods.method("ping", Notify::ping);
//!     }
//! }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::context::CTX_METHODS;
use super::{
    decode_failed, encode_reply, BoxFuture, CallInfo, HandleResult, Handler, Kind, PullCtx,
    PushCtx, TypeInfo,
};
use crate::codec::Codec;
use crate::error::{Result, RouterError, Xerror};
use crate::plugin::PluginContainer;

mod sealed {
    pub trait Sealed {}

    impl Sealed for super::Pull {}
    impl Sealed for super::Push {}
}

/// A handler-making strategy: one per calling convention.
pub trait HandlersMaker: sealed::Sealed + Send + Sync + 'static {
    const KIND: Kind;

    /// Capability context injected into each per-call instance.
    type Ctx: Clone + Send + 'static;

    #[doc(hidden)]
    fn ctx(call: Arc<CallInfo>) -> Self::Ctx;
}

/// Request/reply calling convention.
#[derive(Debug, Clone, Copy)]
pub struct Pull;

/// Fire-and-forget calling convention.
#[derive(Debug, Clone, Copy)]
pub struct Push;

impl HandlersMaker for Pull {
    const KIND: Kind = Kind::Pull;
    type Ctx = PullCtx;

    fn ctx(call: Arc<CallInfo>) -> PullCtx {
        PullCtx::new(call)
    }
}

impl HandlersMaker for Push {
    const KIND: Kind = Kind::Push;
    type Ctx = PushCtx;

    fn ctx(call: Arc<CallInfo>) -> PushCtx {
        PushCtx::new(call)
    }
}

/// A service whose methods become handlers of calling convention `M`.
///
/// The value passed to `reg` is a prototype: every call gets a fresh
/// instance from [`Service::with_ctx`], carrying the live call context.
pub trait Service<M: HandlersMaker>: Sized + Send + Sync + 'static {
    /// Origin factory: build the instance serving one call.
    fn with_ctx(&self, ctx: M::Ctx) -> Self;

    /// Declare the handler methods.
    fn methods(methods: &mut Methods<M, Self>);

    /// Bare type name used in dispatch names.
    fn type_name() -> &'static str {
        bare_type_name(std::any::type_name::<Self>())
    }
}

type BoundMethod<S> = Box<dyn Fn(S, Codec, Bytes) -> BoxFuture<'static, HandleResult> + Send + Sync>;

struct MethodEntry<S> {
    name: String,
    arg_elem: TypeInfo,
    reply: Option<TypeInfo>,
    call: BoundMethod<S>,
}

/// Method declarations of one service.
pub struct Methods<M: HandlersMaker, S> {
    entries: Vec<MethodEntry<S>>,
    _maker: PhantomData<fn() -> M>,
}

impl<M: HandlersMaker, S> Methods<M, S> {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
            _maker: PhantomData,
        }
    }

    fn push(&mut self, name: &str, arg_elem: TypeInfo, reply: Option<TypeInfo>, call: BoundMethod<S>) {
        self.entries.push(MethodEntry {
            name: name.to_string(),
            arg_elem,
            reply,
            call,
        });
    }

    /// Number of declared methods.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Service<Pull>> Methods<Pull, S> {
    /// Declare a pull method.
    ///
    /// `name` is the method name; the dispatch name uses its snake_case form.
    pub fn method<A, R, F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(S, A) -> Fut + Send + Sync + 'static,
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = std::result::Result<R, Xerror>> + Send + 'static,
    {
        let call = move |service: S, codec: Codec, body: Bytes| -> BoxFuture<'static, HandleResult> {
            let arg: A = match codec.decode(&body) {
                Ok(arg) => arg,
                Err(e) => return decode_failed(e),
            };
            let fut = f(service, arg);
            Box::pin(async move {
                match fut.await {
                    Ok(reply) => encode_reply(codec, &reply),
                    Err(e) => Err(e),
                }
            })
        };
        self.push(
            name,
            TypeInfo::of::<A>(),
            Some(TypeInfo::of::<R>()),
            Box::new(call),
        );
        self
    }
}

impl<S: Service<Push>> Methods<Push, S> {
    /// Declare a push method.
    ///
    /// `name` is the method name; the dispatch name uses its snake_case form.
    pub fn method<A, F, Fut>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(S, A) -> Fut + Send + Sync + 'static,
        A: DeserializeOwned + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let call = move |service: S, codec: Codec, body: Bytes| -> BoxFuture<'static, HandleResult> {
            let arg: A = match codec.decode(&body) {
                Ok(arg) => arg,
                Err(e) => return decode_failed(e),
            };
            let fut = f(service, arg);
            Box::pin(async move {
                fut.await;
                Ok(None)
            })
        };
        self.push(name, TypeInfo::of::<A>(), None, Box::new(call));
        self
    }
}

/// Build the candidate handlers of `service` under `path_prefix`.
///
/// Stops at the first violation; no partial list is returned.
pub(crate) fn make_handlers<M, S>(
    path_prefix: &str,
    service: S,
    plugins: &PluginContainer,
) -> Result<Vec<Handler>>
where
    M: HandlersMaker,
    S: Service<M>,
{
    let type_name = S::type_name();
    if !is_identifier(type_name) {
        return Err(RouterError::NotStruct {
            kind: M::KIND,
            type_name: std::any::type_name::<S>(),
        });
    }

    let mut methods = Methods::<M, S>::new();
    S::methods(&mut methods);

    let type_snake = snake_name(type_name);
    let origin = Arc::new(service);
    let mut declared = HashSet::new();
    let mut handlers = Vec::with_capacity(methods.len());

    for entry in methods.entries {
        if !is_identifier(&entry.name) {
            return Err(RouterError::InvalidMethodName {
                kind: M::KIND,
                type_name,
                method: entry.name,
            });
        }
        if !declared.insert(entry.name.clone()) {
            return Err(RouterError::DuplicateMethod {
                kind: M::KIND,
                type_name,
                method: entry.name,
            });
        }
        // Unexported.
        if entry.name.starts_with('_') {
            tracing::debug!("skip {} method {}.{}", M::KIND, type_name, entry.name);
            continue;
        }
        let method_snake = snake_name(&entry.name);
        if CTX_METHODS.contains(&method_snake.as_str()) {
            tracing::debug!(
                "skip {} method {}.{}: shadows a context accessor",
                M::KIND,
                type_name,
                entry.name
            );
            continue;
        }

        let name = join_path(&[path_prefix, &type_snake, &method_snake]);
        let origin = Arc::clone(&origin);
        let bound = entry.call;
        let invoke = move |call: Arc<CallInfo>, body: Bytes| {
            let codec = call.codec();
            let instance = origin.with_ctx(M::ctx(call));
            bound(instance, codec, body)
        };

        handlers.push(Handler::new(
            name,
            Arc::new(invoke),
            entry.arg_elem,
            entry.reply,
            plugins.clone(),
        ));
    }

    Ok(handlers)
}

/// Snake-case form used in dispatch names.
///
/// Every ASCII uppercase letter after the first non-`_` character gets a
/// `_` in front, then the whole name is lowercased. Acronyms are not
/// collapsed: `GetURL` becomes `get_u_r_l`.
pub(crate) fn snake_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() * 2);
    let mut seen_word = false;
    for c in name.chars() {
        if seen_word && c.is_ascii_uppercase() {
            out.push('_');
        }
        if c != '_' {
            seen_word = true;
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Last path segment of a type name, without generic arguments.
///
/// References, pointers, tuples and arrays are returned unchanged so they
/// fail the identifier check.
pub(crate) fn bare_type_name(full: &'static str) -> &'static str {
    if full.starts_with(['&', '*', '(', '[']) {
        return full;
    }
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Join path segments the way URI paths are cleaned: empty and `.` segments
/// vanish, `..` drops the previous one, and the result has no leading or
/// trailing `/`.
///
/// The result is always rooted: a `..` with nothing before it is dropped
/// rather than kept, so no name can climb above the root router.
pub(crate) fn join_path(parts: &[&str]) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for part in parts {
        for seg in part.split('/') {
            match seg {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Home;

    impl Home {
        async fn test(self, args: HashMap<String, serde_json::Value>) -> std::result::Result<serde_json::Value, Xerror> {
            Ok(serde_json::json!(args.len()))
        }

        async fn get_user(self, id: u64) -> std::result::Result<String, Xerror> {
            Ok(format!("user-{}", id))
        }

        async fn peer(self, _args: ()) -> std::result::Result<(), Xerror> {
            Ok(())
        }
    }

    impl Service<Pull> for Home {
        fn with_ctx(&self, _ctx: PullCtx) -> Self {
            Home
        }

        fn methods(methods: &mut Methods<Pull, Self>) {
            methods
                .method("Test", Home::test)
                .method("GetUser", Home::get_user)
                .method("PeerId", Home::peer)
                .method("_internal", Home::peer);
        }
    }

    struct Notice;

    impl Notice {
        async fn ping(self, _args: String) {}
    }

    impl Service<Push> for Notice {
        fn with_ctx(&self, _ctx: PushCtx) -> Self {
            Notice
        }

        fn methods(methods: &mut Methods<Push, Self>) {
            methods.method("Ping", Notice::ping);
        }
    }

    struct BadName;

    impl Service<Pull> for BadName {
        fn with_ctx(&self, _ctx: PullCtx) -> Self {
            BadName
        }

        fn methods(methods: &mut Methods<Pull, Self>) {
            methods.method("get/user", |_s: BadName, _a: u8| async { Ok::<_, Xerror>(0u8) });
        }
    }

    struct Twice;

    impl Service<Pull> for Twice {
        fn with_ctx(&self, _ctx: PullCtx) -> Self {
            Twice
        }

        fn methods(methods: &mut Methods<Pull, Self>) {
            methods
                .method("Run", |_s: Twice, _a: u8| async { Ok::<_, Xerror>(1u8) })
                .method("Run", |_s: Twice, _a: u8| async { Ok::<_, Xerror>(2u8) });
        }
    }

    impl Service<Pull> for (u8, u8) {
        fn with_ctx(&self, _ctx: PullCtx) -> Self {
            *self
        }

        fn methods(_methods: &mut Methods<Pull, Self>) {}
    }

    fn names(handlers: &[Handler]) -> Vec<&str> {
        handlers.iter().map(|h| h.name()).collect()
    }

    #[test]
    fn test_pull_maker_builds_eligible_methods() {
        let handlers = make_handlers::<Pull, _>("/group", Home, &PluginContainer::new()).unwrap();

        assert_eq!(names(&handlers), vec!["group/home/test", "group/home/get_user"]);
        assert!(handlers.iter().all(Handler::is_pull));
        assert!(handlers[1].arg_elem_type().is::<u64>());
        assert!(handlers[1].reply_type().unwrap().is::<String>());
    }

    #[test]
    fn test_push_maker_has_no_reply() {
        let handlers = make_handlers::<Push, _>("", Notice, &PluginContainer::new()).unwrap();

        assert_eq!(names(&handlers), vec!["notice/ping"]);
        assert!(handlers[0].is_push());
        assert!(handlers[0].reply_type().is_none());
        assert!(handlers[0].arg_elem_type().is::<String>());
    }

    #[test]
    fn test_invalid_method_name_rejected() {
        let err = make_handlers::<Pull, _>("", BadName, &PluginContainer::new()).unwrap_err();
        assert!(matches!(err, RouterError::InvalidMethodName { ref method, .. } if method == "get/user"));
        assert_eq!(
            err.to_string(),
            "register pull handler: BadName.get/user is not a valid method name"
        );
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let err = make_handlers::<Pull, _>("", Twice, &PluginContainer::new()).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateMethod { .. }));
    }

    #[test]
    fn test_non_struct_rejected() {
        let err = make_handlers::<Pull, _>("", (1u8, 2u8), &PluginContainer::new()).unwrap_err();
        assert!(matches!(err, RouterError::NotStruct { kind: Kind::Pull, .. }));
    }

    #[test]
    fn test_bare_type_name() {
        assert_eq!(bare_type_name("app::services::Home"), "Home");
        assert_eq!(bare_type_name("app::Wrapper<app::Inner>"), "Wrapper");
        assert_eq!(bare_type_name("&app::Home"), "&app::Home");
        assert_eq!(bare_type_name("(u8, u8)"), "(u8, u8)");
        assert_eq!(bare_type_name("Home"), "Home");
    }

    #[test]
    fn test_snake_name_splits_every_capital() {
        assert_eq!(snake_name("Home"), "home");
        assert_eq!(snake_name("GetUser"), "get_user");
        assert_eq!(snake_name("HTTPServer"), "h_t_t_p_server");
        assert_eq!(snake_name("GetURL"), "get_u_r_l");
        assert_eq!(snake_name("already_snake"), "already_snake");
        assert_eq!(snake_name("_Private"), "_private");
        assert_eq!(snake_name("V2Api"), "v2_api");
    }

    struct HTTPServer;

    impl HTTPServer {
        async fn get_url(self, _args: ()) -> std::result::Result<String, Xerror> {
            Ok(String::new())
        }
    }

    impl Service<Pull> for HTTPServer {
        fn with_ctx(&self, _ctx: PullCtx) -> Self {
            HTTPServer
        }

        fn methods(methods: &mut Methods<Pull, Self>) {
            methods.method("GetURL", HTTPServer::get_url);
        }
    }

    #[test]
    fn test_acronyms_keep_one_underscore_per_capital() {
        let handlers = make_handlers::<Pull, _>("", HTTPServer, &PluginContainer::new()).unwrap();
        assert_eq!(names(&handlers), vec!["h_t_t_p_server/get_u_r_l"]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path(&["/", "home", "test"]), "home/test");
        assert_eq!(join_path(&["/group", "home", "test"]), "group/home/test");
        assert_eq!(join_path(&["a/", "/b//", "c"]), "a/b/c");
        assert_eq!(join_path(&["a/./b/../c"]), "a/c");
        assert_eq!(join_path(&["", ""]), "");
        assert_eq!(join_path(&["..", "a"]), "a");
        assert_eq!(join_path(&["/g", "../../a"]), "a");
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("GetUser"));
        assert!(is_identifier("_private"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1st"));
        assert!(!is_identifier("get-user"));
    }
}
