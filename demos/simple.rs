//! Simple peer - registers a pull and a push service and serves a few
//! messages the way a transport would.
//!
//! This example demonstrates:
//! - Building a peer with a root path and a plugin
//! - Registering services on a group
//! - Installing fallbacks for unknown names
//!
//! ```text
//! RUST_LOG=rpc_router=debug cargo run --example simple
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use rpc_router::handler::{CallInfo, Methods, Pull, PullCtx, Push, PushCtx, Service};
use rpc_router::plugin::{Hook, Plugin};
use rpc_router::{Handler, Peer, Xerror};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pull service answering with the caller's identity.
struct Home {
    ctx: Option<PullCtx>,
}

impl Home {
    async fn test(self, args: HashMap<String, Value>) -> Result<Value, Xerror> {
        let peer_id = self.ctx.as_ref().map(|c| c.peer_id().to_string()).unwrap_or_default();
        Ok(serde_json::json!({
            "arg": args,
            "your_peer_id": peer_id,
        }))
    }
}

impl Service<Pull> for Home {
    fn with_ctx(&self, ctx: PullCtx) -> Self {
        Home { ctx: Some(ctx) }
    }

    fn methods(methods: &mut Methods<Pull, Self>) {
        methods.method("Test", Home::test);
    }
}

/// Push service logging status updates.
struct Status {
    ctx: Option<PushCtx>,
}

impl Status {
    async fn update(self, status: String) {
        let peer_id = self.ctx.as_ref().map(|c| c.peer_id()).unwrap_or_default();
        tracing::info!("status from {}: {}", peer_id, status);
    }
}

impl Service<Push> for Status {
    fn with_ctx(&self, ctx: PushCtx) -> Self {
        Status { ctx: Some(ctx) }
    }

    fn methods(methods: &mut Methods<Push, Self>) {
        methods.method("Update", Status::update);
    }
}

/// Logs every registered handler.
struct Announce;

impl Plugin for Announce {
    fn name(&self) -> &str {
        "announce"
    }

    fn hooks(&self) -> &'static [Hook] {
        &[Hook::PostReg]
    }

    fn post_reg(&self, handler: &Handler) -> Result<(), Xerror> {
        tracing::info!(
            kind = %handler.kind(),
            arg = %handler.arg_elem_type(),
            "announce {}",
            handler.name()
        );
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simple=info,rpc_router=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let peer = Peer::builder().plugin(Arc::new(Announce)).build()?;

    let group = peer.pull_router().group("/group", &[]);
    group.reg(Home { ctx: None }, &[]);
    peer.pull_router().set_unknown(
        |ctx: PullCtx, body: Bytes| async move {
            Ok::<_, Xerror>(format!("unknown {} ({} bytes)", ctx.path(), body.len()))
        },
        &[],
    );

    peer.push_router().reg(Status { ctx: None }, &[]);
    peer.push_router().set_unknown(
        |ctx: PushCtx, _body: Bytes| async move {
            tracing::warn!("dropped push {}", ctx.uri());
        },
        &[],
    );

    let call = CallInfo::new("/group/home/test?peer_id=client9090");
    let reply = peer
        .serve_pull(call, Bytes::from_static(br#"{"author":"henrylee2cn"}"#))
        .await?;
    tracing::info!("reply: {}", String::from_utf8_lossy(&reply));

    let reply = peer
        .serve_pull(CallInfo::new("/group/home/missing"), Bytes::from_static(b"{}"))
        .await?;
    tracing::info!("reply: {}", String::from_utf8_lossy(&reply));

    peer.serve_push(
        CallInfo::new("/status/update").with_peer_id("client9090"),
        Bytes::from_static(br#""online""#),
    )
    .await?;
    peer.serve_push(CallInfo::new("/chat/say"), Bytes::new()).await?;

    Ok(())
}
