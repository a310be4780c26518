//! # rpc-router
//!
//! Typed handler registration and dispatch tables for a bidirectional RPC
//! framework.
//!
//! Application services are registered on a [`Router`] during startup. The
//! router turns each declared service method into a [`Handler`] addressed by
//! a slash-separated dispatch name, and the transport resolves inbound
//! messages against those names afterwards.
//!
//! ## Architecture
//!
//! - **Pull** handlers: request/reply, return `Result<R, Xerror>`
//! - **Push** handlers: fire-and-forget, return nothing
//! - **Groups**: routers derived with [`Router::group`] add a path prefix and
//!   plugins but share one table (and one fallback) with their root
//! - **Plugins**: `post_reg` hooks run at registration, `pre_handle` hooks
//!   before each call
//!
//! ## Example
//!
//! ```
//! use rpc_router::handler::{Methods, Push, PushCtx, Service};
//! use rpc_router::Peer;
//!
//! struct Chat;
//!
//! impl Chat {
//!     async fn say(self, line: String) {
//!         println!("{}", line);
//!     }
//! }
//!
//! impl Service<Push> for Chat {
//!     fn with_ctx(&self, _ctx: PushCtx) -> Self {
//!         Chat
//!     }
//!
//!     fn methods(methods: &mut Methods<Push, Self>) {
//!         methods.method("Say", Chat::say);
//!     }
//! }
//!
//! let peer = Peer::builder().root_path("/room").build().unwrap();
//! peer.push_router().reg(Chat, &[]);
//! assert!(peer.push_router().get("room/chat/say").is_some());
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod handler;
pub mod plugin;
pub mod router;

mod peer;

pub use config::PeerConfig;
pub use error::{Result, RouterError, Xerror};
pub use handler::{Handler, Kind};
pub use peer::{Peer, PeerBuilder};
pub use router::{PullRouter, PushRouter, Router};
