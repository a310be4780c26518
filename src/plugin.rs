//! Plugin hooks and the ordered [`PluginContainer`] chain.
//!
//! A chain is immutable once built; routers and handlers hold cheap clones.
//! Extending a chain with [`PluginContainer::clone_add`] produces a new
//! chain and leaves the original untouched, which is how groups carry
//! middleware of their own.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rpc_router::plugin::{Hook, Plugin, PluginContainer};
//! use rpc_router::{Handler, Xerror};
//!
//! struct Audit;
//!
//! impl Plugin for Audit {
//!     fn name(&self) -> &str {
//!         "audit"
//!     }
//!
//!     fn hooks(&self) -> &'static [Hook] {
//!         &[Hook::PostReg]
//!     }
//!
//!     fn post_reg(&self, handler: &Handler) -> Result<(), Xerror> {
//!         println!("registered {}", handler.name());
//!         Ok(())
//!     }
//! }
//!
//! let chain = PluginContainer::new().clone_add(&[Arc::new(Audit) as Arc<dyn Plugin>]).unwrap();
//! assert_eq!(chain.names(), vec!["audit"]);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, RouterError, Xerror};
use crate::handler::{CallInfo, Handler};

/// Hook points a plugin may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    /// After a handler is built and before it becomes resolvable.
    PostReg,
    /// Before a handler is invoked for one call.
    PreHandle,
    /// After an outbound session is established (peer level only).
    PostDial,
    /// After an inbound session is accepted (peer level only).
    PostAccept,
}

impl Hook {
    /// Whether the hook has any effect when mounted on a router or group.
    pub fn allowed_on_router(self) -> bool {
        matches!(self, Hook::PostReg | Hook::PreHandle)
    }

    pub fn name(self) -> &'static str {
        match self {
            Hook::PostReg => "PostReg",
            Hook::PreHandle => "PreHandle",
            Hook::PostDial => "PostDial",
            Hook::PostAccept => "PostAccept",
        }
    }
}

/// A plugin of the hook chain.
///
/// Every hook has a no-op default. `hooks` declares which ones the plugin
/// overrides, so mounting points can reject hooks that would never fire.
pub trait Plugin: Send + Sync + 'static {
    /// Unique name within a chain.
    fn name(&self) -> &str;

    /// Hooks this plugin overrides.
    fn hooks(&self) -> &'static [Hook] {
        &[]
    }

    fn post_reg(&self, _handler: &Handler) -> std::result::Result<(), Xerror> {
        Ok(())
    }

    /// Returning an error rejects the call before the service instance is
    /// built. This is where authorization belongs.
    fn pre_handle(&self, _call: &CallInfo, _handler: &Handler) -> std::result::Result<(), Xerror> {
        Ok(())
    }

    fn post_dial(&self, _peer_id: &str) -> std::result::Result<(), Xerror> {
        Ok(())
    }

    fn post_accept(&self, _peer_id: &str) -> std::result::Result<(), Xerror> {
        Ok(())
    }
}

/// Ordered, clonable plugin chain.
#[derive(Clone, Default)]
pub struct PluginContainer {
    plugins: Arc<Vec<Arc<dyn Plugin>>>,
}

impl PluginContainer {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a new chain with `plugins` appended.
    ///
    /// Fails on an empty plugin name or a name already in the chain.
    pub fn clone_add(&self, plugins: &[Arc<dyn Plugin>]) -> Result<Self> {
        if plugins.is_empty() {
            return Ok(self.clone());
        }

        let mut merged: Vec<Arc<dyn Plugin>> = Vec::with_capacity(self.plugins.len() + plugins.len());
        merged.extend(self.plugins.iter().cloned());

        for plugin in plugins {
            let name = plugin.name();
            if name.is_empty() {
                return Err(RouterError::Plugin(
                    "plugin name can not be empty".to_string(),
                ));
            }
            if merged.iter().any(|p| p.name() == name) {
                return Err(RouterError::Plugin(format!("repeat add plugin: {}", name)));
            }
            merged.push(plugin.clone());
        }

        Ok(Self {
            plugins: Arc::new(merged),
        })
    }

    /// Names in chain order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Run `post_reg` on every plugin, stopping at the first failure.
    pub fn post_reg(&self, handler: &Handler) -> Result<()> {
        for plugin in self.plugins.iter() {
            plugin.post_reg(handler).map_err(|source| RouterError::Hook {
                plugin: plugin.name().to_string(),
                name: handler.name().to_string(),
                source,
            })?;
        }
        Ok(())
    }

    /// Run `pre_handle` on every plugin, stopping at the first rejection.
    pub fn pre_handle(&self, call: &CallInfo, handler: &Handler) -> std::result::Result<(), Xerror> {
        self.plugins
            .iter()
            .try_for_each(|plugin| plugin.pre_handle(call, handler))
    }

    pub fn post_dial(&self, peer_id: &str) -> std::result::Result<(), Xerror> {
        self.plugins.iter().try_for_each(|plugin| plugin.post_dial(peer_id))
    }

    pub fn post_accept(&self, peer_id: &str) -> std::result::Result<(), Xerror> {
        self.plugins
            .iter()
            .try_for_each(|plugin| plugin.post_accept(peer_id))
    }
}

impl fmt::Debug for PluginContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Warn about plugins mounted on a router that declare peer-level hooks.
pub(crate) fn warn_invalid_router_hooks(plugins: &[Arc<dyn Plugin>]) {
    for plugin in plugins {
        for hook in plugin.hooks() {
            if !hook.allowed_on_router() {
                tracing::warn!(
                    "invalid {} hook of plugin {}: it is only effective on the peer",
                    hook.name(),
                    plugin.name()
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Plugin for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Gate;

    impl Plugin for Gate {
        fn name(&self) -> &str {
            "gate"
        }

        fn hooks(&self) -> &'static [Hook] {
            &[Hook::PostAccept]
        }

        fn post_accept(&self, peer_id: &str) -> std::result::Result<(), Xerror> {
            if peer_id == "banned" {
                return Err(Xerror::new(Xerror::CODE_UNAUTHORIZED, "banned", peer_id));
            }
            Ok(())
        }
    }

    fn arc(p: impl Plugin) -> Arc<dyn Plugin> {
        Arc::new(p)
    }

    #[test]
    fn test_clone_add_keeps_original() {
        let base = PluginContainer::new().clone_add(&[arc(Named("a"))]).unwrap();
        let extended = base.clone_add(&[arc(Named("b")), arc(Named("c"))]).unwrap();

        assert_eq!(base.names(), vec!["a"]);
        assert_eq!(extended.names(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_clone_add_rejects_duplicate_name() {
        let base = PluginContainer::new().clone_add(&[arc(Named("a"))]).unwrap();
        let err = base.clone_add(&[arc(Named("a"))]).unwrap_err();
        assert_eq!(err.to_string(), "plugin error: repeat add plugin: a");
    }

    #[test]
    fn test_clone_add_rejects_empty_name() {
        let err = PluginContainer::new()
            .clone_add(&[arc(Named(""))])
            .unwrap_err();
        assert!(matches!(err, RouterError::Plugin(_)));
    }

    #[test]
    fn test_clone_add_nothing_is_same_chain() {
        let base = PluginContainer::new().clone_add(&[arc(Named("a"))]).unwrap();
        let same = base.clone_add(&[]).unwrap();
        assert!(Arc::ptr_eq(&base.plugins, &same.plugins));
    }

    #[test]
    fn test_peer_level_hooks() {
        let chain = PluginContainer::new().clone_add(&[arc(Gate)]).unwrap();
        assert!(chain.post_accept("ok").is_ok());
        assert_eq!(chain.post_accept("banned").unwrap_err().code(), 401);
        assert!(chain.post_dial("banned").is_ok());
    }

    #[test]
    fn test_router_hook_policy() {
        assert!(Hook::PostReg.allowed_on_router());
        assert!(Hook::PreHandle.allowed_on_router());
        assert!(!Hook::PostDial.allowed_on_router());
        assert!(!Hook::PostAccept.allowed_on_router());
    }
}
