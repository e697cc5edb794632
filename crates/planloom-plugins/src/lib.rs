//! # Planloom Plugins
//!
//! Sample plugin collection for Planloom (optional).
//!
//! This crate provides:
//! - `DocumentPlugins`: document search, details, custom fields and contents
//! - `OrderPlugins`: recent orders and order details
//! - `UserPlugins`: user name lookup
//!
//! Functions are registered as `"{Plugin}-{Function}"`, for example
//! `DocumentPlugins-GetDocumentDetails`.

mod document;
mod order;
mod user;

use std::sync::Arc;

use planloom_core::function::{FunctionRegistry, Plugin, RegistryError};

pub use document::DocumentPlugins;
pub use order::OrderPlugins;
pub use user::UserPlugins;

/// Every built-in plugin, in registration order.
pub fn builtin_plugins() -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(DocumentPlugins),
        Arc::new(OrderPlugins),
        Arc::new(UserPlugins),
    ]
}

/// Register the built-in plugins accepted by `filter`.
/// Returns the number of functions added.
pub fn register_builtin_plugins<F>(
    registry: &mut FunctionRegistry,
    filter: F,
) -> Result<usize, RegistryError>
where
    F: Fn(&str) -> bool,
{
    let mut added = 0;
    for plugin in builtin_plugins() {
        if filter(plugin.name()) {
            added += registry.register_plugin(plugin.as_ref())?;
        }
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_all_builtin_plugins() {
        let mut registry = FunctionRegistry::new();
        let added = register_builtin_plugins(&mut registry, |_| true).expect("register");
        assert_eq!(added, 9);
        assert!(registry.contains("DocumentPlugins-SearchDocumentNames"));
        assert!(registry.contains("OrderPlugins-GetOrderDetails"));
        assert!(registry.contains("UserPlugins-GetUserNameById"));
    }

    #[test]
    fn test_register_filtered_plugins() {
        let mut registry = FunctionRegistry::new();
        let added = register_builtin_plugins(&mut registry, |name| name == "UserPlugins")
            .expect("register");
        assert_eq!(added, 1);
        assert_eq!(registry.names(), vec!["UserPlugins-GetUserNameById"]);
    }
}
