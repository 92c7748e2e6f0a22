// SPDX-FileCopyrightText: 2026 Warden Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host-provided shared services.
//!
//! The host's service container is an external collaborator; plugins reach it
//! only through [`HostServices`], keyed by the concrete Rust type.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;

/// Read access to services the host shares with every plugin.
pub trait HostServices: Send + Sync {
    /// Look up the service registered for `type_id`.
    fn lookup(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// A type-keyed service container.
#[derive(Default)]
pub struct ServiceRegistry {
    services: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the shared instance of `T`.
    pub fn provide<T: Any + Send + Sync>(&self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Typed lookup, mainly for host code.
    pub fn get<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.lookup(TypeId::of::<T>())?.downcast::<T>().ok()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl HostServices for ServiceRegistry {
    fn lookup(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services.get(&type_id).map(|entry| Arc::clone(entry.value()))
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct TenantDirectory {
        default_tenant: String,
    }

    #[test]
    fn provide_and_get_by_type() {
        let registry = ServiceRegistry::new();
        assert!(registry.is_empty());

        registry.provide(Arc::new(TenantDirectory {
            default_tenant: "acme".into(),
        }));

        let dir = registry.get::<TenantDirectory>().unwrap();
        assert_eq!(dir.default_tenant, "acme");
        assert!(registry.get::<String>().is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn provide_replaces_previous_instance() {
        let registry = ServiceRegistry::new();
        registry.provide(Arc::new(42u32));
        registry.provide(Arc::new(7u32));
        assert_eq!(*registry.get::<u32>().unwrap(), 7);
        assert_eq!(registry.len(), 1);
    }
}
