//! Config-driven backend construction
//!
//! The embedding process registers one `BackendProvider` per backend
//! kind; `ProviderSet::build_registry` turns the declared configuration
//! into a ready `BackendRegistry` before serving begins. The core ships
//! no provider of its own.

use crate::{Backend, BackendRegistry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use wasit_core::config::{BackendDecl, ProxyConfig};
use wasit_core::{Error, Result};

/// Factory for one backend kind
///
/// Implementations must name the built backend after `decl.name`, since
/// that name keys the registry and the per-backend metrics.
#[async_trait]
pub trait BackendProvider: Send + Sync {
    /// Kind string matched against `BackendDecl::kind`
    fn kind(&self) -> &str;

    /// Build a backend from its declaration
    async fn build(&self, decl: &BackendDecl) -> Result<Arc<dyn Backend>>;
}

/// Kind-keyed set of registered providers
#[derive(Default)]
pub struct ProviderSet {
    providers: HashMap<String, Arc<dyn BackendProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    /// Register a provider, replacing any previous one for the same kind
    pub fn register(&mut self, provider: Arc<dyn BackendProvider>) {
        self.providers.insert(provider.kind().to_string(), provider);
    }

    /// Build every declared backend, in declaration order
    pub async fn build_registry(&self, config: &ProxyConfig) -> Result<BackendRegistry> {
        config.validate()?;

        let mut registry = BackendRegistry::new();

        for decl in &config.backends {
            let provider = self
                .providers
                .get(&decl.kind)
                .ok_or_else(|| Error::UnknownBackendKind(decl.kind.clone()))?;

            debug!(name = %decl.name, kind = %decl.kind, "Building backend");
            registry.register(provider.build(decl).await?);
        }

        Ok(registry)
    }
}
