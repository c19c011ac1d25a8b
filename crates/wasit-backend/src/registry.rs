//! Backend registry
//!
//! Holds the configured identity backends in registration order. The
//! registry is built before serving begins and shared read-only across
//! connections afterward.

use crate::Backend;
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Ordered, name-keyed set of backends
///
/// Registration order is the consultation order for bind and search.
/// Registering a backend under an already-present name replaces the
/// previous entry and keeps its slot.
#[derive(Default)]
pub struct BackendRegistry {
    backends: Vec<Arc<dyn Backend>>,
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field(
                "backends",
                &self.backends.iter().map(|b| b.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            backends: Vec::new(),
        }
    }

    /// Register one backend, replacing any previous entry with the same name
    pub fn register(&mut self, backend: Arc<dyn Backend>) {
        match self
            .backends
            .iter_mut()
            .find(|b| b.name() == backend.name())
        {
            Some(slot) => *slot = backend,
            None => self.backends.push(backend),
        }
    }

    /// Register several backends at once
    pub fn register_all<I>(&mut self, backends: I)
    where
        I: IntoIterator<Item = Arc<dyn Backend>>,
    {
        let backends: Vec<_> = backends.into_iter().collect();
        info!("Adding {} backends", backends.len());

        for backend in backends {
            self.register(backend);
        }
    }

    /// Look a backend up by name
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.name() == name)
    }

    /// Backends in registration order
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<dyn Backend>> {
        self.backends.iter()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
