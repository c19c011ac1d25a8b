//! Backend capability and registry
//!
//! A backend is an independently-queryable identity source the proxy
//! consults during bind and search. Concrete backends are supplied by the
//! embedding process; this crate defines the capability surface, the
//! registry the decision core iterates, and the config-driven provider
//! mechanism that builds backends before serving begins.

mod provider;
mod registry;

pub use provider::{BackendProvider, ProviderSet};
pub use registry::BackendRegistry;

use async_trait::async_trait;
use wasit_core::types::User;
use wasit_core::Result;

/// Identity backend capability
///
/// Backends are queried in registry order. `authenticate` reports plain
/// success or failure: an unreachable or internally failing backend must
/// answer `false` so the bind protocol can move on to the next backend,
/// indistinguishable from a credential mismatch.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Unique backend name, used for registration and metric labels
    fn name(&self) -> &str;

    /// Check a DN/password pair against this backend
    async fn authenticate(&self, dn: &str, password: &str) -> bool;

    /// Fetch all users matching the filter
    async fn get_users(&self, filter: &str) -> Result<Vec<User>>;
}
