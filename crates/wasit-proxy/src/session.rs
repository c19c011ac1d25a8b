//! Per-connection session state
//!
//! One session per accepted connection, exclusively owned by that
//! connection's worker; no locking. The bound identity is written only by
//! the engine's bind handler.

use std::net::SocketAddr;
use tracing::info;
use wasit_core::{Error, Result};

/// Per-connection authorization state
///
/// An empty `bound_dn` means the session is not authenticated; the empty
/// string is never a valid identity. `closed` is terminal.
#[derive(Debug)]
pub struct Session {
    peer: SocketAddr,
    bound_dn: String,
    closed: bool,
}

impl Session {
    pub(crate) fn new(peer: SocketAddr) -> Self {
        Self {
            peer,
            bound_dn: String::new(),
            closed: false,
        }
    }

    /// Peer address the connection was accepted from
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Identity bound so far; empty when unauthenticated
    pub fn bound_dn(&self) -> &str {
        &self.bound_dn
    }

    /// Whether a bind has succeeded on this session
    pub fn is_authenticated(&self) -> bool {
        !self.bound_dn.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::InvalidSession);
        }
        Ok(())
    }

    pub(crate) fn clear_identity(&mut self) {
        self.bound_dn.clear();
    }

    pub(crate) fn set_identity(&mut self, dn: &str) {
        self.bound_dn = dn.to_string();
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
        info!(peer = %self.peer, dn = %self.bound_dn, "Session ended");
    }

    /// Audit line for a bind attempt, attributed to the attempted DN
    ///
    /// The backend that matched is deliberately not surfaced here.
    pub(crate) fn log_auth(&self, dn: &str, successful: bool) {
        if successful {
            info!(peer = %self.peer, dn = %dn, "Authentication successful");
        } else {
            info!(peer = %self.peer, dn = %dn, "Authentication failed");
        }
    }

    pub(crate) fn log_search(&self, base_dn: &str, filter: &str) {
        info!(
            peer = %self.peer,
            dn = %self.bound_dn,
            base_dn = %base_dn,
            filter = %filter,
            "Searching"
        );
    }
}
