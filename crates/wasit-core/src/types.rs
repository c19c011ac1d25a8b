//! Wire-facing request and response types
//!
//! Typed structures exchanged with the transport layer. The decision core
//! never encodes or decodes them; framing and ASN.1 belong to the
//! embedding server.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// Result Codes
// ============================================================================

/// Directory-protocol result codes produced by the decision core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultCode {
    /// Operation completed
    Success,
    /// No backend accepted the presented credentials
    InvalidCredentials,
    /// Operation requires an authenticated session
    InsufficientAccessRights,
    /// Operation is statically refused by the proxy
    UnwillingToPerform,
}

impl ResultCode {
    /// Numeric protocol code
    pub fn code(&self) -> u16 {
        match self {
            ResultCode::Success => 0,
            ResultCode::InvalidCredentials => 49,
            ResultCode::InsufficientAccessRights => 50,
            ResultCode::UnwillingToPerform => 53,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResultCode::Success => "success",
            ResultCode::InvalidCredentials => "invalidCredentials",
            ResultCode::InsufficientAccessRights => "insufficientAccessRights",
            ResultCode::UnwillingToPerform => "unwillingToPerform",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ResultCode::Success)
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Directory Entries
// ============================================================================

/// Backend-native user record
///
/// Attribute values are the backend's string form; per-attribute value
/// order is preserved through aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Distinguished name of the entry
    pub dn: String,

    /// Attribute name to ordered values
    #[serde(default)]
    pub attributes: HashMap<String, Vec<String>>,
}

impl User {
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: HashMap::new(),
        }
    }

    /// Builder-style attribute insertion
    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// First value of an attribute
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|v| v.first())
            .map(|s| s.as_str())
    }
}

/// Wire-facing search entry
///
/// Attribute values are opaque byte sequences; the conversion from the
/// backend's strings is a lossless UTF-8 byte cast.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub dn: String,
    pub attributes: HashMap<String, Vec<Bytes>>,
}

impl From<User> for SearchResult {
    fn from(user: User) -> Self {
        let attributes = user
            .attributes
            .into_iter()
            .map(|(name, values)| (name, values.into_iter().map(Bytes::from).collect()))
            .collect();

        Self {
            dn: user.dn,
            attributes,
        }
    }
}

// ============================================================================
// Requests and Responses
// ============================================================================

/// Bind (authentication) request
///
/// Both fields may be empty; an anonymous attempt is not special-cased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindRequest {
    pub dn: String,
    pub password: String,
}

/// Bind outcome
#[derive(Debug, Clone, PartialEq)]
pub struct BindResponse {
    pub code: ResultCode,
    pub matched_dn: String,
}

/// Search request
///
/// The filter is opaque to the proxy and passed to backends verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub base_dn: String,
    pub filter: String,
}

/// Search outcome
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    pub code: ResultCode,
    pub results: Vec<SearchResult>,
}

/// Fixed response for statically refused operations
#[derive(Debug, Clone, PartialEq)]
pub struct DenyResponse {
    pub code: ResultCode,
}

// ============================================================================
// Refused Operations
// ============================================================================

/// Entry addition request
#[derive(Debug, Clone)]
pub struct AddRequest {
    pub dn: String,
    pub attributes: HashMap<String, Vec<Bytes>>,
}

/// Entry deletion request
#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub dn: String,
}

/// Attribute change operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOp {
    Add,
    Delete,
    Replace,
}

/// One attribute change within a modify request
#[derive(Debug, Clone)]
pub struct AttributeChange {
    pub op: ChangeOp,
    pub name: String,
    pub values: Vec<Bytes>,
}

/// Entry modification request
#[derive(Debug, Clone)]
pub struct ModifyRequest {
    pub dn: String,
    pub changes: Vec<AttributeChange>,
}

/// Entry rename request
#[derive(Debug, Clone)]
pub struct ModifyDnRequest {
    pub dn: String,
    pub new_rdn: String,
    pub delete_old_rdn: bool,
}

/// Extended operation request
#[derive(Debug, Clone)]
pub struct ExtendedRequest {
    pub oid: String,
    pub value: Option<Bytes>,
}

/// Password modification request
#[derive(Debug, Clone)]
pub struct PasswordModifyRequest {
    pub user_identity: String,
    pub old_password: String,
    pub new_password: String,
}
