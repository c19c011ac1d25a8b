//! Proxy decision engine
//!
//! Classifies every incoming operation, runs the bind and search
//! protocols, and statically refuses every mutating operation. The engine
//! owns all session state transitions; one engine serves every
//! connection, per-connection state lives in the `Session` values it
//! hands out.

use crate::metrics::{Action, BackendAction, ProxyMetrics};
use crate::search;
use crate::session::Session;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use wasit_backend::BackendRegistry;
use wasit_core::types::*;
use wasit_core::Result;

pub struct ProxyEngine {
    registry: Arc<BackendRegistry>,
    metrics: Arc<ProxyMetrics>,
}

impl ProxyEngine {
    pub fn new(registry: Arc<BackendRegistry>, metrics: Arc<ProxyMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Accept a new connection
    ///
    /// Never refuses; capacity limits belong to the transport.
    pub fn connect(&self, peer: SocketAddr) -> Session {
        info!(peer = %peer, "New session");
        self.metrics.record_request(Action::Connect);

        Session::new(peer)
    }

    /// End a session
    ///
    /// A session is counted and logged as ended only once; calling this
    /// again is a no-op.
    pub fn disconnect(&self, session: &mut Session) {
        if session.is_closed() {
            return;
        }

        self.metrics.record_request(Action::Disconnect);
        session.close();
    }

    /// Authenticate against the registered backends, first success wins
    ///
    /// The previous identity is dropped before the attempt, so a failed
    /// re-bind leaves the session unauthenticated. A backend answering
    /// `false` for any reason, wrong credentials or backend failure, is
    /// skipped in favor of the next one.
    pub async fn bind(&self, session: &mut Session, req: &BindRequest) -> Result<BindResponse> {
        session.ensure_open()?;
        debug!(dn = %req.dn, "Bind requested");
        self.metrics.record_request(Action::Bind);

        session.clear_identity();

        let mut response = BindResponse {
            code: ResultCode::InvalidCredentials,
            matched_dn: String::new(),
        };

        for backend in self.registry.iter() {
            let start = Instant::now();
            let authenticated = backend.authenticate(&req.dn, &req.password).await;
            self.metrics
                .record_backend_duration(BackendAction::Auth, backend.name(), start.elapsed());

            if authenticated {
                session.set_identity(&req.dn);
                response.code = ResultCode::Success;
                response.matched_dn = req.dn.clone();
                break;
            }
        }

        session.log_auth(&req.dn, response.code.is_success());

        Ok(response)
    }

    /// Search every backend and concatenate the results
    ///
    /// Requires an authenticated session. The base DN performs no
    /// scoping; every backend sees the full filter. A single failing
    /// backend fails the whole search.
    pub async fn search(&self, session: &Session, req: &SearchRequest) -> Result<SearchResponse> {
        session.ensure_open()?;
        self.metrics.record_request(Action::Search);

        if !session.is_authenticated() {
            return Ok(SearchResponse {
                code: ResultCode::InsufficientAccessRights,
                results: Vec::new(),
            });
        }

        session.log_search(&req.base_dn, &req.filter);

        let results = search::aggregate(&self.registry, &self.metrics, &req.filter).await?;

        Ok(SearchResponse {
            code: ResultCode::Success,
            results,
        })
    }

    /// Identity bound to the session, empty when unauthenticated
    pub fn whoami(&self, session: &Session) -> Result<String> {
        session.ensure_open()?;
        self.metrics.record_request(Action::Whoami);
        debug!(peer = %session.peer(), "Whoami");

        Ok(session.bound_dn().to_string())
    }

    // The proxy is read-only: every mutating operation is refused without
    // reading the request or the session state.

    pub fn add(&self, _session: &Session, _req: &AddRequest) -> DenyResponse {
        self.metrics.record_request(Action::Add);
        DenyResponse {
            code: ResultCode::UnwillingToPerform,
        }
    }

    pub fn delete(&self, _session: &Session, _req: &DeleteRequest) -> DenyResponse {
        self.metrics.record_request(Action::Delete);
        DenyResponse {
            code: ResultCode::UnwillingToPerform,
        }
    }

    pub fn modify(&self, _session: &Session, _req: &ModifyRequest) -> DenyResponse {
        self.metrics.record_request(Action::Modify);
        DenyResponse {
            code: ResultCode::UnwillingToPerform,
        }
    }

    pub fn modify_dn(&self, _session: &Session, _req: &ModifyDnRequest) -> DenyResponse {
        self.metrics.record_request(Action::ModifyDn);
        DenyResponse {
            code: ResultCode::UnwillingToPerform,
        }
    }

    pub fn extended(&self, _session: &Session, _req: &ExtendedRequest) -> DenyResponse {
        self.metrics.record_request(Action::Extended);
        DenyResponse {
            code: ResultCode::UnwillingToPerform,
        }
    }

    /// Password modification is refused with an empty result payload
    /// rather than an error-coded response
    pub fn password_modify(&self, _session: &Session, _req: &PasswordModifyRequest) -> Vec<u8> {
        self.metrics.record_request(Action::ModifyPassword);
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wasit_backend::Backend;
    use wasit_core::Error;

    struct StubBackend {
        name: String,
        accepts: Option<(String, String)>,
        users: Vec<User>,
        fail_search: bool,
        auth_calls: AtomicUsize,
        search_calls: AtomicUsize,
    }

    impl StubBackend {
        fn named(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                accepts: None,
                users: Vec::new(),
                fail_search: false,
                auth_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
            })
        }

        fn accepting(name: &str, dn: &str, password: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                accepts: Some((dn.to_string(), password.to_string())),
                users: Vec::new(),
                fail_search: false,
                auth_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
            })
        }

        fn with_users(name: &str, users: Vec<User>) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                accepts: None,
                users,
                fail_search: false,
                auth_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
            })
        }

        fn failing_search(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                accepts: None,
                users: Vec::new(),
                fail_search: true,
                auth_calls: AtomicUsize::new(0),
                search_calls: AtomicUsize::new(0),
            })
        }

        fn auth_calls(&self) -> usize {
            self.auth_calls.load(Ordering::SeqCst)
        }

        fn search_calls(&self) -> usize {
            self.search_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Backend for StubBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn authenticate(&self, dn: &str, password: &str) -> bool {
            self.auth_calls.fetch_add(1, Ordering::SeqCst);
            self.accepts
                .as_ref()
                .map(|(d, p)| d == dn && p == password)
                .unwrap_or(false)
        }

        async fn get_users(&self, _filter: &str) -> Result<Vec<User>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_search {
                return Err(Error::Backend("backend offline".to_string()));
            }
            Ok(self.users.clone())
        }
    }

    fn engine_with(backends: &[Arc<StubBackend>]) -> ProxyEngine {
        let mut registry = BackendRegistry::new();
        for backend in backends {
            registry.register(backend.clone());
        }
        ProxyEngine::new(Arc::new(registry), Arc::new(ProxyMetrics::disabled()))
    }

    fn peer() -> SocketAddr {
        "10.0.0.7:52044".parse().unwrap()
    }

    fn bind_req(dn: &str, password: &str) -> BindRequest {
        BindRequest {
            dn: dn.to_string(),
            password: password.to_string(),
        }
    }

    fn search_req(base_dn: &str, filter: &str) -> SearchRequest {
        SearchRequest {
            base_dn: base_dn.to_string(),
            filter: filter.to_string(),
        }
    }

    #[tokio::test]
    async fn test_bind_with_no_backends_fails() {
        let engine = engine_with(&[]);
        let mut session = engine.connect(peer());

        let res = engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "secret"))
            .await
            .unwrap();

        assert_eq!(res.code, ResultCode::InvalidCredentials);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_bind_first_success_short_circuits() {
        let a = StubBackend::named("a");
        let b = StubBackend::accepting("b", "cn=admin,dc=x", "secret");
        let c = StubBackend::accepting("c", "cn=admin,dc=x", "secret");
        let engine = engine_with(&[a.clone(), b.clone(), c.clone()]);
        let mut session = engine.connect(peer());

        let res = engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "secret"))
            .await
            .unwrap();

        assert_eq!(res.code, ResultCode::Success);
        assert_eq!(res.matched_dn, "cn=admin,dc=x");
        assert_eq!(session.bound_dn(), "cn=admin,dc=x");

        // b matched, so c was never consulted
        assert_eq!(a.auth_calls(), 1);
        assert_eq!(b.auth_calls(), 1);
        assert_eq!(c.auth_calls(), 0);
    }

    #[tokio::test]
    async fn test_failed_rebind_drops_previous_identity() {
        let a = StubBackend::accepting("a", "cn=admin,dc=x", "secret");
        let engine = engine_with(&[a]);
        let mut session = engine.connect(peer());

        engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "secret"))
            .await
            .unwrap();
        assert!(session.is_authenticated());

        let res = engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "wrong"))
            .await
            .unwrap();

        assert_eq!(res.code, ResultCode::InvalidCredentials);
        assert!(!session.is_authenticated());
        assert_eq!(session.bound_dn(), "");
    }

    #[tokio::test]
    async fn test_anonymous_bind_is_not_special_cased() {
        let a = StubBackend::accepting("a", "", "");
        let engine = engine_with(&[a]);
        let mut session = engine.connect(peer());

        let res = engine.bind(&mut session, &bind_req("", "")).await.unwrap();

        // The backend accepted, but an empty DN is still no identity
        assert_eq!(res.code, ResultCode::Success);
        assert!(!session.is_authenticated());

        let search = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await
            .unwrap();
        assert_eq!(search.code, ResultCode::InsufficientAccessRights);
    }

    #[tokio::test]
    async fn test_whoami_is_idempotent() {
        let a = StubBackend::accepting("a", "cn=admin,dc=x", "secret");
        let engine = engine_with(&[a]);
        let mut session = engine.connect(peer());

        assert_eq!(engine.whoami(&session).unwrap(), "");
        assert_eq!(engine.whoami(&session).unwrap(), "");

        engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "secret"))
            .await
            .unwrap();

        assert_eq!(engine.whoami(&session).unwrap(), "cn=admin,dc=x");
        assert_eq!(engine.whoami(&session).unwrap(), "cn=admin,dc=x");
    }

    #[tokio::test]
    async fn test_unauthenticated_search_is_denied_without_backend_calls() {
        let a = StubBackend::with_users("a", vec![User::new("cn=u1,dc=x")]);
        let engine = engine_with(&[a.clone()]);
        let session = engine.connect(peer());

        let res = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await
            .unwrap();

        assert_eq!(res.code, ResultCode::InsufficientAccessRights);
        assert!(res.results.is_empty());
        assert_eq!(a.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_with_no_backends_returns_empty_success() {
        let engine = engine_with(&[]);
        let mut session = engine.connect(peer());
        session.set_identity("cn=admin,dc=x");

        let res = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await
            .unwrap();

        assert_eq!(res.code, ResultCode::Success);
        assert!(res.results.is_empty());
    }

    #[tokio::test]
    async fn test_search_concatenates_in_registry_order() {
        let a = StubBackend::with_users("a", vec![User::new("cn=u1,dc=x")]);
        let b = StubBackend::with_users(
            "b",
            vec![User::new("cn=u2,dc=x"), User::new("cn=u3,dc=x")],
        );
        let engine = engine_with(&[a, b]);
        let mut session = engine.connect(peer());
        session.set_identity("cn=admin,dc=x");

        let res = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await
            .unwrap();

        assert_eq!(res.code, ResultCode::Success);
        let dns: Vec<&str> = res.results.iter().map(|r| r.dn.as_str()).collect();
        assert_eq!(dns, vec!["cn=u1,dc=x", "cn=u2,dc=x", "cn=u3,dc=x"]);
    }

    #[tokio::test]
    async fn test_search_aborts_on_first_backend_error() {
        let a = StubBackend::failing_search("a");
        let b = StubBackend::with_users("b", vec![User::new("cn=u2,dc=x")]);
        let engine = engine_with(&[a.clone(), b.clone()]);
        let mut session = engine.connect(peer());
        session.set_identity("cn=admin,dc=x");

        let err = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "BackendError");
        assert_eq!(a.search_calls(), 1);
        assert_eq!(b.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_discards_partial_results_on_late_error() {
        let a = StubBackend::with_users("a", vec![User::new("cn=u1,dc=x")]);
        let b = StubBackend::failing_search("b");
        let engine = engine_with(&[a.clone(), b]);
        let mut session = engine.connect(peer());
        session.set_identity("cn=admin,dc=x");

        let res = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await;

        assert!(res.is_err());
        assert_eq!(a.search_calls(), 1);
    }

    #[tokio::test]
    async fn test_mutating_operations_always_denied() {
        let a = StubBackend::accepting("a", "cn=admin,dc=x", "secret");
        let engine = engine_with(&[a]);
        let mut session = engine.connect(peer());

        let assert_denied = |engine: &ProxyEngine, session: &Session| {
            let deny = ResultCode::UnwillingToPerform;

            let add = AddRequest {
                dn: "cn=new,dc=x".to_string(),
                attributes: Default::default(),
            };
            assert_eq!(engine.add(session, &add).code, deny);

            let delete = DeleteRequest {
                dn: "cn=old,dc=x".to_string(),
            };
            assert_eq!(engine.delete(session, &delete).code, deny);

            let modify = ModifyRequest {
                dn: "cn=u1,dc=x".to_string(),
                changes: vec![AttributeChange {
                    op: ChangeOp::Replace,
                    name: "mail".to_string(),
                    values: vec![Bytes::from("new@x")],
                }],
            };
            assert_eq!(engine.modify(session, &modify).code, deny);

            let rename = ModifyDnRequest {
                dn: "cn=u1,dc=x".to_string(),
                new_rdn: "cn=u2".to_string(),
                delete_old_rdn: true,
            };
            assert_eq!(engine.modify_dn(session, &rename).code, deny);

            let extended = ExtendedRequest {
                oid: "1.3.6.1.4.1.4203.1.11.3".to_string(),
                value: None,
            };
            assert_eq!(engine.extended(session, &extended).code, deny);
        };

        // Unauthenticated
        assert_denied(&engine, &session);

        // Authenticated
        engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "secret"))
            .await
            .unwrap();
        assert_denied(&engine, &session);

        // Closed
        engine.disconnect(&mut session);
        assert_denied(&engine, &session);
    }

    #[tokio::test]
    async fn test_password_modify_returns_empty_payload() {
        let engine = engine_with(&[]);
        let session = engine.connect(peer());

        let req = PasswordModifyRequest {
            user_identity: "cn=admin,dc=x".to_string(),
            old_password: "secret".to_string(),
            new_password: "hunter2".to_string(),
        };

        assert!(engine.password_modify(&session, &req).is_empty());
    }

    #[tokio::test]
    async fn test_closed_session_rejects_bind_search_whoami() {
        let engine = engine_with(&[]);
        let mut session = engine.connect(peer());

        engine.disconnect(&mut session);
        // Second disconnect is a no-op
        engine.disconnect(&mut session);

        assert!(matches!(
            engine.bind(&mut session, &bind_req("cn=x", "pw")).await,
            Err(Error::InvalidSession)
        ));
        assert!(matches!(
            engine.search(&session, &search_req("dc=x", "(cn=*)")).await,
            Err(Error::InvalidSession)
        ));
        assert!(matches!(
            engine.whoami(&session),
            Err(Error::InvalidSession)
        ));
    }

    #[tokio::test]
    async fn test_full_proxy_flow() {
        let users = vec![User::new("uid=jdoe,ou=users,dc=x")
            .with_attribute("uid", ["jdoe"])
            .with_attribute("mail", ["jdoe@example.com"])];
        let ldap = Arc::new(StubBackend {
            name: "ldap".to_string(),
            accepts: Some(("cn=admin,dc=x".to_string(), "secret".to_string())),
            users,
            fail_search: false,
            auth_calls: AtomicUsize::new(0),
            search_calls: AtomicUsize::new(0),
        });
        let engine = engine_with(&[ldap]);
        let mut session = engine.connect(peer());

        let bind = engine
            .bind(&mut session, &bind_req("cn=admin,dc=x", "secret"))
            .await
            .unwrap();
        assert_eq!(bind.code, ResultCode::Success);
        assert_eq!(session.bound_dn(), "cn=admin,dc=x");

        let search = engine
            .search(&session, &search_req("dc=x", "(objectClass=*)"))
            .await
            .unwrap();
        assert_eq!(search.code, ResultCode::Success);
        assert_eq!(search.results.len(), 1);
        assert_eq!(search.results[0].dn, "uid=jdoe,ou=users,dc=x");
        assert_eq!(
            search.results[0].attributes["mail"],
            vec![Bytes::from("jdoe@example.com")]
        );

        engine.disconnect(&mut session);
        assert!(session.is_closed());
    }
}
