//! Shared harness for authorizer integration tests.

#![allow(dead_code)]

use authorizer_service::auth::{
    Authorizer, KeyProvider, PermissionRules, SigningKey, StaticKeyProvider,
};
use authorizer_service::config::Config;
use authorizer_service::observability::init_metrics_recorder;
use authorizer_service::routes::{self, AppState};
use authorizer_service::services::{CounterStore, MockCounterStore, MockRoleManager, RoleManager};
use authorizer_test_utils::{TestKey, TestKeyId};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;

/// Client id every test token is issued to.
pub const CLIENT_ID: &str = "app1";

/// Method ARN prefix used by gateway-style events.
pub const ARN_PREFIX: &str = "arn:aws:execute-api:us-east-1:123456789012:abc123/prod";

static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Global metrics handle for test servers
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder().unwrap_or_else(|_| {
                metrics_exporter_prometheus::PrometheusBuilder::new()
                    .build_recorder()
                    .handle()
            })
        })
        .clone()
}

pub fn signing_key(id: TestKeyId) -> SigningKey {
    let key = TestKey::new(id);
    SigningKey::from_x5c(key.kid(), key.x5c()).expect("fixture certificate parses")
}

/// Key provider preloaded with `k1`.
pub fn static_provider() -> Arc<dyn KeyProvider> {
    Arc::new(StaticKeyProvider::new([signing_key(TestKeyId::K1)]))
}

pub fn authorizer_with(provider: Arc<dyn KeyProvider>) -> Authorizer {
    Authorizer::new(provider, CLIENT_ID, PermissionRules::default())
}

pub fn test_config(auth0_domain: &str, with_role_manager: bool) -> Config {
    let mut vars = HashMap::from([
        ("AUTH0_DOMAIN".to_string(), auth0_domain.to_string()),
        ("OIDC_CLIENT_ID".to_string(), CLIENT_ID.to_string()),
    ]);
    if with_role_manager {
        vars.insert("M2M_CLIENT_ID".to_string(), "m2m-client".to_string());
        vars.insert("M2M_CLIENT_SECRET".to_string(), "m2m-secret".to_string());
        vars.insert("GOLD_MEMBER_ROLE_ID".to_string(), "rol_gold".to_string());
    }
    Config::from_vars(&vars).expect("test config is valid")
}

/// Application wired with mocks.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub counter_store: Arc<MockCounterStore>,
    pub role_manager: Option<Arc<MockRoleManager>>,
}

impl TestApp {
    pub fn new(provider: Arc<dyn KeyProvider>) -> Self {
        Self::build(provider, MockCounterStore::new(), Some(MockRoleManager::new()))
    }

    pub fn build(
        provider: Arc<dyn KeyProvider>,
        counter_store: MockCounterStore,
        role_manager: Option<MockRoleManager>,
    ) -> Self {
        let counter_store = Arc::new(counter_store);
        let role_manager = role_manager.map(Arc::new);

        let state = Arc::new(AppState {
            config: test_config("tenant.example.com", role_manager.is_some()),
            authorizer: Arc::new(authorizer_with(provider)),
            counter_store: counter_store.clone() as Arc<dyn CounterStore>,
            role_manager: role_manager
                .clone()
                .map(|m| m as Arc<dyn RoleManager>),
        });

        Self {
            state,
            counter_store,
            role_manager,
        }
    }

    pub fn router(&self) -> Router {
        routes::build_routes(self.state.clone(), test_metrics_handle())
    }

    /// Serve on a random local port.
    pub async fn spawn(&self) -> TestServer {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let app = self.router();

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {e}");
            }
        });

        TestServer {
            addr,
            _handle: handle,
        }
    }
}

pub struct TestServer {
    addr: SocketAddr,
    _handle: JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
