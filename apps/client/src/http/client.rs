use std::sync::Arc;

use futures::FutureExt;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::errors::ApiError;
use crate::http::registry::{Claim, PendingRegistry};
use crate::http::{ApiRequest, ApiResponse, Transport};
use crate::storage::{KeyValueStore, TOKEN_KEY};

/// Invoked once per call that comes back 401, after the token is cleared.
/// The CLI uses it to tell the user to log in again.
pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

/// The single HTTP client every resource API goes through.
///
/// Cheap to clone; clones share the pending-request registry, the token store
/// and the unauthorized handler.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    registry: PendingRegistry,
    on_unauthorized: UnauthorizedHandler,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        on_unauthorized: UnauthorizedHandler,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                store,
                registry: PendingRegistry::new(),
                on_unauthorized,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    pub fn registry(&self) -> &PendingRegistry {
        &self.inner.registry
    }

    /// Sends a request.
    ///
    /// Identical GETs issued while one is in flight share that call's outcome
    /// (tagged `deduplicated`). A 401 clears the persisted token and fires the
    /// unauthorized handler before the error is returned.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let Some(key) = request.fingerprint() else {
            let request = self.inner.authorize(request);
            return self.inner.dispatch(request).await;
        };

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();

        // Spawned so the call settles and releases its entry even if every
        // awaiting caller goes away.
        let claim = self.inner.registry.claim(&key, move |ticket| {
            let handle = tokio::spawn(async move {
                let _release = Release {
                    inner: Arc::clone(&inner),
                    key: task_key,
                    ticket,
                };
                let request = inner.authorize(request);
                inner.dispatch(request).await
            });
            async move {
                handle
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Aborted(e.to_string())))
            }
            .boxed()
            .shared()
        });

        match claim {
            Claim::Issued(pending) => pending.await,
            Claim::Joined(pending) => {
                debug!("Joining in-flight request {key}");
                joined(pending.await)
            }
        }
    }

    pub async fn get(&self, url: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::get(url)).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::post(url).body(serde_json::to_value(body)?))
            .await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::put(url).body(serde_json::to_value(body)?))
            .await
    }

    pub async fn delete(&self, url: &str) -> Result<ApiResponse, ApiError> {
        self.send(ApiRequest::delete(url)).await
    }
}

impl ClientInner {
    fn authorize(&self, mut request: ApiRequest) -> ApiRequest {
        let token = match self.store.get_item(TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read session token: {e}");
                None
            }
        };
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            match HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    request.headers.insert(AUTHORIZATION, value);
                }
                Err(_) => warn!("Stored session token is not a valid header value; sending without it"),
            }
        }
        request
    }

    async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let method = request.method.clone();
        let url = request.url.clone();

        let response = self.transport.execute(request).await?;
        let status = response.status;
        if status.is_success() {
            debug!("{method} {url} -> {status}");
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session();
        } else {
            warn!("{method} {url} returned {status}");
        }
        Err(ApiError::Status {
            status,
            body: response.body,
        })
    }

    fn invalidate_session(&self) {
        error!("Unauthorized access - logging out");
        if let Err(e) = self.store.remove_item(TOKEN_KEY) {
            warn!("Could not clear session token: {e}");
        }
        (self.on_unauthorized)();
    }
}

/// Drops the registry entry of one call when the task running it ends,
/// whether it returned or panicked.
struct Release {
    inner: Arc<ClientInner>,
    key: String,
    ticket: u64,
}

impl Drop for Release {
    fn drop(&mut self) {
        if !self.inner.registry.release(&self.key, self.ticket) {
            debug!("Entry for {} already replaced", self.key);
        }
    }
}

fn joined(outcome: Result<ApiResponse, ApiError>) -> Result<ApiResponse, ApiError> {
    match outcome {
        Ok(mut response) => {
            response.deduplicated = true;
            Ok(response)
        }
        Err(e) => Err(e.shared()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TransportError;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use reqwest::Method;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Records every request and answers with a fixed status and body,
    /// optionally holding each call until `release` is notified.
    struct ScriptedTransport {
        status: StatusCode,
        body: Value,
        calls: Mutex<Vec<ApiRequest>>,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedTransport {
        fn new(status: StatusCode, body: Value) -> Self {
            Self {
                status,
                body,
                calls: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(status: StatusCode, body: Value, gate: Arc<Notify>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::new(status, body)
            }
        }

        fn calls(&self) -> Vec<ApiRequest> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.calls.lock().unwrap().push(request);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok(ApiResponse::new(self.status, self.body.to_string()))
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn execute(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            Err(TransportError::Other("connection refused".into()))
        }
    }

    fn client_with(
        transport: Arc<dyn Transport>,
        store: Arc<MemoryStore>,
    ) -> (ApiClient, Arc<AtomicUsize>) {
        let redirects = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&redirects);
        let client = ApiClient::new(
            transport,
            store,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );
        (client, redirects)
    }

    /// Lets spawned tasks run until they park on the gate.
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_concurrent_identical_gets_share_one_call() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(
            StatusCode::OK,
            json!([{"name": "Atlas"}]),
            Arc::clone(&gate),
        ));
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.get("/projects/active").await }
        });
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.get("/projects/active").await }
        });
        settle().await;
        assert!(client.registry().contains("get:/projects/active:{}"));

        gate.notify_waiters();
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        assert_eq!(transport.calls().len(), 1);
        assert_eq!(first.body, second.body);
        assert_ne!(first.deduplicated, second.deduplicated);
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_identical_gets_issue_two_calls() {
        let transport = Arc::new(ScriptedTransport::new(StatusCode::OK, json!([])));
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));

        let first = client.get("/projects/active").await.unwrap();
        assert!(client.registry().is_empty());
        let second = client.get("/projects/active").await.unwrap();

        assert_eq!(transport.calls().len(), 2);
        assert!(!first.deduplicated);
        assert!(!second.deduplicated);
    }

    #[tokio::test]
    async fn test_different_params_are_not_collapsed() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(
            StatusCode::OK,
            json!([]),
            Arc::clone(&gate),
        ));
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));

        let active = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .send(ApiRequest::get("/projects").param("status", "ACTIVE"))
                    .await
            }
        });
        let completed = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .send(ApiRequest::get("/projects").param("status", "COMPLETED"))
                    .await
            }
        });
        settle().await;
        assert_eq!(client.registry().len(), 2);

        gate.notify_waiters();
        assert!(!active.await.unwrap().unwrap().deduplicated);
        assert!(!completed.await.unwrap().unwrap().deduplicated);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_writes_are_never_collapsed() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(
            StatusCode::OK,
            json!({}),
            Arc::clone(&gate),
        ));
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));

        let body = json!({"projectId": "p-1"});
        let first = tokio::spawn({
            let client = client.clone();
            let body = body.clone();
            async move { client.post("/allocation-requests", &body).await }
        });
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.post("/allocation-requests", &body).await }
        });
        settle().await;
        assert!(client.registry().is_empty());

        gate.notify_waiters();
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.method == Method::POST));
    }

    #[tokio::test]
    async fn test_bearer_token_attached_when_present() {
        let transport = Arc::new(ScriptedTransport::new(StatusCode::OK, json!({})));
        let store = Arc::new(MemoryStore::new());
        store.set_item(TOKEN_KEY, "abc").unwrap();
        let (client, _) = client_with(transport.clone(), store.clone());

        client.get("/users/me").await.unwrap();
        store.remove_item(TOKEN_KEY).unwrap();
        client.get("/users/me").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].headers.get(AUTHORIZATION).unwrap(), "Bearer abc");
        assert!(!calls[1].headers.contains_key(AUTHORIZATION));
    }

    #[tokio::test]
    async fn test_unauthorized_clears_token_and_redirects() {
        let transport = Arc::new(ScriptedTransport::new(
            StatusCode::UNAUTHORIZED,
            json!({"message": "Token expired"}),
        ));
        let store = Arc::new(MemoryStore::new());
        store.set_item(TOKEN_KEY, "abc").unwrap();
        let (client, redirects) = client_with(transport, store.clone());

        let err = client.get("/users/me").await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(err.message().as_deref(), Some("Token expired"));
        assert_eq!(store.get_item(TOKEN_KEY).unwrap(), None);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_leaves_token_untouched() {
        let transport = Arc::new(ScriptedTransport::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({}),
        ));
        let store = Arc::new(MemoryStore::new());
        store.set_item(TOKEN_KEY, "abc").unwrap();
        let (client, redirects) = client_with(transport, store.clone());

        let err = client.delete("/projects/1").await.unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(store.get_item(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_collapsed_unauthorized_invalidates_once() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(
            StatusCode::UNAUTHORIZED,
            json!({}),
            Arc::clone(&gate),
        ));
        let store = Arc::new(MemoryStore::new());
        store.set_item(TOKEN_KEY, "abc").unwrap();
        let (client, redirects) = client_with(transport.clone(), store.clone());

        let first = tokio::spawn({
            let client = client.clone();
            async move { client.get("/skills/my").await }
        });
        let second = tokio::spawn({
            let client = client.clone();
            async move { client.get("/skills/my").await }
        });
        settle().await;
        gate.notify_waiters();

        let errors = [
            first.await.unwrap().unwrap_err(),
            second.await.unwrap().unwrap_err(),
        ];
        assert!(errors.iter().all(|e| e.is_unauthorized()));
        assert_eq!(errors.iter().filter(|e| e.is_deduplicated()).count(), 1);
        assert_eq!(transport.calls().len(), 1);
        assert_eq!(redirects.load(Ordering::SeqCst), 1);
        assert_eq!(store.get_item(TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_failure_propagates_and_releases_entry() {
        let (client, redirects) =
            client_with(Arc::new(FailingTransport), Arc::new(MemoryStore::new()));

        let err = client.get("/users/bench").await.unwrap_err();

        assert!(matches!(err, ApiError::Transport(_)));
        assert!(!err.is_deduplicated());
        assert_eq!(redirects.load(Ordering::SeqCst), 0);
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_abandoned_call_still_releases_entry() {
        let gate = Arc::new(Notify::new());
        let transport = Arc::new(ScriptedTransport::gated(
            StatusCode::OK,
            json!([]),
            Arc::clone(&gate),
        ));
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));

        let caller = tokio::spawn({
            let client = client.clone();
            async move { client.get("/users/team").await }
        });
        settle().await;
        caller.abort();
        let _ = caller.await;
        assert!(client.registry().contains("get:/users/team:{}"));

        gate.notify_waiters();
        settle().await;
        assert!(client.registry().is_empty());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_get_joins_entry_already_registered() {
        let transport = Arc::new(ScriptedTransport::new(StatusCode::OK, json!([])));
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));
        let seeded = client.registry().claim("get:/projects/active:{}", |_| {
            futures::future::ready(Ok(ApiResponse::new(StatusCode::OK, r#"["Atlas"]"#)))
                .boxed()
                .shared()
        });
        assert!(matches!(seeded, Claim::Issued(_)));

        let response = client.get("/projects/active").await.unwrap();

        assert!(response.deduplicated);
        assert_eq!(response.text(), r#"["Atlas"]"#);
        assert!(transport.calls().is_empty());
    }

    /// Panics on its first call, answers 200 afterwards.
    struct PanicsOnce {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Transport for PanicsOnce {
        async fn execute(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("transport blew up");
            }
            Ok(ApiResponse::new(StatusCode::OK, "[]"))
        }
    }

    #[tokio::test]
    async fn test_panicked_call_releases_entry() {
        let transport = Arc::new(PanicsOnce {
            calls: AtomicUsize::new(0),
        });
        let (client, _) = client_with(transport.clone(), Arc::new(MemoryStore::new()));

        let err = client.get("/projects/active").await.unwrap_err();
        assert!(matches!(err, ApiError::Aborted(_)));
        assert!(client.registry().is_empty());

        let response = client.get("/projects/active").await.unwrap();
        assert!(!response.deduplicated);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }
}
