//! 🎛️ The session: one config, one buffer, one transport, one request at a time.
//!
//! 🧠 Knowledge graph:
//! - Every operation takes `&mut self`. Two concurrent calls on one session do not compile,
//!   which is the cheapest mutex there is. Want parallelism? Open more sessions.
//! - Each operation: reset `last_result` → build the path → failover sweep → (typed ops only)
//!   extract. First failure wins, in that order. URL trouble never touches the network.
//! - Raw operations stop after the sweep. The body sits in the buffer. Reading it is on you.
//! - A service-reported error is both data (`last_result` is `TransportResult::Error`) and
//!   a failure (`Err(TransportError::Service)`), so neither kind of caller gets surprised.

use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::app_config::{HostConfig, TransportConfig, TransportLimits};
use crate::backends::{HttpTransport, Method, TransportBackend};
use crate::error::TransportError;
use crate::extract::extract;
use crate::invoker::invoke;
use crate::response_buffer::ResponseBuffer;
use crate::results::{
    AcknowledgedResult, IndexDocumentResult, RefreshResult, ResponseKind, SearchResult,
    ServiceError, TransportResult,
};
use crate::url::build_path;

#[derive(Debug)]
pub struct Session {
    id: String,
    hosts: Vec<HostConfig>,
    timeout: Duration,
    limits: TransportLimits,
    buffer: ResponseBuffer,
    backend: TransportBackend,
    last_result: TransportResult,
}

impl Session {
    /// 🚀 Open a session that talks HTTP to the configured hosts.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let transport =
            HttpTransport::new().map_err(|err| TransportError::Config(format!("{err:#}")))?;
        Self::with_backend(config, transport)
    }

    /// 🎭 Same as [`Session::new`], but you pick the transport. Tests pick the in-memory one.
    pub fn with_backend(
        config: TransportConfig,
        backend: impl Into<TransportBackend>,
    ) -> Result<Self, TransportError> {
        let id = Uuid::new_v4().simple().to_string();
        let attempt_timeout = config.timeout_duration();
        let TransportConfig {
            timeout,
            flush_response,
            hosts,
            limits,
        } = config;

        let mut usable = Vec::with_capacity(hosts.len());
        for (position, host) in hosts.into_iter().enumerate() {
            if host.host.trim().is_empty() {
                warn!(session = %id, position, "⚠️ skipping a host entry with no hostname");
                continue;
            }
            usable.push(host);
        }
        if usable.len() > limits.max_hosts {
            warn!(
                session = %id,
                configured = usable.len(),
                max_hosts = limits.max_hosts,
                "✂️ more hosts than the session holds, keeping the first ones"
            );
            usable.truncate(limits.max_hosts);
        }
        if usable.is_empty() {
            return Err(TransportError::Config(
                "at least one host with a hostname is required".to_string(),
            ));
        }
        if limits.response_capacity == 0 {
            return Err(TransportError::Config(
                "limits.response_capacity must be greater than zero".to_string(),
            ));
        }

        info!(
            session = %id,
            hosts = usable.len(),
            timeout_secs = timeout,
            flush_response,
            "🚀 session opened"
        );
        Ok(Self {
            id,
            hosts: usable,
            timeout: attempt_timeout,
            buffer: ResponseBuffer::new(limits.response_capacity, flush_response),
            limits,
            backend: backend.into(),
            last_result: TransportResult::None,
        })
    }

    // ============================================================================
    // 🔎 typed operations
    // ============================================================================

    /// POST `index[/doc_type]/_search` with `query` as the body.
    pub async fn search(
        &mut self,
        index: &str,
        doc_type: Option<&str>,
        query: &str,
    ) -> Result<&SearchResult, TransportError> {
        self.last_result = TransportResult::None;
        let path = build_path(index, doc_type, Some("_search"), self.limits.max_path_len)?;
        match self.execute(ResponseKind::Search, &path, Method::Post, Some(query)).await? {
            TransportResult::Search(result) => Ok(result),
            other => Err(mismatch(ResponseKind::Search, other)),
        }
    }

    /// PUT `index` with `settings` as the body.
    pub async fn create_index(
        &mut self,
        index: &str,
        settings: &str,
    ) -> Result<AcknowledgedResult, TransportError> {
        self.last_result = TransportResult::None;
        let path = build_path(index, None, None, self.limits.max_path_len)?;
        match self.execute(ResponseKind::CreateIndex, &path, Method::Put, Some(settings)).await? {
            TransportResult::CreateIndex(ack) => Ok(*ack),
            other => Err(mismatch(ResponseKind::CreateIndex, other)),
        }
    }

    /// DELETE `index`. No body. Gone is gone.
    pub async fn delete_index(&mut self, index: &str) -> Result<AcknowledgedResult, TransportError> {
        self.last_result = TransportResult::None;
        let path = build_path(index, None, None, self.limits.max_path_len)?;
        match self.execute(ResponseKind::DeleteIndex, &path, Method::Delete, None).await? {
            TransportResult::DeleteIndex(ack) => Ok(*ack),
            other => Err(mismatch(ResponseKind::DeleteIndex, other)),
        }
    }

    /// PUT `index/doc_type/id` with `document` as the body.
    pub async fn index_document(
        &mut self,
        index: &str,
        doc_type: &str,
        id: &str,
        document: &str,
    ) -> Result<&IndexDocumentResult, TransportError> {
        self.last_result = TransportResult::None;
        let path = build_path(index, Some(doc_type), Some(id), self.limits.max_path_len)?;
        match self
            .execute(ResponseKind::IndexDocument, &path, Method::Put, Some(document))
            .await?
        {
            TransportResult::IndexDocument(result) => Ok(result),
            other => Err(mismatch(ResponseKind::IndexDocument, other)),
        }
    }

    /// POST `index/_refresh`. No body.
    pub async fn refresh(&mut self, index: &str) -> Result<RefreshResult, TransportError> {
        self.last_result = TransportResult::None;
        let path = build_path(index, None, Some("_refresh"), self.limits.max_path_len)?;
        match self.execute(ResponseKind::Refresh, &path, Method::Post, None).await? {
            TransportResult::Refresh(result) => Ok(*result),
            other => Err(mismatch(ResponseKind::Refresh, other)),
        }
    }

    // ============================================================================
    // 🔧 raw operations: no path building, no extraction, just bytes in the buffer
    // ============================================================================

    pub async fn get(&mut self, path: &str, body: Option<&str>) -> Result<(), TransportError> {
        self.raw(Method::Get, path, body).await
    }

    pub async fn post(&mut self, path: &str, body: Option<&str>) -> Result<(), TransportError> {
        self.raw(Method::Post, path, body).await
    }

    pub async fn put(&mut self, path: &str, body: Option<&str>) -> Result<(), TransportError> {
        self.raw(Method::Put, path, body).await
    }

    pub async fn delete(&mut self, path: &str, body: Option<&str>) -> Result<(), TransportError> {
        self.raw(Method::Delete, path, body).await
    }

    async fn raw(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&str>,
    ) -> Result<(), TransportError> {
        self.last_result = TransportResult::None;
        if path.len() > self.limits.max_path_len {
            return Err(TransportError::Url(format!(
                "path is {} bytes, longer than the {} byte limit",
                path.len(),
                self.limits.max_path_len
            )));
        }
        debug!(session = %self.id, %method, path, "🔧 raw request");
        self.send(path, method, body).await
    }

    async fn send(
        &mut self,
        path: &str,
        method: Method,
        body: Option<&str>,
    ) -> Result<(), TransportError> {
        invoke(
            &mut self.backend,
            &self.hosts,
            self.timeout,
            &mut self.buffer,
            path,
            method,
            body,
        )
        .await
    }

    /// 🎯 Sweep, extract, store. A service error is stored AND returned.
    async fn execute(
        &mut self,
        kind: ResponseKind,
        path: &str,
        method: Method,
        body: Option<&str>,
    ) -> Result<&TransportResult, TransportError> {
        debug!(session = %self.id, ?kind, %method, path, "📨 typed request");
        self.send(path, method, body).await?;

        // -- 📦 only this call's bytes. in append mode the buffer also holds the previous ones.
        let result = extract(kind, self.buffer.current_response(), &self.limits)?;
        if let TransportResult::Error(ServiceError { error, status }) = &result {
            let err = TransportError::Service {
                status: *status,
                message: error.clone(),
            };
            debug!(session = %self.id, ?kind, status, "🚨 service refused the request");
            self.last_result = result;
            return Err(err);
        }
        self.last_result = result;
        Ok(&self.last_result)
    }

    // ============================================================================
    // 🔍 accessors
    // ============================================================================

    /// 🏷️ Random per-session id. Shows up in every log line this session writes.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn hosts(&self) -> &[HostConfig] {
        &self.hosts
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn flush_response(&self) -> bool {
        self.buffer.flush_response()
    }

    /// 🎭 What the last operation left behind. `None` after raw calls and after failures
    /// that happened before a body could be read.
    pub fn last_result(&self) -> &TransportResult {
        &self.last_result
    }

    pub fn search_result(&self) -> Option<&SearchResult> {
        match &self.last_result {
            TransportResult::Search(result) => Some(result),
            _ => None,
        }
    }

    pub fn service_error(&self) -> Option<&ServiceError> {
        match &self.last_result {
            TransportResult::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn index_document_result(&self) -> Option<&IndexDocumentResult> {
        match &self.last_result {
            TransportResult::IndexDocument(result) => Some(result),
            _ => None,
        }
    }

    pub fn acknowledged(&self) -> Option<bool> {
        match &self.last_result {
            TransportResult::CreateIndex(ack) | TransportResult::DeleteIndex(ack) => {
                Some(ack.acknowledged)
            }
            _ => None,
        }
    }

    pub fn refresh_result(&self) -> Option<&RefreshResult> {
        match &self.last_result {
            TransportResult::Refresh(result) => Some(result),
            _ => None,
        }
    }

    pub fn response(&self) -> &ResponseBuffer {
        &self.buffer
    }

    /// 🗑️ Append mode's reset button.
    pub fn clear_response(&mut self) {
        self.buffer.clear();
    }

    pub fn response_text(&self) -> std::borrow::Cow<'_, str> {
        self.buffer.as_text()
    }

    /// 🛑 Close the session. The buffer, the client and the host list all go with it.
    pub fn close(self) {
        info!(
            session = %self.id,
            buffered = self.buffer.pos(),
            "🛑 session closed"
        );
    }
}

// -- 🤷 extract() hands back the variant for the kind it was given. this is the "it didn't" branch.
fn mismatch(kind: ResponseKind, got: &TransportResult) -> TransportError {
    TransportError::Parse(format!("expected a {kind:?} result, extracted {got:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::InMemoryTransport;
    use crate::error::FaultKind;
    use crate::results::{HitSource, ShardCounts};
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SOUP: &str = r#"{"took":5,"timed_out":false,"_shards":{"total":1,"successful":1,"failed":0},"hits":{"total":1,"max_score":1.0,"hits":[{"_index":"foods","_type":"food","_id":"1","_score":1.0,"_source":{"name":"soup"}}]}}"#;

    fn config(names: &[&str]) -> TransportConfig {
        TransportConfig::with_hosts(names.iter().map(|n| HostConfig::new(*n, 9200)).collect())
    }

    fn host_of(server: &MockServer) -> HostConfig {
        let address = server.address();
        HostConfig::new(address.ip().to_string(), address.port())
    }

    /// 🚪 A port that was listening a moment ago and now is not. Connection refused, guaranteed-ish.
    fn dead_host() -> HostConfig {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        HostConfig::new("127.0.0.1", port)
    }

    fn session_over(transport: InMemoryTransport, names: &[&str]) -> Session {
        Session::with_backend(config(names), transport).unwrap()
    }

    #[test]
    fn the_one_where_blank_hosts_are_skipped_and_none_left_is_an_error() {
        let mut cfg = config(&["", "a", "  "]);
        cfg.limits.max_hosts = 8;
        let session = Session::with_backend(cfg, InMemoryTransport::new()).unwrap();
        assert_eq!(session.hosts(), &[HostConfig::new("a", 9200)]);
        assert_eq!(session.timeout(), Duration::from_secs(10));
        assert!(session.flush_response());
        assert_eq!(session.id().len(), 32);

        let err = Session::with_backend(config(&["", " "]), InMemoryTransport::new()).unwrap_err();
        assert!(matches!(err, TransportError::Config(_)));
        assert_eq!(err.code(), 105);
    }

    #[test]
    fn the_one_where_extra_hosts_and_a_zero_buffer_are_handled() {
        let mut cfg = config(&["a", "b", "c"]);
        cfg.limits.max_hosts = 2;
        let session = Session::with_backend(cfg, InMemoryTransport::new()).unwrap();
        assert_eq!(session.hosts().len(), 2);
        assert_eq!(session.hosts()[1].host, "b");

        let mut cfg = config(&["a"]);
        cfg.limits.response_capacity = 0;
        assert!(matches!(
            Session::with_backend(cfg, InMemoryTransport::new()),
            Err(TransportError::Config(_))
        ));
    }

    #[tokio::test]
    async fn the_one_where_soup_is_searched_and_found() {
        let transport = InMemoryTransport::new().respond("http://es1:9200/foods/food/_search", SOUP);
        let requests = transport.requests.clone();
        let mut session = session_over(transport, &["es1"]);

        let result = session
            .search("foods", Some("food"), r#"{"query":{"match_all":{}}}"#)
            .await
            .expect("💀 the soup was right there");

        assert_eq!(result.took, 5);
        assert_eq!(result.hits.hits[0].source, HitSource::Object(r#"{"name":"soup"}"#.into()));
        assert_eq!(session.search_result().map(|r| r.hits.total), Some(1));
        assert_eq!(session.response_text(), SOUP);

        let recorded = requests.lock().await.clone();
        assert_eq!(recorded[0].method, Method::Post);
        assert_eq!(recorded[0].body.as_deref(), Some(r#"{"query":{"match_all":{}}}"#));
    }

    #[tokio::test]
    async fn the_one_where_every_operation_uses_the_right_verb_and_path() {
        let transport = InMemoryTransport::new()
            .respond("http://es1:9200/foods/_refresh", r#"{"_shards":{"total":2,"successful":1,"failed":0}}"#)
            .respond("http://es1:9200/foods/food/7", r#"{"_index":"foods","_type":"food","_id":"7","_version":1,"created":true}"#)
            .respond("http://es1:9200/foods", r#"{"acknowledged":true}"#);
        let requests = transport.requests.clone();
        let mut session = session_over(transport, &["es1"]);

        assert!(session.create_index("foods", "{}").await.unwrap().acknowledged);
        assert_eq!(session.acknowledged(), Some(true));
        let doc = session
            .index_document("foods", "food", "7", r#"{"name":"soup"}"#)
            .await
            .unwrap();
        assert!(doc.created);
        assert_eq!(doc.version, 1);
        assert_eq!(
            session.refresh("foods").await.unwrap().shards,
            ShardCounts {
                total: 2,
                successful: 1,
                failed: 0
            }
        );
        assert!(session.delete_index("foods").await.unwrap().acknowledged);

        let seen: Vec<(Method, String)> = requests
            .lock()
            .await
            .iter()
            .map(|r| (r.method, r.url.clone()))
            .collect();
        assert_eq!(
            seen,
            vec![
                (Method::Put, "http://es1:9200/foods".to_string()),
                (Method::Put, "http://es1:9200/foods/food/7".to_string()),
                (Method::Post, "http://es1:9200/foods/_refresh".to_string()),
                (Method::Delete, "http://es1:9200/foods".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn the_one_where_the_server_says_no_and_we_believe_it() {
        let transport = InMemoryTransport::new().respond(
            "http://es1:9200",
            r#"{"error":"IndexAlreadyExistsException[[foods] already exists]","status":400}"#,
        );
        let mut session = session_over(transport, &["es1"]);

        let err = session.create_index("foods", "{}").await.unwrap_err();
        assert!(matches!(err, TransportError::Service { status: 400, .. }));
        assert_eq!(err.code(), 103);
        assert_eq!(
            session.service_error(),
            Some(&ServiceError {
                error: "IndexAlreadyExistsException[[foods] already exists]".into(),
                status: 400
            })
        );
        assert_eq!(session.acknowledged(), None);
    }

    #[tokio::test]
    async fn the_one_where_a_bad_path_never_leaves_the_building() {
        let transport = InMemoryTransport::new().respond("http://es1:9200", SOUP);
        let requests = transport.requests.clone();
        let mut session = session_over(transport, &["es1"]);

        // -- 🧹 leave a result behind, then prove the failed call wiped it
        session.search("foods", None, "{}").await.unwrap();
        let err = session.search("", None, "{}").await.unwrap_err();

        assert!(matches!(err, TransportError::Url(_)));
        assert!(session.last_result().is_none());
        assert_eq!(requests.lock().await.len(), 1);

        let long = "x".repeat(300);
        assert!(matches!(session.get(&long, None).await, Err(TransportError::Url(_))));
        assert_eq!(requests.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_garbage_comes_back_and_nothing_is_stored() {
        let transport = InMemoryTransport::new().respond("http://es1:9200", "<html>nope</html>");
        let mut session = session_over(transport, &["es1"]);

        let err = session.refresh("foods").await.unwrap_err();
        assert!(matches!(err, TransportError::Parse(_)));
        assert!(session.last_result().is_none());
        assert_eq!(session.response_text(), "<html>nope</html>");
    }

    #[tokio::test]
    async fn the_one_where_append_mode_keeps_the_history() {
        let transport = InMemoryTransport::new()
            .respond("http://es1:9200/a", r#"{"acknowledged":true}"#)
            .respond("http://es1:9200/b", r#"{"acknowledged":false}"#);
        let mut cfg = config(&["es1"]);
        cfg.flush_response = false;
        let mut session = Session::with_backend(cfg, transport).unwrap();

        assert!(session.create_index("a", "{}").await.unwrap().acknowledged);
        // -- the second parse only sees its own bytes, so the concatenation doesn't trip it up
        assert!(!session.delete_index("b").await.unwrap().acknowledged);
        assert_eq!(
            session.response_text(),
            r#"{"acknowledged":true}{"acknowledged":false}"#
        );

        session.clear_response();
        assert!(session.response().is_empty());
    }

    #[tokio::test]
    async fn the_one_where_flush_mode_starts_fresh_every_time() {
        let transport = InMemoryTransport::new()
            .respond("http://es1:9200/a", "first")
            .respond("http://es1:9200/b", "second");
        let mut session = session_over(transport, &["es1"]);

        session.get("a", None).await.unwrap();
        session.post("/b", Some("{}")).await.unwrap();
        assert_eq!(session.response_text(), "second");
        assert!(session.last_result().is_none());
    }

    #[tokio::test]
    async fn the_one_where_all_hosts_fail_and_the_last_code_wins() {
        let transport = InMemoryTransport::new()
            .fail("http://a:9200", FaultKind::Connect)
            .fail("http://b:9200", FaultKind::Timeout);
        let mut session = session_over(transport, &["a", "b"]);

        let err = session.delete("foods", None).await.unwrap_err();
        assert_eq!(err.code(), FaultKind::Timeout.code());
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn the_one_where_real_http_fails_over_and_skips_the_rest() {
        let alive = MockServer::start().await;
        let never = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/foods/food/_search"))
            .and(header("accept", "application/json"))
            .and(header("accept-charset", "utf-8"))
            .and(header("content-type", "application/json"))
            .and(body_string(r#"{"query":{"match_all":{}}}"#))
            .respond_with(ResponseTemplate::new(200).set_body_string(SOUP))
            .expect(1)
            .mount(&alive)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SOUP))
            .expect(0)
            .mount(&never)
            .await;

        let cfg = TransportConfig::with_hosts(vec![dead_host(), host_of(&alive), host_of(&never)]);
        let mut session = Session::new(cfg).unwrap();

        let result = session
            .search("foods", Some("food"), r#"{"query":{"match_all":{}}}"#)
            .await
            .expect("💀 the second host was up the whole time");
        assert_eq!(result.hits.hits[0].id, "1");
        session.close();
        // -- 🎯 MockServer checks `.expect(..)` on drop. `never` must have stayed lonely.
    }

    #[tokio::test]
    async fn the_one_where_a_zero_timeout_means_take_your_time() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/x"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut cfg = TransportConfig::with_hosts(vec![host_of(&server)]);
        cfg.timeout = 0;
        let mut session = Session::new(cfg).unwrap();
        assert_eq!(session.timeout(), Duration::ZERO);

        session
            .get("x", None)
            .await
            .expect("💀 zero is 'no limit', not 'already too late'");
        assert_eq!(session.response_text(), "{}");
    }

    #[tokio::test]
    async fn the_one_where_a_null_error_field_is_still_a_success() {
        let transport =
            InMemoryTransport::new().respond("http://es1:9200", r#"{"acknowledged":true,"error":null}"#);
        let mut session = session_over(transport, &["es1"]);

        let ack = session
            .create_index("foods", "{}")
            .await
            .expect("💀 a null error is not an error");
        assert!(ack.acknowledged);
        assert_eq!(session.service_error(), None);
    }

    #[tokio::test]
    async fn the_one_where_an_http_404_is_not_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/ghosts"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_string(r#"{"error":{"reason":"no such index [ghosts]"},"status":404}"#),
            )
            .mount(&server)
            .await;

        let mut session = Session::new(TransportConfig::with_hosts(vec![host_of(&server)])).unwrap();
        let err = session.delete_index("ghosts").await.unwrap_err();

        match err {
            TransportError::Service { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "no such index [ghosts]");
            }
            other => panic!("💀 expected a service error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn the_one_where_get_sends_no_body_over_the_wire() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .and(body_string(""))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"status":"green"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let mut session = Session::new(TransportConfig::with_hosts(vec![host_of(&server)])).unwrap();
        session
            .get("_cluster/health", Some(r#"{"ignored":true}"#))
            .await
            .unwrap();
        assert_eq!(session.response_text(), r#"{"status":"green"}"#);
    }

    #[tokio::test]
    async fn the_one_where_a_response_bigger_than_the_buffer_fails_over() {
        let big = MockServer::start().await;
        let small = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
            .mount(&big)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("tiny"))
            .mount(&small)
            .await;

        let mut cfg = TransportConfig::with_hosts(vec![host_of(&big), host_of(&small)]);
        cfg.limits.response_capacity = 64;
        let mut session = Session::new(cfg).unwrap();

        session.get("anything", None).await.unwrap();
        assert_eq!(session.response_text(), "tiny");
    }
}
