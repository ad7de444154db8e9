use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{HttpRequest, Method, Transport};
use crate::error::{Fault, FaultKind};
use crate::response_buffer::ResponseBuffer;

/// 🎬 What a scripted host does when called. It always does the same thing. Consistency!
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scripted {
    /// Answer with this body.
    Respond(String),
    /// Fall over in this particular way.
    Fault(FaultKind),
}

/// 📝 One request as the transport saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

/// 📦 A transport that never touches a socket.
///
/// Routes are matched by URL prefix, first match wins, so register the specific ones
/// (`http://a:9200/foods/_refresh`) before the general ones (`http://a:9200`).
/// An unmatched URL behaves like a host nobody is home at: `FaultKind::Connect`.
///
/// Clone-able so tests can keep a handle on `requests` after the session takes ownership.
/// The `Arc` means everyone shares the same log. Communist data, but in a good way.
#[derive(Debug, Clone)]
pub struct InMemoryTransport {
    routes: Vec<(String, Scripted)>,
    // 🔪 responses are fed to the buffer in pieces this big, like a real network would
    chunk_size: usize,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            chunk_size: 16,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_prefix: impl Into<String>, scripted: Scripted) -> Self {
        self.routes.push((url_prefix.into(), scripted));
        self
    }

    pub fn respond(self, url_prefix: impl Into<String>, body: impl Into<String>) -> Self {
        self.route(url_prefix, Scripted::Respond(body.into()))
    }

    pub fn fail(self, url_prefix: impl Into<String>, kind: FaultKind) -> Self {
        self.route(url_prefix, Scripted::Fault(kind))
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// 🕵️ Every URL we were asked to call, in order.
    pub async fn contacted(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|r| r.url.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn perform(
        &mut self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> Result<(), Fault> {
        self.requests.lock().await.push(RecordedRequest {
            method: request.method,
            url: request.url.to_string(),
            body: match request.method {
                Method::Get => None,
                _ => request.body.map(str::to_string),
            },
        });

        let scripted = self
            .routes
            .iter()
            .find(|(prefix, _)| request.url.starts_with(prefix.as_str()))
            .map(|(_, scripted)| scripted);

        match scripted {
            Some(Scripted::Respond(body)) => {
                for chunk in body.as_bytes().chunks(self.chunk_size) {
                    sink.write_chunk(chunk).map_err(|overflow| {
                        Fault::new(FaultKind::WriteOverflow, overflow.to_string())
                    })?;
                }
                Ok(())
            }
            Some(Scripted::Fault(kind)) => Err(Fault::new(
                *kind,
                format!("scripted {kind} for {}", request.url),
            )),
            None => Err(Fault::new(
                FaultKind::Connect,
                format!("nobody is home at {}", request.url),
            )),
        }
    }
}
