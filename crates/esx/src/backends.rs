//! 🔌 Backends: where the bytes actually leave the building (or pretend to).
//!
//! 🎭 One trait, two faces. `HttpTransport` talks to real clusters over reqwest.
//! `InMemoryTransport` reads from a script and writes down who it was asked to call,
//! which makes it the world's most reliable Elasticsearch cluster. It has never once gone red.
//!
//! A backend does exactly ONE attempt against ONE url. Picking the next host when that
//! attempt goes sideways is the invoker's job, not ours. We just report back. 🦆

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Fault;
use crate::response_buffer::ResponseBuffer;

pub mod http;
pub mod in_mem;

pub use http::HttpTransport;
pub use in_mem::{InMemoryTransport, Scripted};

/// 🚦 The four verbs this client speaks. HEAD and PATCH were not invited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 📨 One fully resolved request, aimed at exactly one host.
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub method: Method,
    /// GET never carries a body, no matter what you hand it. Old habits from a reused handle stop here.
    pub body: Option<&'a str>,
    /// Per-attempt budget. `Duration::ZERO` means no limit at all.
    pub timeout: Duration,
}

/// 🚰 A thing that can perform one request and pour the response body into a buffer.
///
/// # Contract
/// - Body chunks go through [`ResponseBuffer::write_chunk`], one at a time, as they arrive.
/// - A chunk the buffer refuses turns into a `FaultKind::WriteOverflow` fault.
/// - Any network-level problem is a `Fault`. An HTTP 404 is NOT a fault; the body is the story.
#[async_trait]
pub trait Transport: std::fmt::Debug + Send {
    async fn perform(
        &mut self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> Result<(), Fault>;
}

/// 🎭 The many faces of a transport. The session holds one of these and never asks which.
#[derive(Debug)]
pub enum TransportBackend {
    Http(HttpTransport),
    InMemory(InMemoryTransport),
}

#[async_trait]
impl Transport for TransportBackend {
    async fn perform(
        &mut self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> Result<(), Fault> {
        match self {
            TransportBackend::Http(t) => t.perform(request, sink).await,
            TransportBackend::InMemory(t) => t.perform(request, sink).await,
        }
    }
}

impl From<HttpTransport> for TransportBackend {
    fn from(transport: HttpTransport) -> Self {
        TransportBackend::Http(transport)
    }
}

impl From<InMemoryTransport> for TransportBackend {
    fn from(transport: InMemoryTransport) -> Self {
        TransportBackend::InMemory(transport)
    }
}
