//! 📡 The reqwest backend: one long-lived client, many short-lived hopes.
//!
//! The client is built once per session and reused for every attempt, because spinning up a
//! new client per request is the networking equivalent of buying a new car every time you
//! need groceries. Keep-alive is the whole point.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_CHARSET, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::trace;

use super::{HttpRequest, Method, Transport};
use crate::error::{Fault, FaultKind};
use crate::response_buffer::ResponseBuffer;

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// 🚀 Build the reqwest client with the headers every request gets: JSON please, in UTF-8.
    pub fn new() -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("esx/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("💀 The HTTP client refused to be born. Probably a TLS backend having a moment. Either way: no client, no requests, no fun.")?;

        Ok(Self { client })
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(
        &mut self,
        request: &HttpRequest<'_>,
        sink: &mut ResponseBuffer,
    ) -> Result<(), Fault> {
        let mut builder = self
            .client
            .request(Self::method(request.method), request.url);
        // -- ⏱️ zero means "wait as long as it takes", same as curl. reqwest would read it as "already late".
        if !request.timeout.is_zero() {
            builder = builder.timeout(request.timeout);
        }

        // -- 🚫 GET goes out naked. everything else may bring a body if it has one.
        if request.method != Method::Get {
            if let Some(body) = request.body {
                builder = builder
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.to_owned());
            }
        }

        let mut response = builder
            .send()
            .await
            .map_err(|err| Fault::from_reqwest(&err))?;
        trace!(
            status = response.status().as_u16(),
            url = request.url,
            "📡 response headers are in, streaming the body"
        );

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| Fault::from_reqwest(&err))?
        {
            sink.write_chunk(&chunk)
                .map_err(|overflow| Fault::new(FaultKind::WriteOverflow, overflow.to_string()))?;
        }
        Ok(())
    }
}
