//! 🔎 esx: a small Elasticsearch client that knows exactly five tricks and a few raw verbs.
//!
//! 🎬 *[narrator voice]* "It had a list of hosts, a fixed-size bucket for responses,
//! and absolutely no patience for more than one request at a time."
//!
//! 🧠 Knowledge graph:
//! - [`Session`] is the front door. Open one from a [`TransportConfig`], call operations on it.
//! - Each call: path ([`url`]) → failover sweep ([`invoker`]) → extraction ([`extract`]).
//! - Results land in [`TransportResult`], a tagged union. Errors land in [`TransportError`],
//!   which carries a stable integer code for the folks who like numbers.
//! - [`backends`] is the seam for tests: swap reqwest for a scripted in-memory cluster. 🦆

pub mod app_config;
pub mod backends;
pub mod error;
pub mod extract;
mod invoker;
pub mod response_buffer;
pub mod results;
pub mod session;
pub mod subtree;
pub mod url;

pub use app_config::{FieldLimits, HostConfig, TransportConfig, TransportLimits, load_config};
pub use backends::{HttpTransport, InMemoryTransport, Method, TransportBackend};
pub use error::{FaultKind, TransportError, strerror};
pub use results::{
    AcknowledgedResult, HitSource, HitsSummary, IndexDocumentResult, RefreshResult, ResponseKind,
    SearchHit, SearchResult, ServiceError, ShardCounts, TransportResult,
};
pub use session::Session;
