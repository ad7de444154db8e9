//! 💀 Errors: every way a search request can go sideways, with a number stapled to each one.
//!
//! 🧠 Knowledge graph:
//! - `TransportError` is what every public operation returns on failure.
//! - `Fault` is what a single host attempt returns. The invoker turns the LAST one into
//!   `TransportError::Transport` once every host has had its chance to disappoint us.
//! - Codes 1..=99 belong to transport faults (curl-compatible numbering, because the ops folks
//!   already have those memorized and we are not here to make enemies).
//! - Codes 100+ belong to the client's own taxonomy.
//! - `strerror` maps any code back to words. Like a phrasebook, but for sadness. 🦆

use thiserror::Error;

/// 🏷️ First code of the client's own taxonomy. Anything below is a transport fault.
pub const CLIENT_ERROR_BASE: i32 = 100;

/// 📡 What kind of network-layer misery a single host attempt ran into.
///
/// The discriminants are stable and are the codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    UnsupportedProtocol = 1,
    MalformedUrl = 3,
    Connect = 7,
    /// 📦 the response did not fit in the buffer. the buffer did not grow. that is the point.
    WriteOverflow = 23,
    Timeout = 28,
    Redirect = 47,
    Send = 55,
    Receive = 56,
    Other = 99,
}

impl FaultKind {
    pub fn code(self) -> i32 {
        self as i32
    }

    fn description(self) -> &'static str {
        match self {
            FaultKind::UnsupportedProtocol => "Unsupported protocol",
            FaultKind::MalformedUrl => "URL using bad/illegal format or missing URL",
            FaultKind::Connect => "Couldn't connect to server",
            FaultKind::WriteOverflow => "Response exceeded the response buffer capacity",
            FaultKind::Timeout => "Timeout was reached",
            FaultKind::Redirect => "Number of redirects hit maximum amount",
            FaultKind::Send => "Failed sending data to the peer",
            FaultKind::Receive => "Failure when receiving data from the peer",
            FaultKind::Other => "Transport failure",
        }
    }

    fn from_code(code: i32) -> Option<Self> {
        [
            FaultKind::UnsupportedProtocol,
            FaultKind::MalformedUrl,
            FaultKind::Connect,
            FaultKind::WriteOverflow,
            FaultKind::Timeout,
            FaultKind::Redirect,
            FaultKind::Send,
            FaultKind::Receive,
            FaultKind::Other,
        ]
        .into_iter()
        .find(|kind| kind.code() == code)
    }
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// 🔌 One failed attempt against one host. Small, honest, and immediately replaced by the next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    pub message: String,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// 🕵️ Sniff a reqwest error like a truffle pig and decide which bucket it belongs in.
    pub(crate) fn from_reqwest(err: &reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FaultKind::Timeout
        } else if err.is_connect() {
            FaultKind::Connect
        } else if err.is_redirect() {
            FaultKind::Redirect
        } else if err.is_builder() {
            FaultKind::MalformedUrl
        } else if err.is_body() || err.is_decode() {
            FaultKind::Receive
        } else if err.is_request() {
            FaultKind::Send
        } else {
            FaultKind::Other
        };
        // -- 🧅 peel the whole onion, the top layer is usually just "error sending request"
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = std::error::Error::source(cause);
        }
        Self::new(kind, message)
    }
}

/// 💀 Everything a public operation can fail with.
///
/// Callers who want a number get one from [`TransportError::code`]. Callers who want words
/// get them from `Display`. Callers who want both are greedy, and also welcome.
#[derive(Debug, Error)]
pub enum TransportError {
    /// 📡 Every host faulted. This is the last one's story; the earlier ones are not preserved.
    #[error("{fault} ({url}): {message}")]
    Transport {
        fault: FaultKind,
        url: String,
        message: String,
    },

    /// 🔒 A precondition was violated by the caller. Not retried. Not anyone's fault but ours.
    #[error("Input error: {0}")]
    Input(String),

    /// 🧭 The request path could not be built.
    #[error("URL error: {0}")]
    Url(String),

    /// 🧩 The body was not JSON. Retrying will not make it JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// 🚨 The server answered, politely, that it would not be doing that.
    #[error("Service error (status {status}): {message}")]
    Service { status: i64, message: String },

    /// 📏 An extracted string did not fit its field and truncation is switched off.
    #[error("Field '{field}' does not fit its {limit} byte capacity")]
    FieldOverflow { field: &'static str, limit: usize },

    /// 📋 The configuration was rejected when opening a session.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// 🔢 The stable integer code. Zero is reserved for success and never returned here.
    pub fn code(&self) -> i32 {
        match self {
            TransportError::Transport { fault, .. } => fault.code(),
            TransportError::Input(_) => CLIENT_ERROR_BASE,
            TransportError::Url(_) => CLIENT_ERROR_BASE + 1,
            TransportError::Parse(_) => CLIENT_ERROR_BASE + 2,
            TransportError::Service { .. } => CLIENT_ERROR_BASE + 3,
            TransportError::FieldOverflow { .. } => CLIENT_ERROR_BASE + 4,
            TransportError::Config(_) => CLIENT_ERROR_BASE + 5,
        }
    }

    /// ✅ True when the failure happened on the wire rather than in our own bookkeeping.
    pub fn is_transport(&self) -> bool {
        matches!(self, TransportError::Transport { .. })
    }
}

/// 📖 The phrasebook. Turns any status code (ours or the transport's) into a stable description.
pub fn strerror(code: i32) -> &'static str {
    match code {
        0 => "No error",
        c if (1..CLIENT_ERROR_BASE).contains(&c) => match FaultKind::from_code(c) {
            Some(kind) => kind.description(),
            None => "Unknown transport error",
        },
        100 => "Input error",
        101 => "URL error",
        102 => "Parse error",
        103 => "Service error",
        104 => "Field overflow",
        105 => "Configuration error",
        _ => "Unknown error",
    }
}
