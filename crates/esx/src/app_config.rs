//! 🔧 App Configuration: the sacred TOML-to-struct pipeline, now with a list of hosts.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! In the junk drawer. Nothing." (every developer at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - `TransportConfig`: timeout, flush policy, the host list, and the capacity limits.
//! - `HostConfig`: one `{host, port}` entry. Order matters. Order is the failover order.
//! - `TransportLimits` / `FieldLimits`: the old fixed-size arrays, reborn as knobs.
//! - Validation (empty host list, zero capacity) happens in `Session::new`, not here.
//!   This module parses. The session judges.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// 📦 Everything a session needs to know before it talks to anybody.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransportConfig {
    /// ⏱️ Per-attempt time budget in seconds. Applied to each host separately, so a full
    /// failover sweep can take `timeout × hosts`. Math is cruel like that.
    /// `0` means no limit: the attempt waits as long as the host keeps the socket open.
    #[serde(default = "default_timeout_secs")]
    pub timeout: u64,
    /// 🗑️ true: each call starts with an empty response buffer.
    /// false: responses pile up, and clearing them is the caller's chore.
    #[serde(default = "default_flush_response")]
    pub flush_response: bool,
    /// 📡 Tried strictly in this order. First one to answer wins. No load balancing. No favorites.
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
    #[serde(default)]
    pub limits: TransportLimits,
}

impl TransportConfig {
    /// 🚀 A config with defaults everywhere except the part only you can provide.
    pub fn with_hosts(hosts: Vec<HostConfig>) -> Self {
        Self {
            timeout: default_timeout_secs(),
            flush_response: default_flush_response(),
            hosts,
            limits: TransportLimits::default(),
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

// ⏱️ 10 seconds: long enough for a sleepy cluster, short enough that the next host still matters.
fn default_timeout_secs() -> u64 {
    10
}

fn default_flush_response() -> bool {
    true
}

/// 📍 One place a cluster node might be listening. Might.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct HostConfig {
    /// Hostname, optionally with a scheme. `es1` means `http://es1`.
    pub host: String,
    pub port: u16,
}

impl HostConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// 🔗 `scheme://host:port`, no trailing slash. The path gets glued on by the invoker.
    pub fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        if host.contains("://") {
            format!("{}:{}", host, self.port)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }
}

/// 📏 The capacity limits. Once upon a time these were `char[32]` and friends.
/// Now they are numbers in a TOML file. Progress.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransportLimits {
    /// Hosts beyond this many are dropped with a warning.
    #[serde(default = "default_max_hosts")]
    pub max_hosts: usize,
    /// 📦 Bytes the response buffer may hold. A body bigger than this fails that host attempt.
    #[serde(default = "default_response_capacity")]
    pub response_capacity: usize,
    #[serde(default = "default_max_path_len")]
    pub max_path_len: usize,
    /// 🎯 Search hits beyond this many are ignored. Silently.
    #[serde(default = "default_max_hits")]
    pub max_hits: usize,
    #[serde(default)]
    pub fields: FieldLimits,
}

fn default_max_hosts() -> usize {
    8
}

// 📦 1 MiB. if your search response is bigger, you wanted pagination, not a bigger buffer.
fn default_response_capacity() -> usize {
    1024 * 1024
}

fn default_max_path_len() -> usize {
    255
}

fn default_max_hits() -> usize {
    64
}

impl Default for TransportLimits {
    fn default() -> Self {
        Self {
            max_hosts: default_max_hosts(),
            response_capacity: default_response_capacity(),
            max_path_len: default_max_path_len(),
            max_hits: default_max_hits(),
            fields: FieldLimits::default(),
        }
    }
}

/// ✂️ Per-field byte capacities for strings copied out of a response.
///
/// `truncate = false` (the default): an oversized value fails the call with `FieldOverflow`.
/// `truncate = true`: the old behavior, the tail is quietly lopped off at a UTF-8 boundary.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FieldLimits {
    #[serde(default = "default_error_len")]
    pub error_len: usize,
    #[serde(default = "default_name_len")]
    pub index_len: usize,
    #[serde(default = "default_name_len")]
    pub type_len: usize,
    #[serde(default = "default_id_len")]
    pub id_len: usize,
    #[serde(default = "default_name_len")]
    pub result_len: usize,
    #[serde(default = "default_source_len")]
    pub source_len: usize,
    #[serde(default)]
    pub truncate: bool,
}

fn default_error_len() -> usize {
    1024
}

fn default_name_len() -> usize {
    32
}

fn default_id_len() -> usize {
    64
}

fn default_source_len() -> usize {
    8192
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            error_len: default_error_len(),
            index_len: default_name_len(),
            type_len: default_name_len(),
            id_len: default_id_len(),
            result_len: default_name_len(),
            source_len: default_source_len(),
            truncate: false,
        }
    }
}

/// 🚀 Load the config: from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`ESX_*`) with an optional TOML file.
///   - `None`: env vars only. No file. No assumptions.
///   - `Some`: env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if config is unparseable. The message says which file, so at least
/// you'll know where to start crying.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<TransportConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ env vars are the sourdough starter. everything else gets kneaded in on top.
    let config = Figment::new().merge(Env::prefixed("ESX_"));
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (ESX_*). \
             The file exists in our hearts, but apparently not in a shape serde recognizes.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (ESX_*). \
                 No file was provided, so this one's all on the environment."
            .to_string(),
    };

    config.extract().context(context_msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_test_config(contents: &str) -> tempfile::NamedTempFile {
        // 🧪 Figment wants TOML from disk, like it's method acting. tempfile cleans up after the scene.
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("💀 Failed to create a temp config. The filesystem said 'new phone who dis'.");
        file.write_all(contents.as_bytes())
            .expect("💀 Failed to write test config.");
        file
    }

    #[test]
    fn the_one_where_hosts_keep_their_place_in_line() {
        let file = write_test_config(
            r#"
            timeout = 3
            flush_response = false

            [[hosts]]
            host = "es-primary"
            port = 9200

            [[hosts]]
            host = "https://es-mirror"
            port = 9243
            "#,
        );

        let config = load_config(Some(file.path())).expect("💀 a perfectly fine config should parse");

        assert_eq!(config.timeout, 3);
        assert!(!config.flush_response);
        assert_eq!(
            config.hosts,
            vec![
                HostConfig::new("es-primary", 9200),
                HostConfig::new("https://es-mirror", 9243)
            ]
        );
        assert_eq!(config.hosts[0].base_url(), "http://es-primary:9200");
        assert_eq!(config.hosts[1].base_url(), "https://es-mirror:9243");
    }

    #[test]
    fn the_one_where_defaults_show_up_uninvited_but_helpful() {
        let file = write_test_config(
            r#"
            [[hosts]]
            host = "localhost"
            port = 9200
            "#,
        );

        let config: TransportConfig = Figment::new()
            .merge(Toml::file(file.path()))
            .extract()
            .expect("💀 defaults should fill in the blanks");

        assert_eq!(config.timeout, 10);
        assert!(config.flush_response);
        assert_eq!(config.limits, TransportLimits::default());
        assert_eq!(config.limits.fields.index_len, 32);
        assert!(!config.limits.fields.truncate);
    }

    #[test]
    fn the_one_where_limits_are_knobs_not_laws() {
        let file = write_test_config(
            r#"
            [[hosts]]
            host = "localhost"
            port = 9200

            [limits]
            max_hits = 5
            response_capacity = 4096

            [limits.fields]
            truncate = true
            source_len = 100
            "#,
        );

        let config = load_config(Some(file.path())).expect("💀 limits should parse");

        assert_eq!(config.limits.max_hits, 5);
        assert_eq!(config.limits.response_capacity, 4096);
        assert_eq!(config.limits.max_hosts, 8);
        assert!(config.limits.fields.truncate);
        assert_eq!(config.limits.fields.source_len, 100);
        assert_eq!(config.limits.fields.id_len, 64);
    }

    #[test]
    fn the_one_where_a_port_that_is_not_a_port_gets_a_contextual_error() {
        let file = write_test_config(
            r#"
            [[hosts]]
            host = "localhost"
            port = "nine thousand two hundred"
            "#,
        );

        let err = load_config(Some(file.path())).expect_err("💀 a string port should not parse");
        assert!(format!("{err:#}").contains("Failed to parse configuration"));
    }

    #[test]
    fn the_one_where_base_url_forgives_a_trailing_slash() {
        assert_eq!(
            HostConfig::new("http://es1/", 9200).base_url(),
            "http://es1:9200"
        );
    }
}
