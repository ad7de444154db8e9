//! 🚀 esx: the command line face of the esx client.
//!
//! 🎬 *[narrator voice]* "It was a thin wrapper. It knew it was a thin wrapper. It was at peace with that."
//! 📦 Loads config, sets up logging, opens one session, runs one command, prints what came back.
//! The real work lives in the library. This file just points at it and nods. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use esx::{HostConfig, Method, SearchResult, Session, TransportError, TransportResult};
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "esx.toml";
const DEFAULT_PORT: u16 = 9200;

#[derive(Debug, Parser)]
#[command(name = "esx", version, about = "Talk to an Elasticsearch cluster, one host at a time")]
struct Cli {
    /// TOML config file. Defaults to ./esx.toml when that exists.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Extra host to try, as `host[:port]`. Repeatable. Replaces the configured host list.
    #[arg(long = "host", short = 'H', global = true)]
    hosts: Vec<String>,

    /// Print the extracted result (or the raw body) as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// POST <index>[/<type>]/_search
    Search {
        index: String,
        #[arg(long = "type", short = 't')]
        doc_type: Option<String>,
        #[arg(long, short = 'q', default_value = r#"{"query":{"match_all":{}}}"#)]
        query: String,
    },
    /// PUT <index>
    CreateIndex {
        index: String,
        #[arg(long, default_value = "{}")]
        settings: String,
    },
    /// DELETE <index>
    DeleteIndex { index: String },
    /// PUT <index>/<type>/<id>
    Index {
        index: String,
        doc_type: String,
        id: String,
        document: String,
    },
    /// POST <index>/_refresh
    Refresh { index: String },
    /// Raw GET; the body is printed as-is
    Get {
        path: String,
        #[arg(long, short = 'd')]
        body: Option<String>,
    },
    Post {
        path: String,
        #[arg(long, short = 'd')]
        body: Option<String>,
    },
    Put {
        path: String,
        #[arg(long, short = 'd')]
        body: Option<String>,
    },
    Delete {
        path: String,
        #[arg(long, short = 'd')]
        body: Option<String>,
    },
}

/// 🚀 main(): tracing, args, config, session, command, and a tidy exit either way.
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 logs go to stderr so stdout stays clean enough to pipe into jq
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one layer at a time
        let mut the_vibes_are_giving_connection_issues = looks_unreachable(&err);
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            let cause_str = cause.to_string();
            if cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: none of the hosts answered. Check that Elasticsearch is actually \
                running and listening where the config says it is. If you're using Docker, \
                `docker ps` is a good first look. Even clusters need a nudge sometimes. ☕"
            );
        }

        std::process::exit(1);
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    // 🔒 only fall back to ./esx.toml when it is really there, otherwise env vars carry the day
    let config_file = match cli.config.as_deref() {
        Some(path) => Some(path),
        None => Path::new(DEFAULT_CONFIG)
            .try_exists()
            .context("💀 Couldn't even check whether ./esx.toml exists. Permissions? Haunted directory?")?
            .then_some(Path::new(DEFAULT_CONFIG)),
    };

    let mut config = esx::load_config(config_file)
        .context("💀 Couldn't load the esx config. Check the TOML for typos and the ESX_* env vars for surprises.")?;
    if !cli.hosts.is_empty() {
        config.hosts = cli
            .hosts
            .iter()
            .map(|h| parse_host(h))
            .collect::<Result<Vec<_>>>()?;
    }

    let mut session = Session::new(config).context("💀 Couldn't open a session")?;
    let json = cli.json;

    let outcome = dispatch(&mut session, cli.command, json).await;
    if json {
        // -- 🧾 a refusal from the server is still a result worth printing
        if let Some(report) = json_report(&session, outcome.is_ok())? {
            println!("{report}");
        }
    }
    outcome?;
    session.close();
    Ok(())
}

async fn dispatch(session: &mut Session, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Search {
            index,
            doc_type,
            query,
        } => {
            let result = session
                .search(&index, doc_type.as_deref(), &query)
                .await
                .context(format!("💀 search on '{index}' failed"))?;
            if !json {
                println!("{}", render_search(result));
            }
        }
        Command::CreateIndex { index, settings } => {
            let ack = session
                .create_index(&index, &settings)
                .await
                .context(format!("💀 creating index '{index}' failed"))?;
            if !json {
                println!("acknowledged: {}", ack.acknowledged);
            }
        }
        Command::DeleteIndex { index } => {
            let ack = session
                .delete_index(&index)
                .await
                .context(format!("💀 deleting index '{index}' failed"))?;
            if !json {
                println!("acknowledged: {}", ack.acknowledged);
            }
        }
        Command::Index {
            index,
            doc_type,
            id,
            document,
        } => {
            let doc = session
                .index_document(&index, &doc_type, &id, &document)
                .await
                .context(format!("💀 indexing {index}/{doc_type}/{id} failed"))?;
            if !json {
                println!(
                    "{}/{}/{} version {} created: {}",
                    doc.index, doc.doc_type, doc.id, doc.version, doc.created
                );
            }
        }
        Command::Refresh { index } => {
            let refreshed = session
                .refresh(&index)
                .await
                .context(format!("💀 refreshing '{index}' failed"))?;
            if !json {
                println!(
                    "shards: {} total, {} successful, {} failed",
                    refreshed.shards.total, refreshed.shards.successful, refreshed.shards.failed
                );
            }
        }
        Command::Get { path, body } => {
            raw_call(session, Method::Get, &path, body, json).await?
        }
        Command::Post { path, body } => {
            raw_call(session, Method::Post, &path, body, json).await?
        }
        Command::Put { path, body } => {
            raw_call(session, Method::Put, &path, body, json).await?
        }
        Command::Delete { path, body } => {
            raw_call(session, Method::Delete, &path, body, json).await?
        }
    }

    Ok(())
}

async fn raw_call(
    session: &mut Session,
    method: Method,
    path: &str,
    body: Option<String>,
    json: bool,
) -> Result<()> {
    let body = body.as_deref();
    let outcome = match method {
        Method::Get => session.get(path, body).await,
        Method::Post => session.post(path, body).await,
        Method::Put => session.put(path, body).await,
        Method::Delete => session.delete(path, body).await,
    };
    outcome.context(format!("💀 {method} /{} failed", path.trim_start_matches('/')))?;
    // -- 📜 in --json mode the body is printed once at the end, like everything else
    if !json {
        println!("{}", session.response_text());
    }
    Ok(())
}

/// 🧭 `host`, `host:port`, or `scheme://host:port` into a [`HostConfig`].
fn parse_host(raw: &str) -> Result<HostConfig> {
    let (scheme, rest) = match raw.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, raw),
    };
    let (host, port) = match rest.rsplit_once(':') {
        Some((host, port)) => (
            host,
            port.parse::<u16>()
                .with_context(|| format!("💀 '{port}' in '{raw}' is not a port number"))?,
        ),
        None => (rest, DEFAULT_PORT),
    };
    let host = match scheme {
        Some(scheme) => format!("{scheme}://{host}"),
        None => host.to_string(),
    };
    Ok(HostConfig::new(host, port))
}

/// 📊 Summary line plus one table row per hit.
fn render_search(result: &SearchResult) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["_index", "_type", "_id", "_score", "_source"]);
    for hit in &result.hits.hits {
        table.add_row(vec![
            Cell::new(&hit.index),
            Cell::new(&hit.doc_type),
            Cell::new(&hit.id),
            Cell::new(format!("{:.3}", hit.score)).set_alignment(CellAlignment::Right),
            Cell::new(hit.source.as_str()),
        ]);
    }
    format!(
        "took {}ms, timed out: {}, shards {}/{} ok, {} failed, {} total hits (max score {:.3}), showing {}\n{}",
        result.took,
        result.timed_out,
        result.shards.successful,
        result.shards.total,
        result.shards.failed,
        result.hits.total,
        result.hits.max_score,
        result.hits.hits.len(),
        table
    )
}

/// 🧾 `--json`: the typed result when there is one, the raw response body when there isn't.
fn render_json(session: &Session) -> Result<String> {
    match session.last_result() {
        TransportResult::None => Ok(session.response_text().into_owned()),
        result => serde_json::to_string_pretty(result)
            .context("💀 The result refused to become JSON. Which is ironic, given where it came from."),
    }
}

/// 📬 What `--json` prints after a command. Successes print their result; failures print only
/// when the server sent back an error body, since the other failures have nothing to show.
fn json_report(session: &Session, succeeded: bool) -> Result<Option<String>> {
    match (succeeded, session.last_result()) {
        (true, _) | (false, TransportResult::Error(_)) => render_json(session).map(Some),
        (false, _) => Ok(None),
    }
}

/// 🕵️ A transport error that smells like "nobody is listening".
fn looks_unreachable(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<TransportError>())
        .any(|e| {
            matches!(
                e,
                TransportError::Transport {
                    fault: esx::FaultKind::Connect | esx::FaultKind::Timeout,
                    ..
                }
            )
        })
}
