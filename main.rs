/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Headless driver: loads a markdown vault, expands documents into a graph,
//! settles the layout and prints the result as JSON.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use bpaf::Bpaf;
use docgraph::config::ConfigError;
use docgraph::datastore::vault::VaultError;
use docgraph::datastore::{CoreStore, Vault};
use docgraph::{Graph, GraphView, Identity, ViewError, ViewSettings};
use log::info;
use serde_json::{Value, json};

/// Build a neighbourhood graph from a markdown vault.
#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version)]
struct Options {
    /// Directory of markdown documents
    #[bpaf(argument("DIR"))]
    vault: PathBuf,
    /// Document to expand, by name; repeat for several (default: all)
    #[bpaf(argument("NAME"))]
    open: Vec<String>,
    /// TOML view settings
    #[bpaf(argument("FILE"))]
    config: Option<PathBuf>,
    /// Expansion rounds
    #[bpaf(argument("N"), fallback(1), display_fallback)]
    depth: usize,
    /// Log filter, e.g. `docgraph=debug`
    #[bpaf(argument("FILTER"))]
    log: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error("failed to serialize graph: {0}")]
    Json(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = options().run();
    init_tracing(options.log.as_deref());

    match run(options).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("docgraph: {err}");
            ExitCode::FAILURE
        },
    }
}

#[cfg(feature = "tracing")]
fn init_tracing(filter: Option<&str>) {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docgraph=info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    tracing::debug!(version = docgraph::VERSION, "tracing initialized");
}

#[cfg(not(feature = "tracing"))]
fn init_tracing(_filter: Option<&str>) {}

async fn run(options: Options) -> Result<(), CliError> {
    let settings = match &options.config {
        Some(path) => ViewSettings::load(path)?,
        None => ViewSettings::default(),
    };
    let vault = Arc::new(Vault::load_dir(&options.vault)?);
    let store = CoreStore::new(Arc::clone(&vault)).with_merge_edges(settings.merge_edges);

    let mut view = GraphView::new(settings).with_host(vault.clone());
    view.register_store(Arc::new(store));
    view.initialize();

    let names = if options.open.is_empty() {
        vault.names()
    } else {
        options.open
    };
    let mut frontier: Vec<Identity> = names.into_iter().map(Identity::core).collect();
    for round in 0..options.depth {
        if frontier.is_empty() {
            break;
        }
        let report = view.expand_ids(frontier).await?;
        info!(
            "Round {}: {} nodes added, {} store failures",
            round + 1,
            report.merged.added_nodes.len(),
            report.failures.len()
        );
        frontier = report
            .merged
            .added_nodes
            .iter()
            .filter_map(|key| view.graph.get_node(*key))
            .filter(|node| !node.is_expanded())
            .map(|node| node.id.clone())
            .collect();
    }

    let steps = view.settle_layout();
    info!("Layout settled after {steps} steps");
    view.fit_to_view();

    println!("{}", serde_json::to_string_pretty(&summary(&view.graph))?);
    Ok(())
}

fn summary(graph: &Graph) -> Value {
    let nodes: Vec<Value> = graph
        .nodes()
        .map(|(_, node)| {
            json!({
                "id": node.id.encode(),
                "name": node.name(),
                "classes": node.classes.names(),
                "degree": node.degree,
                "position": [node.position.x, node.position.y],
            })
        })
        .collect();
    let edges: Vec<Value> = graph
        .edges()
        .map(|view| {
            json!({
                "id": view.edge.id.as_ref().map(Identity::encode),
                "source": view.edge.source.encode(),
                "target": view.edge.target.encode(),
                "context": view.edge.context(),
            })
        })
        .collect();
    json!({
        "revision": graph.revision(),
        "nodes": nodes,
        "edges": edges,
    })
}
