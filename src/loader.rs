//! Declarative pipeline loader.
//!
//! Parses a YAML document of the shape
//!
//! ```yaml
//! graph:
//!   name: my-pipeline
//!   modules:
//!     - name: puller
//!       class: TickSource
//!       config:
//!         intervalMs: 50
//!   connections:
//!     - from: puller
//!       to: sink
//! ```
//!
//! into a validated [`Graph`]. Any structural problem (missing `graph`,
//! duplicate module names, connections naming unknown modules, cycles, empty
//! graph) fails the load and returns no pipeline.

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::graph::Graph;

#[derive(Debug, Deserialize)]
struct ConfigDoc {
    graph: GraphDoc,
}

#[derive(Debug, Deserialize)]
struct GraphDoc {
    name: String,
    modules: Vec<ModuleDoc>,
    #[serde(default)]
    connections: Vec<ConnectionDoc>,
}

#[derive(Debug, Deserialize)]
struct ModuleDoc {
    name: String,
    class: String,
    #[serde(default)]
    config: Config,
}

#[derive(Debug, Deserialize)]
struct ConnectionDoc {
    from: String,
    to: String,
}

/// Loads and validates a graph from a YAML file.
pub fn load_graph(path: &Path) -> Result<Graph> {
    let text = fs::read_to_string(path)?;
    let graph = parse_graph(&text)?;
    tracing::info!(graph = %graph.name(), config = %path.display(), "graph loaded");
    Ok(graph)
}

/// Parses and validates a graph from YAML text.
pub fn parse_graph(text: &str) -> Result<Graph> {
    let doc: ConfigDoc = serde_yaml_bw::from_str(text)?;
    let mut graph = Graph::new(doc.graph.name);

    for module in doc.graph.modules {
        graph.add_class_node(module.name, module.class, module.config)?;
    }

    for connection in &doc.graph.connections {
        if !graph.contains_node(&connection.from) || !graph.contains_node(&connection.to) {
            return Err(PipelineError::UnknownConnection {
                from: connection.from.clone(),
                to: connection.to.clone(),
            });
        }
        graph.add_edge(&connection.from, &connection.to);
    }

    graph.validate()?;
    Ok(graph)
}
