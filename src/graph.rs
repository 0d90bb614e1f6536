//! The pipeline topology: named nodes, directed edges, cycle detection and
//! deterministic edge enumeration.
//!
//! Kahn's algorithm does double duty: the same traversal detects cycles
//! (visited count < node count) and produces the BFS edge list the pipeline
//! materializes channels from. Multi-edges between the same (src, dst) pair
//! still count toward in-degrees but collapse to a single emitted edge, so
//! each distinct connection maps to exactly one channel.

use indexmap::IndexMap;
use std::collections::{HashSet, VecDeque};
use std::fmt;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::factory::ModuleFactory;
use crate::module::Module;

/// How a node's module instance is obtained at pipeline init.
pub(crate) enum NodeKind {
    /// Declarative: resolved through the module factory.
    Class { class: String, config: Config },
    /// Programmatic: the instance was supplied up front.
    Instance {
        module: Option<Box<dyn Module>>,
        config: Config,
    },
}

pub(crate) struct NodeSpec {
    pub(crate) kind: NodeKind,
}

/// A directed acyclic graph of named module nodes.
pub struct Graph {
    name: String,
    nodes: IndexMap<String, NodeSpec>,
    /// Insertion-ordered adjacency; multi-edges are kept as-is.
    adjacency: IndexMap<String, Vec<String>>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            adjacency: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a declarative node resolved later via the module factory.
    pub fn add_class_node(
        &mut self,
        name: impl Into<String>,
        class: impl Into<String>,
        config: Config,
    ) -> Result<()> {
        self.add_node(
            name.into(),
            NodeKind::Class {
                class: class.into(),
                config,
            },
        )
    }

    /// Registers a node carrying a concrete module instance.
    pub fn add_module_node(&mut self, module: Box<dyn Module>, config: Config) -> Result<()> {
        self.add_node(
            module.name().to_string(),
            NodeKind::Instance {
                module: Some(module),
                config,
            },
        )
    }

    fn add_node(&mut self, name: String, kind: NodeKind) -> Result<()> {
        if self.nodes.contains_key(&name) {
            return Err(PipelineError::DuplicateModule(name));
        }
        self.nodes.insert(name, NodeSpec { kind });
        Ok(())
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Adds a directed edge between two registered nodes. Unknown endpoints
    /// make this a no-op, mirroring the null-endpoint contract.
    pub fn add_edge(&mut self, src: &str, dst: &str) {
        if !self.nodes.contains_key(src) || !self.nodes.contains_key(dst) {
            tracing::warn!(src, dst, "ignoring edge with unknown endpoint");
            return;
        }
        self.adjacency
            .entry(src.to_string())
            .or_default()
            .push(dst.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() || self.nodes.is_empty()
    }

    /// Deterministic and side-effect-free cycle check (self-loops count).
    pub fn has_cycle(&self) -> bool {
        self.kahn(None).0
    }

    /// Unique (src, dst) pairs in BFS discovery order. A non-existent root
    /// yields an empty list.
    pub fn edge_list_bfs(&self, root: Option<&str>) -> Vec<(String, String)> {
        if let Some(root) = root {
            if !self.nodes.contains_key(root) {
                return Vec::new();
            }
        }
        self.kahn(root).1
    }

    /// Kahn traversal: returns (cycle-detected, deduplicated edge list).
    fn kahn(&self, root: Option<&str>) -> (bool, Vec<(String, String)>) {
        let mut in_degree: IndexMap<&str, usize> =
            self.nodes.keys().map(|n| (n.as_str(), 0)).collect();
        for (_, dsts) in &self.adjacency {
            for dst in dsts {
                if let Some(d) = in_degree.get_mut(dst.as_str()) {
                    *d += 1;
                }
            }
        }

        let mut queue: VecDeque<&str> = VecDeque::new();
        match root {
            Some(root) => {
                in_degree.insert(root, 0);
                queue.push_back(root);
            }
            None => {
                for (&node, &degree) in &in_degree {
                    if degree == 0 {
                        queue.push_back(node);
                    }
                }
            }
        }

        let mut edges = Vec::new();
        let mut visited = 0usize;
        while let Some(node) = queue.pop_front() {
            visited += 1;
            let Some(dsts) = self.adjacency.get(node) else {
                continue;
            };
            // Multi-edges all decrement the in-degree, but each unique
            // neighbor is emitted once.
            let mut emitted: HashSet<&str> = HashSet::new();
            for dst in dsts {
                if let Some(d) = in_degree.get_mut(dst.as_str()) {
                    *d -= 1;
                    if *d == 0 {
                        queue.push_back(dst.as_str());
                    }
                }
                if emitted.insert(dst.as_str()) {
                    edges.push((node.to_string(), dst.clone()));
                }
            }
        }

        (visited != self.nodes.len(), edges)
    }

    /// Full validation run before the pipeline may start: non-empty, acyclic,
    /// and (unless the graph is a single node) every node on at least one
    /// edge.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(PipelineError::EmptyGraph);
        }
        if self.has_cycle() {
            return Err(PipelineError::CycleDetected(self.name.clone()));
        }
        if self.nodes.len() > 1 {
            let mut connected: HashSet<&str> = HashSet::new();
            for (src, dsts) in &self.adjacency {
                connected.insert(src.as_str());
                for dst in dsts {
                    connected.insert(dst.as_str());
                }
            }
            for node in self.nodes.keys() {
                if !connected.contains(node.as_str()) {
                    return Err(PipelineError::DisconnectedNode(node.clone()));
                }
            }
        }
        Ok(())
    }

    /// Takes the module instance for `name` out of the graph, resolving
    /// declarative nodes through the factory. Each node resolves once.
    pub(crate) fn resolve_module(&mut self, name: &str) -> Result<(Box<dyn Module>, Config)> {
        let node = self
            .nodes
            .get_mut(name)
            .ok_or_else(|| PipelineError::Config(format!("unknown node '{name}'")))?;
        match &mut node.kind {
            NodeKind::Class { class, config } => {
                let module = ModuleFactory::create_module(class, name, config)?;
                Ok((module, config.clone()))
            }
            NodeKind::Instance { module, config } => {
                let mut module = module.take().ok_or(PipelineError::Failure)?;
                module.configure(config)?;
                Ok((module, config.clone()))
            }
        }
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}]:", self.name)?;
        for (src, dst) in self.edge_list_bfs(None) {
            writeln!(f, "  {src} -> {dst}")?;
        }
        Ok(())
    }
}
