//! Link graph built from wiki-links, using petgraph::StableDiGraph

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::Serialize;
use tracing::{debug, warn};

use crate::document::{Document, walk_documents};
use crate::exclude::ExclusionSet;
use crate::markdown::extract_wiki_links;
use crate::resolver::LinkResolver;

/// A note in the link graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteNode {
    /// Case-folded stem.
    pub id: String,
    /// Stem as written on disk.
    pub label: String,
    /// URL path of the note.
    pub path: String,
    pub file: PathBuf,
}

/// The note graph: a directed multigraph keyed by case-folded stem.
///
/// Parallel edges are kept: every link occurrence is one edge.
pub struct LinkGraph {
    inner: StableDiGraph<NoteNode, ()>,
    index: HashMap<String, NodeIndex>,
}

impl std::fmt::Debug for LinkGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkGraph")
            .field("node_count", &self.inner.node_count())
            .field("edge_count", &self.inner.edge_count())
            .finish()
    }
}

impl LinkGraph {
    pub fn new() -> Self {
        LinkGraph {
            inner: StableDiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a node, or replace the data of the node with the same id.
    pub fn upsert(&mut self, node: NoteNode) -> NodeIndex {
        match self.index.get(&node.id) {
            Some(&idx) => {
                self.inner[idx] = node;
                idx
            }
            None => {
                let id = node.id.clone();
                let idx = self.inner.add_node(node);
                self.index.insert(id, idx);
                idx
            }
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&NoteNode> {
        self.index.get(id).and_then(|&idx| self.inner.node_weight(idx))
    }

    /// Add one edge between two known nodes. Returns false if either is unknown.
    pub fn link(&mut self, source: &str, target: &str) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => {
                self.inner.add_edge(s, t, ());
                true
            }
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Link occurrences touching `id`, in either direction.
    pub fn connections(&self, id: &str) -> usize {
        self.index.get(id).map_or(0, |&idx| self.degree(idx))
    }

    fn degree(&self, idx: NodeIndex) -> usize {
        self.inner.edges_directed(idx, Direction::Outgoing).count()
            + self.inner.edges_directed(idx, Direction::Incoming).count()
    }

    /// Ids of nodes sharing at least one edge with `id`, plus `id` itself.
    pub fn neighborhood(&self, id: &str) -> HashSet<String> {
        let mut ids = HashSet::from([id.to_string()]);
        if let Some(&idx) = self.index.get(id) {
            for neighbor in self.inner.neighbors_undirected(idx) {
                ids.insert(self.inner[neighbor].id.clone());
            }
        }
        ids
    }

    /// Serializable view of the whole graph, in insertion order.
    pub fn to_data(&self) -> GraphData {
        let nodes = self
            .inner
            .node_indices()
            .map(|idx| self.node_view(idx))
            .collect();
        let edges = self
            .inner
            .edge_indices()
            .filter_map(|e| self.inner.edge_endpoints(e))
            .map(|(source, target)| EdgeView {
                source: self.inner[source].id.clone(),
                target: self.inner[target].id.clone(),
            })
            .collect();
        GraphData { nodes, edges }
    }

    /// Serializable ego network of `current`.
    pub fn local(&self, current: &str) -> LocalGraphData {
        let keep = self.neighborhood(current);
        let data = self.to_data();

        let nodes = data
            .nodes
            .into_iter()
            .filter(|n| keep.contains(&n.id))
            .map(|node| LocalNodeView {
                current: node.id == current,
                node,
            })
            .collect();
        let edges = data
            .edges
            .into_iter()
            .filter(|e| keep.contains(&e.source) && keep.contains(&e.target))
            .collect();

        LocalGraphData {
            nodes,
            edges,
            current: current.to_string(),
        }
    }

    fn node_view(&self, idx: NodeIndex) -> NodeView {
        let node = &self.inner[idx];
        NodeView {
            id: node.id.clone(),
            label: node.label.clone(),
            path: node.path.clone(),
            connections: self.degree(idx),
        }
    }
}

impl Default for LinkGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// Graph node as sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
    pub id: String,
    pub label: String,
    pub path: String,
    pub connections: usize,
}

/// Graph edge as sent to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeView {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphData {
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalNodeView {
    #[serde(flatten)]
    pub node: NodeView,
    pub current: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalGraphData {
    pub nodes: Vec<LocalNodeView>,
    pub edges: Vec<EdgeView>,
    pub current: String,
}

/// Scans the notes tree and assembles a [`LinkGraph`].
///
/// Nothing is cached: each call walks and reads every note again.
pub struct GraphBuilder<'a> {
    resolver: &'a LinkResolver,
    exclusions: &'a ExclusionSet,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(resolver: &'a LinkResolver, exclusions: &'a ExclusionSet) -> Self {
        GraphBuilder {
            resolver,
            exclusions,
        }
    }

    pub fn build(&self) -> LinkGraph {
        let root = self.resolver.root();
        let mut graph = LinkGraph::new();

        for file in walk_documents(root) {
            let Some(doc) = Document::new(root, &file) else {
                continue;
            };
            if self.exclusions.is_excluded(&doc.id) {
                debug!("Excluding {} from graph", doc.id);
                continue;
            }
            graph.upsert(NoteNode {
                id: doc.title.to_lowercase(),
                label: doc.title.clone(),
                path: doc.url(),
                file,
            });
        }

        let sources: Vec<(String, PathBuf)> = graph
            .inner
            .node_indices()
            .map(|idx| {
                let node = &graph.inner[idx];
                (node.id.clone(), node.file.clone())
            })
            .collect();

        let mut pending = Vec::new();
        for (source, file) in sources {
            let content = match read_note(&file) {
                Some(content) => content,
                None => continue,
            };

            for token in extract_wiki_links(&content) {
                let target = token.to_lowercase();
                if self.exclusions.is_excluded(&target) || target == source {
                    continue;
                }
                if self.resolver.allow_all_paths() && !graph.contains(&target) {
                    self.register_external(&mut graph, token, &target);
                }
                pending.push((source.clone(), target));
            }
        }

        for (source, target) in &pending {
            graph.link(source, target);
        }

        debug!(
            "Built link graph: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );
        graph
    }

    /// Build the graph and cut out the ego network of the note at `file`.
    pub fn local(&self, file: &Path) -> LocalGraphData {
        let current = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        self.build().local(&current)
    }

    fn register_external(&self, graph: &mut LinkGraph, token: &str, target: &str) {
        let Some(found) = self.resolver.locate_unrestricted(token) else {
            return;
        };
        let label = found
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| token.to_string());
        graph.upsert(NoteNode {
            id: target.to_string(),
            label,
            path: self.resolver.display_path(&found),
            file: found,
        });
    }
}

fn read_note(file: &Path) -> Option<String> {
    match std::fs::read(file) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(content) => Some(content),
            Err(_) => {
                warn!("Skipping {}: not valid UTF-8", file.display());
                None
            }
        },
        Err(e) => {
            warn!("Skipping {}: {}", file.display(), e);
            None
        }
    }
}
