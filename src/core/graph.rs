//! core::graph
//!
//! Module dependency graph for one build target.
//!
//! # Architecture
//!
//! The graph is built in three explicit phases, each producing a new value:
//!
//! 1. [`Graph`] - assembled from classification records. Nodes live in an
//!    arena indexed by [`NodeId`]; dependencies are still symbolic
//!    ([`Child::Pending`]). The [`BuildIndex`] maps names to nodes.
//! 2. [`ResolvedGraph`] - every child is [`Child::Resolved`]. Plain sources
//!    are attached under the root and implementation units under the
//!    interface or partition they implement.
//! 3. [`DependencyTree`] - the DAG reduced to a single-owner tree, plus a
//!    build order over build dependencies. Attachment edges to
//!    implementation units give ownership and reachability only; they never
//!    order a build. Module lookups for compiler flags go through the index,
//!    never through tree edges.
//!
//! # Invariants
//!
//! - Exactly one root: the first source, plain, with the primary extension
//! - Module names and partition names are unique within their kind
//! - A partition is only importable from inside its owning module
//! - Every dependency token resolves to exactly one node
//! - Build dependencies are acyclic
//! - In the tree, every node reachable from the root has exactly one owner
//!
//! # Example
//!
//! ```
//! use baker::core::classify::classify_source;
//! use baker::core::graph::Graph;
//!
//! let records = vec![
//!     classify_source("main.cpp", "import logger;\nint main() {}\n").unwrap(),
//!     classify_source("logger.cppm", "export module logger;\n").unwrap(),
//! ];
//!
//! let tree = Graph::from_records(records).unwrap().resolve().unwrap().reduce().unwrap();
//! let order: Vec<_> = tree
//!     .post_order()
//!     .iter()
//!     .map(|id| tree.record(*id).filename.as_str())
//!     .collect();
//! assert_eq!(order, vec!["logger.cppm", "main.cpp"]);
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::Path;

use thiserror::Error;

use super::classify::{self, module_of, ClassificationRecord, ClassifyError};
use super::types::{NodeId, Role, SourceKind};

/// Errors from graph construction.
///
/// Any of these aborts the target before a single compiler invocation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("target has no sources")]
    EmptyTarget,

    #[error("{filename}: only .cpp and .cppm files can be target sources")]
    UnsupportedExtension { filename: String },

    #[error("{filename}: the first source of a target must be a plain .cpp file (found {role})")]
    InvalidRoot { filename: String, role: Role },

    #[error("{filename}: listed more than once")]
    DuplicateSource { filename: String },

    #[error("{kind} '{name}' is declared by both {first} and {second}")]
    DuplicateName {
        kind: &'static str,
        name: String,
        first: String,
        second: String,
    },

    #[error("{filename}: cannot import partition '{partition}' of another module (importer belongs to '{module}')")]
    ForeignPartition {
        filename: String,
        module: String,
        partition: String,
    },

    #[error("{filename}: module '{name}' not found - did you forget to include its source?")]
    UnknownModule { filename: String, name: String },

    #[error("{filename}: implements '{name}', which is not declared by any source of the target")]
    UnknownOwner { filename: String, name: String },

    #[error("{filename}: dependency cycle through '{name}'")]
    Cycle { filename: String, name: String },

    #[error("{filename}: dependency left unresolved")]
    Unresolved { filename: String },
}

/// A symbolic dependency, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A module or partition name from an import.
    Module(String),
    /// The Nth implementation unit of the target (synthetic attachment).
    Implementation(usize),
    /// The Nth plain source of the target (synthetic attachment).
    Plain(usize),
}

/// A child entry of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Pending(Token),
    Resolved(NodeId),
}

/// One translation unit and its dependencies.
#[derive(Debug, Clone)]
pub struct Node {
    record: ClassificationRecord,
    children: Vec<Child>,
}

impl Node {
    fn new(record: ClassificationRecord) -> Self {
        let children = record
            .imports
            .iter()
            .map(|name| Child::Pending(Token::Module(name.clone())))
            .collect();
        Self { record, children }
    }

    /// Resolved dependencies, in declaration order.
    fn dependencies(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(|child| match child {
            Child::Resolved(id) => Some(*id),
            Child::Pending(_) => None,
        })
    }
}

/// Name lookups for one target.
///
/// Read-only once the graph is assembled.
#[derive(Debug, Clone, Default)]
pub struct BuildIndex {
    modules: HashMap<String, NodeId>,
    partitions: HashMap<String, NodeId>,
    implementations: Vec<NodeId>,
    plain: Vec<NodeId>,
}

impl BuildIndex {
    /// Node declaring the module interface `name`.
    pub fn module(&self, name: &str) -> Option<NodeId> {
        self.modules.get(name).copied()
    }

    /// Node declaring the partition `name` (`Module:Part`).
    pub fn partition(&self, name: &str) -> Option<NodeId> {
        self.partitions.get(name).copied()
    }

    /// Node declaring `name`, whether interface or partition.
    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.module(name).or_else(|| self.partition(name))
    }
}

// =========================================================================
// Phase 1: assembly
// =========================================================================

/// A target's graph as assembled from its sources.
#[derive(Debug, Clone)]
pub struct Graph {
    nodes: Vec<Node>,
    index: BuildIndex,
    root: NodeId,
    header_units: BTreeSet<String>,
}

/// Classify every source of a target and assemble the graph.
///
/// `sources` are relative to `source_dir`; the first one is the root.
pub fn assemble(sources: &[String], source_dir: &Path) -> Result<Graph, GraphError> {
    let mut records = Vec::with_capacity(sources.len());
    for source in sources {
        if SourceKind::from_filename(source).is_none() {
            return Err(GraphError::UnsupportedExtension {
                filename: source.clone(),
            });
        }
        records.push(classify::classify(&source_dir.join(source), source)?);
    }
    Graph::from_records(records)
}

impl Graph {
    /// Assemble a graph from classification records in target order.
    pub fn from_records(records: Vec<ClassificationRecord>) -> Result<Self, GraphError> {
        if records.is_empty() {
            return Err(GraphError::EmptyTarget);
        }

        let mut nodes: Vec<Node> = Vec::with_capacity(records.len());
        let mut index = BuildIndex::default();
        let mut header_units = BTreeSet::new();
        let mut seen = HashSet::new();

        for record in records {
            let kind = SourceKind::from_filename(&record.filename).ok_or_else(|| {
                GraphError::UnsupportedExtension {
                    filename: record.filename.clone(),
                }
            })?;
            if !seen.insert(record.filename.clone()) {
                return Err(GraphError::DuplicateSource {
                    filename: record.filename,
                });
            }

            let id = NodeId::new(nodes.len());
            if id.index() == 0 && (record.role != Role::Plain || kind != SourceKind::Primary) {
                return Err(GraphError::InvalidRoot {
                    filename: record.filename,
                    role: record.role,
                });
            }

            match record.role {
                Role::Plain => index.plain.push(id),
                Role::ModuleImplementation => index.implementations.push(id),
                Role::ModuleInterface => {
                    insert_unique(&mut index.modules, "module", &record, id, &nodes)?
                }
                Role::ModulePartition => {
                    insert_unique(&mut index.partitions, "partition", &record, id, &nodes)?
                }
            }

            header_units.extend(record.header_units.iter().cloned());
            nodes.push(Node::new(record));
        }

        tracing::debug!(
            nodes = nodes.len(),
            header_units = header_units.len(),
            "assembled graph"
        );

        Ok(Self {
            nodes,
            index,
            root: NodeId::new(0),
            header_units,
        })
    }

    /// Resolve every symbolic dependency.
    ///
    /// First attaches the synthetic children (plain sources under the root,
    /// implementation units under their owner), then resolves tokens
    /// depth-first from the root. Nodes the root cannot reach are resolved
    /// afterwards in declaration order so that every token is validated.
    pub fn resolve(mut self) -> Result<ResolvedGraph, GraphError> {
        self.attach_synthetic()?;

        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        visited[self.root.index()] = true;
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = stack.pop() {
            order.push(id);
            let resolved = self.resolve_children(id)?;
            // Reverse so the first child is resolved first.
            for child in resolved.into_iter().rev() {
                if !visited[child.index()] {
                    visited[child.index()] = true;
                    stack.push(child);
                }
            }
        }

        for index in 0..self.nodes.len() {
            if !visited[index] {
                self.resolve_children(NodeId::new(index))?;
            }
        }

        if let Some(node) = self
            .nodes
            .iter()
            .find(|n| n.children.iter().any(|c| matches!(c, Child::Pending(_))))
        {
            return Err(GraphError::Unresolved {
                filename: node.record.filename.clone(),
            });
        }

        tracing::trace!(?order, "resolution order");

        Ok(ResolvedGraph {
            nodes: self.nodes,
            index: self.index,
            root: self.root,
            header_units: self.header_units,
        })
    }

    fn attach_synthetic(&mut self) -> Result<(), GraphError> {
        let root = self.root.index();
        for position in 1..self.index.plain.len() {
            self.nodes[root]
                .children
                .push(Child::Pending(Token::Plain(position)));
        }

        for position in 0..self.index.implementations.len() {
            let id = self.index.implementations[position];
            let record = &self.nodes[id.index()].record;
            let owner_name = record.owner_module.as_deref().unwrap_or(&record.name);
            let owner = self
                .index
                .lookup(owner_name)
                .ok_or_else(|| GraphError::UnknownOwner {
                    filename: record.filename.clone(),
                    name: owner_name.to_string(),
                })?;
            self.nodes[owner.index()]
                .children
                .push(Child::Pending(Token::Implementation(position)));
        }
        Ok(())
    }

    /// Resolve the pending children of one node, returning all its dependencies.
    fn resolve_children(&mut self, id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut children = std::mem::take(&mut self.nodes[id.index()].children);
        let result = children
            .iter_mut()
            .map(|child| -> Result<NodeId, GraphError> {
                let target = match child {
                    Child::Pending(token) => self.resolve_token(id, token)?,
                    Child::Resolved(target) => *target,
                };
                *child = Child::Resolved(target);
                Ok(target)
            })
            .collect::<Result<Vec<_>, GraphError>>();
        self.nodes[id.index()].children = children;
        result
    }

    fn resolve_token(&self, from: NodeId, token: &Token) -> Result<NodeId, GraphError> {
        let record = &self.nodes[from.index()].record;
        let found = match token {
            Token::Plain(position) => self.index.plain.get(*position).copied(),
            Token::Implementation(position) => self.index.implementations.get(*position).copied(),
            Token::Module(name) => {
                if let Some(id) = self.index.module(name) {
                    Some(id)
                } else if let Some(id) = self.index.partition(name) {
                    if module_of(name) != record.module_name() {
                        return Err(GraphError::ForeignPartition {
                            filename: record.filename.clone(),
                            module: record.module_name().to_string(),
                            partition: name.clone(),
                        });
                    }
                    Some(id)
                } else {
                    None
                }
            }
        };
        found.ok_or_else(|| GraphError::UnknownModule {
            filename: record.filename.clone(),
            name: match token {
                Token::Module(name) => name.clone(),
                Token::Implementation(position) => format!("implementation #{position}"),
                Token::Plain(position) => format!("plain source #{position}"),
            },
        })
    }
}

fn insert_unique(
    map: &mut HashMap<String, NodeId>,
    kind: &'static str,
    record: &ClassificationRecord,
    id: NodeId,
    nodes: &[Node],
) -> Result<(), GraphError> {
    if let Some(existing) = map.get(&record.name) {
        return Err(GraphError::DuplicateName {
            kind,
            name: record.name.clone(),
            first: nodes[existing.index()].record.filename.clone(),
            second: record.filename.clone(),
        });
    }
    map.insert(record.name.clone(), id);
    Ok(())
}

// =========================================================================
// Phase 2: resolved DAG
// =========================================================================

/// A graph whose dependencies are all resolved to nodes.
#[derive(Debug, Clone)]
pub struct ResolvedGraph {
    nodes: Vec<Node>,
    index: BuildIndex,
    root: NodeId,
    header_units: BTreeSet<String>,
}

impl ResolvedGraph {
    /// Reduce the DAG to a single-owner tree and a build order.
    ///
    /// Ownership: walks depth-first from the root over every edge, children
    /// in declaration order, and makes each node's owner the node through
    /// which the walk first reaches it.
    ///
    /// Build order: a second walk over build dependencies only (see
    /// [`DependencyTree::build_dependencies`]). Reachable implementation
    /// units are visited from the root after its own dependencies, so each
    /// one lands after its interface and after everything it imports. A
    /// build dependency found on the current walk path is a cycle.
    pub fn reduce(self) -> Result<DependencyTree, GraphError> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Active,
            Done,
        }

        let len = self.nodes.len();
        let root = self.root.index();
        let deps: Vec<Vec<NodeId>> = self
            .nodes
            .iter()
            .map(|n| n.dependencies().collect())
            .collect();

        // Ownership and reachability.
        let mut reached = vec![false; len];
        let mut owner = vec![None; len];
        let mut tree_children = vec![Vec::new(); len];
        let mut stack = vec![(self.root, 0usize)];
        reached[root] = true;

        while let Some((id, next)) = stack.last_mut() {
            let id = *id;
            if let Some(&child) = deps[id.index()].get(*next) {
                *next += 1;
                if !reached[child.index()] {
                    reached[child.index()] = true;
                    owner[child.index()] = Some(id);
                    tree_children[id.index()].push(child);
                    stack.push((child, 0));
                }
            } else {
                stack.pop();
            }
        }

        // Build order.
        let build_deps: Vec<Vec<NodeId>> = (0..len)
            .map(|index| self.build_edges(NodeId::new(index), &deps[index]))
            .collect();
        let mut walk = build_deps.clone();
        walk[root].extend(
            self.index
                .implementations
                .iter()
                .copied()
                .filter(|id| reached[id.index()]),
        );

        let mut marks = vec![Mark::New; len];
        let mut post_order = Vec::with_capacity(len);
        let mut stack = vec![(self.root, 0usize)];
        marks[root] = Mark::Active;

        while let Some((id, next)) = stack.last_mut() {
            let id = *id;
            if let Some(&child) = walk[id.index()].get(*next) {
                *next += 1;
                match marks[child.index()] {
                    Mark::New => {
                        marks[child.index()] = Mark::Active;
                        stack.push((child, 0));
                    }
                    Mark::Active => {
                        let record = &self.nodes[child.index()].record;
                        return Err(GraphError::Cycle {
                            filename: record.filename.clone(),
                            name: if record.name.is_empty() {
                                record.filename.clone()
                            } else {
                                record.name.clone()
                            },
                        });
                    }
                    Mark::Done => {}
                }
            } else {
                marks[id.index()] = Mark::Done;
                post_order.push(id);
                stack.pop();
            }
        }

        let unreachable: Vec<NodeId> = (0..len)
            .map(NodeId::new)
            .filter(|id| !reached[id.index()])
            .collect();
        for id in &unreachable {
            tracing::warn!(
                filename = %self.nodes[id.index()].record.filename,
                "source is not imported by anything reachable from the root"
            );
        }

        Ok(DependencyTree {
            nodes: self.nodes,
            index: self.index,
            root: self.root,
            header_units: self.header_units,
            deps,
            build_deps,
            owner,
            tree_children,
            post_order,
            unreachable,
        })
    }

    /// Edges a node's compilation waits on.
    ///
    /// Attachment edges to implementation units are dropped (nothing can
    /// import an implementation unit, so every such edge is an attachment),
    /// and an implementation unit waits on the interface it implements.
    fn build_edges(&self, id: NodeId, deps: &[NodeId]) -> Vec<NodeId> {
        let mut edges: Vec<NodeId> = deps
            .iter()
            .copied()
            .filter(|d| self.nodes[d.index()].record.role != Role::ModuleImplementation)
            .collect();
        let record = &self.nodes[id.index()].record;
        if record.role == Role::ModuleImplementation {
            let implemented = record
                .owner_module
                .as_deref()
                .and_then(|name| self.index.lookup(name));
            if let Some(interface) = implemented {
                if !edges.contains(&interface) {
                    edges.push(interface);
                }
            }
        }
        edges
    }
}

// =========================================================================
// Phase 3: traversal tree
// =========================================================================

/// The single-owner tree used to schedule a target's build.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    nodes: Vec<Node>,
    index: BuildIndex,
    root: NodeId,
    header_units: BTreeSet<String>,
    deps: Vec<Vec<NodeId>>,
    build_deps: Vec<Vec<NodeId>>,
    owner: Vec<Option<NodeId>>,
    tree_children: Vec<Vec<NodeId>>,
    post_order: Vec<NodeId>,
    unreachable: Vec<NodeId>,
}

impl DependencyTree {
    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes in the arena, reachable or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty. Never true for a built tree.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Classification of a node.
    pub fn record(&self, id: NodeId) -> &ClassificationRecord {
        &self.nodes[id.index()].record
    }

    /// Name lookups, for compiler flag generation.
    pub fn index(&self) -> &BuildIndex {
        &self.index
    }

    /// Every header unit imported by any source of the target.
    pub fn header_units(&self) -> &BTreeSet<String> {
        &self.header_units
    }

    /// All direct dependencies of a node (DAG edges, not tree edges).
    pub fn dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.deps[id.index()]
    }

    /// Nodes that must be compiled before `id`.
    ///
    /// The node's imports (and, for the root, the other plain sources), plus
    /// the implemented interface for an implementation unit. An interface
    /// never waits on its own implementation units.
    pub fn build_dependencies(&self, id: NodeId) -> &[NodeId] {
        &self.build_deps[id.index()]
    }

    /// The node that owns `id` in the tree. `None` for the root and for
    /// unreachable nodes.
    pub fn owner(&self, id: NodeId) -> Option<NodeId> {
        self.owner[id.index()]
    }

    /// Tree children of a node, in declaration order.
    pub fn tree_children(&self, id: NodeId) -> &[NodeId] {
        &self.tree_children[id.index()]
    }

    /// Reachable nodes in build order: every node after its build
    /// dependencies, the root last.
    pub fn post_order(&self) -> &[NodeId] {
        &self.post_order
    }

    /// Nodes that nothing reachable from the root depends on.
    pub fn unreachable(&self) -> &[NodeId] {
        &self.unreachable
    }
}

/// Assemble, resolve and reduce the graph of one target.
pub fn build_tree(sources: &[String], source_dir: &Path) -> Result<DependencyTree, GraphError> {
    assemble(sources, source_dir)?.resolve()?.reduce()
}
