//! Rebuild a directory tree from flat records and roll up its totals
//!
//! Nodes live in a flat arena and refer to each other by [`NodeId`]. Each node
//! keeps its subdirectories in a `BTreeMap` keyed by name, so every walk sees
//! siblings in name order.

use crate::db::records::{DirectoryTotals, ScanStatus};
use crate::error::{TreeError, TreeResult};
use crate::tree::aggregate::Totals;
use crate::tree::walk::{visit_order, TreeView, WalkOrder};
use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Index into the node arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One directory of the rebuilt tree
#[derive(Debug, Clone)]
pub struct DirNode {
    /// Database id
    pub id: i64,
    pub name: OsString,
    pub parent_id: Option<i64>,
    pub mtime: Option<i64>,
    pub scan_status: ScanStatus,

    pub parent: Option<NodeId>,
    pub subdirectories: BTreeMap<OsString, NodeId>,
    /// Full path, synthesized from the root name downwards
    pub path: PathBuf,

    /// Totals over this directory's own files
    pub dir: Totals,
    /// Totals over the whole subtree
    pub tree: Totals,
}

impl DirNode {
    fn from_record(record: DirectoryTotals) -> Self {
        let dir = Totals {
            file_count: record.file_count_dir,
            allocated_size: record.allocated_size_dir,
            apparent_size: record.apparent_size_dir,
            mtime: record.mtime_dir,
        };
        Self {
            id: record.id,
            name: record.name,
            parent_id: record.parent_id,
            mtime: record.mtime,
            scan_status: record.scan_status,
            parent: None,
            subdirectories: BTreeMap::new(),
            path: PathBuf::new(),
            dir,
            tree: dir,
        }
    }
}

/// Arena-backed directory tree
#[derive(Debug, Clone)]
pub struct DirTree {
    nodes: Vec<DirNode>,
    root: NodeId,
}

impl TreeView for DirTree {
    type Node = NodeId;

    fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.nodes[node.index()].subdirectories.values().copied()
    }
}

impl DirTree {
    /// Link records by parent id, synthesize paths and aggregate totals.
    ///
    /// Exactly one record must have no parent, every other record's parent
    /// must be present, and siblings must have distinct names.
    pub fn build<I>(records: I) -> TreeResult<Self>
    where
        I: IntoIterator<Item = DirectoryTotals>,
    {
        let nodes: Vec<DirNode> = records.into_iter().map(DirNode::from_record).collect();

        let mut by_id: HashMap<i64, NodeId> = HashMap::with_capacity(nodes.len());
        let mut root: Option<NodeId> = None;
        for (index, node) in nodes.iter().enumerate() {
            let node_id = NodeId(index as u32);
            by_id.insert(node.id, node_id);
            if node.parent_id.is_none() {
                if let Some(first) = root {
                    return Err(TreeError::MultipleRoots {
                        first: nodes[first.index()].id,
                        second: node.id,
                    });
                }
                root = Some(node_id);
            }
        }
        let root = root.ok_or(TreeError::NoRoot { count: nodes.len() })?;

        let mut tree = DirTree { nodes, root };
        tree.link(&by_id)?;
        tree.assign_paths();
        tree.aggregate();

        debug!(directories = tree.nodes.len(), "Rebuilt directory tree");
        Ok(tree)
    }

    fn link(&mut self, by_id: &HashMap<i64, NodeId>) -> TreeResult<()> {
        for index in 0..self.nodes.len() {
            let Some(parent_id) = self.nodes[index].parent_id else {
                continue;
            };
            let parent = *by_id.get(&parent_id).ok_or(TreeError::MissingParent {
                id: self.nodes[index].id,
                parent_id,
            })?;

            let child = NodeId(index as u32);
            let name = self.nodes[index].name.clone();
            if let Some(&existing) = self.nodes[parent.index()].subdirectories.get(&name) {
                return Err(TreeError::DuplicateChild {
                    parent_id,
                    name: name.to_string_lossy().into_owned(),
                    first: self.nodes[existing.index()].id,
                    second: self.nodes[index].id,
                });
            }
            self.nodes[index].parent = Some(parent);
            self.nodes[parent.index()].subdirectories.insert(name, child);
        }
        Ok(())
    }

    fn assign_paths(&mut self) {
        for (node, _) in visit_order(self, self.root, WalkOrder::Pre, None) {
            let path = match self.nodes[node.index()].parent {
                Some(parent) => self.nodes[parent.index()].path.join(&self.nodes[node.index()].name),
                None => PathBuf::from(&self.nodes[node.index()].name),
            };
            self.nodes[node.index()].path = path;
        }
    }

    /// Post-order roll-up; never depth limited
    fn aggregate(&mut self) {
        for (node, _) in visit_order(self, self.root, WalkOrder::Post, None) {
            let current = &self.nodes[node.index()];
            let tree = Totals::combine(
                std::iter::once(&current.dir)
                    .chain(current.subdirectories.values().map(|c| &self.nodes[c.index()].tree)),
            );
            self.nodes[node.index()].tree = tree;
        }
    }

    /// Current root
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, node: NodeId) -> &DirNode {
        &self.nodes[node.index()]
    }

    /// Number of directories held in the arena, reachable or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of directories reachable from the current root
    pub fn reachable(&self) -> usize {
        visit_order(self, self.root, WalkOrder::Pre, None).len()
    }

    /// Locate the node for `path`, which must be the root path or lie below it
    pub fn extract_subtree(&self, path: &Path) -> TreeResult<NodeId> {
        let root_path = &self.nodes[self.root.index()].path;
        let relative = path.strip_prefix(root_path).map_err(|_| TreeError::OutsideTree {
            path: path.to_path_buf(),
            root: root_path.clone(),
        })?;

        let mut node = self.root;
        for component in relative.components() {
            let name = match component {
                Component::Normal(name) => name,
                Component::CurDir => continue,
                _ => {
                    return Err(TreeError::OutsideTree {
                        path: path.to_path_buf(),
                        root: root_path.clone(),
                    })
                }
            };

            let current = &self.nodes[node.index()];
            node = *current
                .subdirectories
                .get(name)
                .ok_or_else(|| TreeError::PathNotFound {
                    path: path.to_path_buf(),
                    component: name.to_string_lossy().into_owned(),
                    parent: current.path.clone(),
                })?;
        }

        Ok(node)
    }

    /// Make `node` the root of the tree. Paths and totals are unchanged.
    pub fn reroot(&mut self, node: NodeId) {
        self.nodes[node.index()].parent = None;
        self.root = node;
    }

    /// Prune every child the predicate rejects.
    ///
    /// Nodes are processed children-first, so the predicate sees a child after
    /// its own subdirectories have been filtered. Totals are not recomputed.
    pub fn filter<P>(&mut self, mut keep: P)
    where
        P: FnMut(&DirNode) -> bool,
    {
        for (node, _) in visit_order(self, self.root, WalkOrder::Post, None) {
            let children = std::mem::take(&mut self.nodes[node.index()].subdirectories);
            let retained: BTreeMap<OsString, NodeId> = children
                .into_iter()
                .filter(|(_, child)| keep(&self.nodes[child.index()]))
                .collect();
            self.nodes[node.index()].subdirectories = retained;
        }
    }
}

/// Keep subtrees that contain at least one file
pub fn nonempty(node: &DirNode) -> bool {
    node.tree.file_count.unwrap_or(0) > 0
}

/// Keep subtrees whose allocated size exceeds `size` bytes
pub fn min_size(size: u64) -> impl Fn(&DirNode) -> bool {
    move |node: &DirNode| node.tree.allocated_size.unwrap_or(0) > size
}
