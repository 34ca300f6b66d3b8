use std::collections::HashSet;

use crate::document::OutlineEntry;

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNode {
    pub title: String,
    pub target: Option<usize>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub depth: usize,
}

/// Document outline as an arena of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTree {
    nodes: Vec<IndexNode>,
    roots: Vec<NodeId>,
}

impl IndexTree {
    /// Builds the tree from entries in document order. A depth jump of more
    /// than one level attaches the entry to the deepest open ancestor.
    pub fn from_outline(entries: &[OutlineEntry]) -> Self {
        let mut tree = IndexTree::default();
        let mut stack: Vec<NodeId> = Vec::new();
        for entry in entries {
            let depth = entry.depth.max(1);
            while stack.len() >= depth {
                stack.pop();
            }
            let parent = stack.last().copied();
            let id = tree.nodes.len();
            tree.nodes.push(IndexNode {
                title: entry.title.clone(),
                target: entry.page,
                parent,
                children: Vec::new(),
                depth: stack.len() + 1,
            });
            match parent {
                Some(parent) => tree.nodes[parent].children.push(id),
                None => tree.roots.push(id),
            }
            stack.push(id);
        }
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &IndexNode {
        &self.nodes[id]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    fn siblings(&self, id: NodeId) -> &[NodeId] {
        match self.nodes[id].parent {
            Some(parent) => &self.nodes[parent].children,
            None => &self.roots,
        }
    }

    fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.siblings(id);
        let pos = siblings.iter().position(|&s| s == id)?;
        pos.checked_sub(1).map(|p| siblings[p])
    }

    fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let siblings = self.siblings(id);
        let pos = siblings.iter().position(|&s| s == id)?;
        siblings.get(pos + 1).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMove {
    Up,
    Down,
    Collapse,
    Expand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub id: NodeId,
    pub depth: usize,
    pub expanded: bool,
    pub has_children: bool,
}

/// Cursor and expansion state over an [`IndexTree`].
#[derive(Debug, Clone)]
pub struct IndexView {
    tree: IndexTree,
    cursor: NodeId,
    expanded: HashSet<NodeId>,
}

impl IndexView {
    pub fn new(tree: IndexTree) -> Option<Self> {
        let cursor = *tree.roots.first()?;
        Some(Self {
            tree,
            cursor,
            expanded: HashSet::new(),
        })
    }

    pub fn tree(&self) -> &IndexTree {
        &self.tree
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id) && !self.tree.nodes[id].children.is_empty()
    }

    pub fn navigate(&mut self, movement: IndexMove) {
        let tree = &self.tree;
        let cursor = self.cursor;
        match movement {
            IndexMove::Up => {
                if let Some(mut target) = tree.previous_sibling(cursor) {
                    while self.is_expanded(target) {
                        match tree.nodes[target].children.last() {
                            Some(&last) => target = last,
                            None => break,
                        }
                    }
                    self.cursor = target;
                } else if let Some(parent) = tree.nodes[cursor].parent {
                    self.cursor = parent;
                }
            }
            IndexMove::Down => {
                if self.is_expanded(cursor) {
                    self.cursor = tree.nodes[cursor].children[0];
                    return;
                }
                let mut node = cursor;
                loop {
                    if let Some(next) = tree.next_sibling(node) {
                        self.cursor = next;
                        return;
                    }
                    match tree.nodes[node].parent {
                        Some(parent) if tree.nodes[node].depth > 1 => node = parent,
                        _ => return,
                    }
                }
            }
            IndexMove::Collapse => {
                if self.is_expanded(cursor) {
                    self.expanded.remove(&cursor);
                } else if let Some(parent) = tree.nodes[cursor].parent {
                    self.expanded.remove(&parent);
                    self.cursor = parent;
                }
            }
            IndexMove::Expand => {
                if let Some(&first) = tree.nodes[cursor].children.first() {
                    self.expanded.insert(cursor);
                    self.cursor = first;
                }
            }
        }
    }

    /// Target page of the node under the cursor.
    pub fn select(&self) -> Option<usize> {
        self.tree.nodes[self.cursor].target
    }

    /// Expands the ancestors of the deepest entry whose target is at or
    /// before `page` and moves the cursor onto it.
    pub fn reveal_page(&mut self, page: usize) {
        let best = self
            .tree
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.target.map_or(false, |t| t <= page))
            .max_by_key(|(id, node)| (node.target, std::cmp::Reverse(*id)))
            .map(|(id, _)| id);
        let Some(best) = best else {
            return;
        };
        let mut ancestor = self.tree.nodes[best].parent;
        while let Some(id) = ancestor {
            self.expanded.insert(id);
            ancestor = self.tree.nodes[id].parent;
        }
        self.cursor = best;
    }

    /// Rows currently visible, in display order.
    pub fn visible_rows(&self) -> Vec<IndexRow> {
        let mut rows = Vec::new();
        let mut pending: Vec<NodeId> = self.tree.roots.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            let node = &self.tree.nodes[id];
            let expanded = self.is_expanded(id);
            rows.push(IndexRow {
                id,
                depth: node.depth,
                expanded,
                has_children: !node.children.is_empty(),
            });
            if expanded {
                pending.extend(node.children.iter().rev().copied());
            }
        }
        rows
    }
}
