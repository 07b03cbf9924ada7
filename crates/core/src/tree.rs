//! # Tree Topology - Validated Dependency Trees
//!
//! A dependency parse assigns every token a head. The root is the one token
//! that is its own head. Seen as a graph with an edge from each head to each
//! of its dependents, a well-formed parse is a tree rooted at that token.
//!
//! ## Core Concepts
//!
//! - **Post-order**: every node appears after all of its children. Forward
//!   passes walk this order, so a node's inputs are always ready.
//! - **Pre-order**: every node appears after its parent. Backward passes
//!   walk this order, so the upstream gradient is always ready.
//!
//! Both orders are computed once, when the tree is built.
//!
//! ## Example
//!
//! ```rust
//! use recursive_core::TreeTopology;
//!
//! // "cat sat": "sat" (1) is the root, "cat" (0) depends on it.
//! let tree = TreeTopology::from_heads(&[1, 1]).unwrap();
//! assert_eq!(tree.root(), 1);
//! assert_eq!(tree.postorder(), &[0, 1]);
//! assert_eq!(tree.preorder(), &[1, 0]);
//! ```

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, DfsPostOrder};

use crate::error::CoreError;

/// A validated dependency tree over the positions `0..len`.
///
/// Node weights in the underlying graph are sentence positions; edges run
/// from head to dependent.
#[derive(Debug, Clone)]
pub struct TreeTopology {
    graph: DiGraph<usize, ()>,
    heads: Vec<usize>,
    children: Vec<Vec<usize>>,
    root: usize,
    postorder: Vec<usize>,
    preorder: Vec<usize>,
}

impl TreeTopology {
    /// Build a tree from head pointers, where `heads[i]` is the head of
    /// position `i` and the root points to itself.
    ///
    /// Returns an error if:
    /// - There are no positions
    /// - A head is out of range
    /// - There is no root, or more than one
    /// - The head pointers contain a cycle
    pub fn from_heads(heads: &[usize]) -> Result<Self, CoreError> {
        if heads.is_empty() {
            return Err(CoreError::EmptyTree);
        }
        let len = heads.len();

        let mut root = None;
        for (node, &head) in heads.iter().enumerate() {
            if head >= len {
                return Err(CoreError::DanglingHead { node, head });
            }
            if head == node {
                if let Some(first) = root {
                    return Err(CoreError::MultipleRoots {
                        first,
                        second: node,
                    });
                }
                root = Some(node);
            }
        }
        let root = root.ok_or(CoreError::MissingRoot)?;

        let mut graph = DiGraph::with_capacity(len, len - 1);
        let indices: Vec<NodeIndex> = (0..len).map(|pos| graph.add_node(pos)).collect();
        // Dependents are kept in sentence order.
        let mut children = vec![Vec::new(); len];
        for (node, &head) in heads.iter().enumerate() {
            if head != node {
                graph.add_edge(indices[head], indices[node], ());
                children[head].push(node);
            }
        }

        // One root plus acyclic head pointers means every position reaches
        // the root, so the graph is connected.
        if let Err(cycle) = toposort(&graph, None) {
            return Err(CoreError::CyclicTree {
                node: graph[cycle.node_id()],
            });
        }

        let mut postorder = Vec::with_capacity(len);
        let mut dfs = DfsPostOrder::new(&graph, indices[root]);
        while let Some(nx) = dfs.next(&graph) {
            postorder.push(graph[nx]);
        }

        let mut preorder = Vec::with_capacity(len);
        let mut dfs = Dfs::new(&graph, indices[root]);
        while let Some(nx) = dfs.next(&graph) {
            preorder.push(graph[nx]);
        }

        Ok(Self {
            graph,
            heads: heads.to_vec(),
            children,
            root,
            postorder,
            preorder,
        })
    }

    /// Number of positions in the tree.
    pub fn len(&self) -> usize {
        self.heads.len()
    }

    /// Always false: an empty tree cannot be built.
    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// The position that is its own head.
    pub fn root(&self) -> usize {
        self.root
    }

    /// Head of `node`. The root is its own head.
    pub fn head(&self, node: usize) -> usize {
        self.heads[node]
    }

    /// Parent of `node`, or `None` for the root.
    pub fn parent(&self, node: usize) -> Option<usize> {
        let head = self.heads[node];
        (head != node).then_some(head)
    }

    /// Dependents of `node`, in sentence order.
    pub fn children(&self, node: usize) -> &[usize] {
        &self.children[node]
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children[node].is_empty()
    }

    /// Positions ordered so that children precede their head.
    pub fn postorder(&self) -> &[usize] {
        &self.postorder
    }

    /// Positions ordered so that heads precede their children.
    pub fn preorder(&self) -> &[usize] {
        &self.preorder
    }

    /// Number of edges on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.len()];
        for &node in &self.preorder {
            if let Some(parent) = self.parent(node) {
                depths[node] = depths[parent] + 1;
            }
        }
        depths.into_iter().max().unwrap_or(0)
    }

    /// Number of head-to-dependent edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_of(order: &[usize], node: usize) -> usize {
        order.iter().position(|&n| n == node).unwrap()
    }

    #[test]
    fn test_single_node_tree() {
        let tree = TreeTopology::from_heads(&[0]).unwrap();
        assert_eq!(tree.root(), 0);
        assert_eq!(tree.parent(0), None);
        assert!(tree.is_leaf(0));
        assert_eq!(tree.postorder(), &[0]);
        assert_eq!(tree.preorder(), &[0]);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_children_in_sentence_order() {
        // "a small brown dog barked loudly"
        let tree = TreeTopology::from_heads(&[3, 3, 3, 4, 4, 4]).unwrap();
        assert_eq!(tree.root(), 4);
        assert_eq!(tree.children(3), &[0, 1, 2]);
        assert_eq!(tree.children(4), &[3, 5]);
        assert_eq!(tree.edge_count(), 5);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_postorder_visits_children_first() {
        let heads = [1, 2, 2, 2, 5, 3, 2];
        let tree = TreeTopology::from_heads(&heads).unwrap();
        assert_eq!(tree.postorder().len(), heads.len());
        for node in 0..heads.len() {
            if let Some(parent) = tree.parent(node) {
                assert!(
                    position_of(tree.postorder(), node) < position_of(tree.postorder(), parent)
                );
            }
        }
        assert_eq!(*tree.postorder().last().unwrap(), 2);
    }

    #[test]
    fn test_preorder_visits_parent_first() {
        let heads = [1, 2, 2, 2, 5, 3, 2];
        let tree = TreeTopology::from_heads(&heads).unwrap();
        assert_eq!(tree.preorder().len(), heads.len());
        assert_eq!(tree.preorder()[0], 2);
        for node in 0..heads.len() {
            if let Some(parent) = tree.parent(node) {
                assert!(position_of(tree.preorder(), parent) < position_of(tree.preorder(), node));
            }
        }
    }

    #[test]
    fn test_empty_tree_rejected() {
        assert_eq!(TreeTopology::from_heads(&[]).unwrap_err(), CoreError::EmptyTree);
    }

    #[test]
    fn test_missing_root_rejected() {
        let err = TreeTopology::from_heads(&[1, 0]).unwrap_err();
        assert_eq!(err, CoreError::MissingRoot);
    }

    #[test]
    fn test_multiple_roots_rejected() {
        let err = TreeTopology::from_heads(&[0, 0, 2]).unwrap_err();
        assert_eq!(
            err,
            CoreError::MultipleRoots {
                first: 0,
                second: 2
            }
        );
    }

    #[test]
    fn test_dangling_head_rejected() {
        let err = TreeTopology::from_heads(&[1, 1, 7]).unwrap_err();
        assert_eq!(err, CoreError::DanglingHead { node: 2, head: 7 });
    }

    #[test]
    fn test_cycle_rejected() {
        // 2 is the root, but 0 and 1 point at each other.
        let err = TreeTopology::from_heads(&[1, 0, 2]).unwrap_err();
        assert!(matches!(err, CoreError::CyclicTree { node } if node == 0 || node == 1));
    }
}
