use crate::{
    node::TaskNode,
    sync::{AtomicUsize, Ordering},
    types::{HashMap, IndexMap, NodeId},
};
use std::collections::VecDeque;

/// Everything reachable from one root, with the bookkeeping of a single
/// walk. Built per evaluation and dropped with it.
pub(super) struct GraphPlan {
    /// Discovered nodes in depth-first discovery order; the root comes first.
    pub(super) nodes: IndexMap<NodeId, TaskNode>,
    /// Number of dependencies of each node that haven't finished yet.
    parents_left: HashMap<NodeId, AtomicUsize>,
    /// Nodes depending on each node, one entry per edge.
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl GraphPlan {
    /// Walks dependency edges from `root`.
    ///
    /// A node reachable along several paths (a diamond) is recorded once;
    /// every edge into it still contributes to its dependents' counters.
    pub(super) fn discover(root: &TaskNode) -> Self {
        let mut nodes = IndexMap::default();
        let mut parents_left = HashMap::default();
        let mut children = HashMap::<NodeId, Vec<NodeId>>::default();

        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let id = node.id();
            if nodes.contains_key(&id) {
                continue;
            }
            let dependencies = node.dependencies();
            parents_left.insert(id, AtomicUsize::new(dependencies.len()));
            // Reversed so that the first dependency is discovered first.
            for dependency in dependencies.into_iter().rev() {
                children.entry(dependency.id()).or_default().push(id);
                stack.push(dependency);
            }
            nodes.insert(id, node);
        }

        Self {
            nodes,
            parents_left,
            children,
        }
    }

    /// Nodes without dependencies, in discovery order.
    pub(super) fn independent(&self) -> VecDeque<NodeId> {
        self.nodes
            .keys()
            .filter(|id| self.parents_left[*id].load(Ordering::Relaxed) == 0)
            .copied()
            .collect()
    }

    /// Records that `id` finished, queueing every dependent whose last
    /// outstanding dependency it was.
    pub(super) fn complete(&self, id: NodeId, ready: &mut VecDeque<NodeId>) {
        let Some(children) = self.children.get(&id) else {
            return;
        };
        for &child in children {
            if self.parents_left[&child].fetch_sub(1, Ordering::AcqRel) == 1 {
                ready.push_back(child);
            }
        }
    }
}
