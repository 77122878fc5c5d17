use crate::model::*;
use macroquad::prelude::debug;
use rayon::prelude::*;

/// Stable index of a node inside a [`SearchTree`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
pub struct Node {
    state: GameState,
    depth: usize,
    action: Option<MoveAction>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    solution: bool,
}

impl Node {
    fn new(state: GameState, depth: usize, action: Option<MoveAction>, parent: Option<NodeId>) -> Self {
        Self {
            state,
            depth,
            action,
            parent,
            first_child: None,
            next_sibling: None,
            solution: false,
        }
    }

    pub fn get_state(&self) -> &GameState {
        &self.state
    }
    pub fn get_depth(&self) -> usize {
        self.depth
    }
    /// The pour that produced this node; `None` for the root.
    pub fn get_action(&self) -> Option<MoveAction> {
        self.action
    }
    pub fn get_first_child(&self) -> Option<NodeId> {
        self.first_child
    }
    /// Set when this node or one of its descendants is won.
    pub fn is_solution(&self) -> bool {
        self.solution
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub node_count: usize,
    pub deepest_level: usize,
    pub solution_nodes: usize,
    pub won_leaves: usize,
}

/// Every state reachable from the root within `max_depth` pours. Nodes live
/// in one arena and refer to each other by [`NodeId`]; the tree never changes
/// after [`SearchTree::build`] returns.
pub struct SearchTree {
    nodes: Vec<Node>,
}

/// Walks a sibling chain starting at a node's first child.
pub struct Children<'a> {
    tree: &'a SearchTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.node(current).next_sibling;
        Some(current)
    }
}

impl SearchTree {
    pub const ROOT: NodeId = NodeId(0);

    /// Expands the root depth-first with an explicit stack. Children of a node
    /// are all linked before any of them is expanded, and the last child
    /// pushed is expanded first. Won nodes are marked and never expanded.
    ///
    /// Each root child's subtree is built in its own arena on the rayon pool
    /// and grafted back in stack order, so ids, sibling order and flags match
    /// a single sequential expansion.
    pub fn build(root_state: GameState, max_depth: usize, full_containers: usize) -> Self {
        let mut tree = Self::with_root(root_state, 0);
        let frontier = if max_depth > 0 {
            tree.expand_node(Self::ROOT, full_containers)
        } else {
            Vec::new()
        };

        let subtrees: Vec<SearchTree> = frontier
            .par_iter()
            .map(|&child| {
                let node = tree.node(child);
                let mut subtree = Self::with_root(node.state.clone(), node.depth);
                subtree.expand_depth_first(Self::ROOT, max_depth, full_containers);
                subtree
            })
            .collect();

        // The stack pops the last root child first.
        for (child, subtree) in frontier.into_iter().zip(subtrees).rev() {
            tree.graft(child, subtree);
        }

        debug!(
            "Built search tree: {} nodes, depth bound {}, root solvable: {}",
            tree.len(),
            max_depth,
            tree.node(Self::ROOT).solution
        );
        tree
    }

    fn with_root(state: GameState, depth: usize) -> Self {
        SearchTree {
            nodes: vec![Node::new(state, depth, None, None)],
        }
    }

    fn expand_depth_first(&mut self, start: NodeId, max_depth: usize, full_containers: usize) {
        let mut stack = vec![start];
        while let Some(parent) = stack.pop() {
            if self.node(parent).depth + 1 > max_depth {
                continue;
            }
            stack.extend(self.expand_node(parent, full_containers));
        }
    }

    /// Links one child per legal move under `parent`, in move order. Won
    /// children are marked; the rest are returned for expansion.
    fn expand_node(&mut self, parent: NodeId, full_containers: usize) -> Vec<NodeId> {
        let depth = self.node(parent).depth;
        let state = self.node(parent).state.clone();
        let mut pending = Vec::new();
        let mut previous: Option<NodeId> = None;
        for action in state.legal_moves() {
            let next = state.apply_move(&action);
            let won = next.is_won(full_containers);
            let child = self.push_node(Node::new(next, depth + 1, Some(action), Some(parent)));
            match previous {
                None => self.nodes[parent.0].first_child = Some(child),
                Some(sibling) => self.nodes[sibling.0].next_sibling = Some(child),
            }
            previous = Some(child);

            if won {
                self.mark_solution_path(child);
            } else {
                pending.push(child);
            }
        }
        pending
    }

    /// Appends `subtree` below `at`. The subtree's root stands for `at`
    /// itself; its other nodes get ids after the current arena.
    fn graft(&mut self, at: NodeId, subtree: SearchTree) {
        let offset = self.nodes.len() - 1;
        let remap = |id: NodeId| if id == Self::ROOT { at } else { NodeId(id.0 + offset) };

        let mut nodes = subtree.nodes.into_iter();
        let Some(local_root) = nodes.next() else {
            return;
        };
        self.nodes[at.0].first_child = local_root.first_child.map(remap);
        for mut node in nodes {
            node.parent = node.parent.map(remap);
            node.first_child = node.first_child.map(remap);
            node.next_sibling = node.next_sibling.map(remap);
            self.nodes.push(node);
        }
        if local_root.solution {
            self.mark_solution_path(at);
        }
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Flags `id` and its ancestors. An already flagged ancestor has flagged
    /// ancestors of its own, so the walk stops there.
    fn mark_solution_path(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &mut self.nodes[node_id.0];
            if node.solution {
                break;
            }
            node.solution = true;
            current = node.parent;
        }
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.node(id).first_child,
        }
    }

    /// The child of `id` holding exactly `state`, if any.
    pub fn find_child(&self, id: NodeId, state: &GameState) -> Option<NodeId> {
        self.children(id)
            .find(|&child| self.node(child).state == *state)
    }

    /// First child of `id`, in move order, that leads to a win.
    pub fn first_solution_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).find(|&child| self.node(child).solution)
    }

    /// Follows first flagged children from `id` down to a winning leaf.
    /// Returns `None` when `id` itself cannot reach a win.
    pub fn solution_path(&self, id: NodeId) -> Option<Vec<NodeId>> {
        if !self.node(id).solution {
            return None;
        }
        let mut path = vec![id];
        let mut current = id;
        while let Some(next) = self.first_solution_child(current) {
            path.push(next);
            current = next;
        }
        Some(path)
    }

    /// All nodes level by level; each node's children appear in move order.
    pub fn breadth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.len());
        order.push(Self::ROOT);
        let mut cursor = 0;
        while cursor < order.len() {
            let id = order[cursor];
            order.extend(self.children(id));
            cursor += 1;
        }
        order
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats {
            node_count: self.len(),
            ..TreeStats::default()
        };
        for node in &self.nodes {
            stats.deepest_level = stats.deepest_level.max(node.depth);
            if node.solution {
                stats.solution_nodes += 1;
                if node.first_child.is_none() {
                    stats.won_leaves += 1;
                }
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Top-first `A=[a,a,b,b]`, `B=[b,b,a,a]` plus one empty container.
    fn two_color_puzzle() -> GameState {
        GameState::new_from_repr("BBAA AABB ....").unwrap()
    }

    fn child_states(tree: &SearchTree, id: NodeId) -> Vec<GameState> {
        tree.children(id)
            .map(|child| tree.node(child).get_state().clone())
            .collect()
    }

    #[test]
    fn test_root_children_follow_move_order() {
        let root_state = two_color_puzzle();
        let tree = SearchTree::build(root_state.clone(), 1, 2);
        let actions: Vec<MoveAction> = tree
            .children(tree.root())
            .map(|child| tree.node(child).get_action().unwrap())
            .collect();
        assert_eq!(actions, root_state.legal_moves());
        for child in tree.children(tree.root()) {
            assert_eq!(tree.node(child).get_depth(), 1);
            assert_eq!(tree.node(child).parent, Some(tree.root()));
        }
    }

    #[test]
    fn test_children_linked_before_expansion() {
        let tree = SearchTree::build(two_color_puzzle(), 2, 2);
        let root_children: Vec<NodeId> = tree.children(tree.root()).collect();
        assert_eq!(root_children, vec![NodeId(1), NodeId(2)]);
        // The first node created after the root's children belongs to the
        // last root child, which the stack expands first.
        assert_eq!(tree.node(NodeId(3)).parent, Some(NodeId(2)));
        assert_eq!(tree.node(NodeId(2)).first_child, Some(NodeId(3)));
    }

    #[test]
    fn test_parallel_build_matches_sequential_expansion() {
        let state = GameState::new_from_repr("CABA BCAC ABCB .... ....").unwrap();
        let tree = SearchTree::build(state.clone(), 4, 3);

        let mut sequential = SearchTree::with_root(state, 0);
        sequential.expand_depth_first(SearchTree::ROOT, 4, 3);

        assert_eq!(tree.len(), sequential.len());
        for (a, b) in tree.nodes.iter().zip(&sequential.nodes) {
            assert_eq!(a.state, b.state);
            assert_eq!(a.depth, b.depth);
            assert_eq!(a.action, b.action);
            assert_eq!(a.parent, b.parent);
            assert_eq!(a.first_child, b.first_child);
            assert_eq!(a.next_sibling, b.next_sibling);
            assert_eq!(a.solution, b.solution);
        }
    }

    #[test]
    fn test_zero_depth_keeps_only_root() {
        let tree = SearchTree::build(two_color_puzzle(), 0, 2);
        assert_eq!(tree.len(), 1);
        assert!(!tree.node(tree.root()).is_solution());
    }

    #[test]
    fn test_depth_bound() {
        let tree = SearchTree::build(two_color_puzzle(), 3, 2);
        assert!(tree.stats().deepest_level <= 3);
        for id in tree.breadth_first() {
            if tree.node(id).get_depth() == 3 {
                assert!(tree.node(id).first_child.is_none());
            }
        }
    }

    #[test]
    fn test_end_to_end_two_colors() {
        let tree = SearchTree::build(two_color_puzzle(), 4, 2);
        let won: Vec<NodeId> = tree
            .breadth_first()
            .into_iter()
            .filter(|&id| tree.node(id).get_state().is_won(2))
            .collect();
        assert!(!won.is_empty());
        assert!(won.iter().any(|&id| tree.node(id).get_depth() <= 3));
        for &id in &won {
            assert!(tree.node(id).is_solution());
            assert!(tree.node(id).first_child.is_none());
        }

        assert!(tree.node(tree.root()).is_solution());
        let hint = tree.first_solution_child(tree.root()).unwrap();
        // A -> E is the first legal pour and starts a winning line.
        assert_eq!(tree.node(hint).get_action(), Some(MoveAction::new(0, 2)));

        let path = tree.solution_path(tree.root()).unwrap();
        assert_eq!(path[0], tree.root());
        let last = *path.last().unwrap();
        assert!(tree.node(last).get_state().is_won(2));
        for pair in path.windows(2) {
            assert_eq!(tree.node(pair[1]).parent, Some(pair[0]));
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let a = SearchTree::build(two_color_puzzle(), 5, 2);
        let b = SearchTree::build(two_color_puzzle(), 5, 2);
        assert_eq!(a.len(), b.len());
        assert_eq!(a.stats(), b.stats());
        for id in a.breadth_first() {
            assert_eq!(a.node(id).get_state(), b.node(id).get_state());
            assert_eq!(child_states(&a, id), child_states(&b, id));
            assert_eq!(a.node(id).is_solution(), b.node(id).is_solution());
        }
    }

    #[test]
    fn test_flags_match_won_leaves() {
        let state = GameState::new_from_repr("ABAB BABA .... ....").unwrap();
        let tree = SearchTree::build(state, 5, 2);
        let order = tree.breadth_first();
        assert_eq!(order.len(), tree.len());

        // Recompute flags bottom-up from won nodes and compare.
        let mut expected = vec![false; tree.len()];
        for &id in order.iter().rev() {
            let node = tree.node(id);
            expected[id.0] = node.get_state().is_won(2)
                || tree.children(id).any(|child| expected[child.0]);
        }
        for &id in &order {
            assert_eq!(tree.node(id).is_solution(), expected[id.0]);
            if tree.node(id).is_solution() {
                if let Some(parent) = tree.node(id).parent {
                    assert!(tree.node(parent).is_solution());
                }
            }
        }
    }

    #[test]
    fn test_children_are_distinct() {
        let state = GameState::new_from_repr("CABA BCAC ABCB .... ....").unwrap();
        let tree = SearchTree::build(state, 3, 3);
        for id in tree.breadth_first() {
            let states = child_states(&tree, id);
            for (i, a) in states.iter().enumerate() {
                for b in &states[i + 1..] {
                    assert_ne!(a, b);
                }
                assert_eq!(tree.find_child(id, a).map(|c| tree.node(c).get_state()), Some(a));
            }
        }
    }

    #[test]
    fn test_unsolvable_within_bound() {
        let tree = SearchTree::build(two_color_puzzle(), 1, 2);
        assert!(!tree.node(tree.root()).is_solution());
        assert!(tree.first_solution_child(tree.root()).is_none());
        assert!(tree.solution_path(tree.root()).is_none());
        assert_eq!(tree.stats().solution_nodes, 0);
    }

    #[test]
    fn test_no_legal_moves_gives_leaf_root() {
        let state = GameState::new_from_repr("AABB BBAA").unwrap();
        let tree = SearchTree::build(state, 4, 2);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.children(tree.root()).count(), 0);
    }
}
