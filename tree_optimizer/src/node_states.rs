use std::collections::{BTreeSet, HashSet};

use crate::graph::NodeRef;

/// Per-index target and removal flags of a search space.
///
/// A node is never both a fixed and a variable target; fixed wins if the caller passes both.
/// Removing a node also clears its target flags.
#[derive(Debug, Clone)]
pub struct NodeStates {
    search_space: Vec<NodeRef>,
    fixed_targets: HashSet<NodeRef>,
    variable_targets: HashSet<NodeRef>,
    fixed_target_indices: BTreeSet<usize>,
    is_fixed_target: Vec<bool>,
    is_variable_target: Vec<bool>,
    is_target: Vec<bool>,
    is_removed: Vec<bool>,
}

impl NodeStates {
    pub fn new(
        search_space: &[NodeRef],
        fixed_targets: impl IntoIterator<Item = NodeRef>,
        variable_targets: impl IntoIterator<Item = NodeRef>,
    ) -> Self {
        let fixed_targets: HashSet<NodeRef> = fixed_targets.into_iter().collect();
        let variable_targets = variable_targets
            .into_iter()
            .filter(|n| !fixed_targets.contains(n))
            .collect();
        let mut states = NodeStates {
            search_space: Vec::new(),
            fixed_targets,
            variable_targets,
            fixed_target_indices: BTreeSet::new(),
            is_fixed_target: Vec::new(),
            is_variable_target: Vec::new(),
            is_target: Vec::new(),
            is_removed: Vec::new(),
        };
        states.set_search_space(search_space);
        states
    }

    /// Replaces the search space, recomputing every flag. Removal flags are reset.
    pub fn set_search_space(&mut self, search_space: &[NodeRef]) {
        self.search_space = search_space.to_vec();
        self.is_fixed_target = search_space.iter().map(|n| self.fixed_targets.contains(n)).collect();
        self.is_variable_target = search_space.iter().map(|n| self.variable_targets.contains(n)).collect();
        self.is_target = self
            .is_fixed_target
            .iter()
            .zip(&self.is_variable_target)
            .map(|(&f, &v)| f || v)
            .collect();
        self.is_removed = vec![false; search_space.len()];
        self.fixed_target_indices = (0..search_space.len()).filter(|&i| self.is_fixed_target[i]).collect();
    }

    pub fn search_space(&self) -> &[NodeRef] {
        &self.search_space
    }

    pub fn search_space_size(&self) -> usize {
        self.search_space.len()
    }

    pub fn is_fixed_target(&self, i: usize) -> bool {
        self.is_fixed_target[i]
    }

    pub fn is_variable_target(&self, i: usize) -> bool {
        self.is_variable_target[i]
    }

    pub fn is_target(&self, i: usize) -> bool {
        self.is_target[i]
    }

    pub fn is_removed(&self, i: usize) -> bool {
        self.is_removed[i]
    }

    pub fn is_fixed_target_node(&self, node: NodeRef) -> bool {
        self.fixed_targets.contains(&node)
    }

    pub fn is_target_node(&self, node: NodeRef) -> bool {
        self.fixed_targets.contains(&node) || self.variable_targets.contains(&node)
    }

    /// Indices of the fixed targets that are not removed, ascending.
    pub fn fixed_target_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.fixed_target_indices.iter().copied()
    }

    pub fn fixed_targets(&self) -> &HashSet<NodeRef> {
        &self.fixed_targets
    }

    pub fn variable_targets(&self) -> &HashSet<NodeRef> {
        &self.variable_targets
    }

    pub fn fixed_target_count(&self) -> usize {
        self.fixed_targets.len()
    }

    pub fn variable_target_count(&self) -> usize {
        self.variable_targets.len()
    }

    pub fn target_count(&self) -> usize {
        self.fixed_targets.len() + self.variable_targets.len()
    }

    pub fn mark_node_as_removed(&mut self, i: usize) {
        self.is_removed[i] = true;
        if !self.is_target[i] {
            return;
        }
        let node = self.search_space[i];
        self.is_target[i] = false;
        if self.is_fixed_target[i] {
            self.is_fixed_target[i] = false;
            self.fixed_targets.remove(&node);
            self.fixed_target_indices.remove(&i);
        } else {
            self.is_variable_target[i] = false;
            self.variable_targets.remove(&node);
        }
    }

    /// Nodes marked as removed since the search space was last set.
    pub fn removed_nodes(&self) -> Vec<NodeRef> {
        self.search_space
            .iter()
            .zip(&self.is_removed)
            .filter(|(_, &removed)| removed)
            .map(|(&n, _)| n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(ids: &[usize]) -> Vec<NodeRef> {
        ids.iter().map(|&i| NodeRef(i)).collect()
    }

    #[test]
    fn fixed_wins_over_variable() {
        let space = refs(&[0, 1, 2, 3]);
        let states = NodeStates::new(&space, refs(&[1]), refs(&[1, 2]));
        assert!(states.is_fixed_target(1));
        assert!(!states.is_variable_target(1));
        assert!(states.is_variable_target(2));
        assert!(states.is_target(2));
        assert!(!states.is_target(0));
        assert_eq!(states.target_count(), 2);
    }

    #[test]
    fn removal_clears_target_flags() {
        let space = refs(&[5, 6, 7]);
        let mut states = NodeStates::new(&space, refs(&[5, 7]), refs(&[6]));
        assert_eq!(states.fixed_target_indices().collect::<Vec<_>>(), vec![0, 2]);
        states.mark_node_as_removed(2);
        states.mark_node_as_removed(1);
        assert!(states.is_removed(2));
        assert!(!states.is_target(2));
        assert!(!states.is_fixed_target(2));
        assert_eq!(states.fixed_target_count(), 1);
        assert_eq!(states.variable_target_count(), 0);
        assert_eq!(states.fixed_target_indices().collect::<Vec<_>>(), vec![0]);
        assert_eq!(states.removed_nodes(), refs(&[6, 7]));
    }

    #[test]
    fn new_search_space_recomputes_indices() {
        let mut states = NodeStates::new(&refs(&[0, 1, 2]), refs(&[2]), refs(&[]));
        states.mark_node_as_removed(0);
        states.set_search_space(&refs(&[1, 2]));
        assert!(!states.is_removed(0));
        assert!(states.is_fixed_target(1));
        assert_eq!(states.fixed_target_indices().collect::<Vec<_>>(), vec![1]);
    }
}
