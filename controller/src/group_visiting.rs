//! Traversal of the hierarchical group topology.

use std::ops::ControlFlow;

use fleetguard_common::Group;

/// Visits the leaf groups of a topology in a deterministic order.
pub trait HierarchicalGroupVisiting {
    /// Call `visitor` for every leaf group until it breaks, returning the break value.
    fn visit_leaves<B, F>(&self, visitor: F) -> Option<B>
    where
        F: FnMut(&Group) -> ControlFlow<B>;
}

impl HierarchicalGroupVisiting for Group {
    fn visit_leaves<B, F>(&self, mut visitor: F) -> Option<B>
    where
        F: FnMut(&Group) -> ControlFlow<B>,
    {
        let mut stack = vec![self];
        while let Some(group) = stack.pop() {
            if group.is_leaf() {
                if let ControlFlow::Break(value) = visitor(group) {
                    return Some(value);
                }
            } else {
                // Reversed so that subgroups are visited in declaration order.
                stack.extend(group.subgroups.iter().rev());
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Group {
        Group::with_subgroups(
            0,
            "root",
            vec![
                Group::with_subgroups(
                    0,
                    "dc-1",
                    vec![
                        Group::leaf(0, "rack-a", &[0, 1]),
                        Group::leaf(1, "rack-b", &[2, 3]),
                    ],
                ),
                Group::leaf(1, "rack-c", &[4, 5]),
            ],
        )
    }

    #[test]
    fn test_visits_leaves_in_order() {
        let mut visited = Vec::new();
        let result: Option<()> = topology().visit_leaves(|group| {
            visited.push(group.name.clone());
            ControlFlow::Continue(())
        });

        assert!(result.is_none());
        assert_eq!(visited, vec!["rack-a", "rack-b", "rack-c"]);
    }

    #[test]
    fn test_visiting_halts_on_break() {
        let mut visited = 0;
        let found = topology().visit_leaves(|group| {
            visited += 1;
            if group.contains_node(2) {
                ControlFlow::Break(group.name.clone())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert_eq!(found.as_deref(), Some("rack-b"));
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_flat_topology_is_single_leaf() {
        let flat = Group::leaf(0, "flat", &[0, 1, 2]);
        let mut leaves = 0;
        let result: Option<()> = flat.visit_leaves(|group| {
            leaves += 1;
            assert!(group.contains_node(1));
            ControlFlow::Continue(())
        });
        assert!(result.is_none());
        assert_eq!(leaves, 1);
    }

    #[test]
    fn test_empty_root_has_no_matching_leaf() {
        let found = Group::default().visit_leaves(|group| {
            if group.contains_node(0) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert!(found.is_none());
    }
}
