//! Order-parameterized traversal over anything with a children relation
//!
//! Traversal is iterative (explicit stack or queue) so deep directory trees
//! cannot overflow the call stack.

use std::collections::VecDeque;

/// A tree that can enumerate the children of a node.
///
/// Children must be yielded in a stable order; walks visit them in that order.
pub trait TreeView {
    /// Cheap handle to a node (an arena index, usually)
    type Node: Copy;

    /// Immediate children of `node`
    fn children(&self, node: Self::Node) -> impl Iterator<Item = Self::Node>;
}

/// Traversal order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkOrder {
    /// Node before its children
    #[default]
    Pre,
    /// Children before their parent
    Post,
    /// Level by level
    BreadthFirst,
}

#[inline]
fn within(depth: usize, max_depth: Option<usize>) -> bool {
    max_depth.map_or(true, |max| depth < max)
}

/// Compute the visit sequence as `(node, depth)` pairs.
///
/// With `max_depth = Some(d)` only nodes with `depth < d` are returned; the
/// root has depth 0.
pub fn visit_order<T: TreeView>(
    tree: &T,
    root: T::Node,
    order: WalkOrder,
    max_depth: Option<usize>,
) -> Vec<(T::Node, usize)> {
    let mut out = Vec::new();
    if !within(0, max_depth) {
        return out;
    }

    match order {
        WalkOrder::Pre => {
            let mut stack = vec![(root, 0)];
            while let Some((node, depth)) = stack.pop() {
                out.push((node, depth));
                if within(depth + 1, max_depth) {
                    let children: Vec<_> = tree.children(node).collect();
                    stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
                }
            }
        }
        WalkOrder::Post => {
            // Second visit of a node emits it, after all of its children
            let mut stack = vec![(root, 0, false)];
            while let Some((node, depth, expanded)) = stack.pop() {
                if expanded {
                    out.push((node, depth));
                    continue;
                }
                stack.push((node, depth, true));
                if within(depth + 1, max_depth) {
                    let children: Vec<_> = tree.children(node).collect();
                    stack.extend(children.into_iter().rev().map(|c| (c, depth + 1, false)));
                }
            }
        }
        WalkOrder::BreadthFirst => {
            let mut queue = VecDeque::from([(root, 0)]);
            while let Some((node, depth)) = queue.pop_front() {
                out.push((node, depth));
                if within(depth + 1, max_depth) {
                    queue.extend(tree.children(node).map(|c| (c, depth + 1)));
                }
            }
        }
    }

    out
}

/// Invoke `f(tree, node, depth)` for every node within the depth bound, in
/// the requested order.
pub fn walk_tree<T, F>(tree: &T, root: T::Node, order: WalkOrder, max_depth: Option<usize>, mut f: F)
where
    T: TreeView,
    F: FnMut(&T, T::Node, usize),
{
    for (node, depth) in visit_order(tree, root, order, max_depth) {
        f(tree, node, depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    /// 0 -> {1 -> {3, 4}, 2 -> {5}}
    struct Fixture {
        children: BTreeMap<u32, Vec<u32>>,
    }

    impl Fixture {
        fn new() -> Self {
            let mut children = BTreeMap::new();
            children.insert(0, vec![1, 2]);
            children.insert(1, vec![3, 4]);
            children.insert(2, vec![5]);
            Self { children }
        }
    }

    impl TreeView for Fixture {
        type Node = u32;

        fn children(&self, node: u32) -> impl Iterator<Item = u32> {
            self.children.get(&node).into_iter().flatten().copied()
        }
    }

    fn nodes(order: WalkOrder, max_depth: Option<usize>) -> Vec<u32> {
        visit_order(&Fixture::new(), 0, order, max_depth)
            .into_iter()
            .map(|(n, _)| n)
            .collect()
    }

    #[test]
    fn test_pre_order() {
        assert_eq!(nodes(WalkOrder::Pre, None), vec![0, 1, 3, 4, 2, 5]);
    }

    #[test]
    fn test_post_order() {
        assert_eq!(nodes(WalkOrder::Post, None), vec![3, 4, 1, 5, 2, 0]);
    }

    #[test]
    fn test_breadth_first() {
        assert_eq!(nodes(WalkOrder::BreadthFirst, None), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_depth_cutoff() {
        assert_eq!(nodes(WalkOrder::Pre, Some(2)), vec![0, 1, 2]);
        assert_eq!(nodes(WalkOrder::Post, Some(2)), vec![1, 2, 0]);
        assert_eq!(nodes(WalkOrder::BreadthFirst, Some(1)), vec![0]);
        assert!(nodes(WalkOrder::Pre, Some(0)).is_empty());
    }

    #[test]
    fn test_depths_reported() {
        let visits = visit_order(&Fixture::new(), 0, WalkOrder::Pre, None);
        let depths: Vec<usize> = visits.iter().map(|(_, d)| *d).collect();
        assert_eq!(depths, vec![0, 1, 2, 2, 1, 2]);
    }

    #[test]
    fn test_walk_tree_visits_each_node_once() {
        let fixture = Fixture::new();
        let mut seen = Vec::new();
        walk_tree(&fixture, 0, WalkOrder::Post, None, |_, node, _| seen.push(node));
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    }
}
