use core::cmp::Ordering;

use bitflags::bitflags;

use crate::{links, subtree_extreme, AvlTree, Compare, Dir, Link, Links, TreeNode};

bitflags! {
    /// Classes of invariant violations reported by [`AvlTree::self_check`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Violations: u32 {
        /// The recorded length differs from the number of reachable elements.
        const LEN = 1 << 0;
        /// The recorded minimum is not the leftmost element.
        const MIN = 1 << 1;
        /// The recorded maximum is not the rightmost element.
        const MAX = 1 << 2;
        /// The root has a parent.
        const ROOT_PARENT = 1 << 3;
        /// A left child does not point back at its parent.
        const LEFT_PARENT = 1 << 4;
        /// A right child does not point back at its parent.
        const RIGHT_PARENT = 1 << 5;
        /// A left child believes it is a right child.
        const LEFT_SIDE = 1 << 6;
        /// A right child believes it is a left child.
        const RIGHT_SIDE = 1 << 7;
        /// A left child compares equal to its parent.
        const LEFT_EQUAL = 1 << 8;
        /// A left child compares greater than its parent.
        const LEFT_GREATER = 1 << 9;
        /// A right child compares equal to its parent.
        const RIGHT_EQUAL = 1 << 10;
        /// A right child compares less than its parent.
        const RIGHT_LESS = 1 << 11;
        /// A balance factor differs from the actual height difference of the subtrees.
        const BALANCE = 1 << 12;
        /// A left subtree is more than one level taller than its sibling.
        const LEFT_TOO_TALL = 1 << 13;
        /// A right subtree is more than one level taller than its sibling.
        const RIGHT_TOO_TALL = 1 << 14;
        /// The in-order sequence of elements is not strictly increasing.
        const IN_ORDER = 1 << 15;
    }
}

impl<T, C> AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
    C: Compare<T::Key>,
{
    /// Checks every structural invariant of the tree, returning the set of violated ones.
    ///
    /// Heights, sizes, ordering and balance factors are recomputed from scratch, so this takes
    /// _O(n)_ time. An empty set means the tree is a valid AVL tree whose length, minimum and
    /// maximum are accurate.
    pub fn self_check(&self) -> Violations {
        let mut prev = None;
        let (_height, len, mut violations) = unsafe { self.check_subtree(self.root, &mut prev) };

        if len != self.len {
            violations |= Violations::LEN;
        }

        let leftmost = self.root.map(|root| unsafe { subtree_extreme(root, Dir::Left) });
        if leftmost != self.min {
            violations |= Violations::MIN;
        }

        let rightmost = self.root.map(|root| unsafe { subtree_extreme(root, Dir::Right) });
        if rightmost != self.max {
            violations |= Violations::MAX;
        }

        if let Some(root) = self.root {
            if unsafe { links(root).parent() }.is_some() {
                violations |= Violations::ROOT_PARENT;
            }
        }

        if !violations.is_empty() {
            log::debug!("avl: self-check failed with {violations:?} (len {})", self.len);
        }

        violations
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let violations = self.self_check();
        assert!(violations.is_empty(), "tree invariants violated: {violations:?}");
    }

    // Returns the height and size of the subtree rooted at `opt_node`, along with the violations
    // found inside it. `prev` tracks the last element visited in order.
    unsafe fn check_subtree(
        &self,
        opt_node: Link<T>,
        prev: &mut Link<T>,
    ) -> (i32, usize, Violations) {
        let Some(node) = opt_node else {
            return (0, 0, Violations::empty());
        };

        let mut violations = Violations::empty();

        unsafe {
            let node_links = links(node);
            let key = node.as_ref().key();

            for (dir, wrong_parent, wrong_side) in [
                (Dir::Left, Violations::LEFT_PARENT, Violations::LEFT_SIDE),
                (Dir::Right, Violations::RIGHT_PARENT, Violations::RIGHT_SIDE),
            ] {
                if let Some(child) = node_links.child(dir) {
                    if links(child).parent() != Some(node) {
                        violations |= wrong_parent;
                    }

                    if links(child).side() != dir {
                        violations |= wrong_side;
                    }
                }
            }

            if let Some(left) = node_links.left() {
                match C::compare(left.as_ref().key(), key) {
                    Ordering::Less => {}
                    Ordering::Equal => violations |= Violations::LEFT_EQUAL,
                    Ordering::Greater => violations |= Violations::LEFT_GREATER,
                }
            }

            if let Some(right) = node_links.right() {
                match C::compare(key, right.as_ref().key()) {
                    Ordering::Less => {}
                    Ordering::Equal => violations |= Violations::RIGHT_EQUAL,
                    Ordering::Greater => violations |= Violations::RIGHT_LESS,
                }
            }

            let (left_height, left_len, left_violations) =
                self.check_subtree(node_links.left(), prev);

            if let Some(prev) = *prev {
                if C::compare(prev.as_ref().key(), key) != Ordering::Less {
                    violations |= Violations::IN_ORDER;
                }
            }
            *prev = Some(node);

            let (right_height, right_len, right_violations) =
                self.check_subtree(node_links.right(), prev);

            violations |= left_violations | right_violations;

            let balance = i32::from(node_links.balance());
            if balance != right_height - left_height {
                violations |= Violations::BALANCE;
            }

            if balance < -1 {
                violations |= Violations::LEFT_TOO_TALL;
            } else if balance > 1 {
                violations |= Violations::RIGHT_TOO_TALL;
            }

            (
                1 + left_height.max(right_height),
                1 + left_len + right_len,
                violations,
            )
        }
    }
}
