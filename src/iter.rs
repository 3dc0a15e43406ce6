use core::iter::FusedIterator;

use crate::{AvlTree, Dir, Link, Links, Natural, TreeNode};

/// An iterator over the elements of an [`AvlTree`] in ascending order.
///
/// Created by [`AvlTree::iter`].
pub struct Iter<'tree, T, C = Natural>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: &'tree AvlTree<T, C>,

    front: Link<T>,
    back: Link<T>,

    len: usize,
}

impl<'tree, T, C> Iter<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn new(tree: &'tree AvlTree<T, C>) -> Self {
        Iter {
            tree,

            front: tree.min,
            back: tree.max,

            len: tree.len(),
        }
    }
}

impl<'tree, T, C> Iterator for Iter<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        // The front and back positions meet once `len` elements have been yielded.
        if self.len == 0 {
            return None;
        }

        let cur = self.front?;
        self.len -= 1;
        self.front = unsafe { self.tree.step(cur, Dir::Right) };

        Some(unsafe { cur.as_ref() })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<'tree, T, C> DoubleEndedIterator for Iter<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.len == 0 {
            return None;
        }

        let cur = self.back?;
        self.len -= 1;
        self.back = unsafe { self.tree.step(cur, Dir::Left) };

        Some(unsafe { cur.as_ref() })
    }
}

impl<'tree, T, C> ExactSizeIterator for Iter<'tree, T, C> where T: TreeNode<Links<T>> + ?Sized {}

impl<'tree, T, C> FusedIterator for Iter<'tree, T, C> where T: TreeNode<Links<T>> + ?Sized {}

impl<'tree, T, C> Clone for Iter<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn clone(&self) -> Self {
        Iter {
            tree: self.tree,
            front: self.front,
            back: self.back,
            len: self.len,
        }
    }
}
