//! An intrusive AVL tree.
//!
//! Records embed a [`Links`] value and are handed to the tree through the
//! [`cordyceps::Linked`] contract. The tree never allocates: inserting a
//! record converts its handle into a pointer, and erasing it hands the handle
//! back. Whether a handle owns its record (`Box<T>`) or merely points into
//! caller-owned storage (`NonNull<T>`, `Pin<&'static T>`) is up to the
//! implementor of [`Linked`].
//!
//! The tree keeps the classic AVL invariant: the heights of the two subtrees
//! of any node differ by at most one. Each node stores a signed balance
//! factor, `height(right) - height(left)`, which is always one of -1, 0 or 1
//! between operations.
//!
//! Besides the root, the tree tracks its minimum and maximum nodes, so
//! [`AvlTree::first`] and [`AvlTree::last`] are O(1), and remembers which
//! side of its parent each node hangs from, so stepping to a neighbour never
//! has to compare keys.
#![no_std]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;
#[cfg(any(test, feature = "model"))]
extern crate std;

use core::{
    cell::UnsafeCell, cmp::Ordering, fmt, marker::PhantomData, marker::PhantomPinned, mem,
    ops::Not, pin::Pin, ptr::NonNull,
};

use cordyceps::Linked;

mod check;
pub mod compare;
mod cursor;
#[cfg(any(test, feature = "alloc"))]
mod debug;
mod iter;
#[cfg(any(test, feature = "model"))]
pub mod model;
#[cfg(test)]
mod tests;

pub use check::Violations;
pub use compare::{Compare, Natural, Reverse};
pub use cursor::{Cursor, CursorMut};
pub use iter::Iter;

/// A record that can be linked into an [`AvlTree`].
pub trait TreeNode<L>: Linked<L> {
    type Key: ?Sized;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL tree.
///
/// `C` is the ordering policy used to compare the keys of stored records with
/// each other and with lookup keys. It defaults to [`Natural`].
pub struct AvlTree<T, C = Natural>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    min: Link<T>,
    max: Link<T>,
    len: usize,
    _cmp: PhantomData<fn() -> C>,
}

/// The intrusive links embedded in every record of an [`AvlTree`].
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

impl Dir {
    /// The change in balance caused by growing the subtree on this side.
    #[inline]
    fn sign(self) -> i8 {
        match self {
            Dir::Left => -1,
            Dir::Right => 1,
        }
    }
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: i8,
    side: Dir,
    _unpin: PhantomPinned,
}

type Link<T> = Option<NonNull<T>>;

/// The outcome of [`AvlTree::insert`].
pub enum Insert<'tree, T, C = Natural>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// The item was linked into the tree. The cursor points at it.
    Linked(Cursor<'tree, T, C>),

    /// An item with an equal key is already a member. The tree is unchanged and the rejected
    /// item is handed back.
    Duplicate {
        existing: Cursor<'tree, T, C>,
        item: T::Handle,
    },
}

impl<'tree, T, C> Insert<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns `true` if the item was linked into the tree.
    pub fn is_linked(&self) -> bool {
        matches!(self, Insert::Linked(_))
    }

    /// Returns a cursor pointing at the member with the inserted key.
    ///
    /// This is the newly linked item, or the existing one if the key was already present.
    pub fn position(&self) -> &Cursor<'tree, T, C> {
        match self {
            Insert::Linked(curs) => curs,
            Insert::Duplicate { existing, .. } => existing,
        }
    }

    /// Splits the outcome into the member's position and the rejected item, if any.
    pub fn into_parts(self) -> (Cursor<'tree, T, C>, Option<T::Handle>) {
        match self {
            Insert::Linked(curs) => (curs, None),
            Insert::Duplicate { existing, item } => (existing, Some(item)),
        }
    }
}

impl<'tree, T, C> fmt::Debug for Insert<'tree, T, C>
where
    T: TreeNode<Links<T>> + fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Insert::Linked(curs) => f.debug_tuple("Linked").field(&curs.get()).finish(),
            Insert::Duplicate { existing, .. } => f
                .debug_struct("Duplicate")
                .field("existing", &existing.get())
                .finish_non_exhaustive(),
        }
    }
}

#[inline]
unsafe fn links<'a, T>(node: NonNull<T>) -> &'a Links<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe { T::links(node).as_ref() }
}

// Returns the last node reached by following `dir` links from `node`.
#[inline]
unsafe fn subtree_extreme<T>(node: NonNull<T>, dir: Dir) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    let mut cur = node;

    while let Some(next) = unsafe { links(cur).child(dir) } {
        cur = next;
    }

    cur
}

impl<T, C> AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T, C> {
        AvlTree {
            root: None,
            min: None,
            max: None,
            len: 0,
            _cmp: PhantomData,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the minimum element of the tree.
    ///
    /// This operation completes in _O(1)_ time.
    pub fn first(&self) -> Option<Pin<&T>> {
        self.min.map(|first| unsafe { Pin::new_unchecked(first.as_ref()) })
    }

    /// Returns the maximum element of the tree.
    ///
    /// This operation completes in _O(1)_ time.
    pub fn last(&self) -> Option<Pin<&T>> {
        self.max.map(|last| unsafe { Pin::new_unchecked(last.as_ref()) })
    }

    /// Returns the root element of the tree.
    pub fn root(&self) -> Option<Pin<&T>> {
        self.root.map(|root| unsafe { Pin::new_unchecked(root.as_ref()) })
    }

    /// Returns an iterator over the elements of the tree in ascending order.
    pub fn iter(&self) -> Iter<'_, T, C> {
        Iter::new(self)
    }

    /// Returns a cursor pointing at the minimum element.
    ///
    /// If the tree is empty, the cursor points at the "ghost" non-element.
    pub fn cursor_first(&self) -> Cursor<'_, T, C> {
        Cursor::new(self, self.min)
    }

    /// Returns a cursor pointing at the maximum element.
    ///
    /// If the tree is empty, the cursor points at the "ghost" non-element.
    pub fn cursor_last(&self) -> Cursor<'_, T, C> {
        Cursor::new(self, self.max)
    }

    /// Returns a cursor pointing at the root element.
    ///
    /// If the tree is empty, the cursor points at the "ghost" non-element.
    pub fn cursor_root(&self) -> Cursor<'_, T, C> {
        Cursor::new(self, self.root)
    }

    /// Returns an editing cursor pointing at the minimum element.
    pub fn cursor_first_mut(&mut self) -> CursorMut<'_, T, C> {
        let first = self.min;
        CursorMut::new(self, first)
    }

    /// Returns an editing cursor pointing at the maximum element.
    pub fn cursor_last_mut(&mut self) -> CursorMut<'_, T, C> {
        let last = self.max;
        CursorMut::new(self, last)
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = self.min?;
        Some(unsafe { self.erase(first) })
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = self.max?;
        Some(unsafe { self.erase(last) })
    }

    #[inline]
    fn extreme(&self, dir: Dir) -> Link<T> {
        match dir {
            Dir::Left => self.min,
            Dir::Right => self.max,
        }
    }

    // Returns the neighbour of `node` in direction `dir`: its successor for `Dir::Right`, its
    // predecessor for `Dir::Left`. Returns `None` if `node` is the last element in that direction.
    //
    // # Safety
    //
    // `node` must be an element of `self`.
    pub(crate) unsafe fn step(&self, node: NonNull<T>, dir: Dir) -> Link<T> {
        if self.extreme(dir) == Some(node) {
            return None;
        }

        unsafe {
            if let Some(child) = links(node).child(dir) {
                return Some(subtree_extreme(child, !dir));
            }

            // Climb while approaching from the `dir` side. The first ancestor approached from the
            // other side is the neighbour.
            let mut cur = node;
            loop {
                let cur_links = links(cur);
                let parent = cur_links.parent()?;

                if cur_links.side() != dir {
                    return Some(parent);
                }

                cur = parent;
            }
        }
    }

    // Stores `child` in the slot that `side` designates in `parent`, or in the root if `parent` is
    // `None`.
    //
    // `child`'s parent pointer is not updated.
    #[inline]
    unsafe fn replace_in_parent(&mut self, parent: Link<T>, side: Dir, child: Link<T>) {
        match parent {
            Some(parent) => unsafe {
                links(parent).set_child(side, child);
            },
            None => self.root = child,
        }
    }

    // Makes `child` the `dir` child of `parent`, updating `child`'s parent and side if present.
    #[inline]
    unsafe fn link_child(&mut self, parent: NonNull<T>, dir: Dir, child: Link<T>) {
        unsafe {
            links(parent).set_child(dir, child);

            if let Some(child) = child {
                let child_links = links(child);
                child_links.set_parent(Some(parent));
                child_links.set_side(dir);
            }
        }
    }

    // Rotates the subtree rooted at `parent` in direction `dir`.
    //
    // For `dir == Dir::Right`:
    //
    //         P             N
    //        / \           / \
    //       N   B   -->   A   P
    //      / \               / \
    //     A   C             C   B
    //
    // The balances of `P` and `N` are updated. The update is correct even if `P` is temporarily
    // unbalanced by two.
    unsafe fn rotate(&mut self, parent: NonNull<T>, dir: Dir) {
        unsafe {
            let parent_links = links(parent);
            let node = parent_links
                .child(!dir)
                .expect("rotated node must have a child opposite the rotation");
            let node_links = links(node);

            log::trace!(
                "avl: rotate {dir:?} (balances {}, {})",
                parent_links.balance(),
                node_links.balance()
            );

            let grandparent = parent_links.parent();
            let side = parent_links.side();
            self.replace_in_parent(grandparent, side, Some(node));
            node_links.set_parent(grandparent);
            node_links.set_side(side);

            let across = node_links.child(dir);
            self.link_child(parent, !dir, across);
            self.link_child(node, dir, Some(parent));

            let m = dir.sign();
            let parent_balance = parent_links.balance() + m - m * (m * node_links.balance()).min(0);
            parent_links.set_balance(parent_balance);
            node_links.set_balance(node_links.balance() + m + m * (m * parent_balance).max(0));
        }
    }

    // Performs a bottom-up rebalance of the tree after the insertion of the leaf `node`.
    //
    // At most one single or double rotation is performed.
    unsafe fn rebalance_inserted(&mut self, node: NonNull<T>) {
        let mut node = node;

        unsafe {
            while let Some(parent) = links(node).parent() {
                let dir = links(node).side();
                let sign = dir.sign();

                let parent_links = links(parent);
                let balance = parent_links.balance() + sign;
                parent_links.set_balance(balance);

                if balance == 0 {
                    // The parent was lopsided and now is not. Its height didn't change.
                    return;
                }

                if balance == sign {
                    // The parent was balanced and now leans toward `node`. Its height grew.
                    node = parent;
                    continue;
                }

                debug_assert_eq!(balance, 2 * sign);

                if sign * links(node).balance() < 0 {
                    // `node` leans away from `parent`: double rotation.
                    self.rotate(node, dir);
                }
                self.rotate(parent, !dir);

                // The rotated subtree has its height from before the insertion.
                return;
            }
        }
    }

    // Performs a bottom-up rebalance of the tree after the subtree on the `dir` side of `parent`
    // shrank by one level.
    unsafe fn rebalance_erased(&mut self, parent: Link<T>, dir: Dir) {
        let mut opt_parent = parent;
        let mut dir = dir;

        unsafe {
            while let Some(parent) = opt_parent {
                let sign = dir.sign();

                let parent_links = links(parent);
                let balance = parent_links.balance() - sign;
                parent_links.set_balance(balance);

                if balance == 0 {
                    // The parent leaned toward the shrunk side and now is balanced. Its height
                    // decreased.
                    dir = parent_links.side();
                    opt_parent = parent_links.parent();
                    continue;
                }

                if balance == -sign {
                    // The parent was balanced and now leans away. Its height didn't change.
                    return;
                }

                debug_assert_eq!(balance, -2 * sign);

                let next_parent = parent_links.parent();
                let next_dir = parent_links.side();

                let sibling = parent_links
                    .child(!dir)
                    .expect("a parent unbalanced by two must have a sibling subtree");
                let sibling_balance = links(sibling).balance();

                if sign * sibling_balance > 0 {
                    // The sibling leans toward the shrunk side: double rotation.
                    self.rotate(sibling, !dir);
                }
                self.rotate(parent, dir);

                if sibling_balance == 0 {
                    // A single rotation over a balanced sibling preserves the subtree height.
                    return;
                }

                opt_parent = next_parent;
                dir = next_dir;
            }
        }
    }

    /// Removes an arbitrary element from the tree, returning its handle.
    ///
    /// This operation completes in _O(log(n))_ time.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn erase(&mut self, node: NonNull<T>) -> T::Handle {
        log::trace!("avl: erase (len {})", self.len);

        unsafe {
            let node_links = links(node);

            debug_assert!(self.len > 0, "erase from an empty tree");
            self.len -= 1;

            // The minimum has no left child, so its successor is its right child (a leaf, if
            // present) or else its parent. Symmetrically for the maximum.
            if self.len == 0 {
                self.min = None;
                self.max = None;
            } else {
                if self.min == Some(node) {
                    self.min = node_links.right().or(node_links.parent());
                }

                if self.max == Some(node) {
                    self.max = node_links.left().or(node_links.parent());
                }
            }

            if node_links.is_leaf() {
                let parent = node_links.parent();
                let side = node_links.side();

                self.replace_in_parent(parent, side, None);
                self.rebalance_erased(parent, side);
            } else {
                // Take the closest node from the taller subtree (the right one on a tie). It has
                // at most one child, on the same side, which is a leaf.
                let dir = if node_links.balance() >= 0 {
                    Dir::Right
                } else {
                    Dir::Left
                };

                let first_step = node_links
                    .child(dir)
                    .expect("the taller side of an inner node is not empty");
                let replacement = subtree_extreme(first_step, !dir);
                let replacement_links = links(replacement);

                // Unlink the replacement, elevating its child.
                let tail = replacement_links.child(dir);
                let old_parent = replacement_links.parent();
                let old_side = replacement_links.side();
                match old_parent {
                    Some(old_parent) => self.link_child(old_parent, old_side, tail),
                    None => unreachable!("replacement is a strict descendant of the erased node"),
                }
                self.rebalance_erased(old_parent, old_side);

                // Rebalancing may have moved `node`, so its links are read only now.
                let parent = node_links.parent();
                let side = node_links.side();
                self.replace_in_parent(parent, side, Some(replacement));
                replacement_links.set_parent(parent);
                replacement_links.set_side(side);
                replacement_links.set_balance(node_links.balance());

                self.link_child(replacement, Dir::Left, node_links.left());
                self.link_child(replacement, Dir::Right, node_links.right());
            }

            node_links.unlink();

            T::from_ptr(node)
        }
    }

    /// Clears the tree, removing all elements.
    ///
    /// The handle of every element is dropped. For handles that do not own their element, such
    /// as `NonNull<T>`, the elements themselves are left untouched.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node.
                let cur = subtree_extreme(cur, Dir::Left);
                let cur_links = links(cur);

                let parent = cur_links.parent();
                let side = cur_links.side();
                let right = cur_links.right();

                // Elevate the node's right child (which may be None).
                self.replace_in_parent(parent, side, right);
                if let Some(right) = right {
                    links(right).set_parent(parent);
                    links(right).set_side(side);
                }

                // Drop the node.
                cur_links.unlink();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        self.min = None;
        self.max = None;

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }
}

impl<T, C> AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
    C: Compare<T::Key>,
{
    /// Inserts an item into the tree.
    ///
    /// If an item with an equal key is already a member, the tree is left unchanged and `item`
    /// is handed back in [`Insert::Duplicate`].
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Insert<'_, T, C> {
        let ptr = T::into_ptr(item);

        let mut opt_parent = None;
        let mut dir = Dir::Left;
        let mut is_min = true;
        let mut is_max = true;

        // Descend the tree, looking for an empty slot.
        let mut opt_cur = self.root;
        while let Some(cur) = opt_cur {
            let ordering = unsafe { C::compare(cur.as_ref().key(), ptr.as_ref().key()) };

            dir = match ordering {
                Ordering::Greater => Dir::Left,
                Ordering::Less => Dir::Right,
                Ordering::Equal => {
                    let item = unsafe { T::from_ptr(ptr) };
                    return Insert::Duplicate {
                        existing: Cursor::new(self, Some(cur)),
                        item,
                    };
                }
            };

            match dir {
                Dir::Left => is_max = false,
                Dir::Right => is_min = false,
            }

            opt_parent = Some(cur);
            opt_cur = unsafe { links(cur).child(dir) };
        }

        unsafe {
            let node_links = links(ptr);
            node_links.set_child(Dir::Left, None);
            node_links.set_child(Dir::Right, None);
            node_links.set_balance(0);

            match opt_parent {
                Some(parent) => self.link_child(parent, dir, Some(ptr)),
                None => {
                    node_links.set_parent(None);
                    self.root = Some(ptr);
                }
            }

            if is_min {
                self.min = Some(ptr);
            }
            if is_max {
                self.max = Some(ptr);
            }
            self.len += 1;

            self.rebalance_inserted(ptr);
        }

        Insert::Linked(Cursor::new(self, Some(ptr)))
    }

    /// Replaces the element `old` with `item`, returning the handle of `old`.
    ///
    /// `item` takes over the position of `old`; the structure of the tree does not change.
    ///
    /// This operation completes in _O(1)_ time.
    ///
    /// # Safety
    ///
    /// The caller must ensure that `old` is an element of `self`, that `item` is not an element of
    /// any tree, and that the key of `item` compares equal to the key of `old`.
    pub unsafe fn replace(&mut self, old: NonNull<T>, item: T::Handle) -> T::Handle {
        log::trace!("avl: replace (len {})", self.len);

        let new = T::into_ptr(item);

        unsafe {
            debug_assert_eq!(
                C::compare(old.as_ref().key(), new.as_ref().key()),
                Ordering::Equal,
                "a replacement must have a key equal to the replaced element"
            );

            let old_links = links(old);
            let new_links = links(new);

            let parent = old_links.parent();
            let side = old_links.side();
            self.replace_in_parent(parent, side, Some(new));
            new_links.set_parent(parent);
            new_links.set_side(side);
            new_links.set_balance(old_links.balance());

            self.link_child(new, Dir::Left, old_links.left());
            self.link_child(new, Dir::Right, old_links.right());

            if self.min == Some(old) {
                self.min = Some(new);
            }
            if self.max == Some(old) {
                self.max = Some(new);
            }

            old_links.unlink();

            T::from_ptr(old)
        }
    }

    /// Returns a reference to the element corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        C: Compare<T::Key, Q>,
        Q: ?Sized,
    {
        let ptr = self.find_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns `true` if the tree contains an element corresponding to `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        C: Compare<T::Key, Q>,
        Q: ?Sized,
    {
        self.find_raw(key).is_some()
    }

    /// Returns a cursor pointing at the element corresponding to `key`.
    ///
    /// If there is no such element, the cursor points at the "ghost" non-element.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, T, C>
    where
        C: Compare<T::Key, Q>,
        Q: ?Sized,
    {
        Cursor::new(self, self.find_raw(key))
    }

    /// Returns an editing cursor pointing at the element corresponding to `key`.
    ///
    /// If there is no such element, the cursor points at the "ghost" non-element.
    pub fn find_mut<Q>(&mut self, key: &Q) -> CursorMut<'_, T, C>
    where
        C: Compare<T::Key, Q>,
        Q: ?Sized,
    {
        let ptr = self.find_raw(key);
        CursorMut::new(self, ptr)
    }

    /// Removes the element corresponding to `key` from the tree, returning its handle.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        C: Compare<T::Key, Q>,
        Q: ?Sized,
    {
        let ptr = self.find_raw(key)?;
        Some(unsafe { self.erase(ptr) })
    }

    pub(crate) fn find_raw<Q>(&self, key: &Q) -> Link<T>
    where
        C: Compare<T::Key, Q>,
        Q: ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match C::compare(cur.as_ref().key(), key) {
                    Ordering::Less => opt_cur = links(cur).right(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = links(cur).left(),
                }
            }
        }
    }
}

impl<T, C> Default for AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Drop for AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T, C> fmt::Debug for AvlTree<T, C>
where
    T: TreeNode<Links<T>> + fmt::Debug + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<'tree, T, C> IntoIterator for &'tree AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// SAFETY: the tree only hands out shared references to its elements through `&self`, and moving
// it moves nothing but pointers to the elements.
unsafe impl<T, C> Send for AvlTree<T, C> where T: TreeNode<Links<T>> + Send + ?Sized {}
unsafe impl<T, C> Sync for AvlTree<T, C> where T: TreeNode<Links<T>> + Sync + ?Sized {}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: 0,
                side: Dir::Left,
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    fn balance(&self) -> i8 {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    fn side(&self) -> Dir {
        unsafe { (*self.inner.get()).side }
    }

    #[inline]
    fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    fn set_parent(&self, parent: Link<T>) -> Link<T> {
        unsafe { mem::replace(&mut (*self.inner.get()).parent, parent) }
    }

    #[inline]
    fn set_child(&self, dir: Dir, child: Link<T>) -> Link<T> {
        unsafe { mem::replace(&mut (*self.inner.get()).children[dir as usize], child) }
    }

    #[inline]
    fn set_balance(&self, balance: i8) {
        unsafe { (*self.inner.get()).balance = balance };
    }

    #[inline]
    fn set_side(&self, side: Dir) {
        unsafe { (*self.inner.get()).side = side };
    }

    // Resets the links to their unlinked state.
    #[inline]
    fn unlink(&self) {
        self.set_parent(None);
        self.set_child(Dir::Left, None);
        self.set_child(Dir::Right, None);
        self.set_balance(0);
        self.set_side(Dir::Left);
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .field("side", &self.side())
            .finish()
    }
}

// SAFETY: links are only read or written by the tree that owns the element, which requires
// `&mut` access to the tree for every write.
unsafe impl<T: Send + ?Sized> Send for Links<T> {}
unsafe impl<T: Sync + ?Sized> Sync for Links<T> {}
