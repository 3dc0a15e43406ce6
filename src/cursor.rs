use core::{cmp::Ordering, marker::PhantomData, pin::Pin, ptr::NonNull};

use crate::{links, AvlTree, Compare, Dir, Link, Links, Natural, TreeNode};

/// A cursor over an [`AvlTree`].
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first. Besides in-order movement, a cursor can walk the tree structure
/// itself through [`move_left`](Cursor::move_left), [`move_right`](Cursor::move_right) and
/// [`move_parent`](Cursor::move_parent).
pub struct Cursor<'tree, T, C = Natural>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T, C>,
    phantom: PhantomData<&'tree AvlTree<T, C>>,
}

impl<'tree, T, C> Cursor<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn new(tree: &'tree AvlTree<T, C>, ptr: Link<T>) -> Cursor<'tree, T, C> {
        Cursor {
            curs: CursorRaw {
                tree: tree.into(),
                ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Moves the cursor to the next element of the `AvlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the first
    /// element. If it is pointing to the last element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the `AvlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method moves it to the last
    /// element. If it is pointing to the first element, this method moves it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Moves the cursor to the left child of the current element.
    ///
    /// If there is no left child, or the cursor is pointing to the "ghost" non-element, the cursor
    /// ends up on the "ghost" non-element.
    pub fn move_left(&mut self) {
        unsafe { self.curs.move_child(Dir::Left) }
    }

    /// Moves the cursor to the right child of the current element.
    ///
    /// If there is no right child, or the cursor is pointing to the "ghost" non-element, the
    /// cursor ends up on the "ghost" non-element.
    pub fn move_right(&mut self) {
        unsafe { self.curs.move_child(Dir::Right) }
    }

    /// Moves the cursor to the parent of the current element.
    ///
    /// If the current element is the root, or the cursor is pointing to the "ghost" non-element,
    /// the cursor ends up on the "ghost" non-element.
    pub fn move_parent(&mut self) {
        unsafe { self.curs.move_parent() }
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&'tree T> {
        self.curs.ptr.map(|p| unsafe { p.as_ref() })
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek(Dir::Right).map(|p| p.as_ref()) }
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&'tree T> {
        unsafe { self.curs.peek(Dir::Left).map(|p| p.as_ref()) }
    }

    /// Returns a reference to the left child of the current item.
    pub fn peek_left(&self) -> Option<&'tree T> {
        unsafe { self.curs.child(Dir::Left).map(|p| p.as_ref()) }
    }

    /// Returns a reference to the right child of the current item.
    pub fn peek_right(&self) -> Option<&'tree T> {
        unsafe { self.curs.child(Dir::Right).map(|p| p.as_ref()) }
    }

    /// Returns the balance factor of the current item: the height of its right subtree minus the
    /// height of its left subtree.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn balance(&self) -> Option<i8> {
        unsafe { self.curs.balance() }
    }

    /// Returns `true` if the left subtree of the current item is taller than its right subtree.
    pub fn is_left_bigger(&self) -> bool {
        self.balance().is_some_and(|b| b < 0)
    }

    /// Returns `true` if the right subtree of the current item is taller than its left subtree.
    pub fn is_right_bigger(&self) -> bool {
        self.balance().is_some_and(|b| b > 0)
    }
}

impl<'tree, T, C> Clone for Cursor<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn clone(&self) -> Self {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }
}

/// A cursor over an [`AvlTree`] which supports editing operations.
///
/// A cursor points either to an element of the tree or to a "ghost" non-element that connects the
/// last element to the first.
pub struct CursorMut<'tree, T, C = Natural>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    curs: CursorRaw<T, C>,
    phantom: PhantomData<&'tree mut AvlTree<T, C>>,
}

impl<'tree, T, C> CursorMut<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn new(tree: &'tree mut AvlTree<T, C>, ptr: Link<T>) -> CursorMut<'tree, T, C> {
        CursorMut {
            curs: CursorRaw {
                tree: tree.into(),
                ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Returns a read-only cursor pointing to the current element.
    ///
    /// The `CursorMut` remains immutably borrowed for the lifetime of the returned `Cursor`.
    pub fn as_cursor(&self) -> Cursor<'_, T, C> {
        Cursor {
            curs: CursorRaw {
                tree: self.curs.tree,
                ptr: self.curs.ptr,
            },
            phantom: PhantomData,
        }
    }

    /// Moves the cursor to the next element of the `AvlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the first
    /// element. If it is pointing to the last element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_next(&mut self) {
        unsafe { self.curs.move_next() }
    }

    /// Moves the cursor to the previous element of the `AvlTree`.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method will move it to the last
    /// element. If it is pointing to the first element, this method will move it to the "ghost"
    /// non-element.
    pub fn move_prev(&mut self) {
        unsafe { self.curs.move_prev() }
    }

    /// Returns a reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    pub fn get(&self) -> Option<&T> {
        self.curs.ptr.map(|p| unsafe { p.as_ref() })
    }

    /// Returns a pinned mutable reference to the item pointed to by the cursor.
    ///
    /// This returns `None` if the cursor is currently pointing to the "ghost" non-element.
    ///
    /// # Safety
    ///
    /// The caller must ensure that modifications to the returned value do not violate the
    /// invariants of the tree. In particular, the result of comparisons between the key of the
    /// returned item and the keys of other items in the tree must not change.
    pub unsafe fn get_mut(&mut self) -> Option<Pin<&mut T>> {
        self.curs
            .ptr
            .map(|mut p| unsafe { Pin::new_unchecked(p.as_mut()) })
    }

    /// Returns a reference to the next item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the first element.
    /// If it is pointing to the last element, this method returns `None`.
    pub fn peek_next(&self) -> Option<&T> {
        unsafe { self.curs.peek(Dir::Right).map(|p| p.as_ref()) }
    }

    /// Returns a reference to the previous item.
    ///
    /// If the cursor is pointing to the "ghost" non-element, this method returns the last element.
    /// If it is pointing to the first element, this method returns `None`.
    pub fn peek_prev(&self) -> Option<&T> {
        unsafe { self.curs.peek(Dir::Left).map(|p| p.as_ref()) }
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the next element. If the cursor is
    /// pointing to the "ghost" non-element, this method returns `None`, and neither the tree nor
    /// the cursor is modified.
    pub fn remove_current(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current(Dir::Right) }
    }

    /// Removes the current element from the tree.
    ///
    /// This returns the removed element and moves the cursor to the previous element. If the
    /// cursor is pointing to the "ghost" non-element, this method returns `None`, and neither the
    /// tree nor the cursor is modified.
    pub fn remove_current_and_move_prev(&mut self) -> Option<T::Handle> {
        unsafe { self.curs.remove_current(Dir::Left) }
    }
}

impl<'tree, T, C> CursorMut<'tree, T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
    C: Compare<T::Key>,
{
    /// Replaces the current element with `item`, returning the handle of the replaced element.
    ///
    /// `item` takes over the position of the current element, and the cursor points at `item`
    /// afterwards. If the cursor is pointing to the "ghost" non-element, or if the key of `item`
    /// does not compare equal to the key of the current element, `item` is returned in `Err` and
    /// neither the tree nor the cursor is modified.
    pub fn replace_current(&mut self, item: T::Handle) -> Result<T::Handle, T::Handle> {
        let Some(old) = self.curs.ptr else {
            return Err(item);
        };

        let new = T::into_ptr(item);

        unsafe {
            if C::compare(old.as_ref().key(), new.as_ref().key()) != Ordering::Equal {
                return Err(T::from_ptr(new));
            }

            let tree = self.curs.tree.as_mut();
            let replaced = tree.replace(old, T::from_ptr(new));
            self.curs.ptr = Some(new);

            Ok(replaced)
        }
    }
}

struct CursorRaw<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: NonNull<AvlTree<T, C>>,
    ptr: Link<T>,
}

impl<T, C> CursorRaw<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe fn peek(&self, dir: Dir) -> Link<T> {
        let tree = unsafe { self.tree.as_ref() };

        match self.ptr {
            Some(p) => unsafe { tree.step(p, dir) },
            None => match dir {
                Dir::Left => tree.max,
                Dir::Right => tree.min,
            },
        }
    }

    unsafe fn move_next(&mut self) {
        self.ptr = unsafe { self.peek(Dir::Right) };
    }

    unsafe fn move_prev(&mut self) {
        self.ptr = unsafe { self.peek(Dir::Left) };
    }

    unsafe fn child(&self, dir: Dir) -> Link<T> {
        self.ptr.and_then(|p| unsafe { links(p).child(dir) })
    }

    unsafe fn move_child(&mut self, dir: Dir) {
        self.ptr = unsafe { self.child(dir) };
    }

    unsafe fn move_parent(&mut self) {
        self.ptr = self.ptr.and_then(|p| unsafe { links(p).parent() });
    }

    unsafe fn balance(&self) -> Option<i8> {
        self.ptr.map(|p| unsafe { links(p).balance() })
    }

    unsafe fn remove_current(&mut self, then: Dir) -> Option<T::Handle> {
        let remove = self.ptr?;

        // Step before erasing; erasing only relinks the removed element's neighbours.
        self.ptr = unsafe { self.peek(then) };

        let tree = unsafe { self.tree.as_mut() };
        Some(unsafe { tree.erase(remove) })
    }
}
