//! Ordering policies for [`AvlTree`](crate::AvlTree).
//!
//! A policy is a type rather than a value: it is chosen once, as a type parameter of the tree,
//! and costs nothing to store.

use core::{borrow::Borrow, cmp::Ordering, fmt, marker::PhantomData};

/// A three-way comparison between the key of a stored element and a lookup key.
///
/// The same policy orders elements against each other (`Q = K`) and against lookup keys of other
/// types, which allows heterogeneous lookups. It must be a total order that stays consistent for
/// as long as an element is a member of a tree.
pub trait Compare<K: ?Sized, Q: ?Sized = K> {
    /// Returns the ordering of `item` relative to `key`.
    fn compare(item: &K, key: &Q) -> Ordering;
}

/// Orders keys with their `<` operator, looking through [`Borrow`].
///
/// `item` is less than `key` if `item < key`, greater if `key < item`, and equal otherwise.
pub struct Natural;

impl<K, Q> Compare<K, Q> for Natural
where
    K: Borrow<Q> + ?Sized,
    Q: PartialOrd + ?Sized,
{
    #[inline]
    fn compare(item: &K, key: &Q) -> Ordering {
        let item = item.borrow();

        if item < key {
            Ordering::Less
        } else if key < item {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

impl fmt::Debug for Natural {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Natural")
    }
}

/// Inverts another ordering policy.
pub struct Reverse<C>(PhantomData<fn() -> C>);

impl<K, Q, C> Compare<K, Q> for Reverse<C>
where
    K: ?Sized,
    Q: ?Sized,
    C: Compare<K, Q>,
{
    #[inline]
    fn compare(item: &K, key: &Q) -> Ordering {
        C::compare(item, key).reverse()
    }
}

impl<C> fmt::Debug for Reverse<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reverse")
    }
}
