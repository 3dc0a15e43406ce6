//! Differential models checking [`AvlTree`] against standard library collections.
//!
//! These are shared by the property tests and the fuzz targets.

extern crate std;

use std::{collections::BTreeMap, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlTree, Insert, Links, TreeNode};

/// Keys are drawn from a small range so that duplicates, hits and misses are all common.
pub const KEY_RANGE: u32 = 128;

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
    /// Distinguishes records with equal keys.
    pub tag: u32,
}

impl TestNode {
    pub fn new(key: u32) -> Box<TestNode> {
        Self::tagged(key, 0)
    }

    pub fn tagged(key: u32, tag: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
            tag,
        })
    }

    fn entry(&self) -> (u32, u32) {
        (self.key, self.tag)
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..KEY_RANGE,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Insert(ItemValue),
    Find(ItemValue),
    Remove(ItemValue),
    Replace(ItemValue),
    First,
    PopFirst,
    Last,
    PopLast,
}

impl Op {
    fn finalize(self, reference: &BTreeMap<u32, u32>) -> FinalOp {
        fn get_value(map: &BTreeMap<u32, u32>, i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if map.is_empty() {
                        idx as u32 % KEY_RANGE
                    } else {
                        map.keys().nth(idx % map.len()).copied().unwrap_or(0)
                    }
                }
                ItemValue::Random(v) => v % KEY_RANGE,
            }
        }

        match self {
            Op::Insert(item) => FinalOp::Insert(get_value(reference, item)),
            Op::Find(item) => FinalOp::Find(get_value(reference, item)),
            Op::Remove(item) => FinalOp::Remove(get_value(reference, item)),
            Op::Replace(item) => FinalOp::Replace(get_value(reference, item)),
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Insert(u32),
    Find(u32),
    Remove(u32),
    Replace(u32),
    First,
    PopFirst,
    Last,
    PopLast,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        value_strategy().prop_map(Op::Insert),
        value_strategy().prop_map(Op::Find),
        value_strategy().prop_map(Op::Remove),
        value_strategy().prop_map(Op::Replace),
        Just(Op::First),
        Just(Op::PopFirst),
        Just(Op::Last),
        Just(Op::PopLast),
    ]
}

/// Runs `ops` against both an [`AvlTree`] and a `BTreeMap` from key to tag, checking after every
/// operation that they hold the same records in the same order and that the tree is valid.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut btree: BTreeMap<u32, u32> = BTreeMap::new();
    let mut avl: AvlTree<TestNode> = AvlTree::new();
    let mut next_tag = 0;

    #[inline]
    #[allow(clippy::boxed_local)]
    fn node_entry(node: Box<TestNode>) -> (u32, u32) {
        node.entry()
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&btree);
        next_tag += 1;

        match final_op {
            FinalOp::Insert(key) => {
                let existing = btree.get(&key).copied();

                match avl.insert(TestNode::tagged(key, next_tag)) {
                    Insert::Linked(curs) => {
                        assert_eq!(existing, None, "FinalOp #{op_id}: {final_op:?}");
                        assert_eq!(curs.get().map(TestNode::entry), Some((key, next_tag)));
                        btree.insert(key, next_tag);
                    }
                    Insert::Duplicate { existing: curs, item } => {
                        assert_eq!(
                            curs.get().map(|n| n.tag),
                            existing,
                            "FinalOp #{op_id}: {final_op:?}"
                        );
                        assert_eq!(item.entry(), (key, next_tag));
                    }
                }
            }

            FinalOp::Find(key) => {
                let from_btree = btree.get(&key).map(|&tag| (key, tag));
                let from_avl = avl.find(&key).get().map(TestNode::entry);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert_eq!(
                    avl.get(&key).map(|n| n.entry()),
                    from_avl,
                    "FinalOp #{op_id}: {final_op:?}"
                );
            }

            FinalOp::Remove(key) => {
                let from_btree = btree.remove(&key).map(|tag| (key, tag));
                let from_avl = avl.remove(&key).map(node_entry);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Replace(key) => {
                let from_btree = btree.get_mut(&key).map(|tag| {
                    let old = *tag;
                    *tag = next_tag;
                    (key, old)
                });

                let mut curs = avl.find_mut(&key);
                let from_avl = match curs.replace_current(TestNode::tagged(key, next_tag)) {
                    Ok(old) => {
                        assert_eq!(curs.get().map(TestNode::entry), Some((key, next_tag)));
                        Some(node_entry(old))
                    }
                    Err(rejected) => {
                        assert_eq!(rejected.entry(), (key, next_tag));
                        None
                    }
                };

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value().map(|(&k, &t)| (k, t));
                let from_avl = avl.first().map(|n| n.entry());

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first().map(node_entry);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value().map(|(&k, &t)| (k, t));
                let from_avl = avl.last().map(|n| n.entry());

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last().map(node_entry);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert_eq!(btree.first_key_value().map(|(&k, _)| k), avl.first().map(|n| n.key));
        assert_eq!(btree.last_key_value().map(|(&k, _)| k), avl.last().map(|n| n.key));
        assert!(btree
            .iter()
            .map(|(&k, &t)| (k, t))
            .eq(avl.iter().map(TestNode::entry)));
        assert!(btree
            .iter()
            .rev()
            .map(|(&k, &t)| (k, t))
            .eq(avl.iter().rev().map(TestNode::entry)));
    }
}

#[derive(Clone, Debug, Arbitrary)]
pub enum CursorOp {
    // Get is not an operation as it's executed on every loop iteration to check equivalence.
    MovePrev,
    MoveNext,
    PeekNext,
    PeekPrev,
    RemoveCurrent,
    RemoveCurrentMovePrev,
    ReplaceCurrent,
}

pub fn cursor_op_strategy() -> impl Strategy<Value = CursorOp> {
    proptest::prop_oneof![
        Just(CursorOp::MovePrev),
        Just(CursorOp::MoveNext),
        Just(CursorOp::PeekNext),
        Just(CursorOp::PeekPrev),
        Just(CursorOp::RemoveCurrent),
        Just(CursorOp::RemoveCurrentMovePrev),
        Just(CursorOp::ReplaceCurrent),
    ]
}

#[derive(Clone, Debug)]
pub struct CursorEquivalenceInput {
    pub values: Vec<u32>,
    pub ops: Vec<CursorOp>,
}

impl<'a> arbitrary::Arbitrary<'a> for CursorEquivalenceInput {
    fn arbitrary(u: &mut arbitrary::Unstructured<'a>) -> arbitrary::Result<Self> {
        fn value(u: &mut arbitrary::Unstructured<'_>) -> u32 {
            u32::arbitrary(u).unwrap_or(0)
        }

        fn op(u: &mut arbitrary::Unstructured<'_>) -> CursorOp {
            CursorOp::arbitrary(u).unwrap_or(CursorOp::MoveNext)
        }

        let num_values = u8::arbitrary(u)? % 100;
        let num_ops = u16::arbitrary(u)? % 1000;

        let values = core::iter::repeat_with(|| value(u))
            .take(num_values.into())
            .collect();

        let ops = core::iter::repeat_with(|| op(u))
            .take(num_ops.into())
            .collect();

        Ok(CursorEquivalenceInput { values, ops })
    }
}

/// Runs cursor operations against both an [`AvlTree`] and a sorted `Vec` with an index cursor.
pub fn run_cursor_equivalence(mut values: Vec<u32>, ops: Vec<CursorOp>) {
    values.sort_unstable();
    values.dedup();

    // Ideally this would be a BTreeMap cursor or even a LinkedList cursor, but neither is stable :(
    let mut vec: Vec<(u32, u32)> = Vec::new();
    let mut avl: AvlTree<TestNode> = AvlTree::new();

    for val in values {
        vec.push((val, 0));
        assert!(avl.insert(TestNode::new(val)).is_linked());
    }

    fn vec_curs_prev<V>(v: &[V], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_sub(1),
            None => v.len().checked_sub(1),
        }
    }

    fn vec_curs_next<V>(v: &[V], curs: Option<usize>) -> Option<usize> {
        match curs {
            Some(i) => i.checked_add(1).filter(|&i| i < v.len()),
            None => (!v.is_empty()).then_some(0),
        }
    }

    let mut next_tag = 0;
    let mut vec_curs = vec_curs_next(&vec, None);
    let mut avl_curs = avl.cursor_first_mut();

    // Check that the initial states are equivalent.
    {
        let v = vec_curs.map(|i| vec[i]);
        let w = avl_curs.get().map(TestNode::entry);

        assert_eq!(v, w);
    }

    for op in ops {
        match op {
            CursorOp::MoveNext => {
                vec_curs = vec_curs_next(&vec, vec_curs);
                avl_curs.move_next();
            }

            CursorOp::MovePrev => {
                vec_curs = vec_curs_prev(&vec, vec_curs);
                avl_curs.move_prev();
            }

            CursorOp::PeekNext => {
                let v = vec_curs_next(&vec, vec_curs).map(|i| vec[i]);
                let w = avl_curs.peek_next().map(TestNode::entry);

                assert_eq!(v, w);
            }

            CursorOp::PeekPrev => {
                let v = vec_curs_prev(&vec, vec_curs).map(|i| vec[i]);
                let w = avl_curs.peek_prev().map(TestNode::entry);

                assert_eq!(v, w);
            }

            CursorOp::RemoveCurrent => {
                let v = vec_curs.map(|i| vec.remove(i));

                if vec_curs == Some(vec.len()) {
                    vec_curs = None;
                }

                let w = avl_curs.remove_current().map(|node| node.entry());

                assert_eq!(v, w);
            }

            CursorOp::RemoveCurrentMovePrev => {
                let new_v_curs = vec_curs.is_some().then(|| vec_curs_prev(&vec, vec_curs));
                let v = vec_curs.map(|i| vec.remove(i));

                if let Some(vc) = new_v_curs {
                    vec_curs = vc;
                }

                let w = avl_curs
                    .remove_current_and_move_prev()
                    .map(|node| node.entry());

                assert_eq!(v, w);
            }

            CursorOp::ReplaceCurrent => {
                next_tag += 1;

                let v = vec_curs.map(|i| core::mem::replace(&mut vec[i].1, next_tag));

                let key = avl_curs.get().map_or(0, |node| node.key);
                let w = avl_curs
                    .replace_current(TestNode::tagged(key, next_tag))
                    .ok()
                    .map(|node| node.tag);

                assert_eq!(v, w);
            }
        }

        let v = vec_curs.map(|i| vec[i]);
        let w = avl_curs.get().map(TestNode::entry);

        assert_eq!(v, w);
    }

    drop(avl_curs);
    avl.assert_invariants();
    assert!(vec.iter().copied().eq(avl.iter().map(TestNode::entry)));
}
