extern crate std;

use std::{ops::Range, prelude::v1::*, string::String, vec};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn keys_of(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.iter().map(|node| node.key).collect()
}

fn permutations(n: u32) -> Vec<Vec<u32>> {
    if n == 0 {
        return vec![Vec::new()];
    }

    let mut out = Vec::new();
    for shorter in permutations(n - 1) {
        for pos in 0..=shorter.len() {
            let mut keys = shorter.clone();
            keys.insert(pos, n - 1);
            out.push(keys);
        }
    }
    out
}

// Walks the tree through the structural cursor API, checking that every subtree holds exactly the
// keys that belong between its bounds and that balance factors match the subtree heights.
//
// Returns the height of the subtree.
fn check_structure(curs: Cursor<'_, TestNode>, sorted: &[u32]) -> i32 {
    let Some(node) = curs.get() else {
        assert!(sorted.is_empty(), "subtree is missing keys {sorted:?}");
        return 0;
    };

    let mid = sorted
        .binary_search(&node.key)
        .expect("tree holds a key in the wrong subtree");

    let mut left = curs.clone();
    left.move_left();
    assert_eq!(left.get().map(|n| n.key), curs.peek_left().map(|n| n.key));
    if left.get().is_some() {
        let mut back = left.clone();
        back.move_parent();
        assert!(core::ptr::eq(back.get().unwrap(), node));
    }

    let mut right = curs.clone();
    right.move_right();
    assert_eq!(right.get().map(|n| n.key), curs.peek_right().map(|n| n.key));

    let left_height = check_structure(left, &sorted[..mid]);
    let right_height = check_structure(right, &sorted[mid + 1..]);

    assert_eq!(curs.balance(), Some((right_height - left_height) as i8));
    assert_eq!(curs.is_left_bigger(), left_height > right_height);
    assert_eq!(curs.is_right_bigger(), right_height > left_height);

    1 + left_height.max(right_height)
}

// Checks every observable property of `tree` against `expected`, which holds its keys in any
// order.
fn check_contents(tree: &AvlTree<TestNode>, expected: &[u32]) {
    let mut sorted = expected.to_vec();
    sorted.sort_unstable();

    assert_eq!(tree.self_check(), Violations::empty());
    assert_eq!(tree.len(), sorted.len());
    assert_eq!(tree.is_empty(), sorted.is_empty());
    assert_eq!(tree.first().map(|n| n.key), sorted.first().copied());
    assert_eq!(tree.last().map(|n| n.key), sorted.last().copied());

    assert_eq!(keys_of(tree), sorted);
    assert!(tree.iter().rev().map(|n| n.key).eq(sorted.iter().rev().copied()));
    assert_eq!(tree.iter().len(), sorted.len());

    // Forward with a cursor, ending on the ghost.
    let mut curs = tree.cursor_first();
    for &key in &sorted {
        assert_eq!(curs.get().map(|n| n.key), Some(key));
        curs.move_next();
    }
    assert!(curs.get().is_none());

    // Backward with a cursor, restarting from the maximum.
    let mut curs = tree.cursor_last();
    for &key in sorted.iter().rev() {
        assert_eq!(curs.get().map(|n| n.key), Some(key));
        curs.move_prev();
    }
    assert!(curs.get().is_none());

    check_structure(tree.cursor_root(), &sorted);
}

fn insert_find_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_linked());
        tree.assert_invariants();
    }

    for key in keys {
        let node = tree.find_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }

    check_contents(&tree, keys);
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn two_elems_find() {
    insert_find_all(&[0, 1]);
    insert_find_all(&[1, 0]);
}

#[test]
fn three_elems_find() {
    insert_find_all(&[0, 1, 2]);
    insert_find_all(&[0, 2, 1]);
    insert_find_all(&[1, 0, 2]);
    insert_find_all(&[1, 2, 0]);
    insert_find_all(&[2, 0, 1]);
    insert_find_all(&[2, 1, 0]);
}

#[test]
fn all_orders_find() {
    for n in 4..=6 {
        for keys in permutations(n) {
            insert_find_all(&keys);
        }
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for (i, key) in keys.iter().enumerate() {
        let node = tree.find_raw(key).expect("item not found");
        let removed = unsafe { tree.erase(node) };
        assert_eq!(removed.key, *key);
        check_contents(&tree, &keys[i + 1..]);
    }

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for (i, key) in keys.iter().enumerate().rev() {
        let removed = tree.remove(key).expect("item not found");
        assert_eq!(removed.key, *key);
        check_contents(&tree, &keys[..i]);
    }
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_two() {
    insert_remove_all(&[0, 1]);
    insert_remove_all(&[1, 0]);
}

#[test]
fn remove_three() {
    insert_remove_all(&[0, 1, 2]);
    insert_remove_all(&[0, 2, 1]);
    insert_remove_all(&[1, 0, 2]);
    insert_remove_all(&[1, 2, 0]);
    insert_remove_all(&[2, 0, 1]);
    insert_remove_all(&[2, 1, 0]);
}

#[test]
fn remove_all_orders() {
    for n in 4..=6 {
        for keys in permutations(n) {
            insert_remove_all(&keys);
        }
    }
}

const SIMPLE_SIZE: u32 = 25;

// Inserts `keys` in order, then erases the keys at `erase_order` (indices into `keys`), checking
// the whole tree after every step.
fn insert_then_erase(keys: &[u32], erase_order: &[usize]) {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    check_contents(&tree, &[]);

    for (i, &key) in keys.iter().enumerate() {
        let insert = tree.insert(TestNode::new(key));
        assert!(insert.is_linked());
        assert_eq!(insert.position().get().map(|n| n.key), Some(key));
        drop(insert);

        check_contents(&tree, &keys[..=i]);
    }

    let mut remaining = keys.to_vec();
    for &idx in erase_order {
        let key = keys[idx];
        let removed = tree.remove(&key).expect("key was inserted");
        assert_eq!(removed.key, key);

        remaining.retain(|&k| k != key);
        check_contents(&tree, &remaining);
    }

    assert!(tree.is_empty());
    assert!(tree.first().is_none());
    assert!(tree.last().is_none());
    assert!(tree.cursor_first().get().is_none());
}

#[test]
fn ascending_insert_ascending_erase() {
    let keys: Vec<u32> = (1..=SIMPLE_SIZE).collect();
    let order: Vec<usize> = (0..keys.len()).collect();
    insert_then_erase(&keys, &order);
}

#[test]
fn descending_insert_descending_erase() {
    let keys: Vec<u32> = (1..=SIMPLE_SIZE).rev().collect();
    let order: Vec<usize> = (0..keys.len()).collect();
    insert_then_erase(&keys, &order);
}

// 1, 25, 2, 24, 3, 23, ...
fn center_keys() -> Vec<u32> {
    (0..SIMPLE_SIZE)
        .map(|i| {
            if i % 2 == 0 {
                i / 2 + 1
            } else {
                SIMPLE_SIZE - i / 2
            }
        })
        .collect()
}

#[test]
fn center_insert_margin_erase() {
    let keys = center_keys();
    let order: Vec<usize> = (0..keys.len()).collect();
    insert_then_erase(&keys, &order);
}

#[test]
fn center_insert_center_erase() {
    let keys = center_keys();
    let order: Vec<usize> = (0..keys.len()).rev().collect();
    insert_then_erase(&keys, &order);
}

#[test]
fn min_and_max_follow_inserts() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();

    for key in 1..=SIMPLE_SIZE {
        tree.insert(TestNode::new(key));
        assert_eq!(tree.self_check(), Violations::empty());
        assert_eq!(tree.first().map(|n| n.key), Some(1));
        assert_eq!(tree.last().map(|n| n.key), Some(key));
    }
}

#[test]
fn single_rotations() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [1, 2, 3] {
        tree.insert(TestNode::new(key));
    }

    let root = tree.cursor_root();
    assert_eq!(root.get().map(|n| n.key), Some(2));
    assert_eq!(root.balance(), Some(0));
    assert_eq!(root.peek_left().map(|n| n.key), Some(1));
    assert_eq!(root.peek_right().map(|n| n.key), Some(3));
    drop(root);

    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [3, 2, 1] {
        tree.insert(TestNode::new(key));
    }
    assert_eq!(tree.root().map(|n| n.key), Some(2));
}

#[test]
fn rotation_below_root() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in 1..=5 {
        tree.insert(TestNode::new(key));
    }

    // The rotation at 3 relinks it under 2 rather than at the root.
    let root = tree.cursor_root();
    assert_eq!(root.get().map(|n| n.key), Some(2));
    assert_eq!(root.balance(), Some(1));

    let mut right = root.clone();
    right.move_right();
    assert_eq!(right.get().map(|n| n.key), Some(4));
    assert_eq!(right.peek_left().map(|n| n.key), Some(3));
    assert_eq!(right.peek_right().map(|n| n.key), Some(5));
    right.move_parent();
    assert_eq!(right.get().map(|n| n.key), Some(2));
    drop(root);
    drop(right);

    check_contents(&tree, &[1, 2, 3, 4, 5]);
}

#[test]
fn double_rotations() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [1, 3, 2] {
        tree.insert(TestNode::new(key));
    }
    assert_eq!(tree.root().map(|n| n.key), Some(2));
    tree.assert_invariants();

    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [3, 1, 2] {
        tree.insert(TestNode::new(key));
    }
    assert_eq!(tree.root().map(|n| n.key), Some(2));
    tree.assert_invariants();
}

#[test]
fn erase_takes_replacement_from_taller_side() {
    // Balanced root: the successor replaces it.
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [2, 1, 3] {
        tree.insert(TestNode::new(key));
    }
    tree.remove(&2);
    let root = tree.cursor_root();
    assert_eq!(root.get().map(|n| n.key), Some(3));
    assert_eq!(root.peek_left().map(|n| n.key), Some(1));
    assert!(root.is_left_bigger());
    drop(root);
    tree.assert_invariants();

    // Left-heavy root: the predecessor replaces it.
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [3, 2, 4, 1] {
        tree.insert(TestNode::new(key));
    }
    tree.remove(&3);
    let root = tree.cursor_root();
    assert_eq!(root.get().map(|n| n.key), Some(2));
    assert_eq!(root.peek_left().map(|n| n.key), Some(1));
    assert_eq!(root.peek_right().map(|n| n.key), Some(4));
    assert_eq!(root.balance(), Some(0));
    drop(root);
    tree.assert_invariants();
}

#[test]
fn erase_rebalances_repeatedly() {
    // A minimal AVL tree of height 5 (a Fibonacci tree): removing the deepest element of its
    // shallow side forces rotations on several levels.
    let keys = [8, 5, 11, 3, 7, 10, 12, 2, 4, 6, 9, 1];

    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in keys {
        tree.insert(TestNode::new(key));
    }
    tree.assert_invariants();

    tree.remove(&12);
    check_contents(&tree, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
}

#[test]
fn duplicate_insert_leaves_tree_unchanged() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [5, 3, 8] {
        tree.insert(TestNode::tagged(key, 1));
    }

    let before = {
        let mut s = String::new();
        tree.dotgraph("before", &mut s).unwrap();
        s
    };

    let (existing, rejected) = tree.insert(TestNode::tagged(3, 2)).into_parts();
    assert_eq!(existing.get().map(|n| (n.key, n.tag)), Some((3, 1)));
    let rejected = rejected.expect("a duplicate must be handed back");
    assert_eq!((rejected.key, rejected.tag), (3, 2));
    drop(existing);

    let after = {
        let mut s = String::new();
        tree.dotgraph("before", &mut s).unwrap();
        s
    };
    assert_eq!(before, after);
    assert_eq!(tree.len(), 3);
    tree.assert_invariants();
}

#[test]
fn replace_keeps_structure() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in 1..=7 {
        tree.insert(TestNode::tagged(key, 0));
    }

    let mut before = String::new();
    tree.dotgraph("g", &mut before).unwrap();

    for key in 1..=7 {
        let old = tree.find_raw(&key).expect("item not found");
        let replaced = unsafe { tree.replace(old, TestNode::tagged(key, 1)) };
        assert_eq!((replaced.key, replaced.tag), (key, 0));
        tree.assert_invariants();
    }

    let mut after = String::new();
    tree.dotgraph("g", &mut after).unwrap();
    assert_eq!(before, after);

    assert!(tree.iter().all(|node| node.tag == 1));
    assert_eq!(tree.first().map(|n| (n.key, n.tag)), Some((1, 1)));
    assert_eq!(tree.last().map(|n| (n.key, n.tag)), Some((7, 1)));
}

#[test]
fn replace_current_rejects_unequal_keys() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [1, 2, 3] {
        tree.insert(TestNode::tagged(key, 0));
    }

    let mut curs = tree.find_mut(&2);
    let rejected = curs.replace_current(TestNode::tagged(4, 1)).unwrap_err();
    assert_eq!(rejected.key, 4);
    assert_eq!(curs.get().map(|n| (n.key, n.tag)), Some((2, 0)));

    let old = curs.replace_current(TestNode::tagged(2, 1)).unwrap();
    assert_eq!(old.tag, 0);
    assert_eq!(curs.get().map(|n| (n.key, n.tag)), Some((2, 1)));

    let mut ghost = tree.find_mut(&10);
    assert!(ghost.replace_current(TestNode::tagged(10, 1)).is_err());
    drop(ghost);

    tree.assert_invariants();
    assert_eq!(keys_of(&tree), [1, 2, 3]);
}

#[test]
fn find_misses_land_on_ghost() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [10, 20, 30] {
        tree.insert(TestNode::new(key));
    }

    assert!(tree.find(&15).get().is_none());
    assert!(tree.get(&35).is_none());
    assert!(!tree.contains_key(&5));
    assert!(tree.contains_key(&20));

    let mut curs = tree.find(&20);
    assert_eq!(curs.peek_prev().map(|n| n.key), Some(10));
    assert_eq!(curs.peek_next().map(|n| n.key), Some(30));
    curs.move_next();
    curs.move_next();
    assert!(curs.get().is_none());
    curs.move_prev();
    assert_eq!(curs.get().map(|n| n.key), Some(30));
}

#[test]
fn remove_while_iterating() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in 0..64 {
        tree.insert(TestNode::new(key));
    }

    // Remove every even key; `remove_current` steps to the successor before erasing.
    let mut curs = tree.cursor_first_mut();
    while let Some(node) = curs.get() {
        if node.key % 2 == 0 {
            assert!(curs.remove_current().is_some());
        } else {
            curs.move_next();
        }
    }
    drop(curs);

    let odd: Vec<u32> = (0..64).filter(|k| k % 2 == 1).collect();
    check_contents(&tree, &odd);

    // And the rest in reverse.
    let mut curs = tree.cursor_last_mut();
    let mut removed = Vec::new();
    while let Some(node) = curs.remove_current_and_move_prev() {
        removed.push(node.key);
    }
    drop(curs);

    assert!(removed.iter().rev().eq(odd.iter()));
    check_contents(&tree, &[]);
}

#[test]
fn pop_first_and_last() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [4, 2, 6, 1, 3, 5, 7] {
        tree.insert(TestNode::new(key));
    }

    assert_eq!(tree.pop_first().map(|n| n.key), Some(1));
    assert_eq!(tree.pop_last().map(|n| n.key), Some(7));
    check_contents(&tree, &[2, 3, 4, 5, 6]);

    while tree.pop_first().is_some() {
        tree.assert_invariants();
    }
    assert!(tree.pop_last().is_none());
}

#[test]
fn clear_empties_the_tree() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in 0..100 {
        tree.insert(TestNode::new(key * 7 % 101));
    }

    tree.clear();
    check_contents(&tree, &[]);

    for key in [3, 1, 2] {
        tree.insert(TestNode::new(key));
    }
    check_contents(&tree, &[1, 2, 3]);
}

#[test]
fn self_check_reports_corruption() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in 1..=7 {
        tree.insert(TestNode::new(key));
    }
    assert_eq!(tree.self_check(), Violations::empty());

    let root = tree.root.unwrap();
    let root_links = unsafe { links(root) };
    let left = root_links.left().unwrap();

    // Balance factor.
    root_links.set_balance(2);
    let violations = tree.self_check();
    assert!(violations.contains(Violations::BALANCE | Violations::RIGHT_TOO_TALL));
    root_links.set_balance(0);

    // Side of a child.
    unsafe { links(left).set_side(Dir::Right) };
    assert_eq!(tree.self_check(), Violations::LEFT_SIDE);
    unsafe { links(left).set_side(Dir::Left) };

    // Parent of a child.
    unsafe { links(left).set_parent(None) };
    assert_eq!(tree.self_check(), Violations::LEFT_PARENT);
    unsafe { links(left).set_parent(Some(root)) };

    // Recorded extremes and length.
    let min = tree.min;
    tree.min = tree.max;
    tree.len += 1;
    assert_eq!(tree.self_check(), Violations::MIN | Violations::LEN);
    tree.min = min;
    tree.len -= 1;

    // Ordering.
    let two = tree.find_raw(&2).unwrap();
    unsafe { (*two.as_ptr()).key = 100 };
    let violations = tree.self_check();
    assert!(violations.contains(
        Violations::LEFT_GREATER | Violations::RIGHT_LESS | Violations::IN_ORDER
    ));
    assert!(tree.find(&100).get().is_none(), "lookups follow the corrupted order");
    unsafe { (*two.as_ptr()).key = 2 };

    assert_eq!(tree.self_check(), Violations::empty());
}

#[test]
fn render_levels() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [2, 1, 3, 4] {
        tree.insert(TestNode::new(key));
    }

    let mut out = String::new();
    tree.write_levels(&mut out, 8).unwrap();
    assert_eq!(out, "   2*   \n 1   3* \n      4 \n");

    let empty: AvlTree<TestNode> = AvlTree::new();
    out.clear();
    empty.write_levels(&mut out, 8).unwrap();
    assert_eq!(out, "");
    out.clear();
    empty.dotgraph("empty", &mut out).unwrap();
    assert_eq!(out, "digraph \"graph-empty\" {}");
}

#[test]
fn render_dotgraph() {
    let mut tree: AvlTree<TestNode> = AvlTree::new();
    for key in [2, 1] {
        tree.insert(TestNode::new(key));
    }

    let mut out = String::new();
    tree.dotgraph("t", &mut out).unwrap();

    assert!(out.starts_with("digraph \"graph-t\" {"));
    assert!(out.contains("[label=\"2:-1\"]"));
    assert!(out.contains("[label=\"1:0\"]"));
    assert!(out.contains("\"grapht-2\" -> \"grapht-1\";"));
    assert!(out.ends_with(" }\n}"));
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn cursor_equivalence(
        values in proptest::collection::vec(0u32..1000, 0..100),
        ops in proptest::collection::vec(model::cursor_op_strategy(), FUZZ_RANGE),
    ) {
        model::run_cursor_equivalence(values, ops);
    }
}
