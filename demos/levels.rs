//! Grows a tree one key at a time and prints its shape after every step.
//!
//! Run with `RUST_LOG=trace` to see every rotation.

use std::ptr::NonNull;

use cordyceps::Linked;
use cordyceps_avl::{AvlTree, Links, TreeNode};

const SIZE: u32 = 25;
const WIDTH: usize = 96;

#[derive(Debug)]
#[repr(C)]
struct Node {
    links: Links<Node>,
    key: u32,
}

impl Node {
    fn new(key: u32) -> Box<Node> {
        Box::new(Node {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<Node>> for Node {
    type Handle = Box<Node>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Node>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<Node>> for Node {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

fn print_levels(tree: &AvlTree<Node>) {
    let mut out = String::new();
    tree.write_levels(&mut out, WIDTH).expect("writing to a String never fails");
    println!("{out}");
}

fn main() {
    env_logger::init();

    let mut tree: AvlTree<Node> = AvlTree::new();

    for key in 1..=SIZE {
        log::info!("insert {key}");
        tree.insert(Node::new(key));
        tree.assert_invariants();
        print_levels(&tree);
    }

    let mut dot = String::new();
    tree.dotgraph("full", &mut dot).expect("writing to a String never fails");
    println!("{dot}");

    // Erase from the centre outward.
    let mut lo = SIZE / 2;
    let mut hi = lo + 1;
    while lo > 0 || hi <= SIZE {
        for key in [lo, hi] {
            if (1..=SIZE).contains(&key) && tree.remove(&key).is_some() {
                log::info!("erase {key}");
                tree.assert_invariants();
            }
        }

        lo = lo.saturating_sub(1);
        hi += 1;

        print_levels(&tree);
    }

    assert!(tree.is_empty());
}
