use alloc::{collections::VecDeque, format, string::String, vec, vec::Vec};
use core::{
    fmt::{self, Write},
    ptr::NonNull,
};

use crate::{links, AvlTree, Link, Links, TreeNode};

fn balance_marked<K: fmt::Display + ?Sized>(key: &K, balance: i8) -> String {
    match balance {
        b if b < 0 => format!("*{key}"),
        0 => format!("{key}"),
        _ => format!("{key}*"),
    }
}

impl<T, C> AvlTree<T, C>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Writes the tree as a Graphviz digraph named `name`.
    ///
    /// Nodes are labelled `key:balance`; missing children are drawn as points.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        loop {
            let remaining = queue.len();
            if remaining == 0 {
                break;
            }

            write!(w, "{{rank=same; ")?;

            for _ in 0..remaining {
                let Some(item) = queue.pop_front() else {
                    break;
                };

                let node = match item {
                    Item::Node(node) => node,
                    Item::Missing(id) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                };

                let key = unsafe { node.as_ref().key() };
                let node_links = unsafe { links(node) };
                let balance = node_links.balance();
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{balance}\"]; ")?;

                for child in [node_links.left(), node_links.right()] {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };

                            queue.push_back(Item::Node(child));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }

    /// Writes the tree level by level, one line per level, centring each key in a column whose
    /// width halves at every level.
    ///
    /// A `*` before a key marks a taller left subtree, a `*` after it a taller right subtree.
    pub fn write_levels<W>(&self, mut w: W, width: usize) -> fmt::Result
    where
        W: fmt::Write,
    {
        let mut level: Vec<Link<T>> = vec![self.root];
        let mut width = width;

        while level.iter().any(Option::is_some) {
            let mut next = Vec::with_capacity(level.len() * 2);

            for slot in &level {
                let cell = match *slot {
                    Some(node) => unsafe {
                        let node_links = links(node);
                        next.push(node_links.left());
                        next.push(node_links.right());
                        balance_marked(node.as_ref().key(), node_links.balance())
                    },
                    None => {
                        next.push(None);
                        next.push(None);
                        String::new()
                    }
                };

                write!(w, "{cell:^width$}")?;
            }

            writeln!(w)?;

            level = next;
            width = (width / 2).max(1);
        }

        Ok(())
    }
}
