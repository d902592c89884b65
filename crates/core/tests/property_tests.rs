//! Property-based tests for bit streams, tree shape and tree reconstruction.

use proptest::prelude::*;
use treecode_core::{
    bitio::{BitInputStream, BitOutputStream},
    codec::{read_tree, write_tree, Alphabet, CodeTree},
    tree::Position,
};

/// Grow a tree by expanding the `picks[i] % leaves`-th external node each step.
fn grow(picks: &[usize]) -> CodeTree {
    let mut tree = CodeTree::new();
    let root = tree.add_root(0).unwrap();
    let mut externals = vec![root];
    for &pick in picks {
        let p = externals.swap_remove(pick % externals.len());
        tree.expand_external(p).unwrap();
        externals.push(tree.left(p).unwrap());
        externals.push(tree.right(p).unwrap());
    }
    for (i, p) in externals.into_iter().enumerate() {
        tree.set_element(p, i as u32).unwrap();
    }
    tree
}

/// Follow `path` from the root, stopping early at a leaf.
fn walk(tree: &CodeTree, path: &[bool]) -> Position {
    let mut p = tree.root();
    for &bit in path {
        if tree.is_external(p).unwrap() {
            break;
        }
        p = if bit {
            tree.right(p).unwrap()
        } else {
            tree.left(p).unwrap()
        };
    }
    p
}

proptest! {
    #[test]
    fn bit_round_trip(fields in prop::collection::vec((any::<u64>(), 1u32..=32), 0..64)) {
        let mut out = BitOutputStream::from_writer(Vec::new());
        for &(value, width) in &fields {
            out.write(value, width).unwrap();
        }
        let bytes = out.finish().unwrap();

        let total_bits: u32 = fields.iter().map(|&(_, width)| width).sum();
        prop_assert_eq!(bytes.len() as u32, (total_bits + 7) / 8);

        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        for &(value, width) in &fields {
            let masked = value & ((1u64 << width) - 1);
            prop_assert_eq!(input.read(width).unwrap(), masked);
        }
    }

    #[test]
    fn expansion_keeps_full_shape(picks in prop::collection::vec(any::<usize>(), 0..100)) {
        let tree = grow(&picks);
        prop_assert_eq!(tree.size(), 1 + 2 * picks.len());

        let mut count = 0;
        for p in tree.preorder() {
            let left = tree.has_left_child(p).unwrap();
            let right = tree.has_right_child(p).unwrap();
            prop_assert_eq!(left, right);
            prop_assert_eq!(tree.is_external(p).unwrap(), !left);
            count += 1;
        }
        prop_assert_eq!(count, tree.size());
    }

    #[test]
    fn reconstruction_matches_original(
        picks in prop::collection::vec(any::<usize>(), 1..60),
        paths in prop::collection::vec(prop::collection::vec(any::<bool>(), 0..70), 1..20),
    ) {
        let tree = grow(&picks);
        let alphabet = Alphabet::default();

        let mut out = BitOutputStream::from_writer(Vec::new());
        write_tree(&tree, &mut out, &alphabet).unwrap();
        let bytes = out.finish().unwrap();

        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let rebuilt = read_tree(&mut input, &alphabet).unwrap();
        prop_assert_eq!(rebuilt.size(), tree.size());

        for path in &paths {
            let a = walk(&tree, path);
            let b = walk(&rebuilt, path);
            prop_assert_eq!(tree.is_external(a).unwrap(), rebuilt.is_external(b).unwrap());
            prop_assert_eq!(tree.depth(a).unwrap(), rebuilt.depth(b).unwrap());
            if tree.is_external(a).unwrap() {
                prop_assert_eq!(tree.element(a).unwrap(), rebuilt.element(b).unwrap());
            }
        }
    }
}
