//! Sample file generation.
//!
//! When no input file is specified, we generate a treecode file from a seeded
//! random tree and a random message over its symbols, then decode it back.
//!
//! # Design
//!
//! Generated samples have:
//! - A random full binary tree grown by splitting random leaves
//! - Distinct printable ASCII symbols, so the decoded message is readable text
//! - Exactly one end-of-message leaf
//!
//! Uneven leaf depths make the bits-per-symbol figure in the metrics vary
//! from seed to seed.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use treecode_core::codec::{encode_file, Alphabet, CodeTree, END_OF_MESSAGE};

/// Printable ASCII, space through tilde.
const PRINTABLE: std::ops::RangeInclusive<u32> = 0x20..=0x7e;

/// A generated tree and the message encoded against it.
#[derive(Debug, Clone)]
pub struct Sample {
    pub tree: CodeTree,
    pub message: Vec<u32>,
}

/// Generate a sample tree with `symbols` leaves plus the end-of-message leaf,
/// and a `length`-symbol message drawn from those leaves.
///
/// `symbols` is clamped to 1..=95.
pub fn generate_sample(seed: u64, symbols: usize, length: usize) -> Sample {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut pool: Vec<u32> = PRINTABLE.collect();
    pool.shuffle(&mut rng);
    pool.truncate(symbols.clamp(1, pool.len()));

    let tree = generate_tree(&mut rng, &pool);
    let message = (0..length)
        .filter_map(|_| pool.choose(&mut rng).copied())
        .collect();

    Sample { tree, message }
}

/// Grow a full binary tree with one leaf per symbol plus the sentinel leaf.
fn generate_tree(rng: &mut ChaCha8Rng, symbols: &[u32]) -> CodeTree {
    let mut tree = CodeTree::new();
    let mut leaves = Vec::with_capacity(symbols.len() + 1);
    if let Ok(root) = tree.add_root(END_OF_MESSAGE) {
        leaves.push(root);
    }

    // Each split turns one leaf into two
    for _ in 0..symbols.len() {
        let p = leaves.swap_remove(rng.gen_range(0..leaves.len()));
        if tree.expand_external(p).is_err() {
            continue;
        }
        leaves.extend(tree.left(p).ok());
        leaves.extend(tree.right(p).ok());
    }

    leaves.shuffle(rng);
    let labels = std::iter::once(END_OF_MESSAGE).chain(symbols.iter().copied());
    for (p, symbol) in leaves.into_iter().zip(labels) {
        let _ = tree.set_element(p, symbol);
    }
    tree
}

/// Generate a sample and write it to `path`.
pub fn write_sample_file(
    path: &Path,
    seed: u64,
    symbols: usize,
    length: usize,
) -> treecode_core::Result<Sample> {
    let sample = generate_sample(seed, symbols, length);
    let bytes = encode_file(path, &sample.tree, &sample.message, &Alphabet::default())?;
    log::info!(
        "wrote sample to {} ({} leaves, {} symbols, {} bytes)",
        path.display(),
        sample.tree.size() / 2 + 1,
        sample.message.len(),
        bytes
    );
    Ok(sample)
}
