//! Graphviz rendering of a tree.
//!
//! Each node becomes a record with its parent port, element, auxiliary value
//! and left/right ports, and every link is drawn in both directions so broken
//! parent links show up. An optional highlighted position gets an extra `pos`
//! arrow. Rendering only reads the tree.
//!
//! Turn the output into an image with the external layout tool, e.g.
//! `dot tree.dot -T svg -o tree.svg`.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::tree::{LinkedBinaryTree, Position};

/// Write the DOT description of `tree` to `out`.
///
/// # Errors
/// Propagates position errors if `highlight` is not a live position of `tree`.
pub fn render_to<T: Display, W: Write>(
    tree: &LinkedBinaryTree<T>,
    highlight: Option<Position>,
    out: &mut W,
) -> Result<()> {
    if let Some(p) = highlight {
        tree.element(p)?;
    }

    writeln!(out, "digraph {{")?;
    writeln!(out, "root [label=\"rt\"];")?;

    if tree.is_empty() {
        writeln!(out, "zero [shape=none, label=\"0\"];")?;
        writeln!(out, "root -> zero;")?;
        writeln!(out, "}}")?;
        return Ok(());
    }

    let ids: HashMap<Position, usize> = tree
        .preorder()
        .enumerate()
        .map(|(id, p)| (p, id))
        .collect();

    writeln!(out, "root -> node{};", ids[&tree.root()])?;

    for (p, id) in tree.preorder().zip(0..) {
        writeln!(
            out,
            "node{} [shape=record,label=\"{{<parent> parent | {} | aux = {} | {{ <left> left | <right> right }} }}\"];",
            id,
            tree.element(p)?,
            tree.auxiliary(p)?
        )?;
    }

    for (p, id) in tree.preorder().zip(0..) {
        let links = [
            ("parent:n", tree.parent(p)?),
            ("left:s", tree.left(p)?),
            ("right:s", tree.right(p)?),
        ];
        for (port, target) in links {
            if let Some(target) = ids.get(&target) {
                writeln!(out, "node{}:{} -> node{};", id, port, target)?;
            }
        }
    }

    if let Some(id) = highlight.and_then(|p| ids.get(&p)) {
        writeln!(out, "pos -> node{};", id)?;
    }

    writeln!(out, "}}")?;
    Ok(())
}

/// Render `tree` to a DOT string.
pub fn render<T: Display>(tree: &LinkedBinaryTree<T>, highlight: Option<Position>) -> Result<String> {
    let mut buf = Vec::new();
    render_to(tree, highlight, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Render `tree` into the file at `path`.
pub fn write_dot_file<T: Display, P: AsRef<Path>>(
    tree: &LinkedBinaryTree<T>,
    highlight: Option<Position>,
    path: P,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    render_to(tree, highlight, &mut out)?;
    out.flush()?;
    log::debug!("wrote tree rendering to {}", path.as_ref().display());
    Ok(())
}
