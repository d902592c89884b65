//! Linked binary tree addressed through position handles.
//!
//! Nodes live in an arena owned by the tree. Ownership flows from a parent to
//! its two children; the child-to-parent link is a plain slot index used only
//! for navigation. Callers never see nodes directly, only `Position` handles.
//!
//! # Positions
//!
//! A `Position` names a slot in one particular tree instance, together with
//! the generation the slot had when the handle was issued. Every operation
//! validates its handle before touching the arena:
//! - a null handle is rejected with `TreeError::NullPosition`
//! - a handle issued by another tree is rejected with `TreeError::ForeignPosition`
//! - a handle whose node has been removed is rejected with `TreeError::StalePosition`
//!
//! # Shape
//!
//! Every node is either external (no children) or internal (exactly two).
//! The only way to grow the tree is `expand_external`, which attaches both
//! children at once, so a node with a single child never exists.
//!
//! # Example
//! ```
//! use treecode_core::tree::LinkedBinaryTree;
//!
//! let mut tree = LinkedBinaryTree::new();
//! let root = tree.add_root(0u32).unwrap();
//! tree.expand_external(root).unwrap();
//! let left = tree.left(root).unwrap();
//! tree.set_element(left, 65).unwrap();
//!
//! assert_eq!(tree.size(), 3);
//! assert!(tree.is_external(left).unwrap());
//! assert_eq!(*tree.element(left).unwrap(), 65);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Result, TreeError};

/// Source of tree identities. Zero is reserved for unbound positions.
static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one tree instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
struct TreeId(u64);

impl TreeId {
    fn fresh() -> Self {
        TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Slot index plus the generation it had when the handle was issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeRef {
    slot: usize,
    generation: u32,
}

/// Handle to a node of a specific `LinkedBinaryTree`.
///
/// Handles are cheap to copy and carry no borrow of the tree; the tree checks
/// them on every use. `Position::default()` is the null position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Position {
    node: Option<NodeRef>,
    tree: TreeId,
}

impl Position {
    /// A position that references no node.
    pub fn null() -> Self {
        Self::default()
    }

    /// True if this position references no node.
    pub fn is_null(&self) -> bool {
        self.node.is_none()
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    elem: T,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    /// Free for extensions; decoding never reads it
    aux: i32,
}

impl<T> Node<T> {
    fn new(elem: T, parent: Option<usize>) -> Self {
        Self {
            elem,
            parent,
            left: None,
            right: None,
            aux: 0,
        }
    }

    fn is_external(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<Node<T>>,
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Binary tree whose nodes are reached through `Position` handles.
///
/// Cloning produces a fully independent deep copy with its own identity, so
/// positions of the original are rejected by the clone and vice versa.
#[derive(Debug)]
pub struct LinkedBinaryTree<T> {
    id: TreeId,
    slots: Vec<Slot<T>>,
    /// Vacant slot indices available for reuse
    free: Vec<usize>,
    root: Option<usize>,
    len: usize,
}

impl<T> LinkedBinaryTree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self {
            id: TreeId::fresh(),
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.len
    }

    /// True if the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the root, or a null position bound to this tree if empty.
    pub fn root(&self) -> Position {
        match self.root {
            Some(idx) => self.position(idx),
            None => Position {
                node: None,
                tree: self.id,
            },
        }
    }

    /// Create the root of an empty tree.
    ///
    /// # Errors
    /// `TreeError::RootExists` if the tree already has nodes.
    pub fn add_root(&mut self, value: T) -> Result<Position> {
        if self.root.is_some() {
            return Err(TreeError::RootExists.into());
        }
        let idx = self.alloc(Node::new(value, None));
        self.root = Some(idx);
        self.len = 1;
        Ok(self.position(idx))
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    /// Left child of `p`, or a null position if `p` is external.
    pub fn left(&self, p: Position) -> Result<Position> {
        let idx = self.validate(p)?;
        Ok(self.link(self.node(idx)?.left))
    }

    /// Right child of `p`, or a null position if `p` is external.
    pub fn right(&self, p: Position) -> Result<Position> {
        let idx = self.validate(p)?;
        Ok(self.link(self.node(idx)?.right))
    }

    /// Parent of `p`, or a null position if `p` is the root.
    pub fn parent(&self, p: Position) -> Result<Position> {
        let idx = self.validate(p)?;
        Ok(self.link(self.node(idx)?.parent))
    }

    pub fn has_left_child(&self, p: Position) -> Result<bool> {
        let idx = self.validate(p)?;
        Ok(self.node(idx)?.left.is_some())
    }

    pub fn has_right_child(&self, p: Position) -> Result<bool> {
        let idx = self.validate(p)?;
        Ok(self.node(idx)?.right.is_some())
    }

    pub fn is_root(&self, p: Position) -> Result<bool> {
        let idx = self.validate(p)?;
        Ok(self.root == Some(idx))
    }

    pub fn is_external(&self, p: Position) -> Result<bool> {
        let idx = self.validate(p)?;
        Ok(self.node(idx)?.is_external())
    }

    /// Number of edges between `p` and the root.
    pub fn depth(&self, p: Position) -> Result<usize> {
        let mut idx = self.validate(p)?;
        let mut depth = 0;
        while let Some(parent) = self.node(idx)?.parent {
            idx = parent;
            depth += 1;
        }
        Ok(depth)
    }

    /// Positions of every node, parent before children, left before right.
    pub fn preorder(&self) -> Preorder<'_, T> {
        Preorder {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }

    // ------------------------------------------------------------------
    // Element access
    // ------------------------------------------------------------------

    pub fn element(&self, p: Position) -> Result<&T> {
        let idx = self.validate(p)?;
        Ok(&self.node(idx)?.elem)
    }

    pub fn element_mut(&mut self, p: Position) -> Result<&mut T> {
        let idx = self.validate(p)?;
        Ok(&mut self.node_mut(idx)?.elem)
    }

    /// Store `value` at `p`, returning the previous element.
    pub fn set_element(&mut self, p: Position, value: T) -> Result<T> {
        Ok(std::mem::replace(self.element_mut(p)?, value))
    }

    /// Auxiliary field of `p`.
    pub fn auxiliary(&self, p: Position) -> Result<i32> {
        let idx = self.validate(p)?;
        Ok(self.node(idx)?.aux)
    }

    pub fn set_auxiliary(&mut self, p: Position, value: i32) -> Result<()> {
        let idx = self.validate(p)?;
        self.node_mut(idx)?.aux = value;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural updates
    // ------------------------------------------------------------------

    /// Delete the external node `p` and its parent, promoting `p`'s sibling
    /// into the parent's place.
    ///
    /// Returns the position of the promoted sibling.
    ///
    /// # Errors
    /// - `TreeError::NotExternal` if `p` has children
    /// - `TreeError::NoParent` if `p` is the root
    pub fn remove_above_external(&mut self, p: Position) -> Result<Position> {
        let ext = self.validate_external(p)?;
        let parent = self.node(ext)?.parent.ok_or(TreeError::NoParent)?;

        let (left, right, grand) = {
            let node = self.node(parent)?;
            (node.left, node.right, node.parent)
        };
        let sibling = (if left == Some(ext) { right } else { left }).ok_or(TreeError::StalePosition)?;

        match grand {
            None => self.root = Some(sibling),
            Some(grand) => {
                let node = self.node_mut(grand)?;
                if node.left == Some(parent) {
                    node.left = Some(sibling);
                } else {
                    node.right = Some(sibling);
                }
            }
        }
        self.node_mut(sibling)?.parent = grand;

        self.release(ext);
        self.release(parent);
        self.len -= 2;

        Ok(self.position(sibling))
    }

    /// Replace the external node `p` with the whole of `other`.
    ///
    /// The nodes of `other` move into this tree and `other` is left empty.
    /// Positions previously issued by `other` become stale.
    ///
    /// # Errors
    /// - `TreeError::NotExternal` if `p` has children
    /// - `TreeError::EmptyTree` if `other` has no nodes
    pub fn replace_external_with_subtree(&mut self, p: Position, other: &mut Self) -> Result<()> {
        let ext = self.validate_external(p)?;
        let other_root = other.root.ok_or(TreeError::EmptyTree)?;
        let other_len = other.len;

        let spliced = self.adopt(other, other_root)?;
        other.root = None;
        other.len = 0;

        let parent = self.node(ext)?.parent;
        self.node_mut(spliced)?.parent = parent;
        match parent {
            None => self.root = Some(spliced),
            Some(parent) => {
                let node = self.node_mut(parent)?;
                if node.left == Some(ext) {
                    node.left = Some(spliced);
                } else {
                    node.right = Some(spliced);
                }
            }
        }

        self.release(ext);
        self.len += other_len - 1;
        Ok(())
    }

    /// Move the subtree of `other` rooted at `start` into this arena.
    /// Returns the new slot of `start`, still detached from any parent.
    fn adopt(&mut self, other: &mut Self, start: usize) -> Result<usize> {
        let mut stack = vec![(start, None, Side::Left)];
        let mut top = None;

        while let Some((old, new_parent, side)) = stack.pop() {
            let node = other.release(old).ok_or(TreeError::StalePosition)?;
            let idx = self.alloc(Node {
                elem: node.elem,
                parent: new_parent,
                left: None,
                right: None,
                aux: node.aux,
            });

            match new_parent {
                None => top = Some(idx),
                Some(parent) => {
                    let parent = self.node_mut(parent)?;
                    match side {
                        Side::Left => parent.left = Some(idx),
                        Side::Right => parent.right = Some(idx),
                    }
                }
            }

            if let Some(right) = node.right {
                stack.push((right, Some(idx), Side::Right));
            }
            if let Some(left) = node.left {
                stack.push((left, Some(idx), Side::Left));
            }
        }

        Ok(top.ok_or(TreeError::EmptyTree)?)
    }

    // ------------------------------------------------------------------
    // Arena plumbing
    // ------------------------------------------------------------------

    fn validate(&self, p: Position) -> std::result::Result<usize, TreeError> {
        let node = p.node.ok_or(TreeError::NullPosition)?;
        if p.tree != self.id {
            return Err(TreeError::ForeignPosition);
        }
        match self.slots.get(node.slot) {
            Some(slot) if slot.generation == node.generation && slot.node.is_some() => Ok(node.slot),
            _ => Err(TreeError::StalePosition),
        }
    }

    fn validate_external(&self, p: Position) -> std::result::Result<usize, TreeError> {
        let idx = self.validate(p)?;
        if !self.node(idx)?.is_external() {
            return Err(TreeError::NotExternal);
        }
        Ok(idx)
    }

    fn node(&self, idx: usize) -> std::result::Result<&Node<T>, TreeError> {
        self.slots
            .get(idx)
            .and_then(|slot| slot.node.as_ref())
            .ok_or(TreeError::StalePosition)
    }

    fn node_mut(&mut self, idx: usize) -> std::result::Result<&mut Node<T>, TreeError> {
        self.slots
            .get_mut(idx)
            .and_then(|slot| slot.node.as_mut())
            .ok_or(TreeError::StalePosition)
    }

    fn position(&self, idx: usize) -> Position {
        let generation = self.slots.get(idx).map_or(0, |slot| slot.generation);
        Position {
            node: Some(NodeRef {
                slot: idx,
                generation,
            }),
            tree: self.id,
        }
    }

    fn link(&self, idx: Option<usize>) -> Position {
        match idx {
            Some(idx) => self.position(idx),
            None => Position {
                node: None,
                tree: self.id,
            },
        }
    }

    fn alloc(&mut self, node: Node<T>) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx].node = Some(node);
                idx
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                self.slots.len() - 1
            }
        }
    }

    /// Vacate a slot, invalidating every handle that points at it.
    fn release(&mut self, idx: usize) -> Option<Node<T>> {
        let slot = self.slots.get_mut(idx)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(idx);
        Some(node)
    }
}

impl<T: Default> LinkedBinaryTree<T> {
    /// Turn the external node `p` into an internal node with two new external
    /// children holding `T::default()`.
    ///
    /// # Errors
    /// `TreeError::NotExternal` if `p` already has children.
    pub fn expand_external(&mut self, p: Position) -> Result<()> {
        let ext = self.validate_external(p)?;
        let left = self.alloc(Node::new(T::default(), Some(ext)));
        let right = self.alloc(Node::new(T::default(), Some(ext)));

        let node = self.node_mut(ext)?;
        node.left = Some(left);
        node.right = Some(right);
        self.len += 2;
        Ok(())
    }
}

impl<T: Clone> Clone for LinkedBinaryTree<T> {
    fn clone(&self) -> Self {
        Self {
            id: TreeId::fresh(),
            slots: self.slots.clone(),
            free: self.free.clone(),
            root: self.root,
            len: self.len,
        }
    }
}

impl<T> Default for LinkedBinaryTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Preorder iterator over the positions of a tree.
pub struct Preorder<'a, T> {
    tree: &'a LinkedBinaryTree<T>,
    stack: Vec<usize>,
}

impl<T> Iterator for Preorder<'_, T> {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let idx = self.stack.pop()?;
        let node = self.tree.node(idx).ok()?;
        if let Some(right) = node.right {
            self.stack.push(right);
        }
        if let Some(left) = node.left {
            self.stack.push(left);
        }
        Some(self.tree.position(idx))
    }
}
