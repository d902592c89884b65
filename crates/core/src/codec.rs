//! Self-describing prefix-code files.
//!
//! A file holds two bit-packed sections back to back:
//!
//! ```text
//! +--------------------------------------------------+
//! | Tree section                                     |
//! |   preorder, one marker bit per node:             |
//! |   0            internal node, children follow    |
//! |                (left subtree, then right)        |
//! |   1 <symbol>   leaf, symbol in a fixed-width     |
//! |                field (9 bits by default)         |
//! +--------------------------------------------------+
//! | Message section                                  |
//! |   one root-to-leaf path per symbol               |
//! |   (0 = left, 1 = right), ending with the path of |
//! |   the end-of-message leaf                        |
//! +--------------------------------------------------+
//! | zero padding up to the byte boundary             |
//! +--------------------------------------------------+
//! ```
//!
//! The preorder, left-before-right layout is the wire contract: the reader
//! must rebuild the tree in exactly the order the writer walked it.
//!
//! Decoding is the main job of this module (`read_tree`, `decode_symbol`,
//! `decode_message`, `decode_file`). The writing side (`write_tree`,
//! `CodeTable`, `write_message`, `encode_file`) encodes against an existing
//! tree; it never derives a tree from symbol frequencies.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use crate::bitio::{BitInputStream, BitOutputStream, ReadMode};
use crate::error::{CodecError, Error, Result, TreeError};
use crate::tree::{LinkedBinaryTree, Position};

/// Width of a leaf's symbol field in the default format.
pub const DEFAULT_SYMBOL_WIDTH: u32 = 9;

/// End-of-message symbol in the default format: one past the byte range.
pub const END_OF_MESSAGE: u32 = 256;

/// Hard ceiling on reconstruction depth, whatever the alphabet.
pub const MAX_TREE_DEPTH: usize = 1024;

/// Widest symbol field an alphabet may use.
const MAX_SYMBOL_WIDTH: u32 = 32;

/// Prefix-code tree with one symbol per leaf.
pub type CodeTree = LinkedBinaryTree<u32>;

/// Fixed-width leaf field and the reserved end-of-message value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alphabet {
    symbol_width: u32,
    sentinel: u32,
}

impl Alphabet {
    /// # Errors
    /// `CodecError::InvalidAlphabet` unless `symbol_width` is in 1..=32 and
    /// `sentinel` fits in `symbol_width` bits.
    pub fn new(symbol_width: u32, sentinel: u32) -> Result<Self> {
        let valid = (1..=MAX_SYMBOL_WIDTH).contains(&symbol_width)
            && (sentinel as u64) < (1u64 << symbol_width);
        if !valid {
            return Err(CodecError::InvalidAlphabet {
                width: symbol_width,
                sentinel,
            }
            .into());
        }
        Ok(Self {
            symbol_width,
            sentinel,
        })
    }

    pub fn symbol_width(&self) -> u32 {
        self.symbol_width
    }

    pub fn sentinel(&self) -> u32 {
        self.sentinel
    }

    pub fn is_sentinel(&self, symbol: u32) -> bool {
        symbol == self.sentinel
    }

    /// Deepest tree the reader will rebuild: one level per representable
    /// symbol, capped at `MAX_TREE_DEPTH`.
    pub fn max_depth(&self) -> usize {
        let symbols = 1u64 << self.symbol_width;
        symbols.min(MAX_TREE_DEPTH as u64) as usize
    }

    fn check_fits(&self, symbol: u32) -> Result<()> {
        if (symbol as u64) >> self.symbol_width != 0 {
            return Err(CodecError::SymbolTooWide {
                symbol,
                width: self.symbol_width,
            }
            .into());
        }
        Ok(())
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self {
            symbol_width: DEFAULT_SYMBOL_WIDTH,
            sentinel: END_OF_MESSAGE,
        }
    }
}

/// Settings for decoding a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    pub alphabet: Alphabet,
    pub read_mode: ReadMode,
}

/// Outcome of walking the tree once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Symbol(u32),
    EndOfMessage,
}

/// Symbols recovered from a message section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedMessage {
    /// Decoded symbols in order, sentinel excluded
    pub symbols: Vec<u32>,
    /// Whether the end-of-message symbol was reached
    pub terminated: bool,
}

impl DecodedMessage {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The symbols as bytes.
    ///
    /// # Errors
    /// `CodecError::SymbolOutOfRange` for any symbol above 255.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.symbols
            .iter()
            .map(|&symbol| {
                u8::try_from(symbol).map_err(|_| Error::from(CodecError::SymbolOutOfRange { symbol }))
            })
            .collect()
    }

    /// The symbols as text, replacing invalid UTF-8 sequences.
    pub fn to_text(&self) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.to_bytes()?).into_owned())
    }
}

/// Everything recovered from one file.
#[derive(Debug)]
pub struct DecodedFile {
    pub tree: CodeTree,
    pub message: DecodedMessage,
    /// Bytes consumed from the file
    pub bytes_read: u64,
}

// ----------------------------------------------------------------------
// Reading
// ----------------------------------------------------------------------

/// Rebuild a code tree from the tree section of `input`.
pub fn read_tree<R: Read>(input: &mut BitInputStream<R>, alphabet: &Alphabet) -> Result<CodeTree> {
    let mut tree = CodeTree::new();
    let root = tree.add_root(0)?;
    read_subtree(&mut tree, root, input, alphabet)?;
    log::debug!("reconstructed code tree with {} nodes", tree.size());
    Ok(tree)
}

/// Rebuild the serialized subtree at the external position `p`.
///
/// # Errors
/// - `TreeError::NotExternal` if `p` already has children
/// - `CodecError::TruncatedTree` if the source ends before a marker bit
/// - `CodecError::TreeTooDeep` if nesting exceeds `alphabet.max_depth()`
pub fn read_subtree<R: Read>(
    tree: &mut CodeTree,
    p: Position,
    input: &mut BitInputStream<R>,
    alphabet: &Alphabet,
) -> Result<()> {
    if !tree.is_external(p)? {
        return Err(TreeError::NotExternal.into());
    }
    build(tree, p, input, alphabet, 0)
}

fn build<R: Read>(
    tree: &mut CodeTree,
    p: Position,
    input: &mut BitInputStream<R>,
    alphabet: &Alphabet,
    depth: usize,
) -> Result<()> {
    if input.eof() {
        return Err(CodecError::TruncatedTree { nodes: tree.size() }.into());
    }

    if input.read_bit()? {
        let symbol = input.read(alphabet.symbol_width())? as u32;
        tree.set_element(p, symbol)?;
        return Ok(());
    }

    if depth >= alphabet.max_depth() {
        return Err(CodecError::TreeTooDeep {
            max_depth: alphabet.max_depth(),
        }
        .into());
    }

    tree.expand_external(p)?;
    let left = tree.left(p)?;
    build(tree, left, input, alphabet, depth + 1)?;
    let right = tree.right(p)?;
    build(tree, right, input, alphabet, depth + 1)
}

/// Walk from the root, one bit per step (0 left, 1 right), to a leaf.
pub fn decode_symbol<R: Read>(
    tree: &CodeTree,
    input: &mut BitInputStream<R>,
    alphabet: &Alphabet,
) -> Result<Decoded> {
    let mut p = tree.root();
    if p.is_null() {
        return Err(CodecError::EmptyTree.into());
    }

    while !tree.is_external(p)? {
        p = if input.read_bit()? {
            tree.right(p)?
        } else {
            tree.left(p)?
        };
    }

    let symbol = *tree.element(p)?;
    if alphabet.is_sentinel(symbol) {
        Ok(Decoded::EndOfMessage)
    } else {
        Ok(Decoded::Symbol(symbol))
    }
}

/// Decode symbols until the end-of-message symbol or the end of input.
///
/// Bits after the end-of-message path are consumed and ignored. In lenient
/// mode running out of input simply ends the message; in strict mode it is
/// `CodecError::MissingEndOfMessage` (or `BitIoError::UnexpectedEof` when it
/// happens partway through a path).
pub fn decode_message<R: Read>(
    tree: &CodeTree,
    input: &mut BitInputStream<R>,
    alphabet: &Alphabet,
) -> Result<DecodedMessage> {
    let root = tree.root();
    if root.is_null() {
        return Err(CodecError::EmptyTree.into());
    }

    let mut message = DecodedMessage::default();

    // A lone leaf consumes no bits per symbol
    if tree.is_external(root)? {
        let symbol = *tree.element(root)?;
        if !alphabet.is_sentinel(symbol) {
            return Err(CodecError::SingleLeafTree { symbol }.into());
        }
        message.terminated = true;
        skip_padding(input)?;
        return Ok(message);
    }

    while !input.eof() {
        match decode_symbol(tree, input, alphabet)? {
            Decoded::Symbol(symbol) => message.symbols.push(symbol),
            Decoded::EndOfMessage => {
                message.terminated = true;
                skip_padding(input)?;
                break;
            }
        }
    }

    if !message.terminated && input.mode() == ReadMode::Strict {
        return Err(CodecError::MissingEndOfMessage {
            decoded: message.len(),
        }
        .into());
    }
    Ok(message)
}

fn skip_padding<R: Read>(input: &mut BitInputStream<R>) -> Result<()> {
    let mut skipped = 0u64;
    while !input.eof() {
        input.read_bit()?;
        skipped += 1;
    }
    if skipped >= 8 {
        log::debug!("ignored {} trailing bits after end of message", skipped);
    }
    Ok(())
}

/// Open `path`, rebuild its tree and decode its message.
pub fn decode_file<P: AsRef<Path>>(path: P, options: &DecodeOptions) -> Result<DecodedFile> {
    let mut input = BitInputStream::open_path(path)?.with_mode(options.read_mode);
    let tree = read_tree(&mut input, &options.alphabet)?;
    let message = decode_message(&tree, &mut input, &options.alphabet)?;
    let bytes_read = input.bytes_read();
    input.close();

    log::debug!(
        "decoded {} symbols from {} bytes",
        message.len(),
        bytes_read
    );
    Ok(DecodedFile {
        tree,
        message,
        bytes_read,
    })
}

// ----------------------------------------------------------------------
// Writing
// ----------------------------------------------------------------------

/// Serialize `tree` in preorder, one marker bit per node.
pub fn write_tree<W: Write>(
    tree: &CodeTree,
    out: &mut BitOutputStream<W>,
    alphabet: &Alphabet,
) -> Result<()> {
    if tree.is_empty() {
        return Err(CodecError::EmptyTree.into());
    }

    for p in tree.preorder() {
        if tree.is_external(p)? {
            let symbol = *tree.element(p)?;
            alphabet.check_fits(symbol)?;
            out.write(1, 1)?;
            out.write(symbol as u64, alphabet.symbol_width())?;
        } else {
            out.write(0, 1)?;
        }
    }
    Ok(())
}

/// Root-to-leaf path of every symbol in a tree.
///
/// If a symbol sits in several leaves the first one in preorder wins.
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    paths: HashMap<u32, Vec<bool>>,
}

impl CodeTable {
    pub fn from_tree(tree: &CodeTree) -> Result<Self> {
        let mut paths = HashMap::new();
        let root = tree.root();
        if root.is_null() {
            return Ok(Self { paths });
        }

        let mut stack = vec![(root, Vec::new())];
        while let Some((p, path)) = stack.pop() {
            if tree.is_external(p)? {
                paths.entry(*tree.element(p)?).or_insert(path);
                continue;
            }
            let mut right_path = path.clone();
            right_path.push(true);
            let mut left_path = path;
            left_path.push(false);
            stack.push((tree.right(p)?, right_path));
            stack.push((tree.left(p)?, left_path));
        }

        Ok(Self { paths })
    }

    /// Path to `symbol`, `false` meaning left.
    pub fn path(&self, symbol: u32) -> Option<&[bool]> {
        self.paths.get(&symbol).map(Vec::as_slice)
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Distinct symbols other than the sentinel, in ascending order.
    pub fn message_symbols(&self, alphabet: &Alphabet) -> Vec<u32> {
        let mut symbols: Vec<u32> = self
            .paths
            .keys()
            .copied()
            .filter(|&symbol| !alphabet.is_sentinel(symbol))
            .collect();
        symbols.sort_unstable();
        symbols
    }

    fn write_path<W: Write>(&self, symbol: u32, out: &mut BitOutputStream<W>) -> Result<()> {
        let path = self
            .path(symbol)
            .ok_or(CodecError::UnknownSymbol { symbol })?;
        for &bit in path {
            out.write(bit as u64, 1)?;
        }
        Ok(())
    }
}

/// Write the path of each symbol followed by the end-of-message path.
pub fn write_message<W: Write>(
    table: &CodeTable,
    symbols: &[u32],
    out: &mut BitOutputStream<W>,
    alphabet: &Alphabet,
) -> Result<()> {
    for &symbol in symbols {
        if alphabet.is_sentinel(symbol) {
            return Err(CodecError::SentinelInMessage { symbol }.into());
        }
        if table.path(symbol).is_some_and(|path| path.is_empty()) {
            return Err(CodecError::SingleLeafTree { symbol }.into());
        }
        table.write_path(symbol, out)?;
    }
    table.write_path(alphabet.sentinel(), out)
}

/// Write `tree` and `symbols` to a new file at `path`.
///
/// Returns the number of bytes written.
pub fn encode_file<P: AsRef<Path>>(
    path: P,
    tree: &CodeTree,
    symbols: &[u32],
    alphabet: &Alphabet,
) -> Result<u64> {
    let table = CodeTable::from_tree(tree)?;
    let mut out = BitOutputStream::create(path)?;
    write_tree(tree, &mut out, alphabet)?;
    write_message(&table, symbols, &mut out, alphabet)?;
    out.close()?;
    Ok(out.bytes_written())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BitIoError;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Pack (value, width) pairs the way a writer would.
    fn pack(fields: &[(u64, u32)]) -> Vec<u8> {
        let mut out = BitOutputStream::from_writer(Vec::new());
        for &(value, width) in fields {
            out.write(value, width).unwrap();
        }
        out.finish().unwrap()
    }

    fn bits(path: &str) -> Vec<(u64, u32)> {
        path.chars().map(|c| (if c == '1' { 1 } else { 0 }, 1)).collect()
    }

    /// Tree section for: 0 0 1<65> 1<66> 0 1<256> 1<67>
    fn ab_tree_fields() -> Vec<(u64, u32)> {
        vec![
            (0, 1),
            (0, 1),
            (1, 1),
            (65, 9),
            (1, 1),
            (66, 9),
            (0, 1),
            (1, 1),
            (256, 9),
            (1, 1),
            (67, 9),
        ]
    }

    fn random_tree(rng: &mut ChaCha8Rng, leaves: usize) -> CodeTree {
        let mut tree = CodeTree::new();
        let root = tree.add_root(0).unwrap();
        let mut externals = vec![root];
        while externals.len() < leaves {
            let p = externals.swap_remove(rng.gen_range(0..externals.len()));
            tree.expand_external(p).unwrap();
            externals.push(tree.left(p).unwrap());
            externals.push(tree.right(p).unwrap());
        }

        let mut symbols: Vec<u32> = (0..=END_OF_MESSAGE).collect();
        symbols.shuffle(rng);
        let sentinel = symbols.iter().position(|&s| s == END_OF_MESSAGE).unwrap();
        symbols.swap(0, sentinel);
        for (p, &symbol) in externals.iter().zip(&symbols) {
            tree.set_element(*p, symbol).unwrap();
        }
        tree
    }

    #[test]
    fn test_alphabet_validation() {
        assert!(Alphabet::new(9, 256).is_ok());
        assert!(Alphabet::new(8, 256).is_err());
        assert!(Alphabet::new(0, 0).is_err());
        assert!(Alphabet::new(33, 1).is_err());
        assert_eq!(Alphabet::new(32, u32::MAX).unwrap().max_depth(), MAX_TREE_DEPTH);
        assert_eq!(Alphabet::default().max_depth(), 512);
    }

    #[test]
    fn test_decode_ab_example() {
        let mut fields = ab_tree_fields();
        fields.extend(bits("00")); // A
        fields.extend(bits("01")); // B
        fields.extend(bits("10")); // end of message
        let bytes = pack(&fields);

        let alphabet = Alphabet::default();
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        assert_eq!(tree.size(), 7);

        let message = decode_message(&tree, &mut input, &alphabet).unwrap();
        assert!(message.terminated);
        assert_eq!(message.to_text().unwrap(), "AB");
        assert!(input.eof());
    }

    #[test]
    fn test_reconstructed_structure() {
        let bytes = pack(&ab_tree_fields());
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &Alphabet::default()).unwrap();

        let root = tree.root();
        let l = tree.left(root).unwrap();
        let r = tree.right(root).unwrap();
        assert!(!tree.is_external(l).unwrap());
        assert!(!tree.is_external(r).unwrap());
        let leaf = |p| *tree.element(p).unwrap();
        assert_eq!(leaf(tree.left(l).unwrap()), 65);
        assert_eq!(leaf(tree.right(l).unwrap()), 66);
        assert_eq!(leaf(tree.left(r).unwrap()), 256);
        assert_eq!(leaf(tree.right(r).unwrap()), 67);
    }

    #[test]
    fn test_sentinel_only_message_is_empty() {
        let mut fields = ab_tree_fields();
        fields.extend(bits("10"));
        let bytes = pack(&fields);

        let alphabet = Alphabet::default();
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        let message = decode_message(&tree, &mut input, &alphabet).unwrap();
        assert!(message.is_empty());
        assert!(message.terminated);
    }

    #[test]
    fn test_trailing_bits_ignored() {
        let mut fields = ab_tree_fields();
        fields.extend(bits("11")); // C
        fields.extend(bits("10")); // end of message
        fields.extend(bits("0101111")); // garbage that would decode to B, C, C
        let bytes = pack(&fields);

        let alphabet = Alphabet::default();
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        let message = decode_message(&tree, &mut input, &alphabet).unwrap();
        assert_eq!(message.symbols, vec![67]);
        assert!(input.eof());
    }

    #[test]
    fn test_decode_symbol_steps() {
        let mut fields = ab_tree_fields();
        fields.extend(bits("0111"));
        let bytes = pack(&fields);

        let alphabet = Alphabet::default();
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        assert_eq!(decode_symbol(&tree, &mut input, &alphabet).unwrap(), Decoded::Symbol(66));
        assert_eq!(decode_symbol(&tree, &mut input, &alphabet).unwrap(), Decoded::Symbol(67));
    }

    #[test]
    fn test_missing_sentinel() {
        let mut fields = ab_tree_fields();
        fields.extend(bits("000000")); // A A A, no end of message, padded with 0s
        let bytes = pack(&fields);
        let alphabet = Alphabet::default();

        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        let message = decode_message(&tree, &mut input, &alphabet).unwrap();
        assert!(!message.terminated);
        assert!(message.symbols.iter().all(|&s| s == 65));

        let mut input = BitInputStream::from_reader(&bytes[..])
            .unwrap()
            .with_mode(ReadMode::Strict);
        let tree = read_tree(&mut input, &alphabet).unwrap();
        let result = decode_message(&tree, &mut input, &alphabet);
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::MissingEndOfMessage { .. }))
                | Err(Error::BitIo(BitIoError::UnexpectedEof))
        ));
    }

    #[test]
    fn test_empty_source() {
        let mut input = BitInputStream::from_reader(&[][..]).unwrap();
        let result = read_tree(&mut input, &Alphabet::default());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::TruncatedTree { .. }))
        ));
    }

    #[test]
    fn test_truncated_tree() {
        // Two internal markers, then a leaf whose payload runs off the end
        let bytes = pack(&[(0, 1), (0, 1), (1, 1), (65, 5)]);
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let result = read_tree(&mut input, &Alphabet::default());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::TruncatedTree { .. }))
        ));
    }

    #[test]
    fn test_runaway_tree_depth() {
        let bytes = vec![0u8; 100];
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let result = read_tree(&mut input, &Alphabet::default());
        assert!(matches!(
            result,
            Err(Error::Codec(CodecError::TreeTooDeep { max_depth: 512 }))
        ));
    }

    #[test]
    fn test_single_leaf_trees() {
        let alphabet = Alphabet::default();

        let bytes = pack(&[(1, 1), (256, 9)]);
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        let message = decode_message(&tree, &mut input, &alphabet).unwrap();
        assert!(message.is_empty());
        assert!(message.terminated);

        let bytes = pack(&[(1, 1), (65, 9)]);
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        assert!(matches!(
            decode_message(&tree, &mut input, &alphabet),
            Err(Error::Codec(CodecError::SingleLeafTree { symbol: 65 }))
        ));
    }

    #[test]
    fn test_read_subtree_requires_external() {
        let bytes = pack(&ab_tree_fields());
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let mut tree = CodeTree::new();
        let root = tree.add_root(0).unwrap();
        tree.expand_external(root).unwrap();
        assert!(matches!(
            read_subtree(&mut tree, root, &mut input, &Alphabet::default()),
            Err(Error::Tree(TreeError::NotExternal))
        ));

        // Grafting onto a leaf of an existing tree
        let right = tree.right(root).unwrap();
        read_subtree(&mut tree, right, &mut input, &Alphabet::default()).unwrap();
        assert_eq!(tree.size(), 9);
    }

    #[test]
    fn test_empty_tree_rejected() {
        let tree = CodeTree::new();
        let mut input = BitInputStream::from_reader(&[0xFFu8][..]).unwrap();
        assert!(matches!(
            decode_symbol(&tree, &mut input, &Alphabet::default()),
            Err(Error::Codec(CodecError::EmptyTree))
        ));
        let mut out = BitOutputStream::from_writer(Vec::new());
        assert!(write_tree(&tree, &mut out, &Alphabet::default()).is_err());
    }

    #[test]
    fn test_symbols_beyond_bytes() {
        let message = DecodedMessage {
            symbols: vec![72, 300],
            terminated: true,
        };
        assert!(matches!(
            message.to_bytes(),
            Err(Error::Codec(CodecError::SymbolOutOfRange { symbol: 300 }))
        ));
    }

    #[test]
    fn test_write_tree_matches_hand_packed() {
        let bytes = pack(&ab_tree_fields());
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &Alphabet::default()).unwrap();

        let mut out = BitOutputStream::from_writer(Vec::new());
        write_tree(&tree, &mut out, &Alphabet::default()).unwrap();
        assert_eq!(out.finish().unwrap(), bytes);
    }

    #[test]
    fn test_write_tree_rejects_wide_symbol() {
        let mut tree = CodeTree::new();
        let root = tree.add_root(0).unwrap();
        tree.expand_external(root).unwrap();
        let left = tree.left(root).unwrap();
        tree.set_element(left, 600).unwrap();

        let mut out = BitOutputStream::from_writer(Vec::new());
        assert!(matches!(
            write_tree(&tree, &mut out, &Alphabet::default()),
            Err(Error::Codec(CodecError::SymbolTooWide { symbol: 600, width: 9 }))
        ));
    }

    #[test]
    fn test_code_table_paths() {
        let bytes = pack(&ab_tree_fields());
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let tree = read_tree(&mut input, &Alphabet::default()).unwrap();
        let table = CodeTable::from_tree(&tree).unwrap();

        assert_eq!(table.len(), 4);
        assert_eq!(table.path(65), Some(&[false, false][..]));
        assert_eq!(table.path(256), Some(&[true, false][..]));
        assert_eq!(table.path(1), None);
        assert_eq!(table.message_symbols(&Alphabet::default()), vec![65, 66, 67]);
    }

    #[test]
    fn test_write_message_errors() {
        let bytes = pack(&ab_tree_fields());
        let mut input = BitInputStream::from_reader(&bytes[..]).unwrap();
        let alphabet = Alphabet::default();
        let tree = read_tree(&mut input, &alphabet).unwrap();
        let table = CodeTable::from_tree(&tree).unwrap();

        let mut out = BitOutputStream::from_writer(Vec::new());
        assert!(matches!(
            write_message(&table, &[65, 90], &mut out, &alphabet),
            Err(Error::Codec(CodecError::UnknownSymbol { symbol: 90 }))
        ));
        assert!(matches!(
            write_message(&table, &[256], &mut out, &alphabet),
            Err(Error::Codec(CodecError::SentinelInMessage { symbol: 256 }))
        ));
    }

    #[test]
    fn test_random_trees_round_trip() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let alphabet = Alphabet::default();

        for leaves in [2, 3, 17, 64, 257] {
            let tree = random_tree(&mut rng, leaves);
            let table = CodeTable::from_tree(&tree).unwrap();
            let choices = table.message_symbols(&alphabet);
            let symbols: Vec<u32> = (0..200)
                .map(|_| choices[rng.gen_range(0..choices.len())])
                .collect();

            let mut out = BitOutputStream::from_writer(Vec::new());
            write_tree(&tree, &mut out, &alphabet).unwrap();
            write_message(&table, &symbols, &mut out, &alphabet).unwrap();
            let bytes = out.finish().unwrap();

            let mut input = BitInputStream::from_reader(&bytes[..])
                .unwrap()
                .with_mode(ReadMode::Strict);
            let decoded_tree = read_tree(&mut input, &alphabet).unwrap();
            assert_eq!(decoded_tree.size(), 2 * leaves - 1);

            // Same shape and leaves, node by node in preorder
            for (a, b) in tree.preorder().zip(decoded_tree.preorder()) {
                assert_eq!(tree.is_external(a).unwrap(), decoded_tree.is_external(b).unwrap());
                assert_eq!(tree.depth(a).unwrap(), decoded_tree.depth(b).unwrap());
                if tree.is_external(a).unwrap() {
                    assert_eq!(tree.element(a).unwrap(), decoded_tree.element(b).unwrap());
                }
            }

            let message = decode_message(&decoded_tree, &mut input, &alphabet).unwrap();
            assert!(message.terminated);
            assert_eq!(message.symbols, symbols);
        }
    }
}
