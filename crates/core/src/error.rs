//! Error types for the treecode system.
//!
//! All operations return structured errors rather than panicking. Invalid
//! tree positions are caller bugs, but they still surface as `Err` so the
//! offending call is aborted without corrupting the tree.

use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: packing/unpacking bits to and from a byte stream
/// - Tree: position validity and structural preconditions
/// - Codec: reconstructing a tree or decoding a message against it
/// - I/O: file system operations
#[derive(Debug, Error)]
pub enum Error {
    /// Bit I/O operation failed (e.g., reading past end in strict mode)
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Invalid position or violated structural precondition
    #[error("tree error: {0}")]
    Tree(#[from] TreeError),

    /// Tree reconstruction or symbol decoding failure
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Bit-level I/O errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BitIoError {
    /// Attempted to read past the end of the source in strict mode
    #[error("unexpected end of bit stream")]
    UnexpectedEof,

    /// Invalid bit count (more than 64 bits in a single operation)
    #[error("invalid bit count: {0}")]
    InvalidBitCount(u32),

    /// Read or write issued on a stream that is not open
    #[error("stream is not open")]
    StreamClosed,
}

/// Position validity and tree precondition errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    /// The handle does not reference any node
    #[error("null position")]
    NullPosition,

    /// The handle was issued by a different tree instance
    #[error("position does not belong to this tree")]
    ForeignPosition,

    /// The node the handle referenced has since been removed
    #[error("position refers to a removed node")]
    StalePosition,

    /// The operation requires an external node
    #[error("position is not external")]
    NotExternal,

    /// The operation requires a node with a parent
    #[error("position has no parent")]
    NoParent,

    /// `add_root` called on a tree that already has a root
    #[error("tree already has a root")]
    RootExists,

    /// Splicing requires a non-empty subtree
    #[error("cannot splice an empty tree")]
    EmptyTree,
}

/// Tree reconstruction and symbol decoding errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// Decoding against a tree with no nodes
    #[error("code tree is empty")]
    EmptyTree,

    /// The source ended before the tree section was complete
    #[error("source ended inside the tree section after {nodes} nodes")]
    TruncatedTree { nodes: usize },

    /// The serialized tree nests deeper than the alphabet allows
    #[error("tree depth exceeds maximum {max_depth}")]
    TreeTooDeep { max_depth: usize },

    /// A lone root leaf that is not the sentinel would never consume input
    #[error("tree is a single leaf holding non-sentinel symbol {symbol}")]
    SingleLeafTree { symbol: u32 },

    /// A decoded symbol cannot be represented as a byte
    #[error("symbol {symbol} is outside the byte range")]
    SymbolOutOfRange { symbol: u32 },

    /// Strict decoding ran out of input before the end-of-message symbol
    #[error("source ended before the end-of-message symbol after {decoded} symbols")]
    MissingEndOfMessage { decoded: usize },

    /// A leaf value does not fit the alphabet's fixed-width field
    #[error("symbol {symbol} does not fit in {width} bits")]
    SymbolTooWide { symbol: u32, width: u32 },

    /// The end-of-message symbol appeared inside a message to encode
    #[error("end-of-message symbol {symbol} cannot appear inside a message")]
    SentinelInMessage { symbol: u32 },

    /// Encoding requested for a symbol that no leaf holds
    #[error("symbol {symbol} has no leaf in the code tree")]
    UnknownSymbol { symbol: u32 },

    /// Alphabet width or sentinel is not representable
    #[error("invalid alphabet: width {width}, sentinel {sentinel}")]
    InvalidAlphabet { width: u32, sentinel: u32 },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: Error = TreeError::NotExternal.into();
        assert!(matches!(err, Error::Tree(TreeError::NotExternal)));

        let err: Error = BitIoError::UnexpectedEof.into();
        assert_eq!(err.to_string(), "bit I/O error: unexpected end of bit stream");
    }

    #[test]
    fn test_codec_messages() {
        let err = CodecError::TreeTooDeep { max_depth: 512 };
        assert_eq!(err.to_string(), "tree depth exceeds maximum 512");
    }
}
