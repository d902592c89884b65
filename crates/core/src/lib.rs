//! treecode-core: decoding of self-describing prefix-coded files
//!
//! A treecode file carries its own code tree: a preorder bit-serialization of
//! a binary tree whose leaves hold fixed-width symbols, followed by a message
//! written as root-to-leaf paths through that tree.
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `bitio`: Bit-granular output and input streams
//! - `tree`: Linked binary tree with validated position handles
//! - `codec`: Tree reconstruction, symbol decoding and the matching writer
//! - `dot`: Graphviz rendering of a tree
//! - `metrics`: Observable decode behavior
//!
//! # Design Principles
//!
//! - **No panics**: Invalid positions and malformed input are structured errors
//! - **Single ownership**: Tree nodes live in an arena; parent links are indices
//! - **Bounded work**: Output streams cap their size and tree depth is limited

pub mod bitio;
pub mod codec;
pub mod dot;
pub mod error;
pub mod metrics;
pub mod tree;

// Re-export commonly used types
pub use bitio::{BitInputStream, BitOutputStream, ReadMode};
pub use codec::{Alphabet, CodeTree, DecodeOptions, DecodedFile, DecodedMessage};
pub use error::{Error, Result};
pub use tree::{LinkedBinaryTree, Position};
