//! Metrics for a decode run.
//!
//! Captures how big the stored tree was, how much input was consumed and how
//! many symbols came out, plus wall-clock timing.
//!
//! # Thread Safety
//!
//! `DecodeMetrics` is a plain struct updated by the single decoding thread.

use std::time::{Duration, Instant};

use crate::codec::DecodedFile;

/// Counters and timing for one decoded file.
#[derive(Debug, Clone)]
pub struct DecodeMetrics {
    // === Timing ===
    /// When decoding started
    pub start_time: Instant,

    /// When decoding ended (set on completion)
    pub end_time: Option<Instant>,

    // === Input ===
    /// Bytes consumed from the input file
    pub input_bytes: u64,

    // === Tree ===
    /// Nodes in the reconstructed tree
    pub tree_nodes: u64,

    /// Leaves in the reconstructed tree
    pub tree_leaves: u64,

    /// Longest root-to-leaf path
    pub tree_depth: u64,

    // === Message ===
    /// Symbols decoded, sentinel excluded
    pub symbols_decoded: u64,

    /// Whether the end-of-message symbol was seen
    pub terminated: bool,
}

impl DecodeMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            input_bytes: 0,
            tree_nodes: 0,
            tree_leaves: 0,
            tree_depth: 0,
            symbols_decoded: 0,
            terminated: false,
        }
    }

    /// Fill in the counters from a decoded file.
    pub fn record(&mut self, decoded: &DecodedFile) {
        let tree = &decoded.tree;
        self.input_bytes = decoded.bytes_read;
        self.tree_nodes = tree.size() as u64;
        self.tree_leaves = 0;
        self.tree_depth = 0;
        for p in tree.preorder() {
            if tree.is_external(p).unwrap_or(false) {
                self.tree_leaves += 1;
                let depth = tree.depth(p).unwrap_or(0) as u64;
                self.tree_depth = self.tree_depth.max(depth);
            }
        }
        self.symbols_decoded = decoded.message.len() as u64;
        self.terminated = decoded.message.terminated;
    }

    /// Mark decoding as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Average input bits spent per decoded symbol, tree section included.
    ///
    /// Returns 0.0 if nothing was decoded.
    pub fn bits_per_symbol(&self) -> f64 {
        if self.symbols_decoded == 0 {
            0.0
        } else {
            (self.input_bytes * 8) as f64 / self.symbols_decoded as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Decode Summary ===");
        println!("Duration: {} ms", self.duration().as_millis());
        println!("Input: {} bytes", self.input_bytes);
        println!();

        println!("=== Tree ===");
        println!("Nodes: {}", self.tree_nodes);
        println!("Leaves: {}", self.tree_leaves);
        println!("Depth: {}", self.tree_depth);
        println!();

        println!("=== Message ===");
        println!("Symbols: {}", self.symbols_decoded);
        println!("Bits/symbol: {:.2}", self.bits_per_symbol());
        if self.terminated {
            println!("End of message: found ✓");
        } else {
            println!("End of message: missing ✗");
        }
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             input_bytes={}\n\
             tree_nodes={}\n\
             tree_leaves={}\n\
             tree_depth={}\n\
             symbols_decoded={}\n\
             bits_per_symbol={:.4}\n\
             terminated={}\n",
            self.duration().as_millis(),
            self.input_bytes,
            self.tree_nodes,
            self.tree_leaves,
            self.tree_depth,
            self.symbols_decoded,
            self.bits_per_symbol(),
            self.terminated,
        )
    }
}

impl Default for DecodeMetrics {
    fn default() -> Self {
        Self::new()
    }
}
