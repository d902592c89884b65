//! Configuration for the treecode application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including randomized defaults that are reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments: without `--in` it generates a
//! sample file, decodes it and checks the result. All defaults can be printed
//! so runs are reproducible.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use treecode_core::{DecodeOptions, ReadMode};

/// Largest number of distinct symbols a generated sample may use
/// (the printable ASCII range).
pub const MAX_SAMPLE_SYMBOLS: usize = 95;

/// Complete configuration for a decode run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Files ===
    /// File to decode (None = generate a sample)
    pub input_file: Option<PathBuf>,

    /// Where a generated sample is written
    pub sample_file: PathBuf,

    /// Where to write a Graphviz rendering of the decoded tree
    pub dot_file: Option<PathBuf>,

    // === Sample generation ===
    /// Random seed for the sample
    pub seed: u64,

    /// Distinct symbols in the sample tree (sentinel excluded)
    pub sample_symbols: usize,

    /// Symbols in the sample message
    pub sample_length: usize,

    // === Decoding ===
    /// Alphabet and past-end behaviour
    pub decode: DecodeOptions,

    // === Behavior ===
    /// Log verbosity (0 = warnings only)
    pub verbosity: u8,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print the metrics summary
    pub print_metrics: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no arguments are provided, sample parameters are randomized from a
    /// time-based seed. If --seed is provided, the run is fully deterministic.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut input_file: Option<PathBuf> = None;
        let mut sample_file: Option<PathBuf> = None;
        let mut dot_file: Option<PathBuf> = None;
        let mut seed: Option<u64> = None;
        let mut sample_symbols: Option<usize> = None;
        let mut sample_length: Option<usize> = None;
        let mut read_mode = ReadMode::Lenient;
        let mut verbosity = 0u8;
        let mut print_config = false;
        let mut print_metrics = true;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--in" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--in requires a path".to_string());
                    }
                    input_file = Some(PathBuf::from(&args[i]));
                }
                "--out" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--out requires a path".to_string());
                    }
                    sample_file = Some(PathBuf::from(&args[i]));
                }
                "--dot" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--dot requires a path".to_string());
                    }
                    dot_file = Some(PathBuf::from(&args[i]));
                }
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--symbols" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--symbols requires a number".to_string());
                    }
                    sample_symbols = Some(args[i].parse().map_err(|_| "invalid symbols")?);
                }
                "--length" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--length requires a number".to_string());
                    }
                    sample_length = Some(args[i].parse().map_err(|_| "invalid length")?);
                }
                "--strict" => {
                    read_mode = ReadMode::Strict;
                }
                "--verbose" | "-v" => {
                    verbosity = verbosity.saturating_add(1);
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                other if !other.starts_with('-') && input_file.is_none() => {
                    // A bare path is the file to decode
                    input_file = Some(PathBuf::from(other));
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        if let Some(symbols) = sample_symbols {
            if !(1..=MAX_SAMPLE_SYMBOLS).contains(&symbols) {
                return Err(format!(
                    "--symbols must be between 1 and {}",
                    MAX_SAMPLE_SYMBOLS
                ));
            }
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|t| t.as_millis() as u64)
                .unwrap_or(0)
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = Config {
            input_file,
            sample_file: sample_file.unwrap_or_else(|| PathBuf::from("./sample.tc")),
            dot_file,
            seed,
            sample_symbols: sample_symbols.unwrap_or_else(|| rng.gen_range(2..=40)),
            sample_length: sample_length.unwrap_or_else(|| rng.gen_range(16..=256)),
            decode: DecodeOptions {
                read_mode,
                ..DecodeOptions::default()
            },
            verbosity,
            print_config,
            print_metrics,
        };

        Ok(config)
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.input_file {
            Some(path) => println!("Input file: {}", path.display()),
            None => {
                println!("Input file: (generate sample)");
                println!("Sample file: {}", self.sample_file.display());
                println!("Seed: {}", self.seed);
                println!("Sample symbols: {}", self.sample_symbols);
                println!("Sample length: {}", self.sample_length);
            }
        }
        if let Some(path) = &self.dot_file {
            println!("Tree rendering: {}", path.display());
        }
        println!();
        println!("=== Decoding ===");
        println!("Symbol width: {} bits", self.decode.alphabet.symbol_width());
        println!("End of message: {}", self.decode.alphabet.sentinel());
        println!("Read mode: {:?}", self.decode.read_mode);
        println!();
    }
}

fn print_help() {
    println!("treecode: Decode files that carry their own prefix-code tree");
    println!();
    println!("USAGE:");
    println!("    treecode [OPTIONS] [FILE]");
    println!();
    println!("OPTIONS:");
    println!("    --in <PATH>             File to decode (default: generate a sample)");
    println!("    --out <PATH>            Where to write the sample (default: ./sample.tc)");
    println!("    --dot <PATH>            Write a Graphviz rendering of the decoded tree");
    println!();
    println!("    --seed <N>              Random seed for the sample");
    println!("    --symbols <N>           Distinct sample symbols, 1-95 (default: random 2-40)");
    println!("    --length <N>            Sample message length (default: random 16-256)");
    println!();
    println!("    --strict                Fail on truncated input instead of zero-filling");
    println!("    -v, --verbose           More log output (repeatable)");
    println!("    --print-config          Print resolved configuration");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    treecode                                 # Generate, decode and verify a sample");
    println!("    treecode --seed 42 --symbols 8           # Deterministic sample");
    println!("    treecode message.tc                      # Decode a file");
    println!("    treecode --in message.tc --dot tree.dot  # Decode and render the tree");
    println!();
}
