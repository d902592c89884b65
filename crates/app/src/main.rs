//! treecode: decode a file that carries its own prefix-code tree.
//!
//! With no input file, a seeded sample is generated, written, decoded and
//! checked against the message it was built from.

mod config;
mod input_gen;
mod logging;

use config::Config;
use treecode_core::codec::decode_file;
use treecode_core::dot;
use treecode_core::metrics::DecodeMetrics;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", treecode_core::Error::Config(e));
            eprintln!("Run with --help for usage information");
            std::process::exit(2);
        }
    };

    logging::init(config.verbosity);

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            log::error!("decode failed: {}", e);
            // A malformed file yields an empty result
            println!();
            std::process::exit(1);
        }
    }
}

/// Decode the configured file. Returns false when a generated sample does not
/// decode back to its own message.
fn run(config: &Config) -> treecode_core::Result<bool> {
    let (path, expected) = match &config.input_file {
        Some(path) => (path.clone(), None),
        None => {
            let sample = input_gen::write_sample_file(
                &config.sample_file,
                config.seed,
                config.sample_symbols,
                config.sample_length,
            )?;
            (config.sample_file.clone(), Some(sample.message))
        }
    };

    let mut metrics = DecodeMetrics::new();
    let decoded = decode_file(&path, &config.decode)?;
    metrics.record(&decoded);
    metrics.complete();

    if !decoded.message.terminated {
        log::warn!("{}: input ended before the end-of-message symbol", path.display());
    }

    if let Some(dot_path) = &config.dot_file {
        dot::write_dot_file(&decoded.tree, None, dot_path)?;
        log::info!("wrote tree rendering to {}", dot_path.display());
    }

    println!("{}", decoded.message.to_text()?);

    if config.print_metrics {
        metrics.print_summary();
    }

    match expected {
        Some(expected) if expected != decoded.message.symbols => {
            eprintln!("✗ Decoded sample differs from the generated message");
            Ok(false)
        }
        Some(_) => {
            println!("✓ Sample decoded and verified");
            Ok(true)
        }
        None => Ok(true),
    }
}
