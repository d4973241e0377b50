//! `tophat` — command-line interface for the Tophat inference tile.
//!
//! ```text
//! USAGE:
//!   tophat info                        Tile constants and feature map
//!   tophat encode [-o PATH]            Write the demo model image
//!   tophat predict -m PATH <8 bytes>   Predict one feature vector
//!   tophat demo                        Run the canonical fixture set
//! ```
//!
//! Every command drives the in-process engine simulation through the same
//! wire protocol a physical host would use.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tophat_chip::features::{FEATURE_COUNT, FEATURE_NAMES};
use tophat_chip::image::{INTERNAL_NODES, LEAF_COUNT, MODEL_IMAGE_BYTES, TREE_DEPTH};
use tophat_driver::{Engine, Link, ModelLoader, ModelProgram, Predictor};
use tophat_models::zoo::{box_office_tree, EXAMPLES};
use tophat_models::DecisionTree;

#[derive(Parser)]
#[command(name = "tophat", about = "Tophat decision-tree inference tile CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Print tile constants and the canonical feature map.
    Info,
    /// Encode the box-office demo tree to a model image file.
    Encode {
        /// Output path for the 36-byte image.
        #[arg(short, long, default_value = "golden_model.bin")]
        output: PathBuf,
    },
    /// Load a model image and predict one feature vector.
    Predict {
        /// Path to a 36-byte model image.
        #[arg(short, long)]
        model: PathBuf,
        /// Eight feature bytes in wire order.
        features: Vec<u8>,
    },
    /// Run the canonical fixture set end to end on the simulated tile.
    Demo,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Cmd::Info => cmd_info(),
        Cmd::Encode { output } => cmd_encode(&output),
        Cmd::Predict { model, features } => cmd_predict(&model, &features),
        Cmd::Demo => cmd_demo(),
    }
}

fn cmd_info() -> Result<()> {
    println!("Tophat decision-tree inference tile");
    println!();
    println!("  model image:    {MODEL_IMAGE_BYTES} bytes");
    println!("  internal nodes: {INTERNAL_NODES}");
    println!("  leaves:         {LEAF_COUNT}");
    println!("  tree depth:     {TREE_DEPTH}");
    println!("  feature vector: {FEATURE_COUNT} bytes");
    println!();
    println!("Feature map (wire order):");
    for (slot, name) in FEATURE_NAMES.iter().enumerate() {
        println!("  [{slot}] {name}");
    }
    Ok(())
}

fn cmd_encode(output: &PathBuf) -> Result<()> {
    let tree = box_office_tree()?;
    tree.to_file(output)
        .with_context(|| format!("writing {}", output.display()))?;

    let program = ModelProgram::from_image(&tree.encode());
    println!(
        "Wrote {} ({} bytes, checksum {:#010x})",
        output.display(),
        program.as_bytes().len(),
        program.checksum()
    );
    Ok(())
}

fn cmd_predict(model: &PathBuf, features: &[u8]) -> Result<()> {
    if features.len() != FEATURE_COUNT {
        bail!("expected {FEATURE_COUNT} feature bytes, got {}", features.len());
    }

    let tree = DecisionTree::from_file(model)
        .with_context(|| format!("loading {}", model.display()))?;
    let program = ModelProgram::from_image(&tree.encode());

    let mut link = Link::new(Engine::new());
    link.clear()?;
    ModelLoader::default().load(&program, &mut link)?;

    let prediction = Predictor::default().predict(features, &mut link)?;
    println!(
        "prediction: {} ({} cycles)",
        prediction.value,
        prediction.total_cycles()
    );
    Ok(())
}

fn cmd_demo() -> Result<()> {
    let tree = box_office_tree()?;
    let program = ModelProgram::from_image(&tree.encode());

    let mut link = Link::new(Engine::new());
    link.clear()?;
    ModelLoader::default().load(&program, &mut link)?;

    let predictor = Predictor::default();
    let mut failures = 0usize;

    println!("{:<28} {:>9} {:>9}", "case", "predicted", "expected");
    for case in &EXAMPLES {
        let prediction = predictor.predict(&case.features, &mut link)?;
        let mark = if prediction.value == case.expected {
            ' '
        } else {
            failures += 1;
            '!'
        };
        println!(
            "{:<28} {:>9} {:>9}{mark}",
            case.name, prediction.value, case.expected
        );
    }

    if failures > 0 {
        bail!("{failures} fixture(s) disagreed with the tile");
    }
    println!();
    println!("all {} fixtures passed in {} cycles", EXAMPLES.len(), link.cycles());
    Ok(())
}
