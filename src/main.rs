//! Deterministic loss validation CLI
//!
//! Generates the Oasis input files from `location.csv` and `account.csv` in the
//! input directory, applies a loss of `--loss-factor` x TIV to every item and
//! compares ground-up with insured losses.
//! Supports JSON output via the --json flag.
//! Accepts config via environment variables:
//!   DETLOSS_KTOOLS_DIR, DETLOSS_XSLT_PROCESSOR, DETLOSS_TRANSFORM, DETLOSS_PROFILES_DIR

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use deterministic_loss::{
    canonicalizer_for, generate_oasis_files, write_comparison, Config, InputLayout, Ktools,
    LossApplicator, LossComparison, Profiles,
};

const LOSSES_FILE: &str = "losses.csv";

#[derive(Parser, Debug)]
#[command(version, about = "Run a deterministic loss through the Oasis financial module")]
struct Args {
    /// Directory for the loss comparison output
    #[arg(short, long)]
    output_dir: PathBuf,

    /// Directory with the source files and mapping files; generated files are written here too
    #[arg(short, long)]
    input_dir: PathBuf,

    /// Loss applied to every item as a fraction of its TIV
    #[arg(short, long, default_value_t = 1.0)]
    loss_factor: f64,

    /// Compute losses net of the insured losses
    #[arg(long)]
    net: bool,

    /// Print the comparison as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct LossResponse {
    loss_factor: f64,
    item_count: usize,
    output_count: usize,
    total_gul: f64,
    total_il: f64,
    losses: Vec<LossComparison>,
    execution_time_ms: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let start = Instant::now();

    let config = Config::from_env();
    let profiles = match &config.profiles_dir {
        Some(dir) => Profiles::from_json_dir(dir)
            .with_context(|| format!("loading profiles from {}", dir.display()))?,
        None => Profiles::default_oed(),
    };

    let layout = InputLayout::new(&args.input_dir);
    let canonicalizer = canonicalizer_for(&config);
    let files = generate_oasis_files(&layout, canonicalizer.as_ref(), &profiles)
        .with_context(|| format!("generating Oasis files in {}", layout.dir.display()))?;

    let losses = LossApplicator::new(Ktools::new(config.ktools_dir.clone()))
        .apply_fm(&layout.dir, &files.xref_descriptions, args.loss_factor, args.net)
        .context("applying deterministic losses")?;

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;
    let losses_path = args.output_dir.join(LOSSES_FILE);
    write_comparison(&losses, &losses_path)
        .with_context(|| format!("writing {}", losses_path.display()))?;

    let total_gul: f64 = losses.iter().map(|l| l.loss_gul).sum();
    let total_il: f64 = losses.iter().map(|l| l.loss_il).sum();

    if args.json {
        let response = LossResponse {
            loss_factor: args.loss_factor,
            item_count: files.gul_items.len(),
            output_count: losses.len(),
            total_gul,
            total_il,
            losses,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    println!("Deterministic Loss Validation");
    println!("=============================\n");
    println!("Input:       {}", layout.dir.display());
    println!("Loss factor: {}", args.loss_factor);
    println!("Items:       {}", files.gul_items.len());
    println!("Outputs:     {}", losses.len());
    println!();

    println!(
        "{:>7} {:>5} {:<12} {:<12} {:<12} {:>4} {:>14} {:>14} {:>14}",
        "xref_id", "layer", "accnumber", "polnumber", "locnumber", "cov", "tiv", "loss_gul", "loss_il"
    );
    for row in &losses {
        println!(
            "{:>7} {:>5} {:<12} {:<12} {:<12} {:>4} {:>14.2} {:>14.2} {:>14.2}",
            row.xref_id,
            row.layer_id,
            row.accnumber,
            row.polnumber,
            row.locnumber,
            row.coverage_type_id,
            row.tiv,
            row.loss_gul,
            row.loss_il
        );
    }

    println!("\nSummary:");
    println!("  Total GUL: {:.2}", total_gul);
    println!("  Total IL:  {:.2}", total_il);
    println!("\nFull results written to: {}", losses_path.display());
    println!("Completed in {:.2?}", start.elapsed());

    Ok(())
}
