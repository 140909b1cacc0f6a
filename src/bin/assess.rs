//! Command-line damage assessment.
//!
//! Loads the two ONNX models, runs the pipeline on one image, prints the
//! per-zone report and writes the annotated image next to it:
//!
//! ```bash
//! assess --image car.jpg \
//!     --parts-model models/car_parts.onnx \
//!     --damage-model models/car_damages.onnx \
//!     --output-dir results
//! ```

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use vehicle_damage::prelude::*;

#[derive(Parser)]
#[command(name = "assess")]
#[command(about = "Vehicle damage assessment from a photograph")]
struct Args {
    /// Path to the vehicle photograph to analyze
    #[arg(long)]
    image: PathBuf,

    /// Path to the part segmentation model (.onnx)
    #[arg(long, default_value = "models/car_parts_model.onnx")]
    parts_model: PathBuf,

    /// Path to the damage detection model (.onnx)
    #[arg(long, default_value = "models/car_damages_model.onnx")]
    damage_model: PathBuf,

    /// Directory the annotated image is written to
    #[arg(long, default_value = "results")]
    output_dir: PathBuf,

    /// Comma-separated class names of the parts model, in class-id order
    #[arg(
        long,
        value_delimiter = ',',
        default_value = "bumper,fender,door,hood,trunk,windshield,headlight,taillight,mirror,wheel"
    )]
    part_labels: Vec<String>,

    /// Comma-separated class names of the damage model, in class-id order
    #[arg(long, value_delimiter = ',', default_value = "dent,scratch,no damage")]
    damage_labels: Vec<String>,

    /// Optional JSON pipeline configuration overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = e.source();
            while let Some(inner) = source {
                error!("caused by: {inner}");
                source = inner.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match &args.config {
        Some(path) => AssessConfig::from_json_file(path)?,
        None => AssessConfig::default(),
    };

    let assessor = DamageAssessor::from_onnx(
        &args.parts_model,
        &args.damage_model,
        args.part_labels,
        args.damage_labels,
        config,
    )?;

    let (report, saved_path) = assessor.predict_and_visualize(&args.image, &args.output_dir)?;

    if report.is_empty() {
        println!("No relevant damage detected (or none could be localized).");
    } else {
        println!("DAMAGE ASSESSMENT REPORT");
        println!("{}", "=".repeat(30));
        for entry in &report.entries {
            println!("ZONE: {}", entry.part.to_uppercase());
            for damage in &entry.damages {
                println!(
                    "  - {} ({}, confidence {:.2})",
                    damage.label, damage.severity, damage.confidence
                );
            }
            println!("{}", "-".repeat(30));
        }
    }
    println!("Annotated image: {}", saved_path.display());

    Ok(())
}
