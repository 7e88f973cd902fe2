mod catalog;
mod discover;
mod fetch;
mod output;
mod parser;
mod worker;

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

const CATALOG_PATH: &str = "medicamentos.csv";
const PARTITION_DIR: &str = "medications_by_letter";
const FINAL_PATH: &str = "medications_details_complete.csv";

#[derive(Parser)]
#[command(name = "remedios_scraper", about = "Consulta Remédios medication scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the letter index pages and build the medication catalog
    Catalog,
    /// Scrape every catalog page, one worker per letter, and merge the results
    Details {
        /// Max catalog entries to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Re-merge existing partition files into the master CSV
    Merge,
    /// Row and error counts over the master CSV
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Catalog => {
            let entries = discover::crawl_catalog().await?;
            discover::write_catalog(Path::new(CATALOG_PATH), &entries)?;
            println!("Saved {} medications to {}", entries.len(), CATALOG_PATH);
            Ok(())
        }
        Commands::Details { limit } => run_details(limit).await,
        Commands::Merge => {
            let keys = catalog_keys()?;
            let merged = output::merge_partitions(
                Path::new(PARTITION_DIR),
                &keys,
                Path::new(FINAL_PATH),
            )?;
            println!("Merged {} records into {}", merged, FINAL_PATH);
            Ok(())
        }
        Commands::Stats => run_stats(),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// The full pipeline: load the catalog (the only fatal input), fan out one
/// worker per letter, merge whatever completed. Soft failures (unreachable
/// medications, dead partitions) still exit 0.
async fn run_details(limit: Option<usize>) -> Result<()> {
    let mut entries = catalog::load_catalog(Path::new(CATALOG_PATH))?;
    if let Some(n) = limit {
        entries.truncate(n);
    }
    if entries.is_empty() {
        println!("Catalog is empty. Run 'catalog' first.");
        return Ok(());
    }

    let partitions = catalog::partition_by_letter(entries);
    let keys: Vec<String> = partitions.keys().cloned().collect();
    let total: usize = partitions.values().map(Vec::len).sum();
    println!(
        "Scraping {} medications across {} letter partitions...",
        total,
        partitions.len()
    );

    let outcomes = worker::run_all(partitions, Path::new(PARTITION_DIR)).await?;
    let records: usize = outcomes.iter().map(|o| o.records).sum();
    let errors: usize = outcomes.iter().map(|o| o.errors).sum();
    println!(
        "Scraped {} records ({} errors) in {}/{} partitions.",
        records,
        errors,
        outcomes.len(),
        keys.len()
    );

    let merged =
        output::merge_partitions(Path::new(PARTITION_DIR), &keys, Path::new(FINAL_PATH))?;
    println!("Master file created: {} ({} records)", FINAL_PATH, merged);
    Ok(())
}

fn run_stats() -> Result<()> {
    let mut reader = csv::Reader::from_path(FINAL_PATH)
        .with_context(|| format!("Failed to open {} (run 'details' first)", FINAL_PATH))?;

    let mut total = 0usize;
    let mut errors = 0usize;
    let mut with_barcode = 0usize;
    let mut medications: HashSet<String> = HashSet::new();

    for row in reader.deserialize() {
        let record: parser::records::MedicationRecord = row?;
        total += 1;
        if record.is_error() {
            errors += 1;
        } else {
            medications.insert(record.name.clone());
            if !record.barcode.is_empty() {
                with_barcode += 1;
            }
        }
    }

    println!("Records:      {}", total);
    println!("Medications:  {}", medications.len());
    println!("With barcode: {}", with_barcode);
    println!("Errors:       {}", errors);
    Ok(())
}

/// Partition keys the catalog would produce, for the standalone merge.
fn catalog_keys() -> Result<Vec<String>> {
    let entries = catalog::load_catalog(Path::new(CATALOG_PATH))?;
    Ok(catalog::partition_by_letter(entries).into_keys().collect())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
