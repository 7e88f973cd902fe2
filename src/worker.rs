use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use crate::catalog::CatalogEntry;
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::output;
use crate::parser;
use crate::parser::records::{error_record, MedicationRecord};

/// What a partition worker reports back after writing its CSV.
pub struct PartitionOutcome {
    pub key: String,
    pub records: usize,
    pub errors: usize,
}

/// Process one partition's entries in catalog order against one fetcher.
/// A failed fetch contributes a single error-marker record and the loop moves
/// on; nothing short of the task dying aborts the partition.
pub async fn run_partition<F: PageFetcher>(
    key: &str,
    entries: &[CatalogEntry],
    fetcher: &F,
) -> Vec<MedicationRecord> {
    let mut result = Vec::new();

    for (i, entry) in entries.iter().enumerate() {
        info!("[{}] Processing {}/{}: {}", key, i + 1, entries.len(), entry.name);

        match fetcher.fetch(&entry.url).await {
            Ok(page) => {
                let records = parser::process_page(&entry.name, &page);
                info!("[{}]   {} record(s)", key, records.len());
                result.extend(records);
            }
            Err(e) => {
                warn!("[{}]   {} failed: {:#}", key, entry.name, e);
                result.push(error_record());
            }
        }
    }

    result
}

/// Launch one worker task per partition and block until all have finished.
/// Each task builds its own HTTP client, holds it for the task's lifetime, and
/// owns its accumulator exclusively, so there is nothing to lock. Workers are
/// not retried: a task that fails or panics just leaves its partition out of
/// the outcomes (and out of the merge).
pub async fn run_all(
    partitions: BTreeMap<String, Vec<CatalogEntry>>,
    out_dir: &Path,
) -> Result<Vec<PartitionOutcome>> {
    let mut handles = Vec::new();

    for (key, entries) in partitions {
        let out_dir = out_dir.to_path_buf();
        handles.push(tokio::spawn(async move {
            let fetcher = HttpFetcher::new()?;
            let records = run_partition(&key, &entries, &fetcher).await;
            let errors = records.iter().filter(|r| r.is_error()).count();
            output::write_partition(&out_dir, &key, &records)?;
            Ok::<_, anyhow::Error>(PartitionOutcome {
                key,
                records: records.len(),
                errors,
            })
        }));
    }

    let mut outcomes = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(outcome)) => {
                info!(
                    "[{}] Done: {} records ({} errors)",
                    outcome.key, outcome.records, outcome.errors
                );
                outcomes.push(outcome);
            }
            Ok(Err(e)) => warn!("Partition worker failed: {:#}", e),
            Err(e) => warn!("Partition worker panicked: {}", e),
        }
    }

    Ok(outcomes)
}

// ── Tests ──
