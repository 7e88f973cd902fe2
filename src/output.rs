use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::parser::records::MedicationRecord;

/// Path of a partition's intermediate CSV under the partition directory.
pub fn partition_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("medications_{}.csv", key))
}

/// Write one partition's records to its own CSV, created after the worker
/// finishes its whole partition.
pub fn write_partition(dir: &Path, key: &str, records: &[MedicationRecord]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;

    let path = partition_path(dir, key);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("[{}] Saved {} records to {}", key, records.len(), path.display());
    Ok(())
}

/// Concatenate the partition CSVs into the master file, visiting keys in the
/// given (sorted) order. Partitions whose file never appeared, because their
/// worker died before finishing, are skipped without raising an error.
pub fn merge_partitions(dir: &Path, keys: &[String], final_path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(final_path)
        .with_context(|| format!("Failed to create {}", final_path.display()))?;

    let mut total = 0;
    for key in keys {
        let path = partition_path(dir, key);
        if !path.exists() {
            warn!("[{}] No partition file, skipping", key);
            continue;
        }

        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        for row in reader.deserialize() {
            let record: MedicationRecord =
                row.with_context(|| format!("Malformed row in {}", path.display()))?;
            writer.serialize(&record)?;
            total += 1;
        }
    }

    writer.flush()?;
    Ok(total)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::records::error_record;

    fn record(name: &str, barcode: &str) -> MedicationRecord {
        MedicationRecord {
            name: name.to_string(),
            quantity: "10".to_string(),
            dose: "500mg".to_string(),
            price: String::new(),
            barcode: barcode.to_string(),
            infos: String::new(),
        }
    }

    #[test]
    fn partition_round_trips_through_csv() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![record("Aspirina", "7891234567890"), error_record()];
        write_partition(dir.path(), "A", &records).unwrap();

        let mut reader = csv::Reader::from_path(partition_path(dir.path(), "A")).unwrap();
        let read: Vec<MedicationRecord> =
            reader.deserialize().collect::<Result<_, _>>().unwrap();
        assert_eq!(read, records);
    }

    #[test]
    fn partition_headers_use_site_column_names() {
        let dir = tempfile::tempdir().unwrap();
        write_partition(dir.path(), "A", &[record("Aspirina", "7891234567890")]).unwrap();

        let content = fs::read_to_string(partition_path(dir.path(), "A")).unwrap();
        let header = content.lines().next().unwrap();
        assert_eq!(
            header,
            "Name,Quantidade na embalagem,Dose,Preço,Codigos de Barras,Infos"
        );
    }

    #[test]
    fn merge_skips_missing_partitions_silently() {
        let dir = tempfile::tempdir().unwrap();
        // A completed with 2 rows, B with 0, C with 1; D's worker never finished.
        write_partition(dir.path(), "A", &[record("Aas", "7891234567890"), record("Abc", "")])
            .unwrap();
        write_partition(dir.path(), "B", &[]).unwrap();
        write_partition(dir.path(), "C", &[record("Cetoprofeno", "7891234567899")]).unwrap();

        let keys: Vec<String> =
            ["A", "B", "C", "D"].iter().map(|k| k.to_string()).collect();
        let final_path = dir.path().join("merged.csv");
        let total = merge_partitions(dir.path(), &keys, &final_path).unwrap();
        assert_eq!(total, 3);

        let mut reader = csv::Reader::from_path(&final_path).unwrap();
        let names: Vec<String> = reader
            .deserialize::<MedicationRecord>()
            .map(|r| r.unwrap().name)
            .collect();
        assert_eq!(names, vec!["Aas", "Abc", "Cetoprofeno"]);
    }
}
