use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One medication entry from the catalog CSV: display name + detail page URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub url: String,
}

/// Load the catalog CSV (columns `name`, `url`; extra columns ignored).
/// A missing or malformed file is fatal; nothing useful can run without it.
pub fn load_catalog(path: &Path) -> Result<Vec<CatalogEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open catalog {}", path.display()))?;

    let mut entries = Vec::new();
    for row in reader.deserialize() {
        let entry: CatalogEntry =
            row.with_context(|| format!("Malformed catalog row in {}", path.display()))?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Partition key: uppercased first character of the name, or "OTHER" when the
/// name is empty or starts with a non-alphabetic character.
pub fn partition_key(name: &str) -> String {
    match name.chars().next() {
        Some(c) if c.is_alphabetic() => c.to_uppercase().collect(),
        _ => "OTHER".to_string(),
    }
}

/// Group catalog entries by partition key, preserving catalog order within each
/// group. Every entry lands in exactly one partition; the BTreeMap keeps keys
/// sorted for the scheduler and the final merge.
pub fn partition_by_letter(entries: Vec<CatalogEntry>) -> BTreeMap<String, Vec<CatalogEntry>> {
    let mut partitions: BTreeMap<String, Vec<CatalogEntry>> = BTreeMap::new();
    for entry in entries {
        partitions
            .entry(partition_key(&entry.name))
            .or_default()
            .push(entry);
    }
    partitions
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            url: format!("https://example.com/{}", name),
        }
    }

    #[test]
    fn key_uppercases_first_letter() {
        assert_eq!(partition_key("aspirina"), "A");
        assert_eq!(partition_key("Dipirona"), "D");
    }

    #[test]
    fn key_falls_back_to_other() {
        assert_eq!(partition_key(""), "OTHER");
        assert_eq!(partition_key("7 Quedas"), "OTHER");
        assert_eq!(partition_key("-algo"), "OTHER");
    }

    #[test]
    fn key_handles_accented_names() {
        assert_eq!(partition_key("água"), "Á");
    }

    #[test]
    fn every_entry_in_exactly_one_partition() {
        let entries = vec![
            entry("Aspirina"),
            entry("amoxicilina"),
            entry("Dipirona"),
            entry("3TC"),
            entry(""),
        ];
        let total = entries.len();
        let partitions = partition_by_letter(entries);

        let keys: Vec<&String> = partitions.keys().collect();
        assert_eq!(keys, vec!["A", "D", "OTHER"]);
        assert_eq!(partitions.values().map(Vec::len).sum::<usize>(), total);
        assert_eq!(partitions["A"].len(), 2);
        assert_eq!(partitions["OTHER"].len(), 2);
    }

    #[test]
    fn partition_preserves_catalog_order() {
        let partitions =
            partition_by_letter(vec![entry("Beta"), entry("Bravo"), entry("banana")]);
        let names: Vec<&str> = partitions["B"].iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Beta", "Bravo", "banana"]);
    }
}
