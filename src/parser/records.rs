use serde::{Deserialize, Serialize};

use super::fields::PageFields;

/// One output row: one packaging variant of one medication, keyed by barcode.
/// Serialized field names are the CSV headers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Quantidade na embalagem")]
    pub quantity: String,
    #[serde(rename = "Dose")]
    pub dose: String,
    #[serde(rename = "Preço")]
    pub price: String,
    #[serde(rename = "Codigos de Barras")]
    pub barcode: String,
    #[serde(rename = "Infos")]
    pub infos: String,
}

const ERROR_MARKER: &str = "Error";

impl MedicationRecord {
    /// True for the marker row emitted when a medication failed outright.
    pub fn is_error(&self) -> bool {
        self.name == ERROR_MARKER && self.barcode == ERROR_MARKER
    }
}

/// Fan one page out into records: one per barcode, or a single record with an
/// empty barcode when none were found, so every medication shows up at least
/// once. Field sequences are aligned to barcodes by index only: the site lists
/// one barcode per packaging variant with sub-values in the same order, and
/// that layout convention is trusted, not verified. Indices past the end of a
/// sequence yield empty strings.
pub fn expand(name: &str, fields: &PageFields, barcodes: &[String]) -> Vec<MedicationRecord> {
    let rows = if barcodes.is_empty() { 1 } else { barcodes.len() };

    (0..rows)
        .map(|j| MedicationRecord {
            name: name.to_string(),
            quantity: nth(&fields.quantities, j),
            dose: nth(&fields.doses, j),
            price: nth(&fields.prices, j),
            barcode: nth(barcodes, j),
            infos: nth(&fields.infos, j),
        })
        .collect()
}

/// The single row emitted when a medication's page couldn't be fetched or
/// parsed: every field carries the error marker, the name included.
pub fn error_record() -> MedicationRecord {
    MedicationRecord {
        name: ERROR_MARKER.to_string(),
        quantity: ERROR_MARKER.to_string(),
        dose: ERROR_MARKER.to_string(),
        price: ERROR_MARKER.to_string(),
        barcode: ERROR_MARKER.to_string(),
        infos: ERROR_MARKER.to_string(),
    }
}

fn nth(values: &[String], j: usize) -> String {
    values.get(j).cloned().unwrap_or_default()
}

// ── Tests ──
