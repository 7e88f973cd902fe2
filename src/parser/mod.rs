pub mod fields;
pub mod records;

use crate::fetch::RenderedPage;
use records::MedicationRecord;

/// Two-pass pipeline: page → barcode list + variant field sequences → records.
pub fn process_page(name: &str, page: &RenderedPage) -> Vec<MedicationRecord> {
    let barcodes = fields::extract_barcodes(&page.text);
    let row_map = fields::parse_rows(&page.rows);
    let page_fields = fields::split_fields(&row_map);
    records::expand(name, &page_fields, &barcodes)
}

// ── Tests ──
