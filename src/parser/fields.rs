use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Brazilian EAN barcodes: 78 followed by 11-12 digits, as a whole token.
static BARCODE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(78\d{11,12})\b").unwrap());

/// Table-row labels whose values carry one sub-entry per packaging variant.
pub const LABEL_DOSE: &str = "Dose";
pub const LABEL_QUANTITY: &str = "Quantidade na embalagem";
pub const LABEL_PRICE: &str = "Preço Máximo ao Consumidor/SP";
pub const LABEL_FORM: &str = "Forma Farmacêutica";

/// Variant-aligned field sequences for one page, split out of the row map.
#[derive(Debug, Default)]
pub struct PageFields {
    pub doses: Vec<String>,
    pub quantities: Vec<String>,
    pub prices: Vec<String>,
    pub infos: Vec<String>,
}

/// Scan raw page text for barcodes, in order of appearance, deduplicated
/// keeping the first occurrence. The scan is page-wide, not table-scoped.
pub fn extract_barcodes(page_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    BARCODE_RE
        .captures_iter(page_text)
        .map(|c| c[1].to_string())
        .filter(|code| seen.insert(code.clone()))
        .collect()
}

/// Split each row text on its first newline or tab into label and value,
/// trimming both. Rows that don't split into exactly two parts are dropped.
/// Duplicate labels overwrite earlier ones (last wins).
pub fn parse_rows(row_texts: &[String]) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for row in row_texts {
        let mut parts = row.splitn(2, ['\n', '\t']);
        if let (Some(label), Some(value)) = (parts.next(), parts.next()) {
            fields.insert(label.trim().to_string(), value.trim().to_string());
        }
    }
    fields
}

/// Pull the four recognized labels out of the row map and split each value on
/// every newline/tab boundary into per-variant sub-values. Absent labels give
/// empty sequences.
pub fn split_fields(fields: &HashMap<String, String>) -> PageFields {
    PageFields {
        doses: split_values(fields, LABEL_DOSE),
        quantities: split_values(fields, LABEL_QUANTITY),
        prices: split_values(fields, LABEL_PRICE),
        infos: split_values(fields, LABEL_FORM),
    }
}

fn split_values(fields: &HashMap<String, String>, label: &str) -> Vec<String> {
    fields
        .get(label)
        .map(|value| value.split(['\n', '\t']).map(str::to_string).collect())
        .unwrap_or_default()
}

// ── Tests ──
