use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) remedios_scraper/0.1";

/// A fetched medication page: the raw HTML (barcodes are scanned page-wide,
/// markup included) plus the flattened text of each table row.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub text: String,
    pub rows: Vec<String>,
}

/// Navigation collaborator. Any failure means "this medication's data is
/// unavailable"; callers recover with an error-marker record.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RenderedPage>;
}

/// HTTP fetcher over a dedicated reqwest client. Each worker builds its own,
/// so connections are never shared across partitions. Requests carry a bounded
/// timeout; an expired wait surfaces as an ordinary fetch failure.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<RenderedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?
            .error_for_status()
            .with_context(|| format!("Bad status for {}", url))?;

        let html = response
            .text()
            .await
            .with_context(|| format!("Failed to read body of {}", url))?;

        let rows = table_rows(&html);
        Ok(RenderedPage { text: html, rows })
    }
}

/// Flatten each <tr> into one text block: cells joined by tab, text fragments
/// inside a cell joined by newline. This mirrors the rendered innerText shape
/// the field parser splits on.
fn table_rows(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let tr = Selector::parse("tr").unwrap();
    let cell = Selector::parse("td, th").unwrap();

    document
        .select(&tr)
        .map(|row| {
            row.select(&cell)
                .map(|c| {
                    c.text()
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .collect::<Vec<_>>()
                .join("\t")
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_flatten_cells_with_tabs() {
        let html = "<table><tr><th>Dose</th><td>500mg</td></tr></table>";
        assert_eq!(table_rows(html), vec!["Dose\t500mg"]);
    }

    #[test]
    fn fragments_within_a_cell_join_with_newlines() {
        let html = "<table><tr><th>Dose</th><td><p>500mg</p><p>200mg</p></td></tr></table>";
        assert_eq!(table_rows(html), vec!["Dose\t500mg\n200mg"]);
    }

    #[test]
    fn no_tables_means_no_rows() {
        assert!(table_rows("<html><body><p>nada</p></body></html>").is_empty());
    }
}
