use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{info, warn};

const BASE_URL: &str = "https://consultaremedios.com.br";
const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static PAGINA_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?pagina=(\d+)").unwrap());

/// One discovered medication link from the letter index.
#[derive(Debug, Serialize)]
pub struct DiscoveredEntry {
    pub name: String,
    pub url: String,
    pub letter: char,
}

/// Walk every letter index page (and its `?pagina=N` pagination) and collect
/// the medication name→URL catalog. A letter that fails is logged and skipped;
/// discovery is best-effort.
pub async fn crawl_catalog() -> Result<Vec<DiscoveredEntry>> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;

    let pb = ProgressBar::new(ALPHABET.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} letters")?
            .progress_chars("=> "),
    );

    let mut medications = Vec::new();
    for letter in ALPHABET.chars() {
        match crawl_letter(&client, letter).await {
            Ok(found) => {
                info!("Letter {}: {} medications", letter, found.len());
                medications.extend(found);
            }
            Err(e) => warn!("Letter {} failed: {:#}", letter, e),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok(medications)
}

/// Write the discovered catalog as CSV (columns name, url, letter).
pub fn write_catalog(path: &Path, entries: &[DiscoveredEntry]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

async fn crawl_letter(client: &reqwest::Client, letter: char) -> Result<Vec<DiscoveredEntry>> {
    let index_url = format!("{}/medicamentos/{}", BASE_URL, letter);
    let html = get_page(client, &index_url).await?;

    let pages = page_count(&html).unwrap_or(1);
    let mut entries = extract_entries(&html, letter);

    for page in 2..=pages {
        let url = format!("{}?pagina={}", index_url, page);
        match get_page(client, &url).await {
            Ok(html) => entries.extend(extract_entries(&html, letter)),
            Err(e) => warn!("Letter {} page {} failed: {:#}", letter, page, e),
        }
    }

    Ok(entries)
}

async fn get_page(client: &reqwest::Client, url: &str) -> Result<String> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Request failed: {}", url))?
        .error_for_status()
        .with_context(|| format!("Bad status for {}", url))?
        .text()
        .await
        .with_context(|| format!("Failed to read body of {}", url))
}

/// The index's last pagination link carries the total page count in its
/// `?pagina=N` query.
fn page_count(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let link = Selector::parse(r#"a[aria-label="page link"]"#).unwrap();

    document
        .select(&link)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAGINA_RE.captures(href))
        .filter_map(|caps| caps[1].parse().ok())
        .max()
}

/// Medication links sit in the result grid; prefer the `title` attribute over
/// the link text, and resolve site-relative hrefs against the base URL.
fn extract_entries(html: &str, letter: char) -> Vec<DiscoveredEntry> {
    let document = Html::parse_document(html);
    let link = Selector::parse("ul.grid li a").unwrap();

    document
        .select(&link)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            let name = match a.value().attr("title") {
                Some(title) if !title.trim().is_empty() => title.trim().to_string(),
                _ => a.text().collect::<String>().trim().to_string(),
            };
            if name.is_empty() || href.is_empty() {
                return None;
            }
            let url = if href.starts_with('/') {
                format!("{}{}", BASE_URL, href)
            } else {
                href.to_string()
            };
            Some(DiscoveredEntry { name, url, letter })
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_takes_the_highest_pagina() {
        let html = r##"
            <nav>
              <a aria-label="page link" href="?pagina=2">2</a>
              <a aria-label="page link" href="?pagina=7">7</a>
            </nav>"##;
        assert_eq!(page_count(html), Some(7));
    }

    #[test]
    fn page_count_absent_without_pagination() {
        assert_eq!(page_count("<nav><a href='/x'>x</a></nav>"), None);
    }

    #[test]
    fn entries_come_from_the_result_grid() {
        let html = r##"
            <ul class="grid">
              <li><a href="/aspirina/p" title="Aspirina">ver</a></li>
              <li><a href="/dorflex/p">Dorflex</a></li>
              <li><a href="">vazio</a></li>
            </ul>"##;
        let entries = extract_entries(html, 'a');

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "Aspirina");
        assert_eq!(entries[0].url, "https://consultaremedios.com.br/aspirina/p");
        assert_eq!(entries[1].name, "Dorflex");
    }
}
