use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AirtableConfig;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("record source responded with {status}: {message}")]
    Http { status: u16, message: String },

    #[error("record source request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("record source returned malformed JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record source returned cursor {cursor} twice")]
    CursorLoop { cursor: String },
}

/// A raw row: the source's record id and its untyped field map.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub records: Vec<SourceRecord>,
    #[serde(default)]
    pub offset: Option<String>,
}

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetch one page of `table`, starting at `cursor` when given.
    async fn fetch_page(&self, table: &str, cursor: Option<&str>) -> Result<Page, SourceError>;
}

/// Follow page cursors until the source stops returning one.
pub async fn fetch_all_records(
    source: &dyn RecordSource,
    table: &str,
) -> Result<Vec<SourceRecord>, SourceError> {
    let mut records = Vec::new();
    let mut cursor: Option<String> = None;
    let mut seen = std::collections::HashSet::new();
    let mut page_number = 0usize;

    loop {
        let page = source.fetch_page(table, cursor.as_deref()).await?;
        page_number += 1;
        debug!(
            table,
            page = page_number,
            records = page.records.len(),
            has_next = page.offset.is_some(),
            "fetched page"
        );
        records.extend(page.records);

        match page.offset.filter(|next| !next.is_empty()) {
            Some(next) => {
                if !seen.insert(next.clone()) {
                    return Err(SourceError::CursorLoop { cursor: next });
                }
                cursor = Some(next);
            }
            None => break,
        }
    }

    info!(table, pages = page_number, records = records.len(), "fetched all records");
    Ok(records)
}

pub struct AirtableSource {
    config: AirtableConfig,
    client: Client,
}

impl AirtableSource {
    pub fn new(config: AirtableConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent("popcycle-metrics/0.1")
            .build()?;
        Ok(Self { config, client })
    }

    fn table_url(&self, table: &str) -> String {
        table_url(&self.config.api_base, &self.config.base_id, table)
    }
}

fn table_url(api_base: &str, base_id: &str, table: &str) -> String {
    // Table names such as "Talent Flow" carry spaces.
    format!(
        "{}/{}/{}",
        api_base.trim_end_matches('/'),
        base_id,
        table.replace(' ', "%20")
    )
}

#[async_trait]
impl RecordSource for AirtableSource {
    async fn fetch_page(&self, table: &str, cursor: Option<&str>) -> Result<Page, SourceError> {
        let mut query = vec![("pageSize", self.config.page_size.to_string())];
        if let Some(offset) = cursor {
            query.push(("offset", offset.to_string()));
        }

        let response = self
            .client
            .get(self.table_url(table))
            .bearer_auth(&self.config.api_key)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Columns that hold names or lists and must stay text even when they look numeric.
const TEXT_COLUMNS: [&str; 4] = ["id", "company", "parent-co", "children"];

/// Reads an exported table from a CSV file whose headers use the source field names.
/// The whole file is served as one page; `table` is ignored.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait]
impl RecordSource for CsvSource {
    async fn fetch_page(&self, _table: &str, _cursor: Option<&str>) -> Result<Page, SourceError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let headers = reader.headers()?.clone();
        let mut records = Vec::new();

        for (row_index, result) in reader.records().enumerate() {
            let row = result?;
            let mut fields = Map::new();
            for (header, cell) in headers.iter().zip(row.iter()) {
                let cell = cell.trim();
                if cell.is_empty() {
                    continue;
                }
                let header = header.trim();
                if TEXT_COLUMNS.contains(&header) {
                    fields.insert(header.to_string(), Value::String(cell.to_string()));
                    continue;
                }
                let value = match cell.parse::<f64>() {
                    Ok(number) => serde_json::Number::from_f64(number)
                        .map(Value::Number)
                        .unwrap_or(Value::Null),
                    Err(_) => Value::String(cell.to_string()),
                };
                fields.insert(header.to_string(), value);
            }
            records.push(SourceRecord {
                id: fields
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("row-{}", row_index + 1)),
                fields,
            });
        }

        Ok(Page {
            records,
            offset: None,
        })
    }
}
