use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{SheetColumn, VideoRecord},
    error::DataSourceError,
};
use tracing::{debug, warn};
use url::Url;

pub mod table;

pub use table::{Metrics, PageRow, TablePage, TableQuery, VideoTable, ALL_STATUSES};

pub const DEFAULT_SHEET_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait SheetSource: Send + Sync {
    async fn fetch(&self, share_url: &str) -> Result<VideoTable, DataSourceError>;
}

/// Fetches a published spreadsheet as CSV over HTTP.
#[derive(Clone)]
pub struct HttpSheetSource {
    client: Client,
    timeout: Duration,
}

impl HttpSheetSource {
    pub fn new(timeout: Duration) -> Self {
        Self::with_client(Client::new(), timeout)
    }

    pub fn with_client(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    fn map_transport(&self, err: reqwest::Error) -> DataSourceError {
        if err.is_timeout() {
            DataSourceError::Timeout {
                after: self.timeout,
            }
        } else {
            DataSourceError::Unreachable(err.to_string())
        }
    }
}

impl Default for HttpSheetSource {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET_TIMEOUT)
    }
}

#[async_trait]
impl SheetSource for HttpSheetSource {
    async fn fetch(&self, share_url: &str) -> Result<VideoTable, DataSourceError> {
        let csv_url = export_url(share_url)?;
        debug!(%csv_url, "fetching sheet export");

        let response = self
            .client
            .get(&csv_url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        let status = response.status();
        if !status.is_success() {
            warn!(%csv_url, status = status.as_u16(), "sheet export request failed");
            return Err(DataSourceError::Status {
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(|e| self.map_transport(e))?;
        parse_csv(&body)
    }
}

/// Rewrites a spreadsheet share link into its CSV export link.
///
/// Everything up to and including the `/d/<id>` segment pair is kept, then
/// `/export?format=csv` is appended. Links without a `/d/<id>` pair are
/// returned unchanged so direct CSV URLs keep working.
pub fn export_url(share_url: &str) -> Result<String, DataSourceError> {
    let trimmed = share_url.trim();
    let parsed = Url::parse(trimmed).map_err(|e| DataSourceError::InvalidUrl {
        url: trimmed.to_string(),
        reason: e.to_string(),
    })?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|segments| segments.collect())
        .unwrap_or_default();
    let id_index = segments
        .iter()
        .position(|segment| *segment == "d")
        .map(|d_index| d_index + 1)
        .filter(|id_index| segments.get(*id_index).is_some_and(|id| !id.is_empty()));

    let Some(id_index) = id_index else {
        if is_spreadsheet_link(&parsed) {
            return Err(DataSourceError::MissingSheetId {
                url: trimmed.to_string(),
            });
        }
        return Ok(trimmed.to_string());
    };

    let mut export = parsed.clone();
    export.set_path(&format!("/{}/export", segments[..=id_index].join("/")));
    export.set_query(Some("format=csv"));
    export.set_fragment(None);
    Ok(export.to_string())
}

fn is_spreadsheet_link(url: &Url) -> bool {
    url.host_str() == Some("docs.google.com") && url.path().starts_with("/spreadsheets")
}

/// Parses CSV with a header row into video records.
///
/// Columns are matched by trimmed header name; unknown columns are ignored and
/// absent ones are reported on the returned table.
pub fn parse_csv(bytes: &[u8]) -> Result<VideoTable, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| DataSourceError::Malformed(e.to_string()))?
        .clone();
    let mapping: Vec<Option<SheetColumn>> = headers
        .iter()
        .map(|header| SheetColumn::from_header(header.trim_start_matches('\u{feff}')))
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DataSourceError::Malformed(e.to_string()))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let mut row = VideoRecord::default();
        for (cell, column) in record.iter().zip(&mapping) {
            if let Some(column) = column {
                row.set(*column, Some(cell.to_string()).filter(|v| !v.is_empty()));
            }
        }
        rows.push(row);
    }

    let missing_columns = SheetColumn::ALL
        .into_iter()
        .filter(|column| !mapping.contains(&Some(*column)))
        .collect();
    Ok(VideoTable::new(rows, missing_columns))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
