use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use shared::{
    domain::{SheetColumn, StatusBucket, VideoRecord},
    error::RenderInputError,
};

/// Status filter value that disables status filtering.
pub const ALL_STATUSES: &str = "All";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTable {
    rows: Vec<VideoRecord>,
    missing_columns: Vec<SheetColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    /// 1-based; clamped into range by [`VideoTable::query`].
    pub page: usize,
    pub page_size: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            page: 1,
            page_size: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metrics {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub with_video: usize,
}

impl Metrics {
    pub fn from_rows<'a>(rows: impl IntoIterator<Item = &'a VideoRecord>) -> Self {
        let mut metrics = Metrics::default();
        for row in rows {
            metrics.total += 1;
            match row.status().bucket() {
                StatusBucket::Done => metrics.completed += 1,
                StatusBucket::InProgress => metrics.in_progress += 1,
                StatusBucket::Pending => metrics.pending += 1,
            }
            if row.video_url().is_some() {
                metrics.with_video += 1;
            }
        }
        metrics
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRow {
    /// 1-based position within the sorted, filtered view.
    pub item_number: usize,
    pub record: VideoRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePage {
    pub rows: Vec<PageRow>,
    pub page: usize,
    pub total_pages: usize,
    pub page_size: usize,
    pub total_rows: usize,
    pub matching_rows: usize,
    pub metrics: Metrics,
}

impl TablePage {
    pub fn is_filtered(&self) -> bool {
        self.matching_rows != self.total_rows
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

impl VideoTable {
    pub fn new(rows: Vec<VideoRecord>, missing_columns: Vec<SheetColumn>) -> Self {
        Self {
            rows,
            missing_columns,
        }
    }

    /// Table with every expected column present.
    pub fn from_rows(rows: Vec<VideoRecord>) -> Self {
        Self::new(rows, Vec::new())
    }

    pub fn rows(&self) -> &[VideoRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: SheetColumn) -> bool {
        !self.missing_columns.contains(&column)
    }

    pub fn render_input_error(&self) -> Option<RenderInputError> {
        if self.missing_columns.is_empty() {
            return None;
        }
        Some(RenderInputError::MissingColumns(
            self.missing_columns
                .iter()
                .map(|column| column.header().to_string())
                .collect(),
        ))
    }

    /// Distinct non-empty status values in first-seen order, preceded by "All".
    /// Values differing only in case collapse to the first spelling, since the
    /// status filter ignores case.
    pub fn status_options(&self) -> Vec<String> {
        let mut options = vec![ALL_STATUSES.to_string()];
        if !self.has_column(SheetColumn::Production) {
            return options;
        }
        for row in &self.rows {
            let Some(value) = row.production.as_deref().map(str::trim) else {
                continue;
            };
            if !value.is_empty() && !options.iter().any(|seen| seen.eq_ignore_ascii_case(value)) {
                options.push(value.to_string());
            }
        }
        options
    }

    pub fn filter<'a>(&'a self, status: Option<&str>, search: Option<&str>) -> Vec<&'a VideoRecord> {
        let status = status
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case(ALL_STATUSES))
            .filter(|_| self.has_column(SheetColumn::Production));
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        self.rows
            .iter()
            .filter(|row| status.map_or(true, |status| row.status().matches(status)))
            .filter(|row| {
                needle.as_deref().map_or(true, |needle| {
                    contains_ignore_case(row.idea.as_deref(), needle)
                        || contains_ignore_case(row.caption.as_deref(), needle)
                })
            })
            .collect()
    }

    pub fn query(&self, query: &TableQuery) -> TablePage {
        let mut matching = self.filter(query.status.as_deref(), query.search.as_deref());
        if self.has_column(SheetColumn::Id) {
            sort_by_id_desc(&mut matching);
        }

        let page_size = query.page_size.max(1);
        let total_pages = matching.len().div_ceil(page_size).max(1);
        let page = query.page.clamp(1, total_pages);
        let start = (page - 1) * page_size;

        let rows = matching
            .iter()
            .enumerate()
            .skip(start)
            .take(page_size)
            .map(|(index, record)| PageRow {
                item_number: index + 1,
                record: (*record).clone(),
            })
            .collect();

        TablePage {
            rows,
            page,
            total_pages,
            page_size,
            total_rows: self.rows.len(),
            matching_rows: matching.len(),
            metrics: Metrics::from_rows(matching.iter().copied()),
        }
    }
}

fn contains_ignore_case(haystack: Option<&str>, lowered_needle: &str) -> bool {
    haystack.is_some_and(|value| value.to_lowercase().contains(lowered_needle))
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum IdKey<'a> {
    Missing,
    Text(&'a str),
    Number(i64),
}

fn id_key(record: &VideoRecord) -> IdKey<'_> {
    match (record.numeric_id(), record.id.as_deref()) {
        (Some(number), _) => IdKey::Number(number),
        (None, Some(text)) => IdKey::Text(text),
        (None, None) => IdKey::Missing,
    }
}

/// Newest first: numeric ids descending, then text ids descending, then rows without an id.
pub fn sort_by_id_desc(rows: &mut [&VideoRecord]) {
    rows.sort_by(|a, b| compare_desc(a, b));
}

fn compare_desc(a: &VideoRecord, b: &VideoRecord) -> Ordering {
    id_key(b).cmp(&id_key(a))
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
