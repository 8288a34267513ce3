//! View model produced by a render pass. Presentation lives in the server crate.

use chrono::{DateTime, Utc};
use sheets::TablePage;
use shared::domain::{HistoryEntry, RequestKind, RequestPhase};

use crate::store::FilterSettings;

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub sidebar: SidebarView,
    pub content: ContentView,
    pub notices: Vec<String>,
    /// Set while auto-refresh is on; the page asks the browser to come back after this many seconds.
    pub auto_refresh_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SidebarView {
    pub sheet_url: String,
    pub auto_refresh: bool,
    pub filters: FilterSettings,
    pub status_options: Vec<String>,
    pub submit_locked: bool,
    pub chat: PanelView,
    pub image: PanelView,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelView {
    pub kind: RequestKind,
    pub phase: RequestPhase,
    pub recent: Vec<HistoryEntry>,
    pub total_entries: usize,
    pub pending_input: Option<String>,
}

impl PanelView {
    pub fn hidden_entries(&self) -> usize {
        self.total_entries.saturating_sub(self.recent.len())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentView {
    /// The sheet URL is still the placeholder; show setup instructions.
    Setup,
    LoadError { message: String },
    EmptySheet,
    Table(Box<TableView>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableView {
    pub page: TablePage,
    /// Columns the sheet lacks; elements depending on them are omitted.
    pub missing_columns: Option<String>,
    pub loaded_at: DateTime<Utc>,
}

impl TableView {
    pub fn no_matches(&self) -> bool {
        self.page.matching_rows == 0
    }
}
