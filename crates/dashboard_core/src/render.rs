//! One render pass: apply the user event, drain pending webhook calls, check
//! auto-refresh, load the sheet and build the view.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sheets::{SheetSource, TableQuery};
use shared::{
    domain::{PendingRequest, RequestKind},
    error::SubmitRejection,
};
use tracing::{debug, info, warn};

use crate::{
    coordinator::{self, pending_request, phase, Coordinator},
    refresh::AutoRefresh,
    store::{
        clear_history, history_len, recent_history, AutoRefreshEnabled, CachedTable, Filters,
        FilterSettings, Flash, LastRefresh, Page, SessionStore, SheetUrl, TableSnapshot,
    },
    view::{ContentView, DashboardView, PanelView, SidebarView, TableView},
};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PLACEHOLDER_SHEET_URL: &str =
    "https://docs.google.com/spreadsheets/d/your-sheet-id/edit#gid=0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    View,
    GoToPage(usize),
    SubmitChat {
        text: String,
    },
    SubmitImage {
        bytes: Vec<u8>,
        filename: String,
        prompt: String,
    },
    ClearChatHistory,
    ClearImageHistory,
    UpdateSettings {
        sheet_url: String,
        auto_refresh: bool,
    },
    UpdateFilters {
        enabled: bool,
        status: String,
        search: String,
    },
    RefreshData,
    /// A submission turned away before its pass could run.
    Rejected(SubmitRejection),
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// State changed in a way that needs a fresh pass before anything is shown.
    Rerun,
    Page(Box<DashboardView>),
}

/// Applies a user event to session state without doing any I/O.
/// Returns whether the event requests a re-render.
pub fn apply_event(store: &mut SessionStore, event: Event) -> bool {
    match event {
        Event::View => false,
        Event::GoToPage(page) => {
            store.set::<Page>(page.max(1));
            false
        }
        Event::SubmitChat { text } => {
            accept_submission(store, PendingRequest::chat(text));
            true
        }
        Event::SubmitImage {
            bytes,
            filename,
            prompt,
        } => {
            accept_submission(store, PendingRequest::image(bytes, filename, prompt));
            true
        }
        Event::ClearChatHistory => {
            clear_history(store, RequestKind::Chat);
            true
        }
        Event::ClearImageHistory => {
            clear_history(store, RequestKind::Image);
            true
        }
        Event::UpdateSettings {
            sheet_url,
            auto_refresh,
        } => {
            let sheet_url = sheet_url.trim().to_string();
            if sheet_url != store.get::<SheetUrl>() {
                store.set::<SheetUrl>(sheet_url);
                store.set::<CachedTable>(None);
                store.set::<Page>(1);
            }
            store.set::<AutoRefreshEnabled>(auto_refresh);
            true
        }
        Event::UpdateFilters {
            enabled,
            status,
            search,
        } => {
            store.set::<Filters>(FilterSettings {
                enabled,
                status,
                search,
            });
            store.set::<Page>(1);
            true
        }
        Event::RefreshData => {
            store.set::<CachedTable>(None);
            true
        }
        Event::Rejected(rejection) => {
            debug!(%rejection, "rejected submission");
            store.append::<Flash, _>(rejection.to_string());
            true
        }
    }
}

fn accept_submission(store: &mut SessionStore, request: PendingRequest) {
    let kind = request.kind();
    match coordinator::submit(store, request) {
        Ok(()) => info!(kind = kind.label(), "queued webhook request"),
        Err(rejection) => {
            debug!(kind = kind.label(), %rejection, "rejected submission");
            store.append::<Flash, _>(rejection.to_string());
        }
    }
}

pub struct RenderPass {
    coordinator: Coordinator,
    sheets: Arc<dyn SheetSource>,
    refresh: AutoRefresh,
    page_size: usize,
}

impl RenderPass {
    pub fn new(coordinator: Coordinator, sheets: Arc<dyn SheetSource>) -> Self {
        Self {
            coordinator,
            sheets,
            refresh: AutoRefresh::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_auto_refresh(mut self, refresh: AutoRefresh) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub async fn run(
        &self,
        store: &mut SessionStore,
        event: Event,
        now: DateTime<Utc>,
    ) -> RenderOutcome {
        if apply_event(store, event) {
            return RenderOutcome::Rerun;
        }

        let report = self.coordinator.drain(store, now).await;
        if report.rerun_requested() {
            return RenderOutcome::Rerun;
        }

        if self.refresh.check(store, now) {
            debug!("auto-refresh interval elapsed");
            return RenderOutcome::Rerun;
        }

        self.ensure_table(store, now).await;
        RenderOutcome::Page(Box::new(self.build_view(store)))
    }

    async fn ensure_table(&self, store: &mut SessionStore, now: DateTime<Utc>) {
        let sheet_url = store.get::<SheetUrl>();
        if needs_setup(&sheet_url) {
            return;
        }
        let cached = store.with::<CachedTable, _>(|snapshot| {
            snapshot
                .as_ref()
                .is_some_and(|snapshot| snapshot.sheet_url == sheet_url)
        });
        if cached {
            return;
        }

        let result = self.sheets.fetch(&sheet_url).await;
        match &result {
            Ok(table) => info!(rows = table.len(), "loaded sheet"),
            Err(error) => warn!(%error, "failed to load sheet"),
        }
        store.set::<CachedTable>(Some(TableSnapshot {
            sheet_url,
            loaded_at: now,
            result,
        }));
        store.set::<LastRefresh>(Some(now));
    }

    fn build_view(&self, store: &mut SessionStore) -> DashboardView {
        let notices = store.take::<Flash>();
        let sheet_url = store.get::<SheetUrl>();
        let filters = store.get::<Filters>();
        let page = store.get::<Page>().max(1);

        let (content, status_options) = if needs_setup(&sheet_url) {
            (ContentView::Setup, Vec::new())
        } else {
            store.with::<CachedTable, _>(|snapshot| {
                let Some(snapshot) = snapshot.as_ref() else {
                    return (
                        ContentView::LoadError {
                            message: "sheet has not been loaded".to_string(),
                        },
                        Vec::new(),
                    );
                };
                match &snapshot.result {
                    Err(error) => (
                        ContentView::LoadError {
                            message: error.to_string(),
                        },
                        Vec::new(),
                    ),
                    Ok(table) if table.is_empty() => {
                        (ContentView::EmptySheet, table.status_options())
                    }
                    Ok(table) => {
                        let query = TableQuery {
                            status: filters.status_filter().map(str::to_string),
                            search: filters.search_filter().map(str::to_string),
                            page,
                            page_size: self.page_size,
                        };
                        let view = TableView {
                            page: table.query(&query),
                            missing_columns: table.render_input_error().map(|e| e.to_string()),
                            loaded_at: snapshot.loaded_at,
                        };
                        (ContentView::Table(Box::new(view)), table.status_options())
                    }
                }
            })
        };

        DashboardView {
            sidebar: SidebarView {
                sheet_url,
                auto_refresh: store.get::<AutoRefreshEnabled>(),
                filters,
                status_options,
                submit_locked: coordinator::submit_locked(store),
                chat: panel(store, RequestKind::Chat),
                image: panel(store, RequestKind::Image),
            },
            content,
            notices,
            auto_refresh_secs: store
                .get::<AutoRefreshEnabled>()
                .then(|| self.refresh.interval().as_secs()),
        }
    }
}

/// The placeholder URL and an empty field both mean the sheet is not configured yet.
fn needs_setup(sheet_url: &str) -> bool {
    let sheet_url = sheet_url.trim();
    sheet_url.is_empty() || sheet_url == PLACEHOLDER_SHEET_URL
}

fn panel(store: &SessionStore, kind: RequestKind) -> PanelView {
    PanelView {
        kind,
        phase: phase(store, kind),
        recent: recent_history(store, kind, kind.history_display_limit()),
        total_entries: history_len(store, kind),
        pending_input: pending_request(store, kind).map(|request| request.input_label()),
    }
}

#[cfg(test)]
#[path = "tests/render_tests.rs"]
mod tests;
