//! HTML rendering for a [`DashboardView`]. Every dynamic value goes through [`escape`].

use dashboard_core::view::{ContentView, DashboardView, PanelView, SidebarView, TableView};
use sheets::PageRow;
use shared::domain::{RequestKind, RequestPhase, SheetColumn};

const STYLE: &str = r#"
    * { box-sizing: border-box; }
    body { margin: 0; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; color: #333; background: #fff; }
    .layout { display: flex; min-height: 100vh; }
    aside { width: 340px; padding: 20px; background: #f0f2f6; border-right: 1px solid #e0e0e0; }
    aside h2 { font-size: 1.1em; margin-top: 24px; }
    aside input[type=text], aside textarea, aside select { width: 100%; padding: 6px; margin: 4px 0 8px; }
    main { flex: 1; padding: 24px 40px; max-width: 1100px; }
    .notice { padding: 10px 14px; border-radius: 6px; margin: 10px 0; background: #fff3cd; color: #856404; }
    .banner-error { padding: 10px 14px; border-radius: 6px; margin: 10px 0; background: #f8d7da; color: #721c24; }
    .banner-info { padding: 10px 14px; border-radius: 6px; margin: 10px 0; background: #e8f4f8; color: #0c5460; }
    .metrics { display: flex; gap: 16px; margin: 16px 0; }
    .metric { flex: 1; padding: 12px; border: 1px solid #e0e0e0; border-radius: 8px; }
    .metric .value { font-size: 1.6em; font-weight: bold; }
    .video-card { border: 1px solid #e0e0e0; border-radius: 10px; padding: 20px; margin: 10px 0; background-color: #f9f9f9; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }
    .card-header { font-size: 1.2em; font-weight: bold; color: #333; margin-bottom: 10px; }
    .card-subtitle { font-size: 0.9em; color: #666; margin-bottom: 15px; }
    .caption-text { background-color: #e8f4f8; padding: 10px; border-radius: 5px; font-style: italic; margin: 10px 0; }
    .status-badge { display: inline-block; padding: 4px 12px; border-radius: 20px; font-size: 0.8em; font-weight: bold; margin: 5px 0; }
    .status-done { background-color: #d4edda; color: #155724; }
    .status-in-progress { background-color: #cce5ff; color: #004085; }
    .status-pending { background-color: #fff3cd; color: #856404; }
    .video-container { margin: 15px 0; border-radius: 8px; overflow: hidden; }
    .video-container video { width: 100%; max-height: 480px; }
    .history-entry { background: #fff; border-radius: 6px; padding: 8px; margin: 6px 0; font-size: 0.9em; }
    .history-entry.error .output { color: #721c24; }
    .history-entry .input { font-weight: bold; }
    .muted { color: #666; font-size: 0.85em; }
    .pager { display: flex; gap: 16px; align-items: center; margin: 20px 0; }
"#;

pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn render(view: &DashboardView) -> String {
    let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    if let Some(secs) = view.auto_refresh_secs {
        html.push_str(&format!("<meta http-equiv=\"refresh\" content=\"{secs}\">\n"));
    }
    html.push_str("<title>AI Video Dashboard</title>\n<style>");
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<div class=\"layout\">\n");

    render_sidebar(&mut html, &view.sidebar, view.auto_refresh_secs);

    html.push_str("<main>\n<h1>AI Video Dashboard</h1>\n<h3>Live data from Google Sheets</h3>\n");
    for notice in &view.notices {
        html.push_str(&format!("<div class=\"notice\">{}</div>\n", escape(notice)));
    }
    match &view.content {
        ContentView::Setup => render_setup(&mut html),
        ContentView::LoadError { message } => html.push_str(&format!(
            "<div class=\"banner-error\">Could not load data: {}. Please check your Google Sheets URL and sharing settings.</div>\n",
            escape(message)
        )),
        ContentView::EmptySheet => {
            html.push_str("<div class=\"notice\">The Google Sheet appears to be empty.</div>\n")
        }
        ContentView::Table(table) => render_table(&mut html, table),
    }
    html.push_str("</main>\n</div>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, sidebar: &SidebarView, auto_refresh_secs: Option<u64>) {
    html.push_str("<aside>\n<h2>Configuration</h2>\n<form method=\"post\" action=\"/settings\">\n");
    html.push_str(&format!(
        "<label>Google Sheets URL<input type=\"text\" name=\"sheet_url\" value=\"{}\"></label>\n",
        escape(&sidebar.sheet_url)
    ));
    html.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"auto_refresh\" value=\"on\"{}> Auto-refresh</label>\n",
        checked(sidebar.auto_refresh)
    ));
    html.push_str("<button type=\"submit\">Save</button>\n</form>\n");
    if let Some(secs) = auto_refresh_secs {
        html.push_str(&format!(
            "<p class=\"muted\">Auto-refreshing every {secs} seconds.</p>\n"
        ));
    }
    html.push_str(
        "<form method=\"post\" action=\"/refresh\"><button type=\"submit\">Refresh Data</button></form>\n",
    );

    html.push_str("<h2>Filters</h2>\n<form method=\"post\" action=\"/filters\">\n");
    html.push_str(&format!(
        "<label><input type=\"checkbox\" name=\"enabled\" value=\"on\"{}> Enable Filters</label>\n",
        checked(sidebar.filters.enabled)
    ));
    if !sidebar.status_options.is_empty() {
        html.push_str("<label>Filter by Status<select name=\"status\">\n");
        for option in &sidebar.status_options {
            let status = sidebar.filters.status.trim();
            let selected = status.eq_ignore_ascii_case(option)
                || (status.is_empty() && option == sheets::ALL_STATUSES);
            html.push_str(&format!(
                "<option value=\"{value}\"{selected}>{value}</option>\n",
                value = escape(option),
                selected = if selected { " selected" } else { "" }
            ));
        }
        html.push_str("</select></label>\n");
    }
    html.push_str(&format!(
        "<label>Search in Ideas/Captions<input type=\"text\" name=\"search\" value=\"{}\"></label>\n",
        escape(&sidebar.filters.search)
    ));
    html.push_str("<button type=\"submit\">Apply</button>\n</form>\n");

    render_panel(html, &sidebar.chat, sidebar.submit_locked);
    render_panel(html, &sidebar.image, sidebar.submit_locked);
    html.push_str("</aside>\n");
}

fn render_panel(html: &mut String, panel: &PanelView, locked: bool) {
    let (title, action) = match panel.kind {
        RequestKind::Chat => ("Chat Assistant", "/chat"),
        RequestKind::Image => ("Image Analysis", "/image"),
    };
    html.push_str(&format!("<h2>{title}</h2>\n"));

    if panel.hidden_entries() > 0 {
        html.push_str(&format!(
            "<p class=\"muted\">{} earlier entries hidden</p>\n",
            panel.hidden_entries()
        ));
    }
    for entry in &panel.recent {
        html.push_str(&format!(
            "<div class=\"history-entry{}\"><div class=\"input\">{}</div><div class=\"output\">{}</div><div class=\"muted\">{}</div></div>\n",
            if entry.is_error() { " error" } else { "" },
            escape(&entry.input),
            escape(&entry.output),
            entry.recorded_at.format("%H:%M:%S")
        ));
    }
    if panel.phase != RequestPhase::Idle {
        let input = panel.pending_input.as_deref().unwrap_or_default();
        html.push_str(&format!(
            "<p class=\"banner-info\">Processing: {}</p>\n",
            escape(input)
        ));
    }

    let disabled = if locked { " disabled" } else { "" };
    match panel.kind {
        RequestKind::Chat => html.push_str(&format!(
            "<form method=\"post\" action=\"{action}\">\n<textarea name=\"message\" rows=\"3\" placeholder=\"Ask for video ideas\"{disabled}></textarea>\n<button type=\"submit\"{disabled}>Send</button>\n</form>\n"
        )),
        RequestKind::Image => html.push_str(&format!(
            "<form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\n<input type=\"file\" name=\"file\" accept=\"image/*\"{disabled}>\n<input type=\"text\" name=\"prompt\" placeholder=\"What should be analyzed?\"{disabled}>\n<button type=\"submit\"{disabled}>Analyze</button>\n</form>\n"
        )),
    }
    if panel.total_entries > 0 {
        html.push_str(&format!(
            "<form method=\"post\" action=\"{action}/clear\"><button type=\"submit\">Clear history</button></form>\n"
        ));
    }
}

fn render_setup(html: &mut String) {
    html.push_str("<div class=\"banner-info\">Please enter your Google Sheets URL in the sidebar to get started.</div>\n");
    html.push_str("<h3>Setup Instructions</h3>\n<ol>\n");
    html.push_str("<li><strong>Open your Google Sheets document</strong></li>\n");
    html.push_str("<li><strong>Set sharing permissions:</strong> click \"Share\", change access to \"Anyone with the link can view\" and copy the sharing URL</li>\n");
    html.push_str("<li><strong>Paste the URL in the sidebar</strong></li>\n");
    html.push_str("<li><strong>Your data should appear automatically</strong></li>\n</ol>\n");
    html.push_str("<h3>Expected Column Names</h3>\n<ul>\n");
    for column in SheetColumn::ALL {
        html.push_str(&format!(
            "<li><code>{}</code> - {}</li>\n",
            column.header(),
            column_description(column)
        ));
    }
    html.push_str("</ul>\n<h3>Video Format Support</h3>\n<ul>\n<li>MP4 files (recommended)</li>\n<li>Direct video links</li>\n<li>URLs must be publicly accessible</li>\n</ul>\n");
}

fn column_description(column: SheetColumn) -> &'static str {
    match column {
        SheetColumn::Id => "Unique identifier",
        SheetColumn::Idea => "Video concept/idea",
        SheetColumn::Caption => "Social media caption",
        SheetColumn::Production => "Status (Done, Pending, etc.)",
        SheetColumn::EnvironmentPrompt => "Environment description",
        SheetColumn::FinalOutput => "Video URL",
        SheetColumn::Prompt => "Full generation prompt",
        SheetColumn::Date => "Creation date",
    }
}

fn render_table(html: &mut String, table: &TableView) {
    if let Some(missing) = &table.missing_columns {
        html.push_str(&format!("<div class=\"notice\">{}</div>\n", escape(missing)));
    }

    let page = &table.page;
    let metrics = &page.metrics;
    html.push_str("<div class=\"metrics\">\n");
    for (label, value) in [
        ("Total Videos", metrics.total),
        ("Completed", metrics.completed),
        ("In Progress", metrics.in_progress),
        ("Pending", metrics.pending),
        ("With Video", metrics.with_video),
    ] {
        html.push_str(&format!(
            "<div class=\"metric\"><div class=\"muted\">{label}</div><div class=\"value\">{value}</div></div>\n"
        ));
    }
    html.push_str("</div>\n");

    if page.is_filtered() {
        html.push_str(&format!(
            "<div class=\"banner-info\">Showing {} of {} videos</div>\n",
            page.matching_rows, page.total_rows
        ));
    }
    if table.no_matches() {
        html.push_str("<div class=\"notice\">No videos match your current filters.</div>\n");
        return;
    }

    for row in &page.rows {
        render_card(html, row);
    }

    html.push_str("<div class=\"pager\">\n");
    if page.has_previous() {
        html.push_str(&format!("<a href=\"/?page={}\">Previous</a>\n", page.page - 1));
    }
    html.push_str(&format!(
        "<span>Page {} of {}</span>\n",
        page.page, page.total_pages
    ));
    if page.has_next() {
        html.push_str(&format!("<a href=\"/?page={}\">Next</a>\n", page.page + 1));
    }
    html.push_str("</div>\n");
    html.push_str(&format!(
        "<p class=\"muted\">Last updated: {}</p>\n",
        table.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
}

fn render_card(html: &mut String, row: &PageRow) {
    let record = &row.record;
    let status = record.status();
    html.push_str("<div class=\"video-card\">\n");
    html.push_str(&format!(
        "<div class=\"card-header\">Video #{} - {}</div>\n",
        escape(record.id.as_deref().unwrap_or("?")),
        escape(record.idea.as_deref().unwrap_or_default())
    ));
    html.push_str(&format!("<div class=\"muted\">Item {}</div>\n", row.item_number));
    if let Some(date) = &record.date {
        html.push_str(&format!("<div class=\"card-subtitle\">{}</div>\n", escape(date)));
    }
    html.push_str(&format!(
        "<span class=\"status-badge {}\">{}</span>\n",
        status.bucket().css_class(),
        escape(status.label())
    ));
    if let Some(caption) = &record.caption {
        html.push_str(&format!("<div class=\"caption-text\">{}</div>\n", escape(caption)));
    }
    if let Some(environment) = &record.environment_prompt {
        html.push_str(&format!(
            "<p><strong>Environment:</strong> {}</p>\n",
            escape(environment)
        ));
    }
    if let Some(prompt) = &record.prompt {
        html.push_str(&format!(
            "<details><summary>View Full Prompt</summary><pre>{}</pre></details>\n",
            escape(prompt)
        ));
    }
    match record.video_url() {
        Some(url) if is_web_url(url) => html.push_str(&format!(
            "<div class=\"video-container\"><video controls preload=\"metadata\" src=\"{url}\"></video><p class=\"muted\"><a href=\"{url}\">Open video</a></p></div>\n",
            url = escape(url)
        )),
        Some(url) => html.push_str(&format!(
            "<p><strong>Video URL:</strong> {}</p>\n",
            escape(url)
        )),
        None => html.push_str("<div class=\"banner-info\">No video available for this entry</div>\n"),
    }
    html.push_str("</div>\n");
}

fn is_web_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("https://") || lower.starts_with("http://")
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

#[cfg(test)]
#[path = "tests/page_tests.rs"]
mod tests;
