use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Kind of outbound webhook request a session can queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Chat,
    Image,
}

impl RequestKind {
    /// Drain order used by every render pass.
    pub const ALL: [RequestKind; 2] = [RequestKind::Chat, RequestKind::Image];

    /// Number of most recent history entries shown in the sidebar.
    pub fn history_display_limit(self) -> usize {
        match self {
            RequestKind::Chat => 5,
            RequestKind::Image => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RequestKind::Chat => "chat",
            RequestKind::Image => "image",
        }
    }
}

/// Lifecycle of one request kind within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPhase {
    Idle,
    Pending,
    Draining,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPayload {
    pub text: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub prompt: String,
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("bytes_len", &self.bytes.len())
            .field("filename", &self.filename)
            .field("prompt", &self.prompt)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum PendingRequest {
    ChatMessage(ChatPayload),
    ImageAnalysis(ImagePayload),
}

impl PendingRequest {
    pub fn chat(text: impl Into<String>) -> Self {
        Self::ChatMessage(ChatPayload { text: text.into() })
    }

    pub fn image(bytes: Vec<u8>, filename: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::ImageAnalysis(ImagePayload {
            bytes,
            filename: filename.into(),
            prompt: prompt.into(),
        })
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            PendingRequest::ChatMessage(_) => RequestKind::Chat,
            PendingRequest::ImageAnalysis(_) => RequestKind::Image,
        }
    }

    /// Text recorded as the `input` half of the history entry.
    pub fn input_label(&self) -> String {
        match self {
            PendingRequest::ChatMessage(chat) => chat.text.clone(),
            PendingRequest::ImageAnalysis(image) => {
                if image.prompt.trim().is_empty() {
                    image.filename.clone()
                } else {
                    format!("{}: {}", image.filename, image.prompt.trim())
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            PendingRequest::ChatMessage(chat) => chat.text.trim().is_empty(),
            PendingRequest::ImageAnalysis(image) => image.bytes.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub input: String,
    pub output: String,
    pub recorded_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub const ERROR_PREFIX: &'static str = "Error: ";

    pub fn success(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self::success_at(input, output, Utc::now())
    }

    pub fn success_at(
        input: impl Into<String>,
        output: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            recorded_at,
        }
    }

    pub fn failure(input: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::failure_at(input, message, Utc::now())
    }

    pub fn failure_at(
        input: impl Into<String>,
        message: impl fmt::Display,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            input: input.into(),
            output: format!("{}{message}", Self::ERROR_PREFIX),
            recorded_at,
        }
    }

    pub fn is_error(&self) -> bool {
        self.output.starts_with(Self::ERROR_PREFIX)
    }
}

/// Spreadsheet columns the dashboard knows how to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetColumn {
    Id,
    Idea,
    Caption,
    Production,
    EnvironmentPrompt,
    FinalOutput,
    Prompt,
    Date,
}

impl SheetColumn {
    pub const ALL: [SheetColumn; 8] = [
        SheetColumn::Id,
        SheetColumn::Idea,
        SheetColumn::Caption,
        SheetColumn::Production,
        SheetColumn::EnvironmentPrompt,
        SheetColumn::FinalOutput,
        SheetColumn::Prompt,
        SheetColumn::Date,
    ];

    pub fn header(self) -> &'static str {
        match self {
            SheetColumn::Id => "Id",
            SheetColumn::Idea => "Idea",
            SheetColumn::Caption => "Caption",
            SheetColumn::Production => "production",
            SheetColumn::EnvironmentPrompt => "environment_prompt",
            SheetColumn::FinalOutput => "final_output",
            SheetColumn::Prompt => "Prompt",
            SheetColumn::Date => "Date",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL.into_iter().find(|column| column.header() == header)
    }
}

/// Display bucket for a production status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusBucket {
    Done,
    InProgress,
    Pending,
}

impl StatusBucket {
    pub fn css_class(self) -> &'static str {
        match self {
            StatusBucket::Done => "status-done",
            StatusBucket::InProgress => "status-in-progress",
            StatusBucket::Pending => "status-pending",
        }
    }
}

const IN_PROGRESS_LABELS: [&str; 4] = ["in progress", "in-progress", "working", "processing"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionStatus(Option<String>);

impl ProductionStatus {
    pub const UNKNOWN: &'static str = "Unknown";

    pub fn from_cell(raw: Option<&str>) -> Self {
        Self(
            raw.map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
        )
    }

    pub fn label(&self) -> &str {
        self.0.as_deref().unwrap_or(Self::UNKNOWN)
    }

    pub fn bucket(&self) -> StatusBucket {
        let Some(value) = self.0.as_deref() else {
            return StatusBucket::Pending;
        };
        let lower = value.to_ascii_lowercase();
        if lower == "done" {
            StatusBucket::Done
        } else if IN_PROGRESS_LABELS.contains(&lower.as_str()) {
            StatusBucket::InProgress
        } else {
            StatusBucket::Pending
        }
    }

    pub fn matches(&self, filter: &str) -> bool {
        self.0
            .as_deref()
            .is_some_and(|value| value.trim().eq_ignore_ascii_case(filter.trim()))
    }
}

/// One spreadsheet row. Empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: Option<String>,
    pub idea: Option<String>,
    pub caption: Option<String>,
    pub production: Option<String>,
    pub environment_prompt: Option<String>,
    pub final_output: Option<String>,
    pub prompt: Option<String>,
    pub date: Option<String>,
}

impl VideoRecord {
    pub fn set(&mut self, column: SheetColumn, value: Option<String>) {
        let slot = match column {
            SheetColumn::Id => &mut self.id,
            SheetColumn::Idea => &mut self.idea,
            SheetColumn::Caption => &mut self.caption,
            SheetColumn::Production => &mut self.production,
            SheetColumn::EnvironmentPrompt => &mut self.environment_prompt,
            SheetColumn::FinalOutput => &mut self.final_output,
            SheetColumn::Prompt => &mut self.prompt,
            SheetColumn::Date => &mut self.date,
        };
        *slot = value;
    }

    pub fn status(&self) -> ProductionStatus {
        ProductionStatus::from_cell(self.production.as_deref())
    }

    pub fn video_url(&self) -> Option<&str> {
        self.final_output
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn numeric_id(&self) -> Option<i64> {
        let raw = self.id.as_deref()?.trim();
        raw.parse::<i64>().ok().or_else(|| {
            // Sheets exports integer ids as "12.0" once a column holds a float.
            raw.parse::<f64>()
                .ok()
                .filter(|value| value.fract() == 0.0)
                .map(|value| value as i64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_buckets_fold_unknown_into_pending() {
        assert_eq!(
            ProductionStatus::from_cell(Some(" Done ")).bucket(),
            StatusBucket::Done
        );
        assert_eq!(
            ProductionStatus::from_cell(Some("Processing")).bucket(),
            StatusBucket::InProgress
        );
        assert_eq!(
            ProductionStatus::from_cell(Some("queued")).bucket(),
            StatusBucket::Pending
        );
        let missing = ProductionStatus::from_cell(Some("   "));
        assert_eq!(missing.bucket(), StatusBucket::Pending);
        assert_eq!(missing.label(), "Unknown");
    }

    #[test]
    fn image_input_label_includes_prompt_when_present() {
        let request = PendingRequest::image(vec![1, 2, 3], "cat.png", " describe it ");
        assert_eq!(request.input_label(), "cat.png: describe it");
        assert_eq!(request.kind(), RequestKind::Image);

        let bare = PendingRequest::image(vec![1], "dog.jpg", "");
        assert_eq!(bare.input_label(), "dog.jpg");
    }

    #[test]
    fn numeric_id_accepts_float_formatted_integers() {
        let record = VideoRecord {
            id: Some("12.0".into()),
            ..VideoRecord::default()
        };
        assert_eq!(record.numeric_id(), Some(12));

        let text = VideoRecord {
            id: Some("abc".into()),
            ..VideoRecord::default()
        };
        assert_eq!(text.numeric_id(), None);
    }

    #[test]
    fn failure_entries_carry_error_prefix() {
        let entry = HistoryEntry::failure("robot ideas", "request timed out after 30s");
        assert_eq!(entry.output, "Error: request timed out after 30s");
        assert!(entry.is_error());
        assert!(!HistoryEntry::success("a", "b").is_error());
    }
}
