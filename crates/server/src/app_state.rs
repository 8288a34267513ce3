use std::sync::Arc;

use dashboard_core::{AutoRefresh, Coordinator, RenderPass, SessionRegistry};
use sheets::{HttpSheetSource, SheetSource};
use webhooks::{HttpWebhookClient, WebhookClient};

use crate::config::Settings;

pub(crate) struct AppState {
    pub(crate) sessions: SessionRegistry,
    pub(crate) pass: Arc<RenderPass>,
    pub(crate) max_upload_bytes: usize,
}

impl AppState {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::with_sources(
            settings,
            Arc::new(HttpWebhookClient::new(settings.webhook_config())),
            Arc::new(HttpSheetSource::new(settings.sheet_timeout())),
        )
    }

    pub(crate) fn with_sources(
        settings: &Settings,
        webhooks: Arc<dyn WebhookClient>,
        sheets: Arc<dyn SheetSource>,
    ) -> Self {
        let pass = RenderPass::new(Coordinator::new(webhooks), sheets)
            .with_auto_refresh(AutoRefresh::new(settings.auto_refresh()))
            .with_page_size(settings.page_size);
        Self {
            sessions: SessionRegistry::new(
                settings.session_idle(),
                settings.default_sheet_url.clone(),
            ),
            pass: Arc::new(pass),
            max_upload_bytes: settings.max_upload_bytes,
        }
    }
}
