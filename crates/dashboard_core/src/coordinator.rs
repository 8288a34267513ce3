//! Queues at most one webhook request per kind and drains it on the next render pass.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{
    domain::{HistoryEntry, PendingRequest, RequestKind, RequestPhase},
    error::SubmitRejection,
};
use tracing::{info, warn};
use webhooks::{dispatch, WebhookClient};

use crate::store::{append_history, InFlight, PendingChat, PendingImage, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseTransition {
    pub kind: RequestKind,
    pub from: RequestPhase,
    pub to: RequestPhase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub kind: RequestKind,
    pub succeeded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub transitions: Vec<PhaseTransition>,
    pub completed: Vec<Completion>,
}

impl DrainReport {
    /// A drained marker always asks for a fresh pass.
    pub fn rerun_requested(&self) -> bool {
        !self.completed.is_empty()
    }
}

pub fn pending_request(store: &SessionStore, kind: RequestKind) -> Option<PendingRequest> {
    match kind {
        RequestKind::Chat => store
            .get::<PendingChat>()
            .map(PendingRequest::ChatMessage),
        RequestKind::Image => store
            .get::<PendingImage>()
            .map(PendingRequest::ImageAnalysis),
    }
}

pub fn has_pending(store: &SessionStore, kind: RequestKind) -> bool {
    match kind {
        RequestKind::Chat => store.with::<PendingChat, _>(Option::is_some),
        RequestKind::Image => store.with::<PendingImage, _>(Option::is_some),
    }
}

fn set_pending(store: &mut SessionStore, request: PendingRequest) {
    match request {
        PendingRequest::ChatMessage(chat) => store.set::<PendingChat>(Some(chat)),
        PendingRequest::ImageAnalysis(image) => store.set::<PendingImage>(Some(image)),
    }
    store.submit_lock().set(locking_kind(store));
}

fn clear_pending(store: &mut SessionStore, kind: RequestKind) {
    match kind {
        RequestKind::Chat => store.set::<PendingChat>(None),
        RequestKind::Image => store.set::<PendingImage>(None),
    }
    store.submit_lock().set(locking_kind(store));
}

pub fn phase(store: &SessionStore, kind: RequestKind) -> RequestPhase {
    if store.get::<InFlight>() == Some(kind) {
        RequestPhase::Draining
    } else if has_pending(store, kind) {
        RequestPhase::Pending
    } else {
        RequestPhase::Idle
    }
}

/// First kind holding a marker, in drain order.
pub fn locking_kind(store: &SessionStore) -> Option<RequestKind> {
    RequestKind::ALL
        .into_iter()
        .find(|kind| has_pending(store, *kind))
}

/// True while any marker is set; every submit affordance is disabled.
pub fn submit_locked(store: &SessionStore) -> bool {
    locking_kind(store).is_some()
}

/// Accepts a submission by setting its marker. The call itself happens on the next pass.
pub fn submit(store: &mut SessionStore, request: PendingRequest) -> Result<(), SubmitRejection> {
    if let Some(pending) = locking_kind(store) {
        return Err(SubmitRejection::Locked { pending });
    }
    let kind = request.kind();
    if request.is_empty() {
        return Err(SubmitRejection::EmptyPayload(kind));
    }
    set_pending(store, request);
    Ok(())
}

#[derive(Clone)]
pub struct Coordinator {
    client: Arc<dyn WebhookClient>,
}

impl Coordinator {
    pub fn new(client: Arc<dyn WebhookClient>) -> Self {
        Self { client }
    }

    /// Completes every pending marker, in drain order, within this pass.
    ///
    /// Failures become `Error: ...` history entries stamped with `now`; the
    /// marker is cleared either way and only here.
    pub async fn drain(&self, store: &mut SessionStore, now: DateTime<Utc>) -> DrainReport {
        let mut report = DrainReport::default();
        for kind in RequestKind::ALL {
            let Some(request) = pending_request(store, kind) else {
                continue;
            };

            store.set::<InFlight>(Some(kind));
            report.transitions.push(PhaseTransition {
                kind,
                from: RequestPhase::Pending,
                to: RequestPhase::Draining,
            });

            let input = request.input_label();
            let (entry, succeeded) = match dispatch(self.client.as_ref(), &request).await {
                Ok(response) => {
                    info!(kind = kind.label(), "webhook request completed");
                    (HistoryEntry::success_at(input, response, now), true)
                }
                Err(error) => {
                    warn!(kind = kind.label(), %error, "webhook request failed");
                    (HistoryEntry::failure_at(input, &error, now), false)
                }
            };

            append_history(store, kind, entry);
            clear_pending(store, kind);
            store.set::<InFlight>(None);
            report.transitions.push(PhaseTransition {
                kind,
                from: RequestPhase::Draining,
                to: RequestPhase::Idle,
            });
            report.completed.push(Completion { kind, succeeded });
        }
        report
    }
}

#[cfg(test)]
#[path = "tests/coordinator_tests.rs"]
mod tests;
