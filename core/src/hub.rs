/// Conversation hub: single writer over every derived view of one viewer
///
/// Events for a conversation are applied one at a time under the write lock,
/// each fully (bounded recomputation included) before the next. Render
/// subscribers get a `HubEvent` per applied or rejected event.
use crate::error::{ChatViewError, EventRejection, Result};
use crate::messenger_types::{Conversation, ConversationEvent, ConversationId, ParticipantId};
use crate::projector::{apply_event, project, DerivedView, ViewUpdate};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

/// Notifications for the render side
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HubEvent {
    /// A snapshot was (re)loaded; redraw the whole conversation
    ViewLoaded { conversation_id: ConversationId },
    /// An event was applied; redraw only the listed descriptors
    ViewUpdated { update: ViewUpdate },
    /// An event was refused and nothing changed
    EventRejected {
        conversation_id: ConversationId,
        reason: String,
    },
}

#[derive(Clone)]
pub struct ConversationHub {
    viewer_id: ParticipantId,
    views: Arc<RwLock<HashMap<ConversationId, DerivedView>>>,
    events: broadcast::Sender<HubEvent>,
}

impl ConversationHub {
    pub fn new(viewer_id: impl Into<ParticipantId>, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer.max(1));
        Self {
            viewer_id: viewer_id.into(),
            views: Arc::new(RwLock::new(HashMap::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.events.subscribe()
    }

    /// Project a snapshot and store it, replacing any earlier view of the
    /// same conversation (a refetch). Seen dates already reached by the
    /// earlier view are kept.
    pub async fn load(&self, conversation: &Conversation) -> Result<DerivedView> {
        let mut view = project(conversation, &self.viewer_id)?;
        let mut views = self.views.write().await;
        if let Some(earlier) = views.get(&view.conversation_id) {
            let kept = view.retain_seen_dates(&earlier.seen_dates);
            if kept.seen_dates_changed {
                debug!(
                    "Refetch of {} kept newer seen dates ({} descriptor(s) re-resolved)",
                    view.conversation_id,
                    kept.changed.len()
                );
            }
        }
        let replaced = views
            .insert(view.conversation_id.clone(), view.clone())
            .is_some();
        drop(views);

        info!(
            "Loaded conversation {} ({} messages{})",
            view.conversation_id,
            view.len(),
            if replaced { ", replaced" } else { "" }
        );
        // No subscribers is fine
        let _ = self.events.send(HubEvent::ViewLoaded {
            conversation_id: view.conversation_id.clone(),
        });
        Ok(view)
    }

    pub async fn apply(&self, event: &ConversationEvent) -> Result<ViewUpdate> {
        let conversation_id = event.conversation_id().to_string();
        let result = {
            let mut views = self.views.write().await;
            match views.get_mut(&conversation_id) {
                Some(view) => apply_event(view, event),
                None => Err(ChatViewError::InvalidEvent(
                    EventRejection::UnknownConversation(conversation_id.clone()),
                )),
            }
        };

        match result {
            Ok(update) => {
                if update.is_noop() {
                    debug!("Event for {} changed nothing", conversation_id);
                } else {
                    let _ = self.events.send(HubEvent::ViewUpdated {
                        update: update.clone(),
                    });
                }
                Ok(update)
            }
            Err(e) => {
                warn!("Rejected event for {}: {}", conversation_id, e);
                let _ = self.events.send(HubEvent::EventRejected {
                    conversation_id,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Drain a transport channel in arrival order until it closes.
    /// Returns how many events were applied and how many were rejected.
    pub async fn consume(&self, mut rx: mpsc::Receiver<ConversationEvent>) -> (usize, usize) {
        let mut applied = 0;
        let mut rejected = 0;
        while let Some(event) = rx.recv().await {
            match self.apply(&event).await {
                Ok(_) => applied += 1,
                Err(_) => rejected += 1,
            }
        }
        info!(
            "Event stream closed: {} applied, {} rejected",
            applied, rejected
        );
        (applied, rejected)
    }

    pub async fn view(&self, conversation_id: &str) -> Option<DerivedView> {
        self.views.read().await.get(conversation_id).cloned()
    }

    pub async fn conversation_ids(&self) -> Vec<ConversationId> {
        let mut ids: Vec<_> = self.views.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
