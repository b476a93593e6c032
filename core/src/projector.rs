/// Conversation projection: snapshot → derived view, then incremental events
///
/// A `DerivedView` owns the messages of one conversation together with their
/// render descriptors. Events mutate it in place and only the descriptors whose
/// inputs can have moved are recomputed:
///
/// - append at `n`: `n - 1` and `n`
/// - receipt on `i`: `i` and `i - 1`, plus the messages stamped with the peer's
///   previous or new baseline (and their predecessors) when the baseline moved
/// - send acknowledgement on `i`: `i`
use crate::bubble::{position, BubblePosition, Neighbors};
use crate::delivery::{resolve, show_avatar, show_delivery_status, Delivery, DeliveryStatus};
use crate::error::{ChatViewError, EventRejection, Result};
use crate::messenger_types::{
    Conversation, ConversationEvent, ConversationId, ConversationKind, Message, MessageId,
    Participant, ParticipantId, Receipt, ReceiptKind, Timestamp,
};
use crate::receipts::first_receipt;
use crate::seen_dates::{compute_seen_dates, SeenDates};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Render descriptor for one message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageView {
    pub message: Message,
    pub bubble: BubblePosition,
    pub status: DeliveryStatus,
    pub display_timestamp: Timestamp,
    pub show_avatar: bool,
    pub show_delivery_status: bool,
    pub has_media: bool,
}

/// Everything about a message's presentation that depends on its surroundings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Presentation {
    bubble: BubblePosition,
    delivery: Delivery,
    show_avatar: bool,
    show_delivery_status: bool,
}

fn present(
    message: &Message,
    neighbors: Neighbors<'_>,
    viewer_id: &str,
    peer_id: &str,
    seen_dates: &SeenDates,
) -> Presentation {
    let incoming = !message.is_from(viewer_id);
    Presentation {
        bubble: position(message, neighbors),
        delivery: resolve(message, neighbors, incoming, peer_id, seen_dates),
        show_avatar: show_avatar(message, neighbors.after, incoming),
        show_delivery_status: show_delivery_status(neighbors.after, incoming),
    }
}

impl MessageView {
    fn new(message: Message, p: Presentation) -> Self {
        let has_media = message.has_media();
        Self {
            message,
            bubble: p.bubble,
            status: p.delivery.status,
            display_timestamp: p.delivery.display_timestamp,
            show_avatar: p.show_avatar,
            show_delivery_status: p.show_delivery_status,
            has_media,
        }
    }

    /// Overwrite derived fields; returns whether any of them differed
    fn update(&mut self, p: Presentation) -> bool {
        let has_media = self.message.has_media();
        let changed = self.bubble != p.bubble
            || self.status != p.delivery.status
            || self.display_timestamp != p.delivery.display_timestamp
            || self.show_avatar != p.show_avatar
            || self.show_delivery_status != p.show_delivery_status
            || self.has_media != has_media;
        self.bubble = p.bubble;
        self.status = p.delivery.status;
        self.display_timestamp = p.delivery.display_timestamp;
        self.show_avatar = p.show_avatar;
        self.show_delivery_status = p.show_delivery_status;
        self.has_media = has_media;
        changed
    }
}

/// What an applied event changed, for redrawing only what moved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewUpdate {
    pub conversation_id: ConversationId,
    /// Ids of descriptors that are new or differ, in conversation order
    pub changed: Vec<MessageId>,
    pub seen_dates_changed: bool,
}

impl ViewUpdate {
    fn new(conversation_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            changed: Vec::new(),
            seen_dates_changed: false,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && !self.seen_dates_changed
    }
}

/// Derived state of one conversation as seen by `viewer_id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DerivedView {
    pub conversation_id: ConversationId,
    pub kind: ConversationKind,
    pub viewer_id: ParticipantId,
    pub peer_id: ParticipantId,
    pub participants: Vec<Participant>,
    pub descriptors: Vec<MessageView>,
    pub seen_dates: SeenDates,
    #[serde(skip)]
    positions: HashMap<MessageId, usize>,
    /// Peer seen-receipt timestamp → indices of messages carrying it
    #[serde(skip)]
    seen_stamps: HashMap<Timestamp, BTreeSet<usize>>,
}

fn invalid(reason: EventRejection) -> ChatViewError {
    ChatViewError::InvalidEvent(reason)
}

/// Check the receipt invariants of `message` against the participant list
fn check_receipts(
    message: &Message,
    participants: &HashSet<&str>,
) -> std::result::Result<(), EventRejection> {
    if !participants.contains(message.sender_id.as_str()) {
        return Err(EventRejection::NotParticipant(message.sender_id.clone()));
    }
    for receipt in message.delivered_to.iter().chain(message.seen_by.iter()) {
        check_receipt(message, receipt, participants)?;
    }
    Ok(())
}

fn check_receipt(
    message: &Message,
    receipt: &Receipt,
    participants: &HashSet<&str>,
) -> std::result::Result<(), EventRejection> {
    if !participants.contains(receipt.user_id.as_str()) {
        return Err(EventRejection::NotParticipant(receipt.user_id.clone()));
    }
    if message.is_from(&receipt.user_id) {
        return Err(EventRejection::ReceiptFromSender {
            user: receipt.user_id.clone(),
            message: message.id.clone(),
        });
    }
    Ok(())
}

/// Full derivation of a conversation snapshot for `viewer_id`
pub fn project(conversation: &Conversation, viewer_id: &str) -> Result<DerivedView> {
    if !conversation.is_participant(viewer_id) {
        return Err(ChatViewError::InvalidSnapshot(format!(
            "viewer {} is not a participant of {}",
            viewer_id, conversation.id
        )));
    }
    let peer_id = conversation
        .peer_of(viewer_id)
        .map(|p| p.id.clone())
        .ok_or_else(|| {
            ChatViewError::InvalidSnapshot(format!(
                "conversation {} has no participant besides {}",
                conversation.id, viewer_id
            ))
        })?;
    if conversation.kind == ConversationKind::Group {
        debug!(
            "Conversation {} is a group; tracking {} as the peer",
            conversation.id, peer_id
        );
    }

    let members: HashSet<&str> = conversation
        .participants
        .iter()
        .map(|p| p.id.as_str())
        .collect();
    let mut seen_ids = HashSet::with_capacity(conversation.messages.len());
    for message in &conversation.messages {
        if message.conversation_id != conversation.id {
            return Err(ChatViewError::InvalidSnapshot(format!(
                "message {} belongs to conversation {}",
                message.id, message.conversation_id
            )));
        }
        if !seen_ids.insert(message.id.as_str()) {
            return Err(ChatViewError::InvalidSnapshot(format!(
                "duplicate message id {}",
                message.id
            )));
        }
        check_receipts(message, &members)
            .map_err(|e| ChatViewError::InvalidSnapshot(format!("message {}: {}", message.id, e)))?;
    }

    let messages = &conversation.messages;
    let seen_dates = compute_seen_dates(&conversation.participants, messages);
    let descriptors: Vec<MessageView> = messages
        .iter()
        .enumerate()
        .map(|(idx, m)| {
            let p = present(m, Neighbors::at(messages, idx), viewer_id, &peer_id, &seen_dates);
            MessageView::new(m.clone(), p)
        })
        .collect();

    let mut view = DerivedView {
        conversation_id: conversation.id.clone(),
        kind: conversation.kind,
        viewer_id: viewer_id.to_string(),
        peer_id,
        participants: conversation.participants.clone(),
        descriptors,
        seen_dates,
        positions: HashMap::with_capacity(messages.len()),
        seen_stamps: HashMap::new(),
    };
    for idx in 0..view.descriptors.len() {
        view.index_message(idx);
    }

    debug!(
        "Projected conversation {} ({} messages)",
        view.conversation_id,
        view.descriptors.len()
    );
    Ok(view)
}

/// Apply one event. Nothing is mutated when the event is rejected.
pub fn apply_event(view: &mut DerivedView, event: &ConversationEvent) -> Result<ViewUpdate> {
    if event.conversation_id() != view.conversation_id {
        return Err(invalid(EventRejection::ConversationMismatch {
            view: view.conversation_id.clone(),
            event: event.conversation_id().to_string(),
        }));
    }

    let update = match event {
        ConversationEvent::MessageAppended { message } => view.append(message)?,
        ConversationEvent::ReceiptAdded {
            message_id,
            kind,
            receipt,
            ..
        } => view.add_receipt(message_id, *kind, receipt)?,
        ConversationEvent::MessageSent {
            message_id,
            sent_at,
            ..
        } => view.mark_sent(message_id, *sent_at)?,
    };

    debug!(
        "Applied event to {}: {} descriptor(s) changed, seen dates changed: {}",
        view.conversation_id,
        update.changed.len(),
        update.seen_dates_changed
    );
    Ok(update)
}

impl DerivedView {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptor(&self, message_id: &str) -> Option<&MessageView> {
        self.positions
            .get(message_id)
            .map(|&idx| &self.descriptors[idx])
    }

    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == user_id)
    }

    /// Rebuild the conversation the view was derived from, events included
    pub fn to_conversation(&self) -> Conversation {
        Conversation {
            id: self.conversation_id.clone(),
            participants: self.participants.clone(),
            messages: self.descriptors.iter().map(|d| d.message.clone()).collect(),
            kind: self.kind,
            seen_dates: self.seen_dates.clone(),
        }
    }

    fn members(&self) -> HashSet<&str> {
        self.participants.iter().map(|p| p.id.as_str()).collect()
    }

    fn peer_seen_stamp(&self, idx: usize) -> Option<Timestamp> {
        first_receipt(&self.descriptors[idx].message, ReceiptKind::Seen, &self.peer_id)
            .map(|r| r.timestamp)
    }

    fn index_message(&mut self, idx: usize) {
        self.positions
            .insert(self.descriptors[idx].message.id.clone(), idx);
        if let Some(stamp) = self.peer_seen_stamp(idx) {
            self.seen_stamps.entry(stamp).or_default().insert(idx);
        }
    }

    fn restamp(&mut self, idx: usize, old: Option<Timestamp>, new: Option<Timestamp>) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            if let Some(set) = self.seen_stamps.get_mut(&old) {
                set.remove(&idx);
                if set.is_empty() {
                    self.seen_stamps.remove(&old);
                }
            }
        }
        if let Some(new) = new {
            self.seen_stamps.entry(new).or_default().insert(idx);
        }
    }

    /// Messages stamped `stamp` plus their predecessors, whose suppression
    /// depends on them
    fn stamped_with(&self, stamp: Timestamp, into: &mut BTreeSet<usize>) {
        if let Some(set) = self.seen_stamps.get(&stamp) {
            for &idx in set {
                into.insert(idx);
                if let Some(prev) = idx.checked_sub(1) {
                    into.insert(prev);
                }
            }
        }
    }

    fn present_at(&self, idx: usize) -> Presentation {
        let neighbors = Neighbors {
            before: idx.checked_sub(1).map(|i| &self.descriptors[i].message),
            after: self.descriptors.get(idx + 1).map(|d| &d.message),
        };
        present(
            &self.descriptors[idx].message,
            neighbors,
            &self.viewer_id,
            &self.peer_id,
            &self.seen_dates,
        )
    }

    fn refresh(&mut self, indices: &BTreeSet<usize>) -> Vec<MessageId> {
        let mut changed = Vec::new();
        for &idx in indices {
            if idx >= self.descriptors.len() {
                continue;
            }
            let p = self.present_at(idx);
            let view = &mut self.descriptors[idx];
            if view.update(p) {
                changed.push(view.message.id.clone());
            }
        }
        changed
    }

    /// Advance the baseline of every seen receipt in `receipts`. Returns the
    /// peer's previous baseline when it moved, and whether anything moved.
    fn advance_seen<'a>(
        &mut self,
        receipts: impl IntoIterator<Item = &'a Receipt>,
    ) -> (Option<Timestamp>, bool) {
        let mut peer_moved = None;
        let mut any = false;
        for r in receipts {
            if let Some(previous) = self.seen_dates.advance(&r.user_id, r.timestamp) {
                any = true;
                if r.user_id == self.peer_id && peer_moved.is_none() {
                    peer_moved = Some(previous);
                }
            }
        }
        (peer_moved, any)
    }

    fn append(&mut self, message: &Message) -> Result<ViewUpdate> {
        if let Some(&idx) = self.positions.get(&message.id) {
            return self.redeliver(idx, message);
        }
        check_receipts(message, &self.members()).map_err(invalid)?;
        let mut update = ViewUpdate::new(&self.conversation_id);


        let (peer_moved, any_moved) = self.advance_seen(&message.seen_by);
        update.seen_dates_changed = any_moved;

        let idx = self.descriptors.len();
        let before = self.descriptors.last().map(|d| &d.message);
        let neighbors = Neighbors {
            before,
            after: None,
        };
        let p = present(
            message,
            neighbors,
            &self.viewer_id,
            &self.peer_id,
            &self.seen_dates,
        );
        self.descriptors.push(MessageView::new(message.clone(), p));
        self.index_message(idx);

        let mut affected = BTreeSet::new();
        if let Some(prev) = idx.checked_sub(1) {
            affected.insert(prev);
        }
        if let Some(old) = peer_moved {
            self.stamped_with(old, &mut affected);
            self.stamped_with(self.seen_dates.get(&self.peer_id), &mut affected);
        }
        affected.remove(&idx);

        update.changed = self.refresh(&affected);
        update.changed.push(message.id.clone());
        Ok(update)
    }

    /// A message we already hold arrives again. Its receipts are merged; any
    /// difference in content is a conflict.
    fn redeliver(&mut self, idx: usize, message: &Message) -> Result<ViewUpdate> {
        let stored = &self.descriptors[idx].message;
        let same_content = stored.conversation_id == message.conversation_id
            && stored.sender_id == message.sender_id
            && stored.text == message.text
            && stored.attachments == message.attachments
            && (!(stored.sent && message.sent) || stored.sent_at == message.sent_at);
        if !same_content {
            return Err(invalid(EventRejection::ConflictingMessage(
                message.id.clone(),
            )));
        }
        let acknowledged = message.sent && !stored.sent;
        check_receipts(message, &self.members()).map_err(invalid)?;

        let receipts: Vec<(ReceiptKind, &Receipt)> = message
            .delivered_to
            .iter()
            .map(|r| (ReceiptKind::Delivered, r))
            .chain(message.seen_by.iter().map(|r| (ReceiptKind::Seen, r)))
            .collect();
        let mut update = self.merge_receipts(idx, &receipts);

        if acknowledged {
            for id in self.mark_sent(&message.id, Some(message.sent_at))?.changed {
                if !update.changed.contains(&id) {
                    update.changed.push(id);
                }
            }
        }
        Ok(update)
    }

    fn add_receipt(
        &mut self,
        message_id: &str,
        kind: ReceiptKind,
        receipt: &Receipt,
    ) -> Result<ViewUpdate> {
        let idx = *self
            .positions
            .get(message_id)
            .ok_or_else(|| invalid(EventRejection::UnknownMessage(message_id.to_string())))?;
        check_receipt(&self.descriptors[idx].message, receipt, &self.members())
            .map_err(invalid)?;

        Ok(self.merge_receipts(idx, &[(kind, receipt)]))
    }

    /// Merge already validated receipts into the message at `idx` and
    /// recompute whatever they reach. Stale and duplicate receipts change
    /// nothing.
    fn merge_receipts(&mut self, idx: usize, receipts: &[(ReceiptKind, &Receipt)]) -> ViewUpdate {
        let mut update = ViewUpdate::new(&self.conversation_id);
        let old_stamp = self.peer_seen_stamp(idx);
        let mut merged = false;
        let mut seen = Vec::new();
        for &(kind, receipt) in receipts {
            if self.descriptors[idx]
                .message
                .merge_receipt(kind, receipt.clone())
            {
                merged = true;
                if kind == ReceiptKind::Seen {
                    seen.push(receipt);
                }
            }
        }
        if !merged {
            return update;
        }
        let new_stamp = self.peer_seen_stamp(idx);
        self.restamp(idx, old_stamp, new_stamp);

        let mut affected = BTreeSet::from([idx]);
        if let Some(prev) = idx.checked_sub(1) {
            affected.insert(prev);
        }
        let (peer_moved, any_moved) = self.advance_seen(seen);
        update.seen_dates_changed = any_moved;
        if let Some(old) = peer_moved {
            self.stamped_with(old, &mut affected);
            self.stamped_with(self.seen_dates.get(&self.peer_id), &mut affected);
        }

        update.changed = self.refresh(&affected);
        update
    }

    /// Carry baselines over from an earlier view of the same conversation so
    /// a refetch never moves them backwards
    pub fn retain_seen_dates(&mut self, earlier: &SeenDates) -> ViewUpdate {
        let mut update = ViewUpdate::new(&self.conversation_id);
        let mut peer_moved = None;
        for (user_id, &at) in earlier.iter() {
            if self.participant(user_id).is_none() {
                continue;
            }
            if let Some(previous) = self.seen_dates.advance(user_id, at) {
                update.seen_dates_changed = true;
                if *user_id == self.peer_id {
                    peer_moved = Some(previous);
                }
            }
        }

        if let Some(old) = peer_moved {
            let mut affected = BTreeSet::new();
            self.stamped_with(old, &mut affected);
            self.stamped_with(self.seen_dates.get(&self.peer_id), &mut affected);
            update.changed = self.refresh(&affected);
        }
        update
    }

    fn mark_sent(&mut self, message_id: &str, sent_at: Option<Timestamp>) -> Result<ViewUpdate> {
        let idx = *self
            .positions
            .get(message_id)
            .ok_or_else(|| invalid(EventRejection::UnknownMessage(message_id.to_string())))?;

        let message = &mut self.descriptors[idx].message;
        message.sent = true;
        if let Some(at) = sent_at {
            message.sent_at = at;
        }

        let mut update = ViewUpdate::new(&self.conversation_id);
        update.changed = self.refresh(&BTreeSet::from([idx]));
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(messages: Vec<Message>) -> Conversation {
        Conversation {
            id: "c1".to_string(),
            participants: vec![Participant::new("a"), Participant::new("b")],
            messages,
            kind: ConversationKind::OneToOne,
            seen_dates: SeenDates::default(),
        }
    }

    fn msg(id: &str, sender: &str, sent_at: Timestamp) -> Message {
        Message::new(id, "c1", sender, Some(id.to_string()), sent_at)
    }

    fn seen(message_id: &str, at: Timestamp) -> ConversationEvent {
        ConversationEvent::ReceiptAdded {
            conversation_id: "c1".to_string(),
            message_id: message_id.to_string(),
            kind: ReceiptKind::Seen,
            receipt: Receipt::new("b", at),
        }
    }

    #[test]
    fn test_project_rejects_outsider_viewer() {
        let err = project(&conversation(vec![]), "z").unwrap_err();
        assert!(matches!(err, ChatViewError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_project_rejects_foreign_receipt() {
        let mut m = msg("m1", "a", 1);
        m.seen_by.push(Receipt::new("mallory", 5));
        let err = project(&conversation(vec![m]), "a").unwrap_err();
        assert!(matches!(err, ChatViewError::InvalidSnapshot(_)));
    }

    #[test]
    fn test_append_updates_predecessor() {
        let mut view = project(&conversation(vec![msg("m1", "b", 1)]), "a").unwrap();
        assert_eq!(view.descriptors[0].status, DeliveryStatus::Seen);
        assert!(view.descriptors[0].show_avatar);

        let update = apply_event(
            &mut view,
            &ConversationEvent::MessageAppended {
                message: msg("m2", "b", 2),
            },
        )
        .unwrap();

        assert_eq!(update.changed, vec!["m1".to_string(), "m2".to_string()]);
        let first = view.descriptor("m1").unwrap();
        assert_eq!(first.status, DeliveryStatus::None);
        assert_eq!(first.bubble, BubblePosition::First);
        assert!(!first.show_avatar);
        assert_eq!(view.descriptor("m2").unwrap().bubble, BubblePosition::Last);
    }

    #[test]
    fn test_receipt_moves_seen_to_newest_bubble() {
        let mut view = project(
            &conversation(vec![msg("m1", "a", 1), msg("m2", "a", 2)]),
            "a",
        )
        .unwrap();

        apply_event(&mut view, &seen("m1", 100)).unwrap();
        assert_eq!(view.descriptor("m1").unwrap().status, DeliveryStatus::Seen);

        let update = apply_event(&mut view, &seen("m2", 100)).unwrap();
        assert_eq!(update.changed, vec!["m1".to_string(), "m2".to_string()]);
        assert!(!update.seen_dates_changed);
        assert_eq!(view.descriptor("m1").unwrap().status, DeliveryStatus::None);
        assert_eq!(view.descriptor("m2").unwrap().status, DeliveryStatus::Seen);
        assert_eq!(view.seen_dates.get("b"), 100);
    }

    #[test]
    fn test_duplicate_receipt_is_noop() {
        let mut view = project(&conversation(vec![msg("m1", "a", 1)]), "a").unwrap();
        apply_event(&mut view, &seen("m1", 100)).unwrap();
        let snapshot = view.clone();

        let update = apply_event(&mut view, &seen("m1", 100)).unwrap();
        assert!(update.is_noop());
        let update = apply_event(&mut view, &seen("m1", 40)).unwrap();
        assert!(update.is_noop());
        assert_eq!(view, snapshot);
    }

    #[test]
    fn test_rejected_event_leaves_view_untouched() {
        let mut view = project(&conversation(vec![msg("m1", "a", 1)]), "a").unwrap();
        let before = view.clone();

        let err = apply_event(
            &mut view,
            &ConversationEvent::ReceiptAdded {
                conversation_id: "c1".to_string(),
                message_id: "m1".to_string(),
                kind: ReceiptKind::Seen,
                receipt: Receipt::new("mallory", 10),
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ChatViewError::InvalidEvent(EventRejection::NotParticipant(_))
        ));

        let err = apply_event(&mut view, &seen("nope", 10)).unwrap_err();
        assert!(matches!(
            err,
            ChatViewError::InvalidEvent(EventRejection::UnknownMessage(_))
        ));

        let mut own = seen("m1", 10);
        if let ConversationEvent::ReceiptAdded { receipt, .. } = &mut own {
            receipt.user_id = "a".to_string();
        }
        let err = apply_event(&mut view, &own).unwrap_err();
        assert!(matches!(
            err,
            ChatViewError::InvalidEvent(EventRejection::ReceiptFromSender { .. })
        ));

        assert_eq!(view, before);
    }

    #[test]
    fn test_conflicting_redelivery_rejected() {
        let mut view = project(&conversation(vec![msg("m1", "a", 1)]), "a").unwrap();

        let same = ConversationEvent::MessageAppended {
            message: msg("m1", "a", 1),
        };
        assert!(apply_event(&mut view, &same).unwrap().is_noop());

        let mut edited = msg("m1", "a", 1);
        edited.text = Some("changed".into());
        let err = apply_event(&mut view, &ConversationEvent::MessageAppended { message: edited })
            .unwrap_err();
        assert!(matches!(
            err,
            ChatViewError::InvalidEvent(EventRejection::ConflictingMessage(_))
        ));
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn test_redelivery_after_receipts_is_noop() {
        let appended = ConversationEvent::MessageAppended {
            message: msg("m1", "a", 1),
        };
        let mut view = project(&conversation(vec![]), "a").unwrap();
        apply_event(&mut view, &appended).unwrap();
        apply_event(
            &mut view,
            &ConversationEvent::ReceiptAdded {
                conversation_id: "c1".to_string(),
                message_id: "m1".to_string(),
                kind: ReceiptKind::Delivered,
                receipt: Receipt::new("b", 10),
            },
        )
        .unwrap();
        let before = view.clone();

        let update = apply_event(&mut view, &appended).unwrap();
        assert!(update.is_noop());
        assert_eq!(view, before);
        assert_eq!(view.descriptors[0].status, DeliveryStatus::Delivered);
    }

    #[test]
    fn test_redelivery_merges_carried_receipts() {
        let mut pending = msg("m1", "a", 1);
        pending.sent = false;
        let mut view = project(&conversation(vec![pending]), "a").unwrap();

        let mut echoed = msg("m1", "a", 5);
        echoed.seen_by.push(Receipt::new("b", 50));
        let update = apply_event(
            &mut view,
            &ConversationEvent::MessageAppended {
                message: echoed.clone(),
            },
        )
        .unwrap();

        assert_eq!(update.changed, vec!["m1".to_string()]);
        assert!(update.seen_dates_changed);
        assert_eq!(view.seen_dates.get("b"), 50);
        let m1 = view.descriptor("m1").unwrap();
        assert!(m1.message.sent);
        assert_eq!(m1.message.sent_at, 5);
        assert_eq!(m1.status, DeliveryStatus::Seen);

        let update = apply_event(&mut view, &ConversationEvent::MessageAppended { message: echoed })
            .unwrap();
        assert!(update.is_noop());
    }

    #[test]
    fn test_retained_seen_dates_never_regress() {
        let mut m1 = msg("m1", "a", 1);
        m1.seen_by.push(Receipt::new("b", 200));
        let mut m2 = msg("m2", "a", 2);
        m2.seen_by.push(Receipt::new("b", 100));
        let mut view = project(&conversation(vec![m1, m2]), "a").unwrap();
        assert_eq!(view.seen_dates.get("b"), 100);
        assert_eq!(view.descriptor("m1").unwrap().status, DeliveryStatus::Seen);

        let mut earlier = SeenDates::default();
        earlier.advance("b", 200);
        earlier.advance("mallory", 999);
        let update = view.retain_seen_dates(&earlier);

        assert!(update.seen_dates_changed);
        assert_eq!(view.seen_dates.get("b"), 200);
        assert_eq!(view.seen_dates.get("mallory"), 0);
        assert_eq!(update.changed, vec!["m1".to_string()]);
        assert_eq!(view.descriptor("m1").unwrap().status, DeliveryStatus::None);
        assert_eq!(view.descriptor("m2").unwrap().status, DeliveryStatus::Seen);

        assert!(view.retain_seen_dates(&earlier).is_noop());
    }

    #[test]
    fn test_send_acknowledgement() {
        let mut pending = msg("m1", "a", 1);
        pending.sent = false;
        let mut view = project(&conversation(vec![pending]), "a").unwrap();
        assert_eq!(view.descriptors[0].status, DeliveryStatus::Sending);

        let update = apply_event(
            &mut view,
            &ConversationEvent::MessageSent {
                conversation_id: "c1".to_string(),
                message_id: "m1".to_string(),
                sent_at: Some(7),
            },
        )
        .unwrap();
        assert_eq!(update.changed, vec!["m1".to_string()]);
        assert_eq!(view.descriptors[0].status, DeliveryStatus::Sent);
        assert_eq!(view.descriptors[0].display_timestamp, 7);
    }

    #[test]
    fn test_newer_baseline_reaches_messages_outside_window() {
        // m1 sits behind m2 in a seen run; once the peer sees m4 the baseline
        // moves past both, and m1 is neither m4 nor its predecessor
        let mut m1 = msg("m1", "a", 1);
        m1.seen_by.push(Receipt::new("b", 100));
        let mut m2 = msg("m2", "a", 2);
        m2.seen_by.push(Receipt::new("b", 100));
        let m3 = msg("m3", "b", 3);
        let m4 = msg("m4", "a", 4);
        let mut view = project(&conversation(vec![m1, m2, m3, m4]), "a").unwrap();
        assert_eq!(view.descriptor("m1").unwrap().status, DeliveryStatus::None);

        let update = apply_event(&mut view, &seen("m4", 200)).unwrap();
        assert!(update.seen_dates_changed);
        assert!(update.changed.contains(&"m1".to_string()));
        assert_eq!(view.descriptor("m1").unwrap().status, DeliveryStatus::Seen);

        let full = project(&view.to_conversation(), "a").unwrap();
        assert_eq!(view.descriptors, full.descriptors);
        assert_eq!(view.seen_dates, full.seen_dates);
    }
}
