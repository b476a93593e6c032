/// Delivery-status resolution for a single message
use crate::bubble::Neighbors;
use crate::messenger_types::{Message, ReceiptKind, Timestamp};
use crate::receipts::{first_receipt, reduce};
use crate::seen_dates::SeenDates;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Sending,
    Sent,
    Delivered,
    Seen,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub status: DeliveryStatus,
    pub display_timestamp: Timestamp,
}

impl Delivery {
    fn new(status: DeliveryStatus, display_timestamp: Timestamp) -> Self {
        Self {
            status,
            display_timestamp,
        }
    }
}

/// Indicator for `message` as shown to the viewer, whose single counterpart is `peer`.
///
/// Rules are checked in order; the first that applies decides:
/// incoming, optimistic, seen by the peer, delivered to the peer, sent.
/// A seen indicator is suppressed when the peer's baseline sits on this
/// message and the very next message, from the same sender, was seen too.
pub fn resolve(
    message: &Message,
    neighbors: Neighbors<'_>,
    incoming: bool,
    peer: &str,
    seen_dates: &SeenDates,
) -> Delivery {
    if incoming {
        let status = match neighbors.after {
            Some(_) => DeliveryStatus::None,
            None => DeliveryStatus::Seen,
        };
        return Delivery::new(status, message.sent_at);
    }

    if !message.sent {
        return Delivery::new(DeliveryStatus::Sending, message.sent_at);
    }

    let receipts = reduce(message, peer);

    if let Some(sb) = receipts.seen {
        let run_continues_seen = neighbors.after.is_some_and(|after| {
            after.same_sender(message) && first_receipt(after, ReceiptKind::Seen, peer).is_some()
        });
        let status = if sb.timestamp == seen_dates.get(peer) && run_continues_seen {
            DeliveryStatus::None
        } else {
            DeliveryStatus::Seen
        };
        return Delivery::new(status, sb.timestamp);
    }

    if let Some(dt) = receipts.delivered {
        return Delivery::new(DeliveryStatus::Delivered, dt.timestamp);
    }

    Delivery::new(DeliveryStatus::Sent, message.sent_at)
}

/// Incoming avatars sit on the last bubble of a same-sender run
pub fn show_avatar(message: &Message, after: Option<&Message>, incoming: bool) -> bool {
    incoming && !after.is_some_and(|a| a.same_sender(message))
}

/// Outgoing messages always carry an indicator; incoming ones only at the tail
pub fn show_delivery_status(after: Option<&Message>, incoming: bool) -> bool {
    !incoming || after.is_none()
}
