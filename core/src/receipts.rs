/// Receipt reduction: which of a message's receipts matter for the peer
use crate::messenger_types::{Message, Receipt, ReceiptKind};

/// The peer's receipts on one message, if any arrived yet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerReceipts<'a> {
    pub seen: Option<&'a Receipt>,
    pub delivered: Option<&'a Receipt>,
}

/// First receipt of `kind` from `peer`, in the order the backend reported them
pub fn first_receipt<'a>(message: &'a Message, kind: ReceiptKind, peer: &str) -> Option<&'a Receipt> {
    message.receipts(kind).iter().find(|r| r.user_id == peer)
}

pub fn reduce<'a>(message: &'a Message, peer: &str) -> PeerReceipts<'a> {
    PeerReceipts {
        seen: first_receipt(message, ReceiptKind::Seen, peer),
        delivered: first_receipt(message, ReceiptKind::Delivered, peer),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> Message {
        Message::new("m1", "c1", "alice", Some("hi".into()), 10)
    }

    #[test]
    fn test_no_receipts_is_pending() {
        let msg = message();
        let r = reduce(&msg, "bob");
        assert!(r.seen.is_none());
        assert!(r.delivered.is_none());
    }

    #[test]
    fn test_first_entry_wins_regardless_of_time() {
        let mut msg = message();
        msg.delivered_to = vec![Receipt::new("bob", 300), Receipt::new("bob", 200)];
        msg.seen_by = vec![Receipt::new("carol", 50), Receipt::new("bob", 400)];

        let r = reduce(&msg, "bob");
        assert_eq!(r.delivered.map(|d| d.timestamp), Some(300));
        assert_eq!(r.seen.map(|s| s.timestamp), Some(400));
    }
}
