/// Shared types for the conversation engine
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seen_dates::SeenDates;

/// Milliseconds since the Unix epoch. `0` doubles as the "never" baseline.
pub type Timestamp = u64;

pub type ParticipantId = String;
pub type MessageId = String;
pub type ConversationId = String;

/// Profile photo URLs at the sizes the backend serves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub small: Option<String>,
}

/// A member of a conversation. Only `id` takes part in derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo: Option<Photo>,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>) -> Self {
        Self {
            id: id.into(),
            username: None,
            name: None,
            photo: None,
        }
    }

    /// Best label for display: name, then username, then the raw id
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or(&self.id)
    }
}

/// Acknowledgement that `user_id` received or saw a message at `timestamp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub user_id: ParticipantId,
    pub timestamp: Timestamp,
}

impl Receipt {
    pub fn new(user_id: impl Into<ParticipantId>, timestamp: Timestamp) -> Self {
        Self {
            user_id: user_id.into(),
            timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptKind {
    Delivered,
    Seen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
}

fn acknowledged() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: ParticipantId,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub sent_at: Timestamp,
    #[serde(default)]
    pub delivered_to: Vec<Receipt>,
    #[serde(default)]
    pub seen_by: Vec<Receipt>,
    /// False while a locally created message waits for the backend
    #[serde(default = "acknowledged")]
    pub sent: bool,
}

impl Message {
    /// Build an acknowledged text message with no receipts
    pub fn new(
        id: impl Into<MessageId>,
        conversation_id: impl Into<ConversationId>,
        sender_id: impl Into<ParticipantId>,
        text: Option<String>,
        sent_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            text,
            attachments: Vec::new(),
            sent_at,
            delivered_to: Vec::new(),
            seen_by: Vec::new(),
            sent: true,
        }
    }

    /// Locally composed message shown before the backend acknowledges it.
    /// Gets a `local-<uuid>` id and the current wall-clock time.
    pub fn optimistic(
        conversation_id: impl Into<ConversationId>,
        sender_id: impl Into<ParticipantId>,
        text: Option<String>,
        attachments: Vec<Attachment>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp_millis().max(0) as Timestamp;
        Self {
            id: format!("local-{}", Uuid::new_v4()),
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            text,
            attachments,
            sent_at: now,
            delivered_to: Vec::new(),
            seen_by: Vec::new(),
            sent: false,
        }
    }

    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender_id == user_id
    }

    pub fn same_sender(&self, other: &Message) -> bool {
        self.sender_id == other.sender_id
    }

    pub fn has_media(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn receipts(&self, kind: ReceiptKind) -> &[Receipt] {
        match kind {
            ReceiptKind::Delivered => &self.delivered_to,
            ReceiptKind::Seen => &self.seen_by,
        }
    }

    /// Merge a receipt into the matching list.
    ///
    /// A user keeps a single entry per list: an older or equal timestamp is a
    /// no-op, a newer one overwrites in place. Returns whether anything changed.
    pub fn merge_receipt(&mut self, kind: ReceiptKind, receipt: Receipt) -> bool {
        let list = match kind {
            ReceiptKind::Delivered => &mut self.delivered_to,
            ReceiptKind::Seen => &mut self.seen_by,
        };
        match list.iter_mut().find(|r| r.user_id == receipt.user_id) {
            Some(existing) if existing.timestamp >= receipt.timestamp => false,
            Some(existing) => {
                existing.timestamp = receipt.timestamp;
                true
            }
            None => {
                list.push(receipt);
                true
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationKind {
    #[default]
    OneToOne,
    Group,
}

/// Conversation snapshot as handed over by the transport layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, rename = "type")]
    pub kind: ConversationKind,
    /// Derived; whatever the snapshot carries is recomputed on projection
    #[serde(default)]
    pub seen_dates: SeenDates,
}

impl Conversation {
    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.id == user_id)
    }

    /// The other side of the conversation as seen from `viewer_id`
    pub fn peer_of(&self, viewer_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id != viewer_id)
    }
}

/// Incremental changes streamed for a single conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationEvent {
    /// A message arrived or was composed locally
    MessageAppended { message: Message },
    /// A participant received or saw an existing message
    ReceiptAdded {
        conversation_id: ConversationId,
        message_id: MessageId,
        kind: ReceiptKind,
        receipt: Receipt,
    },
    /// The backend acknowledged an optimistic message
    MessageSent {
        conversation_id: ConversationId,
        message_id: MessageId,
        #[serde(default)]
        sent_at: Option<Timestamp>,
    },
}

impl ConversationEvent {
    pub fn conversation_id(&self) -> &str {
        match self {
            ConversationEvent::MessageAppended { message } => &message.conversation_id,
            ConversationEvent::ReceiptAdded {
                conversation_id, ..
            }
            | ConversationEvent::MessageSent {
                conversation_id, ..
            } => conversation_id,
        }
    }
}
