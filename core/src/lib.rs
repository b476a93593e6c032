/// chatview - conversation read-state and message-presentation engine
///
/// Derives per-message delivery/seen status, bubble grouping and per-participant
/// seen dates from a conversation snapshot, then keeps them current as messages
/// and receipts stream in.

pub mod error;
pub mod config;
pub mod messenger_types;
pub mod receipts;
pub mod seen_dates;
pub mod bubble;
pub mod delivery;
pub mod projector;
pub mod hub;
pub mod snapshot;
pub mod cli_app;

pub use error::{ChatViewError, EventRejection, Result};
pub use config::Config;
pub use messenger_types::{
    Attachment, AttachmentKind, Conversation, ConversationEvent, ConversationKind, Message,
    Participant, Receipt, ReceiptKind, Timestamp,
};
pub use bubble::{classify, BubblePosition};
pub use delivery::{resolve, Delivery, DeliveryStatus};
pub use seen_dates::{compute_seen_dates, SeenDates};
pub use projector::{apply_event, project, DerivedView, MessageView, ViewUpdate};
pub use hub::{ConversationHub, HubEvent};
