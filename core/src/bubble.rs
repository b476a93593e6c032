/// Bubble grouping of consecutive same-sender messages
use crate::messenger_types::Message;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BubblePosition {
    Isolated,
    First,
    Middle,
    Last,
}

/// A message's immediate neighbours in stored order
#[derive(Debug, Clone, Copy)]
pub struct Neighbors<'a> {
    pub before: Option<&'a Message>,
    pub after: Option<&'a Message>,
}

impl<'a> Neighbors<'a> {
    pub fn at(messages: &'a [Message], index: usize) -> Self {
        Self {
            before: index.checked_sub(1).and_then(|i| messages.get(i)),
            after: messages.get(index + 1),
        }
    }
}

pub fn position(message: &Message, neighbors: Neighbors<'_>) -> BubblePosition {
    let joins_before = neighbors.before.is_some_and(|b| b.same_sender(message));
    let joins_after = neighbors.after.is_some_and(|a| a.same_sender(message));
    match (joins_before, joins_after) {
        (true, true) => BubblePosition::Middle,
        (true, false) => BubblePosition::Last,
        (false, true) => BubblePosition::First,
        (false, false) => BubblePosition::Isolated,
    }
}

/// Position of `messages[index]` within its same-sender run.
///
/// # Panics
/// If `index` is out of bounds.
pub fn classify(messages: &[Message], index: usize) -> BubblePosition {
    position(&messages[index], Neighbors::at(messages, index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(senders: &[&str]) -> Vec<Message> {
        senders
            .iter()
            .enumerate()
            .map(|(i, s)| Message::new(format!("m{}", i), "c1", *s, None, i as u64))
            .collect()
    }

    #[test]
    fn test_single_message_is_isolated() {
        let msgs = thread(&["a"]);
        assert_eq!(classify(&msgs, 0), BubblePosition::Isolated);
    }

    #[test]
    fn test_runs() {
        let msgs = thread(&["a", "a", "a", "b", "a", "b", "b"]);
        let got: Vec<_> = (0..msgs.len()).map(|i| classify(&msgs, i)).collect();
        assert_eq!(
            got,
            vec![
                BubblePosition::First,
                BubblePosition::Middle,
                BubblePosition::Last,
                BubblePosition::Isolated,
                BubblePosition::Isolated,
                BubblePosition::First,
                BubblePosition::Last,
            ]
        );
    }

    #[test]
    fn test_sender_only_ignores_timestamps() {
        let mut msgs = thread(&["a", "a"]);
        msgs[1].sent_at = 10_000_000;
        assert_eq!(classify(&msgs, 0), BubblePosition::First);
        assert_eq!(classify(&msgs, 1), BubblePosition::Last);
    }
}
