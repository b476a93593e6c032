/// Seen-date tracking: the newest seen timestamp per participant
use crate::messenger_types::{Message, Participant, ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Participant → timestamp of the newest message they are known to have seen
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeenDates(BTreeMap<ParticipantId, Timestamp>);

impl SeenDates {
    /// Baseline for `user_id`; `0` when they never saw anything
    pub fn get(&self, user_id: &str) -> Timestamp {
        self.0.get(user_id).copied().unwrap_or(0)
    }

    /// Move `user_id`'s baseline forward. Never regresses; returns the previous
    /// value when it moved.
    pub fn advance(&mut self, user_id: &str, timestamp: Timestamp) -> Option<Timestamp> {
        let entry = self.0.entry(user_id.to_string()).or_insert(0);
        if timestamp > *entry {
            let previous = *entry;
            *entry = timestamp;
            Some(previous)
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &Timestamp)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Walk the history from the tail and record, per participant, the first seen
/// receipt met. Stops as soon as every participant is resolved.
pub fn compute_seen_dates(participants: &[Participant], messages: &[Message]) -> SeenDates {
    let mut dates = BTreeMap::new();
    let mut unresolved: HashSet<&str> = HashSet::with_capacity(participants.len());
    for p in participants {
        dates.insert(p.id.clone(), 0);
        unresolved.insert(p.id.as_str());
    }

    let mut idx = messages.len();
    while idx > 0 && !unresolved.is_empty() {
        idx -= 1;
        for receipt in &messages[idx].seen_by {
            if unresolved.remove(receipt.user_id.as_str()) {
                dates.insert(receipt.user_id.clone(), receipt.timestamp);
            }
        }
    }

    SeenDates(dates)
}
