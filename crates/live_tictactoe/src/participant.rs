//! Players and spectators attached to a game.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque client identity (the value of the client cookie).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wraps an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrowed form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Anyone attached to a game, player or spectator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new)]
pub struct Participant {
    id: ParticipantId,
    name: String,
    is_player: bool,
    #[new(value = "true")]
    connected: bool,
}

impl Participant {
    /// Identity.
    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Holds one of the two player slots.
    pub fn is_player(&self) -> bool {
        self.is_player
    }

    /// At least one live stream is open for this participant.
    pub fn connected(&self) -> bool {
        self.connected
    }
}

/// Participants in join order.
///
/// Entries are append-only. Leaving only clears `connected`, so a returning
/// client keeps its identity and role.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Participants {
    order: Vec<ParticipantId>,
    by_id: HashMap<ParticipantId, Participant>,
}

impl Participants {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a participant. Returns `false` and keeps the existing entry
    /// if the id is already known.
    pub fn add(&mut self, participant: Participant) -> bool {
        if self.by_id.contains_key(participant.id()) {
            return false;
        }
        self.order.push(participant.id().clone());
        self.by_id.insert(participant.id().clone(), participant);
        true
    }

    /// Looks up a participant.
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.by_id.get(id)
    }

    /// Whether the id has joined before.
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Updates the connection flag, returning the participant if known.
    pub fn set_connected(&mut self, id: &ParticipantId, connected: bool) -> Option<&Participant> {
        let participant = self.by_id.get_mut(id)?;
        participant.connected = connected;
        Some(participant)
    }

    /// Number of participants ever joined.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True if nobody has joined.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// All participants in join order.
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// Non-players in join order.
    pub fn spectators(&self) -> impl Iterator<Item = &Participant> {
        self.iter().filter(|p| !p.is_player())
    }
}
