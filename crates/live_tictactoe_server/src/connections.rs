//! Open streams per participant.
//!
//! One participant can watch a game from several tabs. The participant only
//! counts as disconnected once the last of its streams closes.

use crate::bus::ListenerId;
use live_tictactoe::ParticipantId;
use std::collections::{BTreeSet, HashMap};

/// Participant id → open listener ids, for one game.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    open: HashMap<ParticipantId, BTreeSet<ListenerId>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly opened stream.
    pub fn open(&mut self, participant: ParticipantId, listener: ListenerId) {
        self.open.entry(participant).or_default().insert(listener);
    }

    /// Records a closed stream. Returns `true` if it was the participant's last.
    pub fn close(&mut self, participant: &ParticipantId, listener: ListenerId) -> bool {
        let Some(listeners) = self.open.get_mut(participant) else {
            return false;
        };
        listeners.remove(&listener);
        if listeners.is_empty() {
            self.open.remove(participant);
            return true;
        }
        false
    }

    /// Open streams for a participant.
    pub fn count(&self, participant: &ParticipantId) -> usize {
        self.open.get(participant).map_or(0, BTreeSet::len)
    }

    /// Participants with at least one open stream.
    pub fn connected(&self) -> usize {
        self.open.len()
    }
}
