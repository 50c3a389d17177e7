use serde::{Deserialize, Serialize};

use crate::Address;

/// Conversation identifier for the join negotiation.
pub const JOIN_TABLE: &str = "join-table";
/// Conversation identifier for turn grants, table to player.
pub const TABLE_TO_PLAYER_TURN: &str = "table-to-player";
/// Conversation identifier for turn reports, player to table.
pub const PLAYER_TO_TABLE_TURN: &str = "player-to-table";
/// Directory service type under which tables advertise themselves.
pub const BLACKJACK_SERVICE: &str = "blackjack-game";

/// The speech-act tag on a message, determining how a state machine
/// interprets its content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Performative {
    /// Call for proposals: a player looking for a table to join.
    Cfp,
    /// A table offering the player a seat.
    Propose,
    /// The player committing to one table's offer.
    AcceptProposal,
    /// A table turning the player away.
    Refuse,
    /// Confirmation or payload-bearing notification (join confirmed,
    /// turn grant, turn report).
    Inform,
    /// A pure status update (e.g. queue position); never a transition.
    InformRef,
}

/// One message on the wire.
///
/// The `conversation_id` groups all messages of one logical exchange; the
/// `reply_with` key is echoed by repliers so the sender can correlate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub performative: Performative,
    pub conversation_id: String,
    pub sender: Address,
    pub receiver: Address,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub reply_with: Option<String>,
}

impl Envelope {
    /// Builds a reply threaded onto this message: addresses swapped, the
    /// original `reply_with` key echoed back.
    pub fn reply(
        &self,
        performative: Performative,
        conversation_id: &str,
        content: impl Into<String>,
    ) -> Envelope {
        Envelope {
            performative,
            conversation_id: conversation_id.to_owned(),
            sender: self.receiver.clone(),
            receiver: self.sender.clone(),
            content: content.into(),
            reply_with: self.reply_with.clone(),
        }
    }
}

/// A receive filter: the conjunction of whichever fields are set.
#[derive(Clone, Debug, Default)]
pub struct MessageTemplate {
    conversation_id: Option<String>,
    performative: Option<Performative>,
}

impl MessageTemplate {
    pub fn match_conversation_id(conversation_id: &str) -> Self {
        Self {
            conversation_id: Some(conversation_id.to_owned()),
            performative: None,
        }
    }

    pub fn match_performative(performative: Performative) -> Self {
        Self {
            conversation_id: None,
            performative: Some(performative),
        }
    }

    pub fn and_conversation_id(mut self, conversation_id: &str) -> Self {
        self.conversation_id = Some(conversation_id.to_owned());
        self
    }

    pub fn matches(&self, envelope: &Envelope) -> bool {
        if let Some(conversation_id) = &self.conversation_id {
            if *conversation_id != envelope.conversation_id {
                return false;
            }
        }
        if let Some(performative) = self.performative {
            if performative != envelope.performative {
                return false;
            }
        }
        true
    }
}
