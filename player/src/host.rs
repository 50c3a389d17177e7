use std::time::{Duration, Instant};

use anyhow::Context;
use blackjack::{
    Address, Card, Endpoint, Envelope, MessageTemplate, Performative, Router, BLACKJACK_SERVICE,
    JOIN_TABLE, PLAYER_TO_TABLE_TURN, TABLE_TO_PLAYER_TURN,
};
use tracing::info;

/// What the table learned from one seated player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableReport {
    pub player_name: String,
    pub total: u32,
}

/// A minimal scripted table: enough of the host side of the protocol to
/// seat one player and run one turn. A demo and test collaborator, not a
/// rules engine.
pub struct ScriptedTable {
    endpoint: Endpoint,
    table_card: Card,
}

impl ScriptedTable {
    /// Creates the table and advertises it in the directory.
    pub fn new(router: &Router, name: &str, table_card: Card) -> Self {
        let endpoint = router.endpoint(name);
        endpoint.register(BLACKJACK_SERVICE);
        Self {
            endpoint,
            table_card,
        }
    }

    pub fn address(&self) -> &Address {
        self.endpoint.address()
    }

    /// Answers one player's call for proposals, confirms the join, grants
    /// the turn with the table's visible card, and collects the report.
    ///
    /// Polls its mailbox every `poll` and gives up after `patience`.
    pub fn seat_one_player(&self, poll: Duration, patience: Duration) -> anyhow::Result<TableReport> {
        let cfp = self.wait_for(
            &MessageTemplate::match_performative(Performative::Cfp)
                .and_conversation_id(JOIN_TABLE),
            poll,
            patience,
        )?;
        self.endpoint
            .send(cfp.reply(Performative::Propose, JOIN_TABLE, "seat open"));

        let accept = self.wait_for(
            &MessageTemplate::match_performative(Performative::AcceptProposal)
                .and_conversation_id(JOIN_TABLE),
            poll,
            patience,
        )?;
        let player_name = accept.content.clone();
        info!(player = %player_name, "Seating player");
        self.endpoint
            .send(accept.reply(Performative::Inform, JOIN_TABLE, "welcome to the table"));

        self.endpoint.send(Envelope {
            performative: Performative::Inform,
            conversation_id: TABLE_TO_PLAYER_TURN.to_owned(),
            sender: self.endpoint.address().clone(),
            receiver: accept.sender.clone(),
            content: self.table_card.to_string(),
            reply_with: Some("turn-report".to_owned()),
        });

        let report = self.wait_for(
            &MessageTemplate::match_performative(Performative::Inform)
                .and_conversation_id(PLAYER_TO_TABLE_TURN),
            poll,
            patience,
        )?;
        let total = report
            .content
            .parse()
            .with_context(|| format!("unreadable turn report {:?}", report.content))?;
        info!(player = %player_name, total, "Turn report received");
        Ok(TableReport { player_name, total })
    }

    fn wait_for(
        &self,
        template: &MessageTemplate,
        poll: Duration,
        patience: Duration,
    ) -> anyhow::Result<Envelope> {
        let deadline = Instant::now() + patience;
        loop {
            if let Some(message) = self.endpoint.try_recv(template) {
                return Ok(message);
            }
            if Instant::now() >= deadline {
                anyhow::bail!("table {} gave up waiting for the player", self.address());
            }
            std::thread::sleep(poll);
        }
    }
}
