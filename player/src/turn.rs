use std::sync::mpsc::{self, Receiver, Sender};

use anyhow::Context;
use blackjack::{
    Endpoint, Envelope, MessageTemplate, Performative, SharedDeck, PLAYER_TO_TABLE_TURN,
    TABLE_TO_PLAYER_TURN,
};
use tracing::{debug, info};

use crate::DisplayBridge;

/// Running total at which the turn ends automatically.
pub const ROUND_THRESHOLD: u32 = 21;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnState {
    WaitingForTurn,
    MyTurn,
}

/// An external action taken by the player during their turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnCommand {
    /// Draw another card.
    Hit,
    /// Voluntarily end the turn.
    Stand,
}

/// What one scheduler tick of the turn machine amounted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// No grant arrived; still waiting.
    Idle,
    /// A turn grant arrived and the opening draw was made.
    TurnStarted,
    /// The turn is open, waiting on the player.
    InProgress,
    /// The turn ended and this total was reported to the table.
    Reported { total: u32 },
}

/// The player's side of turn alternation.
///
/// Entry into a turn happens only through an inbound grant message,
/// regardless of any prior ownership state. Player actions arrive on a
/// command channel drained once per tick, so the machine never busy-waits:
/// between ticks control is back with the scheduler, and whoever ends the
/// turn is guaranteed to run.
pub struct TurnMachine {
    state: TurnState,
    points: u32,
    grant: Option<Envelope>,
}

/// Cloneable sender half for external turn actions.
#[derive(Clone)]
pub struct TurnHandle {
    commands: Sender<TurnCommand>,
}

impl TurnHandle {
    pub fn hit(&self) {
        let _ = self.commands.send(TurnCommand::Hit);
    }

    pub fn stand(&self) {
        let _ = self.commands.send(TurnCommand::Stand);
    }
}

/// The command channel between the player's input surface and the machine.
pub fn turn_commands() -> (TurnHandle, Receiver<TurnCommand>) {
    let (tx, rx) = mpsc::channel();
    (TurnHandle { commands: tx }, rx)
}

impl TurnMachine {
    pub fn new() -> Self {
        Self {
            state: TurnState::WaitingForTurn,
            points: 0,
            grant: None,
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    /// One cooperative tick. Never blocks: with no grant and no commands
    /// pending this returns immediately so the scheduler can run others.
    pub fn tick(
        &mut self,
        endpoint: &Endpoint,
        deck: &SharedDeck,
        display: &mut dyn DisplayBridge,
        commands: &Receiver<TurnCommand>,
    ) -> anyhow::Result<TurnOutcome> {
        match self.state {
            TurnState::WaitingForTurn => {
                // No draw may happen outside an active grant: actions sent
                // while waiting are dropped, not queued for the next turn.
                while commands.try_recv().is_ok() {}

                let template = MessageTemplate::match_performative(Performative::Inform)
                    .and_conversation_id(TABLE_TO_PLAYER_TURN);
                let Some(grant) = endpoint.try_recv(&template) else {
                    return Ok(TurnOutcome::Idle);
                };
                info!(table = %grant.sender, "Turn granted");
                display.update("Your turn!");
                display.show_table_card(&grant.content);
                self.points = 0;
                self.state = TurnState::MyTurn;
                self.grant = Some(grant);

                // The opening draw happens without an explicit request.
                self.draw(deck, display)?;
                if self.points >= ROUND_THRESHOLD {
                    return self.finish(endpoint, display);
                }
                Ok(TurnOutcome::TurnStarted)
            }
            TurnState::MyTurn => {
                loop {
                    match commands.try_recv() {
                        Ok(TurnCommand::Hit) => {
                            self.draw(deck, display)?;
                            if self.points >= ROUND_THRESHOLD {
                                return self.finish(endpoint, display);
                            }
                        }
                        Ok(TurnCommand::Stand) => return self.finish(endpoint, display),
                        Err(_) => break,
                    }
                }
                Ok(TurnOutcome::InProgress)
            }
        }
    }

    fn draw(&mut self, deck: &SharedDeck, display: &mut dyn DisplayBridge) -> anyhow::Result<()> {
        let card = deck.draw_top().context("drawing a card for the turn")?;
        self.points += u32::from(card.real_value());
        debug!(card = %card, points = self.points, "Drew a card");
        display.show_own_card(&card.to_string());
        Ok(())
    }

    /// Ends the turn: the total is captured here, at the moment ownership
    /// flips, and nothing drawn later can be attributed to this report.
    fn finish(
        &mut self,
        endpoint: &Endpoint,
        display: &mut dyn DisplayBridge,
    ) -> anyhow::Result<TurnOutcome> {
        let total = self.points;
        let grant = self
            .grant
            .take()
            .context("turn ended without an active grant")?;
        endpoint.send(grant.reply(
            Performative::Inform,
            PLAYER_TO_TABLE_TURN,
            total.to_string(),
        ));
        info!(total, "Turn over, total reported to the table");
        display.update("Waiting for the next turn...");
        self.state = TurnState::WaitingForTurn;
        Ok(TurnOutcome::Reported { total })
    }
}

impl Default for TurnMachine {
    fn default() -> Self {
        Self::new()
    }
}
