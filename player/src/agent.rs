use std::sync::mpsc::Receiver;

use blackjack::{Address, Endpoint, SharedDeck};
use tracing::debug;

use crate::{
    turn_commands, DisplayBridge, JoinOutcome, Negotiation, ReplyBoundPolicy, TurnCommand,
    TurnHandle, TurnMachine, TurnOutcome,
};

pub struct AgentConfig {
    pub name: String,
    pub reply_bound_policy: ReplyBoundPolicy,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply_bound_policy: ReplyBoundPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Searching,
    Playing,
    Done,
}

/// What one scheduler tick of the whole agent amounted to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Nothing to do this tick.
    Waiting,
    /// The join attempt failed; the agent is done.
    NoHostFound,
    /// The join attempt resolved to this table.
    Joined { table: Address },
    /// A turn grant arrived and the opening draw was made.
    TurnStarted,
    /// The turn is open, waiting on the player.
    TurnInProgress,
    /// A turn finished with this reported total.
    TurnReported { total: u32 },
}

/// One participant: a single cooperative actor advancing whichever state
/// machine is active, exactly one non-blocking tick per [`step`].
///
/// The caller is the scheduler: it decides the tick cadence and must keep
/// calling `step`; the agent itself never sleeps and never spins.
pub struct PlayerAgent {
    endpoint: Endpoint,
    deck: SharedDeck,
    display: Box<dyn DisplayBridge>,
    negotiation: Negotiation,
    turn: TurnMachine,
    commands: Receiver<TurnCommand>,
    phase: Phase,
    table: Option<Address>,
}

impl PlayerAgent {
    /// The returned [`TurnHandle`] is the player's input surface: it can be
    /// handed to whatever drives hit/stand decisions.
    pub fn new(
        config: AgentConfig,
        endpoint: Endpoint,
        deck: SharedDeck,
        display: Box<dyn DisplayBridge>,
    ) -> (Self, TurnHandle) {
        let (handle, commands) = turn_commands();
        let agent = Self {
            endpoint,
            deck,
            display,
            negotiation: Negotiation::new(config.name, config.reply_bound_policy),
            turn: TurnMachine::new(),
            commands,
            phase: Phase::Idle,
            table: None,
        };
        (agent, handle)
    }

    /// The table this agent joined, if the negotiation has resolved.
    pub fn table(&self) -> Option<&Address> {
        self.table.as_ref()
    }

    pub fn step(&mut self) -> anyhow::Result<StepOutcome> {
        match self.phase {
            Phase::Idle => {
                self.display.show();
                self.phase = Phase::Searching;
                match self.negotiation.start(&self.endpoint, self.display.as_mut()) {
                    Some(JoinOutcome::NoHostFound) => {
                        self.phase = Phase::Done;
                        Ok(StepOutcome::NoHostFound)
                    }
                    _ => Ok(StepOutcome::Waiting),
                }
            }
            Phase::Searching => {
                match self.negotiation.poll(&self.endpoint, self.display.as_mut()) {
                    None => Ok(StepOutcome::Waiting),
                    Some(JoinOutcome::NoHostFound) => {
                        self.phase = Phase::Done;
                        Ok(StepOutcome::NoHostFound)
                    }
                    Some(JoinOutcome::Joined { table }) => {
                        debug!(table = %table, "Starting turn machine");
                        self.table = Some(table.clone());
                        self.phase = Phase::Playing;
                        Ok(StepOutcome::Joined { table })
                    }
                }
            }
            Phase::Playing => {
                let outcome = self.turn.tick(
                    &self.endpoint,
                    &self.deck,
                    self.display.as_mut(),
                    &self.commands,
                )?;
                Ok(match outcome {
                    TurnOutcome::Idle => StepOutcome::Waiting,
                    TurnOutcome::TurnStarted => StepOutcome::TurnStarted,
                    TurnOutcome::InProgress => StepOutcome::TurnInProgress,
                    TurnOutcome::Reported { total } => StepOutcome::TurnReported { total },
                })
            }
            Phase::Done => Ok(StepOutcome::Waiting),
        }
    }
}
