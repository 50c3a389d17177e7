use std::collections::BTreeSet;

use blackjack::{
    Address, Endpoint, Envelope, MessageTemplate, Performative, BLACKJACK_SERVICE, JOIN_TABLE,
};
use tracing::{debug, info};

use crate::DisplayBridge;

/// Reply key stamped on the outgoing call-for-proposals.
const CFP_REPLY_KEY: &str = "table-reply";

/// What happens once the number of distinct repliers reaches the size of
/// the candidate set without the negotiation having resolved.
///
/// `Advisory` stops expecting further proposals (an uncommitted attempt ends
/// as no-host-found) but a committed attempt keeps polling and still honors
/// a late confirmation. `HardStop` halts polling outright, committed or not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReplyBoundPolicy {
    #[default]
    Advisory,
    HardStop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    Discovering,
    AwaitingReplies,
    Joined,
    NoHostFound,
}

/// Terminal result of one join attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined { table: Address },
    NoHostFound,
}

/// The join negotiation: discover tables, call for proposals, commit to the
/// first table that proposes, wait for its confirmation.
///
/// Driven one non-blocking [`poll`](Negotiation::poll) per scheduler tick.
/// There is no automatic retry; a fresh attempt is a fresh
/// [`start`](Negotiation::start).
pub struct Negotiation {
    player_name: String,
    policy: ReplyBoundPolicy,
    state: NegotiationState,
    candidates: Vec<Address>,
    seen_replies: Vec<Envelope>,
    committed_to: Option<Address>,
}

impl Negotiation {
    pub fn new(player_name: impl Into<String>, policy: ReplyBoundPolicy) -> Self {
        Self {
            player_name: player_name.into(),
            policy,
            state: NegotiationState::Idle,
            candidates: Vec::new(),
            seen_replies: Vec::new(),
            committed_to: None,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    /// Every reply observed during this attempt, in arrival order.
    pub fn seen_replies(&self) -> &[Envelope] {
        &self.seen_replies
    }

    /// Discovers candidate tables and broadcasts the call for proposals.
    ///
    /// An empty directory result is a normal outcome: the attempt resolves
    /// to no-host-found right away, without sending anything.
    pub fn start(
        &mut self,
        endpoint: &Endpoint,
        display: &mut dyn DisplayBridge,
    ) -> Option<JoinOutcome> {
        self.state = NegotiationState::Discovering;
        display.update("Looking for open tables...");
        let candidates = endpoint.search(BLACKJACK_SERVICE);
        debug!(candidates = candidates.len(), "Directory search finished");
        if candidates.is_empty() {
            return Some(self.give_up(display));
        }
        self.candidates = candidates;
        endpoint.broadcast(
            &self.candidates,
            Performative::Cfp,
            JOIN_TABLE,
            CFP_REPLY_KEY,
            "looking for a table",
        );
        self.state = NegotiationState::AwaitingReplies;
        None
    }

    /// One polling tick: handle at most one reply from the join
    /// conversation. Returns `None` while the attempt is still open.
    pub fn poll(
        &mut self,
        endpoint: &Endpoint,
        display: &mut dyn DisplayBridge,
    ) -> Option<JoinOutcome> {
        if self.state != NegotiationState::AwaitingReplies {
            return None;
        }
        let template = MessageTemplate::match_conversation_id(JOIN_TABLE);
        let Some(reply) = endpoint.try_recv(&template) else {
            return self.enforce_reply_bound(display);
        };
        self.seen_replies.push(reply.clone());
        match reply.performative {
            Performative::Propose => {
                if self.committed_to.is_none() {
                    let table = reply.sender.clone();
                    display.update(&format!("Trying to join table {}", table));
                    endpoint.send(reply.reply(
                        Performative::AcceptProposal,
                        JOIN_TABLE,
                        self.player_name.clone(),
                    ));
                    self.committed_to = Some(table);
                } else {
                    // Already committed; later proposals are recorded but ignored.
                    debug!(table = %reply.sender, "Ignoring proposal, already committed");
                }
                None
            }
            Performative::Inform => {
                let table = reply.sender.clone();
                info!(table = %table, "Join confirmed");
                display.dispose();
                display.show();
                self.state = NegotiationState::Joined;
                Some(JoinOutcome::Joined { table })
            }
            Performative::InformRef => {
                // Pure status update, forwarded verbatim. No transition,
                // and no effect on the termination bound: a table saying
                // "you are queued" has not answered the call.
                display.update(&reply.content);
                None
            }
            _ => {
                // Anything else counts as a refusal of this player.
                debug!(table = %reply.sender, performative = ?reply.performative, "Refused");
                display.update("No table available.");
                self.enforce_reply_bound(display)
            }
        }
    }

    /// The termination guard: once every candidate has replied and the
    /// attempt has not resolved, stop waiting for proposals. Whether a
    /// committed attempt keeps waiting for its confirmation is the
    /// [`ReplyBoundPolicy`].
    fn enforce_reply_bound(&mut self, display: &mut dyn DisplayBridge) -> Option<JoinOutcome> {
        let distinct_repliers: BTreeSet<&Address> = self
            .seen_replies
            .iter()
            .filter(|r| r.performative != Performative::InformRef)
            .map(|r| &r.sender)
            .collect();
        if distinct_repliers.len() < self.candidates.len() {
            return None;
        }
        match (self.committed_to.is_some(), self.policy) {
            (true, ReplyBoundPolicy::Advisory) => None,
            (true, ReplyBoundPolicy::HardStop) => {
                debug!("Reply bound reached with accept outstanding, halting");
                Some(self.give_up(display))
            }
            (false, _) => Some(self.give_up(display)),
        }
    }

    fn give_up(&mut self, display: &mut dyn DisplayBridge) -> JoinOutcome {
        display.update("No table available.");
        self.state = NegotiationState::NoHostFound;
        JoinOutcome::NoHostFound
    }
}

#[cfg(test)]
mod tests {
    use blackjack::Router;

    use super::*;
    use crate::test_support::RecordingDisplay;

    fn cfp_from(table: &Endpoint) -> Envelope {
        table
            .try_recv(&MessageTemplate::match_conversation_id(JOIN_TABLE))
            .expect("expected a CFP in the table's mailbox")
    }

    fn setup(num_tables: usize) -> (Router, Endpoint, Vec<Endpoint>, Negotiation) {
        let router = Router::new();
        let alice = router.endpoint("alice");
        let tables: Vec<Endpoint> = (1..=num_tables)
            .map(|i| {
                let table = router.endpoint(&format!("table-{i}"));
                table.register(BLACKJACK_SERVICE);
                table
            })
            .collect();
        let negotiation = Negotiation::new("alice", ReplyBoundPolicy::Advisory);
        (router, alice, tables, negotiation)
    }

    #[test]
    fn empty_candidate_set_resolves_without_sending() {
        let router = Router::new();
        let alice = router.endpoint("alice");
        let bystander = router.endpoint("bystander");
        let mut display = RecordingDisplay::default();
        let mut negotiation = Negotiation::new("alice", ReplyBoundPolicy::Advisory);

        let outcome = negotiation.start(&alice, &mut display);

        assert_eq!(outcome, Some(JoinOutcome::NoHostFound));
        assert_eq!(negotiation.state(), NegotiationState::NoHostFound);
        assert!(bystander
            .try_recv(&MessageTemplate::match_conversation_id(JOIN_TABLE))
            .is_none());
        assert!(display.updates.iter().any(|t| t.contains("No table")));
    }

    #[test]
    fn first_proposer_wins_and_gets_the_only_accept() {
        let (_router, alice, tables, mut negotiation) = setup(3);
        let mut display = RecordingDisplay::default();

        assert!(negotiation.start(&alice, &mut display).is_none());
        for table in &tables {
            let cfp = cfp_from(table);
            table.send(cfp.reply(Performative::Propose, JOIN_TABLE, "seat open"));
        }

        // Drain all three proposals; only the first may be accepted.
        for _ in 0..3 {
            assert!(negotiation.poll(&alice, &mut display).is_none());
        }

        let accept_template = MessageTemplate::match_performative(Performative::AcceptProposal);
        let accept = tables[0].try_recv(&accept_template).unwrap();
        assert_eq!(accept.content, "alice");
        assert!(tables[1].try_recv(&accept_template).is_none());
        assert!(tables[2].try_recv(&accept_template).is_none());

        // Confirmation from the committed table resolves the attempt.
        tables[0].send(accept.reply(Performative::Inform, JOIN_TABLE, "welcome"));
        assert_eq!(
            negotiation.poll(&alice, &mut display),
            Some(JoinOutcome::Joined {
                table: tables[0].address().clone()
            })
        );
        assert!(display.disposed);
        assert!(display.shown);
    }

    #[test]
    fn refusal_ahead_in_the_queue_does_not_preempt_a_proposal() {
        // Scenario: table-2 refuses before table-1 proposes, and the refusal
        // sits first in the receive queue. The machine must still commit to
        // the first proposal, not the first reply overall.
        let (_router, alice, tables, mut negotiation) = setup(2);
        let mut display = RecordingDisplay::default();

        assert!(negotiation.start(&alice, &mut display).is_none());
        let cfp_1 = cfp_from(&tables[0]);
        let cfp_2 = cfp_from(&tables[1]);
        tables[1].send(cfp_2.reply(Performative::Refuse, JOIN_TABLE, "table full"));
        tables[0].send(cfp_1.reply(Performative::Propose, JOIN_TABLE, "seat open"));

        assert!(negotiation.poll(&alice, &mut display).is_none()); // refusal
        assert!(negotiation.poll(&alice, &mut display).is_none()); // proposal

        let accept_template = MessageTemplate::match_performative(Performative::AcceptProposal);
        assert!(tables[0].try_recv(&accept_template).is_some());
        assert!(tables[1].try_recv(&accept_template).is_none());
        assert_eq!(negotiation.seen_replies().len(), 2);
    }

    #[test]
    fn all_refusals_end_the_attempt() {
        let (_router, alice, tables, mut negotiation) = setup(2);
        let mut display = RecordingDisplay::default();

        assert!(negotiation.start(&alice, &mut display).is_none());
        for table in &tables {
            let cfp = cfp_from(table);
            table.send(cfp.reply(Performative::Refuse, JOIN_TABLE, "table full"));
        }

        assert!(negotiation.poll(&alice, &mut display).is_none());
        assert_eq!(
            negotiation.poll(&alice, &mut display),
            Some(JoinOutcome::NoHostFound)
        );
        assert_eq!(negotiation.state(), NegotiationState::NoHostFound);
    }

    #[test]
    fn status_updates_are_forwarded_without_a_transition() {
        // A single candidate sending a queue-position update must not end
        // the attempt: status is not an answer to the call.
        let (_router, alice, tables, mut negotiation) = setup(1);
        let mut display = RecordingDisplay::default();

        assert!(negotiation.start(&alice, &mut display).is_none());
        let cfp = cfp_from(&tables[0]);
        tables[0].send(cfp.reply(
            Performative::InformRef,
            JOIN_TABLE,
            "You are 2nd in the queue",
        ));

        assert!(negotiation.poll(&alice, &mut display).is_none());
        assert_eq!(negotiation.state(), NegotiationState::AwaitingReplies);
        assert!(display
            .updates
            .iter()
            .any(|t| t == "You are 2nd in the queue"));

        // The table can still seat the player afterwards.
        tables[0].send(cfp.reply(Performative::Inform, JOIN_TABLE, "welcome"));
        assert_eq!(
            negotiation.poll(&alice, &mut display),
            Some(JoinOutcome::Joined {
                table: tables[0].address().clone()
            })
        );
    }

    #[test]
    fn advisory_bound_still_honors_a_late_confirmation() {
        let (_router, alice, tables, mut negotiation) = setup(1);
        let mut display = RecordingDisplay::default();

        assert!(negotiation.start(&alice, &mut display).is_none());
        let cfp = cfp_from(&tables[0]);
        tables[0].send(cfp.reply(Performative::Propose, JOIN_TABLE, "seat open"));

        // Commit. The bound is now technically reached (1 replier of 1).
        assert!(negotiation.poll(&alice, &mut display).is_none());
        // Empty ticks keep the committed attempt open under Advisory.
        assert!(negotiation.poll(&alice, &mut display).is_none());
        assert!(negotiation.poll(&alice, &mut display).is_none());

        let accept = tables[0]
            .try_recv(&MessageTemplate::match_performative(
                Performative::AcceptProposal,
            ))
            .unwrap();
        tables[0].send(accept.reply(Performative::Inform, JOIN_TABLE, "welcome"));
        assert_eq!(
            negotiation.poll(&alice, &mut display),
            Some(JoinOutcome::Joined {
                table: tables[0].address().clone()
            })
        );
    }

    #[test]
    fn hard_stop_bound_halts_a_committed_attempt() {
        let router = Router::new();
        let alice = router.endpoint("alice");
        let table = router.endpoint("table-1");
        table.register(BLACKJACK_SERVICE);
        let mut display = RecordingDisplay::default();
        let mut negotiation = Negotiation::new("alice", ReplyBoundPolicy::HardStop);

        assert!(negotiation.start(&alice, &mut display).is_none());
        let cfp = cfp_from(&table);
        table.send(cfp.reply(Performative::Propose, JOIN_TABLE, "seat open"));

        assert!(negotiation.poll(&alice, &mut display).is_none()); // commit
        assert_eq!(
            negotiation.poll(&alice, &mut display),
            Some(JoinOutcome::NoHostFound)
        );
    }
}
