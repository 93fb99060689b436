//! Bracket session state machine
//!
//! Phases: `AwaitingUsername → CollectingRound(n) → ... → Complete`.
//!
//! A session is owned by exactly one user session; it is created when the
//! session starts and dropped when it ends. Only decided rounds are durable,
//! the in-progress state itself is never persisted.
//!
//! Advancing is split in two steps so persistence can sit between them:
//! [`BracketSession::pending_round`] builds the round's records without
//! mutating anything, and [`BracketSession::apply_decision`] commits the
//! transition once those records are stored. Intermediate and final rounds
//! take the same path.

use super::entrants::{Entrant, EntrantList, MAX_NAME_LEN};
use super::matchups::{generate_matchups, Matchup};
use crate::db::PredictionRecord;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingUsername,
    CollectingRound,
    Complete,
}

/// A fully decided round, ready to be persisted
#[derive(Debug, Clone, PartialEq)]
pub struct RoundDecision {
    round: u32,
    winners: Vec<Entrant>,
    records: Vec<PredictionRecord>,
}

impl RoundDecision {
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn winners(&self) -> &[Entrant] {
        &self.winners
    }

    /// One record per matchup of the round, in matchup order
    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }
}

/// One matchup as presented to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchupView {
    pub index: usize,
    pub first: Entrant,
    pub second: Entrant,
    pub label: String,
    pub selected: Option<Entrant>,
}

/// Render-ready snapshot of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketView {
    pub phase: Phase,
    pub round: u32,
    pub total_rounds: u32,
    pub username: Option<String>,
    pub matchups: Vec<MatchupView>,
    pub ready_to_advance: bool,
    pub champion: Option<Entrant>,
    pub all_predictions: Vec<Entrant>,
}

/// Per-user bracket state
#[derive(Debug, Clone)]
pub struct BracketSession {
    entrants: EntrantList,
    phase: Phase,
    round: u32,
    matchups: Vec<Matchup>,
    /// One slot per matchup; `Some` once the user picked a winner
    selections: Vec<Option<Entrant>>,
    username: String,
    all_predictions: Vec<Entrant>,
    champion: Option<Entrant>,
}

impl BracketSession {
    /// Start a session at round 1 with the full entrant list
    pub fn new(entrants: EntrantList) -> Result<Self> {
        let matchups = generate_matchups(entrants.entrants())?;
        Ok(Self {
            selections: vec![None; matchups.len()],
            entrants,
            phase: Phase::AwaitingUsername,
            round: 1,
            matchups,
            username: String::new(),
            all_predictions: Vec::new(),
            champion: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn matchups(&self) -> &[Matchup] {
        &self.matchups
    }

    pub fn username(&self) -> Option<&str> {
        self.username_submitted().then_some(self.username.as_str())
    }

    pub fn username_submitted(&self) -> bool {
        self.phase != Phase::AwaitingUsername
    }

    /// Winners picked so far this round, in matchup order
    pub fn winners(&self) -> Vec<&Entrant> {
        self.selections.iter().flatten().collect()
    }

    pub fn all_predictions(&self) -> &[Entrant] {
        &self.all_predictions
    }

    pub fn champion(&self) -> Option<&Entrant> {
        self.champion.as_ref()
    }

    /// Accept a non-blank username and open round 1
    pub fn submit_username(&mut self, username: &str) -> Result<()> {
        if self.phase != Phase::AwaitingUsername {
            return Err(Error::InvalidTransition(
                "username has already been submitted".to_string(),
            ));
        }

        let username = username.trim();
        if username.is_empty() {
            return Err(Error::Selection("username required".to_string()));
        }
        if username.chars().count() > MAX_NAME_LEN {
            return Err(Error::Selection(format!(
                "username must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        self.username = username.to_string();
        self.phase = Phase::CollectingRound;
        Ok(())
    }

    /// Record the user's pick for one matchup
    ///
    /// Picking again for the same matchup replaces the earlier pick. A winner
    /// that is not one of the pair leaves the session untouched.
    pub fn select_winner(&mut self, matchup_index: usize, winner: &str) -> Result<()> {
        self.require_collecting("select a winner")?;

        let matchup = self.matchups.get(matchup_index).ok_or_else(|| {
            Error::Selection(format!(
                "round {} has no matchup {}",
                self.round, matchup_index
            ))
        })?;

        let entrant = matchup.resolve(winner).cloned().ok_or_else(|| {
            Error::Selection(format!(
                "'{}' is not part of '{}'",
                winner,
                matchup.label()
            ))
        })?;

        self.selections[matchup_index] = Some(entrant);
        Ok(())
    }

    /// Build the current round's records if every matchup has a winner
    ///
    /// Returns `Ok(None)` while selections are incomplete; partial rounds are
    /// never handed out for persistence.
    pub fn pending_round(&self, timestamp: DateTime<Utc>) -> Result<Option<RoundDecision>> {
        self.require_collecting("advance")?;

        let winners: Option<Vec<Entrant>> = self.selections.iter().cloned().collect();
        let Some(winners) = winners else {
            return Ok(None);
        };

        let records = self
            .matchups
            .iter()
            .zip(&winners)
            .map(|(matchup, winner)| PredictionRecord {
                username: self.username.clone(),
                round: self.round,
                match_label: matchup.label(),
                winner: winner.to_string(),
                timestamp,
            })
            .collect();

        Ok(Some(RoundDecision {
            round: self.round,
            winners,
            records,
        }))
    }

    /// Commit a persisted round
    ///
    /// A single-matchup round crowns the champion; any other round feeds its
    /// winners into the next round's matchups.
    pub fn apply_decision(&mut self, decision: RoundDecision) -> Result<()> {
        self.require_collecting("advance")?;

        if decision.round != self.round {
            return Err(Error::InvalidTransition(format!(
                "decision is for round {} but the session is in round {}",
                decision.round, self.round
            )));
        }
        if decision.winners.len() != self.matchups.len() {
            return Err(Error::InvalidInput(format!(
                "{} winners for {} matchups",
                decision.winners.len(),
                self.matchups.len()
            )));
        }

        if self.matchups.len() == 1 {
            self.champion = decision.winners.first().cloned();
            self.all_predictions.extend(decision.winners);
            self.phase = Phase::Complete;
            return Ok(());
        }

        let next = generate_matchups(&decision.winners)?;
        self.all_predictions.extend(decision.winners);
        self.selections = vec![None; next.len()];
        self.matchups = next;
        self.round += 1;
        Ok(())
    }

    /// Return to round 1 with the original entrants
    ///
    /// Clears the in-memory prediction path only; durable records stay.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase == Phase::AwaitingUsername {
            return Err(Error::InvalidTransition(
                "cannot reset before a username is submitted".to_string(),
            ));
        }

        let matchups = generate_matchups(self.entrants.entrants())?;
        self.selections = vec![None; matchups.len()];
        self.matchups = matchups;
        self.round = 1;
        self.all_predictions.clear();
        self.champion = None;
        self.phase = Phase::CollectingRound;
        Ok(())
    }

    pub fn view(&self) -> BracketView {
        let matchups = self
            .matchups
            .iter()
            .zip(&self.selections)
            .enumerate()
            .map(|(index, (matchup, selected))| MatchupView {
                index,
                first: matchup.first.clone(),
                second: matchup.second.clone(),
                label: matchup.label(),
                selected: selected.clone(),
            })
            .collect();

        BracketView {
            phase: self.phase,
            round: self.round,
            total_rounds: self.entrants.round_count(),
            username: self.username().map(str::to_string),
            matchups,
            ready_to_advance: self.phase == Phase::CollectingRound
                && self.selections.iter().all(Option::is_some),
            champion: self.champion.clone(),
            all_predictions: self.all_predictions.clone(),
        }
    }

    fn require_collecting(&self, action: &str) -> Result<()> {
        match self.phase {
            Phase::CollectingRound => Ok(()),
            Phase::AwaitingUsername => Err(Error::InvalidTransition(format!(
                "cannot {} before a username is submitted",
                action
            ))),
            Phase::Complete => Err(Error::InvalidTransition(format!(
                "cannot {} after the bracket is complete; reset to start over",
                action
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    fn started() -> BracketSession {
        let mut session = BracketSession::new(EntrantList::default()).unwrap();
        session.submit_username("alice").unwrap();
        session
    }

    /// Pick the first-listed entrant of every matchup
    fn pick_first(session: &mut BracketSession) {
        let firsts: Vec<String> = session
            .matchups()
            .iter()
            .map(|m| m.first.to_string())
            .collect();
        for (i, name) in firsts.iter().enumerate() {
            session.select_winner(i, name).unwrap();
        }
    }

    fn advance(session: &mut BracketSession) -> RoundDecision {
        let decision = session.pending_round(now()).unwrap().unwrap();
        session.apply_decision(decision.clone()).unwrap();
        decision
    }

    #[test]
    fn test_new_session_awaits_username() {
        let session = BracketSession::new(EntrantList::default()).unwrap();
        assert_eq!(session.phase(), Phase::AwaitingUsername);
        assert_eq!(session.round(), 1);
        assert_eq!(session.matchups().len(), 8);
        assert!(!session.username_submitted());
        assert_eq!(session.username(), None);
    }

    #[test]
    fn test_blank_username_rejected() {
        let mut session = BracketSession::new(EntrantList::default()).unwrap();
        assert!(matches!(session.submit_username("   "), Err(Error::Selection(_))));
        assert_eq!(session.phase(), Phase::AwaitingUsername);
    }

    #[test]
    fn test_overlong_username_rejected() {
        let mut session = BracketSession::new(EntrantList::default()).unwrap();
        let too_long = "u".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(
            session.submit_username(&too_long),
            Err(Error::Selection(_))
        ));
        assert_eq!(session.phase(), Phase::AwaitingUsername);

        // Surrounding whitespace does not count
        let padded = format!("  {}  ", "u".repeat(MAX_NAME_LEN));
        session.submit_username(&padded).unwrap();
        assert_eq!(session.username().map(|u| u.len()), Some(MAX_NAME_LEN));
    }

    #[test]
    fn test_username_opens_round_one() {
        let session = started();
        assert_eq!(session.phase(), Phase::CollectingRound);
        assert_eq!(session.username(), Some("alice"));
    }

    #[test]
    fn test_second_username_submission_rejected() {
        let mut session = started();
        assert!(matches!(
            session.submit_username("bob"),
            Err(Error::InvalidTransition(_))
        ));
        assert_eq!(session.username(), Some("alice"));
    }

    #[test]
    fn test_selection_before_username_rejected() {
        let mut session = BracketSession::new(EntrantList::default()).unwrap();
        assert!(matches!(
            session.select_winner(0, "01 - Tom Brady"),
            Err(Error::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_foreign_winner_rejected_without_mutation() {
        let mut session = started();
        session.select_winner(0, "01 - Tom Brady").unwrap();
        let before = session.view();

        let err = session.select_winner(1, "01 - Tom Brady").unwrap_err();
        assert!(matches!(err, Error::Selection(_)));

        assert_eq!(session.view(), before);
        assert_eq!(session.winners().len(), 1);
        assert_eq!(session.matchups().len(), 8);
    }

    #[test]
    fn test_out_of_range_matchup_rejected() {
        let mut session = started();
        assert!(matches!(
            session.select_winner(8, "01 - Tom Brady"),
            Err(Error::Selection(_))
        ));
    }

    #[test]
    fn test_reselecting_replaces_pick() {
        let mut session = started();
        session.select_winner(0, "01 - Tom Brady").unwrap();
        session.select_winner(0, "16 - Isabella Stewart Gardner").unwrap();
        assert_eq!(session.winners().len(), 1);
        assert_eq!(
            session.winners()[0].as_str(),
            "16 - Isabella Stewart Gardner"
        );
    }

    #[test]
    fn test_incomplete_round_has_no_pending_decision() {
        let mut session = started();
        session.select_winner(0, "01 - Tom Brady").unwrap();
        assert!(session.pending_round(now()).unwrap().is_none());
        assert!(!session.view().ready_to_advance);
    }

    #[test]
    fn test_pending_round_has_one_record_per_matchup() {
        let mut session = started();
        pick_first(&mut session);
        let decision = session.pending_round(now()).unwrap().unwrap();

        assert_eq!(decision.records().len(), session.matchups().len());
        let first = &decision.records()[0];
        assert_eq!(first.username, "alice");
        assert_eq!(first.round, 1);
        assert_eq!(first.match_label, "01 - Tom Brady vs 16 - Isabella Stewart Gardner");
        assert_eq!(first.winner, "01 - Tom Brady");
        // Building the decision does not move the session
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn test_round_two_receives_round_one_winners() {
        let mut session = started();
        pick_first(&mut session);
        let decision = advance(&mut session);

        assert_eq!(session.round(), 2);
        assert_eq!(session.matchups().len(), 4);
        assert!(session.winners().is_empty());

        let flattened: Vec<&Entrant> = session
            .matchups()
            .iter()
            .flat_map(|m| [&m.first, &m.second])
            .collect();
        let expected: Vec<&Entrant> = decision.winners().iter().collect();
        assert_eq!(flattened, expected);
        assert_eq!(session.matchups()[0].first.as_str(), "01 - Tom Brady");
        assert_eq!(session.matchups()[0].second.as_str(), "08 - Clara Barton");
    }

    #[test]
    fn test_four_rounds_to_champion() {
        let mut session = started();
        let mut rounds = 0;
        while session.phase() == Phase::CollectingRound {
            pick_first(&mut session);
            advance(&mut session);
            rounds += 1;
        }

        assert_eq!(rounds, 4);
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.champion().map(Entrant::as_str), Some("01 - Tom Brady"));
        assert_eq!(session.all_predictions().len(), 15);
        assert_eq!(session.round(), 4);
    }

    #[test]
    fn test_complete_only_accepts_reset() {
        let mut session = started();
        while session.phase() == Phase::CollectingRound {
            pick_first(&mut session);
            advance(&mut session);
        }

        assert!(matches!(
            session.select_winner(0, "01 - Tom Brady"),
            Err(Error::InvalidTransition(_))
        ));
        assert!(matches!(
            session.pending_round(now()),
            Err(Error::InvalidTransition(_))
        ));

        session.reset().unwrap();
        assert_eq!(session.phase(), Phase::CollectingRound);
        assert_eq!(session.round(), 1);
        assert_eq!(session.matchups().len(), 8);
        assert!(session.all_predictions().is_empty());
        assert!(session.champion().is_none());
        assert_eq!(session.username(), Some("alice"));
    }

    #[test]
    fn test_reset_mid_bracket() {
        let mut session = started();
        pick_first(&mut session);
        advance(&mut session);
        session.select_winner(0, "01 - Tom Brady").unwrap();

        session.reset().unwrap();
        assert_eq!(session.round(), 1);
        assert!(session.winners().is_empty());
        assert_eq!(
            session.matchups(),
            generate_matchups(EntrantList::default().entrants()).unwrap().as_slice()
        );
    }

    #[test]
    fn test_reset_before_username_rejected() {
        let mut session = BracketSession::new(EntrantList::default()).unwrap();
        assert!(matches!(session.reset(), Err(Error::InvalidTransition(_))));
    }

    #[test]
    fn test_stale_decision_rejected() {
        let mut session = started();
        pick_first(&mut session);
        let decision = session.pending_round(now()).unwrap().unwrap();
        session.apply_decision(decision.clone()).unwrap();

        assert!(matches!(
            session.apply_decision(decision),
            Err(Error::InvalidTransition(_))
        ));
        assert_eq!(session.round(), 2);
        assert_eq!(session.all_predictions().len(), 8);
    }

    #[test]
    fn test_view_reflects_selections() {
        let mut session = started();
        session.select_winner(2, "12 - Amy Poehler").unwrap();
        let view = session.view();

        assert_eq!(view.phase, Phase::CollectingRound);
        assert_eq!(view.total_rounds, 4);
        assert_eq!(view.username.as_deref(), Some("alice"));
        assert_eq!(view.matchups.len(), 8);
        assert_eq!(view.matchups[2].label, "05 - Paul Revere vs 12 - Amy Poehler");
        assert_eq!(
            view.matchups[2].selected.as_ref().map(Entrant::as_str),
            Some("12 - Amy Poehler")
        );
        assert!(view.matchups[0].selected.is_none());
    }

    #[test]
    fn test_two_entrant_bracket_completes_in_one_round() {
        let mut session = BracketSession::new(EntrantList::new(["a", "b"]).unwrap()).unwrap();
        session.submit_username("carol").unwrap();
        session.select_winner(0, "b").unwrap();
        advance(&mut session);

        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.champion().map(Entrant::as_str), Some("b"));
        assert_eq!(session.all_predictions().len(), 1);
    }
}
