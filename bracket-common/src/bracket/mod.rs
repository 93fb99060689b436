//! Bracket domain: entrants, matchups, session state machine and event dispatch
//!
//! Data flow for one round:
//! 1. The session exposes a [`BracketView`] of the current matchups
//! 2. [`BracketEvent::WinnerSelected`] events fill in one winner per matchup
//! 3. [`BracketEvent::AdvanceRequested`] persists the whole round, then the
//!    winners become the next round's entrants
//!
//! The loop ends when a single matchup has been decided.

pub mod entrants;
pub mod interaction;
pub mod matchups;
pub mod session;

pub use entrants::{Entrant, EntrantList, DEFAULT_ENTRANTS, DEFAULT_TITLE, MAX_NAME_LEN};
pub use interaction::{dispatch, BracketEvent};
pub use matchups::{generate_matchups, Matchup};
pub use session::{BracketSession, BracketView, MatchupView, Phase, RoundDecision};
