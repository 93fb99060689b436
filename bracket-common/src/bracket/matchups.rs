//! Matchup generation
//!
//! Pairs adjacent entries of an ordered list: `(S[0],S[1]), (S[2],S[3]), ...`

use super::entrants::Entrant;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// One head-to-head decision point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matchup {
    pub first: Entrant,
    pub second: Entrant,
}

impl Matchup {
    pub fn new(first: Entrant, second: Entrant) -> Self {
        Self { first, second }
    }

    /// Label stored with each prediction: "<first> vs <second>"
    pub fn label(&self) -> String {
        format!("{} vs {}", self.first, self.second)
    }

    /// Return the matching entrant if `name` is one of the pair
    pub fn resolve(&self, name: &str) -> Option<&Entrant> {
        if self.first.as_str() == name {
            Some(&self.first)
        } else if self.second.as_str() == name {
            Some(&self.second)
        } else {
            None
        }
    }
}

/// Group an even-length list into consecutive pairs
///
/// Odd or empty input means winner collection was incomplete, which the
/// session never allows; it is reported as `Error::InvalidInput`.
pub fn generate_matchups(entrants: &[Entrant]) -> Result<Vec<Matchup>> {
    if entrants.is_empty() || entrants.len() % 2 != 0 {
        return Err(Error::InvalidInput(format!(
            "cannot pair {} entrants",
            entrants.len()
        )));
    }

    Ok(entrants
        .chunks_exact(2)
        .map(|pair| Matchup::new(pair[0].clone(), pair[1].clone()))
        .collect())
}
