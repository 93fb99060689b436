//! Entrant list
//!
//! Entrants are display strings of the form "seed - name", listed in
//! bracket order so that adjacent entries meet in round 1.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Default bracket title shown above the rounds
pub const DEFAULT_TITLE: &str = "AI March Madness Bracket";

/// Longest entrant name or username, in characters
///
/// Matches the narrowest column of the SQL stores, so any name accepted here
/// can be written by every backend. Two names plus " vs " fit the matchup
/// column.
pub const MAX_NAME_LEN: usize = 100;

/// Default 16 seeded entrants in bracket order
pub const DEFAULT_ENTRANTS: [&str; 16] = [
    "01 - Tom Brady",
    "16 - Isabella Stewart Gardner",
    "08 - Clara Barton",
    "09 - Louisa May Alcott",
    "05 - Paul Revere",
    "12 - Amy Poehler",
    "04 - Susan B. Anthony",
    "13 - John Cena",
    "06 - Emily Dickinson",
    "11 - Bobby Orr",
    "03 - John F. Kennedy",
    "14 - Abigail Adams",
    "07 - Ben Affleck",
    "10 - Chris Evans",
    "02 - David Ortiz",
    "15 - Nancy Kerrigan",
];

/// A tournament participant, identified by its display string
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entrant(String);

impl Entrant {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Entrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Entrant {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Validated, immutable list of bracket entrants
///
/// Length is a power of two (at least 2) so every round pairs up evenly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrantList {
    entrants: Vec<Entrant>,
}

impl EntrantList {
    /// Build a list from configured names
    ///
    /// Rejects blank or duplicate names and lengths that cannot be halved
    /// down to a single champion.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entrants: Vec<Entrant> = names
            .into_iter()
            .map(|n| Entrant::new(n.into().trim().to_string()))
            .collect();

        if entrants.len() < 2 || !entrants.len().is_power_of_two() {
            return Err(Error::Config(format!(
                "Entrant count must be a power of two and at least 2, got {}",
                entrants.len()
            )));
        }

        let mut seen = HashSet::new();
        for entrant in &entrants {
            if entrant.as_str().is_empty() {
                return Err(Error::Config("Entrant names must not be blank".to_string()));
            }
            if entrant.as_str().chars().count() > MAX_NAME_LEN {
                return Err(Error::Config(format!(
                    "Entrant name longer than {} characters: {}",
                    MAX_NAME_LEN, entrant
                )));
            }
            if !seen.insert(entrant.as_str()) {
                return Err(Error::Config(format!("Duplicate entrant: {}", entrant)));
            }
        }

        Ok(Self { entrants })
    }

    pub fn entrants(&self) -> &[Entrant] {
        &self.entrants
    }

    pub fn len(&self) -> usize {
        self.entrants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entrants.is_empty()
    }

    /// Number of rounds needed to reach a single champion
    pub fn round_count(&self) -> u32 {
        self.entrants.len().trailing_zeros()
    }
}

impl Default for EntrantList {
    fn default() -> Self {
        Self {
            entrants: DEFAULT_ENTRANTS.iter().map(|&n| Entrant::from(n)).collect(),
        }
    }
}
