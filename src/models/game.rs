//! GameMatch, MatchKey and Score for single-elimination rounds.

use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which side of a match.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    A,
    B,
}

/// Logical match identifier `R{round}_P{position}` (both 1-indexed).
///
/// Stable across stores and used verbatim as the forward-link value, so the textual form is
/// part of the persisted layout. Orders by round, then position.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MatchKey {
    round: u32,
    position: u32,
}

impl MatchKey {
    pub fn new(round: u32, position: u32) -> Self {
        debug_assert!(round >= 1 && position >= 1, "match keys are 1-indexed");
        Self { round, position }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn position(&self) -> u32 {
        self.position
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}_P{}", self.round, self.position)
    }
}

/// The input was not of the form `R<n>_P<m>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseMatchKeyError(String);

impl fmt::Display for ParseMatchKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid match id '{}' (expected R<round>_P<position>)", self.0)
    }
}

impl std::error::Error for ParseMatchKeyError {}

impl FromStr for MatchKey {
    type Err = ParseMatchKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseMatchKeyError(s.to_string());
        let rest = s.strip_prefix('R').ok_or_else(invalid)?;
        let (round, position) = rest.split_once("_P").ok_or_else(invalid)?;
        Ok(Self {
            round: parse_index(round).ok_or_else(invalid)?,
            position: parse_index(position).ok_or_else(invalid)?,
        })
    }
}

/// Canonical 1-based index: ASCII digits only, no sign, no leading zero.
fn parse_index(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

impl From<MatchKey> for String {
    fn from(key: MatchKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MatchKey {
    type Error = ParseMatchKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Display label for a round number.
pub fn round_label(round: u32) -> String {
    format!("Round {round}")
}

/// Final score of a decided match. Both sides are always recorded together.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub a: u64,
    pub b: u64,
}

impl Score {
    /// The side with the higher score, or None on a tie.
    pub fn leader(&self) -> Option<Side> {
        match self.a.cmp(&self.b) {
            std::cmp::Ordering::Greater => Some(Side::A),
            std::cmp::Ordering::Less => Some(Side::B),
            std::cmp::Ordering::Equal => None,
        }
    }
}

/// A single bracket match between two teams, referenced by team name.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GameMatch {
    pub key: MatchKey,
    pub tournament_id: TournamentId,
    pub round_label: String,
    pub side_a: String,
    pub side_b: String,
    /// None if not yet played.
    pub score: Option<Score>,
    pub winner: Option<String>,
    /// Match the winner advances to. None only for the final.
    pub next_match: Option<MatchKey>,
}

impl GameMatch {
    pub fn new(
        tournament_id: TournamentId,
        key: MatchKey,
        side_a: impl Into<String>,
        side_b: impl Into<String>,
        next_match: Option<MatchKey>,
    ) -> Self {
        Self {
            key,
            tournament_id,
            round_label: round_label(key.round()),
            side_a: side_a.into(),
            side_b: side_b.into(),
            score: None,
            winner: None,
            next_match,
        }
    }

    pub fn round(&self) -> u32 {
        self.key.round()
    }

    pub fn side(&self, side: Side) -> &str {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    pub fn is_decided(&self) -> bool {
        self.winner.is_some()
    }
}
