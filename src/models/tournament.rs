//! Tournament, TournamentState and the error taxonomy.

use crate::models::game::MatchKey;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Format tag stored on every tournament. Only single elimination is supported.
pub const SINGLE_ELIMINATION: &str = "single_elimination";

/// Broad class of a [`TournamentError`], used by callers to decide how to report it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input; nothing changed.
    Validation,
    /// Unknown tournament or match.
    NotFound,
    /// Expected, non-fatal condition (e.g. round still in progress).
    Precondition,
    /// Malformed bracket detected during advancement. Indicates a bug.
    Integrity,
    /// Storage failure.
    Store,
}

/// Errors that can occur during tournament operations.
#[derive(Debug)]
pub enum TournamentError {
    /// Team count is not a power of two, or is below two.
    InvalidTeamCount(u32),
    /// A required text field was empty.
    MissingField(&'static str),
    /// A team with this name already exists (names are unique, case-insensitive).
    DuplicateTeamName(String),
    /// The roster already holds the required number of teams.
    RosterFull { capacity: u32 },
    NegativeScore,
    /// Single elimination has no draws.
    TieNotAllowed,
    /// Roster CSV could not be read.
    InvalidCsv(String),
    TournamentNotFound(TournamentId),
    MatchNotFound(String),
    /// Bracket cannot be built until the roster is full.
    MissingTeams { required: u32, registered: u32 },
    BracketAlreadyGenerated,
    NoBracket,
    /// The current round still has matches without a winner.
    RoundIncomplete { round: u32, pending: MatchKey },
    /// The match's round has already been advanced; its result can no longer change.
    ResultLocked(MatchKey),
    AlreadyFinished { champion: String },
    /// Advancement produced a malformed pairing.
    BracketIntegrity(String),
    Store(StoreError),
}

impl TournamentError {
    pub fn kind(&self) -> ErrorKind {
        use TournamentError::*;
        match self {
            InvalidTeamCount(_) | MissingField(_) | DuplicateTeamName(_) | RosterFull { .. }
            | NegativeScore | TieNotAllowed | InvalidCsv(_) => ErrorKind::Validation,
            TournamentNotFound(_) | MatchNotFound(_) => ErrorKind::NotFound,
            MissingTeams { .. } | BracketAlreadyGenerated | NoBracket | RoundIncomplete { .. }
            | ResultLocked(_) | AlreadyFinished { .. } => ErrorKind::Precondition,
            BracketIntegrity(_) => ErrorKind::Integrity,
            // A racing writer got there first; same class as "already generated".
            Store(StoreError::Conflict(_)) => ErrorKind::Precondition,
            Store(_) => ErrorKind::Store,
        }
    }
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::InvalidTeamCount(n) => write!(
                f,
                "The number of teams must be a power of 2 (2, 4, 8, 16, ...), got {}",
                n
            ),
            TournamentError::MissingField(field) => write!(f, "The {} is required", field),
            TournamentError::DuplicateTeamName(name) => {
                write!(f, "A team named '{}' already exists in this tournament", name)
            }
            TournamentError::RosterFull { capacity } => {
                write!(f, "The tournament already has its limit of {} teams", capacity)
            }
            TournamentError::NegativeScore => write!(f, "Scores cannot be negative"),
            TournamentError::TieNotAllowed => {
                write!(f, "Ties are not allowed in single elimination; re-enter the scores")
            }
            TournamentError::InvalidCsv(msg) => write!(f, "Invalid team CSV: {}", msg),
            TournamentError::TournamentNotFound(_) => write!(f, "Tournament not found"),
            TournamentError::MatchNotFound(id) => {
                write!(f, "Match {} not found in this tournament", id)
            }
            TournamentError::MissingTeams { required, registered } => write!(
                f,
                "Missing teams: requires {}, has {}",
                required, registered
            ),
            TournamentError::BracketAlreadyGenerated => {
                write!(f, "The bracket has already been generated for this tournament")
            }
            TournamentError::NoBracket => {
                write!(f, "No matches generated yet; generate the bracket first")
            }
            TournamentError::RoundIncomplete { round, pending } => write!(
                f,
                "Round {} is not complete: match {} has no result",
                round, pending
            ),
            TournamentError::ResultLocked(key) => write!(
                f,
                "Match {} has already been advanced; its result can no longer change",
                key
            ),
            TournamentError::AlreadyFinished { champion } => {
                write!(f, "The tournament is already finished. Champion: {}", champion)
            }
            TournamentError::BracketIntegrity(msg) => {
                write!(f, "Bracket integrity error: {}", msg)
            }
            TournamentError::Store(e) => write!(f, "Storage error: {}", e),
        }
    }
}

impl std::error::Error for TournamentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TournamentError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for TournamentError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Progress of a tournament, derived from its matches and champion (never stored).
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TournamentState {
    /// No matches yet (roster may still be filling).
    AwaitingBracket,
    /// Current round has at least one match without a winner.
    RoundInProgress { round: u32 },
    /// Every match of the current round has a winner; ready to advance.
    RoundComplete { round: u32 },
    Finished { champion: String },
}

/// A single-elimination tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    /// Required number of teams; a power of two, at least 2.
    pub team_count: u32,
    pub format: String,
    /// Set once the final has been advanced.
    pub champion: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Tournament {
    /// New tournament with a fresh id and no champion. Does not validate; see
    /// [`crate::logic::create_tournament`].
    pub fn new(name: impl Into<String>, team_count: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            team_count,
            format: SINGLE_ELIMINATION.to_string(),
            champion: None,
            created_at: Utc::now(),
        }
    }

    /// Number of round-1 matches.
    pub fn first_round_matches(&self) -> u32 {
        self.team_count / 2
    }

    pub fn is_finished(&self) -> bool {
        self.champion.is_some()
    }
}

/// Valid team counts: powers of two, at least 2.
pub fn is_valid_team_count(count: u32) -> bool {
    count >= 2 && count.is_power_of_two()
}
