//! Entity store abstraction: units of work over tournaments, teams and matches.
//!
//! Every engine operation takes a `&mut dyn UnitOfWork` (or `&dyn` for reads). Callers open
//! one with [`EntityStore::begin`] and either commit it or let it drop; dropping an
//! uncommitted unit of work discards all of its writes. [`with_unit_of_work`] wraps that
//! pattern.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{GameMatch, MatchKey, Score, Team, Tournament, TournamentError, TournamentId};

#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// A uniqueness constraint was violated (duplicate match key or team name).
    Conflict(String),
    /// The referenced row does not exist.
    Missing(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Sqlite(e) => write!(f, "sqlite: {}", e),
            StoreError::Conflict(what) => write!(f, "conflict: {} already exists", what),
            StoreError::Missing(what) => write!(f, "missing: {}", what),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Sqlite(e) => Some(e),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which matches of a tournament to list. Results are always ordered by round, then position.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchFilter {
    All,
    Round(u32),
    /// Matches without a winner.
    Pending,
}

impl MatchFilter {
    pub fn accepts(&self, m: &GameMatch) -> bool {
        match self {
            MatchFilter::All => true,
            MatchFilter::Round(round) => m.round() == *round,
            MatchFilter::Pending => m.winner.is_none(),
        }
    }
}

/// One atomic transaction against the store.
pub trait UnitOfWork {
    fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// All tournaments, oldest first.
    fn tournaments(&self) -> StoreResult<Vec<Tournament>>;

    fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()>;

    fn set_champion(&mut self, id: TournamentId, champion: &str) -> StoreResult<()>;

    /// Removes the tournament with its teams and matches. Returns false if it did not exist.
    fn delete_tournament(&mut self, id: TournamentId) -> StoreResult<bool>;

    /// Teams in registration order.
    fn teams(&self, tournament_id: TournamentId) -> StoreResult<Vec<Team>>;

    fn insert_team(&mut self, team: &Team) -> StoreResult<()>;

    fn matches(&self, tournament_id: TournamentId, filter: MatchFilter) -> StoreResult<Vec<GameMatch>>;

    fn find_match(&self, tournament_id: TournamentId, key: MatchKey) -> StoreResult<Option<GameMatch>>;

    /// Highest round number with at least one match.
    fn latest_round(&self, tournament_id: TournamentId) -> StoreResult<Option<u32>> {
        Ok(self
            .matches(tournament_id, MatchFilter::All)?
            .iter()
            .map(GameMatch::round)
            .max())
    }

    /// Inserts a batch of matches. Fails with [`StoreError::Conflict`] without inserting
    /// anything if any `(tournament, key)` already exists.
    fn insert_matches(&mut self, batch: &[GameMatch]) -> StoreResult<()>;

    fn record_score(
        &mut self,
        tournament_id: TournamentId,
        key: MatchKey,
        score: Score,
        winner: &str,
    ) -> StoreResult<()>;

    fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discards all writes. Dropping the unit of work has the same effect.
    fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

/// Storage backend. Units of work are serialized: `begin` blocks while another is open, and a
/// unit of work that panicked does not prevent later ones.
pub trait EntityStore: Send + Sync {
    fn begin(&self) -> StoreResult<Box<dyn UnitOfWork + '_>>;
}

/// Run `f` inside one unit of work: commit on `Ok`, roll back on `Err`.
pub fn with_unit_of_work<T, F>(store: &dyn EntityStore, f: F) -> Result<T, TournamentError>
where
    F: FnOnce(&mut dyn UnitOfWork) -> Result<T, TournamentError>,
{
    let mut uow = store.begin()?;
    match f(&mut *uow) {
        Ok(value) => {
            uow.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = uow.rollback() {
                log::error!("Rollback failed after '{}': {}", e, rollback);
            }
            Err(e)
        }
    }
}
