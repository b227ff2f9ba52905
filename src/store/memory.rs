//! In-memory store. A unit of work holds the store lock; its first write copies the tables and
//! every write goes to that copy, swapped in on commit.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::models::{GameMatch, MatchKey, Score, Team, Tournament, TournamentId};

use super::{EntityStore, MatchFilter, StoreError, StoreResult, UnitOfWork};

#[derive(Clone, Debug, Default)]
struct Tables {
    /// Insertion order.
    tournaments: Vec<Tournament>,
    /// Registration order.
    teams: Vec<Team>,
    matches: BTreeMap<(TournamentId, MatchKey), GameMatch>,
}

/// In-memory [`EntityStore`]; contents are lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn begin(&self) -> StoreResult<Box<dyn UnitOfWork + '_>> {
        // Committed tables are only ever replaced whole, so a panicking holder left them intact.
        let guard = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working: None,
        }))
    }
}

struct MemoryUnitOfWork<'a> {
    guard: MutexGuard<'a, Tables>,
    /// Private copy, made on the first write.
    working: Option<Tables>,
}

impl MemoryUnitOfWork<'_> {
    fn tables(&self) -> &Tables {
        self.working.as_ref().unwrap_or(&*self.guard)
    }

    fn tables_mut(&mut self) -> &mut Tables {
        let committed = &*self.guard;
        self.working.get_or_insert_with(|| committed.clone())
    }

    fn tournament_mut(&mut self, id: TournamentId) -> StoreResult<&mut Tournament> {
        self.tables_mut()
            .tournaments
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::Missing(format!("tournament {}", id)))
    }

    fn require_tournament(&self, id: TournamentId) -> StoreResult<()> {
        if self.tables().tournaments.iter().any(|t| t.id == id) {
            Ok(())
        } else {
            Err(StoreError::Missing(format!("tournament {}", id)))
        }
    }
}

impl UnitOfWork for MemoryUnitOfWork<'_> {
    fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        Ok(self.tables().tournaments.iter().find(|t| t.id == id).cloned())
    }

    fn tournaments(&self) -> StoreResult<Vec<Tournament>> {
        let mut all = self.tables().tournaments.clone();
        all.sort_by_key(|t| t.created_at);
        Ok(all)
    }

    fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        if self.tables().tournaments.iter().any(|t| t.id == tournament.id) {
            return Err(StoreError::Conflict(format!("tournament {}", tournament.id)));
        }
        self.tables_mut().tournaments.push(tournament.clone());
        Ok(())
    }

    fn set_champion(&mut self, id: TournamentId, champion: &str) -> StoreResult<()> {
        self.tournament_mut(id)?.champion = Some(champion.to_string());
        Ok(())
    }

    fn delete_tournament(&mut self, id: TournamentId) -> StoreResult<bool> {
        if !self.tables().tournaments.iter().any(|t| t.id == id) {
            return Ok(false);
        }
        let tables = self.tables_mut();
        tables.tournaments.retain(|t| t.id != id);
        tables.teams.retain(|t| t.tournament_id != id);
        tables.matches.retain(|(tid, _), _| *tid != id);
        Ok(true)
    }

    fn teams(&self, tournament_id: TournamentId) -> StoreResult<Vec<Team>> {
        Ok(self
            .tables()
            .teams
            .iter()
            .filter(|t| t.tournament_id == tournament_id)
            .cloned()
            .collect())
    }

    fn insert_team(&mut self, team: &Team) -> StoreResult<()> {
        self.require_tournament(team.tournament_id)?;
        let duplicate = self
            .tables()
            .teams
            .iter()
            .any(|t| t.id == team.id || (t.tournament_id == team.tournament_id && t.has_name(&team.name)));
        if duplicate {
            return Err(StoreError::Conflict(format!("team '{}'", team.name)));
        }
        self.tables_mut().teams.push(team.clone());
        Ok(())
    }

    fn matches(&self, tournament_id: TournamentId, filter: MatchFilter) -> StoreResult<Vec<GameMatch>> {
        Ok(self
            .tables()
            .matches
            .iter()
            .filter(|((tid, _), m)| *tid == tournament_id && filter.accepts(m))
            .map(|(_, m)| m.clone())
            .collect())
    }

    fn find_match(&self, tournament_id: TournamentId, key: MatchKey) -> StoreResult<Option<GameMatch>> {
        Ok(self.tables().matches.get(&(tournament_id, key)).cloned())
    }

    fn insert_matches(&mut self, batch: &[GameMatch]) -> StoreResult<()> {
        let mut staged = BTreeMap::new();
        for m in batch {
            self.require_tournament(m.tournament_id)?;
            let slot = (m.tournament_id, m.key);
            if self.tables().matches.contains_key(&slot) || staged.insert(slot, m.clone()).is_some() {
                return Err(StoreError::Conflict(format!("match {}", m.key)));
            }
        }
        self.tables_mut().matches.append(&mut staged);
        Ok(())
    }

    fn record_score(
        &mut self,
        tournament_id: TournamentId,
        key: MatchKey,
        score: Score,
        winner: &str,
    ) -> StoreResult<()> {
        let Some(m) = self.tables_mut().matches.get_mut(&(tournament_id, key)) else {
            return Err(StoreError::Missing(format!("match {}", key)));
        };
        m.score = Some(score);
        m.winner = Some(winner.to_string());
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        if let Some(working) = self.working.take() {
            *self.guard = working;
        }
        Ok(())
    }
}
