//! SQLite-backed store. A unit of work is one `BEGIN IMMEDIATE ... COMMIT` transaction on a
//! shared connection; dropping it uncommitted issues `ROLLBACK`.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::models::{GameMatch, MatchKey, Score, Team, Tournament, TournamentId};

use super::{EntityStore, MatchFilter, StoreError, StoreResult, UnitOfWork};

/// How long `BEGIN IMMEDIATE` waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MATCH_COLUMNS: &str = "tournament_id, match_key, round_label, side_a, side_b, \
                             score_a, score_b, winner, next_match";

/// SQLite implementation of [`EntityStore`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens or creates the database at `path` and applies the schema.
    ///
    /// Enables foreign keys and WAL mode, sets `synchronous=NORMAL` and waits up to five
    /// seconds for a lock held by another connection.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> StoreResult<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.pragma_update(None, "foreign_keys", true)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl EntityStore for SqliteStore {
    fn begin(&self) -> StoreResult<Box<dyn UnitOfWork + '_>> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        // A unit of work that panicked may have left its transaction open.
        if !conn.is_autocommit() {
            log::warn!("Rolling back transaction left open by a failed unit of work");
            conn.execute_batch("ROLLBACK")?;
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(Box::new(SqliteUnitOfWork {
            conn,
            finished: false,
        }))
    }
}

struct SqliteUnitOfWork<'a> {
    conn: MutexGuard<'a, Connection>,
    finished: bool,
}

impl Drop for SqliteUnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::error!("SQLite rollback failed: {}", e);
            }
        }
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn tournament(&self, id: TournamentId) -> StoreResult<Option<Tournament>> {
        let found = self
            .conn
            .query_row(
                "SELECT id, name, team_count, format, champion, created_at \
                 FROM tournaments WHERE id = ?1",
                params![id.to_string()],
                tournament_from_row,
            )
            .optional()?;
        Ok(found)
    }

    fn tournaments(&self) -> StoreResult<Vec<Tournament>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, team_count, format, champion, created_at \
             FROM tournaments ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], tournament_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO tournaments(id, name, team_count, format, champion, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    tournament.id.to_string(),
                    tournament.name,
                    tournament.team_count,
                    tournament.format,
                    tournament.champion,
                    tournament.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
                ],
            )
            .map_err(|e| constraint_error(e, || format!("tournament {}", tournament.id)))?;
        Ok(())
    }

    fn set_champion(&mut self, id: TournamentId, champion: &str) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE tournaments SET champion = ?2 WHERE id = ?1",
            params![id.to_string(), champion],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing(format!("tournament {}", id)));
        }
        Ok(())
    }

    fn delete_tournament(&mut self, id: TournamentId) -> StoreResult<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM tournaments WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    fn teams(&self, tournament_id: TournamentId) -> StoreResult<Vec<Team>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tournament_id, name FROM teams WHERE tournament_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![tournament_id.to_string()], |row| {
            Ok(Team {
                id: uuid_column(row, 0)?,
                tournament_id: uuid_column(row, 1)?,
                name: row.get(2)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn insert_team(&mut self, team: &Team) -> StoreResult<()> {
        self.conn
            .execute(
                "INSERT INTO teams(id, tournament_id, name) VALUES (?1, ?2, ?3)",
                params![team.id.to_string(), team.tournament_id.to_string(), team.name],
            )
            .map_err(|e| constraint_error(e, || format!("team '{}'", team.name)))?;
        Ok(())
    }

    fn matches(&self, tournament_id: TournamentId, filter: MatchFilter) -> StoreResult<Vec<GameMatch>> {
        let (clause, round) = match filter {
            MatchFilter::All => ("", None),
            MatchFilter::Round(r) => (" AND round = ?2", Some(r)),
            MatchFilter::Pending => (" AND winner IS NULL", None),
        };
        let sql = format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = ?1{clause} \
             ORDER BY round ASC, position ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let id = tournament_id.to_string();
        let rows = match round {
            Some(r) => stmt.query_map(params![id, r], match_from_row)?,
            None => stmt.query_map(params![id], match_from_row)?,
        };
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn find_match(&self, tournament_id: TournamentId, key: MatchKey) -> StoreResult<Option<GameMatch>> {
        let found = self
            .conn
            .query_row(
                &format!(
                    "SELECT {MATCH_COLUMNS} FROM matches WHERE tournament_id = ?1 AND match_key = ?2"
                ),
                params![tournament_id.to_string(), key.to_string()],
                match_from_row,
            )
            .optional()?;
        Ok(found)
    }

    fn latest_round(&self, tournament_id: TournamentId) -> StoreResult<Option<u32>> {
        let round: Option<u32> = self.conn.query_row(
            "SELECT MAX(round) FROM matches WHERE tournament_id = ?1",
            params![tournament_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(round)
    }

    fn insert_matches(&mut self, batch: &[GameMatch]) -> StoreResult<()> {
        self.conn.execute_batch("SAVEPOINT match_batch")?;
        let inserted = insert_match_rows(&self.conn, batch);
        if inserted.is_err() {
            self.conn.execute_batch("ROLLBACK TO match_batch")?;
        }
        self.conn.execute_batch("RELEASE match_batch")?;
        inserted
    }

    fn record_score(
        &mut self,
        tournament_id: TournamentId,
        key: MatchKey,
        score: Score,
        winner: &str,
    ) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE matches SET score_a = ?3, score_b = ?4, winner = ?5 \
             WHERE tournament_id = ?1 AND match_key = ?2",
            params![tournament_id.to_string(), key.to_string(), score.a, score.b, winner],
        )?;
        if changed == 0 {
            return Err(StoreError::Missing(format!("match {}", key)));
        }
        Ok(())
    }

    fn commit(mut self: Box<Self>) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.finished = true;
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> StoreResult<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

fn insert_match_rows(conn: &Connection, batch: &[GameMatch]) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO matches(tournament_id, match_key, round, position, round_label, \
         side_a, side_b, score_a, score_b, winner, next_match) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for m in batch {
        stmt.execute(params![
            m.tournament_id.to_string(),
            m.key.to_string(),
            m.key.round(),
            m.key.position(),
            m.round_label,
            m.side_a,
            m.side_b,
            m.score.map(|s| s.a),
            m.score.map(|s| s.b),
            m.winner,
            m.next_match.map(|k| k.to_string()),
        ])
        .map_err(|e| constraint_error(e, || format!("match {}", m.key)))?;
    }
    Ok(())
}

/// Maps uniqueness and foreign-key violations onto the store's own error variants.
fn constraint_error(err: rusqlite::Error, what: impl FnOnce() -> String) -> StoreError {
    let extended = match &err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    };
    match extended {
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
        | Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) => StoreError::Conflict(what()),
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY) => {
            StoreError::Missing(format!("parent tournament of {}", what()))
        }
        _ => StoreError::Sqlite(err),
    }
}

fn conversion_error(idx: usize, err: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(idx, e))
}

fn key_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<MatchKey>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse::<MatchKey>().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn tournament_from_row(row: &Row<'_>) -> rusqlite::Result<Tournament> {
    let created_at: String = row.get(5)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| conversion_error(5, e))?
        .with_timezone(&Utc);
    Ok(Tournament {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        team_count: row.get(2)?,
        format: row.get(3)?,
        champion: row.get(4)?,
        created_at,
    })
}

fn match_from_row(row: &Row<'_>) -> rusqlite::Result<GameMatch> {
    let key = key_column(row, 1)?
        .ok_or_else(|| conversion_error(1, std::io::Error::other("match key is NULL")))?;
    let score_a: Option<u64> = row.get(5)?;
    let score_b: Option<u64> = row.get(6)?;
    let score = match (score_a, score_b) {
        (Some(a), Some(b)) => Some(Score { a, b }),
        (None, None) => None,
        _ => {
            return Err(conversion_error(
                5,
                std::io::Error::other(format!("match {} has only one score", key)),
            ))
        }
    };
    Ok(GameMatch {
        key,
        tournament_id: uuid_column(row, 0)?,
        round_label: row.get(2)?,
        side_a: row.get(3)?,
        side_b: row.get(4)?,
        score,
        winner: row.get(7)?,
        next_match: key_column(row, 8)?,
    })
}
